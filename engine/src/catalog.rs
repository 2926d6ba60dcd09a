//! Grammar documents loaded from disk.
//!
//! A catalog directory holds one document per program, as `*.yaml`, `*.yml`
//! or `*.json`. Other files are ignored.
//!
//! ```no_run
//! use argspec_engine::Catalog;
//!
//! let catalog = Catalog::from_dir("grammars/").unwrap();
//! for program in catalog.programs() {
//!     println!("{program}");
//! }
//! ```

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use argspec_core::{Grammar, GrammarDocument, Subparser};
use tracing::debug;

use crate::error::{EngineError, Result};

/// Document formats recognized by extension.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DocumentFormat {
    Yaml,
    Json,
}

impl DocumentFormat {
    pub fn from_path(path: &Path) -> Option<Self> {
        match path.extension().and_then(|ext| ext.to_str()) {
            Some("yaml" | "yml") => Some(Self::Yaml),
            Some("json") => Some(Self::Json),
            _ => None,
        }
    }
}

/// Grammar documents indexed by program name.
#[derive(Debug, Default)]
pub struct Catalog {
    documents: HashMap<String, (PathBuf, GrammarDocument)>,
}

impl Catalog {
    /// Loads every document in `path`.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::IoError`] if the directory or a file cannot be
    /// read, or [`EngineError::InvalidGrammar`] naming the first file that
    /// does not decode.
    pub fn from_dir(path: impl AsRef<Path>) -> Result<Self> {
        let mut paths = Vec::new();
        for entry in std::fs::read_dir(path.as_ref())? {
            let file_path = entry?.path();
            if file_path.is_file() && DocumentFormat::from_path(&file_path).is_some() {
                paths.push(file_path);
            }
        }
        // Later files win on duplicate program names; keep that stable.
        paths.sort();

        let mut catalog = Self::default();
        for file_path in paths {
            let document = load_document(&file_path)?;
            debug!(program = %document.program, path = %file_path.display(), "Loaded grammar document");
            catalog
                .documents
                .insert(document.program.clone(), (file_path, document));
        }
        Ok(catalog)
    }

    pub fn get(&self, program: &str) -> Option<&GrammarDocument> {
        self.documents.get(program).map(|(_, document)| document)
    }

    /// Program names in sorted order.
    pub fn programs(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.documents.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }

    pub fn len(&self) -> usize {
        self.documents.len()
    }

    pub fn is_empty(&self) -> bool {
        self.documents.is_empty()
    }

    /// Compiles every document.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::InvalidGrammar`] for the first document that
    /// fails to compile.
    pub fn compile(&self, subparsers: &HashMap<String, Arc<dyn Subparser>>) -> Result<Vec<Grammar>> {
        let mut grammars = Vec::with_capacity(self.documents.len());
        for program in self.programs() {
            let (path, document) = &self.documents[program];
            let grammar = document
                .compile(subparsers)
                .map_err(|source| EngineError::InvalidGrammar {
                    path: path.clone(),
                    source,
                })?;
            grammars.push(grammar);
        }
        Ok(grammars)
    }
}

/// Reads one grammar document, choosing the decoder by extension.
///
/// # Errors
///
/// Returns [`EngineError::InvalidGrammar`] for an unknown extension or a
/// document that does not decode.
pub fn load_document(path: impl AsRef<Path>) -> Result<GrammarDocument> {
    let path = path.as_ref();
    let raw = std::fs::read_to_string(path)?;
    let decoded = match DocumentFormat::from_path(path) {
        Some(DocumentFormat::Yaml) => GrammarDocument::from_yaml_str(&raw),
        Some(DocumentFormat::Json) => GrammarDocument::from_json_str(&raw),
        None => Err(argspec_core::CompileError::Declaration(format!(
            "unsupported document extension: {}",
            path.display()
        ))),
    };
    decoded.map_err(|source| EngineError::InvalidGrammar {
        path: path.to_path_buf(),
        source,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    const LS_YAML: &str = r#"
program: ls
specs:
  - kind: option
    name: "-a, --all   do not ignore entries starting with ."
  - kind: positional
    name: "* FILE"
"#;

    const GREP_JSON: &str = r#"{
  "program": "grep",
  "specs": [
    { "kind": "option", "name": "-e, --regexp=PATTERNS" },
    { "kind": "positional", "name": "* FILE" }
  ]
}"#;

    #[test]
    fn test_from_dir_reads_yaml_and_json() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("ls.yaml"), LS_YAML).unwrap();
        std::fs::write(dir.path().join("grep.json"), GREP_JSON).unwrap();
        std::fs::write(dir.path().join("notes.txt"), "ignored").unwrap();

        let catalog = Catalog::from_dir(dir.path()).unwrap();
        assert_eq!(catalog.programs(), vec!["grep", "ls"]);
        assert_eq!(catalog.get("ls").unwrap().specs.len(), 2);

        let grammars = catalog.compile(&HashMap::new()).unwrap();
        assert_eq!(grammars[0].program, "grep");
        assert!(grammars[1].find_option("--all").is_some());
    }

    #[test]
    fn test_bad_document_names_the_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bad.yml");
        std::fs::write(&path, "program: x\nspecs: 7\n").unwrap();

        match Catalog::from_dir(dir.path()) {
            Err(EngineError::InvalidGrammar { path: reported, .. }) => assert_eq!(reported, path),
            other => panic!("expected InvalidGrammar, got {other:?}"),
        }
    }

    #[test]
    fn test_compile_failure_names_the_file() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(
            dir.path().join("x.yaml"),
            "program: x\nspecs:\n  - kind: option\n    name: \"-o\"\n    subparser: missing\n",
        )
        .unwrap();

        let catalog = Catalog::from_dir(dir.path()).unwrap();
        let err = catalog.compile(&HashMap::new()).unwrap_err();
        assert!(err.to_string().contains("x.yaml"), "{err}");
    }

    #[test]
    fn test_missing_dir_is_io_error() {
        let err = Catalog::from_dir("/nonexistent/argspec/grammars").unwrap_err();
        assert!(matches!(err, EngineError::IoError(_)));
    }
}
