//! Declarative grammar documents and their serializable summaries.
//!
//! A document describes one program in YAML or JSON:
//!
//! ```yaml
//! program: tar
//! guesses:
//!   - pattern: "^--format="
//!     source: [gnu, posix, ustar]
//! specs:
//!   - kind: option
//!     name: "-f, --file=ARCHIVE   use archive file"
//!   - kind: option
//!     name: "-C, --directory=DIR"
//!   - kind: argument
//!     name: "* FILE"
//! ```

use std::collections::HashMap;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::compile::{CompileOptions, SourceDecl, SpecDecl, compile_grammar};
use crate::guess::GuessRule;
use crate::types::{ArgSpec, Grammar, OptionStyle, Subparser};
use crate::validate::CompileError;

/// Extra guess hint declared by a document.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct GuessDecl {
    pub pattern: String,
    pub source: SourceDecl,
}

/// One program's declarations.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct GrammarDocument {
    pub program: String,
    #[serde(default)]
    pub no_shared_args: bool,
    #[serde(default)]
    pub guesses: Vec<GuessDecl>,
    #[serde(default)]
    pub specs: Vec<SpecDecl>,
}

impl GrammarDocument {
    pub fn from_yaml_str(raw: &str) -> Result<Self, CompileError> {
        serde_yaml::from_str(raw).map_err(|err| CompileError::Declaration(err.to_string()))
    }

    pub fn from_json_str(raw: &str) -> Result<Self, CompileError> {
        serde_json::from_str(raw).map_err(|err| CompileError::Declaration(err.to_string()))
    }

    /// Compiles the document, resolving `subparser` names against
    /// `subparsers`.
    pub fn compile(
        &self,
        subparsers: &HashMap<String, Arc<dyn Subparser>>,
    ) -> Result<Grammar, CompileError> {
        let guesses = self
            .guesses
            .iter()
            .map(|decl| GuessRule::new(&decl.pattern, decl.source.to_source()))
            .collect::<Result<Vec<_>, _>>()?;
        let options = CompileOptions {
            guesses,
            no_shared_args: self.no_shared_args,
            subparsers: subparsers.clone(),
        };
        compile_grammar(&self.program, &self.specs, &options)
    }
}

/// Printable view of one value slot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ActionSummary {
    pub metavar: String,
    pub source: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub suffix: Option<String>,
}

/// Printable view of one compiled specification.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SpecSummary {
    pub name: String,
    pub kind: String,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub aliases: Vec<String>,
    pub style: OptionStyle,
    pub delimiter: String,
    pub suffix: String,
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    pub value_optional: bool,
    pub actions: Vec<ActionSummary>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub excludes: Vec<String>,
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    pub repeatable: bool,
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    pub subparser: bool,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub help: String,
}

impl From<&ArgSpec> for SpecSummary {
    fn from(spec: &ArgSpec) -> Self {
        Self {
            name: spec.label(),
            kind: if spec.is_option() {
                "option".to_string()
            } else {
                "positional".to_string()
            },
            aliases: spec.aliases.clone(),
            style: spec.style,
            delimiter: spec.delimiter.clone(),
            suffix: spec.suffix.clone(),
            value_optional: spec.value_optional,
            actions: spec
                .actions
                .iter()
                .map(|action| ActionSummary {
                    metavar: action.metavar.clone(),
                    source: action.source.label(),
                    suffix: action.suffix.clone(),
                })
                .collect(),
            excludes: spec.excludes.iter().map(ToString::to_string).collect(),
            repeatable: spec.repeatable,
            subparser: spec.subparser.is_some(),
            help: spec.help.clone(),
        }
    }
}

/// Printable view of a compiled grammar.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GrammarSummary {
    pub program: String,
    pub specs: Vec<SpecSummary>,
}

impl From<&Grammar> for GrammarSummary {
    fn from(grammar: &Grammar) -> Self {
        Self {
            program: grammar.program.clone(),
            specs: grammar
                .specs
                .iter()
                .map(|spec| SpecSummary::from(spec.as_ref()))
                .collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{CompletionSource, PositionalIndex};

    const TAR: &str = r#"
program: tar
guesses:
  - pattern: "^--format="
    source: [gnu, posix]
specs:
  - kind: option
    name: "-f, --file=ARCHIVE   use archive file"
  - kind: option
    name: "--format FMT"
  - kind: option
    name: "-x"
    excludes: ["-c"]
  - kind: option
    name: "-c"
    actions:
      - source: none
  - kind: argument
    name: "* FILE"
"#;

    #[test]
    fn test_yaml_document_compiles() {
        let doc = GrammarDocument::from_yaml_str(TAR).unwrap();
        let grammar = doc.compile(&HashMap::new()).unwrap();

        assert_eq!(grammar.program, "tar");
        let file = grammar.find_option("-f").unwrap();
        assert_eq!(file.help, "use archive file");
        assert_eq!(file.actions[0].metavar, "ARCHIVE");

        let format = grammar.find_option("--format").unwrap();
        assert_eq!(
            format.actions[0].source,
            CompletionSource::literal(["gnu", "posix"])
        );
        assert_eq!(grammar.find_option("-c").unwrap().actions[0].source, CompletionSource::None);
        assert_eq!(
            grammar.positionals().next().unwrap().index(),
            Some(PositionalIndex::Rest)
        );
    }

    #[test]
    fn test_json_document_accepts_numeric_positional() {
        let raw = r#"{"program": "cp", "specs": [{"kind": "positional", "name": 0}]}"#;
        let grammar = GrammarDocument::from_json_str(raw)
            .unwrap()
            .compile(&HashMap::new())
            .unwrap();
        assert_eq!(grammar.specs[0].index(), Some(PositionalIndex::At(0)));
    }

    #[test]
    fn test_unknown_key_is_rejected() {
        let raw = "program: ls\nspecs:\n  - kind: option\n    name: -l\n    colour: red\n";
        let err = GrammarDocument::from_yaml_str(raw).unwrap_err();
        assert!(matches!(err, CompileError::Declaration(_)));
    }

    #[test]
    fn test_unknown_kind_is_rejected() {
        let raw = "program: ls\nspecs:\n  - kind: switch\n    name: -l\n";
        assert!(matches!(
            GrammarDocument::from_yaml_str(raw),
            Err(CompileError::Declaration(_))
        ));
    }

    #[test]
    fn test_unknown_source_keyword_is_rejected() {
        let raw = "program: ls\nspecs:\n  - kind: option\n    name: -l\n    actions:\n      - source: hosts\n";
        assert!(GrammarDocument::from_yaml_str(raw).is_err());
    }

    #[test]
    fn test_summary_serializes() {
        let grammar = GrammarDocument::from_yaml_str(TAR)
            .unwrap()
            .compile(&HashMap::new())
            .unwrap();
        let summary = GrammarSummary::from(&grammar);
        let json = serde_json::to_value(&summary).unwrap();

        assert_eq!(json["program"], "tar");
        assert_eq!(json["specs"][0]["name"], "-f");
        assert_eq!(json["specs"][0]["aliases"][0], "--file");
        assert_eq!(json["specs"][0]["style"], "separate-or-inline");
    }
}
