//! Engine configuration.
//!
//! Every field has a working default, so a configuration file only needs the
//! values it changes.
//!
//! # Example YAML
//!
//! ```yaml
//! cache:
//!   max_ttl_secs: 86400
//!   grammar_ttl_secs: 3600
//!   help_ttl_secs: 3600
//! extraction:
//!   help_timeout_ms: 2000
//!   use_manual: true
//!   manual_width: 1000
//! completion:
//!   annotate: true
//!   annotation_width: 40
//! ```

use std::io::{BufReader, BufWriter};
use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::Result;

/// Lifetimes of cached grammars and help text.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct CacheConfig {
    /// Upper bound for any entry; longer requests are clamped.
    pub max_ttl_secs: u64,
    /// Lifetime of a grammar built from extracted help.
    pub grammar_ttl_secs: u64,
    /// Lifetime of captured help or manual text.
    pub help_ttl_secs: u64,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            max_ttl_secs: 24 * 60 * 60,
            grammar_ttl_secs: 60 * 60,
            help_ttl_secs: 60 * 60,
        }
    }
}

impl CacheConfig {
    pub fn max_ttl(&self) -> Duration {
        Duration::from_secs(self.max_ttl_secs)
    }

    pub fn grammar_ttl(&self) -> Duration {
        Duration::from_secs(self.grammar_ttl_secs)
    }

    pub fn help_ttl(&self) -> Duration {
        Duration::from_secs(self.help_ttl_secs)
    }
}

/// How help text is obtained for programs without a registered grammar.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ExtractionConfig {
    /// Limit for one external help invocation; a timeout counts as no output.
    pub help_timeout_ms: u64,
    /// Fall back to the manual page when `--help` yields no options.
    pub use_manual: bool,
    /// `MANWIDTH` used when rendering manual pages.
    pub manual_width: u32,
}

impl Default for ExtractionConfig {
    fn default() -> Self {
        Self {
            help_timeout_ms: 2000,
            use_manual: true,
            manual_width: 1000,
        }
    }
}

impl ExtractionConfig {
    pub fn help_timeout(&self) -> Duration {
        Duration::from_millis(self.help_timeout_ms)
    }
}

/// Candidate presentation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct CompletionConfig {
    /// Attach help text to option candidates.
    pub annotate: bool,
    /// Display width annotations are truncated or padded to.
    pub annotation_width: usize,
}

impl Default for CompletionConfig {
    fn default() -> Self {
        Self {
            annotate: true,
            annotation_width: 40,
        }
    }
}

/// Top-level engine configuration.
///
/// # Examples
///
/// ```
/// use argspec_engine::EngineConfig;
///
/// let config: EngineConfig = serde_yaml::from_str("completion:\n  annotate: false\n").unwrap();
/// assert!(!config.completion.annotate);
/// assert_eq!(config.completion.annotation_width, 40);
/// assert_eq!(config.cache.max_ttl_secs, 86_400);
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct EngineConfig {
    pub cache: CacheConfig,
    pub extraction: ExtractionConfig,
    pub completion: CompletionConfig,
}

impl EngineConfig {
    /// Loads configuration from a YAML file.
    ///
    /// # Errors
    ///
    /// Returns [`IoError`](crate::EngineError::IoError) if the file cannot
    /// be read, or [`YamlError`](crate::EngineError::YamlError) if parsing
    /// fails.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let file = std::fs::File::open(path)?;
        let reader = BufReader::new(file);
        let config = serde_yaml::from_reader(reader)?;
        Ok(config)
    }

    /// Saves the configuration as YAML.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let file = std::fs::File::create(path)?;
        let writer = BufWriter::new(file);
        serde_yaml::to_writer(writer, self)?;
        Ok(())
    }
}
