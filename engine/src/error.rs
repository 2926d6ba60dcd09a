//! Error types for engine operations.
//!
//! Grammar authoring mistakes surface as [`EngineError::Compile`]; loading a
//! catalog or configuration adds I/O and decoding failures. Matching and
//! resolution never fail: ambiguity is recorded in the match trace.

use std::path::PathBuf;

use argspec_core::CompileError;
use thiserror::Error;

/// Errors that can occur while configuring the engine or loading grammars.
#[derive(Debug, Error)]
pub enum EngineError {
    /// File I/O failure.
    #[error("I/O error: {0}")]
    IoError(#[from] std::io::Error),

    /// JSON parsing or serialization failure.
    #[error("JSON error: {0}")]
    JsonError(#[from] serde_json::Error),

    /// YAML parsing or serialization failure.
    #[error("YAML error: {0}")]
    YamlError(#[from] serde_yaml::Error),

    /// A grammar failed to compile.
    #[error(transparent)]
    Compile(#[from] CompileError),

    /// A grammar file in a catalog failed to compile.
    #[error("invalid grammar {}: {source}", path.display())]
    InvalidGrammar {
        path: PathBuf,
        #[source]
        source: CompileError,
    },
}

/// Convenience alias for results with [`EngineError`].
pub type Result<T> = std::result::Result<T, EngineError>;
