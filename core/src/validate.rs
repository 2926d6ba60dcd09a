//! Grammar validation and authoring errors.
//!
//! Every error in this module describes a bug in a declarative grammar, not a
//! runtime condition: a grammar that fails to validate is rejected as a whole.
//!
//! # Examples
//!
//! ```
//! use argspec_core::*;
//!
//! let specs = vec![ArgSpec::option("-v"), ArgSpec::option("--verbose")];
//! assert!(validate_specs(&specs).is_empty());
//!
//! // Two option records claiming the same spelling
//! let specs = vec![ArgSpec::option("-v"), ArgSpec::option("-v")];
//! let errors = validate_specs(&specs);
//! assert!(matches!(errors[0], CompileError::DuplicateOption(_)));
//! ```

use std::collections::HashSet;

use thiserror::Error;

use crate::ArgSpec;

/// Authoring errors raised while compiling a grammar.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CompileError {
    /// The declaration document could not be decoded (unknown kind, unknown
    /// property key, wrong value type).
    #[error("invalid grammar declaration: {0}")]
    Declaration(String),
    /// An option descriptor has no usable flag spelling or a malformed value
    /// descriptor.
    #[error("invalid option descriptor: {0:?}")]
    InvalidDescriptor(String),
    /// A positional name is neither a non-negative index nor `*`.
    #[error("invalid positional index: {0:?}")]
    InvalidPositional(String),
    /// An exclusion token is empty or contains whitespace.
    #[error("invalid exclusion token: {0:?}")]
    InvalidExclusion(String),
    /// Two option records share one spelling.
    #[error("duplicate option in grammar: {0}")]
    DuplicateOption(String),
    /// A declaration names a subparser nobody registered.
    #[error("unknown subparser: {0}")]
    UnknownSubparser(String),
    /// A guess hint pattern does not compile.
    #[error("invalid guess pattern {pattern:?}: {reason}")]
    InvalidGuessPattern { pattern: String, reason: String },
}

/// Validates a list of specifications.
///
/// Option spellings must be unique and non-empty, and every alias must name
/// an option present in the list.
pub fn validate_specs(specs: &[ArgSpec]) -> Vec<CompileError> {
    let mut errors = Vec::new();
    let mut seen: HashSet<&str> = HashSet::new();

    for spec in specs {
        let Some(flag) = spec.flag() else {
            continue;
        };
        if flag.trim().is_empty() {
            errors.push(CompileError::InvalidDescriptor(flag.to_string()));
            return errors;
        }
        if !seen.insert(flag) {
            errors.push(CompileError::DuplicateOption(flag.to_string()));
            return errors;
        }
    }

    for spec in specs {
        for alias in &spec.aliases {
            if !seen.contains(alias.as_str()) {
                errors.push(CompileError::InvalidDescriptor(alias.clone()));
                return errors;
            }
        }
    }

    errors
}
