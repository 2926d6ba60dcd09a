//! Argument grammar types, completion sources and the grammar compiler.
//!
//! This crate defines the building blocks for describing how a program's
//! command line is shaped:
//!
//! - [`ArgSpec`]: one option spelling or positional slot, with its value
//!   slots ([`Action`]), exclusions and optional [`Subparser`].
//! - [`CompletionSource`]: what can be typed into a value slot: a literal
//!   enumeration, a [`Provider`], a deferred guess, or a [`Generator`] that
//!   sees the values already on the command line.
//! - [`SpecDecl`] / [`GrammarDocument`]: declarative input, compiled by
//!   [`compile`] into a normalized list of specifications.
//! - [`MatchRecord`] / [`ParseState`]: the trace produced when a command
//!   line is matched against a grammar.
//!
//! # Example
//!
//! ```
//! use argspec_core::*;
//!
//! let grammar = compile_grammar(
//!     "ls",
//!     &[
//!         SpecDecl::option("-a, --all       do not ignore entries starting with ."),
//!         SpecDecl::option("--color[=WHEN]").source(CompletionSource::literal([
//!             "always", "auto", "never",
//!         ])),
//!         SpecDecl::positional("* FILE"),
//!     ],
//!     &CompileOptions::default(),
//! )
//! .unwrap();
//!
//! assert_eq!(grammar.option_names(), vec!["-a", "--all", "--color"]);
//! assert_eq!(grammar.find_option("--all").unwrap().help, "do not ignore entries starting with .");
//! assert!(grammar.find_option("--color").unwrap().value_optional);
//! ```

mod compile;
mod document;
mod guess;
mod merge;
mod provider;
mod source;
mod types;
mod validate;

pub use compile::{
    ActionDecl, CompileOptions, FlagSyntax, SourceDecl, SpecDecl, compile, compile_grammar,
    normalize, parse_flag_spelling, split_flag_spellings, split_help,
};
pub use document::{ActionSummary, GrammarDocument, GrammarSummary, GuessDecl, SpecSummary};
pub use guess::{GuessRule, default_rules, guess_source, parse_choices, strip_metavar};
pub use merge::{flag_suffix, inline_delimiter, share_aliases};
pub use provider::{
    AccountKind, AccountProvider, CommandProvider, LiteralProvider, NoCompletions, PathProvider,
};
pub use source::{Action, Candidate, CompletionSource, FnGenerator, Generator, ParseContext, Provider};
pub use types::*;
pub use validate::{CompileError, validate_specs};
