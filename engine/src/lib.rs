//! Matching command lines against argument grammars and resolving what can
//! be typed next.
//!
//! - [`Matcher`] walks the tokens of a command line, producing one
//!   [`MatchRecord`](argspec_core::MatchRecord) per token.
//! - [`resolve`] turns the last record into a [`Completion`].
//! - [`Session`] ties both to registered grammars, grammar catalogs
//!   ([`Catalog`]) and grammars discovered from program help output.
//!
//! # Example
//!
//! ```
//! use argspec_core::{SpecDecl, MatchContext};
//! use argspec_engine::{EngineConfig, Session};
//!
//! let session = Session::offline(EngineConfig::default());
//! session
//!     .register_decls(
//!         "tool",
//!         &[
//!             SpecDecl::option("-o, --output ARG   write output here"),
//!             SpecDecl::option("-v                 be verbose"),
//!             SpecDecl::positional("* FILE"),
//!         ],
//!     )
//!     .unwrap();
//!
//! let completion = session.complete("tool", ["-"]);
//! assert_eq!(completion.context, Some(MatchContext::UnknownOption));
//! let names: Vec<_> = completion.candidates().into_iter().map(|c| c.value).collect();
//! assert_eq!(names, vec!["-o", "--output", "-v"]);
//! ```

pub mod catalog;
pub mod config;
pub mod error;
pub mod matcher;
pub mod resolve;
pub mod session;
pub mod subparser;

pub use catalog::{Catalog, DocumentFormat, load_document};
pub use config::{CacheConfig, CompletionConfig, EngineConfig, ExtractionConfig};
pub use error::{EngineError, Result};
pub use matcher::{END_OF_OPTIONS, Matcher, catch_all, filter_specs, is_flag_like};
pub use resolve::{Completion, MAX_GENERATOR_DEPTH, ResolveOptions, fit_annotation, resolve};
pub use session::{Session, builtin_subparsers, grammar_from_entries};
pub use subparser::{COMMAND_METAVAR, CommandSubparser, program_name};
