//! Option discovery from help and manual text.
//!
//! This crate mines `(option-string, description)` pairs from unstructured
//! program output and provides the time-bounded cache shared by the engine.
//!
//! # Main entry points
//!
//! - [`extract_options`]: scan text already in memory; never runs anything.
//! - [`extract_program`]: run `<program> --help` (and optionally the manual
//!   renderer) through a [`HelpSource`] and scan the result.
//! - [`ResultCache`]: generic memo table with lazy expiry.
//!
//! # Example
//!
//! ```
//! use argspec_discovery::{ExtractOptions, extract_options};
//!
//! let help = "\
//! Usage: mycli [OPTIONS] <FILE>
//!
//! Options:
//!   -v, --verbose        Enable verbose output
//!   -o, --output <PATH>  Output file
//!   -h, --help           Print help
//! ";
//!
//! let entries = extract_options(help, &ExtractOptions::default());
//! assert_eq!(entries.len(), 3);
//! assert_eq!(entries[1].flags, "-o, --output <PATH>");
//! assert_eq!(entries[1].description, "Output file");
//! ```

pub mod cache;
pub mod extractor;
pub mod normalize;
pub mod output;
pub mod probe;

pub use cache::{Clock, ManualClock, ResultCache, SystemClock};
pub use extractor::{ExtractOptions, OptionEntry, TextFilter, extract_options};
pub use normalize::{normalize_text, strip_ansi, strip_overstrike};
pub use output::{OutputFormat, ProgramEntries, format_entries, format_programs};
pub use probe::{
    CachingHelpSource, DEFAULT_HELP_TIMEOUT, DEFAULT_MANUAL_WIDTH, HelpSource, ProcessHelpSource,
    extract_program,
};
