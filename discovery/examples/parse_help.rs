//! Basic help text extraction example.
//!
//! Demonstrates how to use `extract_options()` to mine option entries from
//! pre-captured help output without executing any commands.
//!
//! # Usage
//!
//! ```bash
//! cargo run -p argspec-discovery --example parse_help
//! ```

use argspec_discovery::{ExtractOptions, OutputFormat, extract_options, format_entries};

fn main() {
    let help_text = r#"
Usage: mycli [OPTIONS] <COMMAND>

A fictional CLI tool for demonstration

Options:
  -v, --verbose          Enable verbose output
  -q, --quiet            Suppress all output
  -c, --config <FILE>    Path to config file
                           [default: config.toml]
      --no-color         Disable colored output
  -j, --jobs <N>         Number of parallel jobs
  -h, --help             Print help
  -V, --version          Print version
"#;

    let entries = extract_options(help_text, &ExtractOptions::default());
    println!("Found {} options\n", entries.len());

    match format_entries(&entries, OutputFormat::Table) {
        Ok(table) => print!("{table}"),
        Err(err) => eprintln!("error: {err}"),
    }

    println!("\nDeclarations:");
    for entry in &entries {
        println!("  {:?}", entry.descriptor());
    }
}
