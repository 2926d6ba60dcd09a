//! Output formatting for extracted option entries.

use serde::Serialize;

use crate::extractor::OptionEntry;

/// Supported output formats.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "clap", derive(clap::ValueEnum))]
pub enum OutputFormat {
    Json,
    Yaml,
    Table,
}

/// Entries extracted for one program.
#[derive(Debug, Clone, Serialize)]
pub struct ProgramEntries {
    pub program: String,
    pub entries: Vec<OptionEntry>,
}

/// Formats entries in the requested output format.
pub fn format_entries(entries: &[OptionEntry], format: OutputFormat) -> Result<String, String> {
    match format {
        OutputFormat::Json | OutputFormat::Yaml => serialize(entries, format),
        OutputFormat::Table => Ok(entries_to_table(entries)),
    }
}

/// Formats several programs' entries; the table form prints one block per
/// program.
pub fn format_programs(programs: &[ProgramEntries], format: OutputFormat) -> Result<String, String> {
    match format {
        OutputFormat::Json | OutputFormat::Yaml => serialize(programs, format),
        OutputFormat::Table => Ok(programs
            .iter()
            .map(|program| format!("{}:\n{}", program.program, entries_to_table(&program.entries)))
            .collect::<Vec<_>>()
            .join("\n")),
    }
}

/// Serializes any value as pretty JSON or YAML.
pub fn serialize<T: Serialize + ?Sized>(value: &T, format: OutputFormat) -> Result<String, String> {
    match format {
        OutputFormat::Json => serde_json::to_string_pretty(value)
            .map_err(|e| format!("JSON serialization failed: {e}")),
        OutputFormat::Yaml => {
            serde_yaml::to_string(value).map_err(|e| format!("YAML serialization failed: {e}"))
        }
        OutputFormat::Table => Err("table output is not available for this value".to_string()),
    }
}

fn entries_to_table(entries: &[OptionEntry]) -> String {
    let width = entries
        .iter()
        .map(|entry| entry.flags.chars().count())
        .max()
        .unwrap_or(4);

    let mut out = String::new();
    for entry in entries {
        out.push_str(&format!(
            "  {:<width$}  {}\n",
            entry.flags,
            entry.description,
            width = width
        ));
    }
    out
}
