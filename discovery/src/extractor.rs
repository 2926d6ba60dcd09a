//! Option mining from free-form help and manual text.
//!
//! The extractor looks for lines whose content reads like an option listing
//! (`-o, --output=FILE   description`) and collects each option's
//! description by following indentation: lines indented at least as deeply
//! as the first description line belong to it, and a shallower line ends it.
//!
//! # Example
//!
//! ```
//! use argspec_discovery::extractor::{ExtractOptions, extract_options};
//!
//! let help = "\
//! Usage: ls [OPTION]... [FILE]...
//!
//!   -a, --all                  do not ignore entries starting with .
//!   -C DIR                     change to DIR
//!                                before listing
//!       --color[=WHEN]         colorize the output
//! ";
//!
//! let entries = extract_options(help, &ExtractOptions::default());
//! assert_eq!(entries.len(), 3);
//! assert_eq!(entries[0].flags, "-a, --all");
//! assert_eq!(entries[1].description, "change to DIR before listing");
//! assert_eq!(entries[2].flags, "--color[=WHEN]");
//! ```

use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::normalize::normalize_text;

/// Option lines indented deeper than this are treated as prose.
const MAX_OPTION_INDENT: usize = 24;

const TAB_WIDTH: usize = 8;

// A flag: `-x`, `--long-name`, `-name`, or a `key=VALUE` operand (`bs=BYTES`).
const FLAG: &str = r"(?:--?[A-Za-z0-9?#@][-A-Za-z0-9_.+#@]*|[a-z][a-z0-9_]*=[A-Z][A-Z0-9_]*)";
// A value descriptor glued to or following a flag.
const PLACEHOLDER: &str = r"(?:=[A-Za-z0-9_.:/|<>-]*|\[=?[^\]]*\]|<[^>]*>|\{[^}]*\}|[ ][A-Z][A-Z0-9_.:-]*(?:\.\.\.)?|[ ]<[^>]*>|[ ]\[[^\]]*\]|[ ]\{[^}]*\})";

static OPTION_LINE: LazyLock<Regex> = LazyLock::new(|| {
    let pattern = format!(
        r"^(?P<indent>[ \t]*)(?P<opts>{FLAG}{PLACEHOLDER}*(?:(?:,[ ]?|[ ]or[ ]|[ ]){FLAG}{PLACEHOLDER}*)*),?(?:(?:\t+|[ ]{{2,}})(?P<desc>\S.*?))?[ \t]*$"
    );
    Regex::new(&pattern).expect("static regex must compile")
});

/// Pre-filter applied to the text before scanning.
pub type TextFilter = fn(&str) -> String;

/// Extraction knobs.
#[derive(Debug, Clone, Default)]
pub struct ExtractOptions {
    /// Scanning starts after the first line matching this pattern.
    pub start: Option<String>,
    /// Scanning stops at the first line (after `start`) matching this
    /// pattern.
    pub end: Option<String>,
    /// Applied in order after escape and overstrike removal.
    pub filters: Vec<TextFilter>,
}

impl ExtractOptions {
    pub fn between(start: impl Into<String>, end: impl Into<String>) -> Self {
        Self {
            start: Some(start.into()),
            end: Some(end.into()),
            filters: Vec::new(),
        }
    }

    pub fn with_filter(mut self, filter: TextFilter) -> Self {
        self.filters.push(filter);
        self
    }
}

/// One `(option-string, description)` pair.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OptionEntry {
    /// Flag spellings with their value descriptors (`-o, --output=FILE`).
    pub flags: String,
    pub description: String,
}

impl OptionEntry {
    /// Declaration descriptor for the grammar compiler.
    pub fn descriptor(&self) -> String {
        if self.description.is_empty() {
            self.flags.clone()
        } else {
            format!("{}  {}", self.flags, self.description)
        }
    }
}

/// Mines option entries from `text`.
///
/// Finding nothing yields an empty list. Malformed boundary patterns are
/// ignored and the whole text is scanned.
pub fn extract_options(text: &str, options: &ExtractOptions) -> Vec<OptionEntry> {
    let mut cleaned = normalize_text(text);
    for filter in &options.filters {
        cleaned = filter(&cleaned);
    }

    let lines: Vec<&str> = cleaned.lines().collect();
    let (first, last) = scan_bounds(&lines, options);
    let lines = &lines[first..last];

    let mut entries = Vec::new();
    let mut idx = 0;
    while idx < lines.len() {
        let Some((indent, flags, inline_desc)) = option_line(lines[idx]) else {
            idx += 1;
            continue;
        };

        let mut parts: Vec<String> = Vec::new();
        let mut baseline = inline_desc.map(|(column, desc)| {
            parts.push(desc.to_string());
            column
        });

        let mut next = idx + 1;
        while next < lines.len() {
            let line = lines[next];
            if line.trim().is_empty() {
                // Paragraphs of one description may be separated by blanks.
                let resume = (next..lines.len()).find(|&k| !lines[k].trim().is_empty());
                match (baseline, resume) {
                    (Some(column), Some(k)) if indent_of(lines[k]) >= column => {
                        next = k;
                        continue;
                    }
                    _ => break,
                }
            }

            let depth = indent_of(line);
            match baseline {
                Some(column) if depth >= column => {}
                Some(_) => break,
                None if depth > indent && option_line(line).is_none() => {
                    baseline = Some(depth);
                }
                None => break,
            }
            parts.push(line.trim().to_string());
            next += 1;
        }

        entries.push(OptionEntry {
            flags: flags.replace(" or ", ", "),
            description: parts.join(" "),
        });
        idx = next;
    }

    backfill_aliases(&mut entries);
    debug!(entries = entries.len(), "Extracted option entries");
    entries
}

/// Gives description-less entries the next non-empty description.
///
/// Help output usually lists a bare alias right before its described
/// canonical entry. This is a heuristic: nothing guarantees the order.
fn backfill_aliases(entries: &mut [OptionEntry]) {
    let mut pending: Option<String> = None;
    for entry in entries.iter_mut().rev() {
        if entry.description.is_empty() {
            if let Some(description) = &pending {
                entry.description = description.clone();
            }
        } else {
            pending = Some(entry.description.clone());
        }
    }
}

fn scan_bounds(lines: &[&str], options: &ExtractOptions) -> (usize, usize) {
    let start = options.start.as_deref().and_then(|p| boundary_regex(p, "start"));
    let end = options.end.as_deref().and_then(|p| boundary_regex(p, "end"));

    let first = match &start {
        Some(re) => lines
            .iter()
            .position(|line| re.is_match(line))
            .map_or(0, |idx| idx + 1),
        None => 0,
    };
    let last = match &end {
        Some(re) => lines[first..]
            .iter()
            .position(|line| re.is_match(line))
            .map_or(lines.len(), |idx| first + idx),
        None => lines.len(),
    };
    (first, last)
}

fn boundary_regex(pattern: &str, which: &str) -> Option<Regex> {
    match Regex::new(pattern) {
        Ok(re) => Some(re),
        Err(err) => {
            warn!(pattern, boundary = which, error = %err, "Ignoring malformed boundary pattern");
            None
        }
    }
}

/// Parses an option line into `(indent, flags, Some((desc column, desc)))`.
fn option_line(line: &str) -> Option<(usize, &str, Option<(usize, &str)>)> {
    let caps = OPTION_LINE.captures(line)?;
    let indent = display_width(&caps["indent"]);
    if indent > MAX_OPTION_INDENT {
        return None;
    }
    let flags = caps.name("opts")?.as_str().trim();
    let desc = caps
        .name("desc")
        .map(|m| (display_width(&line[..m.start()]), m.as_str().trim()));
    Some((indent, flags, desc))
}

fn indent_of(line: &str) -> usize {
    let body = line.trim_start();
    display_width(&line[..line.len() - body.len()])
}

fn display_width(text: &str) -> usize {
    text.chars().fold(0, |column, ch| {
        if ch == '\t' {
            (column / TAB_WIDTH + 1) * TAB_WIDTH
        } else {
            column + 1
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn flags(entries: &[OptionEntry]) -> Vec<&str> {
        entries.iter().map(|e| e.flags.as_str()).collect()
    }

    #[test]
    fn test_option_line_shapes() {
        let text = "\
  -v                 verbose
  -o FILE            output file
  --color=WHEN       when to color
  --color[=WHEN]     maybe color
  -I<DIR>            include dir
  -x, --exclude PAT  exclude
  -q or --quiet      quiet
  bs=BYTES           block size
";
        let entries = extract_options(text, &ExtractOptions::default());
        assert_eq!(
            flags(&entries),
            vec![
                "-v",
                "-o FILE",
                "--color=WHEN",
                "--color[=WHEN]",
                "-I<DIR>",
                "-x, --exclude PAT",
                "-q, --quiet",
                "bs=BYTES",
            ]
        );
    }

    #[test]
    fn test_prose_is_not_an_option() {
        let text = "\
Usage: tool [OPTIONS]
  - a bullet
  -1 means unlimited here
";
        assert!(extract_options(text, &ExtractOptions::default()).is_empty());
    }

    #[test]
    fn test_manual_layout_description_below() {
        let text = "\
       -a, --all
              do not ignore entries starting with .

       -B, --ignore-backups
              do not list implied entries ending with ~
";
        let entries = extract_options(text, &ExtractOptions::default());
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].description, "do not ignore entries starting with .");
        assert_eq!(entries[1].flags, "-B, --ignore-backups");
    }

    #[test]
    fn test_description_paragraphs_join() {
        let text = "\
       --sort=WORD
              sort by WORD instead of name

              see also --time
       -t     sort by time
";
        let entries = extract_options(text, &ExtractOptions::default());
        assert_eq!(entries[0].description, "sort by WORD instead of name see also --time");
        assert_eq!(entries[1].flags, "-t");
    }

    #[test]
    fn test_shallower_line_ends_description() {
        let text = "\
  -f FILE   read FILE
            and more
Notes:
  nothing here
";
        let entries = extract_options(text, &ExtractOptions::default());
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].description, "read FILE and more");
    }

    #[test]
    fn test_alias_backfill() {
        let text = "\
  -h
  --help     show help
  -V         print version
";
        let entries = extract_options(text, &ExtractOptions::default());
        assert_eq!(entries[0].description, "show help");
        assert_eq!(entries[2].description, "print version");
    }

    #[test]
    fn test_boundaries() {
        let text = "\
  -a   before
OPTIONS
  -b   inside
EXAMPLES
  -c   after
";
        let entries = extract_options(text, &ExtractOptions::between("^OPTIONS", "^EXAMPLES"));
        assert_eq!(flags(&entries), vec!["-b"]);
    }

    #[test]
    fn test_malformed_boundary_scans_everything() {
        let text = "  -a   one\n  -b   two\n";
        let options = ExtractOptions {
            start: Some("(".into()),
            ..ExtractOptions::default()
        };
        assert_eq!(extract_options(text, &options).len(), 2);
    }

    #[test]
    fn test_filters_run_before_scanning() {
        fn unbullet(text: &str) -> String {
            text.replace("* -", "  -")
        }
        let text = "* -z   zap\n";
        let options = ExtractOptions::default().with_filter(unbullet);
        assert_eq!(flags(&extract_options(text, &options)), vec!["-z"]);
    }

    #[test]
    fn test_tab_separated_description() {
        let text = "\t-n\tdry run\n";
        let entries = extract_options(text, &ExtractOptions::default());
        assert_eq!(entries[0].flags, "-n");
        assert_eq!(entries[0].description, "dry run");
    }

    #[test]
    fn test_descriptor_joins_help() {
        let entry = OptionEntry {
            flags: "-v".into(),
            description: "verbose".into(),
        };
        assert_eq!(entry.descriptor(), "-v  verbose");
    }
}
