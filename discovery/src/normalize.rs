//! Cleanup of raw help and manual-page output.

use std::sync::LazyLock;

use regex::Regex;

// SAFETY: These regexes are compile-time constants and are validated by tests.
static ANSI_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\x1b\[[0-9;?]*[ -/]*[@-~]").expect("static regex must compile")
});
static OVERSTRIKE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[^\x08]\x08").expect("static regex must compile"));

/// Removes `char` + backspace pairs left by manual renderers that emulate
/// bold (`N\x08N`) and underline (`_\x08x`).
pub fn strip_overstrike(raw: &str) -> String {
    let mut cleaned = raw.to_string();
    while cleaned.contains('\x08') {
        let next = OVERSTRIKE_RE.replace_all(&cleaned, "").into_owned();
        if next == cleaned {
            // A leading backspace has nothing to erase.
            return next.replace('\x08', "");
        }
        cleaned = next;
    }
    cleaned
}

/// Removes ANSI SGR and cursor escape sequences.
pub fn strip_ansi(raw: &str) -> String {
    ANSI_RE.replace_all(raw, "").into_owned()
}

/// Strips escapes and overstrike, and unifies line endings.
pub fn normalize_text(raw: &str) -> String {
    strip_overstrike(&strip_ansi(raw))
        .replace("\r\n", "\n")
        .replace('\r', "\n")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_strip_bold_and_underline() {
        assert_eq!(strip_overstrike("N\x08NA\x08AM\x08ME\x08E"), "NAME");
        assert_eq!(strip_overstrike("_\x08f_\x08i_\x08l_\x08e"), "file");
    }

    #[test]
    fn test_stray_backspace_is_dropped() {
        assert_eq!(strip_overstrike("\x08abc"), "abc");
    }

    #[test]
    fn test_strip_ansi_sequences() {
        assert_eq!(strip_ansi("\x1b[1m-v\x1b[0m, \x1b[4m--verbose\x1b[24m"), "-v, --verbose");
    }

    #[test]
    fn test_normalize_line_endings() {
        assert_eq!(normalize_text("a\r\nb\rc"), "a\nb\nc");
    }
}
