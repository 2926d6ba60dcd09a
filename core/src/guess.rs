//! Completion-source inference from option names and metavars.
//!
//! A metavar spelled as an enumeration (`{json|yaml}` or `{json,yaml}`)
//! becomes a literal source. Anything else is matched as `name=METAVAR`
//! against an ordered table of patterns; the first match wins and the table
//! ends in a catch-all for file paths.

use std::sync::LazyLock;

use regex::Regex;

use crate::source::CompletionSource;
use crate::validate::CompileError;

/// One `(pattern, source)` row of the guess table.
#[derive(Debug, Clone)]
pub struct GuessRule {
    pattern: Regex,
    source: CompletionSource,
}

impl GuessRule {
    /// Compiles a case-sensitive pattern matched against `name=METAVAR`.
    pub fn new(pattern: &str, source: CompletionSource) -> Result<Self, CompileError> {
        let pattern = Regex::new(pattern).map_err(|err| CompileError::InvalidGuessPattern {
            pattern: pattern.to_string(),
            reason: err.to_string(),
        })?;
        Ok(Self { pattern, source })
    }

    pub fn matches(&self, key: &str) -> bool {
        self.pattern.is_match(key)
    }

    pub fn pattern(&self) -> &str {
        self.pattern.as_str()
    }

    pub fn source(&self) -> &CompletionSource {
        &self.source
    }
}

impl PartialEq for GuessRule {
    fn eq(&self, other: &Self) -> bool {
        self.pattern() == other.pattern() && self.source == other.source
    }
}

static CHOICES: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\{([^{}]*)\}$").expect("static regex must compile"));

static DEFAULT_RULES: LazyLock<Vec<GuessRule>> = LazyLock::new(|| {
    let rule = |pattern: &str, source: CompletionSource| {
        GuessRule::new(pattern, source).expect("static guess pattern must compile")
    };
    vec![
        rule(
            r"(?:^|[-_])(?:dir|directory)=|=(?:[A-Z_]*DIR|DIRECTORY|[a-z_]*dir|directory)$",
            CompletionSource::directories(),
        ),
        rule(
            r"(?:^|[-_])(?:user|owner)=|=(?:USER|USERNAME|OWNER|user|username)$",
            CompletionSource::users(),
        ),
        rule(r"(?:^|[-_])group=|=(?:GROUP|group)$", CompletionSource::groups()),
        rule(
            r"=(?:COMMAND|CMD|PROGRAM|command|cmd|program)$",
            CompletionSource::commands(),
        ),
        rule(r".*", CompletionSource::files()),
    ]
});

/// The built-in guess table.
pub fn default_rules() -> &'static [GuessRule] {
    &DEFAULT_RULES
}

/// Parses `{a|b|c}` / `{a,b,c}` into its members, dropping duplicates.
///
/// # Examples
///
/// ```
/// use argspec_core::parse_choices;
///
/// assert_eq!(parse_choices("{always|never|auto}").unwrap(), vec!["always", "never", "auto"]);
/// assert_eq!(parse_choices("[={a,b,a}]").unwrap(), vec!["a", "b"]);
/// assert!(parse_choices("FILE").is_none());
/// ```
pub fn parse_choices(metavar: &str) -> Option<Vec<String>> {
    let inner = metavar
        .trim()
        .trim_start_matches('[')
        .trim_start_matches('=')
        .trim_end_matches(']');
    let caps = CHOICES.captures(inner)?;
    let mut choices: Vec<String> = Vec::new();
    for choice in caps[1].split([',', '|']).map(str::trim) {
        if !choice.is_empty() && !choices.iter().any(|c| c == choice) {
            choices.push(choice.to_string());
        }
    }
    (!choices.is_empty()).then_some(choices)
}

/// Removes placeholder decoration: brackets, angles, `=`, and a trailing
/// ellipsis.
pub fn strip_metavar(metavar: &str) -> &str {
    metavar
        .trim()
        .trim_end_matches("...")
        .trim_matches(|ch| matches!(ch, '<' | '>' | '[' | ']' | '=' | '{' | '}'))
        .trim_end_matches("...")
}

/// Infers a completion source for one value slot.
///
/// `hints` are consulted before the built-in table.
pub fn guess_source(name: &str, metavar: &str, hints: &[GuessRule]) -> CompletionSource {
    if let Some(choices) = parse_choices(metavar) {
        return CompletionSource::Literal(choices);
    }
    let key = format!("{name}={}", strip_metavar(metavar));
    hints
        .iter()
        .chain(default_rules())
        .find(|rule| rule.matches(&key))
        .map(|rule| rule.source().clone())
        .unwrap_or_else(CompletionSource::files)
}
