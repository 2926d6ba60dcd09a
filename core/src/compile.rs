//! Grammar compiler.
//!
//! Turns declarations into a normalized list of [`ArgSpec`] records. An
//! option declaration may bundle several spellings, value descriptors and an
//! inline description in one string:
//!
//! ```text
//! -o, --output=FILE      write output to FILE
//! ```
//!
//! Compilation splits the spellings, derives `style`/`delimiter`/`suffix`
//! from each value descriptor, shares actions between aliases (see
//! [`share_aliases`](crate::share_aliases)) and resolves `Guess` sources
//! eagerly where the metavar allows it.
//!
//! # Example
//!
//! ```
//! use argspec_core::*;
//!
//! let specs = compile(
//!     &[
//!         SpecDecl::option("-o, --output ARG"),
//!         SpecDecl::option("-v"),
//!         SpecDecl::positional("* FILE"),
//!     ],
//!     &CompileOptions::default(),
//! )
//! .unwrap();
//!
//! assert_eq!(specs.len(), 4);
//! assert_eq!(specs[0].aliases, vec!["--output"]);
//! assert_eq!(specs[0].actions[0].metavar, "ARG");
//! assert!(specs[3].is_unbounded());
//! ```

use std::collections::HashMap;
use std::sync::{Arc, LazyLock};

use regex::Regex;
use serde::{Deserialize, Deserializer};

use crate::guess::{GuessRule, guess_source};
use crate::merge::share_aliases;
use crate::source::{Action, CompletionSource};
use crate::types::{
    ArgSpec, Exclusion, Grammar, OptionStyle, PositionalIndex, SpecKind, SpecName, Subparser,
    SubparserHandle,
};
use crate::validate::{CompileError, validate_specs};

static COLUMN_BREAK: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\t+| {2,}").expect("static regex must compile"));

/// Where a declared slot gets its completions.
///
/// In documents a source is either a keyword (`files`, `directories`,
/// `users`, `groups`, `commands`, `none`, `guess`) or a list of literal
/// values.
#[derive(Debug, Clone, Default)]
pub enum SourceDecl {
    #[default]
    Guess,
    None,
    Files,
    Directories,
    Users,
    Groups,
    Commands,
    Literal(Vec<String>),
    /// Programmatic source; not available in documents.
    Source(CompletionSource),
}

#[derive(Deserialize)]
#[serde(untagged)]
enum SourceRepr {
    Keyword(String),
    Values(Vec<String>),
}

impl<'de> Deserialize<'de> for SourceDecl {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        Ok(match SourceRepr::deserialize(deserializer)? {
            SourceRepr::Values(values) => Self::Literal(values),
            SourceRepr::Keyword(keyword) => match keyword.as_str() {
                "guess" => Self::Guess,
                "none" => Self::None,
                "files" => Self::Files,
                "directories" => Self::Directories,
                "users" => Self::Users,
                "groups" => Self::Groups,
                "commands" => Self::Commands,
                other => {
                    return Err(serde::de::Error::unknown_variant(
                        other,
                        &[
                            "guess",
                            "none",
                            "files",
                            "directories",
                            "users",
                            "groups",
                            "commands",
                        ],
                    ));
                }
            },
        })
    }
}

impl SourceDecl {
    pub fn to_source(&self) -> CompletionSource {
        match self {
            Self::Guess => CompletionSource::Guess,
            Self::None => CompletionSource::None,
            Self::Files => CompletionSource::files(),
            Self::Directories => CompletionSource::directories(),
            Self::Users => CompletionSource::users(),
            Self::Groups => CompletionSource::groups(),
            Self::Commands => CompletionSource::commands(),
            Self::Literal(values) => CompletionSource::literal(values.iter().cloned()),
            Self::Source(source) => source.clone(),
        }
    }
}

/// One declared value slot.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ActionDecl {
    #[serde(default)]
    pub metavar: String,
    #[serde(default)]
    pub source: SourceDecl,
    #[serde(default)]
    pub suffix: Option<String>,
}

impl ActionDecl {
    pub fn new(metavar: impl Into<String>, source: SourceDecl) -> Self {
        Self {
            metavar: metavar.into(),
            source,
            suffix: None,
        }
    }

    pub fn source(source: CompletionSource) -> Self {
        Self::new("", SourceDecl::Source(source))
    }

    pub fn with_suffix(mut self, suffix: impl Into<String>) -> Self {
        self.suffix = Some(suffix.into());
        self
    }

    fn to_action(&self) -> Action {
        Action {
            metavar: self.metavar.clone(),
            source: self.source.to_source(),
            suffix: self.suffix.clone(),
        }
    }
}

/// One declaration: an option descriptor or a positional slot.
///
/// For options `name` is a descriptor such as `"-o, --output=FILE  help"`;
/// for positionals it is an index or `*`, optionally followed by metavars
/// (`"* FILE"`).
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SpecDecl {
    pub kind: SpecKind,
    #[serde(deserialize_with = "name_repr")]
    pub name: String,
    #[serde(default)]
    pub actions: Vec<ActionDecl>,
    #[serde(default)]
    pub excludes: Vec<String>,
    #[serde(default)]
    pub repeatable: bool,
    #[serde(default)]
    pub independent: bool,
    #[serde(default)]
    pub help: String,
    /// Name of a registered subparser.
    #[serde(default)]
    pub subparser: Option<String>,
    #[serde(skip)]
    pub subparser_handle: Option<Arc<dyn Subparser>>,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum NameRepr {
    Text(String),
    Index(u64),
}

fn name_repr<'de, D: Deserializer<'de>>(deserializer: D) -> Result<String, D::Error> {
    Ok(match NameRepr::deserialize(deserializer)? {
        NameRepr::Text(text) => text,
        NameRepr::Index(index) => index.to_string(),
    })
}

impl SpecDecl {
    fn new(kind: SpecKind, name: impl Into<String>) -> Self {
        Self {
            kind,
            name: name.into(),
            actions: Vec::new(),
            excludes: Vec::new(),
            repeatable: false,
            independent: false,
            help: String::new(),
            subparser: None,
            subparser_handle: None,
        }
    }

    pub fn option(descriptor: impl Into<String>) -> Self {
        Self::new(SpecKind::Option, descriptor)
    }

    pub fn positional(descriptor: impl Into<String>) -> Self {
        Self::new(SpecKind::Positional, descriptor)
    }

    pub fn action(mut self, action: ActionDecl) -> Self {
        self.actions.push(action);
        self
    }

    /// Shorthand for a slot with an explicit source.
    pub fn source(self, source: CompletionSource) -> Self {
        self.action(ActionDecl::source(source))
    }

    pub fn excludes<I, S>(mut self, tokens: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.excludes.extend(tokens.into_iter().map(Into::into));
        self
    }

    pub fn repeatable(mut self) -> Self {
        self.repeatable = true;
        self
    }

    pub fn independent(mut self) -> Self {
        self.independent = true;
        self
    }

    pub fn help(mut self, help: impl Into<String>) -> Self {
        self.help = help.into();
        self
    }

    pub fn subparser(mut self, subparser: Arc<dyn Subparser>) -> Self {
        self.subparser_handle = Some(subparser);
        self
    }

    pub fn subparser_named(mut self, name: impl Into<String>) -> Self {
        self.subparser = Some(name.into());
        self
    }
}

/// Knobs for [`compile`].
#[derive(Debug, Clone, Default)]
pub struct CompileOptions {
    /// Consulted before the built-in guess table.
    pub guesses: Vec<GuessRule>,
    /// Keep co-declared spellings from sharing actions.
    pub no_shared_args: bool,
    /// Subparsers declarations may name.
    pub subparsers: HashMap<String, Arc<dyn Subparser>>,
}

impl CompileOptions {
    pub fn with_subparser(mut self, name: impl Into<String>, subparser: Arc<dyn Subparser>) -> Self {
        self.subparsers.insert(name.into(), subparser);
        self
    }

    pub fn with_guess(mut self, rule: GuessRule) -> Self {
        self.guesses.push(rule);
        self
    }
}

/// Surface syntax of one flag spelling.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FlagSyntax {
    pub flag: String,
    pub style: OptionStyle,
    pub delimiter: String,
    pub suffix: String,
    pub value_optional: bool,
    pub metavars: Vec<String>,
    /// A metavar ends in `...`.
    pub repeatable: bool,
}

impl FlagSyntax {
    fn bare(flag: &str) -> Self {
        Self {
            flag: flag.to_string(),
            style: OptionStyle::Separate,
            delimiter: String::new(),
            suffix: " ".to_string(),
            value_optional: false,
            metavars: Vec::new(),
            repeatable: false,
        }
    }
}

/// Compiles declarations into a normalized specification list.
///
/// # Errors
///
/// Any malformed declaration rejects the whole list.
pub fn compile(decls: &[SpecDecl], options: &CompileOptions) -> Result<Vec<ArgSpec>, CompileError> {
    let mut specs = Vec::new();
    for decl in decls {
        specs.extend(compile_decl(decl, options)?);
    }
    normalize(specs, options)
}

/// Compiles declarations into a [`Grammar`] for `program`.
pub fn compile_grammar(
    program: &str,
    decls: &[SpecDecl],
    options: &CompileOptions,
) -> Result<Grammar, CompileError> {
    let specs = compile(decls, options)?;
    Ok(Grammar::new(program, specs).with_guesses(options.guesses.clone()))
}

/// Validates a specification list, resolves eager guesses, and shares
/// actions between aliases.
///
/// Normalizing an already normalized list returns it unchanged.
pub fn normalize(
    mut specs: Vec<ArgSpec>,
    options: &CompileOptions,
) -> Result<Vec<ArgSpec>, CompileError> {
    if let Some(err) = validate_specs(&specs).into_iter().next() {
        return Err(err);
    }
    for spec in &mut specs {
        // Wildcard slots keep their guess until the resolver sees the token.
        if spec.is_unbounded() {
            continue;
        }
        let name = spec.label();
        for action in &mut spec.actions {
            if matches!(action.source, CompletionSource::Guess) && !action.metavar.is_empty() {
                action.source = guess_source(&name, &action.metavar, &options.guesses);
            }
        }
    }
    if !options.no_shared_args {
        share_aliases(&mut specs);
    }
    Ok(specs)
}

fn compile_decl(decl: &SpecDecl, options: &CompileOptions) -> Result<Vec<ArgSpec>, CompileError> {
    let excludes = decl
        .excludes
        .iter()
        .map(|token| token.parse::<Exclusion>())
        .collect::<Result<Vec<_>, _>>()?;
    let subparser = match (&decl.subparser_handle, &decl.subparser) {
        (Some(handle), _) => Some(SubparserHandle(handle.clone())),
        (None, Some(name)) => {
            let handle = options
                .subparsers
                .get(name)
                .cloned()
                .ok_or_else(|| CompileError::UnknownSubparser(name.clone()))?;
            Some(SubparserHandle(handle))
        }
        (None, None) => None,
    };
    let explicit: Vec<Action> = decl.actions.iter().map(ActionDecl::to_action).collect();

    match decl.kind {
        SpecKind::Option => compile_option(decl, explicit, excludes, subparser),
        SpecKind::Positional => compile_positional(decl, explicit, excludes, subparser),
    }
}

fn compile_option(
    decl: &SpecDecl,
    explicit: Vec<Action>,
    excludes: Vec<Exclusion>,
    subparser: Option<SubparserHandle>,
) -> Result<Vec<ArgSpec>, CompileError> {
    let (left, inline_help) = split_help(&decl.name);
    let help = if decl.help.is_empty() {
        inline_help.unwrap_or_default().to_string()
    } else {
        decl.help.clone()
    };

    let syntaxes = split_flag_spellings(left)
        .iter()
        .map(|spelling| parse_flag_spelling(spelling))
        .collect::<Result<Vec<_>, _>>()?;
    if syntaxes.is_empty() {
        return Err(CompileError::InvalidDescriptor(decl.name.clone()));
    }

    let names: Vec<String> = syntaxes.iter().map(|s| s.flag.clone()).collect();
    let carrier = syntaxes
        .iter()
        .position(|s| !s.metavars.is_empty())
        .unwrap_or(0);

    let mut specs = Vec::with_capacity(syntaxes.len());
    for (idx, syntax) in syntaxes.into_iter().enumerate() {
        let mut actions: Vec<Action> = syntax.metavars.iter().map(Action::guess).collect();
        if !explicit.is_empty() && (idx == carrier || !actions.is_empty()) {
            actions = overlay_actions(actions, &explicit);
        }
        let aliases = names
            .iter()
            .filter(|name| **name != syntax.flag)
            .cloned()
            .collect();
        specs.push(ArgSpec {
            name: SpecName::Flag(syntax.flag),
            aliases,
            style: syntax.style,
            delimiter: syntax.delimiter,
            suffix: syntax.suffix,
            value_optional: syntax.value_optional,
            actions,
            excludes: excludes.clone(),
            repeatable: decl.repeatable || syntax.repeatable,
            independent: decl.independent,
            subparser: subparser.clone(),
            help: help.clone(),
        });
    }
    Ok(specs)
}

fn compile_positional(
    decl: &SpecDecl,
    explicit: Vec<Action>,
    excludes: Vec<Exclusion>,
    subparser: Option<SubparserHandle>,
) -> Result<Vec<ArgSpec>, CompileError> {
    let (left, inline_help) = split_help(&decl.name);
    let mut parts = left.split_whitespace();
    let index: PositionalIndex = parts
        .next()
        .ok_or_else(|| CompileError::InvalidPositional(decl.name.clone()))?
        .parse()?;
    let metavars: Vec<String> = parts.map(str::to_string).collect();
    let repeatable = decl.repeatable || metavars.iter().any(|m| m.ends_with("..."));

    let mut actions = overlay_actions(metavars.iter().map(Action::guess).collect(), &explicit);
    if actions.is_empty() {
        actions.push(Action::guess(""));
    }

    let help = if decl.help.is_empty() {
        inline_help.unwrap_or_default().to_string()
    } else {
        decl.help.clone()
    };

    Ok(vec![ArgSpec {
        name: SpecName::Positional(index),
        aliases: Vec::new(),
        style: OptionStyle::Separate,
        delimiter: String::new(),
        suffix: " ".to_string(),
        value_optional: false,
        actions,
        excludes,
        repeatable,
        independent: decl.independent,
        subparser,
        help,
    }])
}

/// Explicit slots override parsed ones by position; a parsed metavar fills
/// an explicit slot that left it empty.
fn overlay_actions(parsed: Vec<Action>, explicit: &[Action]) -> Vec<Action> {
    let len = parsed.len().max(explicit.len());
    (0..len)
        .map(|idx| match (explicit.get(idx), parsed.get(idx)) {
            (Some(action), Some(parsed)) if action.metavar.is_empty() => Action {
                metavar: parsed.metavar.clone(),
                ..action.clone()
            },
            (Some(action), _) => action.clone(),
            (None, Some(parsed)) => parsed.clone(),
            (None, None) => Action::default(),
        })
        .collect()
}

/// Splits `"-o, --output FILE    help text"` at the first run of two or more
/// spaces (or a tab) into the definition and the inline description.
pub fn split_help(descriptor: &str) -> (&str, Option<&str>) {
    let trimmed = descriptor.trim();
    match COLUMN_BREAK.find(trimmed) {
        Some(found) => {
            let help = trimmed[found.end()..].trim();
            (
                trimmed[..found.start()].trim(),
                (!help.is_empty()).then_some(help),
            )
        }
        None => (trimmed, None),
    }
}

/// Splits a definition into flag spellings at comma/space boundaries that
/// precede a dash. Bracketed placeholders are never split, and
/// `--[no-]name` expands to both spellings.
///
/// # Examples
///
/// ```
/// use argspec_core::split_flag_spellings;
///
/// assert_eq!(split_flag_spellings("-o, --output FILE"), vec!["-o", "--output FILE"]);
/// assert_eq!(split_flag_spellings("-x or --exclude=PAT"), vec!["-x", "--exclude=PAT"]);
/// assert_eq!(split_flag_spellings("--[no-]color"), vec!["--color", "--no-color"]);
/// ```
pub fn split_flag_spellings(definition: &str) -> Vec<String> {
    let normalized = definition.replace(" or -", ", -");
    let chars: Vec<char> = normalized.chars().collect();
    let mut spellings = Vec::new();
    let mut current = String::new();
    let mut depth = 0usize;
    let mut idx = 0;

    while idx < chars.len() {
        let ch = chars[idx];
        match ch {
            '[' | '<' | '{' => depth += 1,
            ']' | '>' | '}' => depth = depth.saturating_sub(1),
            _ => {}
        }
        if depth == 0 && (ch == ',' || ch.is_whitespace()) {
            let mut next = idx;
            while next < chars.len() && (chars[next] == ',' || chars[next].is_whitespace()) {
                next += 1;
            }
            if next < chars.len() && chars[next] == '-' && !current.trim().is_empty() {
                spellings.push(current.trim().to_string());
                current.clear();
                idx = next;
                continue;
            }
            if next >= chars.len() {
                break;
            }
        }
        current.push(ch);
        idx += 1;
    }
    if !current.trim().is_empty() {
        spellings.push(current.trim().to_string());
    }

    spellings
        .into_iter()
        .flat_map(|spelling| match spelling.strip_prefix("--[no-]") {
            Some(rest) => vec![format!("--{rest}"), format!("--no-{rest}")],
            None => vec![spelling],
        })
        .collect()
}

/// Separates a flag from its value descriptor.
///
/// | spelling        | style                | delimiter | suffix | optional |
/// |-----------------|----------------------|-----------|--------|----------|
/// | `--opt`         | separate (no value)  | ``        | ` `    | no       |
/// | `--opt ARG`     | separate             | ``        | ` `    | no       |
/// | `--opt=ARG`     | separate-or-inline   | `=`       | `=`    | no       |
/// | `--opt[=ARG]`   | inline               | `=`       | `=`    | yes      |
/// | `-I<DIR>`       | inline               | ``        | ``     | no       |
/// | `-O[LEVEL]`     | inline               | ``        | ``     | yes      |
///
/// # Examples
///
/// ```
/// use argspec_core::{OptionStyle, parse_flag_spelling};
///
/// let syntax = parse_flag_spelling("--color[=WHEN]").unwrap();
/// assert_eq!(syntax.flag, "--color");
/// assert_eq!(syntax.style, OptionStyle::Inline);
/// assert!(syntax.value_optional);
/// assert_eq!(syntax.metavars, vec!["WHEN"]);
/// ```
pub fn parse_flag_spelling(spelling: &str) -> Result<FlagSyntax, CompileError> {
    let spelling = spelling.trim().trim_end_matches(',');
    let invalid = || CompileError::InvalidDescriptor(spelling.to_string());
    if spelling.is_empty() {
        return Err(invalid());
    }

    let split_at = spelling
        .char_indices()
        .skip(1)
        .find(|(_, ch)| matches!(ch, ' ' | '\t' | '=' | '[' | '<' | '{'))
        .map_or(spelling.len(), |(idx, _)| idx);
    let flag = &spelling[..split_at];
    let rest = &spelling[split_at..];
    let mut syntax = FlagSyntax::bare(flag);

    if rest.is_empty() {
        return Ok(syntax);
    }

    if let Some(inner) = rest.strip_prefix("[=") {
        let inner = inner.strip_suffix(']').ok_or_else(invalid)?;
        syntax.style = OptionStyle::Inline;
        syntax.delimiter = "=".to_string();
        syntax.suffix = "=".to_string();
        syntax.value_optional = true;
        syntax.metavars = split_metavars(inner);
    } else if let Some(inner) = rest.strip_prefix('=') {
        syntax.style = OptionStyle::SeparateOrInline;
        syntax.delimiter = "=".to_string();
        syntax.suffix = "=".to_string();
        syntax.metavars = split_metavars(inner);
    } else if let Some(inner) = rest.strip_prefix('[') {
        let inner = inner.strip_suffix(']').ok_or_else(invalid)?;
        syntax.style = OptionStyle::Inline;
        syntax.suffix = String::new();
        syntax.value_optional = true;
        syntax.metavars = split_metavars(inner);
    } else if rest.starts_with('<') || rest.starts_with('{') {
        syntax.style = OptionStyle::Inline;
        syntax.suffix = String::new();
        syntax.metavars = split_metavars(rest);
    } else {
        syntax.metavars = split_metavars(rest);
        syntax.value_optional = syntax
            .metavars
            .first()
            .is_some_and(|metavar| metavar.starts_with('['));
    }

    if syntax.metavars.is_empty() {
        // `--opt=` declares a value without naming it.
        syntax.metavars.push(String::new());
    }
    syntax.repeatable = syntax.metavars.iter().any(|m| m.ends_with("..."));
    Ok(syntax)
}

/// Splits value descriptors on whitespace outside brackets.
fn split_metavars(text: &str) -> Vec<String> {
    let mut out = Vec::new();
    let mut current = String::new();
    let mut depth = 0usize;
    for ch in text.chars() {
        match ch {
            '[' | '<' | '{' => depth += 1,
            ']' | '>' | '}' => depth = depth.saturating_sub(1),
            _ => {}
        }
        if ch.is_whitespace() && depth == 0 {
            if !current.is_empty() {
                out.push(std::mem::take(&mut current));
            }
            continue;
        }
        current.push(ch);
    }
    if !current.is_empty() {
        out.push(current);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn compile_one(decl: SpecDecl) -> Vec<ArgSpec> {
        compile(&[decl], &CompileOptions::default()).unwrap()
    }

    #[test]
    fn test_split_help_column() {
        assert_eq!(
            split_help("-v, --verbose    be chatty"),
            ("-v, --verbose", Some("be chatty"))
        );
        assert_eq!(split_help("-v"), ("-v", None));
        assert_eq!(split_help("-x\tExclude"), ("-x", Some("Exclude")));
    }

    #[test]
    fn test_split_keeps_leading_dashes() {
        assert_eq!(split_flag_spellings("--all"), vec!["--all"]);
        assert_eq!(
            split_flag_spellings("-a,--all"),
            vec!["-a".to_string(), "--all".to_string()]
        );
        assert_eq!(
            split_flag_spellings("-k, --key <A,-B>"),
            vec!["-k".to_string(), "--key <A,-B>".to_string()]
        );
    }

    #[test]
    fn test_separate_value() {
        let syntax = parse_flag_spelling("--output ARG").unwrap();
        assert_eq!(syntax.flag, "--output");
        assert_eq!(syntax.style, OptionStyle::Separate);
        assert_eq!(syntax.suffix, " ");
        assert_eq!(syntax.metavars, vec!["ARG"]);
    }

    #[test]
    fn test_equals_value_is_separate_or_inline() {
        let syntax = parse_flag_spelling("--output=ARG").unwrap();
        assert_eq!(syntax.style, OptionStyle::SeparateOrInline);
        assert_eq!(syntax.delimiter, "=");
        assert_eq!(syntax.suffix, "=");
        assert!(!syntax.value_optional);
    }

    #[test]
    fn test_glued_values() {
        let required = parse_flag_spelling("-I<DIR>").unwrap();
        assert_eq!(required.flag, "-I");
        assert_eq!(required.style, OptionStyle::Inline);
        assert_eq!(required.delimiter, "");
        assert_eq!(required.suffix, "");
        assert!(!required.value_optional);
        assert_eq!(required.metavars, vec!["<DIR>"]);

        let optional = parse_flag_spelling("--opt[ARG]").unwrap();
        assert_eq!(optional.style, OptionStyle::Inline);
        assert!(optional.value_optional);
        assert_eq!(optional.metavars, vec!["ARG"]);
    }

    #[test]
    fn test_malformed_brackets_are_rejected() {
        assert!(parse_flag_spelling("--opt[=ARG").is_err());
        assert!(parse_flag_spelling("").is_err());
        let err = compile(&[SpecDecl::option("  ")], &CompileOptions::default()).unwrap_err();
        assert!(matches!(err, CompileError::InvalidDescriptor(_)));
    }

    #[test]
    fn test_multiple_values_become_multiple_actions() {
        let specs = compile_one(SpecDecl::option("--pair KEY VALUE"));
        let metavars: Vec<_> = specs[0].actions.iter().map(|a| a.metavar.as_str()).collect();
        assert_eq!(metavars, vec!["KEY", "VALUE"]);
    }

    #[test]
    fn test_aliases_share_actions() {
        let specs = compile_one(SpecDecl::option("-o, --output ARG  write here"));
        assert_eq!(specs.len(), 2);
        let (short, long) = (&specs[0], &specs[1]);
        assert_eq!(short.aliases, vec!["--output"]);
        assert_eq!(long.aliases, vec!["-o"]);
        assert_eq!(short.actions, long.actions);
        assert_eq!(short.style, long.style);
        assert_eq!(short.delimiter, long.delimiter);
        assert_eq!(short.suffix, long.suffix);
        assert_eq!(short.help, "write here");
    }

    #[test]
    fn test_no_shared_args_keeps_aliases_bare() {
        let options = CompileOptions {
            no_shared_args: true,
            ..CompileOptions::default()
        };
        let specs = compile(&[SpecDecl::option("-o, --output ARG")], &options).unwrap();
        assert!(specs[0].actions.is_empty());
        assert_eq!(specs[1].actions.len(), 1);
    }

    #[test]
    fn test_explicit_source_overrides_guess() {
        let specs = compile_one(
            SpecDecl::option("--format FMT").source(CompletionSource::literal(["json", "yaml"])),
        );
        assert_eq!(specs[0].actions[0].metavar, "FMT");
        assert_eq!(
            specs[0].actions[0].source,
            CompletionSource::literal(["json", "yaml"])
        );
    }

    #[test]
    fn test_explicit_actions_without_descriptor_value() {
        let specs = compile_one(SpecDecl::option("-exec").action(ActionDecl::new(
            "COMMAND",
            SourceDecl::Commands,
        )));
        assert_eq!(specs[0].actions.len(), 1);
        assert_eq!(specs[0].actions[0].metavar, "COMMAND");
    }

    #[test]
    fn test_eager_guess_resolves_enumeration() {
        let specs = compile_one(SpecDecl::option("--color={always|never}"));
        assert_eq!(
            specs[0].actions[0].source,
            CompletionSource::literal(["always", "never"])
        );
    }

    #[test]
    fn test_wildcard_positional_defers_guess() {
        let specs = compile_one(SpecDecl::positional("* FILE"));
        assert!(specs[0].is_unbounded());
        assert_eq!(specs[0].actions[0].source, CompletionSource::Guess);

        let specs = compile_one(SpecDecl::positional("0 DIR"));
        assert!(!specs[0].actions[0].source.is_deferred());
    }

    #[test]
    fn test_indexed_positional_guesses_under_its_index() {
        let options = CompileOptions::default().with_guess(
            GuessRule::new("^0=", CompletionSource::literal(["start", "stop"])).unwrap(),
        );
        let specs = compile(&[SpecDecl::positional("0 ACTION")], &options).unwrap();
        assert_eq!(
            specs[0].actions[0].source,
            CompletionSource::literal(["start", "stop"])
        );
    }

    #[test]
    fn test_grammar_keeps_guess_hints() {
        let rule = GuessRule::new("^\\*=HOST$", CompletionSource::literal(["alpha"])).unwrap();
        let options = CompileOptions::default().with_guess(rule.clone());
        let grammar = compile_grammar("ssh", &[SpecDecl::positional("* HOST")], &options).unwrap();
        assert_eq!(grammar.guesses, vec![rule]);
        assert_eq!(grammar.specs[0].actions[0].source, CompletionSource::Guess);
    }

    #[test]
    fn test_positional_without_metavar_gets_one_slot() {
        let specs = compile_one(SpecDecl::positional("1"));
        assert_eq!(specs[0].index(), Some(PositionalIndex::At(1)));
        assert_eq!(specs[0].actions.len(), 1);
    }

    #[test]
    fn test_invalid_positional_and_exclusion() {
        let err = compile(&[SpecDecl::positional("FILE")], &CompileOptions::default()).unwrap_err();
        assert_eq!(err, CompileError::InvalidPositional("FILE".into()));

        let err = compile(
            &[SpecDecl::option("-x").excludes([""])],
            &CompileOptions::default(),
        )
        .unwrap_err();
        assert_eq!(err, CompileError::InvalidExclusion(String::new()));
    }

    #[test]
    fn test_unknown_subparser_is_rejected() {
        let err = compile(
            &[SpecDecl::option("-exec").subparser_named("exec")],
            &CompileOptions::default(),
        )
        .unwrap_err();
        assert_eq!(err, CompileError::UnknownSubparser("exec".into()));
    }

    #[test]
    fn test_duplicate_spelling_is_rejected() {
        let err = compile(
            &[SpecDecl::option("-v, --verbose"), SpecDecl::option("-v")],
            &CompileOptions::default(),
        )
        .unwrap_err();
        assert_eq!(err, CompileError::DuplicateOption("-v".into()));
    }

    #[test]
    fn test_normalize_is_idempotent() {
        let options = CompileOptions::default();
        let specs = compile(
            &[
                SpecDecl::option("-o, --output=FILE"),
                SpecDecl::option("-d, --directory DIR").excludes(["-o"]),
                SpecDecl::option("--color[=WHEN]"),
                SpecDecl::positional("0 SRC"),
                SpecDecl::positional("* FILE"),
            ],
            &options,
        )
        .unwrap();

        let again = normalize(specs.clone(), &options).unwrap();
        assert_eq!(again, specs);
    }

    #[test]
    fn test_ellipsis_marks_repeatable() {
        let specs = compile_one(SpecDecl::option("--include PATTERN..."));
        assert!(specs[0].repeatable);
    }

    #[test]
    fn test_no_prefix_expansion() {
        let specs = compile_one(SpecDecl::option("--[no-]color"));
        let names: Vec<_> = specs.iter().filter_map(|s| s.flag()).collect();
        assert_eq!(names, vec!["--color", "--no-color"]);
    }
}
