//! Grammar and match-trace type definitions.
//!
//! A compiled grammar is a flat list of [`ArgSpec`] records, one per option
//! spelling or positional slot. Matching a command line against it produces
//! a trace of [`MatchRecord`]s, one per consumed token.

use std::collections::{HashMap, VecDeque};
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::guess::GuessRule;
use crate::source::{Action, ParseContext};
use crate::validate::CompileError;

/// Whether a specification is a flag or a positional slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SpecKind {
    Option,
    #[serde(alias = "argument")]
    Positional,
}

/// Index of a positional slot.
///
/// `Rest` sorts after every concrete index.
///
/// # Examples
///
/// ```
/// use argspec_core::PositionalIndex;
///
/// assert_eq!("*".parse::<PositionalIndex>().unwrap(), PositionalIndex::Rest);
/// assert_eq!("2".parse::<PositionalIndex>().unwrap(), PositionalIndex::At(2));
/// assert!(PositionalIndex::At(7) < PositionalIndex::Rest);
/// assert!("-1".parse::<PositionalIndex>().is_err());
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum PositionalIndex {
    At(usize),
    /// Any remaining count.
    Rest,
}

impl FromStr for PositionalIndex {
    type Err = CompileError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "*" => Ok(Self::Rest),
            digits => digits
                .parse::<usize>()
                .map(Self::At)
                .map_err(|_| CompileError::InvalidPositional(s.to_string())),
        }
    }
}

impl fmt::Display for PositionalIndex {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::At(index) => write!(f, "{index}"),
            Self::Rest => f.write_str("*"),
        }
    }
}

/// Name of a specification.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum SpecName {
    /// Literal flag spelling (`-o`, `--output`, `if=`).
    Flag(String),
    Positional(PositionalIndex),
}

impl fmt::Display for SpecName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Flag(flag) => f.write_str(flag),
            Self::Positional(index) => index.fmt(f),
        }
    }
}

/// How an option receives its value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum OptionStyle {
    /// `--opt VALUE`
    #[default]
    Separate,
    /// `--opt=VALUE` or `-IVALUE` only.
    Inline,
    /// Either form.
    SeparateOrInline,
}

impl OptionStyle {
    pub fn accepts_inline(self) -> bool {
        matches!(self, Self::Inline | Self::SeparateOrInline)
    }
}

/// What becomes unavailable once a specification has matched.
///
/// Tokens: `-` removes every option, `#` every positional, anything else is
/// a literal name (a flag spelling, a positional index, or `*`).
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Exclusion {
    AllOptions,
    AllPositionals,
    Name(SpecName),
}

impl Exclusion {
    /// Whether `spec` is removed by this exclusion.
    pub fn covers(&self, spec: &ArgSpec) -> bool {
        match self {
            Self::AllOptions => spec.is_option(),
            Self::AllPositionals => spec.is_positional(),
            Self::Name(SpecName::Flag(flag)) => spec.answers_to(flag),
            Self::Name(name) => spec.name == *name,
        }
    }
}

impl FromStr for Exclusion {
    type Err = CompileError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.is_empty() || s.chars().any(char::is_whitespace) {
            return Err(CompileError::InvalidExclusion(s.to_string()));
        }
        Ok(match s {
            "-" => Self::AllOptions,
            "#" => Self::AllPositionals,
            "*" => Self::Name(SpecName::Positional(PositionalIndex::Rest)),
            other => match other.parse::<usize>() {
                Ok(index) => Self::Name(SpecName::Positional(PositionalIndex::At(index))),
                Err(_) => Self::Name(SpecName::Flag(other.to_string())),
            },
        })
    }
}

impl fmt::Display for Exclusion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::AllOptions => f.write_str("-"),
            Self::AllPositionals => f.write_str("#"),
            Self::Name(name) => name.fmt(f),
        }
    }
}

/// Tokens still to consume, the specifications still available, and the
/// trace so far.
#[derive(Debug, Clone, Default)]
pub struct ParseState {
    pub tokens: VecDeque<String>,
    pub specs: Vec<Arc<ArgSpec>>,
    pub history: Vec<MatchRecord>,
}

impl ParseState {
    pub fn new<I, S>(tokens: I, specs: Vec<Arc<ArgSpec>>) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            tokens: tokens.into_iter().map(Into::into).collect(),
            specs,
            history: Vec::new(),
        }
    }

    /// Occurrence number for the next match.
    pub fn next_occurrence(&self) -> usize {
        self.history
            .iter()
            .map(|record| record.occurrence + 1)
            .max()
            .unwrap_or(0)
    }
}

/// Looks up compiled grammars by program name.
pub trait GrammarLookup {
    fn grammar(&self, program: &str) -> Option<Arc<Grammar>>;
}

impl GrammarLookup for () {
    fn grammar(&self, _program: &str) -> Option<Arc<Grammar>> {
        None
    }
}

impl GrammarLookup for HashMap<String, Arc<Grammar>> {
    fn grammar(&self, program: &str) -> Option<Arc<Grammar>> {
        self.get(program).cloned()
    }
}

/// Continuation that takes over token consumption after its specification
/// matched.
///
/// It may consume none, some, or all of the remaining tokens and append its
/// own records; whatever it leaves in `state.tokens` is matched by the caller
/// against `state.specs`.
pub trait Subparser: Send + Sync + fmt::Debug {
    fn parse(&self, state: ParseState, grammars: &dyn GrammarLookup) -> ParseState;
}

/// Shared handle to a [`Subparser`], compared by identity.
#[derive(Debug, Clone)]
pub struct SubparserHandle(pub Arc<dyn Subparser>);

impl SubparserHandle {
    pub fn new(subparser: impl Subparser + 'static) -> Self {
        Self(Arc::new(subparser))
    }
}

impl PartialEq for SubparserHandle {
    fn eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }
}

/// One option spelling or one positional slot.
///
/// # Examples
///
/// ```
/// use argspec_core::{Action, ArgSpec, OptionStyle, PositionalIndex};
///
/// let output = ArgSpec::option("--output")
///     .with_style(OptionStyle::SeparateOrInline, "=")
///     .with_action(Action::guess("FILE"))
///     .with_aliases(["-o"]);
/// assert!(output.is_long());
/// assert_eq!(output.flag(), Some("--output"));
///
/// let files = ArgSpec::positional(PositionalIndex::Rest);
/// assert!(files.is_unbounded());
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct ArgSpec {
    pub name: SpecName,
    /// Other spellings of the same option.
    pub aliases: Vec<String>,
    pub style: OptionStyle,
    /// Joins flag and inline value (`=`, or empty for short flags).
    pub delimiter: String,
    /// Appended after the flag name is completed.
    pub suffix: String,
    /// The value may be omitted entirely (`--color[=WHEN]`).
    pub value_optional: bool,
    /// One entry per value slot.
    pub actions: Vec<Action>,
    pub excludes: Vec<Exclusion>,
    pub repeatable: bool,
    /// Do not share actions with aliases.
    pub independent: bool,
    pub subparser: Option<SubparserHandle>,
    pub help: String,
}

impl ArgSpec {
    fn with_name(name: SpecName) -> Self {
        Self {
            name,
            aliases: Vec::new(),
            style: OptionStyle::Separate,
            delimiter: String::new(),
            suffix: " ".to_string(),
            value_optional: false,
            actions: Vec::new(),
            excludes: Vec::new(),
            repeatable: false,
            independent: false,
            subparser: None,
            help: String::new(),
        }
    }

    pub fn option(flag: impl Into<String>) -> Self {
        Self::with_name(SpecName::Flag(flag.into()))
    }

    pub fn positional(index: PositionalIndex) -> Self {
        Self::with_name(SpecName::Positional(index))
    }

    pub fn with_aliases<I, S>(mut self, aliases: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.aliases = aliases.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_style(mut self, style: OptionStyle, delimiter: impl Into<String>) -> Self {
        self.style = style;
        self.delimiter = delimiter.into();
        self
    }

    pub fn with_suffix(mut self, suffix: impl Into<String>) -> Self {
        self.suffix = suffix.into();
        self
    }

    pub fn with_action(mut self, action: Action) -> Self {
        self.actions.push(action);
        self
    }

    pub fn with_excludes(mut self, excludes: Vec<Exclusion>) -> Self {
        self.excludes = excludes;
        self
    }

    pub fn with_help(mut self, help: impl Into<String>) -> Self {
        self.help = help.into();
        self
    }

    pub fn with_subparser(mut self, subparser: SubparserHandle) -> Self {
        self.subparser = Some(subparser);
        self
    }

    pub fn repeatable(mut self) -> Self {
        self.repeatable = true;
        self
    }

    pub fn kind(&self) -> SpecKind {
        match self.name {
            SpecName::Flag(_) => SpecKind::Option,
            SpecName::Positional(_) => SpecKind::Positional,
        }
    }

    pub fn is_option(&self) -> bool {
        self.kind() == SpecKind::Option
    }

    pub fn is_positional(&self) -> bool {
        self.kind() == SpecKind::Positional
    }

    pub fn flag(&self) -> Option<&str> {
        match &self.name {
            SpecName::Flag(flag) => Some(flag),
            SpecName::Positional(_) => None,
        }
    }

    pub fn index(&self) -> Option<PositionalIndex> {
        match self.name {
            SpecName::Positional(index) => Some(index),
            SpecName::Flag(_) => None,
        }
    }

    /// Wildcard positional consuming any remaining count.
    pub fn is_unbounded(&self) -> bool {
        self.index() == Some(PositionalIndex::Rest)
    }

    /// Long spelling: `--name`, or a single-dash word such as `-name`.
    pub fn is_long(&self) -> bool {
        self.flag().is_some_and(is_long_flag)
    }

    pub fn takes_value(&self) -> bool {
        !self.actions.is_empty()
    }

    /// Record name used in match traces.
    pub fn label(&self) -> String {
        self.name.to_string()
    }

    /// Whether `name` is this option's spelling or one of its aliases.
    pub fn answers_to(&self, name: &str) -> bool {
        self.flag() == Some(name) || self.aliases.iter().any(|alias| alias == name)
    }
}

/// Long spelling test shared by the compiler and the matcher.
pub fn is_long_flag(flag: &str) -> bool {
    flag.starts_with("--") || flag.chars().count() > 2
}

/// How a token was interpreted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum MatchContext {
    Option,
    Positional,
    UnknownOption,
    UnknownPositional,
}

impl MatchContext {
    pub fn is_unknown(self) -> bool {
        matches!(self, Self::UnknownOption | Self::UnknownPositional)
    }
}

impl fmt::Display for MatchContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Option => "option",
            Self::Positional => "positional",
            Self::UnknownOption => "unknown-option",
            Self::UnknownPositional => "unknown-positional",
        })
    }
}

/// One consumed token.
#[derive(Debug, Clone, PartialEq)]
pub struct MatchRecord {
    pub context: MatchContext,
    /// Matched spelling, positional label, or the raw token when unknown.
    pub name: String,
    pub spec: Option<Arc<ArgSpec>>,
    /// Completion slot for this token.
    pub action: Action,
    /// Index into `spec.actions`; `None` while the flag name itself is the
    /// token.
    pub slot: Option<usize>,
    /// Records of one match share an occurrence number.
    pub occurrence: usize,
    /// Values already consumed by this match before `stub`.
    pub values: Vec<String>,
    /// The token text this record covers.
    pub stub: String,
}

impl MatchRecord {
    /// Whether the record's token is a value rather than a flag name.
    pub fn is_value(&self) -> bool {
        self.slot.is_some()
    }
}

impl ParseContext {
    /// Flattens a trace into `name -> value lists`, one list per occurrence.
    ///
    /// Options are registered under every alias so that a generator can ask
    /// for either spelling.
    pub fn from_history(history: &[MatchRecord]) -> Self {
        let mut groups: Vec<(usize, &MatchRecord, Vec<String>)> = Vec::new();
        for record in history {
            if record.context.is_unknown() || record.spec.is_none() {
                continue;
            }
            let values = if record.is_value() {
                let mut values = record.values.clone();
                values.push(record.stub.clone());
                values
            } else {
                Vec::new()
            };
            match groups.last_mut() {
                Some((occurrence, _, current)) if *occurrence == record.occurrence => {
                    *current = values;
                }
                _ => groups.push((record.occurrence, record, values)),
            }
        }

        let mut context = ParseContext::new();
        for (_, record, values) in groups {
            context.insert(record.name.clone(), values.clone());
            if let Some(spec) = &record.spec {
                for alias in &spec.aliases {
                    context.insert(alias.clone(), values.clone());
                }
            }
        }
        context
    }
}

/// A compiled grammar for one program.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Grammar {
    pub program: String,
    pub specs: Vec<Arc<ArgSpec>>,
    /// Hints for slots whose guess is deferred until resolution.
    pub guesses: Vec<GuessRule>,
}

impl Grammar {
    pub fn new(program: impl Into<String>, specs: Vec<ArgSpec>) -> Self {
        Self {
            program: program.into(),
            specs: specs.into_iter().map(Arc::new).collect(),
            guesses: Vec::new(),
        }
    }

    pub fn with_guesses(mut self, guesses: Vec<GuessRule>) -> Self {
        self.guesses = guesses;
        self
    }

    /// Whether `spec` is one of this grammar's records (by identity).
    pub fn owns(&self, spec: &Arc<ArgSpec>) -> bool {
        self.specs.iter().any(|own| Arc::ptr_eq(own, spec))
    }

    pub fn find_option(&self, flag: &str) -> Option<&Arc<ArgSpec>> {
        self.specs.iter().find(|spec| spec.flag() == Some(flag))
    }

    pub fn option_names(&self) -> Vec<&str> {
        self.specs.iter().filter_map(|spec| spec.flag()).collect()
    }

    pub fn positionals(&self) -> impl Iterator<Item = &Arc<ArgSpec>> {
        self.specs.iter().filter(|spec| spec.is_positional())
    }
}
