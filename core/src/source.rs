//! Completion sources: what can be typed into a value slot.
//!
//! A [`CompletionSource`] is attached to every value slot of an
//! [`ArgSpec`](crate::ArgSpec). It is either already resolvable
//! ([`Literal`](CompletionSource::Literal), [`Static`](CompletionSource::Static),
//! [`None`](CompletionSource::None)) or deferred until the command line has
//! been matched ([`Guess`](CompletionSource::Guess),
//! [`Dynamic`](CompletionSource::Dynamic)).

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use crate::provider::{AccountKind, AccountProvider, CommandProvider, PathProvider};

/// One completion candidate.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Candidate {
    /// Text that replaces the stub.
    pub value: String,
    /// Human-readable description shown beside the candidate.
    pub annotation: Option<String>,
    /// Token-termination string overriding the completion's default suffix.
    pub suffix: Option<String>,
}

impl Candidate {
    pub fn new(value: impl Into<String>) -> Self {
        Self {
            value: value.into(),
            annotation: None,
            suffix: None,
        }
    }

    pub fn with_annotation(mut self, annotation: impl Into<String>) -> Self {
        let annotation = annotation.into();
        self.annotation = (!annotation.is_empty()).then_some(annotation);
        self
    }

    pub fn with_suffix(mut self, suffix: impl Into<String>) -> Self {
        self.suffix = Some(suffix.into());
        self
    }
}

/// An enumerable source of candidates.
pub trait Provider: Send + Sync + fmt::Debug {
    /// Returns every candidate starting with `prefix`.
    fn complete(&self, prefix: &str) -> Vec<Candidate>;

    /// Whether the host may fall back to file-name completion when this
    /// provider yields nothing.
    fn allows_fallback(&self) -> bool {
        true
    }
}

/// Produces a source at resolution time from the values already seen.
pub trait Generator: Send + Sync + fmt::Debug {
    fn generate(&self, context: &ParseContext) -> CompletionSource;
}

/// [`Generator`] backed by a closure.
pub struct FnGenerator<F>(F);

impl<F> fmt::Debug for FnGenerator<F> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("FnGenerator")
    }
}

impl<F> Generator for FnGenerator<F>
where
    F: Fn(&ParseContext) -> CompletionSource + Send + Sync,
{
    fn generate(&self, context: &ParseContext) -> CompletionSource {
        (self.0)(context)
    }
}

/// Describes what can go into one value slot.
///
/// # Examples
///
/// ```
/// use argspec_core::CompletionSource;
///
/// let source = CompletionSource::literal(["json", "yaml", "json"]);
/// assert_eq!(source, CompletionSource::Literal(vec!["json".into(), "yaml".into()]));
/// assert_eq!(CompletionSource::default(), CompletionSource::Guess);
/// ```
#[derive(Clone, Default)]
pub enum CompletionSource {
    /// A fixed enumeration.
    Literal(Vec<String>),
    /// Inferred from the option name and metavar.
    #[default]
    Guess,
    /// Explicitly nothing; suppresses the file-name fallback.
    None,
    /// Computed from the parse context when resolved.
    Dynamic(Arc<dyn Generator>),
    /// Already resolvable.
    Static(Arc<dyn Provider>),
}

impl CompletionSource {
    /// Builds a literal enumeration, dropping duplicates while keeping order.
    pub fn literal<I, S>(items: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut values: Vec<String> = Vec::new();
        for item in items {
            let item = item.into();
            if !values.contains(&item) {
                values.push(item);
            }
        }
        Self::Literal(values)
    }

    pub fn dynamic<F>(generator: F) -> Self
    where
        F: Fn(&ParseContext) -> CompletionSource + Send + Sync + 'static,
    {
        Self::Dynamic(Arc::new(FnGenerator(generator)))
    }

    pub fn provider(provider: impl Provider + 'static) -> Self {
        Self::Static(Arc::new(provider))
    }

    pub fn files() -> Self {
        Self::provider(PathProvider::files())
    }

    pub fn directories() -> Self {
        Self::provider(PathProvider::directories())
    }

    pub fn users() -> Self {
        Self::provider(AccountProvider::system(AccountKind::Users))
    }

    pub fn groups() -> Self {
        Self::provider(AccountProvider::system(AccountKind::Groups))
    }

    pub fn commands() -> Self {
        Self::provider(CommandProvider::from_env())
    }

    /// Whether resolution must wait for the resolver.
    pub fn is_deferred(&self) -> bool {
        matches!(self, Self::Guess | Self::Dynamic(_))
    }

    /// Short label used in summaries and logs.
    pub fn label(&self) -> String {
        match self {
            Self::Literal(values) => format!("{{{}}}", values.join(",")),
            Self::Guess => "guess".to_string(),
            Self::None => "none".to_string(),
            Self::Dynamic(generator) => format!("dynamic:{generator:?}"),
            Self::Static(provider) => format!("{provider:?}"),
        }
    }
}

impl fmt::Debug for CompletionSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Literal(values) => f.debug_tuple("Literal").field(values).finish(),
            Self::Guess => f.write_str("Guess"),
            Self::None => f.write_str("None"),
            Self::Dynamic(generator) => f.debug_tuple("Dynamic").field(generator).finish(),
            Self::Static(provider) => f.debug_tuple("Static").field(provider).finish(),
        }
    }
}

impl PartialEq for CompletionSource {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::Literal(a), Self::Literal(b)) => a == b,
            (Self::Guess, Self::Guess) | (Self::None, Self::None) => true,
            (Self::Dynamic(a), Self::Dynamic(b)) => Arc::ptr_eq(a, b),
            (Self::Static(a), Self::Static(b)) => Arc::ptr_eq(a, b),
            _ => false,
        }
    }
}

/// One value slot of a specification.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Action {
    /// Placeholder naming the expected value (e.g. `FILE`).
    pub metavar: String,
    pub source: CompletionSource,
    /// Literal appended after a successful completion of this slot.
    pub suffix: Option<String>,
}

impl Action {
    pub fn new(metavar: impl Into<String>, source: CompletionSource) -> Self {
        Self {
            metavar: metavar.into(),
            source,
            suffix: None,
        }
    }

    /// Placeholder slot resolved by guessing from `metavar`.
    pub fn guess(metavar: impl Into<String>) -> Self {
        Self::new(metavar, CompletionSource::Guess)
    }

    pub fn with_suffix(mut self, suffix: impl Into<String>) -> Self {
        self.suffix = Some(suffix.into());
        self
    }
}

/// Values seen earlier on the command line, keyed by specification name.
///
/// Each occurrence of a specification contributes one value list, so
/// `-I a -I b` yields `[["a"], ["b"]]` under `-I`. Options without values
/// contribute an empty list.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ParseContext {
    values: HashMap<String, Vec<Vec<String>>>,
}

impl ParseContext {
    pub fn new() -> Self {
        Self::default()
    }

    /// Records one occurrence of `name`.
    pub fn insert(&mut self, name: impl Into<String>, values: Vec<String>) {
        self.values.entry(name.into()).or_default().push(values);
    }

    /// Every value list recorded for `name`.
    pub fn get(&self, name: &str) -> &[Vec<String>] {
        self.values.get(name).map(Vec::as_slice).unwrap_or_default()
    }

    pub fn seen(&self, name: &str) -> bool {
        self.values.contains_key(name)
    }

    /// The most recent value list recorded for `name`.
    pub fn last(&self, name: &str) -> Option<&[String]> {
        self.get(name).last().map(Vec::as_slice)
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.values.keys().map(String::as_str)
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}
