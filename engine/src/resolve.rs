//! Turns a match trace into the provider for the token being completed.

use std::fmt;
use std::sync::Arc;

use argspec_core::{
    CompletionSource, GuessRule, LiteralProvider, MatchContext, MatchRecord, NoCompletions,
    ParseContext, PathProvider, Provider, guess_source,
};
use tracing::{debug, warn};
use unicode_width::{UnicodeWidthChar, UnicodeWidthStr};

use crate::config::CompletionConfig;

/// Generators returning generators are followed at most this deep.
pub const MAX_GENERATOR_DEPTH: usize = 8;

const ELLIPSIS: char = '…';

/// Presentation and guessing knobs for [`resolve`].
#[derive(Debug, Clone)]
pub struct ResolveOptions {
    pub annotate: bool,
    pub annotation_width: usize,
    /// Consulted before the built-in guess table for deferred slots.
    pub guesses: Vec<GuessRule>,
}

impl Default for ResolveOptions {
    fn default() -> Self {
        Self::from(&CompletionConfig::default())
    }
}

impl From<&CompletionConfig> for ResolveOptions {
    fn from(config: &CompletionConfig) -> Self {
        Self {
            annotate: config.annotate,
            annotation_width: config.annotation_width,
            guesses: Vec::new(),
        }
    }
}

/// The outcome of resolving a command line.
#[derive(Clone)]
pub struct Completion {
    provider: Arc<dyn Provider>,
    /// Termination appended after a candidate without its own suffix.
    pub suffix: String,
    /// Partial text being completed.
    pub stub: String,
    /// `None` when the command line was empty.
    pub context: Option<MatchContext>,
    pub name: Option<String>,
    pub metavar: String,
    annotate: bool,
    annotation_width: usize,
}

impl fmt::Debug for Completion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Completion")
            .field("provider", &self.provider)
            .field("suffix", &self.suffix)
            .field("stub", &self.stub)
            .field("context", &self.context)
            .field("name", &self.name)
            .field("metavar", &self.metavar)
            .finish()
    }
}

impl Completion {
    pub fn provider(&self) -> &Arc<dyn Provider> {
        &self.provider
    }

    /// Whether the host may offer file names when no candidate is returned.
    pub fn allows_fallback(&self) -> bool {
        self.provider.allows_fallback()
    }

    /// Candidates for the stub, each with an explicit suffix and, when
    /// enabled, a fitted annotation.
    pub fn candidates(&self) -> Vec<argspec_core::Candidate> {
        self.complete(&self.stub)
    }

    /// Candidates for an arbitrary prefix.
    pub fn complete(&self, prefix: &str) -> Vec<argspec_core::Candidate> {
        self.provider
            .complete(prefix)
            .into_iter()
            .map(|mut candidate| {
                if candidate.suffix.is_none() {
                    candidate.suffix = Some(self.suffix.clone());
                }
                candidate.annotation = if self.annotate {
                    candidate
                        .annotation
                        .map(|text| fit_annotation(&text, self.annotation_width))
                } else {
                    None
                };
                candidate
            })
            .collect()
    }
}

/// Resolves the provider for the last record of `history`.
///
/// An empty history completes file names.
///
/// # Examples
///
/// ```
/// use argspec_engine::{ResolveOptions, resolve};
///
/// let completion = resolve(&[], &ResolveOptions::default());
/// assert_eq!(completion.stub, "");
/// assert!(completion.allows_fallback());
/// ```
pub fn resolve(history: &[MatchRecord], options: &ResolveOptions) -> Completion {
    let Some(last) = history.last() else {
        return Completion {
            provider: Arc::new(PathProvider::files()),
            suffix: " ".to_string(),
            stub: String::new(),
            context: None,
            name: None,
            metavar: String::new(),
            annotate: options.annotate,
            annotation_width: options.annotation_width,
        };
    };

    // The in-progress occurrence ends with the stub being completed.
    let context = ParseContext::from_history(history);
    let source = resolve_source(&last.action.source, last, &context, options, 0);
    debug!(
        name = %last.name,
        context = %last.context,
        source = %source.label(),
        stub = %last.stub,
        "Resolved completion source"
    );

    Completion {
        provider: into_provider(source),
        suffix: last.action.suffix.clone().unwrap_or_else(|| " ".to_string()),
        stub: last.stub.clone(),
        context: Some(last.context),
        name: Some(last.name.clone()),
        metavar: last.action.metavar.clone(),
        annotate: options.annotate,
        annotation_width: options.annotation_width,
    }
}

fn resolve_source(
    source: &CompletionSource,
    record: &MatchRecord,
    context: &ParseContext,
    options: &ResolveOptions,
    depth: usize,
) -> CompletionSource {
    match source {
        CompletionSource::Guess => {
            guess_source(&record.name, &record.action.metavar, &options.guesses)
        }
        CompletionSource::Dynamic(generator) if depth < MAX_GENERATOR_DEPTH => {
            let produced = generator.generate(context);
            resolve_source(&produced, record, context, options, depth + 1)
        }
        CompletionSource::Dynamic(_) => {
            warn!(name = %record.name, depth, "Generator chain too deep, completing nothing");
            CompletionSource::None
        }
        other => other.clone(),
    }
}

fn into_provider(source: CompletionSource) -> Arc<dyn Provider> {
    match source {
        CompletionSource::Static(provider) => provider,
        CompletionSource::Literal(values) => Arc::new(LiteralProvider::from_values(values)),
        CompletionSource::None => Arc::new(NoCompletions),
        CompletionSource::Guess | CompletionSource::Dynamic(_) => Arc::new(PathProvider::files()),
    }
}

/// Collapses whitespace and fits `text` to exactly `width` display columns,
/// truncating with an ellipsis or padding with spaces.
///
/// # Examples
///
/// ```
/// use argspec_engine::fit_annotation;
///
/// assert_eq!(fit_annotation("list  all", 10), "list all  ");
/// assert_eq!(fit_annotation("do not ignore entries", 8), "do not …");
/// ```
pub fn fit_annotation(text: &str, width: usize) -> String {
    if width == 0 {
        return String::new();
    }
    let text = text.split_whitespace().collect::<Vec<_>>().join(" ");
    let current = text.width();
    if current <= width {
        return format!("{text}{}", " ".repeat(width - current));
    }

    let mut out = String::new();
    let mut used = 0;
    for ch in text.chars() {
        let ch_width = ch.width().unwrap_or(0);
        if used + ch_width + 1 > width {
            break;
        }
        out.push(ch);
        used += ch_width;
    }
    out.push(ELLIPSIS);
    used += 1;
    out.extend(std::iter::repeat_n(' ', width.saturating_sub(used)));
    out
}
