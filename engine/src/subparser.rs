//! Built-in subparsers.

use std::path::Path;

use argspec_core::{
    Action, CompletionSource, GrammarLookup, MatchContext, MatchRecord, ParseState, Subparser,
};
use tracing::debug;

use crate::matcher::Matcher;

/// Metavar of the embedded program name.
pub const COMMAND_METAVAR: &str = "COMMAND";

/// Treats the following tokens as another program's command line.
///
/// The first token is completed from executable names; later tokens are
/// matched against the embedded program's grammar. With terminators (as in
/// `find -exec ... ;`) the embedded command line ends at the first
/// terminator that is not the token being completed, and the outer grammar
/// resumes after it.
#[derive(Debug, Clone, Default)]
pub struct CommandSubparser {
    terminators: Vec<String>,
}

impl CommandSubparser {
    /// Consumes every remaining token.
    pub fn new() -> Self {
        Self::default()
    }

    pub fn terminated_by<I, S>(terminators: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            terminators: terminators.into_iter().map(Into::into).collect(),
        }
    }

    /// `find -exec CMD ... ;` and `find -exec CMD ... {} +`.
    pub fn exec() -> Self {
        Self::terminated_by([";", "+"])
    }
}

impl Subparser for CommandSubparser {
    fn parse(&self, mut state: ParseState, grammars: &dyn GrammarLookup) -> ParseState {
        let mut inner = Vec::new();
        let mut terminator = None;
        while let Some(token) = state.tokens.pop_front() {
            if !state.tokens.is_empty() && self.terminators.contains(&token) {
                terminator = Some(token);
                break;
            }
            inner.push(token);
        }

        let mut inner = inner.into_iter();
        let Some(command) = inner.next() else {
            return finish(state, terminator);
        };

        let occurrence = state.next_occurrence();
        state.history.push(MatchRecord {
            context: MatchContext::Positional,
            name: COMMAND_METAVAR.to_string(),
            spec: None,
            action: Action::new(COMMAND_METAVAR, CompletionSource::commands()),
            slot: Some(0),
            occurrence,
            values: Vec::new(),
            stub: command.clone(),
        });

        let arguments: Vec<String> = inner.collect();
        if !arguments.is_empty() {
            let program = program_name(&command);
            let specs = grammars
                .grammar(program)
                .map(|grammar| grammar.specs.clone())
                .unwrap_or_default();
            debug!(
                program,
                known = !specs.is_empty(),
                tokens = arguments.len(),
                "Matching embedded command"
            );

            let nested = ParseState {
                tokens: arguments.into(),
                specs,
                history: std::mem::take(&mut state.history),
            };
            state.history = Matcher::new(grammars).parse(nested).history;
        }

        finish(state, terminator)
    }
}

fn finish(mut state: ParseState, terminator: Option<String>) -> ParseState {
    if let Some(token) = terminator {
        let occurrence = state.next_occurrence();
        state.history.push(MatchRecord {
            context: MatchContext::Positional,
            name: token.clone(),
            spec: None,
            action: Action::new("", CompletionSource::None),
            slot: None,
            occurrence,
            values: Vec::new(),
            stub: token,
        });
    }
    state
}

/// `/usr/bin/ls` names the `ls` grammar.
pub fn program_name(command: &str) -> &str {
    Path::new(command)
        .file_name()
        .and_then(|name| name.to_str())
        .unwrap_or(command)
}
