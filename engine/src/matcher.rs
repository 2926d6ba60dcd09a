//! Token-by-token matching of a command line against a grammar.
//!
//! Every consumed token produces one [`MatchRecord`]. Tokens that match
//! nothing are recorded as `unknown-option` / `unknown-positional` with a
//! catch-all source listing the options still available, so the last token
//! can always be completed.
//!
//! # Example
//!
//! ```
//! use argspec_core::*;
//! use argspec_engine::Matcher;
//!
//! let grammar = compile_grammar(
//!     "tool",
//!     &[
//!         SpecDecl::option("-o, --output ARG"),
//!         SpecDecl::option("-v"),
//!         SpecDecl::positional("* FILE"),
//!     ],
//!     &CompileOptions::default(),
//! )
//! .unwrap();
//!
//! let state = Matcher::new(&()).parse(ParseState::new(["-v", "foo"], grammar.specs.clone()));
//! assert_eq!(state.history.len(), 2);
//! assert_eq!(state.history[0].name, "-v");
//! assert_eq!(state.history[1].context, MatchContext::Positional);
//! assert_eq!(state.history[1].stub, "foo");
//! ```

use std::sync::Arc;

use argspec_core::{
    Action, ArgSpec, Candidate, CompletionSource, GrammarLookup, LiteralProvider, MatchContext,
    MatchRecord, OptionStyle, ParseState, PositionalIndex,
};
use tracing::{debug, trace};

/// Ends option processing when it is not the token being completed.
pub const END_OF_OPTIONS: &str = "--";

/// Walks tokens against a specification list.
///
/// `grammars` is handed to subparsers that need another program's grammar.
#[derive(Clone, Copy)]
pub struct Matcher<'a> {
    grammars: &'a dyn GrammarLookup,
}

enum OptionHit {
    /// The token names the option; values follow as separate tokens.
    Named(Arc<ArgSpec>),
    /// The token carries the first value after the flag and delimiter.
    Inline(Arc<ArgSpec>, String),
    /// Several options fit equally well.
    Ambiguous,
    Miss,
}

impl<'a> Matcher<'a> {
    pub fn new(grammars: &'a dyn GrammarLookup) -> Self {
        Self { grammars }
    }

    /// Consumes every token in `state`.
    pub fn parse(&self, mut state: ParseState) -> ParseState {
        let mut options_ended = false;

        while let Some(token) = state.tokens.pop_front() {
            let is_last = state.tokens.is_empty();

            if !options_ended && token == END_OF_OPTIONS && !is_last {
                options_ended = true;
                push_marker(&mut state, token);
                continue;
            }

            let flag_like = is_flag_like(&token, is_last);
            if !options_ended && self.wants_option(&state, flag_like) {
                match find_option(&state.specs, &token, is_last) {
                    OptionHit::Named(spec) => {
                        state = self.accept_option(state, spec, token, None);
                        continue;
                    }
                    OptionHit::Inline(spec, value) => {
                        state = self.accept_option(state, spec, token, Some(value));
                        continue;
                    }
                    OptionHit::Ambiguous => {
                        debug!(token = %token, "Ambiguous option");
                        push_unknown(&mut state, token, MatchContext::UnknownOption);
                        continue;
                    }
                    OptionHit::Miss => {
                        if let Some((spec, rest)) = split_cluster(&state.specs, &token, is_last) {
                            state = self.accept_cluster(state, spec, rest);
                            continue;
                        }
                        if flag_like {
                            push_unknown(&mut state, token, MatchContext::UnknownOption);
                            continue;
                        }
                    }
                }
            }

            match first_positional(&state.specs) {
                Some(spec) => state = self.accept_positional(state, spec, token, options_ended),
                None => push_unknown(&mut state, token, MatchContext::UnknownPositional),
            }
        }

        trace!(records = state.history.len(), "Matched command line");
        state
    }

    fn wants_option(&self, state: &ParseState, flag_like: bool) -> bool {
        flag_like
            || !state.specs.iter().any(|spec| spec.is_positional())
            || state
                .specs
                .iter()
                .filter_map(|spec| spec.flag())
                .any(|flag| !flag.starts_with('-'))
    }

    fn accept_option(
        &self,
        mut state: ParseState,
        spec: Arc<ArgSpec>,
        token: String,
        inline: Option<String>,
    ) -> ParseState {
        let occurrence = state.next_occurrence();
        let name = spec.flag().unwrap_or_default().to_string();
        let catch_all = catch_all(&state.specs);
        filter_specs(&mut state.specs, &spec);

        let mut values = Vec::new();
        match inline {
            Some(value) => {
                if let Some(action) = spec.actions.first() {
                    state.history.push(MatchRecord {
                        context: MatchContext::Option,
                        name: name.clone(),
                        spec: Some(spec.clone()),
                        action: action.clone(),
                        slot: Some(0),
                        occurrence,
                        values: Vec::new(),
                        stub: value.clone(),
                    });
                }
                values.push(value);
            }
            None => state.history.push(MatchRecord {
                context: MatchContext::Option,
                name: name.clone(),
                spec: Some(spec.clone()),
                action: catch_all,
                slot: None,
                occurrence,
                values: Vec::new(),
                stub: token,
            }),
        }

        if let Some(subparser) = spec.subparser.clone() {
            return subparser.0.parse(state, self.grammars);
        }

        let first_slot = values.len();
        for slot in first_slot..spec.actions.len() {
            let Some(next) = state.tokens.front() else {
                break;
            };
            if spec.value_optional
                && (spec.style == OptionStyle::Inline || is_flag_like(next, state.tokens.len() == 1))
            {
                break;
            }
            let Some(value) = state.tokens.pop_front() else {
                break;
            };
            state.history.push(MatchRecord {
                context: MatchContext::Option,
                name: name.clone(),
                spec: Some(spec.clone()),
                action: spec.actions[slot].clone(),
                slot: Some(slot),
                occurrence,
                values: values.clone(),
                stub: value.clone(),
            });
            values.push(value);
        }
        state
    }

    /// `-vofile`: `-v` matched; `rest` is `ofile`.
    fn accept_cluster(&self, mut state: ParseState, spec: Arc<ArgSpec>, rest: String) -> ParseState {
        let flag = spec.flag().unwrap_or_default().to_string();
        if spec.takes_value() {
            return self.accept_option(state, spec, flag, Some(rest));
        }
        state.tokens.push_front(format!("-{rest}"));
        self.accept_option(state, spec, flag, None)
    }

    fn accept_positional(
        &self,
        mut state: ParseState,
        spec: Arc<ArgSpec>,
        token: String,
        options_ended: bool,
    ) -> ParseState {
        let occurrence = state.next_occurrence();
        let name = spec.label();
        filter_specs(&mut state.specs, &spec);

        let record = |slot: usize, values: &[String], stub: String| MatchRecord {
            context: MatchContext::Positional,
            name: name.clone(),
            spec: Some(spec.clone()),
            action: spec.actions.get(slot).cloned().unwrap_or_default(),
            slot: Some(slot),
            occurrence,
            values: values.to_vec(),
            stub,
        };

        if spec.index() != Some(PositionalIndex::Rest) {
            state.history.push(record(0, &[], token));
            if let Some(subparser) = spec.subparser.clone() {
                return subparser.0.parse(state, self.grammars);
            }
            return state;
        }

        let last_slot = spec.actions.len().saturating_sub(1);
        let mut values: Vec<String> = Vec::new();
        let mut current = token;
        loop {
            state.history.push(record(values.len().min(last_slot), &values, current.clone()));
            values.push(current);

            if let Some(subparser) = spec.subparser.clone() {
                return subparser.0.parse(state, self.grammars);
            }
            let Some(next) = state.tokens.front() else {
                break;
            };
            if !options_ended && is_flag_like(next, state.tokens.len() == 1) {
                break;
            }
            match state.tokens.pop_front() {
                Some(next) => current = next,
                None => break,
            }
        }
        state
    }
}

/// A token looks like a flag if it starts with `-`; a lone `-` only counts
/// while it is being completed.
pub fn is_flag_like(token: &str, is_last: bool) -> bool {
    token.starts_with('-') && (token.len() > 1 || is_last)
}

fn find_option(specs: &[Arc<ArgSpec>], token: &str, is_last: bool) -> OptionHit {
    if let Some(spec) = specs.iter().find(|spec| spec.flag() == Some(token)) {
        return OptionHit::Named(spec.clone());
    }

    // Longest `flag + delimiter` prefix among inline-capable options.
    let mut best: Option<(usize, &Arc<ArgSpec>)> = None;
    let mut tied = false;
    for spec in specs {
        let Some(flag) = spec.flag() else {
            continue;
        };
        if !spec.takes_value() || !spec.style.accepts_inline() {
            continue;
        }
        let head = format!("{flag}{}", spec.delimiter);
        if token.len() <= flag.len() || !token.starts_with(&head) {
            continue;
        }
        match best {
            Some((len, _)) if len > head.len() => {}
            Some((len, _)) if len == head.len() => tied = true,
            _ => {
                best = Some((head.len(), spec));
                tied = false;
            }
        }
    }
    if tied {
        return OptionHit::Ambiguous;
    }
    if let Some((len, spec)) = best {
        return OptionHit::Inline(spec.clone(), token[len..].to_string());
    }

    abbreviation(specs, token, is_last)
}

/// GNU-style unique prefixes of long options: `--verb` for `--verbose`.
fn abbreviation(specs: &[Arc<ArgSpec>], token: &str, is_last: bool) -> OptionHit {
    if !token.starts_with("--") || token.len() < 3 {
        return OptionHit::Miss;
    }
    let (name, value) = match token.split_once('=') {
        Some((name, value)) => (name, Some(value)),
        // A final token without a value may still be growing.
        None if is_last => return OptionHit::Miss,
        None => (token, None),
    };

    let mut matches = specs.iter().filter(|spec| {
        spec.flag()
            .is_some_and(|flag| flag.starts_with("--") && flag.starts_with(name))
    });
    let Some(spec) = matches.next() else {
        return OptionHit::Miss;
    };
    if matches.next().is_some() {
        return OptionHit::Ambiguous;
    }
    match value {
        Some(value) if spec.takes_value() && spec.style.accepts_inline() => {
            OptionHit::Inline(spec.clone(), value.to_string())
        }
        Some(_) => OptionHit::Miss,
        None => OptionHit::Named(spec.clone()),
    }
}

/// Peels one short option off a cluster such as `-vx`.
fn split_cluster(
    specs: &[Arc<ArgSpec>],
    token: &str,
    is_last: bool,
) -> Option<(Arc<ArgSpec>, String)> {
    if token.starts_with("--") || !token.starts_with('-') || token.chars().count() < 3 {
        return None;
    }
    // `-nam` while completing `-name` is not a cluster.
    if is_last
        && specs
            .iter()
            .filter_map(|spec| spec.flag())
            .any(|flag| flag.starts_with(token))
    {
        return None;
    }
    let split = token.char_indices().nth(2).map(|(idx, _)| idx)?;
    let (head, rest) = token.split_at(split);
    let spec = specs.iter().find(|spec| spec.flag() == Some(head))?;
    // `-v-` would requeue as `--`; only a value-taking head may keep a dash.
    if rest.starts_with('-') && !spec.takes_value() {
        return None;
    }
    Some((spec.clone(), rest.to_string()))
}

fn first_positional(specs: &[Arc<ArgSpec>]) -> Option<Arc<ArgSpec>> {
    specs
        .iter()
        .filter(|spec| spec.is_positional())
        .min_by_key(|spec| spec.index())
        .cloned()
}

/// Removes the matched spec (unless it may repeat), its aliases, and
/// everything it excludes.
pub fn filter_specs(specs: &mut Vec<Arc<ArgSpec>>, matched: &ArgSpec) {
    let keeps_itself = matched.is_unbounded() || matched.repeatable;
    specs.retain(|spec| {
        let is_same = spec.name == matched.name
            || spec
                .flag()
                .is_some_and(|flag| matched.aliases.iter().any(|alias| alias == flag));
        if is_same && !keeps_itself {
            return false;
        }
        !matched.excludes.iter().any(|exclusion| exclusion.covers(spec))
    });
}

/// Completion source listing every active option name.
pub fn catch_all(specs: &[Arc<ArgSpec>]) -> Action {
    let candidates = specs
        .iter()
        .filter_map(|spec| {
            spec.flag().map(|flag| {
                Candidate::new(flag)
                    .with_annotation(spec.help.clone())
                    .with_suffix(spec.suffix.clone())
            })
        })
        .collect();
    Action::new("", CompletionSource::provider(LiteralProvider::new(candidates)))
}

fn push_unknown(state: &mut ParseState, token: String, context: MatchContext) {
    let occurrence = state.next_occurrence();
    let action = catch_all(&state.specs);
    state.history.push(MatchRecord {
        context,
        name: token.clone(),
        spec: None,
        action,
        slot: None,
        occurrence,
        values: Vec::new(),
        stub: token,
    });
}

fn push_marker(state: &mut ParseState, token: String) {
    let occurrence = state.next_occurrence();
    state.history.push(MatchRecord {
        context: MatchContext::Option,
        name: token.clone(),
        spec: None,
        action: Action::new("", CompletionSource::None),
        slot: None,
        occurrence,
        values: Vec::new(),
        stub: token,
    });
}

#[cfg(test)]
mod tests {
    use super::*;
    use argspec_core::{CompileOptions, Provider, SpecDecl, compile};

    fn specs(decls: &[SpecDecl]) -> Vec<Arc<ArgSpec>> {
        compile(decls, &CompileOptions::default())
            .unwrap()
            .into_iter()
            .map(Arc::new)
            .collect()
    }

    fn run(decls: &[SpecDecl], tokens: &[&str]) -> ParseState {
        Matcher::new(&()).parse(ParseState::new(tokens.iter().copied(), specs(decls)))
    }

    fn names(state: &ParseState) -> Vec<(MatchContext, &str, &str)> {
        state
            .history
            .iter()
            .map(|r| (r.context, r.name.as_str(), r.stub.as_str()))
            .collect()
    }

    fn offered(record: &MatchRecord, prefix: &str) -> Vec<String> {
        match &record.action.source {
            CompletionSource::Static(provider) => provider
                .complete(prefix)
                .into_iter()
                .map(|c| c.value)
                .collect(),
            other => panic!("expected a static source, got {other:?}"),
        }
    }

    #[test]
    fn test_separate_value_consumes_next_token() {
        let state = run(&[SpecDecl::option("-o, --output ARG")], &["-o", "out.txt"]);
        assert_eq!(
            names(&state),
            vec![
                (MatchContext::Option, "-o", "-o"),
                (MatchContext::Option, "-o", "out.txt"),
            ]
        );
        assert_eq!(state.history[1].slot, Some(0));
        assert_eq!(state.history[1].action.metavar, "ARG");
    }

    #[test]
    fn test_inline_value() {
        let state = run(&[SpecDecl::option("--output=FILE")], &["--output=a.txt"]);
        assert_eq!(state.history.len(), 1);
        assert_eq!(state.history[0].stub, "a.txt");
        assert_eq!(state.history[0].slot, Some(0));
    }

    #[test]
    fn test_empty_inline_value_is_being_completed() {
        let state = run(&[SpecDecl::option("--output=FILE")], &["--output="]);
        assert_eq!(state.history[0].stub, "");
        assert!(state.history[0].is_value());
    }

    #[test]
    fn test_longest_prefix_wins() {
        let short = ArgSpec::option("-f").with_style(OptionStyle::Inline, "");
        let long = ArgSpec::option("-file=")
            .with_style(OptionStyle::Inline, "")
            .with_action(Action::new("FILE", CompletionSource::None));
        let state = Matcher::new(&()).parse(ParseState::new(
            ["-file=x"],
            vec![Arc::new(short), Arc::new(long)],
        ));
        assert_eq!(state.history[0].name, "-file=");
        assert_eq!(state.history[0].stub, "x");
    }

    #[test]
    fn test_equal_prefixes_are_ambiguous() {
        let a = ArgSpec::option("-Da")
            .with_style(OptionStyle::Inline, "")
            .with_action(Action::guess("X"));
        let b = ArgSpec::option("-Db")
            .with_style(OptionStyle::Inline, "")
            .with_action(Action::guess("X"));
        let c = ArgSpec::option("-Dc")
            .with_style(OptionStyle::Inline, "=")
            .with_action(Action::guess("X"));
        let d = ArgSpec::option("-Dc=")
            .with_style(OptionStyle::Inline, "")
            .with_action(Action::guess("X"));
        let state = Matcher::new(&()).parse(ParseState::new(
            ["-Dc=1"],
            vec![Arc::new(a), Arc::new(b), Arc::new(c), Arc::new(d)],
        ));
        assert_eq!(state.history[0].context, MatchContext::UnknownOption);
    }

    #[test]
    fn test_optional_inline_value_consumes_no_token() {
        let state = run(
            &[SpecDecl::option("--color[=WHEN]"), SpecDecl::positional("* FILE")],
            &["--color", "src"],
        );
        assert_eq!(
            names(&state),
            vec![
                (MatchContext::Option, "--color", "--color"),
                (MatchContext::Positional, "*", "src"),
            ]
        );
    }

    #[test]
    fn test_short_cluster_splits() {
        let state = run(
            &[SpecDecl::option("-v"), SpecDecl::option("-x"), SpecDecl::positional("* FILE")],
            &["-vx", "a"],
        );
        assert_eq!(
            names(&state),
            vec![
                (MatchContext::Option, "-v", "-v"),
                (MatchContext::Option, "-x", "-x"),
                (MatchContext::Positional, "*", "a"),
            ]
        );
    }

    #[test]
    fn test_cluster_passes_rest_as_value() {
        let state = run(&[SpecDecl::option("-v"), SpecDecl::option("-o FILE")], &["-vofile"]);
        assert_eq!(
            names(&state),
            vec![
                (MatchContext::Option, "-v", "-v"),
                (MatchContext::Option, "-o", "file"),
            ]
        );
    }

    #[test]
    fn test_cluster_remainder_never_becomes_end_of_options() {
        let state = run(
            &[SpecDecl::option("-v"), SpecDecl::option("-x"), SpecDecl::positional("* FILE")],
            &["-v-", "-x", ""],
        );
        assert_eq!(
            names(&state),
            vec![
                (MatchContext::UnknownOption, "-v-", "-v-"),
                (MatchContext::Option, "-x", "-x"),
                (MatchContext::Positional, "*", ""),
            ]
        );
    }

    #[test]
    fn test_cluster_dash_is_a_value_for_value_taking_head() {
        let state = run(&[SpecDecl::option("-o FILE"), SpecDecl::option("-x")], &["-o-", "-x"]);
        assert_eq!(state.history[0].name, "-o");
        assert_eq!(state.history[0].stub, "-");
        assert_eq!(state.history[1].context, MatchContext::Option);
    }

    #[test]
    fn test_last_token_prefixing_a_long_name_is_not_split() {
        let state = run(&[SpecDecl::option("-n"), SpecDecl::option("-name PATTERN")], &["-nam"]);
        assert_eq!(state.history[0].context, MatchContext::UnknownOption);
        assert_eq!(offered(&state.history[0], "-nam"), vec!["-name"]);
    }

    #[test]
    fn test_long_abbreviation() {
        let state = run(
            &[SpecDecl::option("--verbose"), SpecDecl::positional("* FILE")],
            &["--verb", "x"],
        );
        assert_eq!(state.history[0].name, "--verbose");
        assert_eq!(state.history[0].stub, "--verb");
    }

    #[test]
    fn test_ambiguous_abbreviation_is_unknown() {
        let state = run(
            &[SpecDecl::option("--verbose"), SpecDecl::option("--version")],
            &["--ver", ""],
        );
        assert_eq!(state.history[0].context, MatchContext::UnknownOption);
    }

    #[test]
    fn test_matched_option_and_aliases_are_removed() {
        let state = run(&[SpecDecl::option("-a, --all"), SpecDecl::option("-l")], &["--all", "-"]);
        let last = state.history.last().unwrap();
        assert_eq!(last.context, MatchContext::UnknownOption);
        assert_eq!(offered(last, "-"), vec!["-l"]);
    }

    #[test]
    fn test_repeatable_option_stays() {
        let state = run(&[SpecDecl::option("-v").repeatable()], &["-v", "-v"]);
        assert_eq!(state.history[1].context, MatchContext::Option);
        assert_eq!(state.history[1].occurrence, 1);
    }

    #[test]
    fn test_exclude_all_options() {
        let state = run(
            &[
                SpecDecl::option("--version").excludes(["-"]),
                SpecDecl::option("-x"),
                SpecDecl::positional("* FILE"),
            ],
            &["--version", "-x", "a", "-"],
        );
        assert!(state.history[1..].iter().all(|r| r.context != MatchContext::Option));
        assert!(state.specs.iter().all(|spec| spec.is_positional()));
        // Flag-like words stay unknown options; plain words fill the wildcard.
        assert_eq!(state.history[1].context, MatchContext::UnknownOption);
        assert_eq!(state.history[2].context, MatchContext::Positional);
        assert_eq!(state.history[3].context, MatchContext::UnknownOption);
    }

    #[test]
    fn test_indexed_positionals_in_order() {
        let state = run(
            &[
                SpecDecl::positional("1 DEST"),
                SpecDecl::positional("0 SRC"),
                SpecDecl::positional("0 OTHER"),
            ],
            &["a", "b", "c"],
        );
        assert_eq!(
            names(&state),
            vec![
                (MatchContext::Positional, "0", "a"),
                (MatchContext::Positional, "1", "b"),
                (MatchContext::UnknownPositional, "c", "c"),
            ]
        );
        assert_eq!(state.history[0].action.metavar, "SRC");
    }

    #[test]
    fn test_wildcard_cycles_actions_and_clamps() {
        let state = run(&[SpecDecl::positional("* KEY VALUE")], &["a", "b", "c"]);
        let metavars: Vec<_> = state.history.iter().map(|r| r.action.metavar.as_str()).collect();
        assert_eq!(metavars, vec!["KEY", "VALUE", "VALUE"]);
        assert!(state.history.iter().all(|r| r.occurrence == 0));
        assert_eq!(state.history[2].values, vec!["a", "b"]);
    }

    #[test]
    fn test_end_of_options_marker() {
        let state = run(
            &[SpecDecl::option("-v"), SpecDecl::positional("* FILE")],
            &["--", "-v", "x"],
        );
        assert_eq!(
            names(&state)[1..],
            [
                (MatchContext::Positional, "*", "-v"),
                (MatchContext::Positional, "*", "x"),
            ]
        );
    }

    #[test]
    fn test_options_without_dash_are_tried_first() {
        let state = run(
            &[SpecDecl::option("if=FILE"), SpecDecl::positional("* OPERAND")],
            &["if=in.img", "bs"],
        );
        assert_eq!(state.history[0].name, "if");
        assert_eq!(state.history[0].stub, "in.img");
        assert_eq!(state.history[1].context, MatchContext::Positional);
    }

    #[test]
    fn test_flag_record_offers_active_options_with_suffix() {
        let state = run(&[SpecDecl::option("--output=FILE"), SpecDecl::option("-v")], &["--output"]);
        let CompletionSource::Static(provider) = &state.history[0].action.source else {
            panic!("flag record should carry the option list");
        };
        let found = provider.complete("--out");
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].suffix.as_deref(), Some("="));
    }
}
