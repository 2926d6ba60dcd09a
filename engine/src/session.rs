//! The completion entry point: registered grammars, discovered grammars and
//! the caches behind them.

use std::collections::HashMap;
use std::path::Path;
use std::sync::{Arc, RwLock};

use argspec_core::{
    CompileOptions, Grammar, GrammarDocument, GrammarLookup, MatchRecord, ParseState, SpecDecl,
    Subparser, compile, compile_grammar,
};
use argspec_discovery::{
    CachingHelpSource, Clock, ExtractOptions, HelpSource, OptionEntry, ProcessHelpSource,
    ResultCache, SystemClock, extract_program,
};
use tracing::{debug, info, warn};

use crate::catalog::Catalog;
use crate::config::EngineConfig;
use crate::error::Result;
use crate::matcher::Matcher;
use crate::resolve::{Completion, ResolveOptions, resolve};
use crate::subparser::{COMMAND_METAVAR, CommandSubparser, program_name};

/// Subparser names available to every grammar.
pub fn builtin_subparsers() -> HashMap<String, Arc<dyn Subparser>> {
    HashMap::from([
        (
            "command".to_string(),
            Arc::new(CommandSubparser::new()) as Arc<dyn Subparser>,
        ),
        (
            "exec".to_string(),
            Arc::new(CommandSubparser::exec()) as Arc<dyn Subparser>,
        ),
    ])
}

/// Completes command lines for any number of programs.
///
/// Programs without a registered grammar get one built from their own help
/// output, kept for the configured grammar lifetime.
///
/// # Examples
///
/// ```
/// use argspec_core::{CompileOptions, SpecDecl, compile_grammar};
/// use argspec_engine::{EngineConfig, Session};
///
/// let session = Session::offline(EngineConfig::default());
/// session.register(
///     compile_grammar(
///         "tool",
///         &[SpecDecl::option("--format {json|yaml}")],
///         &CompileOptions::default(),
///     )
///     .unwrap(),
/// );
///
/// let completion = session.complete("tool", ["--format", "y"]);
/// let values: Vec<_> = completion.candidates().into_iter().map(|c| c.value).collect();
/// assert_eq!(values, vec!["yaml"]);
/// ```
pub struct Session {
    config: EngineConfig,
    registered: RwLock<HashMap<String, Arc<Grammar>>>,
    discovered: ResultCache<String, Option<Arc<Grammar>>>,
    help: Option<Box<dyn HelpSource>>,
    subparsers: HashMap<String, Arc<dyn Subparser>>,
    resolve: ResolveOptions,
}

impl Session {
    /// A session that runs programs to discover grammars.
    pub fn new(config: EngineConfig) -> Self {
        let clock: Arc<dyn Clock> = Arc::new(SystemClock);
        let process = ProcessHelpSource::new(
            config.extraction.help_timeout(),
            config.extraction.manual_width,
        );
        let help_cache = Arc::new(ResultCache::with_clock(config.cache.max_ttl(), clock.clone()));
        let help = CachingHelpSource::new(process, help_cache, config.cache.help_ttl());
        Self::build(config, Some(Box::new(help)), clock)
    }

    /// A session that only knows registered grammars.
    pub fn offline(config: EngineConfig) -> Self {
        Self::build(config, None, Arc::new(SystemClock))
    }

    /// A session discovering grammars through `help`, with cache lifetimes
    /// measured by `clock`.
    pub fn with_help_source(
        config: EngineConfig,
        help: Box<dyn HelpSource>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self::build(config, Some(help), clock)
    }

    fn build(config: EngineConfig, help: Option<Box<dyn HelpSource>>, clock: Arc<dyn Clock>) -> Self {
        let resolve = ResolveOptions::from(&config.completion);
        Self {
            discovered: ResultCache::with_clock(config.cache.max_ttl(), clock),
            registered: RwLock::new(HashMap::new()),
            subparsers: builtin_subparsers(),
            resolve,
            help,
            config,
        }
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Adds a named subparser for later registrations.
    pub fn add_subparser(&mut self, name: impl Into<String>, subparser: Arc<dyn Subparser>) {
        self.subparsers.insert(name.into(), subparser);
    }

    pub fn compile_options(&self) -> CompileOptions {
        CompileOptions {
            subparsers: self.subparsers.clone(),
            ..CompileOptions::default()
        }
    }

    /// Registers a grammar, replacing any earlier one for the same program.
    pub fn register(&self, grammar: Grammar) {
        debug!(program = %grammar.program, specs = grammar.specs.len(), "Registered grammar");
        self.write_registered()
            .insert(grammar.program.clone(), Arc::new(grammar));
    }

    /// Compiles and registers declarations for `program`.
    pub fn register_decls(&self, program: &str, decls: &[SpecDecl]) -> Result<()> {
        let grammar = compile_grammar(program, decls, &self.compile_options())?;
        self.register(grammar);
        Ok(())
    }

    pub fn register_document(&self, document: &GrammarDocument) -> Result<()> {
        let grammar = document.compile(&self.subparsers)?;
        self.register(grammar);
        Ok(())
    }

    /// Registers every grammar in a catalog directory and returns how many
    /// were loaded.
    pub fn load_catalog(&self, dir: impl AsRef<Path>) -> Result<usize> {
        let grammars = Catalog::from_dir(dir.as_ref())?.compile(&self.subparsers)?;
        let count = grammars.len();
        for grammar in grammars {
            self.register(grammar);
        }
        info!(dir = %dir.as_ref().display(), grammars = count, "Loaded grammar catalog");
        Ok(count)
    }

    /// Registered grammar for `program`, else one discovered from its help.
    pub fn grammar_for(&self, program: &str) -> Option<Arc<Grammar>> {
        let program = program_name(program);
        if let Some(grammar) = self.read_registered().get(program) {
            return Some(grammar.clone());
        }
        let help = self.help.as_deref()?;
        self.discovered.get_or_insert_with(
            program.to_string(),
            self.config.cache.grammar_ttl(),
            || self.discover(help, program),
        )
    }

    /// Matches `tokens` (arguments after the program name).
    pub fn parse<I, S>(&self, program: &str, tokens: I) -> ParseState
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.match_line(program, tokens).1
    }

    /// Completes the last of `tokens`.
    ///
    /// Pass an empty final token to complete a fresh word. Deferred guesses
    /// consult the hints of the grammar that matched that token.
    pub fn complete<I, S>(&self, program: &str, tokens: I) -> Completion
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let (grammar, state) = self.match_line(program, tokens);
        debug!(program, records = state.history.len(), "Matched command line");
        match self.owning_grammar(grammar, &state.history) {
            Some(owner) if !owner.guesses.is_empty() => {
                let mut options = self.resolve.clone();
                options.guesses.splice(0..0, owner.guesses.iter().cloned());
                resolve(&state.history, &options)
            }
            _ => resolve(&state.history, &self.resolve),
        }
    }

    /// Drops expired discovered grammars, or all of them when `force` is set.
    pub fn flush(&self, force: bool) -> usize {
        self.discovered.flush(force)
    }

    fn match_line<I, S>(&self, program: &str, tokens: I) -> (Option<Arc<Grammar>>, ParseState)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let grammar = self.grammar_for(program);
        let specs = grammar
            .as_ref()
            .map(|grammar| grammar.specs.clone())
            .unwrap_or_default();
        let state = Matcher::new(self).parse(ParseState::new(tokens, specs));
        (grammar, state)
    }

    /// The grammar whose specification produced the last record: the
    /// program's own, else that of the innermost embedded command.
    fn owning_grammar(
        &self,
        top: Option<Arc<Grammar>>,
        history: &[MatchRecord],
    ) -> Option<Arc<Grammar>> {
        let spec = history.last()?.spec.as_ref()?;
        if let Some(top) = top.filter(|grammar| grammar.owns(spec)) {
            return Some(top);
        }
        history
            .iter()
            .rev()
            .filter(|record| record.spec.is_none() && record.name == COMMAND_METAVAR)
            .filter_map(|record| self.grammar_for(&record.stub))
            .find(|grammar| grammar.owns(spec))
    }

    fn discover(&self, help: &dyn HelpSource, program: &str) -> Option<Arc<Grammar>> {
        let entries = extract_program(
            help,
            program,
            &ExtractOptions::default(),
            self.config.extraction.use_manual,
        );
        if entries.is_empty() {
            debug!(program, "No options discovered");
            return None;
        }
        match grammar_from_entries(program, &entries, &self.compile_options()) {
            Ok(grammar) => Some(Arc::new(grammar)),
            Err(err) => {
                warn!(program, error = %err, "Discovered options do not compile");
                None
            }
        }
    }

    fn read_registered(&self) -> std::sync::RwLockReadGuard<'_, HashMap<String, Arc<Grammar>>> {
        self.registered
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn write_registered(&self) -> std::sync::RwLockWriteGuard<'_, HashMap<String, Arc<Grammar>>> {
        self.registered
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl GrammarLookup for Session {
    fn grammar(&self, program: &str) -> Option<Arc<Grammar>> {
        self.grammar_for(program)
    }
}

/// Builds a grammar from extracted entries plus a wildcard file positional.
///
/// Entries that do not compile, or that repeat an earlier spelling, are
/// skipped.
pub fn grammar_from_entries(
    program: &str,
    entries: &[OptionEntry],
    options: &CompileOptions,
) -> Result<Grammar> {
    let mut seen: Vec<String> = Vec::new();
    let mut decls = Vec::new();
    for entry in entries {
        let decl = SpecDecl::option(entry.descriptor());
        let specs = match compile(std::slice::from_ref(&decl), options) {
            Ok(specs) => specs,
            Err(err) => {
                debug!(program, flags = %entry.flags, error = %err, "Skipping option entry");
                continue;
            }
        };
        let flags: Vec<String> = specs
            .iter()
            .filter_map(|spec| spec.flag().map(str::to_string))
            .collect();
        if flags.iter().any(|flag| seen.contains(flag)) {
            debug!(program, flags = %entry.flags, "Skipping repeated option entry");
            continue;
        }
        seen.extend(flags);
        decls.push(decl);
    }
    decls.push(SpecDecl::positional("* FILE"));
    Ok(compile_grammar(program, &decls, options)?)
}
