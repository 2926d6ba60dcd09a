use std::fs;
use std::io::{self, IsTerminal, Read};
use std::path::{Path, PathBuf};

use argspec_core::{GrammarSummary, MatchContext};
use argspec_discovery::output::serialize;
use argspec_discovery::{
    ExtractOptions, OutputFormat, ProcessHelpSource, ProgramEntries, extract_options,
    extract_program, format_entries, format_programs,
};
use argspec_engine::{Completion, EngineConfig, Session, builtin_subparsers, load_document};
use clap::{Args, Parser, Subcommand};
use serde::Serialize;
use tracing::debug;
use tracing_subscriber::EnvFilter;

/// Overrides `--log-level` when set.
const LOG_ENV: &str = "ARGSPEC_LOG";

#[derive(Debug, Parser)]
#[command(name = "argspec", version)]
#[command(about = "Argument grammar extraction and command-line completion")]
struct Cli {
    /// Log filter used when ARGSPEC_LOG is unset (e.g. `debug`,
    /// `argspec_engine=trace`).
    #[arg(long, global = true, default_value = "warn")]
    log_level: String,
    /// Engine configuration file (YAML).
    #[arg(long, global = true)]
    config: Option<PathBuf>,
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Extract option descriptions from help text.
    Extract(ExtractArgs),
    /// Compile a grammar document and print the normalized specifications.
    Compile(CompileArgs),
    /// Complete the last token of a command line.
    Complete(CompleteArgs),
}

#[derive(Debug, Args)]
struct ExtractArgs {
    /// Read help text from this file instead of stdin.
    #[arg(long, conflicts_with = "commands")]
    input: Option<PathBuf>,
    /// Comma-separated programs to run with `--help` (e.g. ls,grep,tar).
    #[arg(long)]
    commands: Option<String>,
    /// Start scanning after the first line matching this pattern.
    #[arg(long)]
    start: Option<String>,
    /// Stop scanning at the first line matching this pattern.
    #[arg(long)]
    end: Option<String>,
    /// Never fall back to manual pages when running programs.
    #[arg(long)]
    no_manual: bool,
    /// Output format.
    #[arg(long, default_value = "table")]
    format: OutputFormat,
}

#[derive(Debug, Args)]
struct CompileArgs {
    /// Grammar document (`.yaml`, `.yml` or `.json`).
    input: PathBuf,
    /// Output format.
    #[arg(long, default_value = "yaml")]
    format: OutputFormat,
}

#[derive(Debug, Clone, Copy, clap::ValueEnum)]
enum CompleteFormat {
    /// One candidate per line: value and suffix, then a tab and the
    /// annotation.
    Plain,
    Json,
}

#[derive(Debug, Args)]
struct CompleteArgs {
    /// Directory of grammar documents to register (repeatable).
    #[arg(long)]
    catalog: Vec<PathBuf>,
    /// Never run programs to discover grammars.
    #[arg(long)]
    offline: bool,
    /// Output format.
    #[arg(long, default_value = "plain")]
    format: CompleteFormat,
    /// Program whose command line is completed.
    program: String,
    /// Arguments after the program name; the last one is completed.
    #[arg(trailing_var_arg = true, allow_hyphen_values = true)]
    tokens: Vec<String>,
}

fn main() {
    let cli = Cli::parse();

    if let Err(err) = init_logging(&cli.log_level) {
        eprintln!("error: {err}");
        std::process::exit(1);
    }

    let result = load_config(cli.config.as_deref()).and_then(|config| match cli.command {
        Command::Extract(args) => run_extract(args, &config),
        Command::Compile(args) => run_compile(args),
        Command::Complete(args) => run_complete(args, config),
    });

    if let Err(err) = result {
        eprintln!("error: {err}");
        std::process::exit(1);
    }
}

fn init_logging(level: &str) -> Result<(), String> {
    let filter = match std::env::var(LOG_ENV) {
        Ok(spec) if !spec.trim().is_empty() => EnvFilter::try_new(spec),
        _ => EnvFilter::try_new(level),
    }
    .map_err(|err| format!("invalid log filter: {err}"))?;

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .with_target(true)
        .with_ansi(io::stderr().is_terminal())
        .try_init()
        .map_err(|err| format!("failed to install logging: {err}"))
}

fn load_config(path: Option<&Path>) -> Result<EngineConfig, String> {
    match path {
        Some(path) => EngineConfig::load(path)
            .map_err(|err| format!("Failed to load config '{}': {err}", path.display())),
        None => Ok(EngineConfig::default()),
    }
}

// ---------------------------------------------------------------------------
// extract
// ---------------------------------------------------------------------------

fn run_extract(args: ExtractArgs, config: &EngineConfig) -> Result<(), String> {
    let options = ExtractOptions {
        start: args.start,
        end: args.end,
        ..ExtractOptions::default()
    };

    let commands = parse_csv_list(args.commands);
    if !commands.is_empty() {
        return run_extract_commands(&commands, &options, config, !args.no_manual, args.format);
    }

    let text = match &args.input {
        Some(path) => fs::read_to_string(path)
            .map_err(|err| format!("Failed to read '{}': {err}", path.display()))?,
        None => {
            let mut text = String::new();
            io::stdin()
                .read_to_string(&mut text)
                .map_err(|err| format!("Failed to read stdin: {err}"))?;
            text
        }
    };

    let entries = extract_options(&text, &options);
    debug!(entries = entries.len(), "Extracted options from text");
    print!("{}", ensure_newline(format_entries(&entries, args.format)?));
    Ok(())
}

fn run_extract_commands(
    commands: &[String],
    options: &ExtractOptions,
    config: &EngineConfig,
    use_manual: bool,
    format: OutputFormat,
) -> Result<(), String> {
    use rayon::prelude::*;

    let source = ProcessHelpSource::new(
        config.extraction.help_timeout(),
        config.extraction.manual_width,
    );
    let use_manual = use_manual && config.extraction.use_manual;

    let programs: Vec<ProgramEntries> = commands
        .par_iter()
        .map(|program| ProgramEntries {
            program: program.clone(),
            entries: extract_program(&source, program, options, use_manual),
        })
        .collect();

    let empty: Vec<&str> = programs
        .iter()
        .filter(|program| program.entries.is_empty())
        .map(|program| program.program.as_str())
        .collect();

    print!("{}", ensure_newline(format_programs(&programs, format)?));

    if !empty.is_empty() {
        eprintln!("No options found for: {}", empty.join(", "));
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// compile
// ---------------------------------------------------------------------------

fn run_compile(args: CompileArgs) -> Result<(), String> {
    let document = load_document(&args.input).map_err(|err| err.to_string())?;
    let grammar = document
        .compile(&builtin_subparsers())
        .map_err(|err| format!("invalid grammar {}: {err}", args.input.display()))?;
    let summary = GrammarSummary::from(&grammar);
    print!("{}", ensure_newline(serialize(&summary, args.format)?));
    Ok(())
}

// ---------------------------------------------------------------------------
// complete
// ---------------------------------------------------------------------------

#[derive(Serialize)]
struct CompletionOutput<'a> {
    program: &'a str,
    stub: &'a str,
    context: Option<MatchContext>,
    name: Option<&'a str>,
    metavar: &'a str,
    fallback: bool,
    candidates: Vec<CandidateOutput>,
}

#[derive(Serialize)]
struct CandidateOutput {
    value: String,
    suffix: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    annotation: Option<String>,
}

fn run_complete(args: CompleteArgs, config: EngineConfig) -> Result<(), String> {
    let session = if args.offline {
        Session::offline(config)
    } else {
        Session::new(config)
    };
    for dir in &args.catalog {
        session
            .load_catalog(dir)
            .map_err(|err| format!("Failed to load catalog '{}': {err}", dir.display()))?;
    }

    let completion = session.complete(&args.program, args.tokens.iter().map(String::as_str));
    let candidates = candidate_outputs(&completion);

    match args.format {
        CompleteFormat::Plain => {
            for candidate in &candidates {
                match &candidate.annotation {
                    Some(annotation) => println!(
                        "{}{}\t{}",
                        candidate.value,
                        candidate.suffix,
                        annotation.trim_end()
                    ),
                    None => println!("{}{}", candidate.value, candidate.suffix),
                }
            }
        }
        CompleteFormat::Json => {
            let output = CompletionOutput {
                program: &args.program,
                stub: &completion.stub,
                context: completion.context,
                name: completion.name.as_deref(),
                metavar: &completion.metavar,
                fallback: completion.allows_fallback(),
                candidates,
            };
            let json = serde_json::to_string_pretty(&output)
                .map_err(|err| format!("Failed to serialize completion: {err}"))?;
            println!("{json}");
        }
    }
    Ok(())
}

fn candidate_outputs(completion: &Completion) -> Vec<CandidateOutput> {
    completion
        .candidates()
        .into_iter()
        .map(|candidate| CandidateOutput {
            value: candidate.value,
            suffix: candidate.suffix.unwrap_or_default(),
            annotation: candidate.annotation,
        })
        .collect()
}

fn parse_csv_list(raw: Option<String>) -> Vec<String> {
    raw.map(|value| {
        value
            .split(',')
            .map(str::trim)
            .filter(|item| !item.is_empty())
            .map(ToString::to_string)
            .collect()
    })
    .unwrap_or_default()
}

fn ensure_newline(mut text: String) -> String {
    if !text.is_empty() && !text.ends_with('\n') {
        text.push('\n');
    }
    text
}
