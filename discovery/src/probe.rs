//! Help text obtained by running the program itself.
//!
//! [`ProcessHelpSource`] runs `<program> --help` and the manual renderer.
//! Both are bounded by a timeout; a program that hangs, fails to start, or
//! prints nothing yields `None`, never an error.

use std::io::Read;
use std::process::{Child, Command, Stdio};
use std::sync::Arc;
use std::thread::JoinHandle;
use std::time::Duration;

use tracing::{debug, info};
use wait_timeout::ChildExt;

use crate::cache::ResultCache;
use crate::extractor::{ExtractOptions, OptionEntry, extract_options};
use crate::normalize::normalize_text;

/// Default limit for one help invocation.
pub const DEFAULT_HELP_TIMEOUT: Duration = Duration::from_secs(2);

/// Manual pages are rendered wide to keep option rows on one line.
pub const DEFAULT_MANUAL_WIDTH: u32 = 1000;

/// Where help text comes from.
pub trait HelpSource: Send + Sync {
    /// Output of `<program> --help`.
    fn help_text(&self, program: &str) -> Option<String>;

    /// Rendered manual page for `<program>`.
    fn manual_text(&self, program: &str) -> Option<String>;
}

/// Runs programs to capture their help output.
#[derive(Debug, Clone)]
pub struct ProcessHelpSource {
    timeout: Duration,
    manual_width: u32,
}

impl Default for ProcessHelpSource {
    fn default() -> Self {
        Self {
            timeout: DEFAULT_HELP_TIMEOUT,
            manual_width: DEFAULT_MANUAL_WIDTH,
        }
    }
}

impl ProcessHelpSource {
    pub fn new(timeout: Duration, manual_width: u32) -> Self {
        Self {
            timeout,
            manual_width,
        }
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }
}

impl HelpSource for ProcessHelpSource {
    fn help_text(&self, program: &str) -> Option<String> {
        let output = run_captured(&[program, "--help"], &[], self.timeout)?;
        // Some programs print usage on stderr.
        let text = if output.stdout.trim().is_empty() {
            output.stderr
        } else {
            output.stdout
        };
        non_empty(normalize_text(&text))
    }

    fn manual_text(&self, program: &str) -> Option<String> {
        let width = self.manual_width.to_string();
        let output = run_captured(&["man", program], &[("MANWIDTH", width.as_str())], self.timeout)?;
        non_empty(normalize_text(&output.stdout))
    }
}

/// Memoizes another source's text per program.
pub struct CachingHelpSource<S> {
    inner: S,
    cache: Arc<ResultCache<(String, bool), Option<String>>>,
    ttl: Duration,
}

impl<S: HelpSource> CachingHelpSource<S> {
    pub fn new(inner: S, cache: Arc<ResultCache<(String, bool), Option<String>>>, ttl: Duration) -> Self {
        Self { inner, cache, ttl }
    }

    pub fn inner(&self) -> &S {
        &self.inner
    }
}

impl<S: HelpSource> HelpSource for CachingHelpSource<S> {
    fn help_text(&self, program: &str) -> Option<String> {
        self.cache
            .get_or_insert_with((program.to_string(), false), self.ttl, || {
                self.inner.help_text(program)
            })
    }

    fn manual_text(&self, program: &str) -> Option<String> {
        self.cache
            .get_or_insert_with((program.to_string(), true), self.ttl, || {
                self.inner.manual_text(program)
            })
    }
}

/// Extracts `program`'s options from its help output, falling back to the
/// manual page when help yields nothing and `use_manual` is set.
pub fn extract_program(
    source: &dyn HelpSource,
    program: &str,
    options: &ExtractOptions,
    use_manual: bool,
) -> Vec<OptionEntry> {
    if let Some(text) = source.help_text(program) {
        let entries = extract_options(&text, options);
        if !entries.is_empty() {
            info!(program, entries = entries.len(), "Extracted options from help output");
            return entries;
        }
    }
    if !use_manual {
        return Vec::new();
    }
    let entries = source
        .manual_text(program)
        .map(|text| extract_options(&text, options))
        .unwrap_or_default();
    info!(program, entries = entries.len(), "Extracted options from manual page");
    entries
}

struct CapturedOutput {
    stdout: String,
    stderr: String,
}

fn run_captured(argv: &[&str], env: &[(&str, &str)], timeout: Duration) -> Option<CapturedOutput> {
    let (program, args) = argv.split_first()?;
    let mut command = Command::new(program);
    command
        .args(args)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped());
    for (key, value) in default_probe_env().iter().chain(env) {
        command.env(key, value);
    }

    let mut child = match command.spawn() {
        Ok(child) => child,
        Err(err) => {
            debug!(command = ?argv, error = %err, "Failed to spawn help probe");
            return None;
        }
    };

    // Drain both pipes in the background so a chatty child cannot block on a
    // full pipe buffer before it exits.
    let stdout_thread = drain(&mut child, true);
    let stderr_thread = drain(&mut child, false);

    match child.wait_timeout(timeout) {
        Ok(Some(status)) => {
            debug!(command = ?argv, exit_code = ?status.code(), "Help probe finished");
        }
        Ok(None) => {
            debug!(command = ?argv, timeout_ms = timeout.as_millis() as u64, "Help probe timed out");
            abandon(&mut child);
            return None;
        }
        Err(err) => {
            debug!(command = ?argv, error = %err, "Failed to wait for help probe");
            abandon(&mut child);
            return None;
        }
    }

    Some(CapturedOutput {
        stdout: join_pipe(stdout_thread),
        stderr: join_pipe(stderr_thread),
    })
}

/// Kills `child` and reaps it so no zombie is left behind.
fn abandon(child: &mut Child) {
    if let Err(err) = child.kill() {
        debug!(error = %err, "Failed to kill help probe");
    }
    if let Err(err) = child.wait() {
        debug!(error = %err, "Failed to reap help probe");
    }
}

fn drain(child: &mut Child, stdout: bool) -> Option<JoinHandle<Vec<u8>>> {
    let pipe: Box<dyn Read + Send> = if stdout {
        Box::new(child.stdout.take()?)
    } else {
        Box::new(child.stderr.take()?)
    };
    Some(std::thread::spawn(move || {
        let mut pipe = pipe;
        let mut buf = Vec::new();
        if let Err(err) = pipe.read_to_end(&mut buf) {
            debug!(error = %err, "Failed to read help probe output");
        }
        buf
    }))
}

fn join_pipe(handle: Option<JoinHandle<Vec<u8>>>) -> String {
    handle
        .and_then(|thread| thread.join().ok())
        .map(|buf| String::from_utf8_lossy(&buf).into_owned())
        .unwrap_or_default()
}

fn default_probe_env() -> &'static [(&'static str, &'static str)] {
    &[
        // Prevent graphical helpers from opening windows during probes.
        ("DISPLAY", ""),
        ("WAYLAND_DISPLAY", ""),
        ("TERM", "dumb"),
        ("NO_COLOR", "1"),
        ("PAGER", "cat"),
        ("MANPAGER", "cat"),
        ("GIT_PAGER", "cat"),
    ]
}

fn non_empty(text: String) -> Option<String> {
    (!text.trim().is_empty()).then_some(text)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[derive(Default)]
    struct CountingSource {
        calls: AtomicUsize,
    }

    impl HelpSource for CountingSource {
        fn help_text(&self, _program: &str) -> Option<String> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Some("  -x   extract\n".to_string())
        }

        fn manual_text(&self, _program: &str) -> Option<String> {
            Some("       -m\n              from the manual\n".to_string())
        }
    }

    struct SilentHelp;

    impl HelpSource for SilentHelp {
        fn help_text(&self, _program: &str) -> Option<String> {
            None
        }

        fn manual_text(&self, _program: &str) -> Option<String> {
            Some("       -m\n              from the manual\n".to_string())
        }
    }

    #[test]
    fn test_missing_program_yields_none() {
        let source = ProcessHelpSource::default();
        assert!(source.help_text("argspec-definitely-not-installed").is_none());
    }

    #[cfg(unix)]
    #[test]
    fn test_timeout_yields_none() {
        let output = run_captured(&["sleep", "5"], &[], Duration::from_millis(100));
        assert!(output.is_none());
    }

    #[cfg(unix)]
    #[test]
    fn test_abandoned_child_is_reaped() {
        let mut child = Command::new("sleep").arg("5").spawn().unwrap();
        abandon(&mut child);
        assert!(child.try_wait().unwrap().is_some());
    }

    #[cfg(unix)]
    #[test]
    fn test_captures_stdout() {
        let output = run_captured(&["echo", "  -v  verbose"], &[], Duration::from_secs(5)).unwrap();
        assert_eq!(output.stdout, "  -v  verbose\n");
    }

    #[test]
    fn test_caching_source_runs_once() {
        let cache = Arc::new(ResultCache::new(Duration::from_secs(60)));
        let source = CachingHelpSource::new(CountingSource::default(), cache, Duration::from_secs(60));

        assert!(source.help_text("tool").is_some());
        assert!(source.help_text("tool").is_some());
        assert_eq!(source.inner().calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_extract_program_prefers_help() {
        let entries = extract_program(&CountingSource::default(), "tool", &ExtractOptions::default(), true);
        assert_eq!(entries[0].flags, "-x");
    }

    #[test]
    fn test_extract_program_falls_back_to_manual() {
        let entries = extract_program(&SilentHelp, "tool", &ExtractOptions::default(), true);
        assert_eq!(entries[0].flags, "-m");
        assert_eq!(entries[0].description, "from the manual");
        assert!(extract_program(&SilentHelp, "tool", &ExtractOptions::default(), false).is_empty());
    }
}
