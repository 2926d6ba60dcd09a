//! Built-in completion providers.

use std::collections::BTreeSet;
use std::fs;
use std::path::{Path, PathBuf};

use tracing::debug;

use crate::source::{Candidate, Provider};

/// Enumerates a fixed candidate list.
#[derive(Debug, Clone, Default)]
pub struct LiteralProvider {
    candidates: Vec<Candidate>,
}

impl LiteralProvider {
    pub fn new(candidates: Vec<Candidate>) -> Self {
        Self { candidates }
    }

    pub fn from_values<I, S>(values: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::new(values.into_iter().map(Candidate::new).collect())
    }

    pub fn candidates(&self) -> &[Candidate] {
        &self.candidates
    }
}

impl Provider for LiteralProvider {
    fn complete(&self, prefix: &str) -> Vec<Candidate> {
        self.candidates
            .iter()
            .filter(|candidate| candidate.value.starts_with(prefix))
            .cloned()
            .collect()
    }
}

/// Accepts nothing and suppresses the file-name fallback.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoCompletions;

impl Provider for NoCompletions {
    fn complete(&self, _prefix: &str) -> Vec<Candidate> {
        Vec::new()
    }

    fn allows_fallback(&self) -> bool {
        false
    }
}

/// Completes file-system paths relative to the working directory.
#[derive(Debug, Clone, Default)]
pub struct PathProvider {
    directories_only: bool,
    root: Option<PathBuf>,
}

impl PathProvider {
    pub fn files() -> Self {
        Self::default()
    }

    pub fn directories() -> Self {
        Self {
            directories_only: true,
            root: None,
        }
    }

    /// Resolves relative prefixes against `root` instead of the working
    /// directory.
    pub fn rooted_at(mut self, root: impl Into<PathBuf>) -> Self {
        self.root = Some(root.into());
        self
    }

    fn search_dir(&self, dir_part: &str) -> PathBuf {
        let dir = if dir_part.is_empty() {
            Path::new(".")
        } else {
            Path::new(dir_part)
        };
        match &self.root {
            Some(root) if dir.is_relative() => root.join(dir),
            _ => dir.to_path_buf(),
        }
    }
}

impl Provider for PathProvider {
    fn complete(&self, prefix: &str) -> Vec<Candidate> {
        let (dir_part, base) = match prefix.rfind('/') {
            Some(idx) => (&prefix[..=idx], &prefix[idx + 1..]),
            None => ("", prefix),
        };
        let search_dir = self.search_dir(dir_part);
        let entries = match fs::read_dir(&search_dir) {
            Ok(entries) => entries,
            Err(err) => {
                debug!(dir = %search_dir.display(), error = %err, "Path completion skipped");
                return Vec::new();
            }
        };

        let mut out = BTreeSet::new();
        for entry in entries.flatten() {
            let name = entry.file_name().to_string_lossy().to_string();
            if !name.starts_with(base) || (name.starts_with('.') && !base.starts_with('.')) {
                continue;
            }
            let is_dir = entry.path().is_dir();
            if self.directories_only && !is_dir {
                continue;
            }
            let slash = if is_dir { "/" } else { "" };
            out.insert((format!("{dir_part}{name}{slash}"), is_dir));
        }

        out.into_iter()
            .map(|(value, is_dir)| {
                let candidate = Candidate::new(value);
                // Directories keep the token open for the next path segment.
                if is_dir {
                    candidate.with_suffix("")
                } else {
                    candidate
                }
            })
            .collect()
    }
}

/// Which account database an [`AccountProvider`] reads.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AccountKind {
    Users,
    Groups,
}

/// Completes user or group names from a `name:...` colon database.
#[derive(Debug, Clone)]
pub struct AccountProvider {
    kind: AccountKind,
    database: PathBuf,
}

impl AccountProvider {
    /// Reads `/etc/passwd` or `/etc/group`.
    pub fn system(kind: AccountKind) -> Self {
        let database = match kind {
            AccountKind::Users => "/etc/passwd",
            AccountKind::Groups => "/etc/group",
        };
        Self::with_database(kind, database)
    }

    pub fn with_database(kind: AccountKind, database: impl Into<PathBuf>) -> Self {
        Self {
            kind,
            database: database.into(),
        }
    }

    pub fn kind(&self) -> AccountKind {
        self.kind
    }
}

impl Provider for AccountProvider {
    fn complete(&self, prefix: &str) -> Vec<Candidate> {
        let raw = match fs::read_to_string(&self.database) {
            Ok(raw) => raw,
            Err(err) => {
                debug!(path = %self.database.display(), error = %err, "Account database unreadable");
                return Vec::new();
            }
        };
        let names: BTreeSet<&str> = raw
            .lines()
            .filter(|line| !line.trim_start().starts_with('#'))
            .filter_map(|line| line.split(':').next())
            .map(str::trim)
            .filter(|name| !name.is_empty() && name.starts_with(prefix))
            .collect();
        names.into_iter().map(Candidate::new).collect()
    }
}

/// Completes executable names found on a search path.
#[derive(Debug, Clone, Default)]
pub struct CommandProvider {
    search_path: Vec<PathBuf>,
}

impl CommandProvider {
    /// Uses the directories listed in `$PATH`.
    pub fn from_env() -> Self {
        let search_path = std::env::var_os("PATH")
            .map(|path| std::env::split_paths(&path).collect())
            .unwrap_or_default();
        Self { search_path }
    }

    pub fn with_search_path(search_path: Vec<PathBuf>) -> Self {
        Self { search_path }
    }
}

impl Provider for CommandProvider {
    fn complete(&self, prefix: &str) -> Vec<Candidate> {
        if prefix.contains('/') {
            return PathProvider::files().complete(prefix);
        }
        let mut names = BTreeSet::new();
        for dir in &self.search_path {
            let Ok(entries) = fs::read_dir(dir) else {
                continue;
            };
            for entry in entries.flatten() {
                let name = entry.file_name().to_string_lossy().to_string();
                if name.starts_with(prefix) && is_executable(&entry.path()) {
                    names.insert(name);
                }
            }
        }
        names.into_iter().map(Candidate::new).collect()
    }
}

#[cfg(unix)]
fn is_executable(path: &Path) -> bool {
    use std::os::unix::fs::PermissionsExt;

    fs::metadata(path)
        .map(|meta| meta.is_file() && meta.permissions().mode() & 0o111 != 0)
        .unwrap_or(false)
}

#[cfg(not(unix))]
fn is_executable(path: &Path) -> bool {
    path.is_file()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::{SystemTime, UNIX_EPOCH};

    fn scratch_dir(tag: &str) -> PathBuf {
        let nanos = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap()
            .as_nanos();
        let dir = std::env::temp_dir().join(format!("argspec-provider-{tag}-{nanos}"));
        fs::create_dir_all(&dir).unwrap();
        dir
    }

    #[test]
    fn test_literal_provider_filters_by_prefix() {
        let provider = LiteralProvider::from_values(["--output", "--verbose", "-o"]);
        let values: Vec<_> = provider
            .complete("--")
            .into_iter()
            .map(|c| c.value)
            .collect();
        assert_eq!(values, vec!["--output", "--verbose"]);
    }

    #[test]
    fn test_no_completions_blocks_fallback() {
        assert!(NoCompletions.complete("").is_empty());
        assert!(!NoCompletions.allows_fallback());
        assert!(LiteralProvider::default().allows_fallback());
    }

    #[test]
    fn test_path_provider_lists_entries() {
        let dir = scratch_dir("paths");
        fs::write(dir.join("alpha.txt"), "").unwrap();
        fs::write(dir.join(".hidden"), "").unwrap();
        fs::create_dir(dir.join("alps")).unwrap();

        let files = PathProvider::files().rooted_at(&dir);
        let values: Vec<_> = files.complete("al").into_iter().map(|c| c.value).collect();
        assert_eq!(values, vec!["alpha.txt", "alps/"]);

        let dirs = PathProvider::directories().rooted_at(&dir);
        let found = dirs.complete("");
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].value, "alps/");
        assert_eq!(found[0].suffix.as_deref(), Some(""));

        let _ = fs::remove_dir_all(dir);
    }

    #[test]
    fn test_account_provider_reads_names() {
        let dir = scratch_dir("accounts");
        let passwd = dir.join("passwd");
        fs::write(
            &passwd,
            "# comment\nroot:x:0:0::/root:/bin/sh\nrosa:x:1000:1000::/home/rosa:/bin/sh\nbin:x:1:1::/:/bin/false\n",
        )
        .unwrap();

        let provider = AccountProvider::with_database(AccountKind::Users, &passwd);
        let values: Vec<_> = provider.complete("ro").into_iter().map(|c| c.value).collect();
        assert_eq!(values, vec!["root", "rosa"]);

        let _ = fs::remove_dir_all(dir);
    }

    #[test]
    fn test_missing_account_database_is_empty() {
        let provider =
            AccountProvider::with_database(AccountKind::Groups, "/nonexistent/argspec/group");
        assert!(provider.complete("").is_empty());
    }
}
