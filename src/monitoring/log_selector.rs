//! Picks the current log file among rotated candidates.
//!
//! Rotated files embed a sortable timestamp in their name
//! (`MSTeams_2024-05-01_09-30-00.log`), so the greatest file name is the
//! newest stream. Modification times are never consulted. Names that do not
//! sort in timestamp order make the choice undefined.

use crate::utils::WatcherError;
use regex::Regex;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Return the lexicographically greatest file in `directory` whose name
/// matches the glob `pattern`.
///
/// Fails with [`WatcherError::NoLogFileFound`] when nothing matches.
pub fn select_latest(directory: &Path, pattern: &str) -> Result<PathBuf, WatcherError> {
    let matcher = glob_to_regex(pattern).map_err(|source| WatcherError::InvalidPattern {
        pattern: pattern.to_string(),
        source,
    })?;

    let entries = fs::read_dir(directory).map_err(|source| WatcherError::DirectoryUnreadable {
        directory: directory.to_path_buf(),
        source,
    })?;

    let mut candidates: Vec<PathBuf> = entries
        .filter_map(|entry| entry.ok())
        .map(|entry| entry.path())
        .filter(|path| path.is_file())
        .filter(|path| {
            path.file_name()
                .and_then(|name| name.to_str())
                .map(|name| matcher.is_match(name))
                .unwrap_or(false)
        })
        .collect();

    // Descending by file name
    candidates.sort_by(|a, b| b.file_name().cmp(&a.file_name()));

    debug!(
        directory = %directory.display(),
        pattern = %pattern,
        candidates = candidates.len(),
        "Listed log file candidates"
    );

    candidates
        .into_iter()
        .next()
        .ok_or_else(|| WatcherError::NoLogFileFound {
            directory: directory.to_path_buf(),
            pattern: pattern.to_string(),
        })
}

/// Compile a file name glob into an anchored regex.
///
/// `*` matches any run of characters and `?` a single character; everything
/// else is literal.
fn glob_to_regex(pattern: &str) -> Result<Regex, regex::Error> {
    let mut regex_pattern = String::with_capacity(pattern.len() * 2 + 2);
    regex_pattern.push('^');
    for ch in pattern.chars() {
        match ch {
            '*' => regex_pattern.push_str("[^/]*"),
            '?' => regex_pattern.push_str("[^/]"),
            other => regex_pattern.push_str(&regex::escape(&other.to_string())),
        }
    }
    regex_pattern.push('$');
    Regex::new(&regex_pattern)
}
