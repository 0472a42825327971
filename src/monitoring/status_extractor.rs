//! Extracts the latest `availability:` marker from a log file

use crate::monitoring::status::{Observation, StatusValue};
use crate::utils::WatcherError;
use regex::bytes::Regex;
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;
use std::sync::OnceLock;
use tracing::debug;

const MARKER_PATTERN: &str = r"availability:\s+(\w+)";

fn marker() -> &'static Regex {
    static MARKER: OnceLock<Regex> = OnceLock::new();
    MARKER.get_or_init(|| Regex::new(MARKER_PATTERN).expect("marker pattern is valid"))
}

/// Scan `path` and return the token of the last marker line.
///
/// The whole file is read on every call, line by line as raw bytes, so bytes
/// that are not valid UTF-8 never fail the scan. A readable file without
/// any marker yields [`Observation::Empty`]; open or I/O errors yield
/// [`WatcherError::LogReadFailure`].
pub fn extract_latest_status(path: &Path) -> Result<Observation, WatcherError> {
    let read_failure = |source| WatcherError::LogReadFailure {
        path: path.to_path_buf(),
        source,
    };

    let file = File::open(path).map_err(read_failure)?;
    let reader = BufReader::new(file);

    let mut latest: Option<String> = None;
    let mut lines_scanned = 0usize;

    for line_result in reader.split(b'\n') {
        let line = line_result.map_err(read_failure)?;
        lines_scanned += 1;

        if let Some(token) = match_marker(&line) {
            // Keep overwriting; the last occurrence wins
            latest = Some(token.to_string());
        }
    }

    debug!(
        file = %path.display(),
        lines = lines_scanned,
        found = latest.is_some(),
        "Scanned log file for availability marker"
    );

    Ok(match latest {
        Some(token) => Observation::Status(StatusValue::new(token)),
        None => Observation::Empty,
    })
}

/// Token captured by the marker pattern on a single line, if any
pub fn match_marker(line: &[u8]) -> Option<&str> {
    // `\w` only matches encoded word characters, so the capture is valid UTF-8
    marker()
        .captures(line)
        .and_then(|caps| caps.get(1))
        .and_then(|m| std::str::from_utf8(m.as_bytes()).ok())
}
