use std::io;
use std::path::PathBuf;
use std::time::Duration;

/// Errors raised while selecting or reading the watched log file.
///
/// None of these are fatal: the poll loop logs them, backs off and retries
/// without touching the last delivered status.
#[derive(Debug, thiserror::Error)]
pub enum WatcherError {
    #[error("no log file matching '{pattern}' in {}", .directory.display())]
    NoLogFileFound { directory: PathBuf, pattern: String },

    #[error("failed to list log directory {}: {source}", .directory.display())]
    DirectoryUnreadable {
        directory: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("invalid log file pattern '{pattern}': {source}")]
    InvalidPattern {
        pattern: String,
        #[source]
        source: regex::Error,
    },

    #[error("failed to read log file {}: {source}", .path.display())]
    LogReadFailure {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

impl WatcherError {
    /// Error kind label used as a structured log field
    pub fn kind(&self) -> &'static str {
        match self {
            WatcherError::NoLogFileFound { .. } => "no_log_file_found",
            WatcherError::DirectoryUnreadable { .. } => "directory_unreadable",
            WatcherError::InvalidPattern { .. } => "invalid_pattern",
            WatcherError::LogReadFailure { .. } => "log_read_failure",
        }
    }
}

/// Reason a single sink failed to deliver a status
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SinkError {
    #[error("transport error: {0}")]
    Transport(String),

    #[error("endpoint returned {status}: {body}")]
    HttpStatus { status: u16, body: String },

    #[error("publish failed: {0}")]
    Publish(String),

    #[error("timed out after {0:?}")]
    Timeout(Duration),
}
