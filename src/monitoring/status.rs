//! Status values observed in the watched log

use std::fmt;

/// Value delivered when the watcher runs but no status could be derived yet
pub const DEGRADED_STATUS: &str = "Error";

/// Opaque status token taken from an `availability:` marker line.
///
/// Only equality is meaningful; the watcher never interprets the token.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct StatusValue(String);

impl StatusValue {
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    /// Sentinel reported when the first cycle finds no marker
    pub fn degraded() -> Self {
        Self(DEGRADED_STATUS.to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_degraded(&self) -> bool {
        self.0 == DEGRADED_STATUS
    }
}

impl fmt::Display for StatusValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for StatusValue {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

/// Outcome of scanning a log file that could be read
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Observation {
    /// Last marker value in the file
    Status(StatusValue),
    /// The file was readable but held no marker line
    Empty,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn should_compare_by_token() {
        assert_eq!(StatusValue::from("Away"), StatusValue::new("Away".to_string()));
        assert_ne!(StatusValue::from("Away"), StatusValue::from("away"));
    }

    #[test]
    fn should_build_degraded_sentinel() {
        let status = StatusValue::degraded();

        assert_eq!(status.as_str(), "Error");
        assert!(status.is_degraded());
        assert!(!StatusValue::from("Busy").is_degraded());
    }

    #[test]
    fn should_display_raw_token() {
        assert_eq!(StatusValue::from("DoNotDisturb").to_string(), "DoNotDisturb");
    }
}
