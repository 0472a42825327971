//! Poll loop driving selection, extraction, change detection and dispatch.
//!
//! One cycle runs to completion before the next starts. The loop owns the
//! [`WatcherState`]; nothing else reads or writes it.

use crate::config::WatcherConfig;
use crate::monitoring::change_detector::{should_notify, Decision};
use crate::monitoring::log_selector::select_latest;
use crate::monitoring::status::{Observation, StatusValue};
use crate::monitoring::status_extractor::extract_latest_status;
use crate::notification::{SinkDispatcher, SinkResult};
use crate::state::WatcherState;
use crate::utils::WatcherError;
use std::fmt;
use std::path::PathBuf;
use std::time::Duration;
use tracing::{debug, info, instrument, warn};

/// Poll loop phases
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Idle,
    Selecting,
    Extracting,
    Deciding,
    Dispatching,
    Backoff,
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Phase::Idle => "idle",
            Phase::Selecting => "selecting",
            Phase::Extracting => "extracting",
            Phase::Deciding => "deciding",
            Phase::Dispatching => "dispatching",
            Phase::Backoff => "backoff",
        };
        f.write_str(name)
    }
}

/// Result of a single poll cycle
#[derive(Debug)]
pub enum CycleOutcome {
    /// A new value (or the degraded sentinel) went to the sinks
    Delivered {
        status: StatusValue,
        results: Vec<SinkResult>,
    },
    /// Nothing changed since the last delivery
    Unchanged,
    /// Selection or extraction failed; state untouched
    BackedOff(WatcherError),
}

impl CycleOutcome {
    /// Phase the loop enters after this cycle
    pub fn next_phase(&self) -> Phase {
        match self {
            CycleOutcome::BackedOff(_) => Phase::Backoff,
            _ => Phase::Idle,
        }
    }
}

/// Status poll loop
pub struct PollLoop {
    logs_path: PathBuf,
    pattern: String,
    dispatcher: SinkDispatcher,
    state: WatcherState,
    poll_interval: Duration,
    backoff_interval: Duration,
}

impl PollLoop {
    pub fn new(config: &WatcherConfig, dispatcher: SinkDispatcher) -> Self {
        Self {
            logs_path: config.logs_path.clone(),
            pattern: config.log_file_pattern.clone(),
            dispatcher,
            state: WatcherState::new(),
            poll_interval: config.poll_interval,
            backoff_interval: config.backoff_interval,
        }
    }

    /// Replace the initial state
    pub fn with_state(mut self, state: WatcherState) -> Self {
        self.state = state;
        self
    }

    /// Override the poll and backoff delays
    pub fn with_intervals(mut self, poll_interval: Duration, backoff_interval: Duration) -> Self {
        self.poll_interval = poll_interval;
        self.backoff_interval = backoff_interval;
        self
    }

    /// Run one select → extract → decide → dispatch cycle
    #[instrument(skip(self), level = "debug")]
    pub async fn poll_once(&mut self) -> CycleOutcome {
        let log_file = match select_latest(&self.logs_path, &self.pattern) {
            Ok(path) => path,
            Err(e) => {
                warn!(
                    phase = %Phase::Selecting,
                    kind = e.kind(),
                    error = %e,
                    "Error finding log file"
                );
                return CycleOutcome::BackedOff(e);
            }
        };

        let observation = match extract_latest_status(&log_file) {
            Ok(observation) => observation,
            Err(e) => {
                warn!(
                    phase = %Phase::Extracting,
                    kind = e.kind(),
                    error = %e,
                    "Error reading log file"
                );
                return CycleOutcome::BackedOff(e);
            }
        };

        let status = match should_notify(&observation, self.state.last_delivered()) {
            Decision::Notify(status) => status,
            Decision::Suppress => {
                debug!(
                    phase = %Phase::Deciding,
                    file = %log_file.display(),
                    "Status unchanged"
                );
                return CycleOutcome::Unchanged;
            }
        };

        if observation == Observation::Empty {
            warn!(
                file = %log_file.display(),
                status = %status,
                "No availability marker found yet, reporting degraded status"
            );
        } else {
            info!(
                file = %log_file.display(),
                status = %status,
                previous = ?self.state.last_delivered().map(StatusValue::as_str),
                "New status"
            );
        }

        let results = self.dispatcher.dispatch(&status).await;

        let failed = results.iter().filter(|r| !r.is_success()).count();
        if failed > 0 {
            warn!(
                phase = %Phase::Dispatching,
                failed = failed,
                total = results.len(),
                "Some sinks failed, status recorded anyway"
            );
        }

        self.state.record_delivery(status.clone());

        CycleOutcome::Delivered { status, results }
    }

    /// Poll forever. Cancel by dropping the future.
    pub async fn run(&mut self) {
        info!(
            logs_path = %self.logs_path.display(),
            pattern = %self.pattern,
            poll_interval_secs = self.poll_interval.as_secs_f64(),
            backoff_interval_secs = self.backoff_interval.as_secs_f64(),
            sinks = self.dispatcher.len(),
            "Status watcher started"
        );

        loop {
            let outcome = self.poll_once().await;
            tokio::time::sleep(self.delay_after(&outcome)).await;
        }
    }

    /// Run a fixed number of cycles, sleeping between them as `run` does
    pub async fn run_iterations(&mut self, iterations: usize) -> Vec<CycleOutcome> {
        let mut outcomes = Vec::with_capacity(iterations);

        for i in 0..iterations {
            let outcome = self.poll_once().await;
            if i + 1 < iterations {
                tokio::time::sleep(self.delay_after(&outcome)).await;
            }
            outcomes.push(outcome);
        }

        outcomes
    }

    fn delay_after(&self, outcome: &CycleOutcome) -> Duration {
        match outcome.next_phase() {
            Phase::Backoff => self.backoff_interval,
            _ => self.poll_interval,
        }
    }

    pub fn state(&self) -> &WatcherState {
        &self.state
    }

    pub fn dispatcher(&self) -> &SinkDispatcher {
        &self.dispatcher
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::notification::StatusSink;
    use crate::utils::SinkError;
    use async_trait::async_trait;
    use std::env::temp_dir;
    use std::fs;
    use std::sync::{Arc, Mutex};
    use uuid::Uuid;

    struct CountingSink {
        calls: Arc<Mutex<Vec<String>>>,
    }

    #[async_trait]
    impl StatusSink for CountingSink {
        fn name(&self) -> &str {
            "counting"
        }

        async fn deliver(&self, status: &StatusValue) -> Result<(), SinkError> {
            self.calls.lock().unwrap().push(status.to_string());
            Ok(())
        }
    }

    fn create_test_loop(logs_path: PathBuf) -> (PollLoop, Arc<Mutex<Vec<String>>>) {
        let calls = Arc::new(Mutex::new(Vec::new()));
        let sink = CountingSink {
            calls: Arc::clone(&calls),
        };
        let config = WatcherConfig::from_lookup(|name| match name {
            "LOGS_PATH" => Some(logs_path.display().to_string()),
            _ => None,
        })
        .expect("config should load");
        let dispatcher = SinkDispatcher::new(vec![Box::new(sink)], Duration::from_secs(1));
        let poll_loop = PollLoop::new(&config, dispatcher)
            .with_intervals(Duration::from_millis(1), Duration::from_millis(1));
        (poll_loop, calls)
    }

    fn create_test_dir() -> PathBuf {
        let dir = temp_dir().join(format!("test_poll_loop_{}", Uuid::new_v4()));
        fs::create_dir_all(&dir).expect("Failed to create test dir");
        dir
    }

    #[tokio::test]
    async fn should_back_off_without_touching_state_when_no_file() {
        // Arrange
        let dir = create_test_dir();
        let (mut poll_loop, calls) = create_test_loop(dir);

        // Act
        let outcome = poll_loop.poll_once().await;

        // Assert
        assert!(matches!(
            outcome,
            CycleOutcome::BackedOff(WatcherError::NoLogFileFound { .. })
        ));
        assert_eq!(outcome.next_phase(), Phase::Backoff);
        assert!(poll_loop.state().last_delivered().is_none());
        assert!(calls.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn should_deliver_first_status_then_suppress_repeat() {
        // Arrange
        let dir = create_test_dir();
        fs::write(dir.join("MSTeams_2024-05-01.log"), "availability: Busy\n")
            .expect("Failed to write log");
        let (mut poll_loop, calls) = create_test_loop(dir);

        // Act
        let outcomes = poll_loop.run_iterations(2).await;

        // Assert
        assert!(matches!(&outcomes[0], CycleOutcome::Delivered { status, .. } if status.as_str() == "Busy"));
        assert!(matches!(outcomes[1], CycleOutcome::Unchanged));
        assert_eq!(*calls.lock().unwrap(), vec!["Busy".to_string()]);
        assert_eq!(
            poll_loop.state().last_delivered(),
            Some(&StatusValue::from("Busy"))
        );
    }

    #[tokio::test]
    async fn should_follow_newer_rotated_file() {
        // Arrange
        let dir = create_test_dir();
        fs::write(dir.join("MSTeams_2024-05-01.log"), "availability: Away\n")
            .expect("Failed to write log");
        let (mut poll_loop, calls) = create_test_loop(dir.clone());
        poll_loop.poll_once().await;

        // Act
        fs::write(dir.join("MSTeams_2024-05-02.log"), "availability: Available\n")
            .expect("Failed to write log");
        poll_loop.poll_once().await;

        // Assert
        assert_eq!(
            *calls.lock().unwrap(),
            vec!["Away".to_string(), "Available".to_string()]
        );
    }

    #[test]
    fn should_display_phase_names() {
        assert_eq!(Phase::Selecting.to_string(), "selecting");
        assert_eq!(Phase::Backoff.to_string(), "backoff");
    }
}
