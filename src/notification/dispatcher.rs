//! Fans a status value out to every configured sink

use crate::monitoring::StatusValue;
use crate::notification::sink::{SinkResult, StatusSink};
use crate::utils::SinkError;
use std::time::Duration;
use tracing::{error, info, instrument, warn};

/// Sequential dispatcher over independent sinks.
///
/// Each sink call is bounded by `timeout`; a failure or timeout in one sink
/// is recorded in its own [`SinkResult`] and never stops the next sink.
pub struct SinkDispatcher {
    sinks: Vec<Box<dyn StatusSink>>,
    timeout: Duration,
}

impl SinkDispatcher {
    pub fn new(sinks: Vec<Box<dyn StatusSink>>, timeout: Duration) -> Self {
        if sinks.is_empty() {
            warn!("No sinks configured, status changes will only be logged");
        }
        Self { sinks, timeout }
    }

    /// Deliver `status` to every sink in order
    #[instrument(skip(self), fields(status = %status, sinks = self.sinks.len()))]
    pub async fn dispatch(&self, status: &StatusValue) -> Vec<SinkResult> {
        let mut results = Vec::with_capacity(self.sinks.len());

        for sink in &self.sinks {
            let outcome = match tokio::time::timeout(self.timeout, sink.deliver(status)).await {
                Ok(outcome) => outcome,
                Err(_) => Err(SinkError::Timeout(self.timeout)),
            };

            match &outcome {
                Ok(()) => info!(sink = %sink.name(), status = %status, "Status delivered"),
                Err(e) => error!(
                    sink = %sink.name(),
                    status = %status,
                    error = %e,
                    "Sink delivery failed"
                ),
            }

            results.push(SinkResult {
                sink: sink.name().to_string(),
                outcome,
            });
        }

        results
    }

    /// Close every sink, in order
    pub async fn close(&self) {
        for sink in &self.sinks {
            sink.close().await;
        }
    }

    pub fn len(&self) -> usize {
        self.sinks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sinks.is_empty()
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::sync::{Arc, Mutex};

    /// Records every delivery and answers with a fixed outcome
    struct RecordingSink {
        name: &'static str,
        fail_with: Option<SinkError>,
        delay: Option<Duration>,
        log: Arc<Mutex<Vec<(String, String)>>>,
    }

    #[async_trait]
    impl StatusSink for RecordingSink {
        fn name(&self) -> &str {
            self.name
        }

        async fn deliver(&self, status: &StatusValue) -> Result<(), SinkError> {
            if let Some(delay) = self.delay {
                tokio::time::sleep(delay).await;
            }
            self.log
                .lock()
                .unwrap()
                .push((self.name.to_string(), status.to_string()));
            match &self.fail_with {
                Some(e) => Err(e.clone()),
                None => Ok(()),
            }
        }
    }

    fn sink(
        name: &'static str,
        fail_with: Option<SinkError>,
        log: &Arc<Mutex<Vec<(String, String)>>>,
    ) -> Box<dyn StatusSink> {
        Box::new(RecordingSink {
            name,
            fail_with,
            delay: None,
            log: Arc::clone(log),
        })
    }

    #[tokio::test]
    async fn should_deliver_same_value_to_every_sink_in_order() {
        // Arrange
        let log = Arc::new(Mutex::new(Vec::new()));
        let dispatcher = SinkDispatcher::new(
            vec![sink("http", None, &log), sink("mqtt", None, &log)],
            Duration::from_secs(1),
        );

        // Act
        let results = dispatcher.dispatch(&StatusValue::from("Busy")).await;

        // Assert
        assert_eq!(
            results,
            vec![SinkResult::success("http"), SinkResult::success("mqtt")]
        );
        assert_eq!(
            *log.lock().unwrap(),
            vec![
                ("http".to_string(), "Busy".to_string()),
                ("mqtt".to_string(), "Busy".to_string())
            ]
        );
    }

    #[tokio::test]
    async fn should_continue_after_failing_sink() {
        // Arrange
        let log = Arc::new(Mutex::new(Vec::new()));
        let failure = SinkError::Transport("connection refused".to_string());
        let dispatcher = SinkDispatcher::new(
            vec![
                sink("http", Some(failure.clone()), &log),
                sink("mqtt", None, &log),
            ],
            Duration::from_secs(1),
        );

        // Act
        let results = dispatcher.dispatch(&StatusValue::from("Away")).await;

        // Assert
        assert_eq!(results[0], SinkResult::failure("http", failure));
        assert!(results[1].is_success());
        assert_eq!(log.lock().unwrap().len(), 2);
    }

    #[tokio::test]
    async fn should_report_timeout_for_hung_sink() {
        // Arrange
        let log = Arc::new(Mutex::new(Vec::new()));
        let hung = Box::new(RecordingSink {
            name: "slow",
            fail_with: None,
            delay: Some(Duration::from_secs(60)),
            log: Arc::clone(&log),
        });
        let timeout = Duration::from_millis(50);
        let dispatcher = SinkDispatcher::new(vec![hung, sink("mqtt", None, &log)], timeout);

        // Act
        let results = dispatcher.dispatch(&StatusValue::from("Away")).await;

        // Assert
        assert_eq!(results[0], SinkResult::failure("slow", SinkError::Timeout(timeout)));
        assert!(results[1].is_success());
        assert_eq!(
            *log.lock().unwrap(),
            vec![("mqtt".to_string(), "Away".to_string())]
        );
    }

    #[tokio::test]
    async fn should_return_no_results_without_sinks() {
        let dispatcher = SinkDispatcher::new(Vec::new(), Duration::from_secs(1));

        let results = dispatcher.dispatch(&StatusValue::from("Away")).await;

        assert!(results.is_empty());
        assert!(dispatcher.is_empty());
    }
}
