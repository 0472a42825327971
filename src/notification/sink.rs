//! Sink abstraction for status notifications

use crate::monitoring::StatusValue;
use crate::utils::SinkError;
use async_trait::async_trait;

/// A downstream target that receives every confirmed status change
#[async_trait]
pub trait StatusSink: Send + Sync {
    /// Short name used in logs and [`SinkResult`]s
    fn name(&self) -> &str;

    /// Deliver one status value. Must not retry internally.
    async fn deliver(&self, status: &StatusValue) -> Result<(), SinkError>;

    /// Release connections on shutdown
    async fn close(&self) {}
}

/// Outcome of one delivery attempt to one sink
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SinkResult {
    pub sink: String,
    pub outcome: Result<(), SinkError>,
}

impl SinkResult {
    pub fn success(sink: impl Into<String>) -> Self {
        Self {
            sink: sink.into(),
            outcome: Ok(()),
        }
    }

    pub fn failure(sink: impl Into<String>, error: SinkError) -> Self {
        Self {
            sink: sink.into(),
            outcome: Err(error),
        }
    }

    pub fn is_success(&self) -> bool {
        self.outcome.is_ok()
    }
}
