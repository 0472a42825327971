use crate::monitoring::StatusValue;

/// Process-lifetime watcher state, owned by the poll loop
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct WatcherState {
    last_delivered: Option<StatusValue>,
}

impl WatcherState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start from an already delivered value
    pub fn with_last_delivered(status: StatusValue) -> Self {
        Self {
            last_delivered: Some(status),
        }
    }

    pub fn last_delivered(&self) -> Option<&StatusValue> {
        self.last_delivered.as_ref()
    }

    /// Record a dispatched value, whatever the individual sinks reported
    pub fn record_delivery(&mut self, status: StatusValue) {
        self.last_delivered = Some(status);
    }
}
