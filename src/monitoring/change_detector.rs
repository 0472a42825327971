//! Debounces observed status against the last delivered value

use crate::monitoring::status::{Observation, StatusValue};

/// What the poll loop should do with an observation
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Decision {
    /// Deliver this value to every sink
    Notify(StatusValue),
    /// Nothing new to report
    Suppress,
}

/// Decide whether `current` warrants a notification.
///
/// - An empty observation before anything was delivered reports the degraded
///   sentinel, so "running but nothing readable yet" is distinguishable from
///   silence.
/// - A status different from the last delivered one (or the first status
///   ever) is reported.
/// - Everything else is suppressed, including an empty observation after a
///   value was already delivered.
pub fn should_notify(current: &Observation, last_delivered: Option<&StatusValue>) -> Decision {
    match (current, last_delivered) {
        (Observation::Empty, None) => Decision::Notify(StatusValue::degraded()),
        (Observation::Status(status), last) if last != Some(status) => {
            Decision::Notify(status.clone())
        }
        _ => Decision::Suppress,
    }
}
