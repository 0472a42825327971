//! Log monitoring for the status watcher
//!
//! - Selecting the newest rotated log file
//! - Extracting the latest availability marker
//! - Debouncing against the last delivered status
//! - The poll loop tying them together

pub mod change_detector;
pub mod log_selector;
pub mod processor;
pub mod status;
pub mod status_extractor;

pub use change_detector::{should_notify, Decision};
pub use log_selector::select_latest;
pub use processor::{CycleOutcome, Phase, PollLoop};
pub use status::{Observation, StatusValue, DEGRADED_STATUS};
pub use status_extractor::extract_latest_status;
