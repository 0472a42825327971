pub mod error;
pub mod logging;

pub use error::{SinkError, WatcherError};
pub use logging::init_logging;
