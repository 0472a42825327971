pub mod config;
pub mod monitoring;
pub mod notification;
pub mod shutdown;
pub mod state;
pub mod utils;

pub use config::WatcherConfig;
pub use monitoring::{PollLoop, StatusValue};
pub use notification::{SinkDispatcher, StatusSink};
pub use state::WatcherState;
