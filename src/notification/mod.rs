//! Status notification sinks and the dispatcher that fans out to them

pub mod dispatcher;
pub mod home_assistant;
pub mod mqtt;
pub mod sink;

pub use dispatcher::SinkDispatcher;
pub use home_assistant::HomeAssistantSink;
pub use mqtt::MqttSink;
pub use sink::{SinkResult, StatusSink};
