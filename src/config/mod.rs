pub mod app_config;

pub use app_config::{
    parse_broker_address, ConfigError, HomeAssistantConfig, MqttConfig, WatcherConfig,
};
