use std::env;
use std::path::PathBuf;
use std::time::Duration;

pub const DEFAULT_LOG_FILE_PATTERN: &str = "MSTeams_*.log";
pub const DEFAULT_FRIENDLY_NAME: &str = "Teams Status";
pub const DEFAULT_MQTT_CLIENT_ID: &str = "teams-status-watcher";
pub const DEFAULT_MQTT_PORT: u16 = 1883;

const DEFAULT_POLL_INTERVAL_SECS: u64 = 2;
const DEFAULT_BACKOFF_INTERVAL_SECS: u64 = 5;
const DEFAULT_SINK_TIMEOUT_SECS: u64 = 10;

/// Watcher configuration
#[derive(Debug, Clone)]
pub struct WatcherConfig {
    /// Directory holding the rotated log files
    pub logs_path: PathBuf,
    /// Glob for candidate log file names
    pub log_file_pattern: String,
    pub poll_interval: Duration,
    pub backoff_interval: Duration,
    /// Upper bound for a single sink delivery
    pub sink_timeout: Duration,
    /// `None` when `HOME_ASSISTANT_URL` is not set
    pub home_assistant: Option<HomeAssistantConfig>,
    /// `None` when `MQTT_BROKER` is not set
    pub mqtt: Option<MqttConfig>,
}

/// Home Assistant state endpoint settings
#[derive(Debug, Clone)]
pub struct HomeAssistantConfig {
    pub url: String,
    pub token: String,
    pub friendly_name: String,
}

/// MQTT broker settings
#[derive(Debug, Clone)]
pub struct MqttConfig {
    pub host: String,
    pub port: u16,
    pub topic: String,
    pub client_id: String,
    pub username: Option<String>,
    pub password: Option<String>,
}

impl WatcherConfig {
    /// Load configuration from process environment variables
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| env::var(name).ok())
    }

    /// Load configuration through an arbitrary variable lookup
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        // Blank values count as unset
        let get = |name: &str| lookup(name).filter(|v| !v.trim().is_empty());

        let logs_path = get("LOGS_PATH")
            .map(PathBuf::from)
            .ok_or(ConfigError::Missing("LOGS_PATH"))?;

        let log_file_pattern =
            get("LOG_FILE_PATTERN").unwrap_or_else(|| DEFAULT_LOG_FILE_PATTERN.to_string());

        let poll_interval = parse_secs(
            "POLL_INTERVAL_SECS",
            get("POLL_INTERVAL_SECS"),
            DEFAULT_POLL_INTERVAL_SECS,
        )?;
        let backoff_interval = parse_secs(
            "BACKOFF_INTERVAL_SECS",
            get("BACKOFF_INTERVAL_SECS"),
            DEFAULT_BACKOFF_INTERVAL_SECS,
        )?;
        let sink_timeout = parse_secs(
            "SINK_TIMEOUT_SECS",
            get("SINK_TIMEOUT_SECS"),
            DEFAULT_SINK_TIMEOUT_SECS,
        )?;

        let home_assistant = match get("HOME_ASSISTANT_URL") {
            Some(url) => {
                let token = get("HOME_ASSISTANT_TOKEN").unwrap_or_else(|| {
                    tracing::warn!(
                        "HOME_ASSISTANT_TOKEN is not set, requests will carry an empty bearer token"
                    );
                    String::new()
                });
                Some(HomeAssistantConfig {
                    url,
                    token,
                    friendly_name: get("HOME_ASSISTANT_FRIENDLY_NAME")
                        .unwrap_or_else(|| DEFAULT_FRIENDLY_NAME.to_string()),
                })
            }
            None => {
                tracing::warn!("HOME_ASSISTANT_URL is not set, Home Assistant sink disabled");
                None
            }
        };

        let mqtt = match get("MQTT_BROKER") {
            Some(broker) => {
                let (host, port) = parse_broker_address(&broker)?;
                let topic = get("MQTT_TOPIC").ok_or(ConfigError::Missing("MQTT_TOPIC"))?;
                Some(MqttConfig {
                    host,
                    port,
                    topic,
                    client_id: get("MQTT_CLIENT_ID")
                        .unwrap_or_else(|| DEFAULT_MQTT_CLIENT_ID.to_string()),
                    username: get("MQTT_USERNAME"),
                    password: get("MQTT_PASSWORD"),
                })
            }
            None => {
                tracing::warn!("MQTT_BROKER is not set, MQTT sink disabled");
                None
            }
        };

        Ok(Self {
            logs_path,
            log_file_pattern,
            poll_interval,
            backoff_interval,
            sink_timeout,
            home_assistant,
            mqtt,
        })
    }
}

fn parse_secs(
    name: &'static str,
    raw: Option<String>,
    default: u64,
) -> Result<Duration, ConfigError> {
    match raw {
        None => Ok(Duration::from_secs(default)),
        Some(value) => match value.trim().parse::<u64>() {
            Ok(secs) if secs > 0 => Ok(Duration::from_secs(secs)),
            _ => Err(ConfigError::InvalidNumber { name, value }),
        },
    }
}

/// Split a broker address into host and port.
///
/// Accepts `tcp://host:port`, `mqtt://host:port`, `host:port` and bare `host`
/// (port 1883).
pub fn parse_broker_address(raw: &str) -> Result<(String, u16), ConfigError> {
    let invalid = || ConfigError::InvalidBrokerAddress(raw.to_string());

    let trimmed = raw.trim();
    let without_scheme = match trimmed.split_once("://") {
        Some((scheme, rest)) => match scheme.to_ascii_lowercase().as_str() {
            "tcp" | "mqtt" => rest,
            _ => return Err(invalid()),
        },
        None => trimmed,
    };
    let address = without_scheme.trim_end_matches('/');

    let (host, port) = match address.rsplit_once(':') {
        Some((host, port)) => (host, port.parse::<u16>().map_err(|_| invalid())?),
        None => (address, DEFAULT_MQTT_PORT),
    };

    if host.is_empty() || host.contains('/') {
        return Err(invalid());
    }

    Ok((host.to_string(), port))
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("{0} environment variable is required")]
    Missing(&'static str),
    #[error("{name} must be a positive number of seconds, got '{value}'")]
    InvalidNumber { name: &'static str, value: String },
    #[error("Invalid MQTT broker address '{0}'")]
    InvalidBrokerAddress(String),
}
