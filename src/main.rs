use status_watcher::config::WatcherConfig;
use status_watcher::monitoring::PollLoop;
use status_watcher::notification::{HomeAssistantSink, MqttSink, SinkDispatcher, StatusSink};
use status_watcher::shutdown::shutdown_signal;
use status_watcher::utils::init_logging;
use std::process::ExitCode;
use tracing::{error, info};

#[tokio::main]
async fn main() -> ExitCode {
    // 1. Environment
    dotenvy::dotenv().ok();

    // 2. Logging
    let _log_guard = init_logging();

    // 3. Configuration
    let config = match WatcherConfig::from_env() {
        Ok(config) => config,
        Err(e) => {
            error!(error = %e, "Invalid configuration");
            return ExitCode::FAILURE;
        }
    };

    // 4. Sinks
    let mut sinks: Vec<Box<dyn StatusSink>> = Vec::new();

    if let Some(home_assistant) = &config.home_assistant {
        sinks.push(Box::new(HomeAssistantSink::new(home_assistant)));
    }

    if let Some(mqtt) = &config.mqtt {
        let sink = MqttSink::connect(mqtt);
        if let Err(e) = sink.wait_connected(config.sink_timeout).await {
            error!(error = %e, "Failed to connect to MQTT broker");
            sink.close().await;
            return ExitCode::FAILURE;
        }
        sinks.push(Box::new(sink));
    }

    let dispatcher = SinkDispatcher::new(sinks, config.sink_timeout);
    let mut poll_loop = PollLoop::new(&config, dispatcher);

    // 5. Poll until shutdown
    tokio::select! {
        _ = poll_loop.run() => {},
        _ = shutdown_signal() => {},
    }

    poll_loop.dispatcher().close().await;
    info!("Status watcher stopped");

    ExitCode::SUCCESS
}
