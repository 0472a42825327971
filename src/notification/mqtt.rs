//! MQTT sink
//!
//! Publishes the raw status string at QoS 0, not retained. A background task
//! drives the client event loop, reconnecting after broker errors, and counts
//! each outgoing publish so `deliver` can wait until its own message has
//! actually left the client.

use crate::config::MqttConfig;
use crate::monitoring::StatusValue;
use crate::notification::sink::StatusSink;
use crate::utils::SinkError;
use async_trait::async_trait;
use rumqttc::{AsyncClient, Event, EventLoop, MqttOptions, Outgoing, Packet, QoS};
use std::time::Duration;
use tokio::sync::{watch, Mutex};
use tokio::task::JoinHandle;
use tracing::{debug, info, instrument, warn};

pub const SINK_NAME: &str = "mqtt";

const REQUEST_CAPACITY: usize = 10;
const KEEP_ALIVE: Duration = Duration::from_secs(30);
const RECONNECT_DELAY: Duration = Duration::from_secs(1);
const DISCONNECT_GRACE: Duration = Duration::from_millis(250);

/// Pairs queued publish requests with the event loop's outgoing publishes.
///
/// The client writes requests in the order they were queued, so the n-th
/// outgoing publish belongs to the n-th queued request. That includes
/// requests whose caller already gave up waiting, which keeps a late write
/// from confirming a newer publish.
#[derive(Debug)]
struct PublishSequence {
    queued: u64,
    written: watch::Receiver<u64>,
}

impl PublishSequence {
    fn new(written: watch::Receiver<u64>) -> Self {
        Self { queued: 0, written }
    }

    fn next(&self) -> u64 {
        self.queued + 1
    }

    fn mark_queued(&mut self, sequence: u64) {
        self.queued = sequence;
    }

    async fn wait_written(&self, sequence: u64) -> Result<(), SinkError> {
        let mut written = self.written.clone();
        let result = written.wait_for(|count| *count >= sequence).await.map(|_| ());
        result.map_err(|_| SinkError::Publish("MQTT event loop stopped".to_string()))
    }
}

/// MQTT publish sink
pub struct MqttSink {
    client: AsyncClient,
    topic: String,
    sequence: Mutex<PublishSequence>,
    connected: watch::Receiver<bool>,
    event_loop: std::sync::Mutex<Option<JoinHandle<()>>>,
}

impl MqttSink {
    /// Create the client and start its event loop.
    ///
    /// Returns immediately; use [`MqttSink::wait_connected`] to wait for the
    /// broker to accept the session. Must be called inside a tokio runtime.
    pub fn connect(config: &MqttConfig) -> Self {
        let (client, event_loop) = AsyncClient::new(mqtt_options(config), REQUEST_CAPACITY);
        let (written_tx, written_rx) = watch::channel(0u64);
        let (connected_tx, connected_rx) = watch::channel(false);

        info!(
            host = %config.host,
            port = config.port,
            client_id = %config.client_id,
            topic = %config.topic,
            "Connecting to MQTT broker"
        );

        let handle = tokio::spawn(drive_event_loop(event_loop, written_tx, connected_tx));

        Self {
            client,
            topic: config.topic.clone(),
            sequence: Mutex::new(PublishSequence::new(written_rx)),
            connected: connected_rx,
            event_loop: std::sync::Mutex::new(Some(handle)),
        }
    }

    /// Wait until the broker acknowledges the connection
    pub async fn wait_connected(&self, timeout: Duration) -> Result<(), SinkError> {
        let mut connected = self.connected.clone();
        let outcome = tokio::time::timeout(timeout, connected.wait_for(|up| *up)).await;
        match outcome {
            Ok(Ok(_)) => Ok(()),
            Ok(Err(_)) => Err(SinkError::Transport("MQTT event loop stopped".to_string())),
            Err(_) => Err(SinkError::Timeout(timeout)),
        }
    }

    pub fn is_connected(&self) -> bool {
        *self.connected.borrow()
    }

    pub fn topic(&self) -> &str {
        &self.topic
    }
}

#[async_trait]
impl StatusSink for MqttSink {
    fn name(&self) -> &str {
        SINK_NAME
    }

    /// Queue the publish and wait until the event loop has written it.
    ///
    /// A publish abandoned by a timed-out caller stays queued in the client
    /// and still counts toward the sequence, so it never confirms this one.
    #[instrument(skip(self), fields(topic = %self.topic))]
    async fn deliver(&self, status: &StatusValue) -> Result<(), SinkError> {
        let mut sequence = self.sequence.lock().await;
        let current = sequence.next();

        self.client
            .publish(
                self.topic.clone(),
                QoS::AtMostOnce,
                false,
                status.as_str().as_bytes().to_vec(),
            )
            .await
            .map_err(|e| SinkError::Publish(e.to_string()))?;
        sequence.mark_queued(current);

        sequence.wait_written(current).await?;
        debug!(sequence = current, status = %status, "Published to MQTT");
        Ok(())
    }

    async fn close(&self) {
        if let Err(e) = self.client.disconnect().await {
            warn!(error = %e, "Failed to request MQTT disconnect");
        }

        let handle = self
            .event_loop
            .lock()
            .ok()
            .and_then(|mut guard| guard.take());
        if let Some(mut handle) = handle {
            if tokio::time::timeout(DISCONNECT_GRACE, &mut handle).await.is_err() {
                handle.abort();
            }
        }
        info!("MQTT client closed");
    }
}

/// Client options for `config`
pub fn mqtt_options(config: &MqttConfig) -> MqttOptions {
    let mut options = MqttOptions::new(config.client_id.clone(), config.host.clone(), config.port);
    options.set_keep_alive(KEEP_ALIVE);
    if let Some(username) = &config.username {
        options.set_credentials(
            username.clone(),
            config.password.clone().unwrap_or_default(),
        );
    }
    options
}

async fn drive_event_loop(
    mut event_loop: EventLoop,
    written: watch::Sender<u64>,
    connected: watch::Sender<bool>,
) {
    loop {
        match event_loop.poll().await {
            Ok(Event::Incoming(Packet::ConnAck(_))) => {
                info!("Connected to MQTT broker");
                connected.send_replace(true);
            }
            Ok(Event::Outgoing(Outgoing::Publish(_))) => {
                written.send_modify(|count| *count += 1);
            }
            Ok(Event::Outgoing(Outgoing::Disconnect)) => {
                connected.send_replace(false);
                debug!("MQTT disconnect sent, stopping event loop");
                break;
            }
            Ok(_) => {}
            Err(e) => {
                let was_connected = connected.send_replace(false);
                if was_connected {
                    warn!(error = %e, "Lost connection to MQTT broker");
                } else {
                    debug!(error = %e, "MQTT connection attempt failed");
                }
                tokio::time::sleep(RECONNECT_DELAY).await;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_config(port: u16) -> MqttConfig {
        MqttConfig {
            host: "127.0.0.1".to_string(),
            port,
            topic: "teams/status".to_string(),
            client_id: "teams-status-watcher".to_string(),
            username: Some("user".to_string()),
            password: Some("pass".to_string()),
        }
    }

    #[test]
    fn should_build_options_from_config() {
        // Act
        let options = mqtt_options(&test_config(1884));

        // Assert
        assert_eq!(options.client_id(), "teams-status-watcher");
        assert_eq!(options.broker_address(), ("127.0.0.1".to_string(), 1884));
        assert_eq!(options.keep_alive(), KEEP_ALIVE);
    }

    #[tokio::test]
    async fn should_time_out_waiting_for_unreachable_broker() {
        // Arrange - nothing listens on port 1
        let sink = MqttSink::connect(&test_config(1));

        // Act
        let result = sink.wait_connected(Duration::from_millis(200)).await;

        // Assert
        assert!(matches!(result, Err(SinkError::Timeout(_))));
        assert!(!sink.is_connected());
        sink.close().await;
    }

    #[tokio::test]
    async fn should_not_confirm_publish_without_broker() {
        // Arrange
        let sink = MqttSink::connect(&test_config(1));

        // Act
        let result = tokio::time::timeout(
            Duration::from_millis(200),
            sink.deliver(&StatusValue::from("Away")),
        )
        .await;

        // Assert
        assert!(result.is_err(), "publish must wait for the event loop");
        assert_eq!(sink.name(), "mqtt");
        assert_eq!(sink.topic(), "teams/status");
        sink.close().await;
    }

    #[tokio::test]
    async fn should_not_confirm_newer_publish_with_older_write() {
        // Arrange - one abandoned publish is still queued ahead of the current one
        let (written_tx, written_rx) = watch::channel(0u64);
        let mut sequence = PublishSequence::new(written_rx);
        let abandoned = sequence.next();
        sequence.mark_queued(abandoned);
        let current = sequence.next();
        sequence.mark_queued(current);

        // Act - the older publish goes out first
        written_tx.send_modify(|count| *count += 1);
        let early = tokio::time::timeout(
            Duration::from_millis(50),
            sequence.wait_written(current),
        )
        .await;

        written_tx.send_modify(|count| *count += 1);
        let confirmed = tokio::time::timeout(
            Duration::from_secs(1),
            sequence.wait_written(current),
        )
        .await;

        // Assert
        assert!(early.is_err(), "older write must not confirm the newer publish");
        assert!(matches!(confirmed, Ok(Ok(()))));
    }

    #[tokio::test]
    async fn should_fail_publish_wait_when_event_loop_stops() {
        // Arrange
        let (written_tx, written_rx) = watch::channel(0u64);
        let mut sequence = PublishSequence::new(written_rx);
        let current = sequence.next();
        sequence.mark_queued(current);

        // Act
        drop(written_tx);
        let result = sequence.wait_written(current).await;

        // Assert
        assert!(matches!(result, Err(SinkError::Publish(_))));
    }
}
