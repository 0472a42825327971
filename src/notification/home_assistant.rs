//! Home Assistant state sink
//!
//! Pushes the status into a Home Assistant entity through the REST states API.

use crate::config::HomeAssistantConfig;
use crate::monitoring::StatusValue;
use crate::notification::sink::StatusSink;
use crate::utils::SinkError;
use async_trait::async_trait;
use reqwest::Client;
use serde::Serialize;
use tracing::{debug, error, instrument};

pub const SINK_NAME: &str = "home_assistant";

/// Body of a state update request
#[derive(Debug, Serialize)]
pub struct StatePayload<'a> {
    pub state: &'a str,
    pub attributes: StateAttributes<'a>,
}

#[derive(Debug, Serialize)]
pub struct StateAttributes<'a> {
    pub friendly_name: &'a str,
}

/// Home Assistant sink
#[derive(Debug, Clone)]
pub struct HomeAssistantSink {
    url: String,
    token: String,
    friendly_name: String,
    client: Client,
}

impl HomeAssistantSink {
    pub fn new(config: &HomeAssistantConfig) -> Self {
        Self {
            url: config.url.clone(),
            token: config.token.clone(),
            friendly_name: config.friendly_name.clone(),
            client: Client::new(),
        }
    }

    /// Build the JSON body for `status`
    pub fn payload<'a>(&'a self, status: &'a StatusValue) -> StatePayload<'a> {
        StatePayload {
            state: status.as_str(),
            attributes: StateAttributes {
                friendly_name: &self.friendly_name,
            },
        }
    }

    pub fn url(&self) -> &str {
        &self.url
    }
}

#[async_trait]
impl StatusSink for HomeAssistantSink {
    fn name(&self) -> &str {
        SINK_NAME
    }

    #[instrument(skip(self), fields(url = %self.url))]
    async fn deliver(&self, status: &StatusValue) -> Result<(), SinkError> {
        let response = self
            .client
            .post(&self.url)
            .bearer_auth(&self.token)
            .json(&self.payload(status))
            .send()
            .await
            .map_err(|e| {
                error!(error = %e, "Failed to send request to Home Assistant");
                SinkError::Transport(e.to_string())
            })?;

        let http_status = response.status();
        if !http_status.is_success() {
            let body = response.text().await.unwrap_or_default();
            error!(status = %http_status, body = %body, "Home Assistant returned error");
            return Err(SinkError::HttpStatus {
                status: http_status.as_u16(),
                body,
            });
        }

        debug!(status = %status, "Home Assistant updated");
        Ok(())
    }
}
