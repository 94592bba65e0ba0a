//! # Sink Client
//!
//! Delivers rendered messages to the external monitoring API.
//!
//! One [`HttpSinkClient`] is shared by every request so the underlying
//! connection pool absorbs bursts without per-request handshakes. Each
//! attempt carries its own deadline; network errors and 5xx responses retry
//! with exponential backoff, while redirects and 4xx responses are terminal.

use crate::config::SinkConfig;
use crate::retry::RetryPolicy;
use async_trait::async_trait;
use serde_json::json;
use std::time::Duration;
use tracing::{debug, warn};

/// Sink delivery errors
#[derive(Debug, thiserror::Error)]
pub enum SinkError {
    /// The sink answered with a terminal (non-2xx, non-5xx) status
    #[error("sink rejected the message with status {status}")]
    Rejected { status: u16 },

    /// Every attempt failed on a transport error or 5xx
    #[error("sink unavailable after {attempts} attempts")]
    Unavailable { attempts: u32 },

    /// The HTTP client could not be constructed
    #[error("sink client construction failed: {message}")]
    Client { message: String },
}

/// Delivery seam between the webhook pipeline and the monitoring API
#[async_trait]
pub trait SinkClient: Send + Sync {
    /// POST one rendered message with its routing descriptor
    async fn send(&self, message: &str, aligned_resource: &str) -> Result<(), SinkError>;
}

/// HTTP implementation over a pooled reqwest client
pub struct HttpSinkClient {
    client: reqwest::Client,
    url: String,
    username: String,
    password: String,
    retry: RetryPolicy,
}

impl HttpSinkClient {
    /// Build a client from the sink configuration
    pub fn new(config: &SinkConfig, retry: RetryPolicy) -> Result<Self, SinkError> {
        // Redirects stay visible so 3xx maps to Rejected.
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_seconds))
            .redirect(reqwest::redirect::Policy::none())
            .build()
            .map_err(|e| SinkError::Client {
                message: e.to_string(),
            })?;

        Ok(Self {
            client,
            url: config.url.clone(),
            username: config.username.clone(),
            password: config.password.clone(),
            retry,
        })
    }

    /// Alert envelope expected by the monitoring API
    fn alert_body(message: &str, aligned_resource: &str) -> serde_json::Value {
        json!({
            "force_ytype": "0",
            "force_yid": "0",
            "force_yname": "",
            "message": message,
            "value": "",
            "threshold": "",
            "message_time": "0",
            "aligned_resource": aligned_resource,
        })
    }
}

#[async_trait]
impl SinkClient for HttpSinkClient {
    async fn send(&self, message: &str, aligned_resource: &str) -> Result<(), SinkError> {
        let body = Self::alert_body(message, aligned_resource);

        for attempt in 1..=self.retry.max_attempts {
            let response = self
                .client
                .post(&self.url)
                .basic_auth(&self.username, Some(&self.password))
                .json(&body)
                .send()
                .await;

            match response {
                Ok(response) if response.status().is_success() => {
                    debug!(attempt, "sink accepted message");
                    return Ok(());
                }
                Ok(response) if response.status().is_server_error() => {
                    warn!(
                        attempt,
                        status = response.status().as_u16(),
                        "sink returned server error"
                    );
                }
                Ok(response) => {
                    return Err(SinkError::Rejected {
                        status: response.status().as_u16(),
                    });
                }
                Err(e) => {
                    warn!(attempt, error = %e, "sink request failed");
                }
            }

            if self.retry.should_retry(attempt) {
                tokio::time::sleep(self.retry.calculate_delay(attempt)).await;
            }
        }

        Err(SinkError::Unavailable {
            attempts: self.retry.max_attempts,
        })
    }
}

#[cfg(test)]
#[path = "sink_tests.rs"]
mod tests;
