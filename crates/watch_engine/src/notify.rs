use std::time::Duration;

use reqwest::header::CONTENT_TYPE;
use serde_json::json;
use thiserror::Error;
use watch_logging::watch_info;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("could not deliver message to {recipient}: {reason}")]
pub struct DeliveryError {
    pub recipient: String,
    pub reason: String,
}

impl DeliveryError {
    pub fn new(recipient: impl Into<String>, reason: impl Into<String>) -> Self {
        Self {
            recipient: recipient.into(),
            reason: reason.into(),
        }
    }
}

/// Sends one message about one new item.
#[async_trait::async_trait]
pub trait Notifier: Send + Sync {
    async fn send(&self, recipient: &str, message: &str) -> Result<(), DeliveryError>;
}

/// Writes the message to the log instead of sending it anywhere.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogNotifier;

#[async_trait::async_trait]
impl Notifier for LogNotifier {
    async fn send(&self, recipient: &str, message: &str) -> Result<(), DeliveryError> {
        watch_info!("Message for {}: {}", recipient, message);
        Ok(())
    }
}

/// POSTs `{"recipient": .., "message": ..}` as JSON to a fixed URL.
#[derive(Debug, Clone)]
pub struct WebhookNotifier {
    url: String,
    client: reqwest::Client,
}

impl WebhookNotifier {
    pub fn new(url: impl Into<String>, timeout: Duration) -> Result<Self, DeliveryError> {
        let url = url.into();
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|err| DeliveryError::new(url.as_str(), err.to_string()))?;
        Ok(Self { url, client })
    }
}

#[async_trait::async_trait]
impl Notifier for WebhookNotifier {
    async fn send(&self, recipient: &str, message: &str) -> Result<(), DeliveryError> {
        let payload = json!({ "recipient": recipient, "message": message });
        let response = self
            .client
            .post(&self.url)
            .header(CONTENT_TYPE, "application/json")
            .body(payload.to_string())
            .send()
            .await
            .map_err(|err| DeliveryError::new(recipient, err.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(DeliveryError::new(recipient, format!("webhook answered {status}")));
        }
        watch_info!("Message sent to {}", recipient);
        Ok(())
    }
}
