//! Chat notifications for finished downloads and live captures
//!
//! The downloader only knows a destination as `(guild_id, channel_id)`; how a
//! message reaches that channel is up to the [`Notifier`] implementation.

use crate::config::NotificationConfig;
use crate::error::{Error, Result};
use async_trait::async_trait;
use serde::Serialize;
use std::time::Duration;

/// Sends a text message to a chat destination
#[async_trait]
pub trait Notifier: Send + Sync {
    /// Deliver `text` to the given channel
    ///
    /// # Errors
    ///
    /// Returns an error if the message could not be delivered. Callers log the
    /// error and do not retry.
    async fn send_message(&self, guild_id: i64, channel_id: i64, text: &str) -> Result<()>;

    /// Human-readable name for logging
    fn name(&self) -> &'static str;
}

/// Body POSTed to the webhook
#[derive(Debug, Serialize)]
struct WebhookMessage<'a> {
    guild_id: i64,
    channel_id: i64,
    content: &'a str,
}

/// Notifier that POSTs `{guild_id, channel_id, content}` to a webhook
///
/// A chat bot (or any relay) behind the webhook turns the payload into a
/// channel message.
pub struct WebhookNotifier {
    client: reqwest::Client,
    url: String,
    auth_header: Option<String>,
    timeout: Duration,
}

impl WebhookNotifier {
    /// Create a notifier for the given webhook URL
    pub fn new(url: impl Into<String>, auth_header: Option<String>, timeout: Duration) -> Self {
        Self {
            client: reqwest::Client::new(),
            url: url.into(),
            auth_header,
            timeout,
        }
    }
}

#[async_trait]
impl Notifier for WebhookNotifier {
    async fn send_message(&self, guild_id: i64, channel_id: i64, text: &str) -> Result<()> {
        let payload = WebhookMessage {
            guild_id,
            channel_id,
            content: text,
        };

        let mut request = self
            .client
            .post(&self.url)
            .json(&payload)
            .timeout(self.timeout);

        // Add authentication header if configured
        if let Some(auth) = &self.auth_header {
            request = request.header("Authorization", auth);
        }

        let response = match tokio::time::timeout(self.timeout, request.send()).await {
            Ok(Ok(response)) => response,
            Ok(Err(e)) => return Err(Error::Notify(format!("Failed to send webhook: {}", e))),
            Err(_) => {
                return Err(Error::Notify(format!(
                    "Webhook timed out after {:?}",
                    self.timeout
                )));
            }
        };

        if !response.status().is_success() {
            return Err(Error::Notify(format!(
                "Webhook returned status {}: {}",
                response.status(),
                response.text().await.unwrap_or_default()
            )));
        }

        tracing::debug!(url = %self.url, guild_id, channel_id, "webhook sent successfully");
        Ok(())
    }

    fn name(&self) -> &'static str {
        "webhook"
    }
}

/// Notifier that only writes messages to the log
///
/// Used when no webhook is configured.
pub struct LogNotifier;

#[async_trait]
impl Notifier for LogNotifier {
    async fn send_message(&self, guild_id: i64, channel_id: i64, text: &str) -> Result<()> {
        tracing::info!(guild_id, channel_id, message = %text, "Notification");
        Ok(())
    }

    fn name(&self) -> &'static str {
        "log"
    }
}

/// Pick the notifier described by the configuration
pub(crate) fn from_config(config: &NotificationConfig) -> std::sync::Arc<dyn Notifier> {
    match &config.webhook_url {
        Some(url) => std::sync::Arc::new(WebhookNotifier::new(
            url.clone(),
            config.auth_header.clone(),
            config.timeout,
        )),
        None => std::sync::Arc::new(LogNotifier),
    }
}
