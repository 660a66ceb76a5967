//! Outbound notification boundary and the Telegram Bot API sender.

use std::sync::Arc;

use async_trait::async_trait;
use kursmon_common::{KursmonError, Result};
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};
use tracing::{error, info, instrument, warn};

use crate::config::TelegramConfig;

/// Delivers a rendered message to a destination (chat id).
#[async_trait]
pub trait Notifier: Send + Sync {
    /// Fails with `NotifyFailed`.
    async fn send(&self, destination: &str, text: &str) -> Result<()>;
}

/// Shared notifier.
pub type SharedNotifier = Arc<dyn Notifier>;

#[derive(Serialize)]
struct SendMessageRequest<'a> {
    chat_id: &'a str,
    text: &'a str,
    parse_mode: &'a str,
}

#[derive(Debug, Deserialize)]
struct ApiResponse {
    ok: bool,
    #[serde(default)]
    description: Option<String>,
}

/// Telegram Bot API notifier. Messages are sent with HTML parse mode.
pub struct TelegramNotifier {
    client: Client,
    api_base_url: String,
    bot_token: String,
}

impl TelegramNotifier {
    pub fn new(config: &TelegramConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| KursmonError::Configuration(format!("HTTP client: {e}")))?;

        Ok(Self {
            client,
            api_base_url: config.api_base_url.trim_end_matches('/').to_string(),
            bot_token: config.bot_token.clone(),
        })
    }

    fn send_message_url(&self) -> String {
        format!("{}/bot{}/sendMessage", self.api_base_url, self.bot_token)
    }
}

#[async_trait]
impl Notifier for TelegramNotifier {
    #[instrument(skip(self, text), fields(chars = text.chars().count()))]
    async fn send(&self, destination: &str, text: &str) -> Result<()> {
        let request = SendMessageRequest {
            chat_id: destination,
            text,
            parse_mode: "HTML",
        };

        let response = self
            .client
            .post(self.send_message_url())
            .json(&request)
            .send()
            .await
            .map_err(|e| KursmonError::NotifyFailed(e.to_string().replace(&self.bot_token, "***")))?;

        let status = response.status();
        let body = match response.text().await {
            Ok(body) => Some(body),
            Err(e) => {
                warn!(status = %status, error = %e, "Failed to read Telegram response body");
                None
            }
        };

        check_response(status, body.as_deref())
    }
}

/// Interpret a Bot API reply. A missing or unparseable body is judged by
/// the HTTP status alone.
fn check_response(status: StatusCode, body: Option<&str>) -> Result<()> {
    let parsed = body.and_then(|b| serde_json::from_str::<ApiResponse>(b).ok());

    if status.is_success() && parsed.as_ref().map_or(true, |r| r.ok) {
        info!("Telegram message sent");
        return Ok(());
    }

    let reason = parsed
        .and_then(|r| r.description)
        .unwrap_or_else(|| format!("HTTP {status}"));
    error!(status = %status, reason = %reason, "Telegram API rejected message");
    Err(KursmonError::NotifyFailed(format!("Telegram API error: {reason}")))
}

/// Notifier that records messages instead of sending them.
#[cfg(any(test, feature = "test-utils"))]
#[derive(Default)]
pub struct RecordingNotifier {
    sent: parking_lot::Mutex<Vec<(String, String)>>,
    failure: parking_lot::Mutex<Option<String>>,
}

#[cfg(any(test, feature = "test-utils"))]
impl RecordingNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make subsequent sends fail with `message`.
    pub fn fail_with(&self, message: impl Into<String>) {
        *self.failure.lock() = Some(message.into());
    }

    /// `(destination, text)` of every delivered message.
    pub fn sent(&self) -> Vec<(String, String)> {
        self.sent.lock().clone()
    }
}

#[cfg(any(test, feature = "test-utils"))]
#[async_trait]
impl Notifier for RecordingNotifier {
    async fn send(&self, destination: &str, text: &str) -> Result<()> {
        if let Some(message) = self.failure.lock().clone() {
            return Err(KursmonError::NotifyFailed(message));
        }
        self.sent
            .lock()
            .push((destination.to_string(), text.to_string()));
        Ok(())
    }
}
