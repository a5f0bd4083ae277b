//! Telegram Pusher
//!
//! Delivers run summaries through the Telegram Bot API. Delivery is
//! judged from the `ok` field of the response body.

use anyhow::{Context, Result};
use async_trait::async_trait;
use serde_json::Value;
use tracing::{info, warn};

use crate::types::Notifier;

pub struct TelegramNotifier {
    token: String,
    chat_id: String,
    http: reqwest::Client,
}

impl TelegramNotifier {
    pub fn new(token: String, chat_id: String) -> Self {
        Self {
            token,
            chat_id,
            http: reqwest::Client::new(),
        }
    }

    fn send_message_url(&self) -> String {
        format!("https://api.telegram.org/bot{}/sendMessage", self.token)
    }
}

#[async_trait]
impl Notifier for TelegramNotifier {
    async fn push(&self, text: &str) -> Result<bool> {
        let resp = self
            .http
            .post(self.send_message_url())
            .form(&[("chat_id", self.chat_id.as_str()), ("text", text)])
            .send()
            .await
            .context("Failed to reach the Telegram Bot API")?;

        let body: Value = resp
            .json()
            .await
            .context("Telegram response was not JSON")?;

        let ok = body["ok"].as_bool().unwrap_or(false);
        if ok {
            info!("Telegram push delivered");
        } else {
            warn!("Telegram push rejected: {}", body);
        }
        Ok(ok)
    }
}
