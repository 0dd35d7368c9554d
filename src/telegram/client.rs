//! Bot API client.
//!
//! Every call answers with `{ "ok": bool, "description"?: str, ... }`.
//! `ok: false` is turned into `NotifyError::Rejected` carrying the description.

use std::time::Duration;

use async_trait::async_trait;
use serde::Deserialize;

use crate::error::NotifyError;
use crate::poller::MessageChannel;

const TELEGRAM_API_BASE: &str = "https://api.telegram.org/bot";
const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Bot API acknowledgement.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Ack {
    pub ok: bool,
    #[serde(default)]
    pub description: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Action {
    Send,
    Edit,
}

impl Action {
    fn endpoint(self) -> &'static str {
        match self {
            Action::Send => "sendMessage",
            Action::Edit => "editMessageText",
        }
    }
}

pub struct TelegramClient {
    client: reqwest::Client,
    base_endpoint: String,
    chat_id: String,
}

impl TelegramClient {
    pub fn new(bot_token: &str, chat_id: &str) -> Self {
        let client = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .unwrap_or_else(|e| {
                log::warn!("Telegram: falling back to default HTTP client: {}", e);
                reqwest::Client::new()
            });
        Self {
            client,
            base_endpoint: format!("{}{}/", TELEGRAM_API_BASE, bot_token),
            chat_id: chat_id.to_string(),
        }
    }

    /// Post a new message to the channel.
    pub async fn send_message(&self, text: &str) -> Result<Ack, NotifyError> {
        let body = serde_json::json!({
            "chat_id": self.chat_id,
            "parse_mode": "HTML",
            "disable_web_page_preview": true,
            "text": text,
        });
        self.call(Action::Send, body).await
    }

    /// Replace the text of an existing channel message.
    pub async fn edit_message(&self, text: &str, message_id: i64) -> Result<Ack, NotifyError> {
        let body = serde_json::json!({
            "chat_id": self.chat_id,
            "message_id": message_id,
            "parse_mode": "HTML",
            "disable_web_page_preview": true,
            "text": text,
        });
        self.call(Action::Edit, body).await
    }

    async fn call(&self, action: Action, body: serde_json::Value) -> Result<Ack, NotifyError> {
        let url = format!("{}{}", self.base_endpoint, action.endpoint());
        let ack: Ack = self
            .client
            .post(url)
            .json(&body)
            .send()
            .await?
            .json()
            .await?;
        check_ack(ack)
    }
}

#[async_trait]
impl MessageChannel for TelegramClient {
    async fn send(&self, text: &str) -> Result<Ack, NotifyError> {
        self.send_message(text).await
    }

    async fn edit(&self, text: &str, message_id: i64) -> Result<Ack, NotifyError> {
        self.edit_message(text, message_id).await
    }
}

fn check_ack(ack: Ack) -> Result<Ack, NotifyError> {
    if ack.ok {
        Ok(ack)
    } else {
        Err(NotifyError::Rejected(
            ack.description
                .unwrap_or_else(|| "no description given".to_string()),
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_check_ack_ok() {
        let ack: Ack = serde_json::from_str(r#"{"ok":true,"result":{"message_id":238}}"#).unwrap();
        assert!(check_ack(ack).is_ok());
    }

    #[test]
    fn test_check_ack_rejected_keeps_description() {
        let ack: Ack = serde_json::from_str(
            r#"{"ok":false,"error_code":400,"description":"Bad Request: message to edit not found"}"#,
        )
        .unwrap();
        match check_ack(ack) {
            Err(NotifyError::Rejected(desc)) => {
                assert_eq!(desc, "Bad Request: message to edit not found")
            }
            other => panic!("unexpected: {other:?}"),
        }
    }

    #[test]
    fn test_endpoints() {
        assert_eq!(Action::Send.endpoint(), "sendMessage");
        assert_eq!(Action::Edit.endpoint(), "editMessageText");
        let client = TelegramClient::new("123:abc", "@chan");
        assert_eq!(client.base_endpoint, "https://api.telegram.org/bot123:abc/");
    }
}
