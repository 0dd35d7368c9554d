use std::time::Duration;

use chrono_tz::Tz;
use serde::{Deserialize, Serialize};

use crate::cadence::ROADWORKS_EVERY;
use crate::error::ConfigError;

/// Runtime configuration stored in ~/.trafficbot/config.json.
///
/// Credentials may be left out of the file and supplied through the
/// environment instead (see `state::apply_env_overrides`).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Config {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub datamall_api_key: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub telegram_bot_token: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub chat_id: Option<String>,
    /// Pre-existing channel message holding the major incident summary
    #[serde(default = "default_major_message_id")]
    pub major_message_id: i64,
    /// Pre-existing channel message holding the roadworks summary
    #[serde(default = "default_roadworks_message_id")]
    pub roadworks_message_id: i64,
    #[serde(default = "default_poll_interval_seconds")]
    pub poll_interval_seconds: u64,
    #[serde(default = "default_retry_backoff_seconds")]
    pub retry_backoff_seconds: u64,
    #[serde(default = "default_roadworks_every")]
    pub roadworks_every: u32,
    #[serde(default = "default_timezone")]
    pub timezone: String,
    /// Also post the NEW/REMOVED change list as a fresh message
    #[serde(default)]
    pub send_change_digest: bool,
}

fn default_major_message_id() -> i64 {
    238
}

fn default_roadworks_message_id() -> i64 {
    237
}

fn default_poll_interval_seconds() -> u64 {
    120
}

fn default_retry_backoff_seconds() -> u64 {
    300
}

fn default_roadworks_every() -> u32 {
    ROADWORKS_EVERY
}

fn default_timezone() -> String {
    "Asia/Singapore".to_string()
}

impl Default for Config {
    fn default() -> Self {
        Self {
            datamall_api_key: None,
            telegram_bot_token: None,
            chat_id: None,
            major_message_id: default_major_message_id(),
            roadworks_message_id: default_roadworks_message_id(),
            poll_interval_seconds: default_poll_interval_seconds(),
            retry_backoff_seconds: default_retry_backoff_seconds(),
            roadworks_every: default_roadworks_every(),
            timezone: default_timezone(),
            send_change_digest: false,
        }
    }
}

/// Credentials required to talk to the feed and the channel.
#[derive(Debug, Clone)]
pub struct Credentials {
    pub datamall_api_key: String,
    pub telegram_bot_token: String,
    pub chat_id: String,
}

impl Config {
    pub fn credentials(&self) -> Result<Credentials, ConfigError> {
        fn require(value: &Option<String>, name: &'static str) -> Result<String, ConfigError> {
            value
                .as_deref()
                .map(str::trim)
                .filter(|v| !v.is_empty())
                .map(str::to_string)
                .ok_or(ConfigError::Missing(name))
        }

        Ok(Credentials {
            datamall_api_key: require(&self.datamall_api_key, "datamallApiKey")?,
            telegram_bot_token: require(&self.telegram_bot_token, "telegramBotToken")?,
            chat_id: require(&self.chat_id, "chatId")?,
        })
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_secs(self.poll_interval_seconds)
    }

    pub fn retry_backoff(&self) -> Duration {
        Duration::from_secs(self.retry_backoff_seconds)
    }

    pub fn tz(&self) -> Result<Tz, ConfigError> {
        self.timezone
            .parse::<Tz>()
            .map_err(|_| ConfigError::InvalidTimezone(self.timezone.clone()))
    }
}
