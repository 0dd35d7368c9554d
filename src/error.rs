//! Error types for the poller
//!
//! Errors are classified by how far they are allowed to travel:
//! - FeedError: retried forever by the poll loop, never fatal
//! - NotifyError: logged, the cycle proceeds without retry
//! - ConfigError: startup only, the single path that stops the process

use std::path::PathBuf;
use thiserror::Error;

/// Failures while fetching or normalizing the incident feed.
#[derive(Debug, Error)]
pub enum FeedError {
    #[error("HTTP: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Feed returned status {status}: {body}")]
    Status { status: u16, body: String },

    #[error("Feed response is missing the '{0}' key")]
    MissingData(&'static str),

    #[error("JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Malformed record at index {index}: missing {field}")]
    Malformed { index: usize, field: &'static str },
}

impl FeedError {
    /// True when the feed answered but the payload could not be used.
    /// DataMall does this during maintenance windows.
    pub fn is_payload_error(&self) -> bool {
        matches!(
            self,
            FeedError::MissingData(_) | FeedError::Json(_) | FeedError::Malformed { .. }
        )
    }
}

/// Failures reported by the messaging channel.
#[derive(Debug, Error)]
pub enum NotifyError {
    #[error("HTTP: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Request rejected: {0}")]
    Rejected(String),
}

impl NotifyError {
    /// Telegram refuses an edit whose text equals the current text.
    /// The pinned message already shows what we wanted, so this is not a failure.
    pub fn is_not_modified(&self) -> bool {
        matches!(self, NotifyError::Rejected(desc) if desc.contains("message is not modified"))
    }
}

/// Startup configuration errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Could not find home directory")]
    NoHomeDir,

    #[error("Config file not found at {0}")]
    NotFound(PathBuf),

    #[error("Failed to read config: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse config: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("Missing required setting '{0}' (config file or environment)")]
    Missing(&'static str),

    #[error("Unknown timezone '{0}'")]
    InvalidTimezone(String),
}
