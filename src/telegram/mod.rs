//! Telegram Bot API channel.
//!
//! Edits the two pinned summary messages and, optionally, posts change
//! digests. All calls use `parse_mode=HTML`.

pub mod client;

pub use client::{Ack, TelegramClient};
