//! LTA DataMall traffic incident feed.
//!
//! Fetches the `TrafficIncidents` dataset and hands raw records to the
//! poller. Follows the same client pattern as the Telegram integration
//! (telegram/mod.rs).

pub mod client;

pub use client::DataMallClient;
