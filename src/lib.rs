pub mod cadence;
pub mod datamall;
pub mod diff;
pub mod error;
pub mod incident;
pub mod poller;
pub mod render;
pub mod state;
pub mod telegram;
pub mod types;
