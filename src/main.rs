//! trafficbot binary: keeps the pinned incident summaries in a Telegram
//! channel in step with the DataMall feed.
//!
//! `--once` runs a single cycle against an empty previous state (both
//! pinned messages get rewritten) and exits; handy after provisioning.

use tokio::sync::watch;

use trafficbot_lib::datamall::DataMallClient;
use trafficbot_lib::poller::{PollSettings, Poller};
use trafficbot_lib::state;
use trafficbot_lib::telegram::TelegramClient;

#[tokio::main]
async fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let once = std::env::args().skip(1).any(|arg| arg == "--once");

    let config = match state::load_config() {
        Ok(c) => c,
        Err(e) => {
            log::error!("{}", e);
            std::process::exit(1);
        }
    };
    let (credentials, settings) = match config
        .credentials()
        .and_then(|creds| Ok((creds, PollSettings::from_config(&config)?)))
    {
        Ok(pair) => pair,
        Err(e) => {
            log::error!("{}", e);
            std::process::exit(1);
        }
    };

    let feed = DataMallClient::new(&credentials.datamall_api_key);
    let channel = TelegramClient::new(&credentials.telegram_bot_token, &credentials.chat_id);
    let mut poller = Poller::new(feed, channel, settings);

    if once {
        match poller.fetch_snapshot().await {
            Ok(snapshot) => {
                let report = poller.run_cycle(snapshot).await;
                if report.messages_failed > 0 {
                    std::process::exit(1);
                }
            }
            Err(e) => {
                log::error!("Fetch failed: {}", e);
                std::process::exit(1);
            }
        }
        return;
    }

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    tokio::spawn(async move {
        match tokio::signal::ctrl_c().await {
            Ok(()) => {
                log::info!("Interrupt received, stopping after the current step");
                let _ = shutdown_tx.send(true);
            }
            Err(e) => log::warn!("Could not listen for interrupt: {}", e),
        }
    });

    poller.run(shutdown_rx).await;
}
