//! Incident poll loop.
//!
//! One long-lived task: fetch the feed, diff against the previous cycle,
//! edit the pinned summaries when something changed, sleep, repeat. Fetch
//! failures are never fatal: the loop backs off and retries forever.
//! Shutdown is cooperative through a `watch` channel checked before each
//! step and raced against every sleep.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use chrono_tz::Tz;
use tokio::sync::watch;

use crate::diff::{diff, DiffResult};
use crate::error::{ConfigError, FeedError, NotifyError};
use crate::incident::{RawIncident, Snapshot};
use crate::render::{render_diff, render_snapshot, to_html, SummaryKind};
use crate::state::{PollStats, PollerState};
use crate::telegram::Ack;
use crate::types::Config;

/// Source of raw incident records.
#[async_trait]
pub trait IncidentFeed: Send + Sync {
    async fn fetch_incidents(&self) -> Result<Vec<RawIncident>, FeedError>;
}

/// Destination for rendered notifications.
#[async_trait]
pub trait MessageChannel: Send + Sync {
    async fn send(&self, text: &str) -> Result<Ack, NotifyError>;
    async fn edit(&self, text: &str, message_id: i64) -> Result<Ack, NotifyError>;
}

/// Hook for operators; the loop already logs everything reported here.
pub trait PollObserver: Send + Sync {
    fn on_fetch_failure(&self, _consecutive_failures: u32, _error: &FeedError) {}
    fn on_cycle(&self, _report: &CycleReport) {}
}

impl PollObserver for () {}

#[derive(Debug, Clone)]
pub struct PollSettings {
    pub poll_interval: Duration,
    pub retry_backoff: Duration,
    pub major_message_id: i64,
    pub roadworks_message_id: i64,
    pub roadworks_every: u32,
    pub timezone: Tz,
    pub send_change_digest: bool,
}

impl PollSettings {
    pub fn from_config(config: &Config) -> Result<Self, ConfigError> {
        Ok(Self {
            poll_interval: config.poll_interval(),
            retry_backoff: config.retry_backoff(),
            major_message_id: config.major_message_id,
            roadworks_message_id: config.roadworks_message_id,
            roadworks_every: config.roadworks_every,
            timezone: config.tz()?,
            send_change_digest: config.send_change_digest,
        })
    }
}

impl Default for PollSettings {
    fn default() -> Self {
        // Built from the same defaults as an empty config file
        let config = Config::default();
        Self {
            poll_interval: config.poll_interval(),
            retry_backoff: config.retry_backoff(),
            major_message_id: config.major_message_id,
            roadworks_message_id: config.roadworks_message_id,
            roadworks_every: config.roadworks_every,
            timezone: chrono_tz::Asia::Singapore,
            send_change_digest: config.send_change_digest,
        }
    }
}

/// What one completed cycle did.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CycleReport {
    pub fetched: usize,
    pub major_added: usize,
    pub major_removed: usize,
    pub roadworks_evaluated: bool,
    pub roadworks_added: usize,
    pub roadworks_removed: usize,
    pub messages_sent: usize,
    pub messages_failed: usize,
}

impl CycleReport {
    pub fn major_changed(&self) -> bool {
        self.major_added + self.major_removed > 0
    }

    pub fn roadworks_changed(&self) -> bool {
        self.roadworks_added + self.roadworks_removed > 0
    }

    /// True when nothing changed and no messaging call was made.
    pub fn is_noop(&self) -> bool {
        !self.major_changed() && !self.roadworks_changed()
    }
}

pub struct Poller<F, M> {
    feed: F,
    channel: M,
    settings: PollSettings,
    state: PollerState,
    observer: Arc<dyn PollObserver>,
}

impl<F: IncidentFeed, M: MessageChannel> Poller<F, M> {
    pub fn new(feed: F, channel: M, settings: PollSettings) -> Self {
        let state = PollerState::new(settings.roadworks_every);
        Self {
            feed,
            channel,
            settings,
            state,
            observer: Arc::new(()),
        }
    }

    pub fn with_observer(mut self, observer: Arc<dyn PollObserver>) -> Self {
        self.observer = observer;
        self
    }

    pub fn state(&self) -> &PollerState {
        &self.state
    }

    /// Fetch the feed and normalize it into a snapshot.
    pub async fn fetch_snapshot(&self) -> Result<Snapshot, FeedError> {
        let records = self.feed.fetch_incidents().await?;
        Snapshot::from_records(records)
    }

    /// Run until `shutdown` flips to true. Returns the final counters.
    pub async fn run(mut self, mut shutdown: watch::Receiver<bool>) -> PollStats {
        log::info!(
            "Poller: starting (interval {:?}, backoff {:?}, roadworks every {} cycles)",
            self.settings.poll_interval,
            self.settings.retry_backoff,
            self.state.cadence().threshold()
        );

        loop {
            if *shutdown.borrow() {
                break;
            }

            let current = match self.fetch_snapshot().await {
                Ok(snapshot) => {
                    self.state.record_fetch_success();
                    snapshot
                }
                Err(e) => {
                    let failures = self.state.record_fetch_failure();
                    if e.is_payload_error() {
                        log::warn!(
                            "Poller: unusable feed response ({} consecutive), maintenance? {}",
                            failures,
                            e
                        );
                    } else {
                        log::warn!("Poller: fetch failed ({} consecutive): {}", failures, e);
                    }
                    self.observer.on_fetch_failure(failures, &e);
                    if wait_or_shutdown(self.settings.retry_backoff, &mut shutdown).await {
                        break;
                    }
                    continue;
                }
            };

            if *shutdown.borrow() {
                break;
            }

            let report = self.run_cycle(current).await;
            self.observer.on_cycle(&report);

            if wait_or_shutdown(self.settings.poll_interval, &mut shutdown).await {
                break;
            }
        }

        log::info!(
            "Poller: stopped after {} cycles ({} fetch failures)",
            self.state.stats().cycles,
            self.state.stats().total_failures
        );
        self.state.stats().clone()
    }

    /// Diff `current` against the previous cycle, notify, then advance state.
    pub async fn run_cycle(&mut self, current: Snapshot) -> CycleReport {
        let major = current.major();
        let major_diff = diff(self.state.previous_major(), &major);

        let roadworks = if self.state.cadence_mut().tick().is_due() {
            let roadworks = current.roadworks();
            let roadworks_diff = diff(self.state.previous_roadworks(), &roadworks);
            Some((roadworks, roadworks_diff))
        } else {
            None
        };

        let mut report = CycleReport {
            fetched: current.len(),
            major_added: major_diff.added.len(),
            major_removed: major_diff.removed.len(),
            roadworks_evaluated: roadworks.is_some(),
            ..CycleReport::default()
        };
        if let Some((_, d)) = &roadworks {
            report.roadworks_added = d.added.len();
            report.roadworks_removed = d.removed.len();
        }

        let now = Utc::now().with_timezone(&self.settings.timezone);

        if !major_diff.is_empty() {
            self.notify_major_changes(&major_diff, &mut report).await;
            let summary = to_html(&render_snapshot(&major, SummaryKind::Major, now));
            let slot = self.settings.major_message_id;
            self.edit_slot(&summary, slot, "major", &mut report).await;
        }

        if let Some((snapshot, roadworks_diff)) = &roadworks {
            if !roadworks_diff.is_empty() {
                let summary = to_html(&render_snapshot(snapshot, SummaryKind::Roadwork, now));
                let slot = self.settings.roadworks_message_id;
                self.edit_slot(&summary, slot, "roadworks", &mut report).await;
            }
        }

        if report.is_noop() {
            log::info!(
                "Poller: no updates ({} incidents, roadworks {})",
                report.fetched,
                if report.roadworks_evaluated { "checked" } else { "skipped" }
            );
        } else {
            log::info!(
                "Poller: major +{}/-{}, roadworks +{}/-{}, {} message(s) updated, {} failed",
                report.major_added,
                report.major_removed,
                report.roadworks_added,
                report.roadworks_removed,
                report.messages_sent,
                report.messages_failed
            );
        }

        self.state.advance(major, roadworks.map(|(snapshot, _)| snapshot));
        report
    }

    /// The change list is always rendered; it is only posted when configured.
    async fn notify_major_changes(&mut self, major_diff: &DiffResult, report: &mut CycleReport) {
        let change_text = to_html(&render_diff(major_diff));
        log::debug!("Poller: major changes\n{}", change_text);

        if !self.settings.send_change_digest {
            return;
        }
        match self.channel.send(&change_text).await {
            Ok(_) => report.messages_sent += 1,
            Err(e) => {
                report.messages_failed += 1;
                self.state.record_notify_failure();
                log::warn!("Poller: failed to post change digest: {}", e);
            }
        }
    }

    async fn edit_slot(&mut self, text: &str, message_id: i64, label: &str, report: &mut CycleReport) {
        match self.channel.edit(text, message_id).await {
            Ok(_) => {
                report.messages_sent += 1;
                log::info!("Poller: updated {} summary (message {})", label, message_id);
            }
            Err(e) if e.is_not_modified() => {
                log::debug!("Poller: {} summary unchanged (message {})", label, message_id);
            }
            Err(e) => {
                report.messages_failed += 1;
                self.state.record_notify_failure();
                log::warn!(
                    "Poller: failed to update {} summary (message {}): {}",
                    label,
                    message_id,
                    e
                );
            }
        }
    }
}

/// Sleep for `delay` unless shutdown is requested first. Returns true on shutdown.
async fn wait_or_shutdown(delay: Duration, shutdown: &mut watch::Receiver<bool>) -> bool {
    let deadline = tokio::time::Instant::now() + delay;
    loop {
        tokio::select! {
            _ = tokio::time::sleep_until(deadline) => return *shutdown.borrow(),
            changed = shutdown.changed() => {
                if changed.is_err() {
                    // Sender gone: nobody can stop us any more, just finish the wait
                    tokio::time::sleep_until(deadline).await;
                    return false;
                }
                if *shutdown.borrow() {
                    return true;
                }
            }
        }
    }
}
