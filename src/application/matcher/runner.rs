//! MatcherRunner - Background service driving the notification scan.
//!
//! Runs the schedule matcher on a fixed tick and hands matched users to
//! the transport-side dispatcher. Because slot matching is exact-minute,
//! the tick interval MUST stay at or below one minute; a skipped tick
//! skips the affected users until the next day.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;
use tokio::time;

use crate::domain::foundation::{DomainError, Timestamp};
use crate::domain::schedule::Slot;
use crate::ports::NotificationDispatcher;

use super::ScheduleMatcher;

/// Configuration for the MatcherRunner service.
#[derive(Debug, Clone)]
pub struct MatcherConfig {
    /// How often to scan for due users. Must be <= 60s for exact-minute
    /// matching to hit every configured slot time.
    pub poll_interval: Duration,
}

impl Default for MatcherConfig {
    fn default() -> Self {
        Self {
            poll_interval: Duration::from_secs(60),
        }
    }
}

impl MatcherConfig {
    /// Create config with a custom poll interval.
    pub fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }
}

/// Background service that periodically scans for due notifications.
pub struct MatcherRunner {
    matcher: ScheduleMatcher,
    dispatcher: Arc<dyn NotificationDispatcher>,
    config: MatcherConfig,
}

impl MatcherRunner {
    /// Create a new MatcherRunner with default configuration.
    pub fn new(matcher: ScheduleMatcher, dispatcher: Arc<dyn NotificationDispatcher>) -> Self {
        Self {
            matcher,
            dispatcher,
            config: MatcherConfig::default(),
        }
    }

    /// Create a new MatcherRunner with custom configuration.
    pub fn with_config(
        matcher: ScheduleMatcher,
        dispatcher: Arc<dyn NotificationDispatcher>,
        config: MatcherConfig,
    ) -> Self {
        Self {
            matcher,
            dispatcher,
            config,
        }
    }

    /// Run the scan loop until a shutdown signal is received.
    pub async fn run(&self, mut shutdown: watch::Receiver<bool>) -> Result<(), DomainError> {
        if self.config.poll_interval > Duration::from_secs(60) {
            tracing::warn!(
                poll_interval_secs = self.config.poll_interval.as_secs(),
                "Matcher tick slower than one minute; exact-minute slots will be skipped"
            );
        }
        let mut interval = time::interval(self.config.poll_interval);

        loop {
            tokio::select! {
                _ = shutdown.changed() => {
                    if *shutdown.borrow() {
                        return Ok(());
                    }
                }
                _ = interval.tick() => {
                    // One failed tick is not fatal; the next tick retries.
                    if let Err(e) = self.scan_once(Timestamp::now()).await {
                        tracing::error!(error = %e, "Notification scan failed");
                    }
                }
            }
        }
    }

    /// Run exactly one scan over both slots (also useful for testing).
    pub async fn scan_once(&self, now: Timestamp) -> Result<usize, DomainError> {
        let mut dispatched = 0;
        for slot in [Slot::Morning, Slot::Evening] {
            let matches = self.matcher.users_due_for_notification(slot, now).await?;
            if matches.is_empty() {
                continue;
            }
            dispatched += matches.len();
            tracing::info!(slot = %slot, count = matches.len(), "Dispatching due notifications");
            self.dispatcher.dispatch(matches).await?;
        }
        Ok(dispatched)
    }
}
