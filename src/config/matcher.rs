//! Notification matcher configuration

use serde::Deserialize;
use std::time::Duration;

use super::error::ValidationError;

/// Notification matcher configuration
#[derive(Debug, Clone, Deserialize)]
pub struct MatcherSettings {
    /// Scan interval in seconds. Exact-minute slot matching requires a
    /// value of 60 or less.
    #[serde(default = "default_poll_interval")]
    pub poll_interval_secs: u64,

    /// Maximum users returned by a resync scan
    #[serde(default = "default_resync_limit")]
    pub resync_limit: usize,
}

impl MatcherSettings {
    /// Get poll interval as Duration
    pub fn poll_interval(&self) -> Duration {
        Duration::from_secs(self.poll_interval_secs)
    }

    /// Validate matcher configuration
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.poll_interval_secs == 0 || self.poll_interval_secs > 60 {
            return Err(ValidationError::InvalidPollInterval);
        }
        Ok(())
    }
}

impl Default for MatcherSettings {
    fn default() -> Self {
        Self {
            poll_interval_secs: default_poll_interval(),
            resync_limit: default_resync_limit(),
        }
    }
}

fn default_poll_interval() -> u64 {
    60
}

fn default_resync_limit() -> usize {
    50
}
