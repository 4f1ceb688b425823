//! Health scoring engine.
//!
//! Pure deduction-based scoring of raw device/sync metrics, plus the two
//! status bucketings surfaced to callers. The two scales are observed at
//! different call sites (per-report status vs. the coarser overall view
//! computed from the most recent report) and are kept as independent
//! functions; unifying them would change observed behavior.

use std::fmt;

use crate::domain::logs::{NetworkState, PushReceiptStatus, SchedulerStatus, SyncHealthLog};

/// Score at or above which a recorded report counts as a successful sync
/// when mirrored onto the active profile.
pub const SYNC_OK_THRESHOLD: u8 = 70;

/// Raw metrics a device reports about its alarm/sync reliability.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HealthMetrics {
    pub scheduler_status: SchedulerStatus,
    pub push_status: PushReceiptStatus,
    pub missed_alarm_count: u32,
    pub doze_mode: bool,
    pub network: NetworkState,
}

impl HealthMetrics {
    /// Extracts the scoring inputs from a persisted report.
    pub fn from_log(log: &SyncHealthLog) -> Self {
        Self {
            scheduler_status: log.scheduler_status,
            push_status: log.push_status,
            missed_alarm_count: log.missed_alarm_count,
            doze_mode: log.doze_mode,
            network: log.network,
        }
    }
}

/// Human-readable health band.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HealthStatus {
    Excellent,
    Good,
    Fair,
    Poor,
    Critical,
}

impl HealthStatus {
    /// Returns the persisted/displayed string form.
    pub fn as_str(&self) -> &'static str {
        match self {
            HealthStatus::Excellent => "excellent",
            HealthStatus::Good => "good",
            HealthStatus::Fair => "fair",
            HealthStatus::Poor => "poor",
            HealthStatus::Critical => "critical",
        }
    }
}

impl fmt::Display for HealthStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Computes the 0-100 health score for a set of metrics.
///
/// Starts at 100 and applies fixed deductions per failing signal; the
/// missed-alarm penalty is 10 per alarm capped at 30. Deterministic: equal
/// input, equal output.
pub fn score(metrics: &HealthMetrics) -> u8 {
    let mut score: i32 = 100;

    score -= match metrics.scheduler_status {
        SchedulerStatus::Failed => 15,
        SchedulerStatus::Timeout => 10,
        SchedulerStatus::Cancelled => 5,
        SchedulerStatus::Healthy | SchedulerStatus::Unknown => 0,
    };

    score -= match metrics.push_status {
        PushReceiptStatus::Failed => 20,
        PushReceiptStatus::NotReceived => 15,
        PushReceiptStatus::Pending => 5,
        PushReceiptStatus::Received | PushReceiptStatus::Unknown => 0,
    };

    score -= (metrics.missed_alarm_count.saturating_mul(10)).min(30) as i32;

    if metrics.doze_mode {
        score -= 5;
    }

    score -= match metrics.network {
        NetworkState::None => 5,
        NetworkState::Cellular => 2,
        NetworkState::Wifi | NetworkState::Unknown => 0,
    };

    score.clamp(0, 100) as u8
}

/// Per-report status band: 90 / 75 / 60 / 40 thresholds.
pub fn status_label(score: u8) -> HealthStatus {
    match score {
        90..=u8::MAX => HealthStatus::Excellent,
        75..=89 => HealthStatus::Good,
        60..=74 => HealthStatus::Fair,
        40..=59 => HealthStatus::Poor,
        _ => HealthStatus::Critical,
    }
}

/// Coarse overall-health band used by the aggregate view, computed from the
/// most recent report only: 80 / 60 / 40 / 20 thresholds.
pub fn overall_bucket(score: u8) -> HealthStatus {
    match score {
        80..=u8::MAX => HealthStatus::Excellent,
        60..=79 => HealthStatus::Good,
        40..=59 => HealthStatus::Fair,
        20..=39 => HealthStatus::Poor,
        _ => HealthStatus::Critical,
    }
}

/// Generates remediation hints for the deductions that fired.
///
/// Order is fixed: scheduler issues, push issues, missed alarms, doze.
pub fn recommendations(metrics: &HealthMetrics) -> Vec<String> {
    let mut out = Vec::new();

    match metrics.scheduler_status {
        SchedulerStatus::Failed => {
            out.push("Background work scheduler is failing; ask the user to disable battery optimization for the app".to_string());
        }
        SchedulerStatus::Timeout => {
            out.push("Background work scheduler is timing out; alarm refresh may be delayed".to_string());
        }
        SchedulerStatus::Cancelled => {
            out.push("Background work was cancelled by the OS; alarms may not refresh until the app is opened".to_string());
        }
        SchedulerStatus::Healthy | SchedulerStatus::Unknown => {}
    }

    match metrics.push_status {
        PushReceiptStatus::Failed => {
            out.push("Push delivery failed on the device; verify the registration token is current".to_string());
        }
        PushReceiptStatus::NotReceived => {
            out.push("Push messages are not reaching the device; check notification permissions".to_string());
        }
        PushReceiptStatus::Pending => {
            out.push("Push receipt still pending; device may be offline".to_string());
        }
        PushReceiptStatus::Received | PushReceiptStatus::Unknown => {}
    }

    if metrics.missed_alarm_count > 0 {
        out.push(format!(
            "{} alarm(s) missed since the last report; consider prompting the user to re-sync",
            metrics.missed_alarm_count
        ));
    }

    if metrics.doze_mode {
        out.push("Device is in doze/low-power mode; delivery timing may drift".to_string());
    }

    out
}
