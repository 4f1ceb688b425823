//! Device sync-health report log entry.

use serde::{Deserialize, Serialize};

use crate::domain::foundation::{DeviceId, Timestamp};

/// Reported state of the device-side background work scheduler.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SchedulerStatus {
    Healthy,
    Failed,
    Timeout,
    Cancelled,
    Unknown,
}

impl SchedulerStatus {
    /// Parses the persisted string form; anything unrecognised is `Unknown`.
    pub fn parse(s: &str) -> Self {
        match s {
            "healthy" => SchedulerStatus::Healthy,
            "failed" => SchedulerStatus::Failed,
            "timeout" => SchedulerStatus::Timeout,
            "cancelled" => SchedulerStatus::Cancelled,
            _ => SchedulerStatus::Unknown,
        }
    }

    /// Returns the persisted string form.
    pub fn as_str(&self) -> &'static str {
        match self {
            SchedulerStatus::Healthy => "healthy",
            SchedulerStatus::Failed => "failed",
            SchedulerStatus::Timeout => "timeout",
            SchedulerStatus::Cancelled => "cancelled",
            SchedulerStatus::Unknown => "unknown",
        }
    }
}

/// Whether the device acknowledged receipt of the last push message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PushReceiptStatus {
    Received,
    Failed,
    NotReceived,
    Pending,
    Unknown,
}

impl PushReceiptStatus {
    /// Parses the persisted string form; anything unrecognised is `Unknown`.
    pub fn parse(s: &str) -> Self {
        match s {
            "received" => PushReceiptStatus::Received,
            "failed" => PushReceiptStatus::Failed,
            "not_received" => PushReceiptStatus::NotReceived,
            "pending" => PushReceiptStatus::Pending,
            _ => PushReceiptStatus::Unknown,
        }
    }

    /// Returns the persisted string form.
    pub fn as_str(&self) -> &'static str {
        match self {
            PushReceiptStatus::Received => "received",
            PushReceiptStatus::Failed => "failed",
            PushReceiptStatus::NotReceived => "not_received",
            PushReceiptStatus::Pending => "pending",
            PushReceiptStatus::Unknown => "unknown",
        }
    }
}

/// Network connectivity the device reported at measurement time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NetworkState {
    Wifi,
    Cellular,
    None,
    Unknown,
}

impl NetworkState {
    /// Parses the persisted string form; anything unrecognised is `Unknown`.
    pub fn parse(s: &str) -> Self {
        match s {
            "wifi" => NetworkState::Wifi,
            "cellular" => NetworkState::Cellular,
            "none" => NetworkState::None,
            _ => NetworkState::Unknown,
        }
    }

    /// Returns the persisted string form.
    pub fn as_str(&self) -> &'static str {
        match self {
            NetworkState::Wifi => "wifi",
            NetworkState::Cellular => "cellular",
            NetworkState::None => "none",
            NetworkState::Unknown => "unknown",
        }
    }
}

/// One entry of the bounded per-user sync-health log.
///
/// Raw metrics as reported by the device, plus the score computed from them
/// at append time.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyncHealthLog {
    pub device_id: DeviceId,
    pub reported_at: Timestamp,
    pub scheduler_status: SchedulerStatus,
    pub push_status: PushReceiptStatus,
    pub missed_alarm_count: u32,
    pub missed_alarm_reason: Option<String>,
    pub doze_mode: bool,
    /// Battery percentage 0-100 when the device reported it.
    pub battery_level: Option<u8>,
    pub network: NetworkState,
    /// Score computed from the fields above when the report was recorded.
    pub health_score: u8,
    pub app_version: Option<String>,
    pub os_version: Option<String>,
    pub note: Option<String>,
}
