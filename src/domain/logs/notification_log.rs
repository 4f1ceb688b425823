//! Notification delivery log entry.

use serde::{Deserialize, Serialize};

use crate::domain::foundation::{NotificationId, Timestamp};

/// Delivery lifecycle of a single push notification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NotificationStatus {
    Pending,
    Sent,
    Delivered,
    Opened,
    Failed,
}

impl NotificationStatus {
    /// Parses the persisted string form.
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "pending" => Some(NotificationStatus::Pending),
            "sent" => Some(NotificationStatus::Sent),
            "delivered" => Some(NotificationStatus::Delivered),
            "opened" => Some(NotificationStatus::Opened),
            "failed" => Some(NotificationStatus::Failed),
            _ => None,
        }
    }

    /// Returns the persisted string form.
    pub fn as_str(&self) -> &'static str {
        match self {
            NotificationStatus::Pending => "pending",
            NotificationStatus::Sent => "sent",
            NotificationStatus::Delivered => "delivered",
            NotificationStatus::Opened => "opened",
            NotificationStatus::Failed => "failed",
        }
    }
}

/// One entry of the bounded per-user notification delivery log.
///
/// Append-only from the caller's perspective; status transitions stamp the
/// matching lifecycle timestamp.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NotificationLog {
    pub id: NotificationId,
    /// Free-form kind tag, e.g. `morning_alarm`, `evening_alarm`, `resync`.
    pub kind: String,
    pub status: NotificationStatus,
    pub scheduled_at: Option<Timestamp>,
    pub sent_at: Option<Timestamp>,
    pub delivered_at: Option<Timestamp>,
    pub opened_at: Option<Timestamp>,
    pub failed_at: Option<Timestamp>,
    pub retry_count: u32,
    pub title: Option<String>,
    pub body: Option<String>,
    pub device_token: Option<String>,
    pub created_at: Timestamp,
}

impl NotificationLog {
    /// Creates a pending log entry at the current instant.
    pub fn new(id: NotificationId, kind: impl Into<String>) -> Self {
        Self {
            id,
            kind: kind.into(),
            status: NotificationStatus::Pending,
            scheduled_at: None,
            sent_at: None,
            delivered_at: None,
            opened_at: None,
            failed_at: None,
            retry_count: 0,
            title: None,
            body: None,
            device_token: None,
            created_at: Timestamp::now(),
        }
    }

    /// Moves the entry to `status`, stamping the matching timestamp.
    ///
    /// A `failed` transition additionally increments the delivery retry
    /// count, so repeated failures are visible without extra entries.
    pub fn transition(&mut self, status: NotificationStatus, at: Timestamp) {
        self.status = status;
        match status {
            NotificationStatus::Pending => self.scheduled_at = Some(at),
            NotificationStatus::Sent => self.sent_at = Some(at),
            NotificationStatus::Delivered => self.delivered_at = Some(at),
            NotificationStatus::Opened => self.opened_at = Some(at),
            NotificationStatus::Failed => {
                self.failed_at = Some(at);
                self.retry_count += 1;
            }
        }
    }
}
