//! Rolling per-user logs: notification deliveries and sync-health reports.

mod notification_log;
mod rotation;
mod sync_health_log;

pub use notification_log::{NotificationLog, NotificationStatus};
pub use rotation::{rotate, NOTIFICATION_LOG_CAP, SYNC_HEALTH_LOG_CAP};
pub use sync_health_log::{NetworkState, PushReceiptStatus, SchedulerStatus, SyncHealthLog};
