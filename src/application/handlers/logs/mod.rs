//! Rolling-log handlers.

mod append_notification_log;
mod append_sync_health_log;
mod update_notification_log_status;

pub use append_notification_log::{
    AppendNotificationLogCommand, AppendNotificationLogHandler, AppendNotificationLogResult,
};
pub use append_sync_health_log::{
    AppendSyncHealthLogCommand, AppendSyncHealthLogHandler, AppendSyncHealthLogResult,
};
pub use update_notification_log_status::{
    UpdateNotificationLogStatusCommand, UpdateNotificationLogStatusHandler,
};
