//! AppendNotificationLogHandler - Command handler for delivery log entries.

use std::sync::Arc;

use crate::domain::aggregate::UserAggregate;
use crate::domain::foundation::{DomainError, NotificationId, Timestamp, UserId};
use crate::domain::logs::NotificationLog;
use crate::ports::AggregateStore;

/// Command to append a notification delivery log entry.
#[derive(Debug, Clone)]
pub struct AppendNotificationLogCommand {
    pub user_id: UserId,
    /// Entry id; assigned by the handler when the caller does not supply one.
    pub notification_id: Option<NotificationId>,
    pub kind: String,
    pub scheduled_at: Option<Timestamp>,
    pub title: Option<String>,
    pub body: Option<String>,
    pub device_token: Option<String>,
}

/// Result of a successful append.
#[derive(Debug, Clone)]
pub struct AppendNotificationLogResult {
    pub notification_id: NotificationId,
    pub aggregate: UserAggregate,
}

/// Handler for notification log appends.
///
/// The log is bounded; appending past 100 entries silently evicts the
/// oldest as part of the same write.
pub struct AppendNotificationLogHandler {
    store: Arc<dyn AggregateStore>,
}

impl AppendNotificationLogHandler {
    pub fn new(store: Arc<dyn AggregateStore>) -> Self {
        Self { store }
    }

    pub async fn handle(
        &self,
        cmd: AppendNotificationLogCommand,
    ) -> Result<AppendNotificationLogResult, DomainError> {
        if cmd.kind.is_empty() {
            return Err(DomainError::validation("kind", "Notification kind cannot be empty"));
        }

        let mut aggregate = self
            .store
            .find(&cmd.user_id)
            .await?
            .ok_or_else(|| DomainError::user_not_found(&cmd.user_id))?;

        let notification_id = cmd.notification_id.unwrap_or_default();
        let mut log = NotificationLog::new(notification_id, cmd.kind);
        log.scheduled_at = cmd.scheduled_at;
        log.title = cmd.title;
        log.body = cmd.body;
        log.device_token = cmd.device_token;

        aggregate.append_notification_log(log);
        self.store.save(&mut aggregate).await?;

        Ok(AppendNotificationLogResult {
            notification_id,
            aggregate,
        })
    }
}
