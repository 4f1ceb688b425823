//! UpdateNotificationLogStatusHandler - delivery lifecycle transitions.

use std::sync::Arc;

use crate::domain::aggregate::UserAggregate;
use crate::domain::foundation::{DomainError, NotificationId, Timestamp, UserId};
use crate::domain::logs::NotificationStatus;
use crate::ports::AggregateStore;

/// Command to move a logged notification to a new delivery status.
#[derive(Debug, Clone)]
pub struct UpdateNotificationLogStatusCommand {
    pub user_id: UserId,
    pub notification_id: NotificationId,
    pub status: NotificationStatus,
    /// Instant of the transition; defaults to now when absent.
    pub at: Option<Timestamp>,
}

/// Handler for notification status transitions.
pub struct UpdateNotificationLogStatusHandler {
    store: Arc<dyn AggregateStore>,
}

impl UpdateNotificationLogStatusHandler {
    pub fn new(store: Arc<dyn AggregateStore>) -> Self {
        Self { store }
    }

    pub async fn handle(
        &self,
        cmd: UpdateNotificationLogStatusCommand,
    ) -> Result<UserAggregate, DomainError> {
        let mut aggregate = self
            .store
            .find(&cmd.user_id)
            .await?
            .ok_or_else(|| DomainError::user_not_found(&cmd.user_id))?;

        let at = cmd.at.unwrap_or_else(Timestamp::now);
        aggregate.update_notification_log_status(&cmd.notification_id, cmd.status, at)?;
        self.store.save(&mut aggregate).await?;
        Ok(aggregate)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::InMemoryAggregateStore;
    use crate::domain::foundation::ErrorCode;
    use crate::domain::logs::NotificationLog;
    use crate::ports::AggregateStore as _;

    #[tokio::test]
    async fn transitions_and_persists() {
        let store = Arc::new(InMemoryAggregateStore::new());
        let user = UserId::new("u1").unwrap();
        let mut aggregate = store.create(&user).await.unwrap();
        let id = NotificationId::new();
        aggregate.append_notification_log(NotificationLog::new(id, "morning_alarm"));
        store.save(&mut aggregate).await.unwrap();

        let handler = UpdateNotificationLogStatusHandler::new(store.clone());
        handler
            .handle(UpdateNotificationLogStatusCommand {
                user_id: user.clone(),
                notification_id: id,
                status: NotificationStatus::Delivered,
                at: None,
            })
            .await
            .unwrap();

        let stored = store.find(&user).await.unwrap().unwrap();
        assert_eq!(stored.notification_logs()[0].status, NotificationStatus::Delivered);
        assert!(stored.notification_logs()[0].delivered_at.is_some());
    }

    #[tokio::test]
    async fn unknown_entry_is_not_found() {
        let store = Arc::new(InMemoryAggregateStore::new());
        let user = UserId::new("u1").unwrap();
        store.create(&user).await.unwrap();

        let handler = UpdateNotificationLogStatusHandler::new(store);
        let err = handler
            .handle(UpdateNotificationLogStatusCommand {
                user_id: user,
                notification_id: NotificationId::new(),
                status: NotificationStatus::Sent,
                at: None,
            })
            .await
            .unwrap_err();
        assert_eq!(err.code, ErrorCode::NotificationLogNotFound);
    }
}
