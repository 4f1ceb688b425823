//! CreateAggregateHandler - Command handler for provisioning a user aggregate.

use std::sync::Arc;

use crate::domain::aggregate::UserAggregate;
use crate::domain::foundation::{DomainError, UserId};
use crate::ports::AggregateStore;

/// Command to create (or fetch) the aggregate for a user.
#[derive(Debug, Clone)]
pub struct CreateAggregateCommand {
    pub user_id: UserId,
}

/// Handler for aggregate creation.
///
/// Idempotent: a user who already has an aggregate gets the existing one
/// back rather than an error, so clients can call this on every login.
pub struct CreateAggregateHandler {
    store: Arc<dyn AggregateStore>,
}

impl CreateAggregateHandler {
    pub fn new(store: Arc<dyn AggregateStore>) -> Self {
        Self { store }
    }

    pub async fn handle(&self, cmd: CreateAggregateCommand) -> Result<UserAggregate, DomainError> {
        let aggregate = self.store.create(&cmd.user_id).await?;
        tracing::debug!(user_id = %cmd.user_id, "Aggregate ready");
        Ok(aggregate)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::InMemoryAggregateStore;

    #[tokio::test]
    async fn creates_then_returns_existing() {
        let store = Arc::new(InMemoryAggregateStore::new());
        let handler = CreateAggregateHandler::new(store.clone());
        let user = UserId::new("u1").unwrap();

        let first = handler
            .handle(CreateAggregateCommand { user_id: user.clone() })
            .await
            .unwrap();
        let second = handler
            .handle(CreateAggregateCommand { user_id: user })
            .await
            .unwrap();

        assert_eq!(first.created_at(), second.created_at());
        assert_eq!(store.len(), 1);
    }
}
