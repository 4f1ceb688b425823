//! GetAggregateHandler - Query handler for reading a user aggregate.

use std::sync::Arc;

use crate::domain::aggregate::UserAggregate;
use crate::domain::foundation::{DomainError, UserId};
use crate::ports::AggregateStore;

/// Query for one user's aggregate.
#[derive(Debug, Clone)]
pub struct GetAggregateQuery {
    pub user_id: UserId,
}

/// Handler for aggregate reads.
pub struct GetAggregateHandler {
    store: Arc<dyn AggregateStore>,
}

impl GetAggregateHandler {
    pub fn new(store: Arc<dyn AggregateStore>) -> Self {
        Self { store }
    }

    pub async fn handle(&self, query: GetAggregateQuery) -> Result<UserAggregate, DomainError> {
        self.store
            .find(&query.user_id)
            .await?
            .ok_or_else(|| DomainError::user_not_found(&query.user_id))
    }
}
