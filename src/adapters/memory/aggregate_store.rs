//! In-memory AggregateStore implementation for testing.
//!
//! Deterministic, lock-based stand-in for the PostgreSQL adapter. The
//! version compare-and-swap in `save` runs under the write lock, so it
//! exhibits the same winner/loser behavior under concurrent activation as
//! the transactional store.
//!
//! # Panics
//!
//! Methods may panic if internal locks are poisoned. This is acceptable
//! for test code but this adapter should NOT be used in production.

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::RwLock;

use crate::domain::aggregate::UserAggregate;
use crate::domain::foundation::{DomainError, UserId};
use crate::ports::AggregateStore;

/// In-memory aggregate store keyed by user id.
#[derive(Default)]
pub struct InMemoryAggregateStore {
    aggregates: RwLock<HashMap<UserId, UserAggregate>>,
}

impl InMemoryAggregateStore {
    /// Creates an empty store.
    pub fn new() -> Self {
        Self {
            aggregates: RwLock::new(HashMap::new()),
        }
    }

    /// Number of aggregates held (for test assertions).
    ///
    /// # Panics
    ///
    /// Panics if the internal lock is poisoned.
    pub fn len(&self) -> usize {
        self.aggregates
            .read()
            .expect("InMemoryAggregateStore: lock poisoned")
            .len()
    }

    /// True when no aggregates are held.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[async_trait]
impl AggregateStore for InMemoryAggregateStore {
    async fn create(&self, user_id: &UserId) -> Result<UserAggregate, DomainError> {
        let mut map = self
            .aggregates
            .write()
            .expect("InMemoryAggregateStore: lock poisoned");
        let aggregate = map
            .entry(user_id.clone())
            .or_insert_with(|| UserAggregate::new(user_id.clone()));
        Ok(aggregate.clone())
    }

    async fn find(&self, user_id: &UserId) -> Result<Option<UserAggregate>, DomainError> {
        let map = self
            .aggregates
            .read()
            .expect("InMemoryAggregateStore: lock poisoned");
        Ok(map.get(user_id).cloned())
    }

    async fn save(&self, aggregate: &mut UserAggregate) -> Result<(), DomainError> {
        let mut map = self
            .aggregates
            .write()
            .expect("InMemoryAggregateStore: lock poisoned");
        let stored = map
            .get_mut(aggregate.user_id())
            .ok_or_else(|| DomainError::user_not_found(aggregate.user_id()))?;
        if stored.version() != aggregate.version() {
            return Err(DomainError::concurrency_conflict(aggregate.user_id()));
        }
        aggregate.bump_version();
        *stored = aggregate.clone();
        Ok(())
    }

    async fn list_enabled_schedules(&self) -> Result<Vec<UserAggregate>, DomainError> {
        let map = self
            .aggregates
            .read()
            .expect("InMemoryAggregateStore: lock poisoned");
        Ok(map
            .values()
            .filter(|a| a.schedule().enabled && a.schedule().active_profile_id.is_some())
            .cloned()
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn user(id: &str) -> UserId {
        UserId::new(id).unwrap()
    }

    #[tokio::test]
    async fn create_is_idempotent() {
        let store = InMemoryAggregateStore::new();
        let first = store.create(&user("u1")).await.unwrap();
        let second = store.create(&user("u1")).await.unwrap();
        assert_eq!(first.user_id(), second.user_id());
        assert_eq!(first.created_at(), second.created_at());
        assert_eq!(store.len(), 1);
    }

    #[tokio::test]
    async fn save_rejects_stale_versions() {
        let store = InMemoryAggregateStore::new();
        store.create(&user("u1")).await.unwrap();

        let mut copy_a = store.find(&user("u1")).await.unwrap().unwrap();
        let mut copy_b = store.find(&user("u1")).await.unwrap().unwrap();

        store.save(&mut copy_a).await.unwrap();
        let err = store.save(&mut copy_b).await.unwrap_err();
        assert!(err.is_retryable());
    }

    #[tokio::test]
    async fn save_of_unknown_user_is_not_found() {
        let store = InMemoryAggregateStore::new();
        let mut agg = UserAggregate::new(user("ghost"));
        let err = store.save(&mut agg).await.unwrap_err();
        assert_eq!(
            err.code,
            crate::domain::foundation::ErrorCode::UserNotFound
        );
    }
}
