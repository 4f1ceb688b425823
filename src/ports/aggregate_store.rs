//! AggregateStore port for user-aggregate persistence.

use async_trait::async_trait;

use crate::domain::aggregate::UserAggregate;
use crate::domain::foundation::{DomainError, UserId};

/// Persistence boundary for user aggregates.
///
/// Writes use optimistic concurrency: `save` compares the aggregate's
/// loaded version against the stored one and fails with
/// `ConcurrencyConflict` when another writer got there first. Callers are
/// expected to re-read and retry (bounded) on that code only.
#[async_trait]
pub trait AggregateStore: Send + Sync {
    /// Creates the aggregate for a user, or returns the existing one.
    ///
    /// Idempotent: a second create for the same user is not an error.
    async fn create(&self, user_id: &UserId) -> Result<UserAggregate, DomainError>;

    /// Loads the aggregate for a user.
    async fn find(&self, user_id: &UserId) -> Result<Option<UserAggregate>, DomainError>;

    /// Persists the aggregate if its version still matches the stored one,
    /// advancing the version on success.
    ///
    /// Returns `UserNotFound` when the aggregate was never created and
    /// `ConcurrencyConflict` when the stored version moved underneath the
    /// caller.
    async fn save(&self, aggregate: &mut UserAggregate) -> Result<(), DomainError>;

    /// Aggregates eligible for notification matching: schedule enabled and
    /// an active profile set.
    async fn list_enabled_schedules(&self) -> Result<Vec<UserAggregate>, DomainError>;
}
