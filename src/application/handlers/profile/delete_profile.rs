//! DeleteProfileHandler - Command handler for removing alarm profiles.

use std::sync::Arc;

use crate::domain::aggregate::UserAggregate;
use crate::domain::foundation::{DomainError, ProfileId, UserId};
use crate::ports::AggregateStore;

/// Command to delete a profile from a user's aggregate.
#[derive(Debug, Clone)]
pub struct DeleteProfileCommand {
    pub user_id: UserId,
    pub profile_id: ProfileId,
}

/// Handler for profile deletion.
///
/// Deleting the active profile clears the schedule's active pointer; no
/// other profile is promoted in its place.
pub struct DeleteProfileHandler {
    store: Arc<dyn AggregateStore>,
}

impl DeleteProfileHandler {
    pub fn new(store: Arc<dyn AggregateStore>) -> Self {
        Self { store }
    }

    pub async fn handle(&self, cmd: DeleteProfileCommand) -> Result<UserAggregate, DomainError> {
        let mut aggregate = self
            .store
            .find(&cmd.user_id)
            .await?
            .ok_or_else(|| DomainError::user_not_found(&cmd.user_id))?;

        let was_active = aggregate.is_profile_active(&cmd.profile_id);
        aggregate.delete_profile(&cmd.profile_id)?;
        self.store.save(&mut aggregate).await?;

        tracing::debug!(
            user_id = %cmd.user_id,
            profile_id = %cmd.profile_id,
            was_active,
            "Alarm profile deleted"
        );
        Ok(aggregate)
    }
}
