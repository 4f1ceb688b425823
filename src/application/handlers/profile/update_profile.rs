//! UpdateProfileHandler - Command handler for partial profile updates.

use std::sync::Arc;

use crate::domain::aggregate::UserAggregate;
use crate::domain::alarm::ProfileUpdate;
use crate::domain::foundation::{DomainError, ProfileId, UserId};
use crate::ports::AggregateStore;

/// Command to update fields of an existing profile.
///
/// `update.is_active = Some(true)` activates the profile before applying
/// the remaining fields; `Some(false)` is rejected outright.
#[derive(Debug, Clone)]
pub struct UpdateProfileCommand {
    pub user_id: UserId,
    pub profile_id: ProfileId,
    pub update: ProfileUpdate,
}

/// Handler for profile updates.
pub struct UpdateProfileHandler {
    store: Arc<dyn AggregateStore>,
}

impl UpdateProfileHandler {
    pub fn new(store: Arc<dyn AggregateStore>) -> Self {
        Self { store }
    }

    pub async fn handle(&self, cmd: UpdateProfileCommand) -> Result<UserAggregate, DomainError> {
        let mut aggregate = self
            .store
            .find(&cmd.user_id)
            .await?
            .ok_or_else(|| DomainError::user_not_found(&cmd.user_id))?;

        aggregate.update_profile(&cmd.profile_id, cmd.update)?;
        self.store.save(&mut aggregate).await?;
        Ok(aggregate)
    }
}
