//! AddProfileHandler - Command handler for creating alarm profiles.

use std::sync::Arc;

use crate::domain::aggregate::UserAggregate;
use crate::domain::alarm::{AlarmProfile, ProfileDraft};
use crate::domain::foundation::{DomainError, ProfileId, UserId};
use crate::ports::AggregateStore;

/// Command to add a profile to a user's aggregate.
#[derive(Debug, Clone)]
pub struct AddProfileCommand {
    pub user_id: UserId,
    pub profile_id: ProfileId,
    pub draft: ProfileDraft,
    /// Activate the new profile in the same operation. Most clients add a
    /// profile and immediately make it the active one.
    pub activate: bool,
}

/// Handler for profile creation.
pub struct AddProfileHandler {
    store: Arc<dyn AggregateStore>,
    max_profiles: usize,
}

impl AddProfileHandler {
    pub fn new(store: Arc<dyn AggregateStore>, max_profiles: usize) -> Self {
        Self { store, max_profiles }
    }

    pub async fn handle(&self, cmd: AddProfileCommand) -> Result<UserAggregate, DomainError> {
        // Validation happens before any write: profile construction checks
        // every field, the aggregate checks duplicates and the limit.
        let profile = AlarmProfile::new(cmd.profile_id.clone(), cmd.draft)?;

        let mut aggregate = self
            .store
            .find(&cmd.user_id)
            .await?
            .ok_or_else(|| DomainError::user_not_found(&cmd.user_id))?;

        aggregate.add_profile(profile, self.max_profiles)?;
        if cmd.activate {
            aggregate.activate_profile(&cmd.profile_id)?;
        }

        self.store.save(&mut aggregate).await?;
        tracing::debug!(
            user_id = %cmd.user_id,
            profile_id = %cmd.profile_id,
            activated = cmd.activate,
            "Alarm profile added"
        );
        Ok(aggregate)
    }
}
