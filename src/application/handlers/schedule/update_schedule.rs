//! UpdateScheduleHandler - Command handler for the delivery schedule.

use std::sync::Arc;

use crate::domain::aggregate::UserAggregate;
use crate::domain::foundation::{DomainError, Timestamp, UserId};
use crate::domain::schedule::{ScheduleUpdate, Slot};
use crate::ports::AggregateStore;

/// Command to update a user's notification schedule.
#[derive(Debug, Clone)]
pub struct UpdateScheduleCommand {
    pub user_id: UserId,
    pub update: ScheduleUpdate,
}

/// Handler for schedule updates.
///
/// Timezone names are validated against the IANA database before any state
/// changes; next-fire projections are refreshed as part of the write.
pub struct UpdateScheduleHandler {
    store: Arc<dyn AggregateStore>,
}

impl UpdateScheduleHandler {
    pub fn new(store: Arc<dyn AggregateStore>) -> Self {
        Self { store }
    }

    pub async fn handle(&self, cmd: UpdateScheduleCommand) -> Result<UserAggregate, DomainError> {
        let mut aggregate = self
            .store
            .find(&cmd.user_id)
            .await?
            .ok_or_else(|| DomainError::user_not_found(&cmd.user_id))?;

        aggregate.update_schedule(cmd.update)?;
        self.store.save(&mut aggregate).await?;
        Ok(aggregate)
    }
}

/// Command recording that the transport dispatched a slot notification.
///
/// Dispatch itself is out of scope; the transport owner calls this after a
/// successful send so same-day deduplication sees the delivery.
#[derive(Debug, Clone)]
pub struct MarkSlotSentCommand {
    pub user_id: UserId,
    pub slot: Slot,
    pub sent_at: Timestamp,
}

/// Handler stamping the slot-specific and combined last-sent markers.
pub struct MarkSlotSentHandler {
    store: Arc<dyn AggregateStore>,
}

impl MarkSlotSentHandler {
    pub fn new(store: Arc<dyn AggregateStore>) -> Self {
        Self { store }
    }

    pub async fn handle(&self, cmd: MarkSlotSentCommand) -> Result<UserAggregate, DomainError> {
        let mut aggregate = self
            .store
            .find(&cmd.user_id)
            .await?
            .ok_or_else(|| DomainError::user_not_found(&cmd.user_id))?;

        aggregate.mark_slot_sent(cmd.slot, cmd.sent_at);
        self.store.save(&mut aggregate).await?;
        Ok(aggregate)
    }
}
