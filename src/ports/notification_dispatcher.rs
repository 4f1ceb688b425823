//! NotificationDispatcher port for the delivery transport boundary.

use async_trait::async_trait;

use crate::domain::foundation::{DomainError, ProfileId, TimeOfDay, Timestamp, UserId};
use crate::domain::schedule::Slot;

/// One user due a slot notification right now.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NotificationMatch {
    pub user_id: UserId,
    pub profile_id: ProfileId,
    pub slot: Slot,
    /// Wall-clock slot time that matched, in the user's timezone.
    pub slot_time: TimeOfDay,
    pub timezone: String,
    /// Scan instant the match was computed for.
    pub matched_at: Timestamp,
}

/// Transport-side consumer of matcher output.
///
/// Dispatch (the actual push send) is out of scope for this crate; the
/// implementation behind this port owns delivery and is responsible for
/// marking the slot sent afterwards so deduplication takes effect.
#[async_trait]
pub trait NotificationDispatcher: Send + Sync {
    async fn dispatch(&self, matches: Vec<NotificationMatch>) -> Result<(), DomainError>;
}
