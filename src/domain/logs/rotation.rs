//! Bounded-history maintenance for the per-user rolling logs.

use crate::domain::foundation::Timestamp;

/// Maximum retained notification delivery log entries per user.
pub const NOTIFICATION_LOG_CAP: usize = 100;

/// Maximum retained sync-health report entries per user.
pub const SYNC_HEALTH_LOG_CAP: usize = 50;

/// Evicts the oldest entries once `entries` exceeds `cap`.
///
/// A pure function of the list contents: entries are ranked by their own
/// timestamp (newest first, stable for ties) and the list truncated to
/// `cap`. Lists at or under the bound are left untouched, insertion order
/// included.
pub fn rotate<T, F>(entries: &mut Vec<T>, cap: usize, timestamp_of: F)
where
    F: Fn(&T) -> Timestamp,
{
    if entries.len() <= cap {
        return;
    }
    entries.sort_by(|a, b| timestamp_of(b).cmp(&timestamp_of(a)));
    entries.truncate(cap);
}
