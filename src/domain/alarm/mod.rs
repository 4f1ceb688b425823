//! Alarm profile entity and related value objects.

mod profile;

pub use profile::{
    AlarmProfile, DeviceSyncStatus, ProfileDraft, ProfileUpdate, SyncStatus, SyncTracking,
};
