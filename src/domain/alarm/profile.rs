//! AlarmProfile entity and its sync-tracking block.
//!
//! A profile describes one alarm configuration: which content to play, how
//! many alarms per day, on which weekdays, and inside which wall-clock
//! window. Whether a profile is *active* is not stored here — activity is
//! the aggregate's `schedule.active_profile_id` pointer, so two profiles
//! can never both claim to be active.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::domain::foundation::{DeviceId, ProfileId, TimeOfDay, Timestamp, ValidationError};

/// Outcome of the most recent sync between a device and the backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SyncStatus {
    Success,
    Failed,
}

impl SyncStatus {
    /// Parses the persisted string form.
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "success" => Some(SyncStatus::Success),
            "failed" => Some(SyncStatus::Failed),
            _ => None,
        }
    }

    /// Returns the persisted string form.
    pub fn as_str(&self) -> &'static str {
        match self {
            SyncStatus::Success => "success",
            SyncStatus::Failed => "failed",
        }
    }
}

/// Per-device sync state, carried inside a profile's sync-tracking block.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeviceSyncStatus {
    pub device_id: DeviceId,
    pub last_synced_at: Timestamp,
    pub status: SyncStatus,
}

/// Sync-tracking fields mirrored onto the active profile by health reports.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SyncTracking {
    pub last_synced_at: Option<Timestamp>,
    pub last_sync_source: Option<String>,
    pub last_sync_status: Option<SyncStatus>,
    /// Most recent computed health score, 0-100.
    pub health_score: Option<u8>,
    pub next_check_at: Option<Timestamp>,
    pub devices: Vec<DeviceSyncStatus>,
}

/// Caller-supplied fields for creating a profile.
#[derive(Debug, Clone)]
pub struct ProfileDraft {
    pub content_url: String,
    pub alarms_per_day: u8,
    /// ISO weekday numbers, 1 = Monday through 7 = Sunday.
    pub weekdays: Vec<u8>,
    pub window_start: TimeOfDay,
    pub window_end: TimeOfDay,
    pub fixed_time: Option<TimeOfDay>,
    /// Explicit dates that override the weekday pattern, if any.
    pub dates: Vec<NaiveDate>,
}

/// Partial update to an existing profile. `None` leaves a field unchanged.
#[derive(Debug, Clone, Default)]
pub struct ProfileUpdate {
    pub content_url: Option<String>,
    pub alarms_per_day: Option<u8>,
    pub weekdays: Option<Vec<u8>>,
    pub window_start: Option<TimeOfDay>,
    pub window_end: Option<TimeOfDay>,
    pub fixed_time: Option<Option<TimeOfDay>>,
    pub dates: Option<Vec<NaiveDate>>,
    /// `Some(true)` requests activation; `Some(false)` is rejected by the
    /// update handler (deactivation happens by activating another profile
    /// or deleting this one).
    pub is_active: Option<bool>,
}

/// One alarm configuration belonging to a user aggregate.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AlarmProfile {
    id: ProfileId,
    content_url: String,
    alarms_per_day: u8,
    weekdays: Vec<u8>,
    window_start: TimeOfDay,
    window_end: TimeOfDay,
    fixed_time: Option<TimeOfDay>,
    dates: Vec<NaiveDate>,
    sync: SyncTracking,
    created_at: Timestamp,
    updated_at: Timestamp,
}

impl AlarmProfile {
    /// Creates a profile from caller-supplied data, validating every field.
    pub fn new(id: ProfileId, draft: ProfileDraft) -> Result<Self, ValidationError> {
        Self::validate_content_url(&draft.content_url)?;
        Self::validate_alarms_per_day(draft.alarms_per_day)?;
        let weekdays = Self::validate_weekdays(draft.weekdays)?;

        let now = Timestamp::now();
        Ok(Self {
            id,
            content_url: draft.content_url,
            alarms_per_day: draft.alarms_per_day,
            weekdays,
            window_start: draft.window_start,
            window_end: draft.window_end,
            fixed_time: draft.fixed_time,
            dates: draft.dates,
            sync: SyncTracking::default(),
            created_at: now,
            updated_at: now,
        })
    }

    /// Reconstitutes a profile from persisted data, bypassing validation
    /// already performed at creation time.
    #[allow(clippy::too_many_arguments)]
    pub fn reconstitute(
        id: ProfileId,
        content_url: String,
        alarms_per_day: u8,
        weekdays: Vec<u8>,
        window_start: TimeOfDay,
        window_end: TimeOfDay,
        fixed_time: Option<TimeOfDay>,
        dates: Vec<NaiveDate>,
        sync: SyncTracking,
        created_at: Timestamp,
        updated_at: Timestamp,
    ) -> Self {
        Self {
            id,
            content_url,
            alarms_per_day,
            weekdays,
            window_start,
            window_end,
            fixed_time,
            dates,
            sync,
            created_at,
            updated_at,
        }
    }

    // ───────────────────────────────────────────────────────────────
    // Accessors
    // ───────────────────────────────────────────────────────────────

    pub fn id(&self) -> &ProfileId {
        &self.id
    }

    pub fn content_url(&self) -> &str {
        &self.content_url
    }

    pub fn alarms_per_day(&self) -> u8 {
        self.alarms_per_day
    }

    pub fn weekdays(&self) -> &[u8] {
        &self.weekdays
    }

    pub fn window_start(&self) -> TimeOfDay {
        self.window_start
    }

    pub fn window_end(&self) -> TimeOfDay {
        self.window_end
    }

    pub fn fixed_time(&self) -> Option<TimeOfDay> {
        self.fixed_time
    }

    pub fn dates(&self) -> &[NaiveDate] {
        &self.dates
    }

    pub fn sync(&self) -> &SyncTracking {
        &self.sync
    }

    pub fn created_at(&self) -> Timestamp {
        self.created_at
    }

    pub fn updated_at(&self) -> Timestamp {
        self.updated_at
    }

    // ───────────────────────────────────────────────────────────────
    // Mutations
    // ───────────────────────────────────────────────────────────────

    /// Applies the non-activation fields of an update.
    ///
    /// The `is_active` member is the activation coordinator's concern and is
    /// ignored here.
    pub fn apply(&mut self, update: ProfileUpdate) -> Result<(), ValidationError> {
        if let Some(url) = update.content_url {
            Self::validate_content_url(&url)?;
            self.content_url = url;
        }
        if let Some(count) = update.alarms_per_day {
            Self::validate_alarms_per_day(count)?;
            self.alarms_per_day = count;
        }
        if let Some(weekdays) = update.weekdays {
            self.weekdays = Self::validate_weekdays(weekdays)?;
        }
        if let Some(start) = update.window_start {
            self.window_start = start;
        }
        if let Some(end) = update.window_end {
            self.window_end = end;
        }
        if let Some(fixed) = update.fixed_time {
            self.fixed_time = fixed;
        }
        if let Some(dates) = update.dates {
            self.dates = dates;
        }
        self.updated_at = Timestamp::now();
        Ok(())
    }

    /// Refreshes `updated_at`, used when activation touches this profile.
    pub fn touch(&mut self) {
        self.updated_at = Timestamp::now();
    }

    /// Mirrors a computed health report onto the sync-tracking block.
    pub fn record_sync_report(
        &mut self,
        score: u8,
        status: SyncStatus,
        source: impl Into<String>,
        reported_at: Timestamp,
        next_check_at: Option<Timestamp>,
    ) {
        self.sync.health_score = Some(score);
        self.sync.last_sync_status = Some(status);
        self.sync.last_sync_source = Some(source.into());
        self.sync.last_synced_at = Some(reported_at);
        if next_check_at.is_some() {
            self.sync.next_check_at = next_check_at;
        }
        self.updated_at = Timestamp::now();
    }

    /// Upserts the per-device sync entry for `device_id`.
    pub fn record_device_sync(&mut self, device_id: DeviceId, status: SyncStatus, at: Timestamp) {
        match self.sync.devices.iter_mut().find(|d| d.device_id == device_id) {
            Some(entry) => {
                entry.last_synced_at = at;
                entry.status = status;
            }
            None => self.sync.devices.push(DeviceSyncStatus {
                device_id,
                last_synced_at: at,
                status,
            }),
        }
    }

    // ───────────────────────────────────────────────────────────────
    // Validation
    // ───────────────────────────────────────────────────────────────

    fn validate_content_url(url: &str) -> Result<(), ValidationError> {
        if url.is_empty() {
            return Err(ValidationError::empty_field("content_url"));
        }
        Ok(())
    }

    fn validate_alarms_per_day(count: u8) -> Result<(), ValidationError> {
        if !(1..=24).contains(&count) {
            return Err(ValidationError::out_of_range("alarms_per_day", 1, 24, count as i32));
        }
        Ok(())
    }

    fn validate_weekdays(mut weekdays: Vec<u8>) -> Result<Vec<u8>, ValidationError> {
        if weekdays.is_empty() {
            return Err(ValidationError::empty_field("weekdays"));
        }
        for &day in &weekdays {
            if !(1..=7).contains(&day) {
                return Err(ValidationError::out_of_range("weekdays", 1, 7, day as i32));
            }
        }
        weekdays.sort_unstable();
        weekdays.dedup();
        Ok(weekdays)
    }
}
