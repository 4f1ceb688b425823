//! UserAggregate - the per-user root record.
//!
//! One aggregate per user holds the alarm profiles, the delivery schedule,
//! and both rolling logs. Every mutation goes through a method here so the
//! schema-level invariants hold at all times:
//!
//! - profile ids are unique within the aggregate;
//! - `schedule.active_profile_id` always points at an existing profile or
//!   is `None` (activity is this one pointer, so at most one profile is
//!   active by construction);
//! - both logs stay within their bounds;
//! - `metadata` is recomputed inside the same mutation that changed the
//!   underlying state, never written independently.

use crate::domain::alarm::{AlarmProfile, ProfileUpdate, SyncStatus};
use crate::domain::foundation::{
    DeviceId, DomainError, ErrorCode, NotificationId, ProfileId, Timestamp, UserId,
};
use crate::domain::health::{self, HealthStatus};
use crate::domain::logs::{
    rotate, NotificationLog, NotificationStatus, SyncHealthLog, NOTIFICATION_LOG_CAP,
    SYNC_HEALTH_LOG_CAP,
};
use crate::domain::schedule::{FcmSchedule, ScheduleUpdate, Slot};

/// Hours until the next sync check after a successful health report.
const NEXT_CHECK_OK_HOURS: i64 = 24;

/// Hours until the next sync check after a failing health report.
const NEXT_CHECK_DEGRADED_HOURS: i64 = 6;

/// Derived counters and activity timestamps.
///
/// A projection of the aggregate's current contents; recomputed on every
/// mutation and on reconstitution, so persisted copies can never drift into
/// being authoritative.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AggregateMetadata {
    pub profile_count: u32,
    pub has_active_profile: bool,
    pub notification_log_count: u32,
    pub sync_health_log_count: u32,
    pub last_notification_at: Option<Timestamp>,
    pub last_sync_report_at: Option<Timestamp>,
    pub updated_at: Timestamp,
}

/// The per-user aggregate root.
#[derive(Debug, Clone)]
pub struct UserAggregate {
    user_id: UserId,
    /// Persistence version for optimistic concurrency; advanced by the
    /// store after each successful compare-and-swap write.
    version: i64,
    profiles: Vec<AlarmProfile>,
    schedule: FcmSchedule,
    notification_logs: Vec<NotificationLog>,
    sync_health_logs: Vec<SyncHealthLog>,
    metadata: AggregateMetadata,
    created_at: Timestamp,
}

impl UserAggregate {
    /// Creates an empty aggregate for a user.
    pub fn new(user_id: UserId) -> Self {
        let now = Timestamp::now();
        Self {
            user_id,
            version: 0,
            profiles: Vec::new(),
            schedule: FcmSchedule::new_default(),
            notification_logs: Vec::new(),
            sync_health_logs: Vec::new(),
            metadata: AggregateMetadata {
                profile_count: 0,
                has_active_profile: false,
                notification_log_count: 0,
                sync_health_log_count: 0,
                last_notification_at: None,
                last_sync_report_at: None,
                updated_at: now,
            },
            created_at: now,
        }
    }

    /// Reconstitutes an aggregate from persisted data.
    ///
    /// Metadata is recomputed from the loaded collections rather than
    /// trusted from storage.
    pub fn reconstitute(
        user_id: UserId,
        version: i64,
        profiles: Vec<AlarmProfile>,
        schedule: FcmSchedule,
        notification_logs: Vec<NotificationLog>,
        sync_health_logs: Vec<SyncHealthLog>,
        created_at: Timestamp,
    ) -> Self {
        let mut aggregate = Self {
            user_id,
            version,
            profiles,
            schedule,
            notification_logs,
            sync_health_logs,
            metadata: AggregateMetadata {
                profile_count: 0,
                has_active_profile: false,
                notification_log_count: 0,
                sync_health_log_count: 0,
                last_notification_at: None,
                last_sync_report_at: None,
                updated_at: created_at,
            },
            created_at,
        };
        aggregate.recompute_metadata();
        aggregate
    }

    // ───────────────────────────────────────────────────────────────
    // Accessors
    // ───────────────────────────────────────────────────────────────

    pub fn user_id(&self) -> &UserId {
        &self.user_id
    }

    pub fn version(&self) -> i64 {
        self.version
    }

    pub fn profiles(&self) -> &[AlarmProfile] {
        &self.profiles
    }

    /// Looks up a profile by id.
    pub fn profile(&self, profile_id: &ProfileId) -> Option<&AlarmProfile> {
        self.profiles.iter().find(|p| p.id() == profile_id)
    }

    pub fn schedule(&self) -> &FcmSchedule {
        &self.schedule
    }

    pub fn notification_logs(&self) -> &[NotificationLog] {
        &self.notification_logs
    }

    pub fn sync_health_logs(&self) -> &[SyncHealthLog] {
        &self.sync_health_logs
    }

    pub fn metadata(&self) -> &AggregateMetadata {
        &self.metadata
    }

    pub fn created_at(&self) -> Timestamp {
        self.created_at
    }

    /// True when `profile_id` is the currently active profile.
    pub fn is_profile_active(&self, profile_id: &ProfileId) -> bool {
        self.schedule.active_profile_id.as_ref() == Some(profile_id)
    }

    /// The currently active profile, if any.
    pub fn active_profile(&self) -> Option<&AlarmProfile> {
        self.schedule
            .active_profile_id
            .as_ref()
            .and_then(|id| self.profiles.iter().find(|p| p.id() == id))
    }

    /// Coarse overall health from the most recent sync report.
    pub fn overall_health(&self) -> Option<(u8, HealthStatus)> {
        self.sync_health_logs
            .iter()
            .max_by_key(|log| log.reported_at)
            .map(|log| (log.health_score, health::overall_bucket(log.health_score)))
    }

    /// Store-side: advances the version after a successful CAS write.
    pub fn bump_version(&mut self) {
        self.version += 1;
    }

    // ───────────────────────────────────────────────────────────────
    // Profile operations
    // ───────────────────────────────────────────────────────────────

    /// Adds a profile, rejecting duplicates and over-limit aggregates.
    ///
    /// The new profile is never active on insertion; activity is assigned
    /// only through [`UserAggregate::activate_profile`].
    pub fn add_profile(
        &mut self,
        profile: AlarmProfile,
        max_profiles: usize,
    ) -> Result<(), DomainError> {
        if self.profiles.iter().any(|p| p.id() == profile.id()) {
            return Err(DomainError::new(
                ErrorCode::DuplicateProfile,
                format!("Profile id already exists: {}", profile.id()),
            ));
        }
        if self.profiles.len() >= max_profiles {
            return Err(DomainError::new(
                ErrorCode::ProfileLimitReached,
                format!("User already holds {} profiles", self.profiles.len()),
            ));
        }
        self.profiles.push(profile);
        self.recompute_metadata();
        Ok(())
    }

    /// Makes `profile_id` the active profile and enables the schedule.
    ///
    /// Idempotent for the same target. The previous active profile is
    /// deactivated implicitly because activity is the schedule pointer.
    pub fn activate_profile(&mut self, profile_id: &ProfileId) -> Result<(), DomainError> {
        let now = Timestamp::now();
        let profile = self
            .profiles
            .iter_mut()
            .find(|p| p.id() == profile_id)
            .ok_or_else(|| DomainError::profile_not_found(profile_id))?;
        profile.touch();

        self.schedule.active_profile_id = Some(profile_id.clone());
        self.schedule.enabled = true;
        self.schedule.updated_at = now;
        self.schedule.recompute_next_fires(now);
        self.recompute_metadata();
        Ok(())
    }

    /// Applies a partial update to a profile.
    ///
    /// `is_active = true` activates the profile first, then applies the
    /// remaining fields. `is_active = false` is rejected: deactivation only
    /// happens by activating a different profile or deleting the active
    /// one.
    pub fn update_profile(
        &mut self,
        profile_id: &ProfileId,
        update: ProfileUpdate,
    ) -> Result<(), DomainError> {
        match update.is_active {
            Some(false) => {
                return Err(DomainError::new(
                    ErrorCode::ExplicitDeactivation,
                    "Profiles cannot be deactivated directly; activate another profile or delete this one",
                ));
            }
            Some(true) => self.activate_profile(profile_id)?,
            None => {
                if self.profile(profile_id).is_none() {
                    return Err(DomainError::profile_not_found(profile_id));
                }
            }
        }

        let profile = self
            .profiles
            .iter_mut()
            .find(|p| p.id() == profile_id)
            .ok_or_else(|| DomainError::profile_not_found(profile_id))?;
        profile.apply(update)?;
        self.recompute_metadata();
        Ok(())
    }

    /// Removes a profile. Deleting the active profile clears the schedule
    /// pointer; no other profile is auto-activated.
    pub fn delete_profile(&mut self, profile_id: &ProfileId) -> Result<(), DomainError> {
        let index = self
            .profiles
            .iter()
            .position(|p| p.id() == profile_id)
            .ok_or_else(|| DomainError::profile_not_found(profile_id))?;
        self.profiles.remove(index);

        if self.is_profile_active(profile_id) {
            self.schedule.active_profile_id = None;
            self.schedule.updated_at = Timestamp::now();
        }
        self.recompute_metadata();
        Ok(())
    }

    // ───────────────────────────────────────────────────────────────
    // Schedule operations
    // ───────────────────────────────────────────────────────────────

    /// Applies a partial schedule update and refreshes the fire-time
    /// projections.
    pub fn update_schedule(&mut self, update: ScheduleUpdate) -> Result<(), DomainError> {
        if let Some(tz) = &update.timezone {
            // Validate before touching any state.
            crate::domain::foundation::timezone::parse_timezone(tz)?;
        }

        if let Some(morning) = update.morning_time {
            self.schedule.morning_time = morning;
        }
        if let Some(evening) = update.evening_time {
            self.schedule.evening_time = evening;
        }
        if let Some(tz) = update.timezone {
            self.schedule.timezone = tz;
        }
        if let Some(enabled) = update.enabled {
            self.schedule.enabled = enabled;
        }
        let now = Timestamp::now();
        self.schedule.updated_at = now;
        self.schedule.recompute_next_fires(now);
        self.recompute_metadata();
        Ok(())
    }

    /// Records a successful dispatch for a slot (called by the transport
    /// owner after the send went out).
    pub fn mark_slot_sent(&mut self, slot: Slot, at: Timestamp) {
        self.schedule.mark_sent(slot, at);
        self.recompute_metadata();
    }

    // ───────────────────────────────────────────────────────────────
    // Log operations
    // ───────────────────────────────────────────────────────────────

    /// Appends a notification log entry, evicting the oldest beyond the
    /// 100-entry bound.
    pub fn append_notification_log(&mut self, log: NotificationLog) {
        self.notification_logs.push(log);
        rotate(&mut self.notification_logs, NOTIFICATION_LOG_CAP, |l| {
            l.created_at
        });
        self.recompute_metadata();
    }

    /// Transitions an existing notification log entry to `status`.
    pub fn update_notification_log_status(
        &mut self,
        notification_id: &NotificationId,
        status: NotificationStatus,
        at: Timestamp,
    ) -> Result<(), DomainError> {
        let log = self
            .notification_logs
            .iter_mut()
            .find(|l| &l.id == notification_id)
            .ok_or_else(|| {
                DomainError::new(
                    ErrorCode::NotificationLogNotFound,
                    format!("Notification log not found: {}", notification_id),
                )
            })?;
        log.transition(status, at);
        self.recompute_metadata();
        Ok(())
    }

    /// Appends a sync-health report, evicting beyond the 50-entry bound,
    /// and mirrors the computed score onto the active profile's
    /// sync-tracking block.
    pub fn append_sync_health_log(&mut self, log: SyncHealthLog) {
        let score = log.health_score;
        let reported_at = log.reported_at;
        let device_id = log.device_id.clone();

        self.sync_health_logs.push(log);
        rotate(&mut self.sync_health_logs, SYNC_HEALTH_LOG_CAP, |l| {
            l.reported_at
        });

        if self.schedule.active_profile_id.is_some() {
            let status = if score >= health::SYNC_OK_THRESHOLD {
                SyncStatus::Success
            } else {
                SyncStatus::Failed
            };
            let next_check_hours = match status {
                SyncStatus::Success => NEXT_CHECK_OK_HOURS,
                SyncStatus::Failed => NEXT_CHECK_DEGRADED_HOURS,
            };
            self.mirror_report_to_active_profile(
                score,
                status,
                device_id,
                reported_at,
                reported_at.add_hours(next_check_hours),
            );
        }
        self.recompute_metadata();
    }

    fn mirror_report_to_active_profile(
        &mut self,
        score: u8,
        status: SyncStatus,
        device_id: DeviceId,
        reported_at: Timestamp,
        next_check_at: Timestamp,
    ) {
        let active_id = match &self.schedule.active_profile_id {
            Some(id) => id.clone(),
            None => return,
        };
        if let Some(profile) = self.profiles.iter_mut().find(|p| p.id() == &active_id) {
            profile.record_sync_report(
                score,
                status,
                "health_report",
                reported_at,
                Some(next_check_at),
            );
            profile.record_device_sync(device_id, status, reported_at);
        }
    }

    // ───────────────────────────────────────────────────────────────
    // Metadata projection
    // ───────────────────────────────────────────────────────────────

    fn recompute_metadata(&mut self) {
        self.metadata = AggregateMetadata {
            profile_count: self.profiles.len() as u32,
            has_active_profile: self
                .schedule
                .active_profile_id
                .as_ref()
                .map(|id| self.profiles.iter().any(|p| p.id() == id))
                .unwrap_or(false),
            notification_log_count: self.notification_logs.len() as u32,
            sync_health_log_count: self.sync_health_logs.len() as u32,
            last_notification_at: self
                .notification_logs
                .iter()
                .map(|l| l.created_at)
                .max(),
            last_sync_report_at: self.sync_health_logs.iter().map(|l| l.reported_at).max(),
            updated_at: Timestamp::now(),
        };
    }
}
