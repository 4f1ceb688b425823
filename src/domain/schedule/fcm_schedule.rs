//! Push-notification delivery schedule for one user.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::domain::foundation::timezone;
use crate::domain::foundation::{ProfileId, TimeOfDay, Timestamp};

/// Named notification timing within the day.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Slot {
    Morning,
    Evening,
}

impl Slot {
    /// Parses the persisted string form.
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "morning" => Some(Slot::Morning),
            "evening" => Some(Slot::Evening),
            _ => None,
        }
    }

    /// Returns the persisted string form.
    pub fn as_str(&self) -> &'static str {
        match self {
            Slot::Morning => "morning",
            Slot::Evening => "evening",
        }
    }
}

impl fmt::Display for Slot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// The single delivery schedule record of a user aggregate.
///
/// `active_profile_id` is the source of truth for which alarm profile is
/// active; the aggregate keeps it pointing at an existing profile (or
/// `None`) across every mutation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FcmSchedule {
    pub active_profile_id: Option<ProfileId>,
    pub morning_time: TimeOfDay,
    pub evening_time: TimeOfDay,
    /// IANA timezone name the slot times are interpreted in.
    pub timezone: String,
    pub enabled: bool,
    /// Combined last-dispatch marker, regardless of slot.
    pub last_sent_at: Option<Timestamp>,
    pub last_morning_sent_at: Option<Timestamp>,
    pub last_evening_sent_at: Option<Timestamp>,
    pub next_morning_fire_at: Option<Timestamp>,
    pub next_evening_fire_at: Option<Timestamp>,
    pub retry_count: u32,
    pub failure_reason: Option<String>,
    pub updated_at: Timestamp,
}

impl FcmSchedule {
    /// Schedule created alongside a fresh aggregate: disabled, UTC,
    /// 08:00 / 20:00 slots, no active profile.
    pub fn new_default() -> Self {
        Self {
            active_profile_id: None,
            morning_time: TimeOfDay::new(8, 0).expect("08:00 is a valid time"),
            evening_time: TimeOfDay::new(20, 0).expect("20:00 is a valid time"),
            timezone: "UTC".to_string(),
            enabled: false,
            last_sent_at: None,
            last_morning_sent_at: None,
            last_evening_sent_at: None,
            next_morning_fire_at: None,
            next_evening_fire_at: None,
            retry_count: 0,
            failure_reason: None,
            updated_at: Timestamp::now(),
        }
    }

    /// Configured wall-clock time for a slot.
    pub fn time_for(&self, slot: Slot) -> TimeOfDay {
        match slot {
            Slot::Morning => self.morning_time,
            Slot::Evening => self.evening_time,
        }
    }

    /// Slot-specific last-sent marker, falling back to the combined one
    /// when per-slot tracking has never been written.
    pub fn last_sent_for(&self, slot: Slot) -> Option<Timestamp> {
        let per_slot = match slot {
            Slot::Morning => self.last_morning_sent_at,
            Slot::Evening => self.last_evening_sent_at,
        };
        per_slot.or(self.last_sent_at)
    }

    /// Records a successful dispatch for a slot.
    pub fn mark_sent(&mut self, slot: Slot, at: Timestamp) {
        match slot {
            Slot::Morning => self.last_morning_sent_at = Some(at),
            Slot::Evening => self.last_evening_sent_at = Some(at),
        }
        self.last_sent_at = Some(at);
        self.retry_count = 0;
        self.failure_reason = None;
        self.updated_at = Timestamp::now();
    }

    /// Recomputes the next UTC fire instants for both slots.
    ///
    /// An unparseable stored timezone clears the projections rather than
    /// failing the surrounding write; the matcher re-reports it per tick.
    pub fn recompute_next_fires(&mut self, now: Timestamp) {
        match timezone::parse_timezone(&self.timezone) {
            Ok(tz) => {
                self.next_morning_fire_at = timezone::next_occurrence(self.morning_time, tz, now);
                self.next_evening_fire_at = timezone::next_occurrence(self.evening_time, tz, now);
            }
            Err(_) => {
                self.next_morning_fire_at = None;
                self.next_evening_fire_at = None;
            }
        }
    }
}

/// Partial update to the schedule. `None` leaves a field unchanged.
#[derive(Debug, Clone, Default)]
pub struct ScheduleUpdate {
    pub morning_time: Option<TimeOfDay>,
    pub evening_time: Option<TimeOfDay>,
    pub timezone: Option<String>,
    pub enabled: Option<bool>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{DateTime, Utc};

    fn utc(s: &str) -> Timestamp {
        Timestamp::from_datetime(s.parse::<DateTime<Utc>>().unwrap())
    }

    #[test]
    fn default_schedule_is_disabled_with_no_active_profile() {
        let s = FcmSchedule::new_default();
        assert!(!s.enabled);
        assert!(s.active_profile_id.is_none());
        assert_eq!(s.morning_time.to_string(), "08:00");
        assert_eq!(s.evening_time.to_string(), "20:00");
        assert_eq!(s.timezone, "UTC");
    }

    #[test]
    fn last_sent_falls_back_to_combined_marker() {
        let mut s = FcmSchedule::new_default();
        assert_eq!(s.last_sent_for(Slot::Morning), None);

        s.last_sent_at = Some(utc("2024-01-15T08:00:00Z"));
        assert_eq!(s.last_sent_for(Slot::Morning), s.last_sent_at);

        s.last_morning_sent_at = Some(utc("2024-01-16T08:00:00Z"));
        assert_eq!(s.last_sent_for(Slot::Morning), s.last_morning_sent_at);
        // Evening still falls back to the combined marker.
        assert_eq!(s.last_sent_for(Slot::Evening), s.last_sent_at);
    }

    #[test]
    fn mark_sent_updates_slot_and_combined_markers() {
        let mut s = FcmSchedule::new_default();
        s.retry_count = 3;
        s.failure_reason = Some("token expired".into());
        let at = utc("2024-01-15T08:00:00Z");
        s.mark_sent(Slot::Morning, at);
        assert_eq!(s.last_morning_sent_at, Some(at));
        assert_eq!(s.last_sent_at, Some(at));
        assert_eq!(s.retry_count, 0);
        assert!(s.failure_reason.is_none());
    }

    #[test]
    fn next_fires_follow_the_configured_zone() {
        let mut s = FcmSchedule::new_default();
        s.timezone = "America/New_York".into();
        let now = utc("2024-01-15T00:00:00Z");
        s.recompute_next_fires(now);
        // 08:00 EST == 13:00 UTC on the same day.
        assert_eq!(s.next_morning_fire_at, Some(utc("2024-01-15T13:00:00Z")));
        assert_eq!(s.next_evening_fire_at, Some(utc("2024-01-15T01:00:00Z")));
    }

    #[test]
    fn bad_zone_clears_projections_instead_of_failing() {
        let mut s = FcmSchedule::new_default();
        s.next_morning_fire_at = Some(utc("2024-01-15T08:00:00Z"));
        s.timezone = "Not/AZone".into();
        s.recompute_next_fires(utc("2024-01-15T00:00:00Z"));
        assert!(s.next_morning_fire_at.is_none());
        assert!(s.next_evening_fire_at.is_none());
    }
}
