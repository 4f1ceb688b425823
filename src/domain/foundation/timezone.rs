//! Timezone conversion helpers built on the IANA database (`chrono-tz`).
//!
//! All schedule times are stored as wall-clock `HH:MM` plus an IANA zone
//! name; these helpers are the only place the domain crosses between local
//! wall-clock time and UTC instants.

use chrono::{DateTime, Datelike, LocalResult, TimeZone, Utc};
use chrono_tz::Tz;

use super::{DomainError, ErrorCode, TimeOfDay, Timestamp};

/// Resolves an IANA timezone name (e.g. `America/New_York`).
pub fn parse_timezone(name: &str) -> Result<Tz, DomainError> {
    name.parse::<Tz>().map_err(|_| {
        DomainError::new(
            ErrorCode::InvalidTimezone,
            format!("Unknown IANA timezone: {}", name),
        )
    })
}

/// Converts a wall-clock time in `tz` to the UTC instant it denotes on the
/// calendar day that `reference` falls on in `tz`.
///
/// Returns `None` for times that do not exist on that day (DST
/// spring-forward gap); ambiguous times (fall-back) resolve to the earlier
/// instant.
pub fn local_time_to_utc(time: TimeOfDay, tz: Tz, reference: Timestamp) -> Option<DateTime<Utc>> {
    let local_date = reference.as_datetime().with_timezone(&tz).date_naive();
    let local = tz.with_ymd_and_hms(
        local_date.year(),
        local_date.month(),
        local_date.day(),
        time.hour() as u32,
        time.minute() as u32,
        0,
    );
    match local {
        LocalResult::Single(dt) => Some(dt.with_timezone(&Utc)),
        LocalResult::Ambiguous(earlier, _) => Some(earlier.with_timezone(&Utc)),
        LocalResult::None => None,
    }
}

/// True when both instants fall on the same calendar day as observed in
/// `tz`; pass `None` to compare in UTC.
pub fn is_same_local_day(a: Timestamp, b: Timestamp, tz: Option<Tz>) -> bool {
    match tz {
        Some(tz) => {
            a.as_datetime().with_timezone(&tz).date_naive()
                == b.as_datetime().with_timezone(&tz).date_naive()
        }
        None => a.as_datetime().date_naive() == b.as_datetime().date_naive(),
    }
}

/// Next UTC instant strictly after `after` at which the wall clock in `tz`
/// reads `time`. Skips over a DST gap day rather than erroring.
pub fn next_occurrence(time: TimeOfDay, tz: Tz, after: Timestamp) -> Option<Timestamp> {
    // Two iterations suffice: today (local) or the next day, plus one spare
    // for a gap landing exactly on the requested time.
    for day_offset in 0..3 {
        let reference = after.add_days(day_offset);
        if let Some(candidate) = local_time_to_utc(time, tz, reference) {
            if candidate > *after.as_datetime() {
                return Some(Timestamp::from_datetime(candidate));
            }
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    fn utc(s: &str) -> Timestamp {
        Timestamp::from_datetime(s.parse::<DateTime<Utc>>().unwrap())
    }

    #[test]
    fn rejects_unknown_zone_names() {
        let err = parse_timezone("Mars/Olympus_Mons").unwrap_err();
        assert_eq!(err.code, ErrorCode::InvalidTimezone);
        assert!(parse_timezone("America/New_York").is_ok());
    }

    #[test]
    fn new_york_morning_maps_to_utc_offset() {
        // January: EST, UTC-5. 08:00 local == 13:00 UTC.
        let tz = parse_timezone("America/New_York").unwrap();
        let eight = TimeOfDay::parse("08:00").unwrap();
        let reference = utc("2024-01-15T13:00:00Z");
        let converted = local_time_to_utc(eight, tz, reference).unwrap();
        assert_eq!(converted, *utc("2024-01-15T13:00:00Z").as_datetime());

        // July: EDT, UTC-4. 08:00 local == 12:00 UTC.
        let reference = utc("2024-07-15T12:00:00Z");
        let converted = local_time_to_utc(eight, tz, reference).unwrap();
        assert_eq!(converted, *utc("2024-07-15T12:00:00Z").as_datetime());
    }

    #[test]
    fn reference_date_is_taken_in_the_local_zone() {
        // 01:00 UTC on the 16th is still the evening of the 15th in New York,
        // so the conversion must use the 15th as the local calendar day.
        let tz = parse_timezone("America/New_York").unwrap();
        let nine_pm = TimeOfDay::parse("21:00").unwrap();
        let reference = utc("2024-01-16T01:00:00Z");
        let converted = local_time_to_utc(nine_pm, tz, reference).unwrap();
        assert_eq!(converted, *utc("2024-01-16T02:00:00Z").as_datetime());
    }

    #[test]
    fn spring_forward_gap_yields_none() {
        // 2024-03-10 02:30 does not exist in New York.
        let tz = parse_timezone("America/New_York").unwrap();
        let gap = TimeOfDay::parse("02:30").unwrap();
        let reference = utc("2024-03-10T12:00:00Z");
        assert!(local_time_to_utc(gap, tz, reference).is_none());
    }

    #[test]
    fn same_local_day_depends_on_the_zone() {
        let a = utc("2024-01-16T01:00:00Z");
        let b = utc("2024-01-16T23:00:00Z");
        // Same UTC day...
        assert!(is_same_local_day(a, b, None));
        // ...but different days on the US east coast (Jan 15 vs Jan 16 local).
        let tz = parse_timezone("America/New_York").unwrap();
        assert!(!is_same_local_day(a, b, Some(tz)));
    }

    #[test]
    fn next_occurrence_rolls_to_the_following_day() {
        let tz = parse_timezone("America/New_York").unwrap();
        let eight = TimeOfDay::parse("08:00").unwrap();
        // One minute past today's 08:00 local -> tomorrow 08:00 local.
        let after = utc("2024-01-15T13:01:00Z");
        let next = next_occurrence(eight, tz, after).unwrap();
        assert_eq!(*next.as_datetime(), *utc("2024-01-16T13:00:00Z").as_datetime());
    }
}
