//! Wall-clock time-of-day value object (`HH:MM`).

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use super::ValidationError;

/// Minute-granular wall-clock time, timezone-agnostic.
///
/// Notification slots and alarm windows are configured as `HH:MM` strings;
/// this type owns the parsing and range checks so the rest of the domain
/// never sees a raw string.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct TimeOfDay {
    hour: u8,
    minute: u8,
}

impl TimeOfDay {
    /// Creates a time-of-day from hour and minute components.
    pub fn new(hour: u8, minute: u8) -> Result<Self, ValidationError> {
        if hour > 23 {
            return Err(ValidationError::out_of_range("hour", 0, 23, hour as i32));
        }
        if minute > 59 {
            return Err(ValidationError::out_of_range("minute", 0, 59, minute as i32));
        }
        Ok(Self { hour, minute })
    }

    /// Parses an `HH:MM` string.
    pub fn parse(s: &str) -> Result<Self, ValidationError> {
        let (h, m) = s
            .split_once(':')
            .ok_or_else(|| ValidationError::invalid_format("time", "expected HH:MM"))?;
        if h.len() != 2 || m.len() != 2 {
            return Err(ValidationError::invalid_format("time", "expected HH:MM"));
        }
        let hour: u8 = h
            .parse()
            .map_err(|_| ValidationError::invalid_format("time", "non-numeric hour"))?;
        let minute: u8 = m
            .parse()
            .map_err(|_| ValidationError::invalid_format("time", "non-numeric minute"))?;
        Self::new(hour, minute)
    }

    /// Returns the hour component (0-23).
    pub fn hour(&self) -> u8 {
        self.hour
    }

    /// Returns the minute component (0-59).
    pub fn minute(&self) -> u8 {
        self.minute
    }
}

impl fmt::Display for TimeOfDay {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:02}:{:02}", self.hour, self.minute)
    }
}

impl FromStr for TimeOfDay {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl TryFrom<String> for TimeOfDay {
    type Error = ValidationError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        Self::parse(&s)
    }
}

impl From<TimeOfDay> for String {
    fn from(t: TimeOfDay) -> Self {
        t.to_string()
    }
}
