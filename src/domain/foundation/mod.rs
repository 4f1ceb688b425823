//! Foundation module - Shared domain primitives.
//!
//! Contains value objects, identifiers, timezone helpers, and error types
//! that form the vocabulary of the alarm/notification domain.

mod errors;
mod ids;
mod time_of_day;
mod timestamp;
pub mod timezone;

pub use errors::{DomainError, ErrorCode, ValidationError};
pub use ids::{DeviceId, NotificationId, ProfileId, UserId};
pub use time_of_day::TimeOfDay;
pub use timestamp::Timestamp;
