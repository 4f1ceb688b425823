//! Application layer - handlers and the notification matcher.

pub mod handlers;
pub mod matcher;

pub use matcher::{MatcherConfig, MatcherRunner, ResyncCandidate, ScheduleMatcher};
