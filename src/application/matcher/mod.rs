//! Notification schedule matching and its background runner.

mod runner;
mod schedule_matcher;

pub use runner::{MatcherConfig, MatcherRunner};
pub use schedule_matcher::{ResyncCandidate, ScheduleMatcher};
