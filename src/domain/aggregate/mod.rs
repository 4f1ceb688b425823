//! Per-user aggregate root and its derived metadata.

mod user_aggregate;

pub use user_aggregate::{AggregateMetadata, UserAggregate};
