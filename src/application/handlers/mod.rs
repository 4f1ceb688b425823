//! Application handlers.
//!
//! Command and query handlers that orchestrate domain operations. Each
//! handler validates before any write, short-circuits missing entities
//! before any write, and maps lost persistence races to the retryable
//! `ConcurrencyConflict` code.

pub mod aggregate;
pub mod logs;
pub mod profile;
pub mod schedule;

pub use aggregate::{
    CreateAggregateCommand, CreateAggregateHandler, GetAggregateHandler, GetAggregateQuery,
};
pub use logs::{
    AppendNotificationLogCommand, AppendNotificationLogHandler, AppendNotificationLogResult,
    AppendSyncHealthLogCommand, AppendSyncHealthLogHandler, AppendSyncHealthLogResult,
    UpdateNotificationLogStatusCommand, UpdateNotificationLogStatusHandler,
};
pub use profile::{
    ActivateProfileCommand, ActivateProfileHandler, AddProfileCommand, AddProfileHandler,
    DeleteProfileCommand, DeleteProfileHandler, UpdateProfileCommand, UpdateProfileHandler,
};
pub use schedule::{
    MarkSlotSentCommand, MarkSlotSentHandler, UpdateScheduleCommand, UpdateScheduleHandler,
};
