//! Delivery schedule handlers.

mod update_schedule;

pub use update_schedule::{
    MarkSlotSentCommand, MarkSlotSentHandler, UpdateScheduleCommand, UpdateScheduleHandler,
};
