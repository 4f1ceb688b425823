//! Delivery schedule record and slot vocabulary.

mod fcm_schedule;

pub use fcm_schedule::{FcmSchedule, ScheduleUpdate, Slot};
