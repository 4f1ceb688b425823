//! Wakewell - Per-user alarm and notification aggregate service
//!
//! This crate implements the consolidated per-user state record behind an
//! alarm/content app: configurable alarm profiles, a push-notification
//! delivery schedule, rolling delivery and sync-health logs, and the
//! background matcher that decides which users are due a notification.

pub mod adapters;
pub mod application;
pub mod config;
pub mod domain;
pub mod ports;
