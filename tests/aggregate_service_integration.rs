//! Integration tests for the per-user aggregate service.
//!
//! Exercises the full handler stack against the in-memory store:
//! 1. Profile activation keeps the single-active invariant under
//!    sequential and concurrent writes
//! 2. Log appends rotate without losing the newest entries
//! 3. The schedule matcher converts wall-clock slot times per user
//!    timezone and deduplicates per local day
//!
//! Uses the in-memory store to test the behavior without external
//! dependencies; the PostgreSQL adapter implements the same port contract.

use std::sync::Arc;

use chrono::{DateTime, Utc};

use wakewell::adapters::InMemoryAggregateStore;
use wakewell::application::handlers::{
    ActivateProfileCommand, ActivateProfileHandler, AddProfileCommand, AddProfileHandler,
    AppendNotificationLogCommand, AppendNotificationLogHandler, AppendSyncHealthLogCommand,
    AppendSyncHealthLogHandler, CreateAggregateCommand, CreateAggregateHandler,
    DeleteProfileCommand, DeleteProfileHandler, MarkSlotSentCommand, MarkSlotSentHandler,
    UpdateScheduleCommand, UpdateScheduleHandler,
};
use wakewell::application::ScheduleMatcher;
use wakewell::domain::alarm::ProfileDraft;
use wakewell::domain::foundation::{
    ErrorCode, ProfileId, TimeOfDay, Timestamp, UserId,
};
use wakewell::domain::logs::{NetworkState, PushReceiptStatus, SchedulerStatus};
use wakewell::domain::schedule::{ScheduleUpdate, Slot};
use wakewell::ports::AggregateStore;

// =============================================================================
// Test Infrastructure
// =============================================================================

const MAX_PROFILES: usize = 10;

/// Honors `RUST_LOG` when debugging a failing test.
fn init_tracing() {
    use std::sync::Once;
    static INIT: Once = Once::new();
    INIT.call_once(|| {
        let _ = tracing_subscriber::fmt()
            .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
            .with_test_writer()
            .try_init();
    });
}

fn utc(s: &str) -> Timestamp {
    Timestamp::from_datetime(s.parse::<DateTime<Utc>>().unwrap())
}

fn user(id: &str) -> UserId {
    UserId::new(id).unwrap()
}

fn pid(id: &str) -> ProfileId {
    ProfileId::new(id).unwrap()
}

fn draft() -> ProfileDraft {
    ProfileDraft {
        content_url: "https://cdn.example.com/tracks/sunrise.mp3".into(),
        alarms_per_day: 2,
        weekdays: vec![1, 2, 3, 4, 5, 6, 7],
        window_start: TimeOfDay::parse("06:00").unwrap(),
        window_end: TimeOfDay::parse("10:00").unwrap(),
        fixed_time: None,
        dates: Vec::new(),
    }
}

struct Service {
    store: Arc<InMemoryAggregateStore>,
    create: CreateAggregateHandler,
    add_profile: AddProfileHandler,
    activate: ActivateProfileHandler,
    delete_profile: DeleteProfileHandler,
    update_schedule: UpdateScheduleHandler,
    mark_sent: MarkSlotSentHandler,
    append_notification: AppendNotificationLogHandler,
    append_health: AppendSyncHealthLogHandler,
    matcher: ScheduleMatcher,
}

impl Service {
    fn new() -> Self {
        init_tracing();
        let store = Arc::new(InMemoryAggregateStore::new());
        Self {
            create: CreateAggregateHandler::new(store.clone()),
            add_profile: AddProfileHandler::new(store.clone(), MAX_PROFILES),
            activate: ActivateProfileHandler::new(store.clone()),
            delete_profile: DeleteProfileHandler::new(store.clone()),
            update_schedule: UpdateScheduleHandler::new(store.clone()),
            mark_sent: MarkSlotSentHandler::new(store.clone()),
            append_notification: AppendNotificationLogHandler::new(store.clone()),
            append_health: AppendSyncHealthLogHandler::new(store.clone()),
            matcher: ScheduleMatcher::new(store.clone()),
            store,
        }
    }

    async fn seed_user(&self, name: &str, profiles: &[&str]) -> UserId {
        let user_id = user(name);
        self.create
            .handle(CreateAggregateCommand {
                user_id: user_id.clone(),
            })
            .await
            .unwrap();
        for profile in profiles {
            self.add_profile
                .handle(AddProfileCommand {
                    user_id: user_id.clone(),
                    profile_id: pid(profile),
                    draft: draft(),
                    activate: false,
                })
                .await
                .unwrap();
        }
        user_id
    }

    /// Asserts the single-active invariant on the stored aggregate and
    /// returns the active profile id, if any.
    async fn assert_invariant(&self, user_id: &UserId) -> Option<ProfileId> {
        let aggregate = self.store.find(user_id).await.unwrap().unwrap();
        let active: Vec<ProfileId> = aggregate
            .profiles()
            .iter()
            .filter(|p| aggregate.is_profile_active(p.id()))
            .map(|p| p.id().clone())
            .collect();
        assert!(active.len() <= 1, "more than one active profile");
        match aggregate.schedule().active_profile_id.clone() {
            Some(pointer) => {
                assert_eq!(active.as_slice(), std::slice::from_ref(&pointer));
                Some(pointer)
            }
            None => {
                assert!(active.is_empty(), "active profile without schedule pointer");
                None
            }
        }
    }
}

// =============================================================================
// Activation invariant
// =============================================================================

#[tokio::test]
async fn invariant_holds_across_add_activate_delete_sequences() {
    let service = Service::new();
    let user_id = service.seed_user("u1", &["a", "b", "c"]).await;
    service.assert_invariant(&user_id).await;

    for target in ["a", "b", "b", "c", "a"] {
        service
            .activate
            .handle(ActivateProfileCommand {
                user_id: user_id.clone(),
                profile_id: pid(target),
            })
            .await
            .unwrap();
        let active = service.assert_invariant(&user_id).await;
        assert_eq!(active, Some(pid(target)));
    }

    // Deleting a non-active profile leaves the pointer alone.
    service
        .delete_profile
        .handle(DeleteProfileCommand {
            user_id: user_id.clone(),
            profile_id: pid("b"),
        })
        .await
        .unwrap();
    assert_eq!(service.assert_invariant(&user_id).await, Some(pid("a")));

    // Deleting the active profile clears it without promoting another.
    service
        .delete_profile
        .handle(DeleteProfileCommand {
            user_id: user_id.clone(),
            profile_id: pid("a"),
        })
        .await
        .unwrap();
    assert_eq!(service.assert_invariant(&user_id).await, None);
}

#[tokio::test]
async fn concurrent_activations_converge_to_one_winner() {
    let service = Service::new();
    let user_id = service.seed_user("u1", &["a", "b"]).await;
    let store = service.store.clone();

    // Fire both activations concurrently, retrying only on the retryable
    // concurrency code the way an upstream caller would.
    let mut tasks = Vec::new();
    for target in ["a", "b"] {
        let store = store.clone();
        let user_id = user_id.clone();
        tasks.push(tokio::spawn(async move {
            let handler = ActivateProfileHandler::new(store);
            for _ in 0..5 {
                match handler
                    .handle(ActivateProfileCommand {
                        user_id: user_id.clone(),
                        profile_id: pid(target),
                    })
                    .await
                {
                    Ok(_) => return Ok(()),
                    Err(e) if e.code == ErrorCode::ConcurrencyConflict => continue,
                    Err(e) => return Err(e),
                }
            }
            Err(wakewell::domain::foundation::DomainError::concurrency_conflict(&user_id))
        }));
    }
    for task in tasks {
        task.await.unwrap().unwrap();
    }

    // Both eventually succeeded; the final state is exactly one of them.
    let active = service.assert_invariant(&user_id).await.expect("one active");
    assert!(active == pid("a") || active == pid("b"));
}

// =============================================================================
// Log rotation
// =============================================================================

#[tokio::test]
async fn notification_log_retains_hundred_most_recent() {
    let service = Service::new();
    let user_id = service.seed_user("u1", &[]).await;

    let mut ids = Vec::new();
    for i in 0..101 {
        let result = service
            .append_notification
            .handle(AppendNotificationLogCommand {
                user_id: user_id.clone(),
                notification_id: None,
                kind: "morning_alarm".into(),
                scheduled_at: Some(utc("2024-01-01T08:00:00Z").add_minutes(i)),
                title: None,
                body: None,
                device_token: None,
            })
            .await
            .unwrap();
        ids.push(result.notification_id);
    }

    let aggregate = service.store.find(&user_id).await.unwrap().unwrap();
    assert_eq!(aggregate.notification_logs().len(), 100);
    // Entries carry creation timestamps in append order, so the evicted
    // entry is the very first one appended.
    let surviving: Vec<_> = aggregate.notification_logs().iter().map(|l| l.id).collect();
    assert!(!surviving.contains(&ids[0]));
    assert!(surviving.contains(ids.last().unwrap()));
    assert_eq!(aggregate.metadata().notification_log_count, 100);
}

#[tokio::test]
async fn sync_health_log_retains_fifty_most_recent() {
    let service = Service::new();
    let user_id = service.seed_user("u1", &["main"]).await;
    service
        .activate
        .handle(ActivateProfileCommand {
            user_id: user_id.clone(),
            profile_id: pid("main"),
        })
        .await
        .unwrap();

    for i in 0..51 {
        service
            .append_health
            .handle(AppendSyncHealthLogCommand {
                user_id: user_id.clone(),
                device_id: wakewell::domain::foundation::DeviceId::new("pixel-8").unwrap(),
                reported_at: Some(utc("2024-01-01T00:00:00Z").add_minutes(i)),
                scheduler_status: SchedulerStatus::Healthy,
                push_status: PushReceiptStatus::Received,
                missed_alarm_count: 0,
                missed_alarm_reason: None,
                doze_mode: false,
                battery_level: Some(60),
                network: NetworkState::Wifi,
                app_version: None,
                os_version: None,
                note: None,
            })
            .await
            .unwrap();
    }

    let aggregate = service.store.find(&user_id).await.unwrap().unwrap();
    assert_eq!(aggregate.sync_health_logs().len(), 50);
    assert_eq!(
        aggregate.sync_health_logs().iter().map(|l| l.reported_at).min(),
        Some(utc("2024-01-01T00:01:00Z"))
    );
    // The active profile mirrors the most recent report.
    let sync = aggregate.profile(&pid("main")).unwrap().sync();
    assert_eq!(sync.health_score, Some(100));
}

// =============================================================================
// Schedule matching
// =============================================================================

/// The America/New_York scenario: morning 08:00 local, never sent before.
/// The user matches exactly at the UTC instant of 08:00 New York time and
/// at no adjacent minute.
#[tokio::test]
async fn new_york_morning_slot_matches_only_at_the_exact_minute() {
    let service = Service::new();
    let user_id = service.seed_user("ny-user", &["main"]).await;
    service
        .activate
        .handle(ActivateProfileCommand {
            user_id: user_id.clone(),
            profile_id: pid("main"),
        })
        .await
        .unwrap();
    service
        .update_schedule
        .handle(UpdateScheduleCommand {
            user_id: user_id.clone(),
            update: ScheduleUpdate {
                morning_time: Some(TimeOfDay::parse("08:00").unwrap()),
                timezone: Some("America/New_York".into()),
                ..Default::default()
            },
        })
        .await
        .unwrap();

    // 2024-01-15 is EST: 08:00 local == 13:00 UTC.
    let matches = service
        .matcher
        .users_due_for_notification(Slot::Morning, utc("2024-01-15T13:00:00Z"))
        .await
        .unwrap();
    assert_eq!(matches.len(), 1);
    assert_eq!(matches[0].user_id, user_id);
    assert_eq!(matches[0].profile_id, pid("main"));

    for miss in ["2024-01-15T12:59:59Z", "2024-01-15T13:01:00Z"] {
        let matches = service
            .matcher
            .users_due_for_notification(Slot::Morning, utc(miss))
            .await
            .unwrap();
        assert!(matches.is_empty(), "unexpected match at {}", miss);
    }
}

#[tokio::test]
async fn dedup_suppresses_same_local_day_and_releases_next_day() {
    let service = Service::new();
    let user_id = service.seed_user("ny-user", &["main"]).await;
    service
        .activate
        .handle(ActivateProfileCommand {
            user_id: user_id.clone(),
            profile_id: pid("main"),
        })
        .await
        .unwrap();
    service
        .update_schedule
        .handle(UpdateScheduleCommand {
            user_id: user_id.clone(),
            update: ScheduleUpdate {
                timezone: Some("America/New_York".into()),
                ..Default::default()
            },
        })
        .await
        .unwrap();

    let slot_instant = utc("2024-01-15T13:00:00Z");
    let matches = service
        .matcher
        .users_due_for_notification(Slot::Morning, slot_instant)
        .await
        .unwrap();
    assert_eq!(matches.len(), 1);

    // Transport dispatches and marks the slot sent.
    service
        .mark_sent
        .handle(MarkSlotSentCommand {
            user_id: user_id.clone(),
            slot: Slot::Morning,
            sent_at: slot_instant,
        })
        .await
        .unwrap();

    // Re-running the scan at the same instant no longer matches.
    let matches = service
        .matcher
        .users_due_for_notification(Slot::Morning, slot_instant)
        .await
        .unwrap();
    assert!(matches.is_empty());

    // The evening slot has no per-slot marker yet, so dedup falls back to
    // the combined marker: still the same local day (20:00 EST == 01:00
    // UTC next day), so the evening is suppressed too.
    let matches = service
        .matcher
        .users_due_for_notification(Slot::Evening, utc("2024-01-16T01:00:00Z"))
        .await
        .unwrap();
    assert!(matches.is_empty());

    // Next local day at the same wall-clock minute matches again.
    let matches = service
        .matcher
        .users_due_for_notification(Slot::Morning, utc("2024-01-16T13:00:00Z"))
        .await
        .unwrap();
    assert_eq!(matches.len(), 1);

    // And once the evening marker exists, it governs the evening slot on
    // its own: the next evening still fires.
    service
        .mark_sent
        .handle(MarkSlotSentCommand {
            user_id: user_id.clone(),
            slot: Slot::Evening,
            sent_at: utc("2024-01-17T01:00:00Z"),
        })
        .await
        .unwrap();
    let matches = service
        .matcher
        .users_due_for_notification(Slot::Evening, utc("2024-01-18T01:00:00Z"))
        .await
        .unwrap();
    assert_eq!(matches.len(), 1);
}

#[tokio::test]
async fn matcher_spans_users_across_timezones() {
    let service = Service::new();
    for (name, tz) in [
        ("ny", "America/New_York"),
        ("berlin", "Europe/Berlin"),
        ("tokyo", "Asia/Tokyo"),
    ] {
        let user_id = service.seed_user(name, &["main"]).await;
        service
            .activate
            .handle(ActivateProfileCommand {
                user_id: user_id.clone(),
                profile_id: pid("main"),
            })
            .await
            .unwrap();
        service
            .update_schedule
            .handle(UpdateScheduleCommand {
                user_id,
                update: ScheduleUpdate {
                    timezone: Some(tz.into()),
                    ..Default::default()
                },
            })
            .await
            .unwrap();
    }

    // 13:00 UTC on a January day: 08:00 in New York, 14:00 in Berlin,
    // 22:00 in Tokyo. Only the New York user is due the morning slot.
    let matches = service
        .matcher
        .users_due_for_notification(Slot::Morning, utc("2024-01-15T13:00:00Z"))
        .await
        .unwrap();
    assert_eq!(matches.len(), 1);
    assert_eq!(matches[0].user_id.as_str(), "ny");

    // 07:00 UTC: 08:00 in Berlin.
    let matches = service
        .matcher
        .users_due_for_notification(Slot::Morning, utc("2024-01-15T07:00:00Z"))
        .await
        .unwrap();
    assert_eq!(matches.len(), 1);
    assert_eq!(matches[0].user_id.as_str(), "berlin");
}
