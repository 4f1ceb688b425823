//! ActivateProfileHandler - the profile activation coordinator.
//!
//! Activation is the one operation with a post-commit verification step:
//! after the compare-and-swap write lands, the aggregate is re-read and the
//! invariant (target active, schedule pointer matching) checked. A
//! violation after a nominally successful commit is a defect and surfaces
//! as `DatabaseError`; it is never downgraded.

use std::sync::Arc;

use crate::domain::aggregate::UserAggregate;
use crate::domain::foundation::{DomainError, ErrorCode, ProfileId, UserId};
use crate::ports::AggregateStore;

/// Command to make one profile the active profile of a user.
#[derive(Debug, Clone)]
pub struct ActivateProfileCommand {
    pub user_id: UserId,
    pub profile_id: ProfileId,
}

/// Handler enforcing the single-active-profile invariant.
pub struct ActivateProfileHandler {
    store: Arc<dyn AggregateStore>,
}

impl ActivateProfileHandler {
    pub fn new(store: Arc<dyn AggregateStore>) -> Self {
        Self { store }
    }

    pub async fn handle(&self, cmd: ActivateProfileCommand) -> Result<UserAggregate, DomainError> {
        // 1. Load; not-found short-circuits before any write.
        let mut aggregate = self
            .store
            .find(&cmd.user_id)
            .await?
            .ok_or_else(|| DomainError::user_not_found(&cmd.user_id))?;

        // 2. Domain mutation: point the schedule at the target. Fails with
        //    ProfileNotFound before anything is persisted.
        aggregate.activate_profile(&cmd.profile_id)?;

        // 3. Persist under version CAS. A concurrent writer makes this fail
        //    with ConcurrencyConflict; the caller owns the bounded retry.
        self.store.save(&mut aggregate).await?;

        // 4. Post-commit verification.
        let persisted = self
            .store
            .find(&cmd.user_id)
            .await?
            .ok_or_else(|| activation_defect(&cmd, "aggregate missing after commit"))?;

        if !persisted.is_profile_active(&cmd.profile_id) {
            return Err(activation_defect(
                &cmd,
                "schedule pointer does not reference the activated profile",
            ));
        }
        if persisted.profile(&cmd.profile_id).is_none() {
            return Err(activation_defect(
                &cmd,
                "activated profile absent from persisted aggregate",
            ));
        }

        tracing::info!(
            user_id = %cmd.user_id,
            profile_id = %cmd.profile_id,
            "Alarm profile activated"
        );
        Ok(persisted)
    }
}

fn activation_defect(cmd: &ActivateProfileCommand, reason: &str) -> DomainError {
    tracing::error!(
        user_id = %cmd.user_id,
        profile_id = %cmd.profile_id,
        reason,
        "Activation invariant violated after commit"
    );
    DomainError::new(
        ErrorCode::DatabaseError,
        format!(
            "Activation of profile {} for user {} failed verification: {}",
            cmd.profile_id, cmd.user_id, reason
        ),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::InMemoryAggregateStore;
    use crate::domain::alarm::{AlarmProfile, ProfileDraft};
    use crate::domain::foundation::TimeOfDay;

    fn draft() -> ProfileDraft {
        ProfileDraft {
            content_url: "https://cdn.example.com/tone.mp3".into(),
            alarms_per_day: 2,
            weekdays: vec![6, 7],
            window_start: TimeOfDay::parse("08:00").unwrap(),
            window_end: TimeOfDay::parse("10:00").unwrap(),
            fixed_time: None,
            dates: Vec::new(),
        }
    }

    async fn seeded_store(user: &UserId, profile_ids: &[&str]) -> Arc<InMemoryAggregateStore> {
        let store = Arc::new(InMemoryAggregateStore::new());
        let mut aggregate = store.create(user).await.unwrap();
        for id in profile_ids {
            let profile = AlarmProfile::new(ProfileId::new(*id).unwrap(), draft()).unwrap();
            aggregate.add_profile(profile, 10).unwrap();
        }
        store.save(&mut aggregate).await.unwrap();
        store
    }

    #[tokio::test]
    async fn activation_points_schedule_at_target() {
        let user = UserId::new("u1").unwrap();
        let store = seeded_store(&user, &["a", "b"]).await;
        let handler = ActivateProfileHandler::new(store.clone());

        let result = handler
            .handle(ActivateProfileCommand {
                user_id: user.clone(),
                profile_id: ProfileId::new("b").unwrap(),
            })
            .await
            .unwrap();

        assert!(result.is_profile_active(&ProfileId::new("b").unwrap()));
        assert!(result.schedule().enabled);
    }

    #[tokio::test]
    async fn activation_is_idempotent() {
        let user = UserId::new("u1").unwrap();
        let store = seeded_store(&user, &["a"]).await;
        let handler = ActivateProfileHandler::new(store.clone());
        let cmd = ActivateProfileCommand {
            user_id: user.clone(),
            profile_id: ProfileId::new("a").unwrap(),
        };

        let first = handler.handle(cmd.clone()).await.unwrap();
        let second = handler.handle(cmd).await.unwrap();
        assert_eq!(
            first.schedule().active_profile_id,
            second.schedule().active_profile_id
        );
        assert!(second.is_profile_active(&ProfileId::new("a").unwrap()));
    }

    #[tokio::test]
    async fn unknown_profile_short_circuits() {
        let user = UserId::new("u1").unwrap();
        let store = seeded_store(&user, &["a"]).await;
        let handler = ActivateProfileHandler::new(store.clone());

        let err = handler
            .handle(ActivateProfileCommand {
                user_id: user.clone(),
                profile_id: ProfileId::new("ghost").unwrap(),
            })
            .await
            .unwrap_err();
        assert_eq!(err.code, ErrorCode::ProfileNotFound);

        // Nothing was persisted.
        let stored = store.find(&user).await.unwrap().unwrap();
        assert!(stored.schedule().active_profile_id.is_none());
    }

    #[tokio::test]
    async fn unknown_user_short_circuits() {
        let store = Arc::new(InMemoryAggregateStore::new());
        let handler = ActivateProfileHandler::new(store);
        let err = handler
            .handle(ActivateProfileCommand {
                user_id: UserId::new("ghost").unwrap(),
                profile_id: ProfileId::new("a").unwrap(),
            })
            .await
            .unwrap_err();
        assert_eq!(err.code, ErrorCode::UserNotFound);
    }

    #[tokio::test]
    async fn concurrent_activations_have_exactly_one_winner() {
        let user = UserId::new("u1").unwrap();
        let store = seeded_store(&user, &["a", "b"]).await;

        let handler_a = ActivateProfileHandler::new(store.clone());
        let handler_b = ActivateProfileHandler::new(store.clone());
        let (user_a, user_b) = (user.clone(), user.clone());

        let task_a = tokio::spawn(async move {
            handler_a
                .handle(ActivateProfileCommand {
                    user_id: user_a,
                    profile_id: ProfileId::new("a").unwrap(),
                })
                .await
        });
        let task_b = tokio::spawn(async move {
            handler_b
                .handle(ActivateProfileCommand {
                    user_id: user_b,
                    profile_id: ProfileId::new("b").unwrap(),
                })
                .await
        });

        let result_a = task_a.await.unwrap();
        let result_b = task_b.await.unwrap();

        // Any loser must have lost the version race, nothing else.
        for result in [&result_a, &result_b] {
            if let Err(e) = result {
                assert_eq!(e.code, ErrorCode::ConcurrencyConflict);
            }
        }
        assert!(
            result_a.is_ok() || result_b.is_ok(),
            "at least one activation must commit"
        );

        // Exactly one profile is active afterwards, and the pointer matches.
        let stored = store.find(&user).await.unwrap().unwrap();
        let active = stored.schedule().active_profile_id.clone().expect("one active");
        assert!(stored.is_profile_active(&active));
        let active_count = stored
            .profiles()
            .iter()
            .filter(|p| stored.is_profile_active(p.id()))
            .count();
        assert_eq!(active_count, 1);
    }
}
