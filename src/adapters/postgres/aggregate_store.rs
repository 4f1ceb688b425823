//! PostgreSQL implementation of AggregateStore.
//!
//! One aggregate spans four tables: `user_aggregates` (schedule, metadata
//! projection, version) plus the `alarm_profiles`, `notification_logs` and
//! `sync_health_logs` child tables. Writes replace the child rows inside
//! one transaction guarded by a version compare-and-swap on the root row,
//! so two concurrent writers to the same user can never interleave: the
//! loser's CAS matches zero rows and surfaces as `ConcurrencyConflict`.

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use sqlx::postgres::PgRow;
use sqlx::{PgPool, Row};
use uuid::Uuid;

use crate::domain::aggregate::UserAggregate;
use crate::domain::alarm::{AlarmProfile, DeviceSyncStatus, SyncStatus, SyncTracking};
use crate::domain::foundation::{
    DeviceId, DomainError, ErrorCode, NotificationId, ProfileId, TimeOfDay, Timestamp, UserId,
};
use crate::domain::logs::{
    NetworkState, NotificationLog, NotificationStatus, PushReceiptStatus, SchedulerStatus,
    SyncHealthLog,
};
use crate::domain::schedule::FcmSchedule;
use crate::ports::AggregateStore;

/// PostgreSQL implementation of AggregateStore.
#[derive(Clone)]
pub struct PostgresAggregateStore {
    pool: PgPool,
}

impl PostgresAggregateStore {
    /// Creates a new PostgresAggregateStore.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    async fn load(&self, user_id: &UserId) -> Result<Option<UserAggregate>, DomainError> {
        let root = sqlx::query(
            r#"
            SELECT user_id, version, active_profile_id, morning_time, evening_time,
                   timezone, schedule_enabled, last_sent_at, last_morning_sent_at,
                   last_evening_sent_at, next_morning_fire_at, next_evening_fire_at,
                   retry_count, failure_reason, schedule_updated_at, created_at
            FROM user_aggregates
            WHERE user_id = $1
            "#,
        )
        .bind(user_id.as_str())
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| db_error(format!("Failed to fetch aggregate: {}", e)))?;

        let root = match root {
            Some(row) => row,
            None => return Ok(None),
        };

        let profile_rows = sqlx::query(
            r#"
            SELECT id, content_url, alarms_per_day, weekdays, window_start, window_end,
                   fixed_time, dates, last_synced_at, last_sync_source, last_sync_status,
                   health_score, next_check_at, device_statuses, created_at, updated_at
            FROM alarm_profiles
            WHERE user_id = $1
            ORDER BY position ASC
            "#,
        )
        .bind(user_id.as_str())
        .fetch_all(&self.pool)
        .await
        .map_err(|e| db_error(format!("Failed to fetch alarm profiles: {}", e)))?;

        let notification_rows = sqlx::query(
            r#"
            SELECT id, kind, status, scheduled_at, sent_at, delivered_at, opened_at,
                   failed_at, retry_count, title, body, device_token, created_at
            FROM notification_logs
            WHERE user_id = $1
            ORDER BY created_at ASC
            "#,
        )
        .bind(user_id.as_str())
        .fetch_all(&self.pool)
        .await
        .map_err(|e| db_error(format!("Failed to fetch notification logs: {}", e)))?;

        let health_rows = sqlx::query(
            r#"
            SELECT device_id, reported_at, scheduler_status, push_status,
                   missed_alarm_count, missed_alarm_reason, doze_mode, battery_level,
                   network, health_score, app_version, os_version, note
            FROM sync_health_logs
            WHERE user_id = $1
            ORDER BY reported_at ASC
            "#,
        )
        .bind(user_id.as_str())
        .fetch_all(&self.pool)
        .await
        .map_err(|e| db_error(format!("Failed to fetch sync health logs: {}", e)))?;

        let profiles: Result<Vec<AlarmProfile>, DomainError> =
            profile_rows.into_iter().map(row_to_profile).collect();
        let notification_logs: Result<Vec<NotificationLog>, DomainError> = notification_rows
            .into_iter()
            .map(row_to_notification_log)
            .collect();
        let sync_health_logs: Result<Vec<SyncHealthLog>, DomainError> =
            health_rows.into_iter().map(row_to_health_log).collect();

        let version: i64 = get(&root, "version")?;
        let created_at: DateTime<Utc> = get(&root, "created_at")?;
        let schedule = row_to_schedule(&root)?;

        Ok(Some(UserAggregate::reconstitute(
            user_id.clone(),
            version,
            profiles?,
            schedule,
            notification_logs?,
            sync_health_logs?,
            Timestamp::from_datetime(created_at),
        )))
    }
}

#[async_trait]
impl AggregateStore for PostgresAggregateStore {
    async fn create(&self, user_id: &UserId) -> Result<UserAggregate, DomainError> {
        let fresh = UserAggregate::new(user_id.clone());
        let schedule = fresh.schedule();

        let inserted = sqlx::query(
            r#"
            INSERT INTO user_aggregates (
                user_id, version, active_profile_id, morning_time, evening_time,
                timezone, schedule_enabled, retry_count, schedule_updated_at, created_at
            ) VALUES ($1, $2, NULL, $3, $4, $5, $6, 0, $7, $8)
            ON CONFLICT (user_id) DO NOTHING
            "#,
        )
        .bind(user_id.as_str())
        .bind(fresh.version())
        .bind(schedule.morning_time.to_string())
        .bind(schedule.evening_time.to_string())
        .bind(&schedule.timezone)
        .bind(schedule.enabled)
        .bind(schedule.updated_at.as_datetime())
        .bind(fresh.created_at().as_datetime())
        .execute(&self.pool)
        .await
        .map_err(|e| db_error(format!("Failed to insert aggregate: {}", e)))?;

        if inserted.rows_affected() == 1 {
            return Ok(fresh);
        }

        // Lost the insert race or the aggregate already existed; both mean
        // the stored copy wins.
        self.load(user_id).await?.ok_or_else(|| {
            db_error(format!(
                "Aggregate for user {} vanished after idempotent create",
                user_id
            ))
        })
    }

    async fn find(&self, user_id: &UserId) -> Result<Option<UserAggregate>, DomainError> {
        self.load(user_id).await
    }

    async fn save(&self, aggregate: &mut UserAggregate) -> Result<(), DomainError> {
        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| db_error(format!("Failed to begin transaction: {}", e)))?;

        let user_id = aggregate.user_id().clone();
        let expected_version = aggregate.version();
        let schedule = aggregate.schedule().clone();

        let result = sqlx::query(
            r#"
            UPDATE user_aggregates SET
                version = $3,
                active_profile_id = $4,
                morning_time = $5,
                evening_time = $6,
                timezone = $7,
                schedule_enabled = $8,
                last_sent_at = $9,
                last_morning_sent_at = $10,
                last_evening_sent_at = $11,
                next_morning_fire_at = $12,
                next_evening_fire_at = $13,
                retry_count = $14,
                failure_reason = $15,
                schedule_updated_at = $16
            WHERE user_id = $1 AND version = $2
            "#,
        )
        .bind(user_id.as_str())
        .bind(expected_version)
        .bind(expected_version + 1)
        .bind(schedule.active_profile_id.as_ref().map(|id| id.as_str()))
        .bind(schedule.morning_time.to_string())
        .bind(schedule.evening_time.to_string())
        .bind(&schedule.timezone)
        .bind(schedule.enabled)
        .bind(schedule.last_sent_at.map(|t| *t.as_datetime()))
        .bind(schedule.last_morning_sent_at.map(|t| *t.as_datetime()))
        .bind(schedule.last_evening_sent_at.map(|t| *t.as_datetime()))
        .bind(schedule.next_morning_fire_at.map(|t| *t.as_datetime()))
        .bind(schedule.next_evening_fire_at.map(|t| *t.as_datetime()))
        .bind(schedule.retry_count as i32)
        .bind(schedule.failure_reason.as_deref())
        .bind(schedule.updated_at.as_datetime())
        .execute(&mut *tx)
        .await
        .map_err(|e| db_error(format!("Failed to update aggregate: {}", e)))?;

        if result.rows_affected() == 0 {
            // Distinguish a missing aggregate from a lost race.
            let exists: Option<(i64,)> =
                sqlx::query_as("SELECT version FROM user_aggregates WHERE user_id = $1")
                    .bind(user_id.as_str())
                    .fetch_optional(&mut *tx)
                    .await
                    .map_err(|e| db_error(format!("Failed to check aggregate version: {}", e)))?;
            return match exists {
                Some(_) => Err(DomainError::concurrency_conflict(&user_id)),
                None => Err(DomainError::user_not_found(&user_id)),
            };
        }

        sqlx::query("DELETE FROM alarm_profiles WHERE user_id = $1")
            .bind(user_id.as_str())
            .execute(&mut *tx)
            .await
            .map_err(|e| db_error(format!("Failed to clear alarm profiles: {}", e)))?;

        for (position, profile) in aggregate.profiles().iter().enumerate() {
            let device_statuses = serde_json::to_string(&profile.sync().devices)
                .map_err(|e| db_error(format!("Failed to encode device statuses: {}", e)))?;
            sqlx::query(
                r#"
                INSERT INTO alarm_profiles (
                    user_id, id, position, content_url, alarms_per_day, weekdays,
                    window_start, window_end, fixed_time, dates,
                    last_synced_at, last_sync_source, last_sync_status,
                    health_score, next_check_at, device_statuses,
                    created_at, updated_at
                ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10,
                          $11, $12, $13, $14, $15, $16, $17, $18)
                "#,
            )
            .bind(user_id.as_str())
            .bind(profile.id().as_str())
            .bind(position as i32)
            .bind(profile.content_url())
            .bind(profile.alarms_per_day() as i16)
            .bind(
                profile
                    .weekdays()
                    .iter()
                    .map(|&d| d as i16)
                    .collect::<Vec<i16>>(),
            )
            .bind(profile.window_start().to_string())
            .bind(profile.window_end().to_string())
            .bind(profile.fixed_time().map(|t| t.to_string()))
            .bind(profile.dates().to_vec())
            .bind(profile.sync().last_synced_at.map(|t| *t.as_datetime()))
            .bind(profile.sync().last_sync_source.as_deref())
            .bind(profile.sync().last_sync_status.map(|s| s.as_str()))
            .bind(profile.sync().health_score.map(|s| s as i16))
            .bind(profile.sync().next_check_at.map(|t| *t.as_datetime()))
            .bind(device_statuses)
            .bind(profile.created_at().as_datetime())
            .bind(profile.updated_at().as_datetime())
            .execute(&mut *tx)
            .await
            .map_err(|e| db_error(format!("Failed to insert alarm profile: {}", e)))?;
        }

        sqlx::query("DELETE FROM notification_logs WHERE user_id = $1")
            .bind(user_id.as_str())
            .execute(&mut *tx)
            .await
            .map_err(|e| db_error(format!("Failed to clear notification logs: {}", e)))?;

        for log in aggregate.notification_logs() {
            sqlx::query(
                r#"
                INSERT INTO notification_logs (
                    user_id, id, kind, status, scheduled_at, sent_at, delivered_at,
                    opened_at, failed_at, retry_count, title, body, device_token, created_at
                ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14)
                "#,
            )
            .bind(user_id.as_str())
            .bind(log.id.as_uuid())
            .bind(&log.kind)
            .bind(log.status.as_str())
            .bind(log.scheduled_at.map(|t| *t.as_datetime()))
            .bind(log.sent_at.map(|t| *t.as_datetime()))
            .bind(log.delivered_at.map(|t| *t.as_datetime()))
            .bind(log.opened_at.map(|t| *t.as_datetime()))
            .bind(log.failed_at.map(|t| *t.as_datetime()))
            .bind(log.retry_count as i32)
            .bind(log.title.as_deref())
            .bind(log.body.as_deref())
            .bind(log.device_token.as_deref())
            .bind(log.created_at.as_datetime())
            .execute(&mut *tx)
            .await
            .map_err(|e| db_error(format!("Failed to insert notification log: {}", e)))?;
        }

        sqlx::query("DELETE FROM sync_health_logs WHERE user_id = $1")
            .bind(user_id.as_str())
            .execute(&mut *tx)
            .await
            .map_err(|e| db_error(format!("Failed to clear sync health logs: {}", e)))?;

        for log in aggregate.sync_health_logs() {
            sqlx::query(
                r#"
                INSERT INTO sync_health_logs (
                    id, user_id, device_id, reported_at, scheduler_status, push_status,
                    missed_alarm_count, missed_alarm_reason, doze_mode, battery_level,
                    network, health_score, app_version, os_version, note
                ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15)
                "#,
            )
            .bind(Uuid::new_v4())
            .bind(user_id.as_str())
            .bind(log.device_id.as_str())
            .bind(log.reported_at.as_datetime())
            .bind(log.scheduler_status.as_str())
            .bind(log.push_status.as_str())
            .bind(log.missed_alarm_count as i32)
            .bind(log.missed_alarm_reason.as_deref())
            .bind(log.doze_mode)
            .bind(log.battery_level.map(|b| b as i16))
            .bind(log.network.as_str())
            .bind(log.health_score as i16)
            .bind(log.app_version.as_deref())
            .bind(log.os_version.as_deref())
            .bind(log.note.as_deref())
            .execute(&mut *tx)
            .await
            .map_err(|e| db_error(format!("Failed to insert sync health log: {}", e)))?;
        }

        tx.commit()
            .await
            .map_err(|e| db_error(format!("Failed to commit transaction: {}", e)))?;

        aggregate.bump_version();
        Ok(())
    }

    async fn list_enabled_schedules(&self) -> Result<Vec<UserAggregate>, DomainError> {
        let rows = sqlx::query(
            r#"
            SELECT user_id FROM user_aggregates
            WHERE schedule_enabled = TRUE AND active_profile_id IS NOT NULL
            ORDER BY user_id
            "#,
        )
        .fetch_all(&self.pool)
        .await
        .map_err(|e| db_error(format!("Failed to list enabled schedules: {}", e)))?;

        let mut aggregates = Vec::with_capacity(rows.len());
        for row in rows {
            let raw: String = get(&row, "user_id")?;
            let user_id = UserId::new(raw)
                .map_err(|e| db_error(format!("Corrupt user_id column: {}", e)))?;
            if let Some(aggregate) = self.load(&user_id).await? {
                aggregates.push(aggregate);
            }
        }
        Ok(aggregates)
    }
}

// ════════════════════════════════════════════════════════════════════════════
// Helper functions
// ════════════════════════════════════════════════════════════════════════════

fn db_error(message: String) -> DomainError {
    DomainError::new(ErrorCode::DatabaseError, message)
}

fn get<'r, T>(row: &'r PgRow, column: &str) -> Result<T, DomainError>
where
    T: sqlx::Decode<'r, sqlx::Postgres> + sqlx::Type<sqlx::Postgres>,
{
    row.try_get(column)
        .map_err(|e| db_error(format!("Failed to get {}: {}", column, e)))
}

fn parse_time(column: &str, raw: &str) -> Result<TimeOfDay, DomainError> {
    TimeOfDay::parse(raw).map_err(|e| db_error(format!("Corrupt {} column: {}", column, e)))
}

fn opt_ts(value: Option<DateTime<Utc>>) -> Option<Timestamp> {
    value.map(Timestamp::from_datetime)
}

fn row_to_schedule(row: &PgRow) -> Result<FcmSchedule, DomainError> {
    let active_profile_id: Option<String> = get(row, "active_profile_id")?;
    let active_profile_id = match active_profile_id {
        Some(raw) => Some(
            ProfileId::new(raw)
                .map_err(|e| db_error(format!("Corrupt active_profile_id column: {}", e)))?,
        ),
        None => None,
    };

    let morning_raw: String = get(row, "morning_time")?;
    let evening_raw: String = get(row, "evening_time")?;
    let retry_count: i32 = get(row, "retry_count")?;
    let schedule_updated_at: DateTime<Utc> = get(row, "schedule_updated_at")?;

    Ok(FcmSchedule {
        active_profile_id,
        morning_time: parse_time("morning_time", &morning_raw)?,
        evening_time: parse_time("evening_time", &evening_raw)?,
        timezone: get(row, "timezone")?,
        enabled: get(row, "schedule_enabled")?,
        last_sent_at: opt_ts(get(row, "last_sent_at")?),
        last_morning_sent_at: opt_ts(get(row, "last_morning_sent_at")?),
        last_evening_sent_at: opt_ts(get(row, "last_evening_sent_at")?),
        next_morning_fire_at: opt_ts(get(row, "next_morning_fire_at")?),
        next_evening_fire_at: opt_ts(get(row, "next_evening_fire_at")?),
        retry_count: retry_count.max(0) as u32,
        failure_reason: get(row, "failure_reason")?,
        updated_at: Timestamp::from_datetime(schedule_updated_at),
    })
}

fn row_to_profile(row: PgRow) -> Result<AlarmProfile, DomainError> {
    let id_raw: String = get(&row, "id")?;
    let id = ProfileId::new(id_raw).map_err(|e| db_error(format!("Corrupt id column: {}", e)))?;

    let alarms_per_day: i16 = get(&row, "alarms_per_day")?;
    let weekdays: Vec<i16> = get(&row, "weekdays")?;
    let window_start_raw: String = get(&row, "window_start")?;
    let window_end_raw: String = get(&row, "window_end")?;
    let fixed_time_raw: Option<String> = get(&row, "fixed_time")?;
    let fixed_time = match fixed_time_raw {
        Some(raw) => Some(parse_time("fixed_time", &raw)?),
        None => None,
    };
    let dates: Vec<NaiveDate> = get(&row, "dates")?;

    let last_sync_status_raw: Option<String> = get(&row, "last_sync_status")?;
    let last_sync_status = match last_sync_status_raw {
        Some(raw) => Some(SyncStatus::parse(&raw).ok_or_else(|| {
            db_error(format!("Invalid last_sync_status: {}", raw))
        })?),
        None => None,
    };

    let health_score: Option<i16> = get(&row, "health_score")?;
    let device_statuses_raw: String = get(&row, "device_statuses")?;
    let devices: Vec<DeviceSyncStatus> = serde_json::from_str(&device_statuses_raw)
        .map_err(|e| db_error(format!("Corrupt device_statuses column: {}", e)))?;

    let sync = SyncTracking {
        last_synced_at: opt_ts(get(&row, "last_synced_at")?),
        last_sync_source: get(&row, "last_sync_source")?,
        last_sync_status,
        health_score: health_score.map(|s| s.clamp(0, 100) as u8),
        next_check_at: opt_ts(get(&row, "next_check_at")?),
        devices,
    };

    let created_at: DateTime<Utc> = get(&row, "created_at")?;
    let updated_at: DateTime<Utc> = get(&row, "updated_at")?;

    Ok(AlarmProfile::reconstitute(
        id,
        get(&row, "content_url")?,
        alarms_per_day.clamp(1, 24) as u8,
        weekdays.into_iter().map(|d| d as u8).collect(),
        parse_time("window_start", &window_start_raw)?,
        parse_time("window_end", &window_end_raw)?,
        fixed_time,
        dates,
        sync,
        Timestamp::from_datetime(created_at),
        Timestamp::from_datetime(updated_at),
    ))
}

fn row_to_notification_log(row: PgRow) -> Result<NotificationLog, DomainError> {
    let id: Uuid = get(&row, "id")?;
    let status_raw: String = get(&row, "status")?;
    let status = NotificationStatus::parse(&status_raw)
        .ok_or_else(|| db_error(format!("Invalid notification status: {}", status_raw)))?;
    let retry_count: i32 = get(&row, "retry_count")?;
    let created_at: DateTime<Utc> = get(&row, "created_at")?;

    Ok(NotificationLog {
        id: NotificationId::from_uuid(id),
        kind: get(&row, "kind")?,
        status,
        scheduled_at: opt_ts(get(&row, "scheduled_at")?),
        sent_at: opt_ts(get(&row, "sent_at")?),
        delivered_at: opt_ts(get(&row, "delivered_at")?),
        opened_at: opt_ts(get(&row, "opened_at")?),
        failed_at: opt_ts(get(&row, "failed_at")?),
        retry_count: retry_count.max(0) as u32,
        title: get(&row, "title")?,
        body: get(&row, "body")?,
        device_token: get(&row, "device_token")?,
        created_at: Timestamp::from_datetime(created_at),
    })
}

fn row_to_health_log(row: PgRow) -> Result<SyncHealthLog, DomainError> {
    let device_raw: String = get(&row, "device_id")?;
    let device_id = DeviceId::new(device_raw)
        .map_err(|e| db_error(format!("Corrupt device_id column: {}", e)))?;

    let scheduler_raw: String = get(&row, "scheduler_status")?;
    let push_raw: String = get(&row, "push_status")?;
    let network_raw: String = get(&row, "network")?;
    let missed: i32 = get(&row, "missed_alarm_count")?;
    let battery: Option<i16> = get(&row, "battery_level")?;
    let score: i16 = get(&row, "health_score")?;
    let reported_at: DateTime<Utc> = get(&row, "reported_at")?;

    Ok(SyncHealthLog {
        device_id,
        reported_at: Timestamp::from_datetime(reported_at),
        scheduler_status: SchedulerStatus::parse(&scheduler_raw),
        push_status: PushReceiptStatus::parse(&push_raw),
        missed_alarm_count: missed.max(0) as u32,
        missed_alarm_reason: get(&row, "missed_alarm_reason")?,
        doze_mode: get(&row, "doze_mode")?,
        battery_level: battery.map(|b| b.clamp(0, 100) as u8),
        network: NetworkState::parse(&network_raw),
        health_score: score.clamp(0, 100) as u8,
        app_version: get(&row, "app_version")?,
        os_version: get(&row, "os_version")?,
        note: get(&row, "note")?,
    })
}
