//! AppendSyncHealthLogHandler - device health report recording.
//!
//! Scores the raw metrics with the health engine, appends the report to
//! the bounded log, and (inside the same write) mirrors the outcome onto
//! the active profile's sync-tracking block.

use std::sync::Arc;

use crate::domain::aggregate::UserAggregate;
use crate::domain::foundation::{DeviceId, DomainError, Timestamp, UserId};
use crate::domain::health::{self, HealthMetrics, HealthStatus};
use crate::domain::logs::{NetworkState, PushReceiptStatus, SchedulerStatus, SyncHealthLog};
use crate::ports::AggregateStore;

/// Command carrying one device health report.
#[derive(Debug, Clone)]
pub struct AppendSyncHealthLogCommand {
    pub user_id: UserId,
    pub device_id: DeviceId,
    /// Report instant; defaults to now when absent.
    pub reported_at: Option<Timestamp>,
    pub scheduler_status: SchedulerStatus,
    pub push_status: PushReceiptStatus,
    pub missed_alarm_count: u32,
    pub missed_alarm_reason: Option<String>,
    pub doze_mode: bool,
    pub battery_level: Option<u8>,
    pub network: NetworkState,
    pub app_version: Option<String>,
    pub os_version: Option<String>,
    pub note: Option<String>,
}

/// Result of recording a health report.
#[derive(Debug, Clone)]
pub struct AppendSyncHealthLogResult {
    pub score: u8,
    pub status: HealthStatus,
    pub recommendations: Vec<String>,
    pub aggregate: UserAggregate,
}

/// Handler for sync-health report appends.
pub struct AppendSyncHealthLogHandler {
    store: Arc<dyn AggregateStore>,
}

impl AppendSyncHealthLogHandler {
    pub fn new(store: Arc<dyn AggregateStore>) -> Self {
        Self { store }
    }

    pub async fn handle(
        &self,
        cmd: AppendSyncHealthLogCommand,
    ) -> Result<AppendSyncHealthLogResult, DomainError> {
        let mut aggregate = self
            .store
            .find(&cmd.user_id)
            .await?
            .ok_or_else(|| DomainError::user_not_found(&cmd.user_id))?;

        let metrics = HealthMetrics {
            scheduler_status: cmd.scheduler_status,
            push_status: cmd.push_status,
            missed_alarm_count: cmd.missed_alarm_count,
            doze_mode: cmd.doze_mode,
            network: cmd.network,
        };
        let score = health::score(&metrics);
        let status = health::status_label(score);
        let recommendations = health::recommendations(&metrics);
        let reported_at = cmd.reported_at.unwrap_or_else(Timestamp::now);

        if score < health::SYNC_OK_THRESHOLD {
            tracing::warn!(
                user_id = %cmd.user_id,
                device_id = %cmd.device_id,
                score,
                status = %status,
                "Degraded sync health reported"
            );
        }

        aggregate.append_sync_health_log(SyncHealthLog {
            device_id: cmd.device_id,
            reported_at,
            scheduler_status: cmd.scheduler_status,
            push_status: cmd.push_status,
            missed_alarm_count: cmd.missed_alarm_count,
            missed_alarm_reason: cmd.missed_alarm_reason,
            doze_mode: cmd.doze_mode,
            battery_level: cmd.battery_level,
            network: cmd.network,
            health_score: score,
            app_version: cmd.app_version,
            os_version: cmd.os_version,
            note: cmd.note,
        });
        self.store.save(&mut aggregate).await?;

        Ok(AppendSyncHealthLogResult {
            score,
            status,
            recommendations,
            aggregate,
        })
    }
}
