//! Pure health-scoring of device/sync metrics.

mod scoring;

pub use scoring::{
    overall_bucket, recommendations, score, status_label, HealthMetrics, HealthStatus,
    SYNC_OK_THRESHOLD,
};
