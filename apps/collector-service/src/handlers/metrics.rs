//! 采集指标快照。
//!
//! - GET /api/collection/metrics

use crate::utils::response::ok;
use axum::response::Response;
use iot_telemetry::{MetricsSnapshot, metrics};
use serde::Serialize;

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MetricsSnapshotDto {
    pub runs_started: u64,
    pub runs_completed: u64,
    pub runs_failed: u64,
    pub runs_skipped: u64,
    pub records_inserted: u64,
    pub records_skipped: u64,
    pub fetch_failures: u64,
    pub fetch_timeouts: u64,
    pub run_duration_ms_total: u64,
    pub run_duration_ms_count: u64,
}

impl From<MetricsSnapshot> for MetricsSnapshotDto {
    fn from(snapshot: MetricsSnapshot) -> Self {
        Self {
            runs_started: snapshot.runs_started,
            runs_completed: snapshot.runs_completed,
            runs_failed: snapshot.runs_failed,
            runs_skipped: snapshot.runs_skipped,
            records_inserted: snapshot.records_inserted,
            records_skipped: snapshot.records_skipped,
            fetch_failures: snapshot.fetch_failures,
            fetch_timeouts: snapshot.fetch_timeouts,
            run_duration_ms_total: snapshot.run_duration_ms_total,
            run_duration_ms_count: snapshot.run_duration_ms_count,
        }
    }
}

pub async fn get_metrics() -> Response {
    ok(MetricsSnapshotDto::from(metrics().snapshot()))
}
