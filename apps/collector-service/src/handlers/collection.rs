//! 采集运行接口
//!
//! - GET /api/collection/last-run：最近一次运行报告（尚未运行时 data 为 null）
//! - POST /api/collection/trigger：手动触发一次采集，已有运行进行中时返回 409

use crate::AppState;
use crate::utils::response::{conflict_error, internal_error, ok, unavailable_error};
use axum::{extract::State, response::Response};
use iot_collector::{CollectError, TriggerOutcome};

pub async fn get_last_run(State(state): State<AppState>) -> Response {
    ok(state.scheduler.latest())
}

pub async fn trigger_collection(State(state): State<AppState>) -> Response {
    tracing::info!(target: "iot.service", "manual_trigger_requested");
    match state.scheduler.trigger().await {
        Ok(TriggerOutcome::Completed(report)) => ok(report),
        Ok(TriggerOutcome::Skipped) => conflict_error("a collection run is already in progress"),
        Err(CollectError::Cancelled) => unavailable_error("collector is shutting down"),
        Err(err) => internal_error(err.to_string()),
    }
}
