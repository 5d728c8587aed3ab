//! 监控接口处理器

pub mod collection;
pub mod metrics;

pub use collection::*;
pub use metrics::*;

use axum::{Json, response::IntoResponse};

pub async fn health() -> impl IntoResponse {
    Json(serde_json::json!({ "ok": true }))
}
