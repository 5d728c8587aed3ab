//! 路由定义
//!
//! - 健康检查：/health
//! - 采集监控：/api/collection/last-run, /api/collection/metrics
//! - 手动触发：/api/collection/trigger

use crate::AppState;
use crate::handlers::*;
use axum::{
    Router, middleware,
    routing::{get, post},
};
use tower_http::trace::TraceLayer;

/// 采集接口路由
pub fn create_api_router() -> Router<AppState> {
    Router::new()
        .route("/collection/last-run", get(get_last_run))
        .route("/collection/metrics", get(get_metrics))
        .route("/collection/trigger", post(trigger_collection))
}

/// 完整应用：路由 + 请求追踪中间件
pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health))
        .nest("/api", create_api_router())
        .with_state(state)
        .layer(TraceLayer::new_for_http())
        // 注入 request_id/trace_id
        .layer(middleware::from_fn(crate::request_context))
}

#[cfg(test)]
mod tests {
    use super::create_router;
    use crate::AppState;
    use axum::{
        Router,
        body::Body,
        http::{Method, Request, StatusCode},
    };
    use domain::{DataType, TenantContext};
    use http_body_util::BodyExt;
    use iot_collector::{
        CollectionScheduler, Collector, CollectorOptions, CollectorRepositories, NoopFetcher,
    };
    use iot_storage::{
        DataPointRecord, DataRecord, DeviceRecord, GatewayRecord, InMemoryRepository, Repository,
    };
    use std::sync::Arc;
    use tokio_util::sync::CancellationToken;
    use tower::ServiceExt;

    async fn app(cancel: CancellationToken) -> Router {
        let ctx = TenantContext::system("tenant-1");
        let gateways = Arc::new(InMemoryRepository::<GatewayRecord>::new());
        gateways
            .insert(&ctx, GatewayRecord::new("tenant-1", "gw-1", "gw-1"))
            .await
            .expect("gateway");
        let devices = Arc::new(InMemoryRepository::<DeviceRecord>::new());
        devices
            .insert(&ctx, DeviceRecord::new("tenant-1", "gw-1", "dev-1"))
            .await
            .expect("device");
        let data_points = Arc::new(InMemoryRepository::<DataPointRecord>::new());
        data_points
            .insert(
                &ctx,
                DataPointRecord::new("tenant-1", "dev-1", "temp", DataType::Numeric),
            )
            .await
            .expect("data point");
        let repos = CollectorRepositories {
            gateways,
            devices,
            data_points,
            records: Arc::new(InMemoryRepository::<DataRecord>::new()),
        };
        let collector = Collector::new(repos, Arc::new(NoopFetcher), CollectorOptions::default());
        let scheduler = Arc::new(CollectionScheduler::new(collector, cancel));
        create_router(AppState { scheduler })
    }

    async fn call(app: &Router, method: Method, uri: &str) -> (StatusCode, serde_json::Value) {
        let request = Request::builder()
            .method(method)
            .uri(uri)
            .body(Body::empty())
            .expect("request");
        let response = app.clone().oneshot(request).await.expect("response");
        let status = response.status();
        assert!(response.headers().contains_key("x-request-id"));
        assert!(response.headers().contains_key("x-trace-id"));
        let bytes = response
            .into_body()
            .collect()
            .await
            .expect("body")
            .to_bytes();
        let json = serde_json::from_slice(&bytes).expect("json");
        (status, json)
    }

    #[tokio::test]
    async fn health_reports_ok() {
        let app = app(CancellationToken::new()).await;
        let (status, body) = call(&app, Method::GET, "/health").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["ok"], true);
    }

    #[tokio::test]
    async fn trigger_publishes_last_run() {
        let app = app(CancellationToken::new()).await;

        let (status, body) = call(&app, Method::GET, "/api/collection/last-run").await;
        assert_eq!(status, StatusCode::OK);
        assert!(body["data"].is_null());

        let (status, body) = call(&app, Method::POST, "/api/collection/trigger").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["success"], true);
        assert_eq!(body["data"]["status"], "completed");
        assert_eq!(body["data"]["result"]["devicesProcessed"], 1);
        assert_eq!(body["data"]["result"]["dataPointsProcessed"], 1);
        assert_eq!(body["data"]["result"]["recordsInserted"], 0);
        let run_id = body["data"]["runId"].clone();

        let (status, body) = call(&app, Method::GET, "/api/collection/last-run").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["data"]["runId"], run_id);
    }

    #[tokio::test]
    async fn trigger_after_shutdown_is_unavailable() {
        let cancel = CancellationToken::new();
        let app = app(cancel.clone()).await;
        cancel.cancel();

        let (status, body) = call(&app, Method::POST, "/api/collection/trigger").await;
        assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
        assert_eq!(body["success"], false);
        assert_eq!(body["error"]["code"], "SERVICE.STOPPING");
    }

    #[tokio::test]
    async fn metrics_expose_run_counters() {
        let app = app(CancellationToken::new()).await;
        call(&app, Method::POST, "/api/collection/trigger").await;

        let (status, body) = call(&app, Method::GET, "/api/collection/metrics").await;
        assert_eq!(status, StatusCode::OK);
        assert!(body["data"]["runsStarted"].as_u64().is_some_and(|runs| runs >= 1));
        assert!(body["data"]["runDurationMsCount"].is_u64());
    }
}
