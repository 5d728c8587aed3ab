//! IoT 采集服务：定时采集与监控接口。
//!
//! - 启动时加载配置、建立 Postgres 连接池并装配各实体仓储
//! - 后台按固定间隔触发采集（单飞）
//! - HTTP 暴露健康检查、最近一次运行、指标与手动触发
//! - Ctrl-C 时取消进行中的采集并优雅退出

mod handlers;
mod routes;
mod utils;

use axum::{
    body::Body,
    http::{HeaderValue, Request},
    middleware::Next,
    response::Response,
};
use iot_collector::{
    CollectionScheduler, Collector, CollectorOptions, CollectorRepositories, NoopFetcher,
};
use iot_config::AppConfig;
use iot_storage::{
    DataPointRecord, DataRecord, DeviceRecord, GatewayRecord, PgRepository, connect_pool,
};
use iot_telemetry::{init_tracing, new_request_ids};
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::Instrument;

#[derive(Clone)]
pub struct AppState {
    pub scheduler: Arc<CollectionScheduler>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // 加载本地 .env（如存在），便于直接 cargo run 启动
    dotenvy::dotenv().ok();
    // 从环境变量加载运行配置
    let config = AppConfig::from_env()?;
    // 初始化结构化日志
    init_tracing();

    // Postgres 仓储（需先执行 migrations）
    let pool = connect_pool(&config.database_url, config.database_max_connections).await?;
    let repos = CollectorRepositories {
        gateways: Arc::new(PgRepository::<GatewayRecord>::new(pool.clone())),
        devices: Arc::new(PgRepository::<DeviceRecord>::new(pool.clone())),
        data_points: Arc::new(PgRepository::<DataPointRecord>::new(pool.clone())),
        records: Arc::new(PgRepository::<DataRecord>::new(pool)),
    };
    // 具体传输协议尚未接入，取数端口使用空实现
    let collector = Collector::new(repos, Arc::new(NoopFetcher), collector_options(&config));

    let shutdown = CancellationToken::new();
    let scheduler = Arc::new(CollectionScheduler::new(collector, shutdown.clone()));
    let periodic = {
        let scheduler = scheduler.clone();
        let period = Duration::from_secs(config.collection_interval_seconds);
        tokio::spawn(async move { scheduler.run_periodic(period).await })
    };

    let app = routes::create_router(AppState { scheduler });
    let listener = tokio::net::TcpListener::bind(&config.http_addr).await?;
    tracing::info!(
        target: "iot.service",
        addr = %config.http_addr,
        "http_listening"
    );
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal(shutdown.clone()))
        .await?;

    shutdown.cancel();
    if let Err(err) = periodic.await {
        tracing::error!(target: "iot.service", error = %err, "scheduler_join_failed");
    }
    tracing::info!(target: "iot.service", "service_stopped");
    Ok(())
}

fn collector_options(config: &AppConfig) -> CollectorOptions {
    CollectorOptions {
        enabled: config.collection_enabled,
        page_size: config.collection_page_size,
        max_parallelism: config.collection_max_parallelism,
        timeout: Duration::from_secs(config.collection_timeout_seconds),
        tenant_id: config.collection_tenant_id.clone(),
    }
}

/// 等待 Ctrl-C 或外部取消；收到信号后取消全部采集任务。
async fn shutdown_signal(shutdown: CancellationToken) {
    tokio::select! {
        result = tokio::signal::ctrl_c() => {
            if let Err(err) = result {
                tracing::error!(target: "iot.service", error = %err, "signal_listen_failed");
            }
        }
        _ = shutdown.cancelled() => {}
    }
    tracing::info!(target: "iot.service", "shutdown_requested");
    shutdown.cancel();
}

pub(crate) async fn request_context(mut req: Request<Body>, next: Next) -> Response {
    // 生成 request_id 与 trace_id，并注入请求扩展与日志
    let ids = new_request_ids();
    let method = req.method().clone();
    let path = req.uri().path().to_string();
    req.extensions_mut().insert(ids.clone());

    let span = tracing::info_span!(
        "request",
        request_id = %ids.request_id,
        trace_id = %ids.trace_id,
        method = %method,
        path = %path
    );

    let mut response = next.run(req).instrument(span).await;
    response.headers_mut().insert(
        "x-request-id",
        HeaderValue::from_str(&ids.request_id).unwrap_or_else(|_| HeaderValue::from_static("")),
    );
    response.headers_mut().insert(
        "x-trace-id",
        HeaderValue::from_str(&ids.trace_id).unwrap_or_else(|_| HeaderValue::from_static("")),
    );
    response
}
