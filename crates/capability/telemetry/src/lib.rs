//! 追踪、请求/运行 ID 生成与采集指标。

use std::sync::OnceLock;
use std::sync::atomic::{AtomicU64, Ordering};
use tracing_subscriber::{EnvFilter, fmt};

/// 请求级追踪标识。
#[derive(Debug, Clone)]
pub struct RequestIds {
    pub request_id: String,
    pub trace_id: String,
}

/// 采集指标快照。
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MetricsSnapshot {
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

/// 进程级采集指标。
pub struct TelemetryMetrics {
    runs_started: AtomicU64,
    runs_completed: AtomicU64,
    runs_failed: AtomicU64,
    runs_skipped: AtomicU64,
    records_inserted: AtomicU64,
    records_skipped: AtomicU64,
    fetch_failures: AtomicU64,
    fetch_timeouts: AtomicU64,
    run_duration_ms_total: AtomicU64,
    run_duration_ms_count: AtomicU64,
}

impl Default for TelemetryMetrics {
    fn default() -> Self {
        Self::new()
    }
}

impl TelemetryMetrics {
    pub fn new() -> Self {
        Self {
            runs_started: AtomicU64::new(0),
            runs_completed: AtomicU64::new(0),
            runs_failed: AtomicU64::new(0),
            runs_skipped: AtomicU64::new(0),
            records_inserted: AtomicU64::new(0),
            records_skipped: AtomicU64::new(0),
            fetch_failures: AtomicU64::new(0),
            fetch_timeouts: AtomicU64::new(0),
            run_duration_ms_total: AtomicU64::new(0),
            run_duration_ms_count: AtomicU64::new(0),
        }
    }

    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            runs_started: self.runs_started.load(Ordering::Relaxed),
            runs_completed: self.runs_completed.load(Ordering::Relaxed),
            runs_failed: self.runs_failed.load(Ordering::Relaxed),
            runs_skipped: self.runs_skipped.load(Ordering::Relaxed),
            records_inserted: self.records_inserted.load(Ordering::Relaxed),
            records_skipped: self.records_skipped.load(Ordering::Relaxed),
            fetch_failures: self.fetch_failures.load(Ordering::Relaxed),
            fetch_timeouts: self.fetch_timeouts.load(Ordering::Relaxed),
            run_duration_ms_total: self.run_duration_ms_total.load(Ordering::Relaxed),
            run_duration_ms_count: self.run_duration_ms_count.load(Ordering::Relaxed),
        }
    }
}

static METRICS: OnceLock<TelemetryMetrics> = OnceLock::new();

/// 获取全局指标实例。
pub fn metrics() -> &'static TelemetryMetrics {
    METRICS.get_or_init(TelemetryMetrics::new)
}

/// 初始化 tracing（默认 info）。
pub fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let _ = fmt().with_env_filter(filter).try_init();
}

/// 生成新的 request_id 与 trace_id。
pub fn new_request_ids() -> RequestIds {
    RequestIds {
        request_id: uuid::Uuid::new_v4().to_string(),
        trace_id: uuid::Uuid::new_v4().to_string(),
    }
}

/// 生成采集运行 ID。
pub fn new_run_id() -> String {
    uuid::Uuid::new_v4().to_string()
}

/// 记录运行开始次数。
pub fn record_run_started() {
    metrics().runs_started.fetch_add(1, Ordering::Relaxed);
}

/// 记录运行完成次数及耗时（毫秒）。
pub fn record_run_completed(duration_ms: u64) {
    let metrics = metrics();
    metrics.runs_completed.fetch_add(1, Ordering::Relaxed);
    metrics
        .run_duration_ms_total
        .fetch_add(duration_ms, Ordering::Relaxed);
    metrics
        .run_duration_ms_count
        .fetch_add(1, Ordering::Relaxed);
}

/// 记录运行失败次数（存储不可用、前置条件违例）。
pub fn record_run_failed() {
    metrics().runs_failed.fetch_add(1, Ordering::Relaxed);
}

/// 记录因上一轮仍在运行而跳过的触发次数。
pub fn record_run_skipped() {
    metrics().runs_skipped.fetch_add(1, Ordering::Relaxed);
}

/// 记录本轮写入/跳过的记录数。
pub fn record_run_records(inserted: u64, skipped: u64) {
    let metrics = metrics();
    metrics
        .records_inserted
        .fetch_add(inserted, Ordering::Relaxed);
    metrics
        .records_skipped
        .fetch_add(skipped, Ordering::Relaxed);
}

/// 记录单设备取数失败次数。
pub fn record_fetch_failure() {
    metrics().fetch_failures.fetch_add(1, Ordering::Relaxed);
}

/// 记录单设备取数超时次数（同时计入失败）。
pub fn record_fetch_timeout() {
    let metrics = metrics();
    metrics.fetch_timeouts.fetch_add(1, Ordering::Relaxed);
    metrics.fetch_failures.fetch_add(1, Ordering::Relaxed);
}
