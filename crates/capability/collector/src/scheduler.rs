//! 采集调度
//!
//! - 单飞：同一时刻只允许一次运行，运行中到来的触发直接跳过
//! - 定时：`tokio::time::interval`，错过的节拍不补跑
//! - 最新一次运行报告通过 watch 通道发布给监控接口

use crate::error::CollectError;
use crate::orchestrator::Collector;
use crate::summary::CollectionRunResult;
use domain::now_epoch_ms;
use iot_telemetry::{new_run_id, record_run_skipped};
use serde::Serialize;
use std::time::Duration;
use tokio::sync::{Mutex, watch};
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tracing::Instrument;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RunStatus {
    Completed,
    Failed,
}

/// 一次运行的报告。
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RunReport {
    pub run_id: String,
    pub started_at_ms: i64,
    pub finished_at_ms: i64,
    pub status: RunStatus,
    pub result: CollectionRunResult,
    pub error: Option<String>,
}

/// 触发结果。
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TriggerOutcome {
    Completed(RunReport),
    /// 上一次运行尚未结束
    Skipped,
}

pub struct CollectionScheduler {
    collector: Collector,
    gate: Mutex<()>,
    latest: watch::Sender<Option<RunReport>>,
    cancel: CancellationToken,
}

impl CollectionScheduler {
    pub fn new(collector: Collector, cancel: CancellationToken) -> Self {
        let (latest, _) = watch::channel(None);
        Self {
            collector,
            gate: Mutex::new(()),
            latest,
            cancel,
        }
    }

    /// 订阅最新运行报告。
    pub fn subscribe(&self) -> watch::Receiver<Option<RunReport>> {
        self.latest.subscribe()
    }

    pub fn latest(&self) -> Option<RunReport> {
        self.latest.borrow().clone()
    }

    pub fn is_running(&self) -> bool {
        self.gate.try_lock().is_err()
    }

    /// 触发一次运行；已有运行进行中时返回 `Skipped`。
    ///
    /// 运行错误记录在报告中，调度不中断。
    pub async fn trigger(&self) -> Result<TriggerOutcome, CollectError> {
        if self.cancel.is_cancelled() {
            return Err(CollectError::Cancelled);
        }
        let Ok(_guard) = self.gate.try_lock() else {
            record_run_skipped();
            tracing::info!(target: "iot.collector", "collection_trigger_skipped");
            return Ok(TriggerOutcome::Skipped);
        };

        let run_id = new_run_id();
        let span = tracing::info_span!("collection_run", run_id = %run_id);
        let started_at_ms = now_epoch_ms();
        let outcome = self
            .collector
            .run_once_at(started_at_ms, &self.cancel)
            .instrument(span)
            .await;
        let (status, result, error) = match outcome {
            Ok(result) => (RunStatus::Completed, result, None),
            Err(err) => (
                RunStatus::Failed,
                CollectionRunResult::default(),
                Some(err.to_string()),
            ),
        };
        let report = RunReport {
            run_id,
            started_at_ms,
            finished_at_ms: now_epoch_ms(),
            status,
            result,
            error,
        };
        self.latest.send_replace(Some(report.clone()));
        Ok(TriggerOutcome::Completed(report))
    }

    /// 按固定间隔运行，直到取消。
    pub async fn run_periodic(&self, period: Duration) {
        let mut ticker = tokio::time::interval(period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
        tracing::info!(
            target: "iot.collector",
            interval_ms = period.as_millis() as u64,
            "collection_scheduler_started"
        );
        loop {
            tokio::select! {
                _ = self.cancel.cancelled() => break,
                _ = ticker.tick() => {
                    if let Err(err) = self.trigger().await {
                        tracing::warn!(target: "iot.collector", error = %err, "collection_trigger_failed");
                    }
                }
            }
        }
        tracing::info!(target: "iot.collector", "collection_scheduler_stopped");
    }
}
