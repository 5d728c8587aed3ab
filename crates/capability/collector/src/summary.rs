//! 运行汇总
//!
//! 纯聚合逻辑，不做任何 I/O：
//! - DeviceOutcome：单设备工作单元的结果
//! - RunSummary：按枚举序号归并各工作者的部分结果
//! - CollectionRunResult：对外的运行结果契约

use serde::Serialize;

/// 运行结果契约。
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CollectionRunResult {
    pub devices_processed: u64,
    pub data_points_processed: u64,
    pub records_inserted: u64,
    pub records_skipped: u64,
    pub warnings: Vec<String>,
}

/// 单设备处理结论。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeviceRunStatus {
    /// 取数成功（或本轮无到期数据点）
    Processed,
    /// 取数失败/超时或数据点列举失败，不计入处理数
    Failed,
}

/// 单设备工作单元的结果。
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeviceOutcome {
    pub device_id: String,
    pub status: DeviceRunStatus,
    /// 本轮是否实际完成了一次成功取数
    pub fetched: bool,
    pub data_points_processed: u64,
    pub records_inserted: u64,
    pub records_skipped: u64,
    pub warnings: Vec<String>,
    /// 非致命的记录写入失败次数
    pub write_failures: u64,
    pub last_write_error: Option<String>,
}

impl DeviceOutcome {
    pub fn new(device_id: impl Into<String>) -> Self {
        Self {
            device_id: device_id.into(),
            status: DeviceRunStatus::Processed,
            fetched: false,
            data_points_processed: 0,
            records_inserted: 0,
            records_skipped: 0,
            warnings: Vec::new(),
            write_failures: 0,
            last_write_error: None,
        }
    }

    pub fn warn(&mut self, message: impl Into<String>) {
        self.warnings.push(message.into());
    }

    pub fn fail(&mut self, message: impl Into<String>) {
        self.status = DeviceRunStatus::Failed;
        self.warn(message);
    }
}

#[derive(Debug, Clone)]
enum Entry {
    Device(DeviceOutcome),
    Warning(String),
}

/// 运行汇总器。
///
/// 每个条目携带枚举序号，归并前按序号排序，
/// 因此结果与并发度及工作者完成顺序无关。
#[derive(Debug, Default)]
pub struct RunSummary {
    entries: Vec<(u64, Entry)>,
    trailing: Vec<String>,
}

impl RunSummary {
    pub fn record(&mut self, ordinal: u64, outcome: DeviceOutcome) {
        self.entries.push((ordinal, Entry::Device(outcome)));
    }

    pub fn extend(&mut self, partial: impl IntoIterator<Item = (u64, DeviceOutcome)>) {
        for (ordinal, outcome) in partial {
            self.record(ordinal, outcome);
        }
    }

    /// 与某个枚举位置关联的运行级警告（网关级失败等）
    pub fn warn(&mut self, ordinal: u64, message: impl Into<String>) {
        self.entries.push((ordinal, Entry::Warning(message.into())));
    }

    /// 追加在所有条目之后的警告（取消等）
    pub fn warn_last(&mut self, message: impl Into<String>) {
        self.trailing.push(message.into());
    }

    /// 本轮有写入失败且没有任何记录写入成功时，返回 (失败次数, 最后一次错误)。
    ///
    /// 按序号取最后一次错误，与并发度无关。
    pub fn total_write_failure(&self) -> Option<(u64, String)> {
        let mut failures = 0;
        let mut last: Option<(u64, &str)> = None;
        for (ordinal, entry) in &self.entries {
            let Entry::Device(outcome) = entry else {
                continue;
            };
            if outcome.records_inserted > 0 {
                return None;
            }
            failures += outcome.write_failures;
            if let Some(err) = outcome.last_write_error.as_deref() {
                if last.is_none_or(|(seen, _)| *ordinal > seen) {
                    last = Some((*ordinal, err));
                }
            }
        }
        if failures == 0 {
            return None;
        }
        Some((failures, last.map(|(_, err)| err.to_string()).unwrap_or_default()))
    }

    pub fn finish(mut self) -> CollectionRunResult {
        self.entries.sort_by_key(|(ordinal, _)| *ordinal);
        let mut result = CollectionRunResult::default();
        for (_, entry) in self.entries {
            match entry {
                Entry::Device(outcome) => {
                    if outcome.status == DeviceRunStatus::Processed {
                        result.devices_processed += 1;
                        result.data_points_processed += outcome.data_points_processed;
                    }
                    result.records_inserted += outcome.records_inserted;
                    result.records_skipped += outcome.records_skipped;
                    result.warnings.extend(outcome.warnings);
                }
                Entry::Warning(message) => result.warnings.push(message),
            }
        }
        result.warnings.extend(self.trailing);
        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn outcome(device_id: &str, inserted: u64, warning: Option<&str>) -> DeviceOutcome {
        let mut outcome = DeviceOutcome::new(device_id);
        outcome.data_points_processed = 1;
        outcome.records_inserted = inserted;
        if let Some(warning) = warning {
            outcome.warn(warning);
        }
        outcome
    }

    #[test]
    fn finish_is_independent_of_arrival_order() {
        let items = vec![
            (0, outcome("dev-a", 1, Some("a"))),
            (1, outcome("dev-b", 2, Some("b"))),
            (2, outcome("dev-c", 0, Some("c"))),
        ];

        let mut forward = RunSummary::default();
        forward.extend(items.clone());
        let mut backward = RunSummary::default();
        backward.extend(items.into_iter().rev());

        let forward = forward.finish();
        assert_eq!(forward, backward.finish());
        assert_eq!(forward.warnings, vec!["a", "b", "c"]);
        assert_eq!(forward.records_inserted, 3);
        assert_eq!(forward.devices_processed, 3);
    }

    #[test]
    fn failed_devices_are_not_counted() {
        let mut failed = DeviceOutcome::new("dev-x");
        failed.data_points_processed = 4;
        failed.fail("device dev-x: fetch failed");

        let mut summary = RunSummary::default();
        summary.record(1, failed);
        summary.record(0, outcome("dev-y", 1, None));
        summary.warn(2, "gateway gw-1: touch failed");
        summary.warn_last("collection run cancelled before completion");
        let result = summary.finish();

        assert_eq!(result.devices_processed, 1);
        assert_eq!(result.data_points_processed, 1);
        assert_eq!(
            result.warnings,
            vec![
                "device dev-x: fetch failed",
                "gateway gw-1: touch failed",
                "collection run cancelled before completion",
            ]
        );
    }

    #[test]
    fn total_write_failure_requires_no_successful_insert() {
        let mut failing = DeviceOutcome::new("dev-1");
        failing.write_failures = 1;
        failing.last_write_error = Some("connection reset".to_string());
        let mut later = DeviceOutcome::new("dev-2");
        later.write_failures = 2;
        later.last_write_error = Some("read-only".to_string());

        let mut summary = RunSummary::default();
        summary.record(5, later.clone());
        summary.record(1, failing.clone());
        assert_eq!(
            summary.total_write_failure(),
            Some((3, "read-only".to_string()))
        );

        summary.record(3, outcome("dev-3", 1, None));
        assert_eq!(summary.total_write_failure(), None);

        let mut clean = RunSummary::default();
        clean.record(0, outcome("dev-4", 0, None));
        assert_eq!(clean.total_write_failure(), None);
    }

    #[test]
    fn result_serializes_camel_case() {
        let value = serde_json::to_value(CollectionRunResult::default()).expect("json");
        assert_eq!(
            value,
            serde_json::json!({
                "devicesProcessed": 0,
                "dataPointsProcessed": 0,
                "recordsInserted": 0,
                "recordsSkipped": 0,
                "warnings": [],
            })
        );
    }
}
