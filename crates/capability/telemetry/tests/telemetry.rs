use iot_telemetry::{
    TelemetryMetrics, metrics, new_run_id, record_fetch_timeout, record_run_completed,
    record_run_records,
};

#[test]
fn run_ids_are_unique() {
    assert_ne!(new_run_id(), new_run_id());
}

#[test]
fn fresh_metrics_are_zero() {
    assert_eq!(TelemetryMetrics::new().snapshot(), Default::default());
}

#[test]
fn global_counters_accumulate() {
    let before = metrics().snapshot();
    record_run_completed(25);
    record_run_records(3, 2);
    record_fetch_timeout();
    let after = metrics().snapshot();

    // 全局计数可能被同进程其他测试并发累加，只断言下界
    assert!(after.runs_completed >= before.runs_completed + 1);
    assert!(after.run_duration_ms_total >= before.run_duration_ms_total + 25);
    assert!(after.records_inserted >= before.records_inserted + 3);
    assert!(after.records_skipped >= before.records_skipped + 2);
    assert!(after.fetch_timeouts >= before.fetch_timeouts + 1);
    assert!(after.fetch_failures >= before.fetch_failures + 1);
}
