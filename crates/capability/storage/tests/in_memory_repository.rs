use domain::{DataType, DataValue, TenantContext};
use iot_storage::{
    DataPointRecord, DataRecord, DeviceField, DeviceRecord, FilterBuilder, GatewayField,
    GatewayRecord, InMemoryRepository, Page, Repository, Sort, SortBuilder, StorageErrorKind,
    UpdateBuilder,
};
use std::sync::Arc;

fn ctx(tenant_id: &str) -> TenantContext {
    TenantContext::system(tenant_id)
}

fn record(tenant_id: &str, reported_at_ms: i64) -> DataRecord {
    DataRecord {
        record_id: format!("rec-{}", reported_at_ms),
        tenant_id: tenant_id.to_string(),
        device_id: "dev-1".to_string(),
        data_point_id: "temp".to_string(),
        value: DataValue::Numeric(21.5),
        reported_at_ms,
        inserted_at_ms: reported_at_ms,
        is_alarm: false,
        alarm_level: None,
        remarks: None,
        is_deleted: false,
    }
}

#[tokio::test]
async fn insert_rejects_foreign_tenant() {
    let repo = InMemoryRepository::<DeviceRecord>::new();
    let err = repo
        .insert(&ctx("tenant-1"), DeviceRecord::new("tenant-2", "gw-1", "dev-1"))
        .await
        .expect_err("tenant mismatch");
    assert_eq!(err.message(), "tenant mismatch");

    let err = repo
        .insert(&TenantContext::default(), DeviceRecord::new("", "gw-1", "dev-1"))
        .await
        .expect_err("tenant required");
    assert_eq!(err.message(), "tenant_id required");
}

#[tokio::test]
async fn duplicate_data_record_is_reported() {
    let repo = InMemoryRepository::<DataRecord>::new();
    let tenant = ctx("tenant-1");
    repo.insert(&tenant, record("tenant-1", 1_000)).await.expect("insert");

    let mut again = record("tenant-1", 1_000);
    again.record_id = "rec-other".to_string();
    let err = repo.insert(&tenant, again).await.expect_err("duplicate");
    assert!(err.is_duplicate());
    assert!(!err.is_fatal());

    // 同一时刻、不同租户不冲突
    repo.insert(&ctx("tenant-2"), record("tenant-2", 1_000))
        .await
        .expect("other tenant");
    assert_eq!(repo.snapshot().len(), 2);
}

#[tokio::test]
async fn find_is_tenant_isolated() {
    let repo = InMemoryRepository::with_items(vec![
        DeviceRecord::new("tenant-1", "gw-1", "dev-1"),
        DeviceRecord::new("tenant-1", "gw-2", "dev-2"),
        DeviceRecord::new("tenant-2", "gw-1", "dev-3"),
    ]);
    let filter = FilterBuilder::new(&ctx("tenant-1"))
        .eq(DeviceField::GatewayId, "gw-1")
        .build();
    let items = repo.find(&filter, &Sort::by_id(), None).await.expect("find");
    assert_eq!(items.len(), 1);
    assert_eq!(items[0].device_id, "dev-1");

    let all = FilterBuilder::<DeviceRecord>::new(&ctx("tenant-1")).build();
    assert_eq!(repo.count(&all).await.expect("count"), 2);
}

#[tokio::test]
async fn find_paged_reports_total() {
    let repo = InMemoryRepository::with_items(
        (0..5).map(|i| DeviceRecord::new("tenant-1", "gw-1", format!("dev-{}", i))),
    );
    let filter = FilterBuilder::<DeviceRecord>::new(&ctx("tenant-1")).build();
    let sort = SortBuilder::new().desc(DeviceField::DeviceId).build();

    let (first, total) = repo
        .find_paged(&filter, &sort, Page::first(2))
        .await
        .expect("page 1");
    assert_eq!(total, 5);
    assert_eq!(first[0].device_id, "dev-4");

    let (last, _) = repo
        .find_paged(&filter, &sort, Page::new(3, 2))
        .await
        .expect("page 3");
    assert_eq!(last.len(), 1);
    assert_eq!(last[0].device_id, "dev-0");

    let limited = repo.find(&filter, &sort, Some(3)).await.expect("find");
    assert_eq!(limited.len(), 3);
}

#[tokio::test]
async fn write_requires_tenant_scoped_filter() {
    let repo = InMemoryRepository::with_items(vec![GatewayRecord::new("tenant-1", "gw-1", "a")]);
    let update = UpdateBuilder::new()
        .inc(GatewayField::DeviceCount, 1)
        .build()
        .expect("update");
    let err = repo
        .find_one_and_update(&FilterBuilder::unscoped().build(), &update)
        .await
        .expect_err("unscoped write");
    assert_eq!(err.kind(), StorageErrorKind::Precondition);
    assert_eq!(repo.snapshot()[0].device_count, 0);
}

#[tokio::test]
async fn find_one_and_update_returns_none_without_match() {
    let repo = InMemoryRepository::with_items(vec![DataPointRecord::new(
        "tenant-1",
        "dev-1",
        "temp",
        DataType::Numeric,
    )]);
    let update = UpdateBuilder::new()
        .set(iot_storage::DataPointField::LastValue, "1")
        .build()
        .expect("update");
    let filter = FilterBuilder::new(&ctx("tenant-2"))
        .eq(iot_storage::DataPointField::DataPointId, "temp")
        .build();
    let result = repo.find_one_and_update(&filter, &update).await.expect("update");
    assert!(result.is_none());
}

#[tokio::test]
async fn concurrent_increments_are_not_lost() {
    let repo = Arc::new(InMemoryRepository::with_items(vec![GatewayRecord::new(
        "tenant-1", "gw-1", "a",
    )]));
    let mut handles = Vec::new();
    for _ in 0..32 {
        let repo = repo.clone();
        handles.push(tokio::spawn(async move {
            let filter = FilterBuilder::new(&ctx("tenant-1"))
                .eq(GatewayField::GatewayId, "gw-1")
                .build();
            let update = UpdateBuilder::new()
                .inc(GatewayField::DeviceCount, 1)
                .build()
                .expect("update");
            repo.find_one_and_update(&filter, &update)
                .await
                .expect("inc")
                .expect("matched");
        }));
    }
    for handle in handles {
        handle.await.expect("join");
    }
    assert_eq!(repo.snapshot()[0].device_count, 32);
}

#[tokio::test]
async fn concurrent_claims_succeed_once() {
    let repo = Arc::new(InMemoryRepository::with_items(vec![DeviceRecord::new(
        "tenant-1", "gw-1", "dev-1",
    )]));
    let mut handles = Vec::new();
    for i in 0..16 {
        let repo = repo.clone();
        handles.push(tokio::spawn(async move {
            let filter = FilterBuilder::new(&ctx("tenant-1"))
                .eq(DeviceField::DeviceId, "dev-1")
                .missing(DeviceField::LastReportedAt)
                .build();
            let update = UpdateBuilder::new()
                .set(DeviceField::LastReportedAt, i as i64)
                .build()
                .expect("update");
            repo.find_one_and_update(&filter, &update)
                .await
                .expect("claim")
                .is_some()
        }));
    }
    let mut claimed = 0;
    for handle in handles {
        if handle.await.expect("join") {
            claimed += 1;
        }
    }
    assert_eq!(claimed, 1);
}
