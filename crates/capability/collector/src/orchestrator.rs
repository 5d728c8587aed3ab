//! 采集编排
//!
//! 单次运行：网关 → 设备 → 到期数据点 → 取数 → 去重入库 → 派生字段原子更新 → 汇总。
//!
//! - 网关顺序处理，网关下的设备交给固定大小的工作者池并发处理
//! - 所有查询都限定在当前网关所属租户内（全租户模式下仅网关枚举跨租户且只读）
//! - 计数类字段只通过 `find_one_and_update` 的原子增量维护

use crate::alarm::evaluate;
use crate::error::{CollectError, FetchError};
use crate::fetch::{CollectedValue, FetchRequest, ValueFetcher};
use crate::options::CollectorOptions;
use crate::pool::run_pool;
use crate::summary::{CollectionRunResult, DeviceOutcome, RunSummary};
use domain::{DataValue, DeviceStatus, TenantContext, now_epoch_ms};
use iot_storage::{
    DataPointField, DataPointRecord, DataRecord, DataRecordField, DeviceField, DeviceRecord,
    Entity, Filter, FilterBuilder, GatewayField, GatewayRecord, Page, Repository, Sort,
    StorageError, UpdateBuilder,
};
use iot_telemetry::{
    new_run_id, record_fetch_failure, record_fetch_timeout, record_run_completed,
    record_run_failed, record_run_records, record_run_started,
};
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::Instrument;

/// 运行被取消时追加的警告。
pub const CANCELLED_WARNING: &str = "collection run cancelled before completion";

/// 采集链路使用的仓储集合（以 trait 对象注入，测试中替换为内存实现）。
#[derive(Clone)]
pub struct CollectorRepositories {
    pub gateways: Arc<dyn Repository<GatewayRecord>>,
    pub devices: Arc<dyn Repository<DeviceRecord>>,
    pub data_points: Arc<dyn Repository<DataPointRecord>>,
    pub records: Arc<dyn Repository<DataRecord>>,
}

/// 单设备工作条目。
struct DeviceWork {
    ctx: TenantContext,
    gateway: Arc<GatewayRecord>,
    device: DeviceRecord,
}

/// 单条值的入库结论。
enum Stored {
    /// 已写入，携带用于刷新最新值的文本
    Inserted(String),
    Duplicate,
}

struct CollectorInner {
    repos: CollectorRepositories,
    fetcher: Arc<dyn ValueFetcher>,
    options: CollectorOptions,
}

/// 采集编排入口。
#[derive(Clone)]
pub struct Collector {
    inner: Arc<CollectorInner>,
}

impl Collector {
    pub fn new(
        repos: CollectorRepositories,
        fetcher: Arc<dyn ValueFetcher>,
        options: CollectorOptions,
    ) -> Self {
        let inner = CollectorInner {
            repos,
            fetcher,
            options: options.sanitized(),
        };
        Self {
            inner: Arc::new(inner),
        }
    }

    pub fn options(&self) -> &CollectorOptions {
        &self.inner.options
    }

    /// 执行一次采集（生成新的 run_id 并在 `collection_run` span 内运行）。
    pub async fn run_once(
        &self,
        cancel: &CancellationToken,
    ) -> Result<CollectionRunResult, CollectError> {
        let run_id = new_run_id();
        let span = tracing::info_span!("collection_run", run_id = %run_id);
        self.run_once_at(now_epoch_ms(), cancel).instrument(span).await
    }

    /// 以给定采集时刻执行一次采集。
    ///
    /// 取消时返回部分结果而非错误；存储不可用或前置条件违例时返回错误。
    pub async fn run_once_at(
        &self,
        now_ms: i64,
        cancel: &CancellationToken,
    ) -> Result<CollectionRunResult, CollectError> {
        if !self.inner.options.enabled {
            tracing::info!(target: "iot.collector", "collection_disabled");
            return Ok(CollectionRunResult::default());
        }
        record_run_started();
        let started = Instant::now();
        let outcome = self.collect(now_ms, cancel).await;
        match &outcome {
            Ok(result) => {
                record_run_completed(started.elapsed().as_millis() as u64);
                record_run_records(result.records_inserted, result.records_skipped);
                tracing::info!(
                    target: "iot.collector",
                    devices_processed = result.devices_processed,
                    data_points_processed = result.data_points_processed,
                    records_inserted = result.records_inserted,
                    records_skipped = result.records_skipped,
                    warnings = result.warnings.len(),
                    "collection_run_finished"
                );
            }
            Err(err) => {
                record_run_failed();
                tracing::error!(target: "iot.collector", error = %err, "collection_run_failed");
            }
        }
        outcome
    }

    async fn collect(
        &self,
        now_ms: i64,
        cancel: &CancellationToken,
    ) -> Result<CollectionRunResult, CollectError> {
        let run_cancel = cancel.child_token();
        tracing::info!(
            target: "iot.collector",
            tenant_id = self.inner.options.tenant_id.as_deref().unwrap_or("*"),
            "collection_run_started"
        );

        // 网关与设备均逐页处理，内存占用受页大小约束
        let mut summary = RunSummary::default();
        let mut next_ordinal: u64 = 0;
        let gateway_filter = self.gateway_filter();
        let mut page = Page::first(self.inner.options.page_size);
        'gateways: loop {
            let (gateways, has_more) = self
                .next_page(self.inner.repos.gateways.as_ref(), &gateway_filter, page)
                .await?;
            for gateway in gateways {
                if run_cancel.is_cancelled() {
                    break 'gateways;
                }
                self.collect_gateway(gateway, now_ms, &run_cancel, &mut summary, &mut next_ordinal)
                    .await?;
            }
            if !has_more || run_cancel.is_cancelled() {
                break;
            }
            page = page.next();
        }

        if let Some((failures, last_error)) = summary.total_write_failure() {
            tracing::error!(
                target: "iot.collector",
                failures,
                error = %last_error,
                "collection_writes_all_failed"
            );
            return Err(CollectError::Storage(StorageError::unavailable(format!(
                "all {} record writes failed: {}",
                failures, last_error
            ))));
        }
        if run_cancel.is_cancelled() {
            tracing::warn!(target: "iot.collector", "collection_run_cancelled");
            summary.warn_last(CANCELLED_WARNING);
        }
        Ok(summary.finish())
    }

    /// 处理单个网关：设备逐页交给工作者池，序号跨页递增。
    async fn collect_gateway(
        &self,
        gateway: GatewayRecord,
        now_ms: i64,
        run_cancel: &CancellationToken,
        summary: &mut RunSummary,
        next_ordinal: &mut u64,
    ) -> Result<(), CollectError> {
        let ctx = TenantContext::system(gateway.tenant_id.clone());
        let gateway = Arc::new(gateway);
        let filter = FilterBuilder::new(&ctx)
            .eq(DeviceField::GatewayId, gateway.gateway_id.as_str())
            .eq(DeviceField::IsEnabled, true)
            .build();
        let mut page = Page::first(self.inner.options.page_size);
        let mut connected = false;

        loop {
            if run_cancel.is_cancelled() {
                break;
            }
            let devices = self
                .next_page(self.inner.repos.devices.as_ref(), &filter, page)
                .await;
            let (devices, has_more) = match devices {
                Ok(batch) => batch,
                Err(err) if err.is_fatal() => return Err(err.into()),
                Err(err) => {
                    tracing::warn!(
                        target: "iot.collector",
                        tenant_id = %ctx.tenant_id,
                        gateway_id = %gateway.gateway_id,
                        error = %err,
                        "gateway_devices_list_failed"
                    );
                    summary.warn(
                        *next_ordinal,
                        format!("gateway {}: failed to list devices: {}", gateway.gateway_id, err),
                    );
                    *next_ordinal += 1;
                    break;
                }
            };
            if devices.is_empty() && page.index == 1 {
                tracing::debug!(
                    target: "iot.collector",
                    gateway_id = %gateway.gateway_id,
                    "gateway_has_no_enabled_devices"
                );
            }

            let mut items = Vec::with_capacity(devices.len());
            for device in devices {
                let work = DeviceWork {
                    ctx: ctx.clone(),
                    gateway: gateway.clone(),
                    device,
                };
                items.push((*next_ordinal, work));
                *next_ordinal += 1;
            }
            let collector = self.clone();
            let work = move |item: DeviceWork, cancel: CancellationToken| {
                let collector = collector.clone();
                async move { collector.process_device(item, now_ms, &cancel).await }
            };
            let partial = run_pool(items, self.inner.options.max_parallelism, run_cancel, work)
                .await?;
            connected |= partial.iter().any(|(_, outcome)| outcome.fetched);
            summary.extend(partial);

            if !has_more {
                break;
            }
            page = page.next();
        }

        if connected {
            if let Err(err) = self.mark_gateway_connected(&ctx, &gateway.gateway_id).await {
                if err.is_fatal() {
                    return Err(err.into());
                }
                summary.warn(
                    *next_ordinal,
                    format!(
                        "gateway {}: failed to record connectivity: {}",
                        gateway.gateway_id, err
                    ),
                );
                *next_ordinal += 1;
            }
        }
        Ok(())
    }

    async fn process_device(
        &self,
        item: DeviceWork,
        now_ms: i64,
        cancel: &CancellationToken,
    ) -> Result<Option<DeviceOutcome>, CollectError> {
        let DeviceWork {
            ctx,
            gateway,
            device,
        } = item;
        let device_id = device.device_id.clone();
        let mut outcome = DeviceOutcome::new(&device_id);

        let data_points = match self.list_due_points(&ctx, &device_id, now_ms).await {
            Ok(points) => points,
            Err(err) if err.is_fatal() => return Err(err.into()),
            Err(err) => {
                outcome.fail(format!(
                    "device {}: failed to list data points: {}",
                    device_id, err
                ));
                return Ok(Some(outcome));
            }
        };
        if data_points.is_empty() {
            return Ok(Some(outcome));
        }

        let request = FetchRequest {
            gateway: gateway.as_ref().clone(),
            device,
            data_points,
        };
        let timeout = self.inner.options.timeout;
        // 取数在独立任务中执行，端口实现的 panic 只影响当前设备
        let fetcher = self.inner.fetcher.clone();
        let task_request = request.clone();
        let task_cancel = cancel.clone();
        let mut task = tokio::spawn(
            async move { fetcher.fetch(&task_request, &task_cancel).await }.in_current_span(),
        );
        let raced = tokio::select! {
            biased;
            _ = cancel.cancelled() => None,
            fetched = tokio::time::timeout(timeout, &mut task) => Some(fetched),
        };
        let Some(fetched) = raced else {
            task.abort();
            return Ok(None);
        };
        let failure = match fetched {
            Ok(Ok(Ok(values))) => Ok(values),
            Ok(Ok(Err(FetchError::Cancelled))) if cancel.is_cancelled() => return Ok(None),
            Ok(Ok(Err(err))) => Err(err),
            Ok(Err(join_err)) if join_err.is_panic() => {
                Err(FetchError::Panicked(panic_message(join_err.into_panic())))
            }
            Ok(Err(join_err)) => Err(FetchError::Transport(join_err.to_string())),
            Err(_) => {
                task.abort();
                record_fetch_timeout();
                self.fail_device(&ctx, &request, FetchError::Timeout(timeout), &mut outcome)
                    .await?;
                return Ok(Some(outcome));
            }
        };
        let values = match failure {
            Ok(values) => values,
            Err(err) => {
                record_fetch_failure();
                self.fail_device(&ctx, &request, err, &mut outcome).await?;
                return Ok(Some(outcome));
            }
        };

        outcome.fetched = true;
        outcome.data_points_processed = request.data_points.len() as u64;
        self.persist_values(&ctx, &request, values, now_ms, &mut outcome)
            .await?;
        Ok(Some(outcome))
    }

    async fn fail_device(
        &self,
        ctx: &TenantContext,
        request: &FetchRequest,
        err: FetchError,
        outcome: &mut DeviceOutcome,
    ) -> Result<(), CollectError> {
        let device_id = &request.device.device_id;
        tracing::warn!(
            target: "iot.collector",
            tenant_id = %ctx.tenant_id,
            gateway_id = %request.gateway.gateway_id,
            device_id = %device_id,
            error = %err,
            "device_fetch_failed"
        );
        outcome.fail(format!("device {}: fetch failed: {}", device_id, err));

        let filter = FilterBuilder::new(ctx)
            .eq(DeviceField::DeviceId, device_id.as_str())
            .build();
        let update = UpdateBuilder::new()
            .set(DeviceField::Status, DeviceStatus::Offline.as_str())
            .build()?;
        match self.inner.repos.devices.find_one_and_update(&filter, &update).await {
            Ok(_) => Ok(()),
            Err(err) if err.is_fatal() => Err(err.into()),
            Err(err) => {
                outcome.warn(format!(
                    "device {}: failed to record offline status: {}",
                    device_id, err
                ));
                Ok(())
            }
        }
    }

    async fn persist_values(
        &self,
        ctx: &TenantContext,
        request: &FetchRequest,
        values: Vec<CollectedValue>,
        now_ms: i64,
        outcome: &mut DeviceOutcome,
    ) -> Result<(), CollectError> {
        let device_id = request.device.device_id.as_str();
        let requested: HashMap<&str, &DataPointRecord> = request
            .data_points
            .iter()
            .map(|point| (point.data_point_id.as_str(), point))
            .collect();
        let mut answered: HashSet<&str> = HashSet::new();
        // 至少一条已请求且可解析的值才算设备上报
        let mut received = false;

        for value in &values {
            let Some(point) = requested.get(value.data_point_id.as_str()).copied() else {
                outcome.records_skipped += 1;
                tracing::debug!(
                    target: "iot.collector",
                    device_id = %device_id,
                    data_point_id = %value.data_point_id,
                    "unrequested_value_skipped"
                );
                continue;
            };
            answered.insert(point.data_point_id.as_str());

            let parsed = match DataValue::parse(point.data_type, &value.value) {
                Ok(parsed) => parsed,
                Err(err) => {
                    outcome.records_skipped += 1;
                    outcome.warn(format!(
                        "device {}: data point {}: {}",
                        device_id, point.data_point_id, err
                    ));
                    continue;
                }
            };

            received = true;
            let reported_at_ms = value.reported_at_ms.unwrap_or(now_ms);
            match self
                .store_value(ctx, point, parsed, value, reported_at_ms, now_ms)
                .await
            {
                Ok(Stored::Inserted(raw)) => {
                    outcome.records_inserted += 1;
                    let refreshed = self
                        .update_data_point(ctx, &point.data_point_id, Some(raw), now_ms)
                        .await;
                    if let Err(err) = refreshed {
                        if err.is_fatal() {
                            return Err(err.into());
                        }
                        outcome.warn(format!(
                            "device {}: failed to refresh data point {}: {}",
                            device_id, point.data_point_id, err
                        ));
                    }
                }
                Ok(Stored::Duplicate) => outcome.records_skipped += 1,
                Err(err) if err.is_fatal() => return Err(err.into()),
                Err(err) => {
                    // 该设备剩余写入全部放弃
                    tracing::warn!(
                        target: "iot.collector",
                        device_id = %device_id,
                        data_point_id = %point.data_point_id,
                        error = %err,
                        "data_record_persist_failed"
                    );
                    outcome.write_failures += 1;
                    outcome.last_write_error = Some(err.to_string());
                    outcome.warn(format!(
                        "device {}: failed to persist data point {}: {}",
                        device_id, point.data_point_id, err
                    ));
                    return Ok(());
                }
            }
        }

        // 请求了但未返回值的数据点同样刷新采样时间，避免每轮都被重复选中
        for point in &request.data_points {
            if answered.contains(point.data_point_id.as_str()) {
                continue;
            }
            let result = self
                .update_data_point(ctx, &point.data_point_id, None, now_ms)
                .await;
            if let Err(err) = result {
                if err.is_fatal() {
                    return Err(err.into());
                }
                outcome.warn(format!(
                    "device {}: failed to refresh data point {}: {}",
                    device_id, point.data_point_id, err
                ));
            }
        }

        if received {
            self.mark_device_reported(ctx, request, now_ms, outcome)
                .await?;
        }
        Ok(())
    }

    /// 去重检查后写入一条记录。
    async fn store_value(
        &self,
        ctx: &TenantContext,
        point: &DataPointRecord,
        value: DataValue,
        collected: &CollectedValue,
        reported_at_ms: i64,
        now_ms: i64,
    ) -> Result<Stored, StorageError> {
        let repos = &self.inner.repos;
        let existing = FilterBuilder::new(ctx)
            .eq(DataRecordField::DeviceId, point.device_id.as_str())
            .eq(DataRecordField::DataPointId, point.data_point_id.as_str())
            .eq(DataRecordField::ReportedAt, reported_at_ms)
            .include_deleted()
            .build();
        if repos.records.count(&existing).await? > 0 {
            return Ok(Stored::Duplicate);
        }

        let verdict = evaluate(
            point.alarm.as_ref(),
            &value,
            collected.is_alarm,
            collected.alarm_level.as_deref(),
        );
        let raw = value.to_raw();
        let record = DataRecord {
            record_id: uuid::Uuid::new_v4().to_string(),
            tenant_id: ctx.tenant_id.clone(),
            device_id: point.device_id.clone(),
            data_point_id: point.data_point_id.clone(),
            value,
            reported_at_ms,
            inserted_at_ms: now_ms,
            is_alarm: verdict.is_alarm,
            alarm_level: verdict.level,
            remarks: verdict.message,
            is_deleted: false,
        };
        match repos.records.insert(ctx, record).await {
            Ok(_) => {}
            // 检查与写入之间被并发写入，按重复处理
            Err(err) if err.is_duplicate() => return Ok(Stored::Duplicate),
            Err(err) => return Err(err),
        }
        if verdict.is_alarm {
            tracing::info!(
                target: "iot.collector",
                device_id = %point.device_id,
                data_point_id = %point.data_point_id,
                "data_point_alarm_raised"
            );
        }
        Ok(Stored::Inserted(raw))
    }

    async fn update_data_point(
        &self,
        ctx: &TenantContext,
        data_point_id: &str,
        last_value: Option<String>,
        now_ms: i64,
    ) -> Result<(), StorageError> {
        let filter = FilterBuilder::new(ctx)
            .eq(DataPointField::DataPointId, data_point_id)
            .build();
        let mut update = UpdateBuilder::new().set(DataPointField::LastUpdatedAt, now_ms);
        if let Some(last_value) = last_value {
            update = update.set(DataPointField::LastValue, last_value);
        }
        self.inner
            .repos
            .data_points
            .find_one_and_update(&filter, &update.build()?)
            .await?;
        Ok(())
    }

    /// 刷新设备上报时间与在线状态；首次上报由存在性谓词原子认领，认领者递增网关设备数。
    async fn mark_device_reported(
        &self,
        ctx: &TenantContext,
        request: &FetchRequest,
        now_ms: i64,
        outcome: &mut DeviceOutcome,
    ) -> Result<(), CollectError> {
        let device_id = request.device.device_id.as_str();
        let gateway_id = request.gateway.gateway_id.as_str();
        let report = UpdateBuilder::new()
            .set(DeviceField::LastReportedAt, now_ms)
            .set(DeviceField::Status, DeviceStatus::Online.as_str())
            .build()?;
        let devices = &self.inner.repos.devices;

        let first_report = FilterBuilder::new(ctx)
            .eq(DeviceField::DeviceId, device_id)
            .missing(DeviceField::LastReportedAt)
            .build();
        let claimed = match devices.find_one_and_update(&first_report, &report).await {
            Ok(claimed) => claimed.is_some(),
            Err(err) => return report_failure(device_id, err, outcome),
        };

        if claimed {
            let gateway_filter = FilterBuilder::new(ctx)
                .eq(GatewayField::GatewayId, gateway_id)
                .build();
            let increment = UpdateBuilder::new()
                .inc(GatewayField::DeviceCount, 1)
                .build()?;
            if let Err(err) = self
                .inner
                .repos
                .gateways
                .find_one_and_update(&gateway_filter, &increment)
                .await
            {
                return report_failure(device_id, err, outcome);
            }
            tracing::info!(
                target: "iot.collector",
                tenant_id = %ctx.tenant_id,
                gateway_id = %gateway_id,
                device_id = %device_id,
                "device_first_report"
            );
            return Ok(());
        }

        let filter = FilterBuilder::new(ctx)
            .eq(DeviceField::DeviceId, device_id)
            .build();
        if let Err(err) = devices.find_one_and_update(&filter, &report).await {
            return report_failure(device_id, err, outcome);
        }
        Ok(())
    }

    async fn mark_gateway_connected(
        &self,
        ctx: &TenantContext,
        gateway_id: &str,
    ) -> Result<(), StorageError> {
        let filter = FilterBuilder::new(ctx)
            .eq(GatewayField::GatewayId, gateway_id)
            .build();
        let update = UpdateBuilder::new()
            .touch(GatewayField::LastConnectedAt)
            .set(GatewayField::Status, DeviceStatus::Online.as_str())
            .build()?;
        self.inner
            .repos
            .gateways
            .find_one_and_update(&filter, &update)
            .await?;
        Ok(())
    }

    fn gateway_filter(&self) -> Filter<GatewayRecord> {
        let builder = match self.inner.options.tenant_id.as_deref() {
            Some(tenant_id) => FilterBuilder::new(&TenantContext::system(tenant_id)),
            None => FilterBuilder::unscoped(),
        };
        builder.eq(GatewayField::IsEnabled, true).build()
    }

    async fn list_due_points(
        &self,
        ctx: &TenantContext,
        device_id: &str,
        now_ms: i64,
    ) -> Result<Vec<DataPointRecord>, StorageError> {
        let filter = FilterBuilder::new(ctx)
            .eq(DataPointField::DeviceId, device_id)
            .eq(DataPointField::IsEnabled, true)
            .build();
        // 单设备的数据点一次取数全部带上，这里需要完整列表
        let mut points = Vec::new();
        let mut page = Page::first(self.inner.options.page_size);
        loop {
            let (batch, has_more) = self
                .next_page(self.inner.repos.data_points.as_ref(), &filter, page)
                .await?;
            points.extend(batch.into_iter().filter(|point| point.is_due(now_ms)));
            if !has_more {
                break;
            }
            page = page.next();
        }
        Ok(points)
    }

    /// 按主键序读取一页，返回 (当前页, 是否还有下一页)。
    async fn next_page<E: Entity>(
        &self,
        repo: &dyn Repository<E>,
        filter: &Filter<E>,
        page: Page,
    ) -> Result<(Vec<E>, bool), StorageError> {
        let (batch, total) = repo.find_paged(filter, &Sort::by_id(), page).await?;
        let has_more = !batch.is_empty() && page.has_more(total);
        Ok((batch, has_more))
    }
}

fn panic_message(payload: Box<dyn std::any::Any + Send>) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        return (*message).to_string();
    }
    if let Some(message) = payload.downcast_ref::<String>() {
        return message.clone();
    }
    "unknown panic".to_string()
}

/// 设备上报状态写入失败：存储不可用时中止运行，其余记为警告。
fn report_failure(
    device_id: &str,
    err: StorageError,
    outcome: &mut DeviceOutcome,
) -> Result<(), CollectError> {
    if err.is_fatal() {
        return Err(err.into());
    }
    outcome.warn(format!(
        "device {}: failed to record report: {}",
        device_id, err
    ));
    Ok(())
}
