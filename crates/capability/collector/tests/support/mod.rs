#![allow(dead_code)]

use async_trait::async_trait;
use domain::{DataType, TenantContext};
use iot_collector::{
    CollectedValue, Collector, CollectorOptions, CollectorRepositories, FetchError, FetchRequest,
    ValueFetcher,
};
use iot_storage::{
    DataPointRecord, DataRecord, DeviceRecord, Entity, Filter, GatewayRecord, InMemoryRepository,
    Page, Repository, Sort, StorageError, StorageErrorKind, Update,
};
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio_util::sync::CancellationToken;

pub const NOW_MS: i64 = 1_700_000_000_000;

pub fn ctx(tenant_id: &str) -> TenantContext {
    TenantContext::system(tenant_id)
}

/// 内存仓储夹具。
pub struct Fixture {
    pub gateways: Arc<InMemoryRepository<GatewayRecord>>,
    pub devices: Arc<InMemoryRepository<DeviceRecord>>,
    pub data_points: Arc<InMemoryRepository<DataPointRecord>>,
    pub records: Arc<InMemoryRepository<DataRecord>>,
}

impl Fixture {
    pub fn new() -> Self {
        Self {
            gateways: Arc::new(InMemoryRepository::new()),
            devices: Arc::new(InMemoryRepository::new()),
            data_points: Arc::new(InMemoryRepository::new()),
            records: Arc::new(InMemoryRepository::new()),
        }
    }

    pub fn repositories(&self) -> CollectorRepositories {
        CollectorRepositories {
            gateways: self.gateways.clone(),
            devices: self.devices.clone(),
            data_points: self.data_points.clone(),
            records: self.records.clone(),
        }
    }

    pub fn collector(&self, fetcher: Arc<dyn ValueFetcher>, options: CollectorOptions) -> Collector {
        Collector::new(self.repositories(), fetcher, options)
    }

    pub async fn gateway(&self, tenant_id: &str, gateway_id: &str) -> GatewayRecord {
        self.gateways
            .insert(&ctx(tenant_id), GatewayRecord::new(tenant_id, gateway_id, gateway_id))
            .await
            .expect("insert gateway")
    }

    pub async fn device(&self, tenant_id: &str, gateway_id: &str, device_id: &str) -> DeviceRecord {
        self.devices
            .insert(&ctx(tenant_id), DeviceRecord::new(tenant_id, gateway_id, device_id))
            .await
            .expect("insert device")
    }

    pub async fn point(
        &self,
        tenant_id: &str,
        device_id: &str,
        data_point_id: &str,
        data_type: DataType,
    ) -> DataPointRecord {
        self.data_points
            .insert(
                &ctx(tenant_id),
                DataPointRecord::new(tenant_id, device_id, data_point_id, data_type),
            )
            .await
            .expect("insert data point")
    }

    /// 一个网关、一个设备、一个数值数据点。
    pub async fn single(&self, tenant_id: &str) {
        self.gateway(tenant_id, "gw-1").await;
        self.device(tenant_id, "gw-1", "dev-1").await;
        self.point(tenant_id, "dev-1", "temp", DataType::Numeric).await;
    }
}

/// 按设备预置响应的取数端口。
#[derive(Default)]
pub struct ScriptedFetcher {
    responses: HashMap<String, Result<Vec<CollectedValue>, FetchError>>,
    delays: HashMap<String, Duration>,
    panics: HashMap<String, String>,
    /// 未预置的设备：为每个请求的数据点返回该值
    echo: Option<(String, i64)>,
    calls: AtomicUsize,
    requested: Mutex<Vec<(String, Vec<String>)>>,
}

impl ScriptedFetcher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn respond(mut self, device_id: &str, values: Vec<CollectedValue>) -> Self {
        self.responses.insert(device_id.to_string(), Ok(values));
        self
    }

    pub fn fail(mut self, device_id: &str, err: FetchError) -> Self {
        self.responses.insert(device_id.to_string(), Err(err));
        self
    }

    pub fn delay(mut self, device_id: &str, delay: Duration) -> Self {
        self.delays.insert(device_id.to_string(), delay);
        self
    }

    /// 对指定设备的取数直接 panic。
    pub fn panic(mut self, device_id: &str, message: &str) -> Self {
        self.panics.insert(device_id.to_string(), message.to_string());
        self
    }

    pub fn echo(mut self, value: &str, reported_at_ms: i64) -> Self {
        self.echo = Some((value.to_string(), reported_at_ms));
        self
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn requested(&self) -> Vec<(String, Vec<String>)> {
        self.requested.lock().expect("lock").clone()
    }
}

#[async_trait]
impl ValueFetcher for ScriptedFetcher {
    async fn fetch(
        &self,
        request: &FetchRequest,
        cancel: &CancellationToken,
    ) -> Result<Vec<CollectedValue>, FetchError> {
        let device_id = request.device.device_id.clone();
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.requested.lock().expect("lock").push((
            device_id.clone(),
            request.data_point_ids().map(str::to_string).collect(),
        ));
        if let Some(message) = self.panics.get(&device_id) {
            panic!("{}", message);
        }
        if let Some(delay) = self.delays.get(&device_id) {
            tokio::select! {
                _ = cancel.cancelled() => return Err(FetchError::Cancelled),
                _ = tokio::time::sleep(*delay) => {}
            }
        }
        if let Some(response) = self.responses.get(&device_id) {
            return response.clone();
        }
        match &self.echo {
            Some((value, reported_at_ms)) => Ok(request
                .data_point_ids()
                .map(|id| CollectedValue::new(id, value.as_str()).reported_at(*reported_at_ms))
                .collect()),
            None => Ok(Vec::new()),
        }
    }
}

/// 对指定操作注入存储错误的仓储包装。
pub struct FaultyRepository<E: Entity> {
    pub inner: Arc<InMemoryRepository<E>>,
    pub insert_fault: Option<StorageErrorKind>,
    pub count_fault: Option<StorageErrorKind>,
    pub update_fault: Option<StorageErrorKind>,
    /// 仅对唯一键包含该片段的实体注入插入错误
    pub fault_key: Option<String>,
    paged_calls: AtomicUsize,
}

impl<E: Entity> FaultyRepository<E> {
    pub fn wrap(inner: Arc<InMemoryRepository<E>>) -> Self {
        Self {
            inner,
            insert_fault: None,
            count_fault: None,
            update_fault: None,
            fault_key: None,
            paged_calls: AtomicUsize::new(0),
        }
    }

    pub fn paged_calls(&self) -> usize {
        self.paged_calls.load(Ordering::SeqCst)
    }
}

fn injected(kind: StorageErrorKind) -> StorageError {
    StorageError::with_kind(kind, "injected fault")
}

#[async_trait]
impl<E: Entity> Repository<E> for FaultyRepository<E> {
    async fn insert(&self, ctx: &TenantContext, entity: E) -> Result<E, StorageError> {
        if let Some(kind) = self.insert_fault {
            let targeted = self
                .fault_key
                .as_deref()
                .is_none_or(|key| entity.unique_key().contains(key));
            if targeted {
                return Err(injected(kind));
            }
        }
        self.inner.insert(ctx, entity).await
    }

    async fn find(
        &self,
        filter: &Filter<E>,
        sort: &Sort<E>,
        limit: Option<u32>,
    ) -> Result<Vec<E>, StorageError> {
        self.inner.find(filter, sort, limit).await
    }

    async fn find_paged(
        &self,
        filter: &Filter<E>,
        sort: &Sort<E>,
        page: Page,
    ) -> Result<(Vec<E>, u64), StorageError> {
        self.paged_calls.fetch_add(1, Ordering::SeqCst);
        self.inner.find_paged(filter, sort, page).await
    }

    async fn find_one_and_update(
        &self,
        filter: &Filter<E>,
        update: &Update<E>,
    ) -> Result<Option<E>, StorageError> {
        if let Some(kind) = self.update_fault {
            return Err(injected(kind));
        }
        self.inner.find_one_and_update(filter, update).await
    }

    async fn count(&self, filter: &Filter<E>) -> Result<u64, StorageError> {
        if let Some(kind) = self.count_fault {
            return Err(injected(kind));
        }
        self.inner.count(filter).await
    }
}
