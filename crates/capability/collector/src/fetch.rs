//! 取数端口
//!
//! 采集链路通过 [`ValueFetcher`] 获取某设备一批数据点的当前值，
//! 具体传输协议（HTTP/MQTT/Modbus 等）由外部实现。

use crate::error::FetchError;
use async_trait::async_trait;
use iot_storage::{DataPointRecord, DeviceRecord, GatewayRecord};
use tokio_util::sync::CancellationToken;

/// 单设备取数请求：网关、设备与本轮到期的数据点。
#[derive(Debug, Clone)]
pub struct FetchRequest {
    pub gateway: GatewayRecord,
    pub device: DeviceRecord,
    pub data_points: Vec<DataPointRecord>,
}

impl FetchRequest {
    pub fn data_point_ids(&self) -> impl Iterator<Item = &str> {
        self.data_points
            .iter()
            .map(|point| point.data_point_id.as_str())
    }
}

/// 端口返回的一条观测值。
#[derive(Debug, Clone, PartialEq)]
pub struct CollectedValue {
    pub data_point_id: String,
    /// 原始值文本，按数据点类型解析
    pub value: String,
    /// 上报时间（Unix 毫秒）；缺失时使用本轮采集时间
    pub reported_at_ms: Option<i64>,
    /// 传输层已给出的告警判定（优先于本地规则）
    pub is_alarm: Option<bool>,
    pub alarm_level: Option<String>,
}

impl CollectedValue {
    pub fn new(data_point_id: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            data_point_id: data_point_id.into(),
            value: value.into(),
            reported_at_ms: None,
            is_alarm: None,
            alarm_level: None,
        }
    }

    pub fn reported_at(mut self, reported_at_ms: i64) -> Self {
        self.reported_at_ms = Some(reported_at_ms);
        self
    }

    pub fn alarm(mut self, is_alarm: bool, level: Option<&str>) -> Self {
        self.is_alarm = Some(is_alarm);
        self.alarm_level = level.map(str::to_string);
        self
    }
}

/// 取数端口。
///
/// 实现必须及时响应 `cancel`；调用方另有超时兜底。
#[async_trait]
pub trait ValueFetcher: Send + Sync {
    async fn fetch(
        &self,
        request: &FetchRequest,
        cancel: &CancellationToken,
    ) -> Result<Vec<CollectedValue>, FetchError>;
}

/// 空取数端口（未接入具体协议时使用）。
#[derive(Debug, Default)]
pub struct NoopFetcher;

#[async_trait]
impl ValueFetcher for NoopFetcher {
    async fn fetch(
        &self,
        _request: &FetchRequest,
        _cancel: &CancellationToken,
    ) -> Result<Vec<CollectedValue>, FetchError> {
        Ok(Vec::new())
    }
}
