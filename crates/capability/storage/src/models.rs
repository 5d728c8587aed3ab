//! 数据模型
//!
//! 定义采集链路涉及的实体及其可查询字段：
//! - 网关模型：GatewayRecord, GatewayField
//! - 设备模型：DeviceRecord, DeviceField（通过 gateway_id 回指网关）
//! - 数据点模型：DataPointRecord, DataPointField（通过 device_id 回指设备）
//! - 数据记录：DataRecord, DataRecordField（不可变事实，去重键为设备 + 数据点 + 上报时间）

use crate::error::StorageError;
use crate::query::FieldValue;
use crate::traits::{Entity, EntityField};
use domain::{AlarmConfig, DataType, DataValue, DeviceStatus};

// ============================================================================
// 网关
// ============================================================================

/// 网关记录。
///
/// 由开通流程创建；采集链路只更新派生计数与连接时间/状态。
#[derive(Debug, Clone, PartialEq)]
pub struct GatewayRecord {
    pub gateway_id: String,
    pub tenant_id: String,
    pub name: String,
    /// 协议类型: http | mqtt | modbus_tcp ...（由取数端口解释）
    pub protocol_type: String,
    pub address: Option<String>,
    pub is_enabled: bool,
    pub is_deleted: bool,
    pub status: DeviceStatus,
    pub last_connected_at_ms: Option<i64>,
    /// 派生设备数：只能通过原子增量维护
    pub device_count: i64,
    pub created_at_ms: i64,
}

impl GatewayRecord {
    pub fn new(
        tenant_id: impl Into<String>,
        gateway_id: impl Into<String>,
        name: impl Into<String>,
    ) -> Self {
        Self {
            gateway_id: gateway_id.into(),
            tenant_id: tenant_id.into(),
            name: name.into(),
            protocol_type: "http".to_string(),
            address: None,
            is_enabled: true,
            is_deleted: false,
            status: DeviceStatus::Offline,
            last_connected_at_ms: None,
            device_count: 0,
            created_at_ms: 0,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GatewayField {
    GatewayId,
    Name,
    ProtocolType,
    IsEnabled,
    Status,
    LastConnectedAt,
    DeviceCount,
    CreatedAt,
}

impl EntityField for GatewayField {
    fn column(self) -> &'static str {
        match self {
            GatewayField::GatewayId => "gateway_id",
            GatewayField::Name => "name",
            GatewayField::ProtocolType => "protocol_type",
            GatewayField::IsEnabled => "is_enabled",
            GatewayField::Status => "status",
            GatewayField::LastConnectedAt => "last_connected_at_ms",
            GatewayField::DeviceCount => "device_count",
            GatewayField::CreatedAt => "created_at_ms",
        }
    }
}

impl Entity for GatewayRecord {
    type Field = GatewayField;
    const TABLE: &'static str = "gateways";
    const ID_FIELD: GatewayField = GatewayField::GatewayId;

    fn tenant_id(&self) -> &str {
        &self.tenant_id
    }

    fn is_deleted(&self) -> bool {
        self.is_deleted
    }

    fn get(&self, field: GatewayField) -> FieldValue {
        match field {
            GatewayField::GatewayId => FieldValue::from(&self.gateway_id),
            GatewayField::Name => FieldValue::from(&self.name),
            GatewayField::ProtocolType => FieldValue::from(&self.protocol_type),
            GatewayField::IsEnabled => FieldValue::Bool(self.is_enabled),
            GatewayField::Status => FieldValue::from(self.status.as_str()),
            GatewayField::LastConnectedAt => FieldValue::from(self.last_connected_at_ms),
            GatewayField::DeviceCount => FieldValue::Int(self.device_count),
            GatewayField::CreatedAt => FieldValue::Int(self.created_at_ms),
        }
    }

    fn set(&mut self, field: GatewayField, value: FieldValue) -> Result<(), StorageError> {
        match field {
            GatewayField::GatewayId | GatewayField::CreatedAt => return Err(immutable(field)),
            GatewayField::Name => self.name = text(field, value)?,
            GatewayField::ProtocolType => self.protocol_type = text(field, value)?,
            GatewayField::IsEnabled => self.is_enabled = boolean(field, value)?,
            GatewayField::Status => self.status = status(field, value)?,
            GatewayField::LastConnectedAt => self.last_connected_at_ms = optional_int(field, value)?,
            GatewayField::DeviceCount => self.device_count = int(field, value)?,
        }
        Ok(())
    }

    fn unique_key(&self) -> String {
        self.gateway_id.clone()
    }
}

// ============================================================================
// 设备
// ============================================================================

/// 设备记录。
#[derive(Debug, Clone, PartialEq)]
pub struct DeviceRecord {
    pub device_id: String,
    pub tenant_id: String,
    /// 所属网关（回指标识，不持有网关）
    pub gateway_id: String,
    pub name: String,
    pub is_enabled: bool,
    pub is_deleted: bool,
    /// 在线状态（由采集结果推导）
    pub status: DeviceStatus,
    pub last_reported_at_ms: Option<i64>,
    pub created_at_ms: i64,
}

impl DeviceRecord {
    pub fn new(
        tenant_id: impl Into<String>,
        gateway_id: impl Into<String>,
        device_id: impl Into<String>,
    ) -> Self {
        let device_id = device_id.into();
        Self {
            name: device_id.clone(),
            device_id,
            tenant_id: tenant_id.into(),
            gateway_id: gateway_id.into(),
            is_enabled: true,
            is_deleted: false,
            status: DeviceStatus::Offline,
            last_reported_at_ms: None,
            created_at_ms: 0,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeviceField {
    DeviceId,
    GatewayId,
    Name,
    IsEnabled,
    Status,
    LastReportedAt,
    CreatedAt,
}

impl EntityField for DeviceField {
    fn column(self) -> &'static str {
        match self {
            DeviceField::DeviceId => "device_id",
            DeviceField::GatewayId => "gateway_id",
            DeviceField::Name => "name",
            DeviceField::IsEnabled => "is_enabled",
            DeviceField::Status => "status",
            DeviceField::LastReportedAt => "last_reported_at_ms",
            DeviceField::CreatedAt => "created_at_ms",
        }
    }
}

impl Entity for DeviceRecord {
    type Field = DeviceField;
    const TABLE: &'static str = "devices";
    const ID_FIELD: DeviceField = DeviceField::DeviceId;

    fn tenant_id(&self) -> &str {
        &self.tenant_id
    }

    fn is_deleted(&self) -> bool {
        self.is_deleted
    }

    fn get(&self, field: DeviceField) -> FieldValue {
        match field {
            DeviceField::DeviceId => FieldValue::from(&self.device_id),
            DeviceField::GatewayId => FieldValue::from(&self.gateway_id),
            DeviceField::Name => FieldValue::from(&self.name),
            DeviceField::IsEnabled => FieldValue::Bool(self.is_enabled),
            DeviceField::Status => FieldValue::from(self.status.as_str()),
            DeviceField::LastReportedAt => FieldValue::from(self.last_reported_at_ms),
            DeviceField::CreatedAt => FieldValue::Int(self.created_at_ms),
        }
    }

    fn set(&mut self, field: DeviceField, value: FieldValue) -> Result<(), StorageError> {
        match field {
            DeviceField::DeviceId | DeviceField::CreatedAt => return Err(immutable(field)),
            DeviceField::GatewayId => self.gateway_id = text(field, value)?,
            DeviceField::Name => self.name = text(field, value)?,
            DeviceField::IsEnabled => self.is_enabled = boolean(field, value)?,
            DeviceField::Status => self.status = status(field, value)?,
            DeviceField::LastReportedAt => self.last_reported_at_ms = optional_int(field, value)?,
        }
        Ok(())
    }

    fn unique_key(&self) -> String {
        self.device_id.clone()
    }
}

// ============================================================================
// 数据点
// ============================================================================

/// 数据点记录。
#[derive(Debug, Clone, PartialEq)]
pub struct DataPointRecord {
    pub data_point_id: String,
    pub tenant_id: String,
    /// 所属设备（回指标识）
    pub device_id: String,
    pub name: String,
    pub data_type: DataType,
    pub unit: Option<String>,
    /// 采样间隔（秒），<= 0 表示每轮都采集
    pub sampling_interval_secs: i64,
    pub is_enabled: bool,
    pub is_deleted: bool,
    pub last_value: Option<String>,
    pub last_updated_at_ms: Option<i64>,
    pub alarm: Option<AlarmConfig>,
    pub created_at_ms: i64,
}

impl DataPointRecord {
    pub fn new(
        tenant_id: impl Into<String>,
        device_id: impl Into<String>,
        data_point_id: impl Into<String>,
        data_type: DataType,
    ) -> Self {
        let data_point_id = data_point_id.into();
        Self {
            name: data_point_id.clone(),
            data_point_id,
            tenant_id: tenant_id.into(),
            device_id: device_id.into(),
            data_type,
            unit: None,
            sampling_interval_secs: 60,
            is_enabled: true,
            is_deleted: false,
            last_value: None,
            last_updated_at_ms: None,
            alarm: None,
            created_at_ms: 0,
        }
    }

    /// 判定本轮是否到达采样时刻。
    pub fn is_due(&self, now_ms: i64) -> bool {
        if self.sampling_interval_secs <= 0 {
            return true;
        }
        match self.last_updated_at_ms {
            None => true,
            Some(last) => now_ms.saturating_sub(last) >= self.sampling_interval_secs.saturating_mul(1000),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DataPointField {
    DataPointId,
    DeviceId,
    Name,
    DataType,
    SamplingInterval,
    IsEnabled,
    LastValue,
    LastUpdatedAt,
    CreatedAt,
}

impl EntityField for DataPointField {
    fn column(self) -> &'static str {
        match self {
            DataPointField::DataPointId => "data_point_id",
            DataPointField::DeviceId => "device_id",
            DataPointField::Name => "name",
            DataPointField::DataType => "data_type",
            DataPointField::SamplingInterval => "sampling_interval_secs",
            DataPointField::IsEnabled => "is_enabled",
            DataPointField::LastValue => "last_value",
            DataPointField::LastUpdatedAt => "last_updated_at_ms",
            DataPointField::CreatedAt => "created_at_ms",
        }
    }
}

impl Entity for DataPointRecord {
    type Field = DataPointField;
    const TABLE: &'static str = "data_points";
    const ID_FIELD: DataPointField = DataPointField::DataPointId;

    fn tenant_id(&self) -> &str {
        &self.tenant_id
    }

    fn is_deleted(&self) -> bool {
        self.is_deleted
    }

    fn get(&self, field: DataPointField) -> FieldValue {
        match field {
            DataPointField::DataPointId => FieldValue::from(&self.data_point_id),
            DataPointField::DeviceId => FieldValue::from(&self.device_id),
            DataPointField::Name => FieldValue::from(&self.name),
            DataPointField::DataType => FieldValue::from(self.data_type.as_str()),
            DataPointField::SamplingInterval => FieldValue::Int(self.sampling_interval_secs),
            DataPointField::IsEnabled => FieldValue::Bool(self.is_enabled),
            DataPointField::LastValue => FieldValue::from(self.last_value.clone()),
            DataPointField::LastUpdatedAt => FieldValue::from(self.last_updated_at_ms),
            DataPointField::CreatedAt => FieldValue::Int(self.created_at_ms),
        }
    }

    fn set(&mut self, field: DataPointField, value: FieldValue) -> Result<(), StorageError> {
        match field {
            DataPointField::DataPointId | DataPointField::CreatedAt => {
                return Err(immutable(field));
            }
            DataPointField::DeviceId => self.device_id = text(field, value)?,
            DataPointField::Name => self.name = text(field, value)?,
            DataPointField::DataType => {
                let raw = text(field, value)?;
                self.data_type = DataType::parse(&raw).ok_or_else(|| mismatch(field, &raw))?;
            }
            DataPointField::SamplingInterval => self.sampling_interval_secs = int(field, value)?,
            DataPointField::IsEnabled => self.is_enabled = boolean(field, value)?,
            DataPointField::LastValue => self.last_value = optional_text(field, value)?,
            DataPointField::LastUpdatedAt => self.last_updated_at_ms = optional_int(field, value)?,
        }
        Ok(())
    }

    fn unique_key(&self) -> String {
        self.data_point_id.clone()
    }
}

// ============================================================================
// 数据记录
// ============================================================================

/// 数据记录：某数据点在某时刻的一次观测值。
///
/// 只由采集链路创建，创建后不再更新。
#[derive(Debug, Clone, PartialEq)]
pub struct DataRecord {
    pub record_id: String,
    pub tenant_id: String,
    pub device_id: String,
    pub data_point_id: String,
    pub value: DataValue,
    /// 设备上报时间（去重键的一部分）
    pub reported_at_ms: i64,
    /// 采集器写入时间
    pub inserted_at_ms: i64,
    pub is_alarm: bool,
    pub alarm_level: Option<String>,
    pub remarks: Option<String>,
    pub is_deleted: bool,
}

impl DataRecord {
    /// 去重键：(设备, 数据点, 上报时间)。
    pub fn dedup_key(&self) -> (&str, &str, i64) {
        (&self.device_id, &self.data_point_id, self.reported_at_ms)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DataRecordField {
    RecordId,
    DeviceId,
    DataPointId,
    DataType,
    ReportedAt,
    InsertedAt,
    IsAlarm,
}

impl EntityField for DataRecordField {
    fn column(self) -> &'static str {
        match self {
            DataRecordField::RecordId => "record_id",
            DataRecordField::DeviceId => "device_id",
            DataRecordField::DataPointId => "data_point_id",
            DataRecordField::DataType => "data_type",
            DataRecordField::ReportedAt => "reported_at_ms",
            DataRecordField::InsertedAt => "inserted_at_ms",
            DataRecordField::IsAlarm => "is_alarm",
        }
    }
}

impl Entity for DataRecord {
    type Field = DataRecordField;
    const TABLE: &'static str = "data_records";
    const ID_FIELD: DataRecordField = DataRecordField::RecordId;

    fn tenant_id(&self) -> &str {
        &self.tenant_id
    }

    fn is_deleted(&self) -> bool {
        self.is_deleted
    }

    fn get(&self, field: DataRecordField) -> FieldValue {
        match field {
            DataRecordField::RecordId => FieldValue::from(&self.record_id),
            DataRecordField::DeviceId => FieldValue::from(&self.device_id),
            DataRecordField::DataPointId => FieldValue::from(&self.data_point_id),
            DataRecordField::DataType => FieldValue::from(self.value.data_type().as_str()),
            DataRecordField::ReportedAt => FieldValue::Int(self.reported_at_ms),
            DataRecordField::InsertedAt => FieldValue::Int(self.inserted_at_ms),
            DataRecordField::IsAlarm => FieldValue::Bool(self.is_alarm),
        }
    }

    fn set(&mut self, field: DataRecordField, _value: FieldValue) -> Result<(), StorageError> {
        Err(immutable(field))
    }

    fn unique_key(&self) -> String {
        format!(
            "tenant:{}:device:{}:point:{}:ts:{}",
            self.tenant_id, self.device_id, self.data_point_id, self.reported_at_ms
        )
    }
}

// ============================================================================
// 字段值转换
// ============================================================================

fn immutable(field: impl std::fmt::Debug) -> StorageError {
    StorageError::precondition(format!("field {:?} is immutable", field))
}

fn mismatch(field: impl std::fmt::Debug, value: impl std::fmt::Debug) -> StorageError {
    StorageError::precondition(format!("invalid value {:?} for field {:?}", value, field))
}

fn text(field: impl std::fmt::Debug, value: FieldValue) -> Result<String, StorageError> {
    match value {
        FieldValue::Text(v) => Ok(v),
        other => Err(mismatch(field, other)),
    }
}

fn optional_text(
    field: impl std::fmt::Debug,
    value: FieldValue,
) -> Result<Option<String>, StorageError> {
    match value {
        FieldValue::Null => Ok(None),
        FieldValue::Text(v) => Ok(Some(v)),
        other => Err(mismatch(field, other)),
    }
}

fn boolean(field: impl std::fmt::Debug, value: FieldValue) -> Result<bool, StorageError> {
    match value {
        FieldValue::Bool(v) => Ok(v),
        other => Err(mismatch(field, other)),
    }
}

fn int(field: impl std::fmt::Debug, value: FieldValue) -> Result<i64, StorageError> {
    match value {
        FieldValue::Int(v) => Ok(v),
        other => Err(mismatch(field, other)),
    }
}

fn optional_int(
    field: impl std::fmt::Debug,
    value: FieldValue,
) -> Result<Option<i64>, StorageError> {
    match value {
        FieldValue::Null => Ok(None),
        FieldValue::Int(v) => Ok(Some(v)),
        other => Err(mismatch(field, other)),
    }
}

fn status(field: impl std::fmt::Debug, value: FieldValue) -> Result<DeviceStatus, StorageError> {
    let raw = text(&field, value)?;
    DeviceStatus::parse(&raw).ok_or_else(|| mismatch(field, raw))
}
