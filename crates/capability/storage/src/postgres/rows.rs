//! 实体与 Postgres 行之间的映射。

use crate::error::StorageError;
use crate::models::{DataPointRecord, DataRecord, DeviceRecord, GatewayRecord};
use crate::query::FieldValue;
use crate::traits::Entity;
use domain::{AlarmConfig, DataType, DataValue, DeviceStatus};
use sqlx::Row;
use sqlx::postgres::PgRow;

/// 可持久化到 Postgres 的实体。
pub trait PgEntity: Entity {
    /// 全部列（与 `values` 顺序一致）
    const COLUMNS: &'static [&'static str];

    /// 插入时各列的取值
    fn values(&self) -> Vec<FieldValue>;

    fn from_row(row: &PgRow) -> Result<Self, StorageError>;
}

fn parse_status(raw: &str) -> Result<DeviceStatus, StorageError> {
    DeviceStatus::parse(raw).ok_or_else(|| StorageError::new(format!("invalid status: {}", raw)))
}

fn parse_data_type(raw: &str) -> Result<DataType, StorageError> {
    DataType::parse(raw).ok_or_else(|| StorageError::new(format!("invalid data_type: {}", raw)))
}

impl PgEntity for GatewayRecord {
    const COLUMNS: &'static [&'static str] = &[
        "gateway_id",
        "tenant_id",
        "name",
        "protocol_type",
        "address",
        "is_enabled",
        "is_deleted",
        "status",
        "last_connected_at_ms",
        "device_count",
        "created_at_ms",
    ];

    fn values(&self) -> Vec<FieldValue> {
        vec![
            FieldValue::from(&self.gateway_id),
            FieldValue::from(&self.tenant_id),
            FieldValue::from(&self.name),
            FieldValue::from(&self.protocol_type),
            FieldValue::from(self.address.clone()),
            FieldValue::Bool(self.is_enabled),
            FieldValue::Bool(self.is_deleted),
            FieldValue::from(self.status.as_str()),
            FieldValue::from(self.last_connected_at_ms),
            FieldValue::Int(self.device_count),
            FieldValue::Int(self.created_at_ms),
        ]
    }

    fn from_row(row: &PgRow) -> Result<Self, StorageError> {
        let status: String = row.try_get("status")?;
        Ok(Self {
            gateway_id: row.try_get("gateway_id")?,
            tenant_id: row.try_get("tenant_id")?,
            name: row.try_get("name")?,
            protocol_type: row.try_get("protocol_type")?,
            address: row.try_get("address")?,
            is_enabled: row.try_get("is_enabled")?,
            is_deleted: row.try_get("is_deleted")?,
            status: parse_status(&status)?,
            last_connected_at_ms: row.try_get("last_connected_at_ms")?,
            device_count: row.try_get("device_count")?,
            created_at_ms: row.try_get("created_at_ms")?,
        })
    }
}

impl PgEntity for DeviceRecord {
    const COLUMNS: &'static [&'static str] = &[
        "device_id",
        "tenant_id",
        "gateway_id",
        "name",
        "is_enabled",
        "is_deleted",
        "status",
        "last_reported_at_ms",
        "created_at_ms",
    ];

    fn values(&self) -> Vec<FieldValue> {
        vec![
            FieldValue::from(&self.device_id),
            FieldValue::from(&self.tenant_id),
            FieldValue::from(&self.gateway_id),
            FieldValue::from(&self.name),
            FieldValue::Bool(self.is_enabled),
            FieldValue::Bool(self.is_deleted),
            FieldValue::from(self.status.as_str()),
            FieldValue::from(self.last_reported_at_ms),
            FieldValue::Int(self.created_at_ms),
        ]
    }

    fn from_row(row: &PgRow) -> Result<Self, StorageError> {
        let status: String = row.try_get("status")?;
        Ok(Self {
            device_id: row.try_get("device_id")?,
            tenant_id: row.try_get("tenant_id")?,
            gateway_id: row.try_get("gateway_id")?,
            name: row.try_get("name")?,
            is_enabled: row.try_get("is_enabled")?,
            is_deleted: row.try_get("is_deleted")?,
            status: parse_status(&status)?,
            last_reported_at_ms: row.try_get("last_reported_at_ms")?,
            created_at_ms: row.try_get("created_at_ms")?,
        })
    }
}

impl PgEntity for DataPointRecord {
    const COLUMNS: &'static [&'static str] = &[
        "data_point_id",
        "tenant_id",
        "device_id",
        "name",
        "data_type",
        "unit",
        "sampling_interval_secs",
        "is_enabled",
        "is_deleted",
        "last_value",
        "last_updated_at_ms",
        "alarm_config",
        "created_at_ms",
    ];

    fn values(&self) -> Vec<FieldValue> {
        // 告警配置以 JSON 文本存储；序列化失败时按未配置处理
        let alarm = self
            .alarm
            .as_ref()
            .and_then(|alarm| serde_json::to_string(alarm).ok());
        vec![
            FieldValue::from(&self.data_point_id),
            FieldValue::from(&self.tenant_id),
            FieldValue::from(&self.device_id),
            FieldValue::from(&self.name),
            FieldValue::from(self.data_type.as_str()),
            FieldValue::from(self.unit.clone()),
            FieldValue::Int(self.sampling_interval_secs),
            FieldValue::Bool(self.is_enabled),
            FieldValue::Bool(self.is_deleted),
            FieldValue::from(self.last_value.clone()),
            FieldValue::from(self.last_updated_at_ms),
            FieldValue::from(alarm),
            FieldValue::Int(self.created_at_ms),
        ]
    }

    fn from_row(row: &PgRow) -> Result<Self, StorageError> {
        let data_type: String = row.try_get("data_type")?;
        let alarm: Option<String> = row.try_get("alarm_config")?;
        let alarm = alarm
            .map(|raw| serde_json::from_str::<AlarmConfig>(&raw))
            .transpose()
            .map_err(|err| StorageError::new(format!("invalid alarm_config: {}", err)))?;
        Ok(Self {
            data_point_id: row.try_get("data_point_id")?,
            tenant_id: row.try_get("tenant_id")?,
            device_id: row.try_get("device_id")?,
            name: row.try_get("name")?,
            data_type: parse_data_type(&data_type)?,
            unit: row.try_get("unit")?,
            sampling_interval_secs: row.try_get("sampling_interval_secs")?,
            is_enabled: row.try_get("is_enabled")?,
            is_deleted: row.try_get("is_deleted")?,
            last_value: row.try_get("last_value")?,
            last_updated_at_ms: row.try_get("last_updated_at_ms")?,
            alarm,
            created_at_ms: row.try_get("created_at_ms")?,
        })
    }
}

impl PgEntity for DataRecord {
    const COLUMNS: &'static [&'static str] = &[
        "record_id",
        "tenant_id",
        "device_id",
        "data_point_id",
        "data_type",
        "value",
        "reported_at_ms",
        "inserted_at_ms",
        "is_alarm",
        "alarm_level",
        "remarks",
        "is_deleted",
    ];

    fn values(&self) -> Vec<FieldValue> {
        vec![
            FieldValue::from(&self.record_id),
            FieldValue::from(&self.tenant_id),
            FieldValue::from(&self.device_id),
            FieldValue::from(&self.data_point_id),
            FieldValue::from(self.value.data_type().as_str()),
            FieldValue::from(self.value.to_raw()),
            FieldValue::Int(self.reported_at_ms),
            FieldValue::Int(self.inserted_at_ms),
            FieldValue::Bool(self.is_alarm),
            FieldValue::from(self.alarm_level.clone()),
            FieldValue::from(self.remarks.clone()),
            FieldValue::Bool(self.is_deleted),
        ]
    }

    fn from_row(row: &PgRow) -> Result<Self, StorageError> {
        let data_type: String = row.try_get("data_type")?;
        let raw: String = row.try_get("value")?;
        let value = DataValue::parse(parse_data_type(&data_type)?, &raw)
            .map_err(|err| StorageError::new(err.to_string()))?;
        Ok(Self {
            record_id: row.try_get("record_id")?,
            tenant_id: row.try_get("tenant_id")?,
            device_id: row.try_get("device_id")?,
            data_point_id: row.try_get("data_point_id")?,
            value,
            reported_at_ms: row.try_get("reported_at_ms")?,
            inserted_at_ms: row.try_get("inserted_at_ms")?,
            is_alarm: row.try_get("is_alarm")?,
            alarm_level: row.try_get("alarm_level")?,
            remarks: row.try_get("remarks")?,
            is_deleted: row.try_get("is_deleted")?,
        })
    }
}
