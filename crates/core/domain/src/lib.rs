pub mod alarm;
pub mod data;

pub use alarm::{AlarmConfig, AlarmRule};
pub use data::{DataType, DataValue, DeviceStatus, ValueParseError};

/// 采集链路内部使用的执行者标识。
pub const SYSTEM_ACTOR: &str = "system";

/// 租户上下文：所有数据访问共享的执行上下文。
///
/// 仓储层以此为租户隔离边界，构造过滤条件时自动追加 `tenant_id` 谓词。
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TenantContext {
    pub tenant_id: String,
    pub actor: String,
}

impl TenantContext {
    /// 构造显式租户与执行者的上下文。
    pub fn new(tenant_id: impl Into<String>, actor: impl Into<String>) -> Self {
        Self {
            tenant_id: tenant_id.into(),
            actor: actor.into(),
        }
    }

    /// 采集链路使用的系统上下文。
    pub fn system(tenant_id: impl Into<String>) -> Self {
        Self::new(tenant_id, SYSTEM_ACTOR)
    }
}

/// 当前 Unix 时间戳（毫秒）。
pub fn now_epoch_ms() -> i64 {
    let now = std::time::SystemTime::now();
    let duration = now
        .duration_since(std::time::UNIX_EPOCH)
        .unwrap_or_default();
    duration.as_millis() as i64
}

impl Default for TenantContext {
    /// 空上下文（仅用于测试或占位）。
    fn default() -> Self {
        Self {
            tenant_id: "".to_string(),
            actor: "".to_string(),
        }
    }
}
