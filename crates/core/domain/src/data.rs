use serde::{Deserialize, Serialize};

/// 数据点的数据类型。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DataType {
    Numeric,
    Boolean,
    Text,
    Enum,
    Json,
}

impl DataType {
    pub fn as_str(self) -> &'static str {
        match self {
            DataType::Numeric => "numeric",
            DataType::Boolean => "boolean",
            DataType::Text => "text",
            DataType::Enum => "enum",
            DataType::Json => "json",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "numeric" | "number" | "float" => Some(DataType::Numeric),
            "boolean" | "bool" => Some(DataType::Boolean),
            "text" | "string" => Some(DataType::Text),
            "enum" => Some(DataType::Enum),
            "json" => Some(DataType::Json),
            _ => None,
        }
    }
}

/// 原始值解析错误。
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
#[error("cannot parse {raw:?} as {data_type}")]
pub struct ValueParseError {
    pub data_type: &'static str,
    pub raw: String,
}

/// 按数据点类型解析后的观测值。
#[derive(Debug, Clone, PartialEq)]
pub enum DataValue {
    Numeric(f64),
    Boolean(bool),
    Text(String),
    Enum(String),
    Json(serde_json::Value),
}

impl DataValue {
    /// 按数据类型解析传输层返回的原始字符串。
    pub fn parse(data_type: DataType, raw: &str) -> Result<Self, ValueParseError> {
        let invalid = || ValueParseError {
            data_type: data_type.as_str(),
            raw: raw.to_string(),
        };
        match data_type {
            DataType::Numeric => {
                let value = raw.trim().parse::<f64>().map_err(|_| invalid())?;
                if !value.is_finite() {
                    return Err(invalid());
                }
                Ok(DataValue::Numeric(value))
            }
            DataType::Boolean => match raw.trim().to_ascii_lowercase().as_str() {
                "true" | "1" | "on" => Ok(DataValue::Boolean(true)),
                "false" | "0" | "off" => Ok(DataValue::Boolean(false)),
                _ => Err(invalid()),
            },
            DataType::Text => Ok(DataValue::Text(raw.to_string())),
            DataType::Enum => {
                let value = raw.trim();
                if value.is_empty() {
                    return Err(invalid());
                }
                Ok(DataValue::Enum(value.to_string()))
            }
            DataType::Json => serde_json::from_str(raw)
                .map(DataValue::Json)
                .map_err(|_| invalid()),
        }
    }

    pub fn data_type(&self) -> DataType {
        match self {
            DataValue::Numeric(_) => DataType::Numeric,
            DataValue::Boolean(_) => DataType::Boolean,
            DataValue::Text(_) => DataType::Text,
            DataValue::Enum(_) => DataType::Enum,
            DataValue::Json(_) => DataType::Json,
        }
    }

    /// 数值视图（仅数值类型可参与告警判定）。
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            DataValue::Numeric(v) => Some(*v),
            _ => None,
        }
    }

    /// 存储使用的文本形式。
    pub fn to_raw(&self) -> String {
        match self {
            DataValue::Numeric(v) => v.to_string(),
            DataValue::Boolean(v) => v.to_string(),
            DataValue::Text(v) | DataValue::Enum(v) => v.clone(),
            DataValue::Json(v) => v.to_string(),
        }
    }
}

/// 设备/网关在线状态（由采集结果推导）。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DeviceStatus {
    Online,
    #[default]
    Offline,
}

impl DeviceStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            DeviceStatus::Online => "online",
            DeviceStatus::Offline => "offline",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "online" => Some(DeviceStatus::Online),
            "offline" => Some(DeviceStatus::Offline),
            _ => None,
        }
    }
}
