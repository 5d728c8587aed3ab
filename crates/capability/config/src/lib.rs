//! 应用运行配置加载。

use std::env;

/// 配置加载错误。
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("missing required env: {0}")]
    Missing(String),
    #[error("invalid value for {0}: {1}")]
    Invalid(String, String),
}

/// 应用运行配置。
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub http_addr: String,
    pub database_url: String,
    pub database_max_connections: u32,
    /// 关闭时每轮运行直接返回全零结果
    pub collection_enabled: bool,
    pub collection_page_size: u32,
    pub collection_max_parallelism: usize,
    /// 单次取数超时（秒）
    pub collection_timeout_seconds: u64,
    /// 定时触发间隔（秒）
    pub collection_interval_seconds: u64,
    /// 为空表示采集全部租户
    pub collection_tenant_id: Option<String>,
}

impl AppConfig {
    /// 从环境变量读取配置。
    pub fn from_env() -> Result<Self, ConfigError> {
        let database_url = env::var("IOT_DATABASE_URL")
            .map_err(|_| ConfigError::Missing("IOT_DATABASE_URL".to_string()))?;
        let http_addr = env::var("IOT_HTTP_ADDR").unwrap_or_else(|_| "127.0.0.1:8080".to_string());
        let database_max_connections =
            read_positive_with_default("IOT_DATABASE_MAX_CONNECTIONS", 8)?;
        let collection_enabled = read_bool_with_default("IOT_COLLECTION_ENABLED", true);
        let collection_page_size = read_positive_with_default("IOT_COLLECTION_PAGE_SIZE", 100)?;
        let collection_max_parallelism =
            read_positive_with_default("IOT_COLLECTION_MAX_PARALLELISM", 4)?;
        let collection_timeout_seconds =
            read_positive_with_default("IOT_COLLECTION_TIMEOUT_SECONDS", 30)?;
        let collection_interval_seconds =
            read_positive_with_default("IOT_COLLECTION_INTERVAL_SECONDS", 60)?;
        let collection_tenant_id = read_optional("IOT_COLLECTION_TENANT_ID");

        Ok(Self {
            http_addr,
            database_url,
            database_max_connections,
            collection_enabled,
            collection_page_size,
            collection_max_parallelism,
            collection_timeout_seconds,
            collection_interval_seconds,
            collection_tenant_id,
        })
    }
}

/// 读取正整数环境变量；未设置时取默认值，0 或无法解析视为非法。
fn read_positive_with_default<T>(key: &str, default: T) -> Result<T, ConfigError>
where
    T: std::str::FromStr + PartialOrd + From<u8>,
{
    let value = match env::var(key) {
        Ok(value) => value,
        Err(_) => return Ok(default),
    };
    match value.trim().parse::<T>() {
        Ok(parsed) if parsed > T::from(0) => Ok(parsed),
        _ => Err(ConfigError::Invalid(key.to_string(), value)),
    }
}

fn read_optional(key: &str) -> Option<String> {
    match env::var(key) {
        Ok(value) if !value.trim().is_empty() => Some(value.trim().to_string()),
        _ => None,
    }
}

fn read_bool_with_default(key: &str, default: bool) -> bool {
    match env::var(key) {
        Ok(value) => matches!(value.to_ascii_lowercase().as_str(), "1" | "true" | "on"),
        Err(_) => default,
    }
}
