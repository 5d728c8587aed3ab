//! 数据点告警配置。

use serde::{Deserialize, Serialize};

/// 告警判定规则。
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum AlarmRule {
    /// 高于阈值告警
    Above { threshold: f64 },
    /// 低于阈值告警
    Below { threshold: f64 },
    /// 超出 [low, high] 区间告警
    Outside { low: f64, high: f64 },
}

impl AlarmRule {
    pub fn is_triggered(&self, value: f64) -> bool {
        match *self {
            AlarmRule::Above { threshold } => value > threshold,
            AlarmRule::Below { threshold } => value < threshold,
            AlarmRule::Outside { low, high } => value < low || value > high,
        }
    }
}

/// 数据点告警配置（以 JSON 形式随数据点持久化）。
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AlarmConfig {
    pub enabled: bool,
    pub rule: AlarmRule,
    /// 告警级别：info | warning | error | critical
    pub level: String,
    #[serde(default)]
    pub message: Option<String>,
}
