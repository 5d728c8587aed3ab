//! 告警判定。

use domain::{AlarmConfig, DataValue};

/// 单条数据记录的告警结果。
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AlarmVerdict {
    pub is_alarm: bool,
    pub level: Option<String>,
    pub message: Option<String>,
}

/// 判定一条新值是否告警。
///
/// 传输层已给出告警标记时以其为准；否则按数据点的告警规则判定，
/// 非数值类型不触发规则告警。
pub fn evaluate(
    config: Option<&AlarmConfig>,
    value: &DataValue,
    supplied: Option<bool>,
    supplied_level: Option<&str>,
) -> AlarmVerdict {
    let config = config.filter(|config| config.enabled);
    if let Some(is_alarm) = supplied {
        if !is_alarm {
            return AlarmVerdict::default();
        }
        return AlarmVerdict {
            is_alarm,
            level: supplied_level
                .map(str::to_string)
                .or_else(|| config.map(|config| config.level.clone())),
            message: config.and_then(|config| config.message.clone()),
        };
    }
    let Some(config) = config else {
        return AlarmVerdict::default();
    };
    match value.as_f64() {
        Some(number) if config.rule.is_triggered(number) => AlarmVerdict {
            is_alarm: true,
            level: Some(config.level.clone()),
            message: config.message.clone(),
        },
        _ => AlarmVerdict::default(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use domain::AlarmRule;

    fn config(rule: AlarmRule) -> AlarmConfig {
        AlarmConfig {
            enabled: true,
            rule,
            level: "warning".to_string(),
            message: Some("out of range".to_string()),
        }
    }

    #[test]
    fn rule_triggers_on_numeric_values() {
        let config = config(AlarmRule::Above { threshold: 80.0 });
        let verdict = evaluate(Some(&config), &DataValue::Numeric(81.0), None, None);
        assert!(verdict.is_alarm);
        assert_eq!(verdict.level.as_deref(), Some("warning"));
        assert_eq!(verdict.message.as_deref(), Some("out of range"));

        let verdict = evaluate(Some(&config), &DataValue::Numeric(80.0), None, None);
        assert!(!verdict.is_alarm);
    }

    #[test]
    fn non_numeric_and_disabled_never_alarm() {
        let mut config = config(AlarmRule::Below { threshold: 1.0 });
        let verdict = evaluate(Some(&config), &DataValue::Text("0".to_string()), None, None);
        assert!(!verdict.is_alarm);

        config.enabled = false;
        let verdict = evaluate(Some(&config), &DataValue::Numeric(0.0), None, None);
        assert!(!verdict.is_alarm);
        assert_eq!(evaluate(None, &DataValue::Numeric(0.0), None, None), AlarmVerdict::default());
    }

    #[test]
    fn supplied_flag_wins() {
        let config = config(AlarmRule::Outside { low: 0.0, high: 10.0 });
        let verdict = evaluate(Some(&config), &DataValue::Numeric(50.0), Some(false), None);
        assert!(!verdict.is_alarm);

        let verdict = evaluate(None, &DataValue::Numeric(5.0), Some(true), Some("critical"));
        assert!(verdict.is_alarm);
        assert_eq!(verdict.level.as_deref(), Some("critical"));

        let verdict = evaluate(Some(&config), &DataValue::Numeric(5.0), Some(true), None);
        assert_eq!(verdict.level.as_deref(), Some("warning"));
    }
}
