use domain::{AlarmConfig, AlarmRule, DataType, DataValue, DeviceStatus, TenantContext};

#[test]
fn tenant_context_builds() {
    let ctx = TenantContext::new("tenant-1", "user-1");
    assert_eq!(ctx.tenant_id, "tenant-1");
    assert_eq!(ctx.actor, "user-1");

    let system = TenantContext::system("tenant-2");
    assert_eq!(system.tenant_id, "tenant-2");
    assert_eq!(system.actor, "system");
}

#[test]
fn numeric_values_parse_and_reject_garbage() {
    assert_eq!(
        DataValue::parse(DataType::Numeric, " 12.5 ").expect("numeric"),
        DataValue::Numeric(12.5)
    );
    assert!(DataValue::parse(DataType::Numeric, "abc").is_err());
    assert!(DataValue::parse(DataType::Numeric, "NaN").is_err());
}

#[test]
fn boolean_and_json_values_parse() {
    assert_eq!(
        DataValue::parse(DataType::Boolean, "ON").expect("bool"),
        DataValue::Boolean(true)
    );
    assert!(DataValue::parse(DataType::Boolean, "maybe").is_err());

    let value = DataValue::parse(DataType::Json, r#"{"a":1}"#).expect("json");
    assert_eq!(value.data_type(), DataType::Json);
    assert_eq!(value.to_raw(), r#"{"a":1}"#);
    assert!(DataValue::parse(DataType::Enum, "  ").is_err());
}

#[test]
fn data_type_and_status_names_round_trip() {
    for data_type in [
        DataType::Numeric,
        DataType::Boolean,
        DataType::Text,
        DataType::Enum,
        DataType::Json,
    ] {
        assert_eq!(DataType::parse(data_type.as_str()), Some(data_type));
    }
    assert_eq!(DeviceStatus::parse("online"), Some(DeviceStatus::Online));
    assert_eq!(DeviceStatus::default(), DeviceStatus::Offline);
}

#[test]
fn alarm_rules_trigger_on_bounds() {
    assert!(AlarmRule::Above { threshold: 10.0 }.is_triggered(10.5));
    assert!(!AlarmRule::Below { threshold: 0.0 }.is_triggered(0.0));
    let outside = AlarmRule::Outside {
        low: 1.0,
        high: 5.0,
    };
    assert!(outside.is_triggered(0.5));
    assert!(!outside.is_triggered(3.0));

    let config: AlarmConfig = serde_json::from_str(
        r#"{"enabled":true,"rule":{"type":"above","threshold":80.0},"level":"critical"}"#,
    )
    .expect("alarm config");
    assert_eq!(config.rule, AlarmRule::Above { threshold: 80.0 });
    assert!(config.message.is_none());
}
