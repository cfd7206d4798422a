use super::DispatchConfigError;

#[test]
fn default_config_validates() {
    let config = DispatchConfig::default();
    config.validate().expect("defaults must be valid");
    assert_eq!(config.max_line_bytes, 4096);
    assert_eq!(config.max_establishing_buffer_bytes, 64 * 1024);
}

#[test]
fn zero_line_limit_is_rejected() {
    let config = DispatchConfig {
        max_line_bytes: 0,
        ..DispatchConfig::default()
    };
    assert_eq!(
        config.validate(),
        Err(DispatchConfigError::ZeroValue("max_line_bytes"))
    );
}

#[test]
fn zero_establishing_buffer_is_rejected() {
    let config = DispatchConfig {
        max_establishing_buffer_bytes: 0,
        ..DispatchConfig::default()
    };
    assert_eq!(
        config.validate(),
        Err(DispatchConfigError::ZeroValue(
            "max_establishing_buffer_bytes"
        ))
    );
}

#[test]
fn config_schema_rejects_unknown_fields() {
    let result = serde_json::from_str::<DispatchConfig>(
        r#"{"max_line_bytes": 1024, "unexpected_field": true}"#,
    );
    assert!(result.is_err());
}

#[test]
fn config_schema_fills_missing_fields_with_defaults() {
    let config =
        serde_json::from_str::<DispatchConfig>(r#"{"max_line_bytes": 1024}"#).expect("must parse");
    assert_eq!(config.max_line_bytes, 1024);
    assert_eq!(
        config.max_establishing_buffer_bytes,
        DispatchConfig::default().max_establishing_buffer_bytes
    );
}
