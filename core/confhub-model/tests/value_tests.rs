use confhub_model::{SettingValue, ValueType};
use proptest::prelude::*;
use serde_json::json;
use std::time::Duration;

// ── ValueType parsing ────────────────────────────────────────────

#[test]
fn parse_bool_is_case_insensitive() {
    assert_eq!(
        ValueType::Bool.parse_str("Flag", "TRUE").unwrap(),
        SettingValue::Bool(true)
    );
    assert!(ValueType::Bool.parse_str("Flag", "yes").is_err());
}

#[test]
fn parse_int_rejects_out_of_range() {
    let err = ValueType::Int.parse_str("Port", "4294967296").unwrap_err();
    assert_eq!(err.target, "Port");
    assert_eq!(err.expected, ValueType::Int);
}

#[test]
fn parse_duration_clock_form() {
    assert_eq!(
        ValueType::Duration.parse_str("Timeout", "00:02:00").unwrap(),
        SettingValue::Duration(Duration::from_secs(120))
    );
}

#[test]
fn parse_string_list_splits_and_trims() {
    assert_eq!(
        ValueType::StringList.parse_str("Hosts", " a, b ,,c").unwrap(),
        SettingValue::StringList(vec!["a".into(), "b".into(), "c".into()])
    );
}

#[test]
fn data_grid_cannot_be_parsed_from_text() {
    assert!(ValueType::DataGrid.parse_str("Grid", "[]").is_err());
    assert_eq!(ValueType::DataGrid.default_value(), None);
    assert!(!ValueType::DataGrid.is_scalar());
}

// ── JSON conversion ──────────────────────────────────────────────

#[test]
fn from_json_duration_is_milliseconds() {
    let value = ValueType::Duration
        .from_json("RequestTimeout", &json!(120000))
        .unwrap();
    assert_eq!(value.as_duration(), Some(Duration::from_secs(120)));
    assert_eq!(value.to_json(), json!(120000));
}

#[test]
fn from_json_rejects_negative_duration() {
    assert!(ValueType::Duration.from_json("T", &json!(-5)).is_err());
}

#[test]
fn from_json_date_time_accepts_rfc3339_and_millis() {
    let a = ValueType::DateTime
        .from_json("At", &json!("2024-05-01T00:00:00Z"))
        .unwrap();
    let b = ValueType::DateTime
        .from_json("At", &json!(1_714_521_600_000i64))
        .unwrap();
    assert_eq!(a, b);
}

#[test]
fn from_json_string_accepts_numbers() {
    assert_eq!(
        ValueType::String.from_json("Name", &json!(42)).unwrap(),
        SettingValue::String("42".into())
    );
}

// ── conform_to ───────────────────────────────────────────────────

#[test]
fn conform_int_to_long_and_double() {
    assert_eq!(
        SettingValue::Int(7).conform_to("X", ValueType::Long).unwrap(),
        SettingValue::Long(7)
    );
    assert_eq!(
        SettingValue::Int(7).conform_to("X", ValueType::Double).unwrap(),
        SettingValue::Double(7.0)
    );
}

#[test]
fn conform_bool_to_string_fails() {
    let err = SettingValue::Bool(true)
        .conform_to("Name", ValueType::String)
        .unwrap_err();
    assert!(err.to_string().contains("cannot assign"));
}

#[test]
fn display_duration_uses_clock_form() {
    assert_eq!(
        SettingValue::Duration(Duration::from_secs(120)).to_string(),
        "00:02:00"
    );
}

proptest! {
    #[test]
    fn duration_json_round_trips(ms in 0u64..10_000_000_000) {
        let value = SettingValue::Duration(Duration::from_millis(ms));
        let back = ValueType::Duration.from_json("D", &value.to_json()).unwrap();
        prop_assert_eq!(back, value);
    }
}
