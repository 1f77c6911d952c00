use confhub_model::{
    ColumnDefinition, DataGrid, ModelError, ScriptTarget, ScriptableSetting, Setting,
    SettingValue, SettingsCollection, ValueType,
};
use pretty_assertions::assert_eq;
use std::time::Duration;

// ── Setting ──────────────────────────────────────────────────────

#[test]
fn new_setting_defaults_to_valid_and_enabled() {
    let s = Setting::new("BaseUrl", "https://example.com");
    assert!(s.is_valid);
    assert!(s.enabled_by_parent);
    assert_eq!(s.value_type(), ValueType::String);
    assert_eq!(s.validation_explanation, None);
}

#[test]
fn hidden_combines_advanced_and_parent_flag() {
    let mut s = Setting::new("Tuning", 3).advanced();
    assert!(s.is_hidden(false));
    assert!(!s.is_hidden(true));
    s.enabled_by_parent = false;
    assert!(s.is_hidden(true));
}

#[test]
fn set_value_widens_losslessly() {
    let mut s = Setting::new("MaxBytes", 10i64);
    s.set_value(SettingValue::Int(20)).unwrap();
    assert_eq!(s.value(), Some(&SettingValue::Long(20)));
}

#[test]
fn set_value_rejects_wrong_type() {
    let mut s = Setting::new("Timeout", Duration::from_secs(1));
    let err = s.set_value(SettingValue::from("soon")).unwrap_err();
    assert!(matches!(err, ModelError::Coercion(_)));
}

#[test]
fn drop_down_requires_valid_value() {
    let mut s = Setting::drop_down(
        "Region",
        SettingValue::Enum("eu".into()),
        vec!["eu".into(), "us".into()],
    );
    s.set_value(SettingValue::from("us")).unwrap();
    assert_eq!(s.value(), Some(&SettingValue::Enum("us".into())));
    assert!(s.set_value(SettingValue::from("apac")).is_err());
}

#[test]
fn grid_setting_rejects_scalar_value() {
    let grid = DataGrid::new(vec![ColumnDefinition::string("Name")]).unwrap();
    let mut s = Setting::data_grid("Services", grid);
    assert!(s.is_data_grid());
    assert!(matches!(
        s.set_value(SettingValue::from("x")),
        Err(ModelError::TypeMismatch { .. })
    ));
}

// ── ScriptableSetting ────────────────────────────────────────────

#[test]
fn apply_staged_copies_script_fields_only() {
    let mut live = Setting::new("Port", 80).with_script("Port.IsValid = true;");
    let mut staged = live.to_staged();
    staged.is_valid = false;
    staged.validation_explanation = Some("HTTPS requires port 443, not 80".into());
    staged.script = None;
    staged.set_value(SettingValue::Int(443)).unwrap();

    assert!(live.apply_staged(&staged).unwrap());
    assert!(!live.is_valid);
    assert_eq!(live.value(), Some(&SettingValue::Int(443)));
    assert_eq!(live.script.as_deref(), Some("Port.IsValid = true;"));
}

#[test]
fn apply_staged_unchanged_reports_false() {
    let mut live = Setting::new("Port", 80);
    let staged = live.to_staged();
    assert!(!live.apply_staged(&staged).unwrap());
}

#[test]
fn apply_staged_rejects_type_change() {
    let mut live = Setting::new("Port", 80);
    let staged = Setting::new("Port", "80");
    assert!(matches!(
        live.apply_staged(&staged),
        Err(ModelError::TypeMismatch { .. })
    ));
}

#[test]
fn apply_staged_rejects_column_change() {
    let a = DataGrid::new(vec![ColumnDefinition::string("Name")]).unwrap();
    let b = DataGrid::new(vec![ColumnDefinition::string("Other")]).unwrap();
    let mut live = Setting::data_grid("Services", a);
    let staged = Setting::data_grid("Services", b);
    assert!(matches!(
        live.apply_staged(&staged),
        Err(ModelError::ShapeMismatch(_))
    ));
}

// ── SettingsCollection ───────────────────────────────────────────

#[test]
fn collection_rejects_duplicate_names() {
    let mut c = SettingsCollection::new("billing");
    c.add_setting(Setting::new("Port", 80)).unwrap();
    let err = c.add_setting(Setting::new("Port", 81)).unwrap_err();
    assert!(matches!(err, ModelError::DuplicateSetting(n) if n == "Port"));
}

#[test]
fn collection_visible_settings_respects_show_advanced() {
    let mut c = SettingsCollection::new("billing");
    c.add_setting(Setting::new("Port", 80)).unwrap();
    c.add_setting(Setting::new("Tuning", 1).advanced()).unwrap();
    assert_eq!(c.visible_settings().count(), 1);
    c.set_show_advanced(true);
    assert_eq!(c.visible_settings().count(), 2);
}

#[test]
fn collection_exposes_script_target() {
    let mut c = SettingsCollection::new("billing");
    c.add_setting(Setting::new("Port", 80)).unwrap();
    let target: &mut dyn ScriptTarget = &mut c;
    assert_eq!(target.display_name(), "billing");
    target.settings_mut()[0].is_valid = false;
    assert!(!c.require_setting("Port").unwrap().is_valid);
    assert!(c.require_setting("Missing").is_err());
}
