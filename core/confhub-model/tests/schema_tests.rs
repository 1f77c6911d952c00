use confhub_model::{ModelError, SettingValue, SettingsSchema, ValueType};
use confhub_types::ClientId;
use pretty_assertions::assert_eq;
use std::time::Duration;

const SCHEMA: &str = r#"{
  "name": "billing-service",
  "script": "Port.IsValid = true;",
  "settings": [
    { "name": "RequireHttps", "type": "bool", "value": true },
    { "name": "Port", "type": "int", "value": 80, "category_name": "Network" },
    { "name": "RequestTimeout", "type": "duration", "value": "00:02:00" },
    { "name": "Region", "type": "enum", "value": "eu", "valid_values": ["eu", "us"] },
    { "name": "Notes", "type": "string" },
    { "name": "Services", "type": "data_grid",
      "columns": [
        { "name": "Name", "type": "string", "is_required": true },
        { "name": "Group", "type": "string" }
      ],
      "rows": [ { "Name": "api", "Group": "Production" }, { "Group": null } ] }
  ]
}"#;

#[test]
fn schema_builds_collection() {
    let collection = SettingsSchema::from_json(SCHEMA)
        .unwrap()
        .into_collection()
        .unwrap();
    assert_eq!(collection.name(), "billing-service");
    assert_eq!(collection.script(), Some("Port.IsValid = true;"));
    assert_eq!(collection.settings().len(), 6);

    let timeout = collection.get_setting("RequestTimeout").unwrap();
    assert_eq!(
        timeout.value(),
        Some(&SettingValue::Duration(Duration::from_secs(120)))
    );

    let port = collection.get_setting("Port").unwrap();
    assert_eq!(port.category_name.as_deref(), Some("Network"));

    let region = collection.get_setting("Region").unwrap();
    assert_eq!(region.valid_values().unwrap().len(), 2);

    let notes = collection.get_setting("Notes").unwrap();
    assert_eq!(notes.value(), Some(&SettingValue::String(String::new())));

    let grid = collection.get_setting("Services").unwrap().grid().unwrap();
    assert_eq!(grid.row_count(), 2);
    assert_eq!(grid.cell(0, "Group").unwrap().value(), &SettingValue::from("Production"));
    assert_eq!(grid.cell(1, "Name").unwrap().value(), &SettingValue::from(""));
}

#[test]
fn schema_rejects_grid_without_columns() {
    let json = r#"{ "name": "x", "settings": [ { "name": "G", "type": "data_grid" } ] }"#;
    let err = SettingsSchema::from_json(json)
        .unwrap()
        .into_collection()
        .unwrap_err();
    assert!(matches!(err, ModelError::InvalidSchema(_)));
}

#[test]
fn schema_rejects_value_of_wrong_type() {
    let json = r#"{ "name": "x", "settings": [ { "name": "P", "type": "int", "value": [1] } ] }"#;
    let err = SettingsSchema::from_json(json)
        .unwrap()
        .into_collection()
        .unwrap_err();
    assert!(matches!(err, ModelError::Coercion(e) if e.expected == ValueType::Int));
}

#[test]
fn schema_rejects_malformed_json() {
    assert!(matches!(
        SettingsSchema::from_json("{"),
        Err(ModelError::Serialization(_))
    ));
}

#[test]
fn schema_without_client_id_gets_stable_name_derived_id() {
    let load = || {
        SettingsSchema::from_json(SCHEMA)
            .unwrap()
            .into_collection()
            .unwrap()
    };
    let first = load();
    assert_eq!(first.client_id(), load().client_id());
    assert_eq!(first.client_id(), ClientId::for_name("billing-service"));
    assert!(first.client_id().is_name_derived());
}

#[test]
fn schema_client_id_is_used_as_given() {
    let json = r#"{ "name": "billing-service", "client_id": "0192f0c1-7a4e-7c3b-9d1e-5f2a6b8c4d10" }"#;
    let collection = SettingsSchema::from_json(json)
        .unwrap()
        .into_collection()
        .unwrap();
    assert_eq!(
        collection.client_id().to_string(),
        "0192f0c1-7a4e-7c3b-9d1e-5f2a6b8c4d10"
    );
    assert!(!collection.client_id().is_name_derived());
}
