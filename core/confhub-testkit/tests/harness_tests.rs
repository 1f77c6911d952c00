use confhub_model::{ColumnDefinition, SettingValue, SettingsSchema, ValueType};
use confhub_script::{ScriptError, ScriptOutcome, SkipReason};
use confhub_testkit::{HarnessError, TestClientBuilder, TestRow, run_script};
use pretty_assertions::assert_eq;
use std::time::Duration;

fn web_client() -> TestClientBuilder {
    TestClientBuilder::new("web")
        .add_boolean_setting("RequireHttps", false)
        .add_string_setting("BaseUrl", "http://insecure.example.com")
        .add_int_setting("Port", 80)
}

#[test]
fn https_rule_with_overridden_flag() {
    let mut client = web_client()
        .with_setting("RequireHttps", true)
        .build()
        .unwrap();

    run_script(
        r#"
        if RequireHttps.Value && !BaseUrl.Value.starts_with("https://") {
            BaseUrl.IsValid = false;
            BaseUrl.ValidationExplanation = "HTTPS is required when RequireHttps is enabled";
        }
        "#,
        &mut client,
    );

    let base_url = client.get_setting("BaseUrl").unwrap();
    assert!(!base_url.is_valid);
    assert_eq!(
        base_url.validation_explanation.as_deref(),
        Some("HTTPS is required when RequireHttps is enabled")
    );
}

#[test]
fn grid_rows_from_literal_cells() {
    let mut client = TestClientBuilder::new("services")
        .add_data_grid_setting(
            "Services",
            [
                TestRow::new().cell("Name", "").cell("Group", "Production"),
                TestRow::new().cell("Name", "billing").cell("Group", ""),
            ],
        )
        .build()
        .unwrap();

    let outcome = client.execute_script(
        r#"
        let missing = false;
        for row in Services.Value {
            if row.Name == "" || row.Group == "" { missing = true; }
        }
        if missing {
            Services.IsValid = false;
            Services.ValidationExplanation = "Required fields are missing";
        }
        "#,
    );
    assert!(outcome.is_committed(), "{outcome:?}");

    let services = client.get_setting("Services").unwrap();
    assert!(!services.is_valid);
    assert_eq!(
        services.validation_explanation.as_deref(),
        Some("Required fields are missing")
    );
    assert_eq!(services.grid().unwrap().columns().len(), 2);
}

#[test]
fn duration_override_feeds_conversion_script() {
    let mut client = TestClientBuilder::new("timeouts")
        .add_duration_setting("RequestTimeout", Duration::from_secs(30))
        .add_int_setting("TimeoutSeconds", 0)
        .with_setting("RequestTimeout", Duration::from_secs(120))
        .build()
        .unwrap();

    run_script(
        "if RequestTimeout.Value > 60000 { TimeoutSeconds.Value = RequestTimeout.Value / 1000; }",
        &mut client,
    );
    assert_eq!(client.value("TimeoutSeconds"), Some(&SettingValue::Int(120)));
}

#[test]
fn override_with_wrong_type_is_rejected() {
    let err = web_client()
        .with_setting("RequireHttps", "yes")
        .build()
        .err()
        .unwrap();
    match err {
        HarnessError::OverrideType {
            name,
            declared,
            given,
        } => {
            assert_eq!(name, "RequireHttps");
            assert_eq!(declared, ValueType::Bool);
            assert_eq!(given, ValueType::String);
        }
        other => panic!("unexpected error: {other}"),
    }
}

#[test]
fn override_of_unknown_setting_is_rejected() {
    let err = web_client().with_setting("Nope", 1).build().err().unwrap();
    assert!(matches!(err, HarnessError::SettingNotFound(name) if name == "Nope"));
}

#[test]
fn duplicate_setting_is_rejected() {
    let err = web_client()
        .add_int_setting("Port", 443)
        .build()
        .err()
        .unwrap();
    assert!(matches!(err, HarnessError::Model(_)));
}

#[test]
fn drop_down_accepts_string_override() {
    let client = TestClientBuilder::new("env")
        .add_drop_down_setting(
            "Environment",
            "Production",
            vec!["Production".into(), "Staging".into()],
        )
        .with_setting("Environment", "Staging")
        .build()
        .unwrap();
    assert_eq!(
        client.value("Environment"),
        Some(&SettingValue::Enum("Staging".into()))
    );
}

#[test]
fn inferred_columns_must_agree() {
    let err = TestClientBuilder::new("grid")
        .add_data_grid_setting(
            "Services",
            [
                TestRow::new().cell("Port", 80),
                TestRow::new().cell("Port", "eighty"),
            ],
        )
        .build()
        .err()
        .unwrap();
    assert!(matches!(err, HarnessError::ConflictingColumn { .. }));
}

#[test]
fn grid_without_rows_needs_columns() {
    let err = TestClientBuilder::new("grid")
        .add_data_grid_setting("Services", Vec::<TestRow>::new())
        .build()
        .err()
        .unwrap();
    assert!(matches!(err, HarnessError::EmptyGrid(_)));

    let client = TestClientBuilder::new("grid")
        .add_data_grid_setting_with_columns(
            "Services",
            vec![ColumnDefinition::string("Name").required()],
            Vec::<TestRow>::new(),
        )
        .build()
        .unwrap();
    assert_eq!(client.get_setting("Services").unwrap().grid().unwrap().row_count(), 0);
}

#[test]
fn rows_collect_from_pairs() {
    let row: TestRow = [("Name", "api"), ("Group", "Production")].into_iter().collect();
    let client = TestClientBuilder::new("grid")
        .add_data_grid_setting("Services", [row])
        .build()
        .unwrap();
    let grid = client.get_setting("Services").unwrap().grid().unwrap();
    assert_eq!(
        grid.cell(0, "Group").unwrap().value(),
        &SettingValue::String("Production".into())
    );
}

#[test]
fn schema_json_builds_client_with_script() {
    let json = r#"{
        "name": "billing",
        "script": "if Port.Value != 443 { Port.IsValid = false; }",
        "settings": [
            { "name": "Port", "type": "int", "value": 80 }
        ]
    }"#;
    let mut client = TestClientBuilder::from_schema_json(json).unwrap().build().unwrap();
    let outcome = client.execute_collection_script();
    assert!(outcome.is_committed());
    assert!(!client.get_setting("Port").unwrap().is_valid);
}

#[test]
fn fluent_calls_extend_schema() {
    let schema = SettingsSchema::from_json(
        r#"{ "name": "billing", "settings": [ { "name": "Port", "type": "int", "value": 80 } ] }"#,
    )
    .unwrap();
    let client = TestClientBuilder::from_schema(schema)
        .add_boolean_setting("RequireHttps", true)
        .with_setting("Port", 443)
        .build()
        .unwrap();
    assert_eq!(client.value("Port"), Some(&SettingValue::Int(443)));
    assert_eq!(client.value("RequireHttps"), Some(&SettingValue::Bool(true)));
}

#[test]
fn failed_script_leaves_state_and_reports_error() {
    let mut client = web_client().build().unwrap();
    let outcome = client.execute_script("Port.Value = 443; Port.Value = \"https\";");
    assert!(matches!(
        outcome,
        ScriptOutcome::Failed(ScriptError::Coercion { .. })
    ));
    assert_eq!(client.value("Port"), Some(&SettingValue::Int(80)));
}

#[test]
fn blank_script_is_a_no_op() {
    let mut client = web_client().build().unwrap();
    let outcome = run_script("  ", &mut client);
    assert!(matches!(outcome, ScriptOutcome::Skipped(SkipReason::BlankScript)));
}

#[test]
fn simulated_edit_then_rerun() {
    let script = r#"
        Port.IsValid = !(RequireHttps.Value && Port.Value != 443);
        Port.ValidationExplanation = if Port.IsValid { () } else { `HTTPS requires port 443, not ${Port.Value}` };
    "#;
    let mut client = web_client().build().unwrap();
    run_script(script, &mut client);
    assert!(client.get_setting("Port").unwrap().is_valid);

    client.set_value("RequireHttps", true).unwrap();
    run_script(script, &mut client);
    let port = client.get_setting("Port").unwrap();
    assert!(!port.is_valid);
    assert_eq!(
        port.validation_explanation.as_deref(),
        Some("HTTPS requires port 443, not 80")
    );
}

#[test]
fn harness_uses_production_guard() {
    let mut client = web_client().build().unwrap();
    for _ in 0..3 {
        client.execute_script("Port.Value = 80;");
    }
    let owner = client.collection().client_id();
    assert_eq!(client.runner().guard().history_len(owner), 3);
}
