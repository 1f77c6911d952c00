use confhub_model::{
    ColumnDefinition, DataGrid, Setting, SettingValue, SettingsCollection, ValueType,
};
use confhub_script::ScriptRunner;
use proptest::prelude::*;
use std::time::Duration;

fn grid_collection(names: &[String]) -> SettingsCollection {
    let mut grid = DataGrid::new(vec![
        ColumnDefinition::string("Name"),
        ColumnDefinition::new("Port", ValueType::Int),
        ColumnDefinition::new("Enabled", ValueType::Bool),
    ])
    .unwrap();
    for name in names {
        grid.push_row([("Name", SettingValue::from(name.as_str()))])
            .unwrap();
    }
    let mut c = SettingsCollection::new("props");
    c.add_setting(Setting::data_grid("Services", grid)).unwrap();
    c.add_setting(Setting::new("Timeout", Duration::ZERO)).unwrap();
    c
}

proptest! {
    #[test]
    fn blank_scripts_change_nothing(script in "[ \t\r\n]{0,16}") {
        let mut c = grid_collection(&["a".to_string()]);
        let before = c.clone();
        let outcome = ScriptRunner::new().run(&script, &mut c);
        prop_assert!(outcome.is_skipped());
        prop_assert_eq!(c, before);
    }

    #[test]
    fn duration_millis_round_trip(ms in 0u64..10_000_000) {
        let mut c = grid_collection(&[]);
        let runner = ScriptRunner::new();
        let script = format!("Timeout.Value = {ms}; if Timeout.Value != {ms} {{ throw \"drift\"; }}");
        prop_assert!(runner.run(&script, &mut c).is_committed());
        prop_assert_eq!(
            c.get_setting("Timeout").unwrap().value(),
            Some(&SettingValue::Duration(Duration::from_millis(ms)))
        );
    }

    #[test]
    fn grid_rows_keep_their_columns(
        names in prop::collection::vec("[a-z]{0,6}", 0..5),
        ports in prop::collection::vec(0i64..65_536, 0..8),
    ) {
        let mut c = grid_collection(&names);
        let rows: Vec<String> = ports
            .iter()
            .map(|p| format!("#{{ Port: {p}, Enabled: {} }}", p % 2 == 0))
            .collect();
        let script = format!(
            "Services.Value = [{}]; let r = Services.IsReadOnly; Services.IsReadOnly = r;",
            rows.join(", ")
        );
        let outcome = ScriptRunner::new().run(&script, &mut c);
        prop_assert!(outcome.is_committed(), "{:?}", outcome);

        let grid = c.get_setting("Services").unwrap().grid().unwrap();
        prop_assert_eq!(grid.row_count(), ports.len());
        for row in grid.rows() {
            prop_assert_eq!(row.len(), grid.columns().len());
        }
    }

    #[test]
    fn read_only_script_is_idempotent(names in prop::collection::vec("[a-z]{0,6}", 0..5)) {
        let script = r#"
            let rows = Services.Value;
            let empty = 0;
            for row in rows { if row.Name == "" { empty += 1; } }
            Services.IsValid = empty == 0;
            Services.ValidationExplanation = if empty == 0 { () } else { `${empty} empty name(s)` };
        "#;
        let runner = ScriptRunner::new();
        let mut c = grid_collection(&names);
        prop_assert!(runner.run(script, &mut c).is_committed());
        let first = c.clone();
        prop_assert!(runner.run(script, &mut c).is_committed());
        prop_assert_eq!(c, first);
    }
}
