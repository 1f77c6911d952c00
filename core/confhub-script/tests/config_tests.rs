use confhub_script::{GuardConfig, ScriptRuntimeConfig};
use pretty_assertions::assert_eq;
use std::io::Write;
use std::time::Duration;

#[test]
fn defaults() {
    let config = ScriptRuntimeConfig::default();
    assert_eq!(config.timeout(), Duration::from_secs(2));
    assert_eq!(config.guard.window_multiplier, 11);
    assert_eq!(config.guard.max_executions_in_window, 10);
    assert_eq!(config.guard.history_capacity, 1000);
}

#[test]
fn partial_file_keeps_other_defaults() {
    let config = ScriptRuntimeConfig::from_toml_str(
        r#"
        [runtime]
        timeout_ms = 250

        [runtime.guard]
        max_executions_in_window = 4
        "#,
    )
    .unwrap();
    assert_eq!(config.timeout_ms, 250);
    assert_eq!(config.max_operations, ScriptRuntimeConfig::default().max_operations);
    assert_eq!(
        config.guard,
        GuardConfig {
            max_executions_in_window: 4,
            ..GuardConfig::default()
        }
    );
}

#[test]
fn empty_file_is_all_defaults() {
    let config = ScriptRuntimeConfig::from_toml_str("").unwrap();
    assert_eq!(config, ScriptRuntimeConfig::default());
}

#[test]
fn load_from_reads_file() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    writeln!(file, "[runtime]\ntimeout_ms = 500\nmax_call_levels = 8").unwrap();

    let config = ScriptRuntimeConfig::load_from(file.path());
    assert_eq!(config.timeout_ms, 500);
    assert_eq!(config.max_call_levels, 8);
}

#[test]
fn load_from_missing_file_falls_back_to_defaults() {
    let dir = tempfile::tempdir().unwrap();
    let config = ScriptRuntimeConfig::load_from(&dir.path().join("absent.toml"));
    assert_eq!(config, ScriptRuntimeConfig::default());
}

#[test]
fn load_from_invalid_file_falls_back_to_defaults() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    writeln!(file, "[runtime]\ntimeout_ms = \"soon\"").unwrap();

    assert!(ScriptRuntimeConfig::read(file.path()).is_err());
    assert_eq!(
        ScriptRuntimeConfig::load_from(file.path()),
        ScriptRuntimeConfig::default()
    );
}
