//! Offline script check: load a schema, apply value overrides, run a script
//! and report the resulting setting state.

use confhub_model::{ModelError, SettingsCollection, SettingsSchema};
use confhub_script::{ScriptOutcome, ScriptRunner, ScriptRuntimeConfig};
use serde::Serialize;
use tracing::{debug, info};

/// What the check did, serialized as the tool's output.
#[derive(Serialize, Debug, Clone, PartialEq)]
pub struct CheckReport {
    pub collection: String,
    /// `committed`, `skipped` or `failed`.
    pub outcome: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    pub changed_settings: Vec<String>,
    /// Names of settings an operator would currently see.
    pub visible_settings: Vec<String>,
    pub settings: serde_json::Value,
}

impl CheckReport {
    pub fn failed(&self) -> bool {
        self.error.is_some()
    }
}

/// Parses a `Name=value` pair from the command line.
pub fn parse_override(arg: &str) -> Result<(String, String), String> {
    match arg.split_once('=') {
        Some((name, value)) if !name.trim().is_empty() => {
            Ok((name.trim().to_string(), value.to_string()))
        }
        _ => Err(format!("expected Name=value, got '{arg}'")),
    }
}

/// Applies textual overrides, parsing each against the setting's declared type.
pub fn apply_overrides(
    collection: &mut SettingsCollection,
    overrides: &[(String, String)],
) -> Result<(), ModelError> {
    for (name, text) in overrides {
        let setting = collection
            .get_setting_mut(name)
            .ok_or_else(|| ModelError::SettingNotFound(name.clone()))?;
        let value = setting.value_type().parse_str(name, text)?;
        setting.set_value(value)?;
        debug!(setting = %name, value = %text, "Applied override");
    }
    Ok(())
}

/// Builds the collection from `schema`, applies `overrides` and runs
/// `script` (or the schema's own script when `None`).
pub fn run_check(
    schema: SettingsSchema,
    script: Option<&str>,
    overrides: &[(String, String)],
    show_advanced: bool,
    config: ScriptRuntimeConfig,
) -> Result<CheckReport, ModelError> {
    let mut collection = schema.into_collection()?;
    if show_advanced {
        collection.set_show_advanced(true);
    }
    apply_overrides(&mut collection, overrides)?;

    let runner = ScriptRunner::with_config(config);
    let outcome = match script {
        Some(script) => runner.run(script, &mut collection),
        None => runner.run_collection_script(&mut collection),
    };
    info!(collection = %collection.name(), outcome = ?outcome, "Script check finished");

    let (label, error) = match &outcome {
        ScriptOutcome::Committed(_) => ("committed", None),
        ScriptOutcome::Skipped(_) => ("skipped", None),
        ScriptOutcome::Failed(err) => ("failed", Some(err.to_string())),
    };
    Ok(CheckReport {
        collection: collection.name().to_string(),
        outcome: label.to_string(),
        error,
        changed_settings: outcome.changed_settings().to_vec(),
        visible_settings: collection
            .visible_settings()
            .map(|s| s.name.clone())
            .collect(),
        settings: serde_json::to_value(collection.settings())?,
    })
}
