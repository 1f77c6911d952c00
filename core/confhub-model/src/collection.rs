use crate::error::ModelError;
use crate::setting::Setting;
use confhub_types::ClientId;
use serde::Serialize;

/// What the script runtime needs from a settings collection: identity for
/// logging and runaway tracking, visibility context, and the settings.
pub trait ScriptTarget {
    /// Owner id that script executions are attributed to.
    fn client_id(&self) -> ClientId;

    /// Human-readable name used in diagnostics.
    fn display_name(&self) -> &str;

    fn show_advanced(&self) -> bool;

    fn settings(&self) -> &[Setting];

    fn settings_mut(&mut self) -> &mut [Setting];
}

/// The settings (and attached script) belonging to one registered client.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SettingsCollection {
    client_id: ClientId,
    name: String,
    show_advanced: bool,
    #[serde(skip)]
    script: Option<String>,
    settings: Vec<Setting>,
}

impl SettingsCollection {
    pub fn new(name: impl Into<String>) -> Self {
        Self::with_client_id(ClientId::new(), name)
    }

    pub fn with_client_id(client_id: ClientId, name: impl Into<String>) -> Self {
        Self {
            client_id,
            name: name.into(),
            show_advanced: false,
            script: None,
            settings: Vec::new(),
        }
    }

    pub fn client_id(&self) -> ClientId {
        self.client_id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Adds a setting. Names are unique within a collection.
    pub fn add_setting(&mut self, setting: Setting) -> Result<(), ModelError> {
        if self.get_setting(&setting.name).is_some() {
            return Err(ModelError::DuplicateSetting(setting.name));
        }
        self.settings.push(setting);
        Ok(())
    }

    pub fn get_setting(&self, name: &str) -> Option<&Setting> {
        self.settings.iter().find(|s| s.name == name)
    }

    pub fn get_setting_mut(&mut self, name: &str) -> Option<&mut Setting> {
        self.settings.iter_mut().find(|s| s.name == name)
    }

    /// Like [`get_setting`](Self::get_setting) but reports a missing name.
    pub fn require_setting(&self, name: &str) -> Result<&Setting, ModelError> {
        self.get_setting(name)
            .ok_or_else(|| ModelError::SettingNotFound(name.to_string()))
    }

    pub fn settings(&self) -> &[Setting] {
        &self.settings
    }

    /// Collection-level script, evaluated after any setting changes.
    pub fn script(&self) -> Option<&str> {
        self.script.as_deref()
    }

    pub fn set_script(&mut self, script: Option<String>) {
        self.script = script;
    }

    pub fn show_advanced(&self) -> bool {
        self.show_advanced
    }

    pub fn set_show_advanced(&mut self, show: bool) {
        self.show_advanced = show;
    }

    /// Settings currently visible to an operator.
    pub fn visible_settings(&self) -> impl Iterator<Item = &Setting> {
        self.settings
            .iter()
            .filter(|s| !s.is_hidden(self.show_advanced))
    }

    /// Serializes the current state as pretty JSON.
    pub fn to_json_pretty(&self) -> Result<String, ModelError> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}

impl ScriptTarget for SettingsCollection {
    fn client_id(&self) -> ClientId {
        self.client_id
    }

    fn display_name(&self) -> &str {
        &self.name
    }

    fn show_advanced(&self) -> bool {
        self.show_advanced
    }

    fn settings(&self) -> &[Setting] {
        &self.settings
    }

    fn settings_mut(&mut self) -> &mut [Setting] {
        &mut self.settings
    }
}
