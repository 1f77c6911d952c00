use crate::error::HarnessError;
use crate::row::TestRow;
use confhub_model::{
    ColumnDefinition, DataGrid, Setting, SettingValue, SettingsCollection, SettingsSchema,
    ValueType,
};
use confhub_script::{ScriptOutcome, ScriptRunner, ScriptRuntimeConfig};
use std::time::Duration;
use tracing::debug;

enum Base {
    Named(String),
    Schema(Box<SettingsSchema>),
    Collection(Box<SettingsCollection>),
}

enum Pending {
    Setting(Setting),
    Grid {
        name: String,
        columns: Option<Vec<ColumnDefinition>>,
        rows: Vec<TestRow>,
    },
}

/// Builds an in-memory [`TestClient`] from a schema or fluent calls.
///
/// ```
/// use confhub_testkit::{TestClientBuilder, run_script};
///
/// let mut client = TestClientBuilder::new("demo")
///     .add_boolean_setting("RequireHttps", true)
///     .add_string_setting("BaseUrl", "http://example.com")
///     .build()
///     .unwrap();
///
/// run_script(r#"BaseUrl.IsValid = BaseUrl.Value.starts_with("https");"#, &mut client);
/// assert!(!client.get_setting("BaseUrl").unwrap().is_valid);
/// ```
pub struct TestClientBuilder {
    base: Base,
    pending: Vec<Pending>,
    overrides: Vec<(String, SettingValue)>,
    script: Option<String>,
    show_advanced: Option<bool>,
    config: ScriptRuntimeConfig,
}

impl TestClientBuilder {
    pub fn new(name: impl Into<String>) -> Self {
        Self::with_base(Base::Named(name.into()))
    }

    /// Starts from a pre-built schema; fluent calls add to it.
    pub fn from_schema(schema: SettingsSchema) -> Self {
        Self::with_base(Base::Schema(Box::new(schema)))
    }

    /// Starts from a JSON schema document.
    pub fn from_schema_json(json: &str) -> Result<Self, HarnessError> {
        Ok(Self::from_schema(SettingsSchema::from_json(json)?))
    }

    pub fn from_collection(collection: SettingsCollection) -> Self {
        Self::with_base(Base::Collection(Box::new(collection)))
    }

    fn with_base(base: Base) -> Self {
        Self {
            base,
            pending: Vec::new(),
            overrides: Vec::new(),
            script: None,
            show_advanced: None,
            config: ScriptRuntimeConfig::default(),
        }
    }

    pub fn add_setting(mut self, setting: Setting) -> Self {
        self.pending.push(Pending::Setting(setting));
        self
    }

    pub fn add_string_setting(self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.add_setting(Setting::new(name, SettingValue::String(value.into())))
    }

    pub fn add_boolean_setting(self, name: impl Into<String>, value: bool) -> Self {
        self.add_setting(Setting::new(name, value))
    }

    pub fn add_int_setting(self, name: impl Into<String>, value: i32) -> Self {
        self.add_setting(Setting::new(name, value))
    }

    pub fn add_duration_setting(self, name: impl Into<String>, value: Duration) -> Self {
        self.add_setting(Setting::new(name, value))
    }

    pub fn add_drop_down_setting(
        self,
        name: impl Into<String>,
        value: impl Into<String>,
        valid_values: Vec<String>,
    ) -> Self {
        self.add_setting(Setting::drop_down(
            name,
            SettingValue::Enum(value.into()),
            valid_values,
        ))
    }

    /// Adds a grid whose columns are inferred from the rows: every column
    /// named in any row, typed by its first literal.
    pub fn add_data_grid_setting(
        mut self,
        name: impl Into<String>,
        rows: impl IntoIterator<Item = TestRow>,
    ) -> Self {
        self.pending.push(Pending::Grid {
            name: name.into(),
            columns: None,
            rows: rows.into_iter().collect(),
        });
        self
    }

    pub fn add_data_grid_setting_with_columns(
        mut self,
        name: impl Into<String>,
        columns: Vec<ColumnDefinition>,
        rows: impl IntoIterator<Item = TestRow>,
    ) -> Self {
        self.pending.push(Pending::Grid {
            name: name.into(),
            columns: Some(columns),
            rows: rows.into_iter().collect(),
        });
        self
    }

    /// Overrides a setting's initial value. Checked against the declared
    /// type at [`build`](Self::build).
    pub fn with_setting(mut self, name: impl Into<String>, value: impl Into<SettingValue>) -> Self {
        self.overrides.push((name.into(), value.into()));
        self
    }

    /// Attaches a collection-level script.
    pub fn with_script(mut self, script: impl Into<String>) -> Self {
        self.script = Some(script.into());
        self
    }

    pub fn show_advanced(mut self, show: bool) -> Self {
        self.show_advanced = Some(show);
        self
    }

    pub fn with_config(mut self, config: ScriptRuntimeConfig) -> Self {
        self.config = config;
        self
    }

    pub fn build(self) -> Result<TestClient, HarnessError> {
        let mut collection = match self.base {
            Base::Named(name) => SettingsCollection::new(name),
            Base::Schema(schema) => schema.into_collection()?,
            Base::Collection(collection) => *collection,
        };

        for pending in self.pending {
            let setting = match pending {
                Pending::Setting(setting) => setting,
                Pending::Grid {
                    name,
                    columns,
                    rows,
                } => grid_setting(name, columns, &rows)?,
            };
            collection.add_setting(setting)?;
        }

        for (name, value) in self.overrides {
            let setting = collection
                .get_setting_mut(&name)
                .ok_or_else(|| HarnessError::SettingNotFound(name.clone()))?;
            let declared = setting.value_type();
            let given = value.value_type();
            let value = value
                .conform_to(&name, declared)
                .map_err(|_| HarnessError::OverrideType {
                    name: name.clone(),
                    declared,
                    given,
                })?;
            setting.set_value(value)?;
        }

        if self.script.is_some() {
            collection.set_script(self.script);
        }
        if let Some(show) = self.show_advanced {
            collection.set_show_advanced(show);
        }

        debug!(
            collection = %collection.name(),
            settings = collection.settings().len(),
            "Built test client"
        );
        Ok(TestClient {
            collection,
            runner: ScriptRunner::with_config(self.config),
        })
    }
}

fn grid_setting(
    name: String,
    columns: Option<Vec<ColumnDefinition>>,
    rows: &[TestRow],
) -> Result<Setting, HarnessError> {
    let columns = match columns {
        Some(columns) => columns,
        None => infer_columns(&name, rows)?,
    };
    let mut grid = DataGrid::new(columns)?;
    for row in rows {
        grid.push_row(row.cells().map(|(column, value)| (column, value.clone())))?;
    }
    Ok(Setting::data_grid(name, grid))
}

fn infer_columns(grid: &str, rows: &[TestRow]) -> Result<Vec<ColumnDefinition>, HarnessError> {
    let mut columns: Vec<ColumnDefinition> = Vec::new();
    for row in rows {
        for (column, value) in row.cells() {
            let value_type = value.value_type();
            match columns.iter().find(|c| c.name == column) {
                Some(existing) if existing.value_type != value_type => {
                    return Err(HarnessError::ConflictingColumn {
                        grid: grid.to_string(),
                        column: column.to_string(),
                        first: existing.value_type,
                        second: value_type,
                    });
                }
                Some(_) => {}
                None => columns.push(ColumnDefinition::new(column, value_type)),
            }
        }
    }
    if columns.is_empty() {
        return Err(HarnessError::EmptyGrid(grid.to_string()));
    }
    Ok(columns)
}

/// An in-memory client whose scripts run through the production
/// [`ScriptRunner`].
pub struct TestClient {
    collection: SettingsCollection,
    runner: ScriptRunner,
}

impl TestClient {
    pub fn get_setting(&self, name: &str) -> Option<&Setting> {
        self.collection.get_setting(name)
    }

    /// Current value of a scalar setting.
    pub fn value(&self, name: &str) -> Option<&SettingValue> {
        self.get_setting(name)?.value()
    }

    /// Simulates an operator edit.
    pub fn set_value(
        &mut self,
        name: &str,
        value: impl Into<SettingValue>,
    ) -> Result<(), HarnessError> {
        let setting = self
            .collection
            .get_setting_mut(name)
            .ok_or_else(|| HarnessError::SettingNotFound(name.to_string()))?;
        setting.set_value(value.into())?;
        Ok(())
    }

    pub fn collection(&self) -> &SettingsCollection {
        &self.collection
    }

    pub fn runner(&self) -> &ScriptRunner {
        &self.runner
    }

    pub fn execute_script(&mut self, script: &str) -> ScriptOutcome {
        self.runner.run(script, &mut self.collection)
    }

    /// Runs the collection-level script attached at build time.
    pub fn execute_collection_script(&mut self) -> ScriptOutcome {
        self.runner.run_collection_script(&mut self.collection)
    }
}

/// Runs `script` against `client`.
pub fn run_script(script: &str, client: &mut TestClient) -> ScriptOutcome {
    client.execute_script(script)
}
