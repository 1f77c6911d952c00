//! Serde definitions for loading a settings collection from JSON.
//!
//! ```json
//! {
//!   "name": "billing-service",
//!   "settings": [
//!     { "name": "RequireHttps", "type": "bool", "value": true },
//!     { "name": "RequestTimeout", "type": "duration", "value": 120000 },
//!     { "name": "Services", "type": "data_grid",
//!       "columns": [ { "name": "Name", "type": "string", "is_required": true } ],
//!       "rows": [ { "Name": "api" } ] }
//!   ]
//! }
//! ```

use crate::collection::SettingsCollection;
use crate::error::ModelError;
use crate::grid::{ColumnDefinition, DataGrid};
use crate::setting::Setting;
use crate::value::ValueType;
use confhub_types::ClientId;
use serde::{Deserialize, Serialize};

/// A client's settings schema.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SettingsSchema {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub client_id: Option<ClientId>,
    /// Collection-level script.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub script: Option<String>,
    #[serde(default)]
    pub show_advanced: bool,
    #[serde(default)]
    pub settings: Vec<SettingDefinition>,
}

/// Definition of one setting inside a [`SettingsSchema`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SettingDefinition {
    pub name: String,
    #[serde(rename = "type")]
    pub value_type: ValueType,
    /// Initial value; `null` or absent means the type's default.
    #[serde(default)]
    pub value: serde_json::Value,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Turns a scalar setting into a drop-down.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub valid_values: Option<Vec<String>>,
    /// Grid columns; required for `data_grid` settings.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub columns: Vec<ColumnDefinition>,
    /// Grid rows keyed by column name.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub rows: Vec<serde_json::Map<String, serde_json::Value>>,
    #[serde(default)]
    pub advanced: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub display_order: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category_color: Option<String>,
    #[serde(default)]
    pub is_read_only: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub editor_line_count: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub script: Option<String>,
}

impl SettingsSchema {
    pub fn from_json(json: &str) -> Result<Self, ModelError> {
        Ok(serde_json::from_str(json)?)
    }

    /// Builds a live collection from this schema.
    pub fn into_collection(self) -> Result<SettingsCollection, ModelError> {
        let client_id = self
            .client_id
            .unwrap_or_else(|| ClientId::for_name(&self.name));
        let mut collection = SettingsCollection::with_client_id(client_id, self.name);
        collection.set_script(self.script);
        collection.set_show_advanced(self.show_advanced);
        for definition in self.settings {
            collection.add_setting(definition.into_setting()?)?;
        }
        Ok(collection)
    }
}

impl SettingDefinition {
    pub fn into_setting(self) -> Result<Setting, ModelError> {
        let mut setting = match self.value_type {
            ValueType::DataGrid => {
                if self.columns.is_empty() {
                    return Err(ModelError::InvalidSchema(format!(
                        "grid '{}' declares no columns",
                        self.name
                    )));
                }
                let mut grid = DataGrid::new(self.columns)?;
                for row in &self.rows {
                    let mut values = Vec::with_capacity(row.len());
                    for (column, json) in row {
                        let col = grid
                            .column_index(column)
                            .ok_or_else(|| ModelError::ColumnNotFound(column.clone()))?;
                        let target = format!("{}[{}].{column}", self.name, grid.row_count());
                        let value = if json.is_null() {
                            grid.columns()[col].value_type.default_value()
                        } else {
                            Some(grid.columns()[col].value_type.from_json(&target, json)?)
                        };
                        if let Some(value) = value {
                            values.push((column.clone(), value));
                        }
                    }
                    grid.push_row(values)?;
                }
                Setting::data_grid(self.name, grid)
            }
            value_type => {
                let value = if self.value.is_null() {
                    value_type.default_value().ok_or_else(|| {
                        ModelError::InvalidSchema(format!("'{}' has no default", self.name))
                    })?
                } else {
                    value_type.from_json(&self.name, &self.value)?
                };
                match self.valid_values {
                    Some(valid_values) => Setting::drop_down(self.name, value, valid_values),
                    None => Setting::new(self.name, value),
                }
            }
        };
        setting.description = self.description;
        setting.advanced = self.advanced;
        setting.display_order = self.display_order;
        setting.category_name = self.category_name;
        setting.category_color = self.category_color;
        setting.is_read_only = self.is_read_only;
        setting.editor_line_count = self.editor_line_count;
        setting.script = self.script;
        Ok(setting)
    }
}
