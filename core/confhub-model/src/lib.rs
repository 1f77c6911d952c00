//! Setting model for Confhub.
//!
//! Defines the types every script-facing subsystem depends on:
//! - [`SettingValue`] / [`ValueType`]: typed scalar values and their declared types
//! - [`DataGrid`]: tabular settings with a fixed column shape
//! - [`Setting`]: one named value plus validation and UI metadata
//! - [`SettingsCollection`]: the settings (and attached script) of one client
//! - [`ScriptableSetting`] / [`ScriptTarget`]: the narrow surfaces the script
//!   runtime reads from and commits onto
//! - [`SettingsSchema`]: serde definitions used to load a collection from JSON

mod collection;
mod error;
mod grid;
mod schema;
mod setting;
mod value;

pub use collection::{ScriptTarget, SettingsCollection};
pub use error::{CoercionError, ModelError};
pub use grid::{CellError, ColumnDefinition, DataGrid, DataGridCell, DataGridRow};
pub use schema::{SettingDefinition, SettingsSchema};
pub use setting::{ScriptableSetting, Setting, SettingKind};
pub use value::{SettingValue, ValueType};
