//! Tabular "data grid" settings.
//!
//! A grid has a fixed list of [`ColumnDefinition`]s shared by every row.
//! Rows store one [`DataGridCell`] per column, in column order, so the
//! cell count of a row always equals the column count. Cell values can be
//! changed but columns are never added or removed after construction.

use crate::error::{CoercionError, ModelError};
use crate::value::{SettingValue, ValueType};
use serde::ser::{SerializeMap, SerializeStruct};
use serde::{Deserialize, Serialize, Serializer};
use std::collections::HashSet;

/// Declared shape of one grid column.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColumnDefinition {
    pub name: String,
    #[serde(rename = "type")]
    pub value_type: ValueType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub valid_values: Option<Vec<String>>,
    #[serde(default)]
    pub is_read_only: bool,
    /// Empty cells in a required column are reported by [`DataGrid::validate`].
    #[serde(default)]
    pub is_required: bool,
}

impl ColumnDefinition {
    pub fn new(name: impl Into<String>, value_type: ValueType) -> Self {
        Self {
            name: name.into(),
            value_type,
            valid_values: None,
            is_read_only: false,
            is_required: false,
        }
    }

    /// Shorthand for a string column.
    pub fn string(name: impl Into<String>) -> Self {
        Self::new(name, ValueType::String)
    }

    #[must_use]
    pub fn with_valid_values(mut self, values: Vec<String>) -> Self {
        self.valid_values = Some(values);
        self
    }

    #[must_use]
    pub fn read_only(mut self) -> Self {
        self.is_read_only = true;
        self
    }

    #[must_use]
    pub fn required(mut self) -> Self {
        self.is_required = true;
        self
    }
}

/// One cell of a grid row.
///
/// The value is private so it can only be replaced with a value of the
/// owning column's declared type.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DataGridCell {
    value: SettingValue,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub valid_values: Option<Vec<String>>,
    pub is_read_only: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub validation_error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub editor_line_count: Option<i64>,
    #[serde(skip)]
    value_type: ValueType,
}

impl DataGridCell {
    fn for_column(column: &ColumnDefinition) -> Self {
        Self {
            value: column
                .value_type
                .default_value()
                .unwrap_or(SettingValue::String(String::new())),
            valid_values: column.valid_values.clone(),
            is_read_only: column.is_read_only,
            validation_error: None,
            editor_line_count: None,
            value_type: column.value_type,
        }
    }

    pub fn value(&self) -> &SettingValue {
        &self.value
    }

    /// The owning column's declared type.
    pub fn value_type(&self) -> ValueType {
        self.value_type
    }

    /// Replaces the value, converting losslessly to the column type.
    pub fn set_value(&mut self, value: SettingValue) -> Result<(), CoercionError> {
        self.value = value.conform_to("cell", self.value_type)?;
        Ok(())
    }
}

/// A grid row: one cell per column, in column order.
#[derive(Debug, Clone, PartialEq)]
pub struct DataGridRow {
    cells: Vec<DataGridCell>,
}

impl DataGridRow {
    pub fn cells(&self) -> &[DataGridCell] {
        &self.cells
    }

    pub fn cell(&self, index: usize) -> Option<&DataGridCell> {
        self.cells.get(index)
    }

    pub fn cell_mut(&mut self, index: usize) -> Option<&mut DataGridCell> {
        self.cells.get_mut(index)
    }

    pub fn len(&self) -> usize {
        self.cells.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }
}

/// A validation failure reported for one cell.
#[derive(Debug, Clone, PartialEq)]
pub struct CellError {
    pub row: usize,
    pub column: String,
    pub value: SettingValue,
    pub message: String,
}

/// Value of a data-grid setting.
#[derive(Debug, Clone, PartialEq)]
pub struct DataGrid {
    columns: Vec<ColumnDefinition>,
    rows: Vec<DataGridRow>,
}

impl DataGrid {
    /// Creates an empty grid. Column names must be unique and every column
    /// must declare a scalar type.
    pub fn new(columns: Vec<ColumnDefinition>) -> Result<Self, ModelError> {
        if columns.is_empty() {
            return Err(ModelError::InvalidColumns("a grid needs at least one column".into()));
        }
        let mut seen = HashSet::new();
        for column in &columns {
            if !seen.insert(column.name.as_str()) {
                return Err(ModelError::InvalidColumns(format!(
                    "duplicate column '{}'",
                    column.name
                )));
            }
            if !column.value_type.is_scalar() {
                return Err(ModelError::InvalidColumns(format!(
                    "column '{}' cannot hold a nested grid",
                    column.name
                )));
            }
        }
        Ok(Self {
            columns,
            rows: Vec::new(),
        })
    }

    pub fn columns(&self) -> &[ColumnDefinition] {
        &self.columns
    }

    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c.name == name)
    }

    pub fn rows(&self) -> &[DataGridRow] {
        &self.rows
    }

    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    /// A row with one default cell per column.
    pub fn blank_row(&self) -> DataGridRow {
        DataGridRow {
            cells: self.columns.iter().map(DataGridCell::for_column).collect(),
        }
    }

    /// Appends a row built from `(column, value)` pairs. Columns not named
    /// keep their default value; unknown column names are rejected.
    pub fn push_row<I, K>(&mut self, values: I) -> Result<usize, ModelError>
    where
        I: IntoIterator<Item = (K, SettingValue)>,
        K: AsRef<str>,
    {
        let mut row = self.blank_row();
        let index = self.rows.len();
        for (column, value) in values {
            let column = column.as_ref();
            let col = self
                .column_index(column)
                .ok_or_else(|| ModelError::ColumnNotFound(column.to_string()))?;
            row.cells[col]
                .set_value(value)
                .map_err(|e| e.with_target(format!("[{index}].{column}")))?;
        }
        self.rows.push(row);
        Ok(index)
    }

    pub fn cell(&self, row: usize, column: &str) -> Option<&DataGridCell> {
        let col = self.column_index(column)?;
        self.rows.get(row)?.cells.get(col)
    }

    pub fn cell_mut(&mut self, row: usize, column: &str) -> Option<&mut DataGridCell> {
        let col = self.column_index(column)?;
        self.rows.get_mut(row)?.cells.get_mut(col)
    }

    pub fn set_cell_value(
        &mut self,
        row: usize,
        column: &str,
        value: SettingValue,
    ) -> Result<(), ModelError> {
        let rows = self.rows.len();
        let col = self
            .column_index(column)
            .ok_or_else(|| ModelError::ColumnNotFound(column.to_string()))?;
        let cell = self
            .rows
            .get_mut(row)
            .ok_or(ModelError::RowOutOfRange { row, rows })?
            .cells
            .get_mut(col)
            .ok_or_else(|| ModelError::ColumnNotFound(column.to_string()))?;
        cell.set_value(value)
            .map_err(|e| e.with_target(format!("[{row}].{column}")))?;
        Ok(())
    }

    /// Replaces every row. Each row must have exactly one cell per column,
    /// typed as the column declares.
    pub fn replace_rows(&mut self, rows: Vec<DataGridRow>) -> Result<(), ModelError> {
        for (index, row) in rows.iter().enumerate() {
            if row.cells.len() != self.columns.len() {
                return Err(ModelError::ShapeMismatch(format!(
                    "row {index} has {} cells, grid has {} columns",
                    row.cells.len(),
                    self.columns.len()
                )));
            }
            for (cell, column) in row.cells.iter().zip(&self.columns) {
                if cell.value_type != column.value_type
                    || cell.value.value_type() != column.value_type
                {
                    return Err(ModelError::ShapeMismatch(format!(
                        "row {index} column '{}' holds {}, expected {}",
                        column.name,
                        cell.value.value_type(),
                        column.value_type
                    )));
                }
            }
        }
        self.rows = rows;
        Ok(())
    }

    /// Runs the per-cell validator: explicit cell errors first, then values
    /// outside the cell's valid values, then empty required cells.
    pub fn validate(&self) -> Vec<CellError> {
        let mut errors = Vec::new();
        for (row_index, row) in self.rows.iter().enumerate() {
            for (cell, column) in row.cells.iter().zip(&self.columns) {
                if let Some(message) = cell_error(cell, column) {
                    errors.push(CellError {
                        row: row_index,
                        column: column.name.clone(),
                        value: cell.value.clone(),
                        message,
                    });
                }
            }
        }
        errors
    }

    /// Builds the setting-level explanation for a set of cell errors:
    /// `[<column> - <value>] <message>`, suffixed with the number of
    /// remaining errors. Returns `None` when there are no errors.
    pub fn explain(errors: &[CellError]) -> Option<String> {
        let first = errors.first()?;
        let mut text = format!("[{} - {}] {}", first.column, first.value, first.message);
        if errors.len() > 1 {
            text.push_str(&format!(" (and {} other error(s))", errors.len() - 1));
        }
        Some(text)
    }
}

fn cell_error(cell: &DataGridCell, column: &ColumnDefinition) -> Option<String> {
    if let Some(message) = cell.validation_error.as_deref().filter(|m| !m.is_empty()) {
        return Some(message.to_string());
    }
    if let Some(valid) = cell.valid_values.as_ref().filter(|v| !v.is_empty()) {
        let rendered = cell.value.to_string();
        if !cell.value.is_empty() && !valid.contains(&rendered) {
            return Some(format!("'{rendered}' is not a valid value"));
        }
    }
    if column.is_required && cell.value.is_empty() {
        return Some("Required field is missing".to_string());
    }
    None
}

struct RowView<'a> {
    columns: &'a [ColumnDefinition],
    row: &'a DataGridRow,
}

impl Serialize for RowView<'_> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.columns.len()))?;
        for (column, cell) in self.columns.iter().zip(&self.row.cells) {
            map.serialize_entry(&column.name, cell)?;
        }
        map.end()
    }
}

impl Serialize for DataGrid {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let rows: Vec<RowView<'_>> = self
            .rows
            .iter()
            .map(|row| RowView {
                columns: &self.columns,
                row,
            })
            .collect();
        let mut state = serializer.serialize_struct("DataGrid", 2)?;
        state.serialize_field("columns", &self.columns)?;
        state.serialize_field("rows", &rows)?;
        state.end()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn column(name: &str) -> ColumnDefinition {
        ColumnDefinition::string(name)
    }

    #[test]
    fn cell_error_prefers_explicit_message() {
        let col = column("Name").required();
        let mut cell = DataGridCell::for_column(&col);
        cell.validation_error = Some("custom".into());
        assert_eq!(cell_error(&cell, &col).as_deref(), Some("custom"));
    }

    #[test]
    fn cell_error_ignores_empty_value_outside_valid_values() {
        let col = column("Env").with_valid_values(vec!["Prod".into()]);
        let cell = DataGridCell::for_column(&col);
        assert_eq!(cell_error(&cell, &col), None);
    }
}
