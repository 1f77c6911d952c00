//! Error types for the setting model.

use crate::value::ValueType;
use thiserror::Error;

/// A value could not be converted to a setting's declared type.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("cannot assign {found} to '{target}' ({expected}): {reason}")]
pub struct CoercionError {
    /// Setting name, or `setting[row].column` for grid cells.
    pub target: String,
    pub expected: ValueType,
    /// Short description of the offending value.
    pub found: String,
    pub reason: String,
}

impl CoercionError {
    pub fn new(
        target: impl Into<String>,
        expected: ValueType,
        found: impl Into<String>,
        reason: impl Into<String>,
    ) -> Self {
        Self {
            target: target.into(),
            expected,
            found: found.into(),
            reason: reason.into(),
        }
    }

    /// Re-targets the error, e.g. when a cell-level failure surfaces through its grid.
    #[must_use]
    pub fn with_target(mut self, target: impl Into<String>) -> Self {
        self.target = target.into();
        self
    }
}

/// Errors raised by collection, grid and schema operations.
#[derive(Debug, Error)]
pub enum ModelError {
    #[error("setting not found: {0}")]
    SettingNotFound(String),

    #[error("duplicate setting name: {0}")]
    DuplicateSetting(String),

    #[error("type mismatch for '{setting}': expected {expected}, got {actual}")]
    TypeMismatch {
        setting: String,
        expected: ValueType,
        actual: ValueType,
    },

    #[error("column not found: {0}")]
    ColumnNotFound(String),

    #[error("row {row} out of range ({rows} rows)")]
    RowOutOfRange { row: usize, rows: usize },

    #[error("invalid grid columns: {0}")]
    InvalidColumns(String),

    #[error("grid shape mismatch: {0}")]
    ShapeMismatch(String),

    #[error("setting '{0}' is not a data grid")]
    NotADataGrid(String),

    #[error("invalid schema: {0}")]
    InvalidSchema(String),

    #[error(transparent)]
    Coercion(#[from] CoercionError),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}
