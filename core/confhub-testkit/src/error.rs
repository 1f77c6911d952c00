use confhub_model::{ModelError, ValueType};
use thiserror::Error;

/// Errors raised while building a test client.
#[derive(Debug, Error)]
pub enum HarnessError {
    #[error("setting not found: {0}")]
    SettingNotFound(String),

    #[error("setting '{name}' is {declared}, override is {given}")]
    OverrideType {
        name: String,
        declared: ValueType,
        given: ValueType,
    },

    #[error("grid '{0}' has no columns and no rows to infer them from")]
    EmptyGrid(String),

    #[error("grid '{grid}' column '{column}' is {first} in one row and {second} in another")]
    ConflictingColumn {
        grid: String,
        column: String,
        first: ValueType,
        second: ValueType,
    },

    #[error(transparent)]
    Model(#[from] ModelError),
}
