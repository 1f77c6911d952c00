//! Error types for the script runtime.

use confhub_model::{CoercionError, ModelError};
use thiserror::Error;

/// Why a script run was abandoned. Every variant leaves the settings exactly
/// as they were before the run.
#[derive(Debug, Error)]
pub enum ScriptError {
    #[error("coercion failed in '{collection}': {source}")]
    Coercion {
        collection: String,
        #[source]
        source: CoercionError,
    },

    #[error("script error in '{collection}': {message}")]
    Runtime { collection: String, message: String },

    #[error("timeout: script for '{collection}' exceeded {timeout_ms}ms deadline")]
    Timeout { collection: String, timeout_ms: u64 },

    #[error("commit failed for '{collection}': {source}")]
    Commit {
        collection: String,
        #[source]
        source: ModelError,
    },
}

impl ScriptError {
    /// Name of the collection the failed script ran against.
    pub fn collection(&self) -> &str {
        match self {
            ScriptError::Coercion { collection, .. }
            | ScriptError::Runtime { collection, .. }
            | ScriptError::Timeout { collection, .. }
            | ScriptError::Commit { collection, .. } => collection,
        }
    }
}

/// Errors reading runtime configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),
}
