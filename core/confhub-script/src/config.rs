//! Runtime configuration. Reads an optional `script-runtime.toml` with
//! interpreter limits and runaway-guard tuning.
//!
//! ```toml
//! [runtime]
//! timeout_ms = 2000
//! max_operations = 5000000
//!
//! [runtime.guard]
//! window_multiplier = 11
//! max_executions_in_window = 10
//! history_capacity = 1000
//! ```

use crate::error::ConfigError;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;
use tracing::{info, warn};

/// Interpreter limits applied to every sandbox invocation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScriptRuntimeConfig {
    /// Wall-clock budget per script run. Fixed per deployment, never derived
    /// from the script or the collection.
    pub timeout_ms: u64,
    /// Interpreter operation ceiling; 0 disables it.
    pub max_operations: u64,
    pub max_call_levels: usize,
    pub max_expr_depth: usize,
    pub max_string_size: usize,
    pub max_array_size: usize,
    pub max_map_size: usize,
    pub guard: GuardConfig,
}

impl Default for ScriptRuntimeConfig {
    fn default() -> Self {
        Self {
            timeout_ms: 2_000,
            max_operations: 5_000_000,
            max_call_levels: 32,
            max_expr_depth: 64,
            max_string_size: 1024 * 1024, // 1MB
            max_array_size: 10_000,
            max_map_size: 10_000,
            guard: GuardConfig::default(),
        }
    }
}

/// Tuning for the runaway-script guard.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct GuardConfig {
    /// Detection window as a multiple of the owner's mean execution time.
    pub window_multiplier: u32,
    /// More executions than this inside the window, counting the attempt
    /// being checked, means a likely loop.
    pub max_executions_in_window: usize,
    /// Execution records retained per owner (oldest dropped first).
    pub history_capacity: usize,
}

impl Default for GuardConfig {
    fn default() -> Self {
        Self {
            window_multiplier: 11,
            max_executions_in_window: 10,
            history_capacity: 1_000,
        }
    }
}

/// Raw TOML structure matching the config file format.
#[derive(Deserialize, Default)]
struct RuntimeFile {
    #[serde(default)]
    runtime: ScriptRuntimeConfig,
}

impl ScriptRuntimeConfig {
    /// Loads config from `path`. Falls back to defaults with a warning when
    /// the file is missing or cannot be parsed.
    pub fn load_from(path: &Path) -> Self {
        if !path.exists() {
            info!("No script runtime config at {:?}, using defaults", path);
            return Self::default();
        }
        match Self::read(path) {
            Ok(config) => {
                info!("Loaded script runtime config from {:?}", path);
                config
            }
            Err(e) => {
                warn!("{}. Falling back to default script runtime config.", e);
                Self::default()
            }
        }
    }

    /// Reads and parses `path`, reporting every failure.
    pub fn read(path: &Path) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_toml_str(&contents)
    }

    pub fn from_toml_str(contents: &str) -> Result<Self, ConfigError> {
        let file: RuntimeFile = toml::from_str(contents)?;
        Ok(file.runtime)
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }
}
