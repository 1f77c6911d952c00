//! The single entry point for running a script against a collection.
//!
//! Idle → guard check → {skipped | running} → {committed | failed} → idle.
//! Nothing persists across runs except the guard's execution history.

use crate::config::ScriptRuntimeConfig;
use crate::error::ScriptError;
use crate::guard::RunawayGuard;
use crate::sandbox::{SandboxReport, ScriptSandbox};
use confhub_model::{ModelError, ScriptTarget, SettingsCollection};
use confhub_types::ClientId;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, warn};

/// Receives a notification whenever a run committed and views showing the
/// collection should refresh.
pub trait RefreshObserver {
    fn on_refresh_requested(&self, client_id: ClientId);
}

impl<F: Fn(ClientId)> RefreshObserver for F {
    fn on_refresh_requested(&self, client_id: ClientId) {
        self(client_id)
    }
}

/// Why a run did not reach the sandbox.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    BlankScript,
    LikelyLooping,
}

/// A committed run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunReport {
    pub changed_settings: Vec<String>,
    pub operations: u64,
    pub duration: Duration,
}

impl From<SandboxReport> for RunReport {
    fn from(report: SandboxReport) -> Self {
        Self {
            changed_settings: report.changed_settings,
            operations: report.operations,
            duration: report.elapsed,
        }
    }
}

/// Result of [`ScriptRunner::run`]. A failure is reported here and logged,
/// never propagated.
#[derive(Debug)]
pub enum ScriptOutcome {
    Skipped(SkipReason),
    Committed(RunReport),
    Failed(ScriptError),
}

impl ScriptOutcome {
    pub fn is_committed(&self) -> bool {
        matches!(self, ScriptOutcome::Committed(_))
    }

    pub fn is_skipped(&self) -> bool {
        matches!(self, ScriptOutcome::Skipped(_))
    }

    pub fn error(&self) -> Option<&ScriptError> {
        match self {
            ScriptOutcome::Failed(err) => Some(err),
            _ => None,
        }
    }

    /// Names of the settings a committed run changed; empty otherwise.
    pub fn changed_settings(&self) -> &[String] {
        match self {
            ScriptOutcome::Committed(report) => &report.changed_settings,
            _ => &[],
        }
    }

    /// Converts a failure into `Err`, for callers that want `?`.
    pub fn into_result(self) -> Result<Option<RunReport>, ScriptError> {
        match self {
            ScriptOutcome::Skipped(_) => Ok(None),
            ScriptOutcome::Committed(report) => Ok(Some(report)),
            ScriptOutcome::Failed(err) => Err(err),
        }
    }
}

/// Guard check, sandbox run, execution recording and refresh notification.
///
/// The guard is shared (`Arc`) so several runners in one process can
/// attribute executions to the same history.
pub struct ScriptRunner {
    sandbox: ScriptSandbox,
    guard: Arc<RunawayGuard>,
    observers: Vec<Box<dyn RefreshObserver>>,
}

impl Default for ScriptRunner {
    fn default() -> Self {
        Self::with_config(ScriptRuntimeConfig::default())
    }
}

impl ScriptRunner {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_config(config: ScriptRuntimeConfig) -> Self {
        let guard = Arc::new(RunawayGuard::new(config.guard.clone()));
        Self::with_guard(config, guard)
    }

    pub fn with_guard(config: ScriptRuntimeConfig, guard: Arc<RunawayGuard>) -> Self {
        Self {
            sandbox: ScriptSandbox::new(config),
            guard,
            observers: Vec::new(),
        }
    }

    pub fn guard(&self) -> &Arc<RunawayGuard> {
        &self.guard
    }

    pub fn config(&self) -> &ScriptRuntimeConfig {
        self.sandbox.config()
    }

    pub fn add_observer(&mut self, observer: impl RefreshObserver + 'static) {
        self.observers.push(Box::new(observer));
    }

    /// Runs `script` against `target`.
    pub fn run<T: ScriptTarget + ?Sized>(&self, script: &str, target: &mut T) -> ScriptOutcome {
        if script.trim().is_empty() {
            return ScriptOutcome::Skipped(SkipReason::BlankScript);
        }

        let owner = target.client_id();
        if self.guard.is_likely_looping(owner) {
            warn!(
                client_id = %owner,
                collection = %target.display_name(),
                "Skipping script: likely infinite loop"
            );
            return ScriptOutcome::Skipped(SkipReason::LikelyLooping);
        }

        let started_at = Instant::now();
        let result = self.sandbox.execute(target, script);
        self.guard.record(owner, started_at.elapsed());

        match result {
            Ok(report) => {
                for observer in &self.observers {
                    observer.on_refresh_requested(owner);
                }
                ScriptOutcome::Committed(report.into())
            }
            Err(err) => ScriptOutcome::Failed(err),
        }
    }

    /// Runs the collection's own script, if it has one.
    pub fn run_collection_script(&self, collection: &mut SettingsCollection) -> ScriptOutcome {
        let script = collection.script().unwrap_or_default().to_string();
        self.run(&script, collection)
    }

    /// Runs the script attached to `setting_name`. The script still sees
    /// every setting of the collection.
    pub fn run_setting_script(
        &self,
        setting_name: &str,
        collection: &mut SettingsCollection,
    ) -> Result<ScriptOutcome, ModelError> {
        let script = collection
            .require_setting(setting_name)?
            .script
            .clone()
            .unwrap_or_default();
        debug!(setting = %setting_name, collection = %collection.name(), "Running setting script");
        Ok(self.run(&script, collection))
    }
}
