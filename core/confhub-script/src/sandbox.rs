//! One isolated, time-bounded script invocation.
//!
//! Each call to [`ScriptSandbox::execute`] builds a fresh `rhai::Engine`:
//! - no ambient I/O (a bare engine has none; `eval` is disabled)
//! - a wall-clock deadline enforced through the progress callback
//! - operation, call-depth, expression-depth and container size ceilings
//! - one [`SettingBridge`] per setting, bound to a variable of the same name
//!
//! Nothing reaches the live settings unless the script completes and every
//! bridge prepares its staged state successfully.

use crate::bridge::SettingBridge;
use crate::config::ScriptRuntimeConfig;
use crate::error::ScriptError;
use confhub_model::{CoercionError, ScriptTarget, ScriptableSetting};
use rhai::{Dynamic, Engine, EvalAltResult, Position, Scope};
use std::cell::Cell;
use std::collections::HashMap;
use std::rc::Rc;
use std::time::{Duration, Instant};
use tracing::{debug, warn};

/// What a successful sandbox run did.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SandboxReport {
    /// Settings whose state differs from before the run, in collection order.
    pub changed_settings: Vec<String>,
    /// Number of bridges injected into the interpreter.
    pub bridges: usize,
    /// Interpreter operations consumed.
    pub operations: u64,
    pub elapsed: Duration,
}

/// Builds and runs one interpreter per call. Holds no state between calls.
#[derive(Debug, Clone, Default)]
pub struct ScriptSandbox {
    config: ScriptRuntimeConfig,
}

impl ScriptSandbox {
    pub fn new(config: ScriptRuntimeConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &ScriptRuntimeConfig {
        &self.config
    }

    /// Runs `script` against every setting of `target`.
    ///
    /// A blank script returns an empty report without building an engine.
    /// On any error the settings are left exactly as they were.
    pub fn execute<T: ScriptTarget + ?Sized>(
        &self,
        target: &mut T,
        script: &str,
    ) -> Result<SandboxReport, ScriptError> {
        if script.trim().is_empty() {
            return Ok(SandboxReport::default());
        }

        let started = Instant::now();
        let collection = target.display_name().to_string();
        let bridges: Vec<SettingBridge> = target.settings().iter().map(SettingBridge::new).collect();
        debug!(collection = %collection, bridges = bridges.len(), "Starting script run");

        let operations = Rc::new(Cell::new(0u64));
        let engine = self.build_engine(&collection, &bridges, started, Rc::clone(&operations));
        let mut scope = Scope::new();
        for bridge in &bridges {
            scope.push(bridge.name(), bridge.clone());
        }

        if let Err(err) = engine.run_with_scope(&mut scope, script) {
            let err = self.classify(&collection, &err);
            warn!(collection = %collection, error = %err, "Script run failed; settings unchanged");
            return Err(err);
        }
        drop(scope);
        drop(engine);

        let changed_settings = commit(target, &bridges).inspect_err(|err| {
            warn!(collection = %collection, error = %err, "Script commit failed; settings unchanged");
        })?;

        let report = SandboxReport {
            changed_settings,
            bridges: bridges.len(),
            operations: operations.get(),
            elapsed: started.elapsed(),
        };
        debug!(
            collection = %collection,
            duration_ms = report.elapsed.as_millis() as u64,
            operations = report.operations,
            changed = report.changed_settings.len(),
            "Script run complete"
        );
        Ok(report)
    }

    fn build_engine(
        &self,
        collection: &str,
        bridges: &[SettingBridge],
        started: Instant,
        operations: Rc<Cell<u64>>,
    ) -> Engine {
        let config = &self.config;
        let mut engine = Engine::new();

        engine.disable_symbol("eval");
        engine.set_max_operations(config.max_operations);
        engine.set_max_call_levels(config.max_call_levels);
        engine.set_max_expr_depths(config.max_expr_depth, config.max_expr_depth);
        engine.set_max_string_size(config.max_string_size);
        engine.set_max_array_size(config.max_array_size);
        engine.set_max_map_size(config.max_map_size);

        // A timeout too large to represent as an instant means no deadline.
        let deadline = started.checked_add(config.timeout());
        engine.on_progress(move |ops| {
            operations.set(ops);
            match deadline {
                Some(deadline) if Instant::now() >= deadline => Some(Dynamic::UNIT),
                _ => None,
            }
        });

        let name = collection.to_string();
        engine.on_print(move |text| debug!(collection = %name, "script: {}", text));
        let name = collection.to_string();
        engine.on_debug(move |text, _source, pos| {
            debug!(collection = %name, position = %pos, "script: {}", text);
        });
        let name = collection.to_string();
        engine.register_fn("log", move |text: &str| {
            debug!(collection = %name, "script: {}", text);
        });

        SettingBridge::register(&mut engine);

        let by_name: HashMap<String, SettingBridge> = bridges
            .iter()
            .map(|bridge| (bridge.name(), bridge.clone()))
            .collect();
        engine.register_fn(
            "setting",
            move |name: &str| -> Result<SettingBridge, Box<EvalAltResult>> {
                by_name.get(name).cloned().ok_or_else(|| {
                    Box::new(EvalAltResult::ErrorRuntime(
                        Dynamic::from(format!("unknown setting '{name}'")),
                        Position::NONE,
                    ))
                })
            },
        );

        engine
    }

    fn classify(&self, collection: &str, err: &EvalAltResult) -> ScriptError {
        match coercion_of(err) {
            Some(source) => ScriptError::Coercion {
                collection: collection.to_string(),
                source,
            },
            None if is_terminated(err) => ScriptError::Timeout {
                collection: collection.to_string(),
                timeout_ms: self.config.timeout_ms,
            },
            None => ScriptError::Runtime {
                collection: collection.to_string(),
                message: err.to_string(),
            },
        }
    }
}

/// Recovers a coercion failure thrown by a bridge, looking through script
/// function call frames.
fn coercion_of(err: &EvalAltResult) -> Option<CoercionError> {
    match err {
        EvalAltResult::ErrorRuntime(value, _) => value.clone().try_cast::<CoercionError>(),
        EvalAltResult::ErrorInFunctionCall(_, _, inner, _) => coercion_of(inner),
        EvalAltResult::ErrorInModule(_, inner, _) => coercion_of(inner),
        _ => None,
    }
}

fn is_terminated(err: &EvalAltResult) -> bool {
    match err {
        EvalAltResult::ErrorTerminated(..) => true,
        EvalAltResult::ErrorInFunctionCall(_, _, inner, _) => is_terminated(inner),
        EvalAltResult::ErrorInModule(_, inner, _) => is_terminated(inner),
        _ => false,
    }
}

/// Two-phase commit: every bridge prepares first, then the prepared settings
/// are applied to copies, and only when all of that succeeded are the live
/// settings replaced.
fn commit<T: ScriptTarget + ?Sized>(
    target: &mut T,
    bridges: &[SettingBridge],
) -> Result<Vec<String>, ScriptError> {
    let collection = target.display_name().to_string();
    let prepared = bridges
        .iter()
        .map(SettingBridge::prepare)
        .collect::<Result<Vec<_>, _>>()
        .map_err(|source| ScriptError::Coercion {
            collection: collection.clone(),
            source,
        })?;

    let mut next = Vec::with_capacity(prepared.len());
    for (live, staged) in target.settings().iter().zip(&prepared) {
        let mut updated = live.clone();
        let changed = updated
            .apply_staged(staged)
            .map_err(|source| ScriptError::Commit {
                collection: collection.clone(),
                source,
            })?;
        next.push((changed, updated));
    }

    let mut changed_settings = Vec::new();
    for (live, (changed, updated)) in target.settings_mut().iter_mut().zip(next) {
        if changed {
            changed_settings.push(updated.name.clone());
            *live = updated;
        }
    }
    Ok(changed_settings)
}
