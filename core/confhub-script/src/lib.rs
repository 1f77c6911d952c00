//! Sandboxed script runtime for Confhub settings.
//!
//! Schema authors attach small scripts to a settings collection (or to one
//! setting) to drive dynamic behavior: validation, visibility, cross-setting
//! defaults. This crate evaluates them:
//!
//! - [`SettingBridge`] exposes one setting to the interpreter with type
//!   coercion and staged (all-or-nothing) mutation
//! - [`ScriptSandbox`] builds a fresh time-bounded interpreter per run
//! - [`RunawayGuard`] suppresses scripts stuck in a self-triggering loop
//! - [`ScriptRunner`] ties them together and notifies observers
//!
//! ```no_run
//! use confhub_model::{Setting, SettingsCollection};
//! use confhub_script::ScriptRunner;
//!
//! let mut collection = SettingsCollection::new("billing");
//! collection.add_setting(Setting::new("Port", 80)).unwrap();
//!
//! let runner = ScriptRunner::new();
//! let outcome = runner.run("if Port.Value != 443 { Port.IsValid = false; }", &mut collection);
//! assert!(outcome.is_committed());
//! ```

mod bridge;
mod config;
mod convert;
mod error;
mod guard;
mod runner;
mod sandbox;

pub use bridge::SettingBridge;
pub use config::{GuardConfig, ScriptRuntimeConfig};
pub use error::{ConfigError, ScriptError};
pub use guard::{ExecutionRecord, RunawayGuard};
pub use runner::{RefreshObserver, RunReport, ScriptOutcome, ScriptRunner, SkipReason};
pub use sandbox::{SandboxReport, ScriptSandbox};
