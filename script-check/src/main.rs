//! Confhub script checker
//!
//! Runs a settings script against a schema file without a server and prints
//! the resulting setting state as JSON.
//!
//! Usage:
//!   confhub-script-check --schema schema.json --script rules.rhai --set Port=80

use anyhow::{Context, Result};
use clap::Parser;
use confhub_model::SettingsSchema;
use confhub_script::ScriptRuntimeConfig;
use confhub_script_check::{parse_override, run_check};
use std::{fs, path::PathBuf, process::ExitCode};
use tracing::{Level, info, warn};
use tracing_subscriber::FmtSubscriber;

#[derive(Parser, Debug)]
#[command(name = "confhub-script-check")]
#[command(about = "Run a settings script against a schema and print the result")]
struct Args {
    /// Settings schema (JSON)
    #[arg(long)]
    schema: PathBuf,

    /// Script file; defaults to the schema's own script
    #[arg(long)]
    script: Option<PathBuf>,

    /// Override a setting value before running (repeatable)
    #[arg(long = "set", value_name = "NAME=VALUE", value_parser = parse_override)]
    overrides: Vec<(String, String)>,

    /// Treat advanced settings as shown
    #[arg(long)]
    show_advanced: bool,

    /// Runtime limits (TOML with a [runtime] table)
    #[arg(long)]
    config: Option<PathBuf>,

    /// Enable verbose debug logging
    #[arg(short, long)]
    verbose: bool,
}

fn main() -> Result<ExitCode> {
    let args = Args::parse();
    let log_level = if args.verbose { Level::DEBUG } else { Level::INFO };
    FmtSubscriber::builder()
        .with_max_level(log_level)
        .with_target(false)
        .with_writer(std::io::stderr)
        .compact()
        .init();

    let schema_text = fs::read_to_string(&args.schema)
        .with_context(|| format!("Failed to read schema {:?}", args.schema))?;
    let schema = SettingsSchema::from_json(&schema_text).context("Failed to parse schema")?;

    let script = match &args.script {
        Some(path) => Some(
            fs::read_to_string(path).with_context(|| format!("Failed to read script {path:?}"))?,
        ),
        None => None,
    };
    let config = match &args.config {
        Some(path) => ScriptRuntimeConfig::load_from(path),
        None => ScriptRuntimeConfig::default(),
    };

    info!("Checking script for {:?}", args.schema);
    let report = run_check(
        schema,
        script.as_deref(),
        &args.overrides,
        args.show_advanced,
        config,
    )
    .context("Failed to prepare settings")?;

    println!("{}", serde_json::to_string_pretty(&report)?);
    if let Some(error) = &report.error {
        warn!("Script failed: {}", error);
        return Ok(ExitCode::FAILURE);
    }
    Ok(ExitCode::SUCCESS)
}
