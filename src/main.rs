// src/main.rs

pub mod backends;
pub mod config;
pub mod content;
pub mod damage;
pub mod error;
pub mod geometry;
pub mod input;
pub mod os;
pub mod registry;
pub mod scheduler;
pub mod script;
pub mod signals;
pub mod window;

use crate::{
    backends::register_builtin_backends,
    config::Config,
    content::ProcStatusSource,
    error::DisplayError,
    registry::BackendRegistry,
    scheduler::RedrawScheduler,
    script::NullScriptHook,
};

use anyhow::Context;
use log::{error, info};

const PROC_ROOT: &str = "/proc";

/// Main entry point for `sysview`.
fn main() -> anyhow::Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .format_timestamp_micros()
        .init();

    info!("Starting sysview...");

    let args: Vec<String> = std::env::args().collect();
    let config_path = Config::path_from_env(&args);
    let config = Config::load(config_path.as_deref()).context("Failed to load configuration")?;
    info!(
        "Configuration loaded from {}",
        config_path
            .as_deref()
            .map(|p| p.display().to_string())
            .unwrap_or_else(|| "defaults".to_string())
    );

    signals::install().context("Failed to install signal handlers")?;

    let mut registry = BackendRegistry::new();
    register_builtin_backends(&mut registry).map_err(fatal)?;
    let active = registry.select_active(&config).map_err(fatal)?;

    let mut scheduler = RedrawScheduler::new(
        active,
        &config,
        Box::new(ProcStatusSource::new(PROC_ROOT)),
        Box::new(NullScriptHook),
    );
    scheduler.run(&signals::TERMINATE, &signals::REFRESH)?;

    info!("sysview exited cleanly.");
    Ok(())
}

fn fatal(e: DisplayError) -> anyhow::Error {
    error!("{}", e);
    e.into()
}
