//! Application layer for `skills-manager`.
//!
//! [`SkillsManager`] wires the config store, platform registry, rule catalog,
//! repository manager, skill index and link engine to one shared store. The
//! [`run`] function parses the command line and drives a single command on a
//! multi-threaded tokio runtime, flushing buffered config before returning.
//!
//! Logging goes through `tracing`; set `RUST_LOG=skills_manager=debug` for
//! detail on store writes, git invocations and link changes.

#![deny(unsafe_code)]

mod app_config;
mod cli;
mod commands;
mod manager;

use anyhow::Result;
use clap::Parser;

pub use app_config::AppConfig;
pub use cli::Cli;
pub use manager::SkillsManager;

/// Parses arguments and runs the selected command.
pub fn run() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()?;
    runtime.block_on(commands::dispatch(cli))
}
