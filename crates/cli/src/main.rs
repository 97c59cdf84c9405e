mod cli;
mod commands;
mod input;

use anyhow::{Context, Result};
use clap::Parser;
use tracing::debug;

use strata_core::config::{load_dotenv, Config};
use strata_table::TableStore;

use crate::cli::CliArgs;

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
        )
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    // before parsing so clap's `env` fallbacks see .env values
    load_dotenv();
    let args = CliArgs::parse();

    let mut config = match &args.profile {
        Some(profile) => Config::for_profile(profile),
        None => Config::from_env(),
    };
    if let Some(dir) = &args.data_dir {
        config.storage.data_dir = dir.clone();
    }
    config.log_summary();
    debug!(command = ?args.command, "Running command");

    let mut store = TableStore::open(&config)
        .with_context(|| format!("failed to open table store at {}", config.storage.data_dir.display()))?;
    commands::run(args.command, &mut store, &config)
}
