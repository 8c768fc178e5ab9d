//! Binary entry point: `run`, `validate`, `derive`, `replay`, `doctor`
//! subcommands over the library crates. Initializes the only
//! `tracing_subscriber` instance in the whole workspace — library crates
//! emit `tracing` events but never install a subscriber themselves.

mod app;
mod cli;
mod commands;
mod env;
mod executor;

use clap::Parser;
use cli::{Cli, Command};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_tracing();
    tracing::info!(use_kernel = env::use_kernel(), icon_provider = %env::icon_provider(), "ab-cli starting");

    let cli = Cli::parse();
    let (config, config_path) = cli::load_config()?;

    match cli.command {
        Command::Run { spec_name, run_id, json } => {
            commands::run::run(&config, &spec_name, run_id, json).await?;
        }
        Command::Validate { spec_path } => {
            commands::validate::validate(&spec_path)?;
        }
        Command::Derive { feature_path, dry_run } => {
            commands::derive::derive(&config, &feature_path, dry_run)?;
        }
        Command::Replay { run_id, debug } => {
            commands::replay::replay(&config, run_id, debug)?;
        }
        Command::Doctor => {
            let passed = commands::doctor::doctor(&config, &config_path)?;
            if !passed {
                std::process::exit(1);
            }
        }
    }

    Ok(())
}

/// JSON-formatted subscriber driven by `AB_LOG` (checked first) or
/// `RUST_LOG`, defaulting to `info` when neither is set — mirrors the
/// teacher's `gateway::main::init_tracing`.
fn init_tracing() {
    let filter = std::env::var("AB_LOG")
        .ok()
        .map(EnvFilter::new)
        .unwrap_or_else(|| EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")));
    tracing_subscriber::fmt().with_env_filter(filter).json().init();
}
