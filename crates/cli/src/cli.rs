use ab_domain::config::AppConfig;
use clap::{Parser, Subcommand};

/// autobuildr — an agent-agnostic turn-loop execution harness.
#[derive(Debug, Parser)]
#[command(name = "ab-cli", version, about)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Execute a stored spec through the kernel to a terminal state.
    Run {
        /// Spec name (the `feature-<id>-<slug>` form) to load and run.
        spec_name: String,
        /// Run id to resume (generates a fresh one if omitted).
        #[arg(long)]
        run_id: Option<uuid::Uuid>,
        /// Print the finished run as JSON instead of a summary line.
        #[arg(long)]
        json: bool,
    },
    /// Parse a spec file and report structural/bounds errors.
    Validate {
        /// Path to a JSON-encoded `AgentSpec`.
        spec_path: String,
    },
    /// Derive an `AgentSpec` from a JSON-encoded feature and store it.
    Derive {
        /// Path to a JSON-encoded `ab_derive::Feature`.
        feature_path: String,
        /// Print the derived spec as JSON instead of storing it.
        #[arg(long)]
        dry_run: bool,
    },
    /// Reconstruct and print a run's event sequence.
    Replay {
        run_id: uuid::Uuid,
        /// Print full debug context (last tool call/result, failure reason)
        /// instead of the event list.
        #[arg(long)]
        debug: bool,
    },
    /// Diagnostic checks against the current configuration, plus an
    /// orphaned-run recovery sweep.
    Doctor,
}

/// Loads configuration from the path named by `AB_CONFIG` (default
/// `ab-cli.toml`), falling back to defaults when the file does not exist.
/// Shared by every subcommand so the logic lives in one place (mirrors the
/// teacher's `cli::load_config`).
pub fn load_config() -> anyhow::Result<(AppConfig, String)> {
    let config_path = std::env::var("AB_CONFIG").unwrap_or_else(|_| "ab-cli.toml".into());

    let config = if std::path::Path::new(&config_path).exists() {
        let raw = std::fs::read_to_string(&config_path)
            .map_err(|e| anyhow::anyhow!("reading {config_path}: {e}"))?;
        toml::from_str(&raw).map_err(|e| anyhow::anyhow!("parsing {config_path}: {e}"))?
    } else {
        AppConfig::default()
    };

    Ok((config, config_path))
}
