//! Anvil CLI — the main entry point.
//!
//! Commands:
//! - `onboard` — Write the default config and create the workspace
//! - `agent`   — Run one task, or enter the interactive task loop

use std::path::PathBuf;

use anvil_config::{AppConfig, ConfigError};
use clap::{Parser, Subcommand};

mod commands;

#[derive(Parser)]
#[command(
    name = "anvil",
    about = "Anvil — a sandboxed, tool-using agent for the terminal",
    version,
    author
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Use this config file instead of ~/.anvil/config.toml
    #[arg(short, long, global = true, env = "ANVIL_CONFIG")]
    config: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// Initialize configuration, workspace and database
    Onboard,

    /// Give the agent a task
    Agent {
        /// Run this single task instead of entering interactive mode
        #[arg(short, long)]
        message: Option<String>,

        /// Override the turn budget from the config
        #[arg(long)]
        max_turns: Option<u32>,
    },
}

/// Load the config from `--config` or the default location.
pub(crate) fn load_config(path: Option<&PathBuf>) -> Result<AppConfig, ConfigError> {
    match path {
        Some(path) => AppConfig::load_with_env(path),
        None => AppConfig::load(),
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    // Initialize tracing
    let filter = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(filter)),
        )
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    match cli.command {
        Commands::Onboard => commands::onboard::run(cli.config.as_ref()).await?,
        Commands::Agent { message, max_turns } => {
            commands::agent::run(cli.config.as_ref(), message, max_turns).await?
        }
    }

    Ok(())
}
