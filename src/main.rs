//! Alien Macros CLI
//!
//! Listens to a laptop's macro-key HID interface and turns macro key
//! presses into synthesized key presses.

use anyhow::Result;
use clap::Parser;
use tracing::info;

use alien_macros::Config;

// CLI definitions
mod cli;
use cli::{Cli, Commands};

// Command handlers
mod commands;

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize logging
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&cli.log_level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .init();

    let config_path = cli.config.unwrap_or_else(Config::default_path);

    // init-config must work even when the existing file is broken
    if let Some(Commands::InitConfig { force }) = cli.command {
        return commands::config::init_config(&config_path, force);
    }

    info!("Loading config from {:?}", config_path);
    let config = Config::load(&config_path)?;

    match cli.command {
        None => commands::monitor::monitor(&config, false, None),
        Some(Commands::Monitor { dry_run, count }) => {
            commands::monitor::monitor(&config, dry_run, count)
        }
        Some(Commands::List) => commands::devices::list(),
        Some(Commands::Caps { path }) => commands::devices::caps(&config, path.as_deref()),
        Some(Commands::Probe { path, count }) => {
            commands::devices::probe(&config, path.as_deref(), count)
        }
        Some(Commands::InitConfig { .. }) => Ok(()),
    }
}
