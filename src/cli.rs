// CLI definitions using clap

use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "alien-macros")]
#[command(author, version, about = "Laptop macro keys to key presses")]
#[command(propagate_version = true)]
pub struct Cli {
    /// Config file path (default: ~/.config/alien-macros/config.toml)
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Log level (error, warn, info, debug, trace)
    #[arg(long, global = true, default_value = "info")]
    pub log_level: String,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Listen for macro keys and inject their actions (default)
    #[command(visible_alias = "run")]
    Monitor {
        /// Log key events instead of injecting them
        #[arg(long)]
        dry_run: bool,
        /// Stop after this many reports
        #[arg(long, value_name = "N")]
        count: Option<u64>,
    },

    /// List HID interfaces (known macro-key devices are marked)
    #[command(visible_alias = "ls")]
    List,

    /// Show report shapes, capabilities and the decoded item layout
    Caps {
        /// Device path (default: configured target)
        #[arg(long)]
        path: Option<String>,
    },

    /// Print the active usages of incoming reports (find scan codes)
    Probe {
        /// Device path (default: configured target)
        #[arg(long)]
        path: Option<String>,
        /// Stop after this many reports
        #[arg(long, value_name = "N")]
        count: Option<u64>,
    },

    /// Write the default configuration file
    InitConfig {
        /// Overwrite an existing file
        #[arg(long)]
        force: bool,
    },
}
