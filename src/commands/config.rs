//! Configuration file commands.

use std::path::Path;

use alien_macros::Config;
use anyhow::{bail, Result};

/// Write the default configuration
pub fn init_config(path: &Path, force: bool) -> Result<()> {
    if path.exists() && !force {
        bail!(
            "{} already exists (use --force to overwrite)",
            path.display()
        );
    }
    Config::default().save(path)?;
    println!("Wrote default configuration to {}", path.display());
    Ok(())
}
