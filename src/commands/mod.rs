//! Command handlers for the CLI application.
//!
//! - `monitor`: the macro-key monitor (default command)
//! - `devices`: device inspection (list, caps, probe)
//! - `config`: configuration file commands (init-config)

pub mod config;
pub mod devices;
pub mod monitor;

use std::sync::Arc;

use alien_hid::{CancelToken, HidapiBackend};
use alien_macros::{locate, Config};
use anyhow::{Context, Result};

/// Create the hidapi backend
pub fn open_backend() -> Result<Arc<HidapiBackend>> {
    let backend = HidapiBackend::new().context("Failed to initialize HID API")?;
    Ok(Arc::new(backend))
}

/// Device path to use: an explicit override, else the configured target
pub fn target_path(backend: &HidapiBackend, config: &Config, path: Option<&str>) -> Result<String> {
    match path {
        Some(path) => Ok(path.to_string()),
        None => Ok(locate(backend, &config.target)?),
    }
}

/// Set up a Ctrl-C handler that cancels the returned token
pub fn setup_interrupt_handler() -> Result<CancelToken> {
    let cancel = CancelToken::new();
    let handler_token = cancel.clone();

    ctrlc::set_handler(move || {
        handler_token.cancel();
    })
    .context("Failed to install Ctrl-C handler")?;

    Ok(cancel)
}
