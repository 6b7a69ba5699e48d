//! Macro-key monitor command.

use std::sync::Arc;

use alien_hid::DeviceSession;
use alien_keys::{KeyInjector, LoggingInjector, MacroDispatcher};
use alien_macros::{Config, Monitor};
use anyhow::Result;
use tracing::info;

use super::{open_backend, setup_interrupt_handler, target_path};

/// Listen for macro keys until Ctrl-C (or `count` reports)
pub fn monitor(config: &Config, dry_run: bool, count: Option<u64>) -> Result<()> {
    let table = Arc::new(config.macro_table()?);
    for (scan_code, action) in table.sorted() {
        info!("  {:#06x} -> {}", scan_code, action);
    }

    let backend = open_backend()?;
    let path = target_path(&backend, config, None)?;
    let session = DeviceSession::new(backend).with_wait_timeout(config.monitor.read_timeout());

    let injector: Box<dyn KeyInjector> = if dry_run {
        info!("Dry run: key events are logged, not injected");
        Box::new(LoggingInjector::new())
    } else {
        system_injector(config)?
    };
    let dispatcher = MacroDispatcher::new(table, injector)
        .with_char_delay(config.monitor.char_delay());

    let cancel = setup_interrupt_handler()?;
    println!("Listening for macro keys. Press Ctrl-C to stop.");

    let mut monitor = Monitor::new(session, dispatcher);
    let stats = monitor.run(&path, count, &cancel)?;

    println!(
        "Reports: {}  dispatched: {}  ignored: {}  failed: {}",
        stats.reports, stats.dispatched, stats.ignored, stats.failed
    );
    Ok(())
}

#[cfg(target_os = "linux")]
fn system_injector(config: &Config) -> Result<Box<dyn KeyInjector>> {
    use alien_keys::UinputInjector;
    use anyhow::Context;

    let injector = UinputInjector::new(&config.monitor.device_name)
        .context("Failed to create virtual keyboard (is /dev/uinput writable?)")?;
    Ok(Box::new(injector))
}

#[cfg(not(target_os = "linux"))]
fn system_injector(_config: &Config) -> Result<Box<dyn KeyInjector>> {
    anyhow::bail!("Key injection is only available on Linux; use --dry-run")
}
