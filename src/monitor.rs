//! Macro-key monitor
//!
//! Connects a [`DeviceSession`] to a [`MacroDispatcher`]: every decoded
//! input report yields at most one scan code (the first active usage),
//! which is dispatched to its configured action.

use alien_hid::{
    find_target, first_active_usage, BackendError, CancelToken, DeviceCandidate, DeviceSession,
    HidapiBackend, OpenOptions, SessionError, TargetDeviceIdentity,
};
use alien_keys::{Dispatch, KeyInjector, MacroDispatcher};
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::config::TargetConfig;

/// Errors from resolving the target or running the monitor
#[derive(Debug, Error)]
pub enum MonitorError {
    #[error("No HID interface matches {0}")]
    DeviceNotFound(TargetDeviceIdentity),

    #[error("Device enumeration failed: {0}")]
    Enumerate(#[from] BackendError),

    #[error(transparent)]
    Session(#[from] SessionError),
}

/// Pick the device path to open
///
/// A configured path wins; otherwise the first enumerated interface with
/// the configured identity.
pub fn resolve_path(
    target: &TargetConfig,
    candidates: &[DeviceCandidate],
) -> Result<String, MonitorError> {
    if let Some(path) = &target.path {
        debug!("Using configured device path {}", path);
        return Ok(path.clone());
    }
    let identity = target.identity();
    let candidate =
        find_target(candidates, &identity).ok_or(MonitorError::DeviceNotFound(identity))?;
    info!("Found {} at {}", candidate.display_name(), candidate.path);
    Ok(candidate.path.clone())
}

/// Resolve the target on this system, enumerating only when no path is
/// configured
pub fn locate(backend: &HidapiBackend, target: &TargetConfig) -> Result<String, MonitorError> {
    let candidates = if target.path.is_some() {
        Vec::new()
    } else {
        backend.enumerate()?
    };
    resolve_path(target, &candidates)
}

/// Counters for one monitor run
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MonitorStats {
    /// Input reports decoded
    pub reports: u64,
    /// Scan codes that produced key events
    pub dispatched: u64,
    /// Scan codes with no (valid) binding
    pub ignored: u64,
    /// Scan codes whose injection failed
    pub failed: u64,
}

/// Reads macro-key reports and injects the bound key sequences
pub struct Monitor<I: KeyInjector> {
    session: DeviceSession,
    dispatcher: MacroDispatcher<I>,
}

impl<I: KeyInjector> Monitor<I> {
    pub fn new(session: DeviceSession, dispatcher: MacroDispatcher<I>) -> Self {
        Self {
            session,
            dispatcher,
        }
    }

    pub fn session(&self) -> &DeviceSession {
        &self.session
    }

    pub fn dispatcher(&self) -> &MacroDispatcher<I> {
        &self.dispatcher
    }

    pub fn dispatcher_mut(&mut self) -> &mut MacroDispatcher<I> {
        &mut self.dispatcher
    }

    /// Open `path` and dispatch reports until cancelled, or until
    /// `max_reports` reports were read
    ///
    /// Cancellation ends the run normally. Injection failures are logged
    /// and counted; they do not stop the run. The device is closed on
    /// return.
    pub fn run(
        &mut self,
        path: &str,
        max_reports: Option<u64>,
        cancel: &CancelToken,
    ) -> Result<MonitorStats, MonitorError> {
        self.session.open(path, OpenOptions::monitor())?;
        info!(
            "Listening on {} ({} {})",
            path,
            self.session.manufacturer().unwrap_or("Unknown"),
            self.session.product().unwrap_or("device"),
        );

        let mut stats = MonitorStats::default();
        let dispatcher = &mut self.dispatcher;
        let result = self
            .session
            .read_async_with(max_reports, cancel, |items| {
                stats.reports += 1;
                let Some(scan_code) = first_active_usage(items) else {
                    return;
                };
                match dispatcher.process(scan_code) {
                    Ok(Dispatch::Sent { events }) => {
                        stats.dispatched += 1;
                        let keys: Vec<_> = events.iter().map(ToString::to_string).collect();
                        info!("Macro {:#06x}: {}", scan_code, keys.join(" "));
                    }
                    Ok(Dispatch::Ignored) => stats.ignored += 1,
                    Err(e) => {
                        stats.failed += 1;
                        warn!("Macro {:#06x} failed: {}", scan_code, e);
                    }
                }
            });
        self.session.close();

        match result {
            Ok(_) => Ok(stats),
            Err(e) if e.is_cancelled() => Ok(stats),
            Err(e) => Err(e.into()),
        }
    }
}
