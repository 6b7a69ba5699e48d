//! Device session
//!
//! Owns one opened HID interface: the device handle, the parsed capability
//! descriptor, and a decode layout plus report buffer per report kind.
//!
//! Opening is two-phase. The device is first opened synchronously to read
//! its descriptor, attributes and strings; when overlapped I/O was
//! requested, that handle is closed and the device reopened overlapped.
//! Any failure during open drops whatever handle was acquired and leaves
//! the session closed.
//!
//! `read_async` runs its read loop on one dedicated, named worker thread
//! that is always joined before the call returns. The worker alternates
//! between a bounded wait for the outstanding read and a check of the
//! cancellation token, and decodes each completed report before issuing
//! the next read.

use std::sync::Arc;
use std::thread;
use std::time::Duration;

use tracing::{debug, info, warn};

use crate::backend::{HidBackend, HidHandle, OpenOptions, ReadProgress};
use crate::cancel::CancelToken;
use crate::caps::{build_items, CapabilityError, DataItem};
use crate::decoder::decode_report;
use crate::error::{ReadError, SessionError};
use crate::identity::TargetDeviceIdentity;
use crate::preparsed::{CapabilityQuery, PreparsedData};
use crate::types::{ReportKind, ReportShape, Usage};

/// Default bound on one wait for a pending read
pub const DEFAULT_WAIT_TIMEOUT: Duration = Duration::from_millis(1000);

/// Lifecycle state of a session
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Closed,
    Opening,
    Ready,
    Reading,
}

/// Decode layout and report buffer for one report kind
///
/// The buffer is sized to the kind's report length at open and reused for
/// every read.
#[derive(Debug, Clone)]
pub struct ReportLayout {
    kind: ReportKind,
    shape: ReportShape,
    items: Vec<DataItem>,
    buffer: Vec<u8>,
}

impl ReportLayout {
    pub fn build<Q: CapabilityQuery + ?Sized>(
        query: &Q,
        kind: ReportKind,
    ) -> Result<Self, CapabilityError> {
        let shape = query.shape(kind);
        let items = build_items(query, kind, &shape)?;
        Ok(Self {
            kind,
            shape,
            items,
            buffer: vec![0; shape.byte_length],
        })
    }

    pub fn kind(&self) -> ReportKind {
        self.kind
    }

    pub fn shape(&self) -> &ReportShape {
        &self.shape
    }

    pub fn items(&self) -> &[DataItem] {
        &self.items
    }

    /// Bytes of the most recent report read into this layout
    pub fn buffer(&self) -> &[u8] {
        &self.buffer
    }

    /// Decode a completed read of `len` bytes
    ///
    /// Short reads fail before any item is touched.
    fn accept<Q: CapabilityQuery + ?Sized>(
        &mut self,
        len: usize,
        query: &Q,
    ) -> Result<(), SessionError> {
        if len != self.buffer.len() {
            return Err(ReadError::ShortRead {
                expected: self.buffer.len(),
                actual: len,
            }
            .into());
        }
        decode_report(query, self.kind, &self.buffer, &mut self.items)?;
        Ok(())
    }
}

struct OpenDevice {
    path: String,
    options: OpenOptions,
    handle: Box<dyn HidHandle>,
    preparsed: PreparsedData,
    identity: TargetDeviceIdentity,
    manufacturer: Option<String>,
    product: Option<String>,
    layouts: [ReportLayout; 3],
}

impl OpenDevice {
    fn check_readable(&self) -> Result<(), ReadError> {
        if !self.options.read {
            return Err(ReadError::NotReadable);
        }
        if self.layouts[ReportKind::Input.index()].shape.is_empty() {
            return Err(ReadError::NoInputReports);
        }
        Ok(())
    }
}

/// Session over one HID interface
pub struct DeviceSession {
    backend: Arc<dyn HidBackend>,
    wait_timeout: Duration,
    state: SessionState,
    device: Option<OpenDevice>,
}

impl DeviceSession {
    pub fn new(backend: Arc<dyn HidBackend>) -> Self {
        Self {
            backend,
            wait_timeout: DEFAULT_WAIT_TIMEOUT,
            state: SessionState::Closed,
            device: None,
        }
    }

    /// Bound on each wait for a pending read, and so on cancellation latency
    pub fn with_wait_timeout(mut self, timeout: Duration) -> Self {
        self.wait_timeout = timeout;
        self
    }

    /// Open the interface at `path`, closing any device already open
    pub fn open(&mut self, path: &str, options: OpenOptions) -> Result<(), SessionError> {
        self.close();
        self.state = SessionState::Opening;

        match self.open_device(path, options) {
            Ok(device) => {
                info!(
                    "Opened {} at {} ({} / {})",
                    device.identity,
                    path,
                    device.manufacturer.as_deref().unwrap_or("Unknown"),
                    device.product.as_deref().unwrap_or("Unknown"),
                );
                self.device = Some(device);
                self.state = SessionState::Ready;
                Ok(())
            }
            Err(e) => {
                warn!("Failed to open {}: {}", path, e);
                self.state = SessionState::Closed;
                Err(e)
            }
        }
    }

    fn open_device(&self, path: &str, options: OpenOptions) -> Result<OpenDevice, SessionError> {
        let open_error = |source| SessionError::Open {
            path: path.to_string(),
            source,
        };

        // Capability queries run on a synchronous handle
        let handle = self
            .backend
            .open(path, &options.synchronous())
            .map_err(open_error)?;

        let descriptor = handle.report_descriptor().map_err(SessionError::Query)?;
        let preparsed = PreparsedData::parse(&descriptor)?;
        let attributes = handle.attributes().map_err(SessionError::Query)?;
        let manufacturer = handle.manufacturer();
        let product = handle.product();

        let layouts = [
            ReportLayout::build(&preparsed, ReportKind::Input)?,
            ReportLayout::build(&preparsed, ReportKind::Output)?,
            ReportLayout::build(&preparsed, ReportKind::Feature)?,
        ];

        let top = preparsed.top_level();
        let identity = TargetDeviceIdentity::new(
            attributes.vendor_id,
            attributes.product_id,
            top.usage_page,
            top.usage,
        );

        let handle = if options.overlapped {
            drop(handle);
            debug!("Reopening {} for overlapped reads", path);
            self.backend.open(path, &options).map_err(open_error)?
        } else {
            handle
        };

        Ok(OpenDevice {
            path: path.to_string(),
            options,
            handle,
            preparsed,
            identity,
            manufacturer,
            product,
            layouts,
        })
    }

    /// Release the device; does nothing when already closed
    pub fn close(&mut self) {
        if let Some(device) = self.device.take() {
            debug!("Closing {}", device.path);
        }
        self.state = SessionState::Closed;
    }

    pub fn is_open(&self) -> bool {
        self.device.is_some()
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn path(&self) -> Option<&str> {
        self.device.as_ref().map(|d| d.path.as_str())
    }

    pub fn identity(&self) -> Option<TargetDeviceIdentity> {
        self.device.as_ref().map(|d| d.identity)
    }

    pub fn manufacturer(&self) -> Option<&str> {
        self.device.as_ref()?.manufacturer.as_deref()
    }

    pub fn product(&self) -> Option<&str> {
        self.device.as_ref()?.product.as_deref()
    }

    pub fn preparsed(&self) -> Option<&PreparsedData> {
        self.device.as_ref().map(|d| &d.preparsed)
    }

    pub fn layout(&self, kind: ReportKind) -> Option<&ReportLayout> {
        self.device.as_ref().map(|d| &d.layouts[kind.index()])
    }

    /// Input data items as of the last decoded report
    pub fn input_items(&self) -> Option<&[DataItem]> {
        self.layout(ReportKind::Input).map(ReportLayout::items)
    }

    /// Read and decode one input report, blocking until it arrives
    pub fn read(&mut self) -> Result<(), SessionError> {
        let device = self.device.as_mut().ok_or(SessionError::NotOpen)?;
        device.check_readable()?;

        let OpenDevice {
            handle,
            preparsed,
            layouts,
            ..
        } = device;
        let input = &mut layouts[ReportKind::Input.index()];
        let len = handle.read(&mut input.buffer).map_err(ReadError::Device)?;
        input.accept(len, &*preparsed)
    }

    /// Read input reports on a worker thread until cancelled, failed, or
    /// `max_iterations` reports were decoded (`None` for no limit)
    ///
    /// Returns the number of reports decoded.
    pub fn read_async(
        &mut self,
        max_iterations: Option<u64>,
        cancel: &CancelToken,
    ) -> Result<u64, SessionError> {
        self.read_async_with(max_iterations, cancel, |_| {})
    }

    /// Like [`read_async`](Self::read_async), calling `on_report` on the
    /// worker with the input items after each decoded report
    pub fn read_async_with<F>(
        &mut self,
        max_iterations: Option<u64>,
        cancel: &CancelToken,
        on_report: F,
    ) -> Result<u64, SessionError>
    where
        F: FnMut(&[DataItem]) + Send,
    {
        let wait_timeout = self.wait_timeout;
        let device = self.device.as_mut().ok_or(SessionError::NotOpen)?;
        device.check_readable()?;

        self.state = SessionState::Reading;
        let result = thread::scope(|scope| -> Result<u64, SessionError> {
            let worker = thread::Builder::new()
                .name("hid-read-worker".into())
                .spawn_scoped(scope, move || {
                    read_loop(device, wait_timeout, max_iterations, cancel, on_report)
                })
                .map_err(ReadError::Spawn)?;
            worker.join().map_err(|_| ReadError::WorkerPanicked)?
        });
        self.state = SessionState::Ready;

        match &result {
            Ok(count) => debug!("Read worker finished after {} reports", count),
            Err(SessionError::Cancelled) => info!("Read cancelled"),
            Err(e) => warn!("Read worker stopped: {}", e),
        }
        result
    }
}

fn read_loop<F>(
    device: &mut OpenDevice,
    wait_timeout: Duration,
    max_iterations: Option<u64>,
    cancel: &CancelToken,
    mut on_report: F,
) -> Result<u64, SessionError>
where
    F: FnMut(&[DataItem]),
{
    let OpenDevice {
        handle,
        preparsed,
        layouts,
        ..
    } = device;
    let input = &mut layouts[ReportKind::Input.index()];
    let mut completed = 0u64;

    loop {
        if max_iterations.is_some_and(|max| completed >= max) {
            return Ok(completed);
        }
        if cancel.is_cancelled() {
            return Err(SessionError::Cancelled);
        }

        let mut progress = handle
            .submit_read(&mut input.buffer)
            .map_err(ReadError::Device)?;
        let len = loop {
            match progress {
                ReadProgress::Complete(len) => break len,
                ReadProgress::Pending => {
                    if cancel.is_cancelled() {
                        handle.cancel_read();
                        return Err(SessionError::Cancelled);
                    }
                    progress = handle
                        .wait_read(&mut input.buffer, wait_timeout)
                        .map_err(ReadError::Device)?;
                }
            }
        };

        if cancel.is_cancelled() {
            return Err(SessionError::Cancelled);
        }
        input.accept(len, &*preparsed)?;
        on_report(&input.items);
        completed += 1;
    }
}

/// First active usage of the first button item, if any is asserted
///
/// Other button items and any further simultaneous usages are ignored.
pub fn first_active_usage(items: &[DataItem]) -> Option<Usage> {
    items
        .iter()
        .find_map(DataItem::as_button)
        .and_then(|button| button.active_usages.first().copied())
        .filter(|&usage| usage != 0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::caps::ButtonItem;
    use crate::mock::{MockBackend, MockDevice, MockRead};
    use std::time::Instant;

    const MACRO_KEYS: &[u8] = &[
        0x05, 0x0C, 0x09, 0x01, 0xA1, 0x01, 0x85, 0x01, 0x19, 0x4C, 0x29, 0x4F, 0x15, 0x4C, 0x25,
        0x4F, 0x75, 0x08, 0x95, 0x04, 0x81, 0x00, 0xC0,
    ];

    const PATH: &str = "/dev/hidraw7";

    fn setup() -> (Arc<MockBackend>, MockDevice) {
        let backend = Arc::new(MockBackend::new());
        let device = MockDevice::new(MACRO_KEYS, 0x0D62, 0x1A1C);
        device.set_strings("Alienware", "AW-ELC");
        backend.add(PATH, device.clone());
        (backend, device)
    }

    fn session(backend: &Arc<MockBackend>) -> DeviceSession {
        DeviceSession::new(backend.clone()).with_wait_timeout(Duration::from_millis(20))
    }

    fn first_button(session: &DeviceSession) -> ButtonItem {
        session.input_items().unwrap()[0]
            .as_button()
            .unwrap()
            .clone()
    }

    #[test]
    fn test_open_exposes_identity_and_layout() {
        let (backend, device) = setup();
        let mut s = session(&backend);
        assert_eq!(s.state(), SessionState::Closed);

        s.open(PATH, OpenOptions::default()).unwrap();
        assert!(s.is_open());
        assert_eq!(s.state(), SessionState::Ready);
        assert_eq!(
            s.identity(),
            Some(TargetDeviceIdentity::new(0x0D62, 0x1A1C, 0x0C, 0x01))
        );
        assert_eq!(s.manufacturer(), Some("Alienware"));
        assert_eq!(s.product(), Some("AW-ELC"));
        assert_eq!(s.layout(ReportKind::Input).unwrap().shape().byte_length, 5);
        assert!(s.layout(ReportKind::Feature).unwrap().items().is_empty());
        assert_eq!(device.open_handles(), 1);
    }

    #[test]
    fn test_overlapped_open_reopens() {
        let (backend, device) = setup();
        let mut s = session(&backend);
        s.open(PATH, OpenOptions::monitor()).unwrap();

        let log = device.open_log();
        assert_eq!(log.len(), 2);
        assert!(!log[0].overlapped);
        assert!(log[1].overlapped);
        assert_eq!(device.open_handles(), 1);
    }

    #[test]
    fn test_open_failures_leave_session_closed() {
        let (backend, device) = setup();
        let mut s = session(&backend);

        let err = s.open("/dev/missing", OpenOptions::default()).unwrap_err();
        assert!(err.is_open_failure());
        assert_eq!(s.state(), SessionState::Closed);

        device.deny_open(true);
        assert!(matches!(
            s.open(PATH, OpenOptions::default()),
            Err(SessionError::Open { .. })
        ));
        assert!(!s.is_open());

        // bad descriptor: handle acquired, then released again
        let broken = MockDevice::new(&[0xA1, 0x01], 0x0D62, 0x1A1C);
        backend.add("/dev/broken", broken.clone());
        assert!(matches!(
            s.open("/dev/broken", OpenOptions::default()),
            Err(SessionError::Descriptor(_))
        ));
        assert_eq!(broken.open_handles(), 0);

        // retry on a good path works
        device.deny_open(false);
        s.open(PATH, OpenOptions::default()).unwrap();
        assert!(s.is_open());
    }

    #[test]
    fn test_close_is_idempotent() {
        let (backend, device) = setup();
        let mut s = session(&backend);
        s.close();
        s.open(PATH, OpenOptions::default()).unwrap();
        s.close();
        s.close();
        assert!(!s.is_open());
        assert_eq!(device.open_handles(), 0);
        assert!(matches!(s.read(), Err(SessionError::NotOpen)));
    }

    #[test]
    fn test_read_decodes_report() {
        let (backend, device) = setup();
        let mut s = session(&backend);
        s.open(PATH, OpenOptions::default()).unwrap();

        device.push_report(&[1, 0x4D, 0, 0, 0]);
        s.read().unwrap();
        assert_eq!(first_button(&s).active_usages, vec![0x4D, 0, 0, 0]);
        assert_eq!(first_active_usage(s.input_items().unwrap()), Some(0x4D));
    }

    #[test]
    fn test_short_read_leaves_items_untouched() {
        let (backend, device) = setup();
        let mut s = session(&backend);
        s.open(PATH, OpenOptions::default()).unwrap();

        device.push_report(&[1, 0x4E, 0, 0, 0]);
        s.read().unwrap();
        device.push_report(&[1, 0x4D]);
        let err = s.read().unwrap_err();
        assert!(err.is_read_failure());
        assert!(matches!(
            err,
            SessionError::Read(ReadError::ShortRead {
                expected: 5,
                actual: 2
            })
        ));
        assert_eq!(first_button(&s).active_usages, vec![0x4E, 0, 0, 0]);
        assert!(s.is_open());
    }

    #[test]
    fn test_write_only_session_cannot_read() {
        let (backend, _device) = setup();
        let mut s = session(&backend);
        let options = OpenOptions {
            read: false,
            write: true,
            ..OpenOptions::default()
        };
        s.open(PATH, options).unwrap();
        assert!(matches!(
            s.read(),
            Err(SessionError::Read(ReadError::NotReadable))
        ));
    }

    #[test]
    fn test_read_async_stops_at_iteration_cap() {
        let (backend, device) = setup();
        let mut s = session(&backend);
        s.open(PATH, OpenOptions::monitor()).unwrap();

        device.push_report(&[1, 0x4C, 0, 0, 0]);
        device.push(MockRead::Pending);
        device.push_report(&[1, 0x4F, 0, 0, 0]);
        device.push_report(&[1, 0, 0, 0, 0]);

        let mut seen = Vec::new();
        let count = s
            .read_async_with(Some(2), &CancelToken::new(), |items| {
                seen.push(first_active_usage(items))
            })
            .unwrap();
        assert_eq!(count, 2);
        assert_eq!(seen, vec![Some(0x4C), Some(0x4F)]);
        assert_eq!(device.pending_reads(), 1);
        assert_eq!(s.state(), SessionState::Ready);
    }

    #[test]
    fn test_read_async_cancel_mid_wait() {
        let (backend, device) = setup();
        let mut s = session(&backend);
        s.open(PATH, OpenOptions::monitor()).unwrap();

        let cancel = CancelToken::new();
        let trigger = cancel.clone();
        let canceller = thread::spawn(move || {
            thread::sleep(Duration::from_millis(60));
            trigger.cancel();
        });

        let started = Instant::now();
        let err = s.read_async(None, &cancel).unwrap_err();
        canceller.join().unwrap();

        assert!(err.is_cancelled());
        assert!(!err.is_read_failure());
        assert!(started.elapsed() < Duration::from_secs(2));
        assert!(s.is_open());
        assert_eq!(s.state(), SessionState::Ready);

        // still usable after cancellation
        cancel.reset();
        device.push_report(&[1, 0x4E, 0, 0, 0]);
        assert_eq!(s.read_async(Some(1), &cancel).unwrap(), 1);
        assert_eq!(first_active_usage(s.input_items().unwrap()), Some(0x4E));
    }

    #[test]
    fn test_read_async_device_failure() {
        let (backend, device) = setup();
        let mut s = session(&backend);
        s.open(PATH, OpenOptions::monitor()).unwrap();

        device.push_report(&[1, 0x4C, 0, 0, 0]);
        device.push(MockRead::Error);
        let err = s.read_async(None, &CancelToken::new()).unwrap_err();
        assert!(matches!(err, SessionError::Read(ReadError::Device(_))));
        assert!(s.is_open());
    }

    #[test]
    fn test_first_active_usage_policy() {
        let button = |usages: Vec<Usage>| {
            DataItem::Button(ButtonItem {
                usage_page: 0x0C,
                usage_min: 0x4C,
                usage_max: 0x4F,
                report_id: 1,
                max_usage_count: usages.len(),
                active_usages: usages,
            })
        };
        // only the first usage of the first button item counts
        let items = vec![button(vec![0x4D, 0x4E]), button(vec![0x4F, 0])];
        assert_eq!(first_active_usage(&items), Some(0x4D));
        let items = vec![button(vec![0, 0]), button(vec![0x4F, 0])];
        assert_eq!(first_active_usage(&items), None);
        assert_eq!(first_active_usage(&[]), None);
    }
}
