//! Scripted in-memory backend
//!
//! Lets sessions be opened and read without hardware. Each device has a
//! script of read outcomes that both the blocking and the overlapped read
//! paths consume in order.

use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;

use crate::backend::{DeviceAttributes, HidBackend, HidHandle, OpenOptions, ReadProgress};
use crate::error::BackendError;

/// One scripted read outcome
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MockRead {
    /// Bytes delivered to the reader (report ID first)
    Report(Vec<u8>),
    /// One wait period passes with nothing read
    Pending,
    /// The device fails the read
    Error,
}

struct DeviceInner {
    descriptor: Vec<u8>,
    attributes: DeviceAttributes,
    strings: Mutex<(Option<String>, Option<String>)>,
    script: Mutex<VecDeque<MockRead>>,
    open_handles: AtomicUsize,
    open_log: Mutex<Vec<OpenOptions>>,
    deny_open: AtomicBool,
}

/// A scripted device; clones share state
#[derive(Clone)]
pub struct MockDevice {
    inner: Arc<DeviceInner>,
}

impl MockDevice {
    pub fn new(descriptor: &[u8], vendor_id: u16, product_id: u16) -> Self {
        Self {
            inner: Arc::new(DeviceInner {
                descriptor: descriptor.to_vec(),
                attributes: DeviceAttributes {
                    vendor_id,
                    product_id,
                    version: 0x0100,
                },
                strings: Mutex::new((None, None)),
                script: Mutex::new(VecDeque::new()),
                open_handles: AtomicUsize::new(0),
                open_log: Mutex::new(Vec::new()),
                deny_open: AtomicBool::new(false),
            }),
        }
    }

    pub fn set_strings(&self, manufacturer: &str, product: &str) {
        *self.inner.strings.lock() = (Some(manufacturer.to_string()), Some(product.to_string()));
    }

    pub fn push(&self, read: MockRead) {
        self.inner.script.lock().push_back(read);
    }

    pub fn push_report(&self, bytes: &[u8]) {
        self.push(MockRead::Report(bytes.to_vec()));
    }

    /// Reads not yet consumed
    pub fn pending_reads(&self) -> usize {
        self.inner.script.lock().len()
    }

    /// Handles currently open on this device
    pub fn open_handles(&self) -> usize {
        self.inner.open_handles.load(Ordering::SeqCst)
    }

    /// Options of every successful open, in order
    pub fn open_log(&self) -> Vec<OpenOptions> {
        self.inner.open_log.lock().clone()
    }

    /// Make opens fail with a permission error
    pub fn deny_open(&self, deny: bool) {
        self.inner.deny_open.store(deny, Ordering::SeqCst);
    }

    fn next_read(&self) -> Option<MockRead> {
        self.inner.script.lock().pop_front()
    }
}

/// Backend serving [`MockDevice`]s by path
#[derive(Default)]
pub struct MockBackend {
    devices: Mutex<HashMap<String, MockDevice>>,
}

impl MockBackend {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&self, path: &str, device: MockDevice) {
        self.devices.lock().insert(path.to_string(), device);
    }
}

impl HidBackend for MockBackend {
    fn open(&self, path: &str, options: &OpenOptions) -> Result<Box<dyn HidHandle>, BackendError> {
        let device = self
            .devices
            .lock()
            .get(path)
            .cloned()
            .ok_or_else(|| BackendError::DeviceNotFound(path.to_string()))?;
        if device.inner.deny_open.load(Ordering::SeqCst) {
            return Err(BackendError::HidPermissionDenied(path.to_string()));
        }
        device.inner.open_log.lock().push(*options);
        device.inner.open_handles.fetch_add(1, Ordering::SeqCst);
        Ok(Box::new(MockHandle { device }))
    }
}

struct MockHandle {
    device: MockDevice,
}

impl MockHandle {
    fn deliver(buf: &mut [u8], bytes: &[u8]) -> usize {
        let n = bytes.len().min(buf.len());
        buf[..n].copy_from_slice(&bytes[..n]);
        n
    }
}

impl Drop for MockHandle {
    fn drop(&mut self) {
        self.device.inner.open_handles.fetch_sub(1, Ordering::SeqCst);
    }
}

impl HidHandle for MockHandle {
    fn attributes(&self) -> Result<DeviceAttributes, BackendError> {
        Ok(self.device.inner.attributes)
    }

    fn manufacturer(&self) -> Option<String> {
        self.device.inner.strings.lock().0.clone()
    }

    fn product(&self) -> Option<String> {
        self.device.inner.strings.lock().1.clone()
    }

    fn report_descriptor(&self) -> Result<Vec<u8>, BackendError> {
        Ok(self.device.inner.descriptor.clone())
    }

    fn read(&mut self, buf: &mut [u8]) -> Result<usize, BackendError> {
        match self.device.next_read() {
            Some(MockRead::Report(bytes)) => Ok(Self::deliver(buf, &bytes)),
            Some(MockRead::Pending) | Some(MockRead::Error) | None => {
                Err(BackendError::Disconnected)
            }
        }
    }

    fn submit_read(&mut self, buf: &mut [u8]) -> Result<ReadProgress, BackendError> {
        match self.device.next_read() {
            Some(MockRead::Report(bytes)) => Ok(ReadProgress::Complete(Self::deliver(buf, &bytes))),
            Some(MockRead::Error) => Err(BackendError::Disconnected),
            Some(MockRead::Pending) | None => Ok(ReadProgress::Pending),
        }
    }

    fn wait_read(
        &mut self,
        buf: &mut [u8],
        timeout: Duration,
    ) -> Result<ReadProgress, BackendError> {
        match self.device.next_read() {
            Some(MockRead::Report(bytes)) => Ok(ReadProgress::Complete(Self::deliver(buf, &bytes))),
            Some(MockRead::Error) => Err(BackendError::Disconnected),
            Some(MockRead::Pending) | None => {
                std::thread::sleep(timeout);
                Ok(ReadProgress::Pending)
            }
        }
    }
}
