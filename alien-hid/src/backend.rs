//! Device backend abstraction
//!
//! A backend opens HID interfaces by path and hands out [`HidHandle`]s.
//! Handles offer a blocking read and an overlapped read made of
//! `submit_read` followed by bounded `wait_read` calls, which is what the
//! session's worker loop uses so it can notice cancellation between waits.

use std::time::Duration;

use crate::error::BackendError;

/// How a device is opened
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OpenOptions {
    pub read: bool,
    pub write: bool,
    /// Open for overlapped (pollable) reads
    pub overlapped: bool,
    /// Request exclusive access
    pub exclusive: bool,
}

impl Default for OpenOptions {
    fn default() -> Self {
        Self {
            read: true,
            write: false,
            overlapped: false,
            exclusive: false,
        }
    }
}

impl OpenOptions {
    /// Read-only, overlapped, shared: the mode the macro monitor uses
    pub fn monitor() -> Self {
        Self {
            overlapped: true,
            ..Self::default()
        }
    }

    /// Same access with overlapped I/O turned off
    pub fn synchronous(self) -> Self {
        Self {
            overlapped: false,
            ..self
        }
    }
}

/// USB attributes of an opened interface
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct DeviceAttributes {
    pub vendor_id: u16,
    pub product_id: u16,
    pub version: u16,
}

/// Progress of an overlapped read
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReadProgress {
    /// The read finished with this many bytes in the buffer
    Complete(usize),
    /// Nothing arrived yet
    Pending,
}

/// An opened HID interface
///
/// Report buffers passed to the read methods always receive the report ID
/// in byte 0, including devices that do not number their reports.
pub trait HidHandle: Send {
    fn attributes(&self) -> Result<DeviceAttributes, BackendError>;

    fn manufacturer(&self) -> Option<String>;

    fn product(&self) -> Option<String>;

    /// Raw report descriptor of the interface
    fn report_descriptor(&self) -> Result<Vec<u8>, BackendError>;

    /// Block until one report is read
    fn read(&mut self, buf: &mut [u8]) -> Result<usize, BackendError>;

    /// Start an overlapped read; may complete immediately
    fn submit_read(&mut self, buf: &mut [u8]) -> Result<ReadProgress, BackendError>;

    /// Wait up to `timeout` for the outstanding read to complete
    fn wait_read(&mut self, buf: &mut [u8], timeout: Duration)
        -> Result<ReadProgress, BackendError>;

    /// Abandon the outstanding overlapped read
    fn cancel_read(&mut self) {}
}

/// Opens HID interfaces by platform path
pub trait HidBackend: Send + Sync {
    fn open(&self, path: &str, options: &OpenOptions) -> Result<Box<dyn HidHandle>, BackendError>;
}
