//! Device and session error types

use thiserror::Error;

use crate::caps::CapabilityError;
use crate::decoder::DecodeError;
use crate::descriptor::DescriptorError;

/// Errors reported by a device backend
#[derive(Error, Debug)]
pub enum BackendError {
    #[error("Device not found: {0}")]
    DeviceNotFound(String),

    #[error("HID error: {0}")]
    HidError(String),

    #[error("HID permission denied: {0}")]
    HidPermissionDenied(String),

    #[error("Invalid device path: {0}")]
    InvalidPath(String),

    #[error("Device disconnected")]
    Disconnected,
}

impl From<hidapi::HidError> for BackendError {
    fn from(e: hidapi::HidError) -> Self {
        let msg = e.to_string();
        if msg.contains("Permission denied") || msg.contains("EACCES") || msg.contains("EPERM") {
            BackendError::HidPermissionDenied(msg)
        } else {
            BackendError::HidError(msg)
        }
    }
}

/// Errors from reading a report
#[derive(Error, Debug)]
pub enum ReadError {
    #[error("Short read: expected {expected} bytes, got {actual}")]
    ShortRead { expected: usize, actual: usize },

    #[error("Session was not opened for reading")]
    NotReadable,

    #[error("Device has no input reports")]
    NoInputReports,

    #[error("Device read failed: {0}")]
    Device(#[source] BackendError),

    #[error("Failed to start read worker: {0}")]
    Spawn(#[source] std::io::Error),

    #[error("Read worker panicked")]
    WorkerPanicked,
}

/// Errors from a device session
#[derive(Error, Debug)]
pub enum SessionError {
    #[error("Failed to open {path}: {source}")]
    Open {
        path: String,
        #[source]
        source: BackendError,
    },

    #[error("Failed to query device capabilities: {0}")]
    Descriptor(#[from] DescriptorError),

    #[error("Failed to build capability model: {0}")]
    Capability(#[from] CapabilityError),

    #[error("Failed to query device: {0}")]
    Query(#[source] BackendError),

    #[error("Read failed: {0}")]
    Read(#[from] ReadError),

    /// A report was read but could not be decoded; counts as a failed read
    #[error("Read failed: {0}")]
    Decode(#[from] DecodeError),

    #[error("Read cancelled")]
    Cancelled,

    #[error("Device is not open")]
    NotOpen,
}

impl SessionError {
    /// True for user-requested cancellation, which is not a device fault
    pub fn is_cancelled(&self) -> bool {
        matches!(self, SessionError::Cancelled)
    }

    /// True for any failure of an individual read (including decode errors)
    pub fn is_read_failure(&self) -> bool {
        matches!(self, SessionError::Read(_) | SessionError::Decode(_))
    }

    /// True when the session could not be opened or its capabilities built
    pub fn is_open_failure(&self) -> bool {
        matches!(
            self,
            SessionError::Open { .. }
                | SessionError::Descriptor(_)
                | SessionError::Capability(_)
                | SessionError::Query(_)
        )
    }
}
