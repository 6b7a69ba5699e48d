//! HID capability model, report decoding and device sessions
//!
//! This crate turns a HID interface's report descriptor into a fixed
//! per-usage data model and keeps it current from raw input reports:
//!
//! - [`PreparsedData`] parses the report descriptor and answers capability
//!   and report queries (usages asserted, raw and scaled values)
//! - [`caps`] builds the ordered [`DataItem`] layout for each report kind
//! - [`decoder`] fills that layout from one report buffer
//! - [`DeviceSession`] owns an opened device and reads reports, either
//!   blocking or on a cancellable worker thread
//!
//! Devices are reached through the [`HidBackend`] seam; [`HidapiBackend`]
//! is the hidapi implementation.

pub mod backend;
pub mod cancel;
pub mod caps;
pub mod decoder;
pub mod descriptor;
pub mod error;
pub mod identity;
pub mod preparsed;
pub mod session;
pub mod types;

mod discovery;
mod hidapi_backend;

#[cfg(any(test, feature = "mock"))]
pub mod mock;

pub use backend::{DeviceAttributes, HidBackend, HidHandle, OpenOptions, ReadProgress};
pub use cancel::CancelToken;
pub use caps::{
    build_items, ButtonCapability, ButtonItem, CapabilityError, DataItem, ValueCapability,
    ValueItem,
};
pub use decoder::{decode_report, DecodeError};
pub use descriptor::DescriptorError;
pub use discovery::{enumerate, find_target, DeviceCandidate};
pub use error::{BackendError, ReadError, SessionError};
pub use hidapi_backend::HidapiBackend;
pub use identity::TargetDeviceIdentity;
pub use preparsed::{CapabilityQuery, HidpStatus, PreparsedData};
pub use session::{
    first_active_usage, DeviceSession, ReportLayout, SessionState, DEFAULT_WAIT_TIMEOUT,
};
pub use types::{ReportKind, ReportShape, TopLevelUsage, Usage, UsagePage};
