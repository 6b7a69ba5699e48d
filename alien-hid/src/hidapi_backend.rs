//! hidapi device backend

use std::collections::HashMap;
use std::ffi::CString;
use std::time::Duration;

use hidapi::{HidApi, HidDevice};
use parking_lot::Mutex;
use tracing::debug;

use crate::backend::{DeviceAttributes, HidBackend, HidHandle, OpenOptions, ReadProgress};
use crate::descriptor;
use crate::discovery::{self, DeviceCandidate};
use crate::error::BackendError;
use crate::types::ReportKind;

/// Largest report descriptor the HID class allows
const MAX_REPORT_DESCRIPTOR_SIZE: usize = 4096;

/// Backend over a shared `HidApi` context
pub struct HidapiBackend {
    api: Mutex<HidApi>,
}

impl HidapiBackend {
    pub fn new() -> Result<Self, BackendError> {
        Ok(Self {
            api: Mutex::new(HidApi::new()?),
        })
    }

    /// Rescan and list every HID interface on the system
    ///
    /// Each call replaces the previous scan, so repeated calls are safe.
    pub fn enumerate(&self) -> Result<Vec<DeviceCandidate>, BackendError> {
        let mut api = self.api.lock();
        api.refresh_devices()?;
        Ok(discovery::enumerate(&api))
    }
}

impl HidBackend for HidapiBackend {
    fn open(&self, path: &str, options: &OpenOptions) -> Result<Box<dyn HidHandle>, BackendError> {
        let c_path =
            CString::new(path).map_err(|_| BackendError::InvalidPath(path.to_string()))?;
        if options.exclusive {
            debug!("Exclusive access requested for {}; hidapi opens shared", path);
        }
        let device = self.api.lock().open_path(&c_path)?;
        let handle = HidapiHandle::new(device, *options)?;
        debug!(
            "Opened {} (overlapped: {}, numbered reports: {})",
            path, options.overlapped, handle.numbered
        );
        Ok(Box::new(handle))
    }
}

/// One opened hidapi device
///
/// hidapi drops the report ID byte of unnumbered reports and returns each
/// report at its own length. Reads are re-framed so byte 0 is always the
/// report ID, and complete reports shorter than the buffer are zero-padded
/// to the longest input report.
struct HidapiHandle {
    device: HidDevice,
    descriptor: Vec<u8>,
    numbered: bool,
    input_lengths: HashMap<u8, usize>,
}

impl HidapiHandle {
    fn new(device: HidDevice, options: OpenOptions) -> Result<Self, BackendError> {
        device.set_blocking_mode(!options.overlapped)?;

        let mut buf = vec![0u8; MAX_REPORT_DESCRIPTOR_SIZE];
        let len = device.get_report_descriptor(&mut buf)?;
        buf.truncate(len);

        // A descriptor that fails to parse fails the session open later
        let (numbered, input_lengths) = match descriptor::parse(&buf) {
            Ok(parsed) => (
                parsed.numbered_reports,
                parsed.report_lengths(ReportKind::Input),
            ),
            Err(_) => (descriptor::declares_report_ids(&buf), HashMap::new()),
        };

        Ok(Self {
            device,
            descriptor: buf,
            numbered,
            input_lengths,
        })
    }

    /// Pad a complete report of a shorter report ID to the buffer length
    fn pad(&self, buf: &mut [u8], n: usize) -> usize {
        if n == 0 || n >= buf.len() {
            return n;
        }
        if self.input_lengths.get(&buf[0]) == Some(&n) {
            buf[n..].fill(0);
            buf.len()
        } else {
            n
        }
    }

    /// Read with a hidapi timeout (-1 blocks, 0 polls)
    fn framed_read(&mut self, buf: &mut [u8], timeout_ms: i32) -> Result<usize, BackendError> {
        let n = if self.numbered {
            self.device.read_timeout(buf, timeout_ms)?
        } else {
            let Some((id, data)) = buf.split_first_mut() else {
                return Ok(0);
            };
            match self.device.read_timeout(data, timeout_ms)? {
                0 => 0,
                n => {
                    *id = 0;
                    n + 1
                }
            }
        };
        Ok(self.pad(buf, n))
    }

    fn progress(n: usize) -> ReadProgress {
        if n == 0 {
            ReadProgress::Pending
        } else {
            ReadProgress::Complete(n)
        }
    }
}

impl HidHandle for HidapiHandle {
    fn attributes(&self) -> Result<DeviceAttributes, BackendError> {
        let info = self.device.get_device_info()?;
        Ok(DeviceAttributes {
            vendor_id: info.vendor_id(),
            product_id: info.product_id(),
            version: info.release_number(),
        })
    }

    fn manufacturer(&self) -> Option<String> {
        self.device.get_manufacturer_string().ok().flatten()
    }

    fn product(&self) -> Option<String> {
        self.device.get_product_string().ok().flatten()
    }

    fn report_descriptor(&self) -> Result<Vec<u8>, BackendError> {
        Ok(self.descriptor.clone())
    }

    fn read(&mut self, buf: &mut [u8]) -> Result<usize, BackendError> {
        self.framed_read(buf, -1)
    }

    fn submit_read(&mut self, buf: &mut [u8]) -> Result<ReadProgress, BackendError> {
        self.framed_read(buf, 0).map(Self::progress)
    }

    fn wait_read(
        &mut self,
        buf: &mut [u8],
        timeout: Duration,
    ) -> Result<ReadProgress, BackendError> {
        let ms = timeout.as_millis().min(i32::MAX as u128) as i32;
        self.framed_read(buf, ms).map(Self::progress)
    }
}
