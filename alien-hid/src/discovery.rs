//! HID interface enumeration

use hidapi::HidApi;
use tracing::debug;

use crate::identity::TargetDeviceIdentity;

/// One enumerated HID interface
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeviceCandidate {
    pub path: String,
    pub identity: TargetDeviceIdentity,
    pub manufacturer: Option<String>,
    pub product: Option<String>,
    pub interface_number: i32,
}

impl DeviceCandidate {
    /// Product name for display, falling back to "Unknown"
    pub fn display_name(&self) -> &str {
        self.product.as_deref().unwrap_or("Unknown")
    }
}

/// List every interface from the context's last device scan
pub fn enumerate(api: &HidApi) -> Vec<DeviceCandidate> {
    let candidates: Vec<_> = api
        .device_list()
        .map(|info| DeviceCandidate {
            path: info.path().to_string_lossy().into_owned(),
            identity: TargetDeviceIdentity::new(
                info.vendor_id(),
                info.product_id(),
                info.usage_page(),
                info.usage(),
            ),
            manufacturer: info.manufacturer_string().map(str::to_string),
            product: info.product_string().map(str::to_string),
            interface_number: info.interface_number(),
        })
        .collect();
    debug!("Enumerated {} HID interfaces", candidates.len());
    candidates
}

/// First candidate whose identity equals `target`
pub fn find_target<'a>(
    candidates: &'a [DeviceCandidate],
    target: &TargetDeviceIdentity,
) -> Option<&'a DeviceCandidate> {
    candidates.iter().find(|c| c.identity == *target)
}
