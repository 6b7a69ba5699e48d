// Known macro-key devices
// Identities of HID interfaces that carry dedicated macro keys

use alien_hid::{TargetDeviceIdentity, Usage};

/// Alienware m17 R4 macro-key interface (consumer control collection)
pub const ALIENWARE_M17_R4: TargetDeviceIdentity =
    TargetDeviceIdentity::new(0x0D62, 0x1A1C, 0x000C, 0x0001);

/// Usages reported by the four macro keys (A-D)
pub const MACRO_KEY_A: Usage = 0x4C;
pub const MACRO_KEY_B: Usage = 0x4D;
pub const MACRO_KEY_C: Usage = 0x4E;
pub const MACRO_KEY_D: Usage = 0x4F;

/// Device definition
#[derive(Debug, Clone, Copy)]
pub struct KnownDevice {
    pub identity: TargetDeviceIdentity,
    pub name: &'static str,
    pub display_name: &'static str,
    /// Usages of the macro keys, in key order
    pub macro_keys: &'static [Usage],
}

/// All known devices
/// Add new devices here as they are tested
pub const KNOWN_DEVICES: &[KnownDevice] = &[KnownDevice {
    identity: ALIENWARE_M17_R4,
    name: "aw_m17_r4",
    display_name: "Alienware m17 R4",
    macro_keys: &[MACRO_KEY_A, MACRO_KEY_B, MACRO_KEY_C, MACRO_KEY_D],
}];

/// Find a device definition by identity
pub fn find_known(identity: &TargetDeviceIdentity) -> Option<&'static KnownDevice> {
    KNOWN_DEVICES.iter().find(|d| d.identity == *identity)
}

/// Check if an interface identity is a known macro-key device
pub fn is_known(identity: &TargetDeviceIdentity) -> bool {
    find_known(identity).is_some()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_alienware_is_known() {
        let device = find_known(&ALIENWARE_M17_R4).expect("known");
        assert_eq!(device.display_name, "Alienware m17 R4");
        assert_eq!(device.macro_keys, &[0x4C, 0x4D, 0x4E, 0x4F]);
    }

    #[test]
    fn test_other_interfaces_of_same_device_are_not_known() {
        // keyboard collection of the same USB device
        let keyboard = TargetDeviceIdentity::new(0x0D62, 0x1A1C, 0x0001, 0x0006);
        assert!(!is_known(&keyboard));
    }
}
