//! Device identity

use std::fmt;

use crate::types::{Usage, UsagePage};

/// Identifies one HID interface by vendor, product and top-level usage
///
/// Two identities are equal when all four fields are equal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct TargetDeviceIdentity {
    pub vendor_id: u16,
    pub product_id: u16,
    pub usage_page: UsagePage,
    pub usage: Usage,
}

impl TargetDeviceIdentity {
    pub const fn new(vendor_id: u16, product_id: u16, usage_page: UsagePage, usage: Usage) -> Self {
        Self {
            vendor_id,
            product_id,
            usage_page,
            usage,
        }
    }
}

impl fmt::Display for TargetDeviceIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{:04x}:{:04x} (page 0x{:04X}, usage 0x{:04X})",
            self.vendor_id, self.product_id, self.usage_page, self.usage
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_equality_uses_all_fields() {
        let a = TargetDeviceIdentity::new(0x0D62, 0x1A1C, 0x0C, 0x01);
        assert_eq!(a, TargetDeviceIdentity::new(0x0D62, 0x1A1C, 0x0C, 0x01));
        assert_ne!(a, TargetDeviceIdentity::new(0x0D62, 0x1A1C, 0x0C, 0x02));
        assert_ne!(a, TargetDeviceIdentity::new(0x0D62, 0x1A1D, 0x0C, 0x01));
    }

    #[test]
    fn test_swapped_fields_hash_apart() {
        // vendor/product and page/usage swaps must not collapse in a set
        let mut set = HashSet::new();
        set.insert(TargetDeviceIdentity::new(0x0001, 0x0002, 0x0C, 0x01));
        set.insert(TargetDeviceIdentity::new(0x0002, 0x0001, 0x0C, 0x01));
        set.insert(TargetDeviceIdentity::new(0x0001, 0x0002, 0x01, 0x0C));
        assert_eq!(set.len(), 3);
    }

    #[test]
    fn test_display() {
        let id = TargetDeviceIdentity::new(0x0D62, 0x1A1C, 0x0C, 0x01);
        assert_eq!(id.to_string(), "0d62:1a1c (page 0x000C, usage 0x0001)");
    }
}
