//! HID report descriptor parsing
//!
//! Turns the raw descriptor bytes returned by the device into a flat list
//! of report fields, one per Input/Output/Feature main item. The
//! [`PreparsedData`](crate::PreparsedData) capability queries are answered
//! from these fields.

mod items;
mod parser;

pub use items::{global_tag, local_tag, main_tag, Item, ItemType, ItemTokenizer};
pub use parser::{parse, ParsedDescriptor};

use crate::types::{ReportKind, Usage, UsagePage};
use thiserror::Error;

/// Errors from parsing a report descriptor
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DescriptorError {
    #[error("Report descriptor is empty")]
    Empty,

    #[error("Truncated item at offset {offset}")]
    Truncated { offset: usize },

    #[error("Pop without matching Push at offset {offset}")]
    PopWithoutPush { offset: usize },

    #[error("End Collection without open collection at offset {offset}")]
    UnbalancedCollection { offset: usize },

    #[error("{open} collection(s) left open at end of descriptor")]
    UnclosedCollection { open: usize },

    #[error("Main item at offset {offset} has no {missing}")]
    MissingGlobal { offset: usize, missing: &'static str },

    #[error("Report ID 0 is reserved (offset {offset})")]
    ReservedReportId { offset: usize },

    #[error("Report Size {size} at offset {offset} is outside 1..=32 bits")]
    InvalidReportSize { offset: usize, size: u32 },

    #[error("{kind} report {report_id} exceeds 65535 bytes (offset {offset})")]
    ReportTooLong {
        offset: usize,
        kind: ReportKind,
        report_id: u8,
    },
}

/// Largest report, in bytes including the report ID, a descriptor may declare
pub const MAX_REPORT_LENGTH: usize = u16::MAX as usize;

/// Quick scan for Report ID items without building fields
///
/// Malformed descriptors scan as far as they tokenize.
pub fn declares_report_ids(descriptor: &[u8]) -> bool {
    ItemTokenizer::new(descriptor)
        .map_while(Result::ok)
        .any(|item| item.item_type == ItemType::Global && item.tag == global_tag::REPORT_ID)
}

/// Main item data flags (HID 1.11 section 6.2.2.5)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct FieldFlags(pub u32);

impl FieldFlags {
    pub const CONSTANT: u32 = 1 << 0;
    pub const VARIABLE: u32 = 1 << 1;
    pub const RELATIVE: u32 = 1 << 2;
    pub const NULL_STATE: u32 = 1 << 6;

    pub fn is_constant(self) -> bool {
        self.0 & Self::CONSTANT != 0
    }

    pub fn is_variable(self) -> bool {
        self.0 & Self::VARIABLE != 0
    }

    pub fn is_array(self) -> bool {
        !self.is_variable()
    }

    pub fn is_relative(self) -> bool {
        self.0 & Self::RELATIVE != 0
    }

    pub fn has_null_state(self) -> bool {
        self.0 & Self::NULL_STATE != 0
    }
}

/// A usage or usage range declared for a main item
///
/// An inverted range (`min > max`) is kept as declared; it maps no usages.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UsageSpan {
    pub usage_page: UsagePage,
    pub min: Usage,
    pub max: Usage,
    pub is_range: bool,
}

impl UsageSpan {
    pub fn single(usage_page: UsagePage, usage: Usage) -> Self {
        Self {
            usage_page,
            min: usage,
            max: usage,
            is_range: false,
        }
    }

    /// Number of usages covered; zero for an inverted range
    pub fn len(&self) -> u32 {
        if self.min > self.max {
            0
        } else {
            (self.max - self.min) as u32 + 1
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// One Input, Output or Feature main item
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReportField {
    pub kind: ReportKind,
    pub report_id: u8,
    /// Bit position in the report buffer, counting the report ID byte
    pub bit_offset: u32,
    pub bit_size: u32,
    pub count: u32,
    pub flags: FieldFlags,
    pub usages: Vec<UsageSpan>,
    pub logical_min: i32,
    pub logical_max: i32,
    /// Equal to the logical extents when the descriptor leaves both at zero
    pub physical_min: i32,
    pub physical_max: i32,
    /// Usage of the innermost enclosing collection
    pub link_usage_page: UsagePage,
    pub link_usage: Usage,
}

impl ReportField {
    /// Buttons are array items and single-bit variable items
    pub fn is_button(&self) -> bool {
        self.flags.is_array() || self.bit_size == 1
    }

    /// Total usages declared across all spans
    fn declared_usages(&self) -> u32 {
        self.usages.iter().map(UsageSpan::len).sum()
    }

    /// The usage at position `index` of the flattened usage list
    pub fn usage_at(&self, mut index: u32) -> Option<(UsagePage, Usage)> {
        for span in &self.usages {
            let len = span.len();
            if index < len {
                return Some((span.usage_page, span.min + index as u16));
            }
            index -= len;
        }
        None
    }

    /// Usage reported by variable element `element`
    ///
    /// Elements past the end of the usage list repeat the last usage.
    pub fn element_usage(&self, element: u32) -> Option<(UsagePage, Usage)> {
        let declared = self.declared_usages();
        if declared == 0 {
            return None;
        }
        self.usage_at(element.min(declared - 1))
    }

    /// Element index carrying `(page, usage)` in a variable field
    pub fn element_for(&self, page: UsagePage, usage: Usage) -> Option<u32> {
        (0..self.count).find(|&i| self.element_usage(i) == Some((page, usage)))
    }

    /// Whether any span of this field is on `page`; page 0 matches all
    pub fn on_page(&self, page: UsagePage) -> bool {
        page == 0 || self.usages.iter().any(|s| s.usage_page == page)
    }

    /// Extract element `element` as an unsigned value (low 32 bits)
    pub fn raw_element(&self, report: &[u8], element: u32) -> u32 {
        let start = self
            .bit_offset
            .saturating_add(element.saturating_mul(self.bit_size));
        extract_bits(report, start, self.bit_size.min(32))
    }

    /// Extract element `element`, sign-extended when the logical range is signed
    pub fn signed_element(&self, report: &[u8], element: u32) -> i32 {
        let raw = self.raw_element(report, element);
        let bits = self.bit_size.min(32);
        if self.logical_min < 0 && bits < 32 {
            let shift = 32 - bits;
            ((raw << shift) as i32) >> shift
        } else {
            raw as i32
        }
    }
}

/// Read `bit_size` bits starting at `bit_offset`, LSB first
///
/// Bits beyond the end of `report` read as zero.
pub fn extract_bits(report: &[u8], bit_offset: u32, bit_size: u32) -> u32 {
    let mut value = 0u32;
    for i in 0..bit_size {
        let bit = bit_offset.saturating_add(i);
        let byte = report.get((bit / 8) as usize).copied().unwrap_or(0);
        if byte >> (bit % 8) & 1 != 0 {
            value |= 1 << i;
        }
    }
    value
}

#[cfg(test)]
mod tests {
    use super::*;

    fn field(bit_offset: u32, bit_size: u32, count: u32, usages: Vec<UsageSpan>) -> ReportField {
        ReportField {
            kind: ReportKind::Input,
            report_id: 0,
            bit_offset,
            bit_size,
            count,
            flags: FieldFlags(FieldFlags::VARIABLE),
            usages,
            logical_min: 0,
            logical_max: 1,
            physical_min: 0,
            physical_max: 1,
            link_usage_page: 0,
            link_usage: 0,
        }
    }

    #[test]
    fn test_declares_report_ids() {
        assert!(declares_report_ids(&[0x05, 0x0C, 0x85, 0x01]));
        assert!(!declares_report_ids(&[0x05, 0x0C, 0x09, 0x01]));
        // truncated tail is ignored
        assert!(!declares_report_ids(&[0x05, 0x0C, 0x26]));
    }

    #[test]
    fn test_extract_bits() {
        let report = [0x00, 0b1010_0110, 0xFF];
        assert_eq!(extract_bits(&report, 8, 1), 0);
        assert_eq!(extract_bits(&report, 9, 1), 1);
        assert_eq!(extract_bits(&report, 9, 3), 0b011);
        assert_eq!(extract_bits(&report, 12, 8), 0xFA);
        // past the end reads zero
        assert_eq!(extract_bits(&report, 20, 8), 0x0F);
    }

    #[test]
    fn test_span_len() {
        assert_eq!(UsageSpan::single(0x0C, 0xE9).len(), 1);
        let range = UsageSpan {
            usage_page: 0x07,
            min: 0xE0,
            max: 0xE7,
            is_range: true,
        };
        assert_eq!(range.len(), 8);
        let inverted = UsageSpan {
            min: 9,
            max: 5,
            ..range
        };
        assert!(inverted.is_empty());
    }

    #[test]
    fn test_element_usage_repeats_last() {
        let f = field(
            8,
            1,
            4,
            vec![UsageSpan::single(0x09, 1), UsageSpan::single(0x09, 2)],
        );
        assert_eq!(f.element_usage(0), Some((0x09, 1)));
        assert_eq!(f.element_usage(1), Some((0x09, 2)));
        assert_eq!(f.element_usage(3), Some((0x09, 2)));
        assert_eq!(f.element_for(0x09, 2), Some(1));
        assert_eq!(f.element_for(0x09, 3), None);
    }

    #[test]
    fn test_signed_element() {
        let mut f = field(8, 8, 1, vec![UsageSpan::single(0x01, 0x30)]);
        f.logical_min = -127;
        f.logical_max = 127;
        assert_eq!(f.signed_element(&[0, 0x81], 0), -127);
        f.logical_min = 0;
        assert_eq!(f.signed_element(&[0, 0x81], 0), 0x81);
    }
}
