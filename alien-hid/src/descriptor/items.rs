//! Report descriptor item tokenizer
//!
//! Splits a raw HID report descriptor into short and long items
//! (HID 1.11 section 6.2.2.2).

use super::DescriptorError;

/// Item type field of a short item header
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ItemType {
    Main,
    Global,
    Local,
    Reserved,
}

/// Main item tags
pub mod main_tag {
    pub const INPUT: u8 = 0x8;
    pub const OUTPUT: u8 = 0x9;
    pub const COLLECTION: u8 = 0xA;
    pub const FEATURE: u8 = 0xB;
    pub const END_COLLECTION: u8 = 0xC;
}

/// Global item tags
pub mod global_tag {
    pub const USAGE_PAGE: u8 = 0x0;
    pub const LOGICAL_MINIMUM: u8 = 0x1;
    pub const LOGICAL_MAXIMUM: u8 = 0x2;
    pub const PHYSICAL_MINIMUM: u8 = 0x3;
    pub const PHYSICAL_MAXIMUM: u8 = 0x4;
    pub const UNIT_EXPONENT: u8 = 0x5;
    pub const UNIT: u8 = 0x6;
    pub const REPORT_SIZE: u8 = 0x7;
    pub const REPORT_ID: u8 = 0x8;
    pub const REPORT_COUNT: u8 = 0x9;
    pub const PUSH: u8 = 0xA;
    pub const POP: u8 = 0xB;
}

/// Local item tags
pub mod local_tag {
    pub const USAGE: u8 = 0x0;
    pub const USAGE_MINIMUM: u8 = 0x1;
    pub const USAGE_MAXIMUM: u8 = 0x2;
    pub const DELIMITER: u8 = 0xA;
}

/// Long items are flagged by this header byte
const LONG_ITEM_PREFIX: u8 = 0xFE;

/// One tokenized item, borrowing its data from the descriptor
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Item<'a> {
    pub item_type: ItemType,
    pub tag: u8,
    pub data: &'a [u8],
    /// Byte offset of the item header in the descriptor
    pub offset: usize,
}

impl Item<'_> {
    /// Data as an unsigned little-endian value
    pub fn unsigned(&self) -> u32 {
        self.data
            .iter()
            .rev()
            .fold(0u32, |acc, &b| (acc << 8) | b as u32)
    }

    /// Data as a sign-extended little-endian value
    pub fn signed(&self) -> i32 {
        match self.data.len() {
            0 => 0,
            1 => self.data[0] as i8 as i32,
            2 => i16::from_le_bytes([self.data[0], self.data[1]]) as i32,
            _ => self.unsigned() as i32,
        }
    }
}

/// Iterator over the items of a report descriptor
///
/// Yields an error (and then stops) when an item runs past the end of
/// the descriptor.
pub struct ItemTokenizer<'a> {
    descriptor: &'a [u8],
    position: usize,
    failed: bool,
}

impl<'a> ItemTokenizer<'a> {
    pub fn new(descriptor: &'a [u8]) -> Self {
        Self {
            descriptor,
            position: 0,
            failed: false,
        }
    }

    fn truncated(&mut self, offset: usize) -> Option<Result<Item<'a>, DescriptorError>> {
        self.failed = true;
        Some(Err(DescriptorError::Truncated { offset }))
    }
}

impl<'a> Iterator for ItemTokenizer<'a> {
    type Item = Result<Item<'a>, DescriptorError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.failed {
            return None;
        }
        let offset = self.position;
        let header = *self.descriptor.get(offset)?;

        if header == LONG_ITEM_PREFIX {
            // Long items carry vendor data only; keep them as Reserved
            let Some(&size) = self.descriptor.get(offset + 1) else {
                return self.truncated(offset);
            };
            let Some(&tag) = self.descriptor.get(offset + 2) else {
                return self.truncated(offset);
            };
            let start = offset + 3;
            let Some(data) = self.descriptor.get(start..start + size as usize) else {
                return self.truncated(offset);
            };
            self.position = start + size as usize;
            return Some(Ok(Item {
                item_type: ItemType::Reserved,
                tag,
                data,
                offset,
            }));
        }

        let size = match header & 0x03 {
            3 => 4,
            n => n as usize,
        };
        let item_type = match (header >> 2) & 0x03 {
            0 => ItemType::Main,
            1 => ItemType::Global,
            2 => ItemType::Local,
            _ => ItemType::Reserved,
        };
        let tag = header >> 4;

        let start = offset + 1;
        let Some(data) = self.descriptor.get(start..start + size) else {
            return self.truncated(offset);
        };
        self.position = start + size;

        Some(Ok(Item {
            item_type,
            tag,
            data,
            offset,
        }))
    }
}
