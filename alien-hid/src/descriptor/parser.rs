//! Report descriptor parser
//!
//! Walks the item stream keeping the global state table (with Push/Pop) and
//! the local usage state, and emits a [`ReportField`] for every data main
//! item. Bit offsets are tracked per report kind and report ID, starting
//! after the report ID byte.

use std::collections::HashMap;

use tracing::{debug, warn};

use super::items::{global_tag, local_tag, main_tag, ItemTokenizer, ItemType};
use super::{DescriptorError, FieldFlags, ReportField, UsageSpan, MAX_REPORT_LENGTH};
use crate::types::{ReportKind, TopLevelUsage, Usage, UsagePage};

/// Collection type for application collections
const COLLECTION_APPLICATION: u32 = 0x01;

const MAX_REPORT_BITS: u32 = MAX_REPORT_LENGTH as u32 * 8;

/// Result of parsing a report descriptor
#[derive(Debug, Clone, Default)]
pub struct ParsedDescriptor {
    pub fields: Vec<ReportField>,
    pub top_level: TopLevelUsage,
    /// True when the descriptor declares any Report ID
    pub numbered_reports: bool,
    /// Report lengths in bits (including the ID byte) per kind and report ID
    pub report_bits: HashMap<(ReportKind, u8), u32>,
}

impl ParsedDescriptor {
    /// Byte length of each report of `kind`, keyed by report ID
    pub fn report_lengths(&self, kind: ReportKind) -> HashMap<u8, usize> {
        self.report_bits
            .iter()
            .filter(|((k, _), _)| *k == kind)
            .map(|(&(_, id), &bits)| (id, bits.div_ceil(8) as usize))
            .collect()
    }
}

#[derive(Debug, Clone, Default)]
struct GlobalState {
    usage_page: UsagePage,
    logical_min: i32,
    logical_max: i32,
    logical_max_unsigned: u32,
    physical_min: i32,
    physical_max: i32,
    physical_max_unsigned: u32,
    report_size: Option<u32>,
    report_count: Option<u32>,
    report_id: u8,
}

/// A usage as written, before the page is resolved at the main item
#[derive(Debug, Clone, Copy)]
struct LocalUsage {
    page: Option<UsagePage>,
    id: Usage,
}

impl LocalUsage {
    fn from_data(value: u32, len: usize) -> Self {
        if len == 4 {
            Self {
                page: Some((value >> 16) as UsagePage),
                id: value as Usage,
            }
        } else {
            Self {
                page: None,
                id: value as Usage,
            }
        }
    }
}

#[derive(Debug, Clone, Copy)]
enum LocalEntry {
    Single(LocalUsage),
    Range(LocalUsage, LocalUsage),
}

#[derive(Debug, Default)]
struct LocalState {
    entries: Vec<LocalEntry>,
    usage_min: Option<LocalUsage>,
    usage_max: Option<LocalUsage>,
}

impl LocalState {
    fn push_single(&mut self, usage: LocalUsage) {
        self.entries.push(LocalEntry::Single(usage));
    }

    fn set_min(&mut self, usage: LocalUsage) {
        self.usage_min = Some(usage);
        self.close_range();
    }

    fn set_max(&mut self, usage: LocalUsage) {
        self.usage_max = Some(usage);
        self.close_range();
    }

    fn close_range(&mut self) {
        if let (Some(min), Some(max)) = (self.usage_min, self.usage_max) {
            self.entries.push(LocalEntry::Range(min, max));
            self.usage_min = None;
            self.usage_max = None;
        }
    }

    /// Resolve usages against the current usage page
    fn spans(&self, page: UsagePage) -> Vec<UsageSpan> {
        self.entries
            .iter()
            .map(|entry| match *entry {
                LocalEntry::Single(u) => UsageSpan::single(u.page.unwrap_or(page), u.id),
                LocalEntry::Range(min, max) => UsageSpan {
                    usage_page: min.page.or(max.page).unwrap_or(page),
                    min: min.id,
                    max: max.id,
                    is_range: true,
                },
            })
            .collect()
    }

    fn first(&self, page: UsagePage) -> (UsagePage, Usage) {
        self.spans(page)
            .first()
            .map(|s| (s.usage_page, s.min))
            .unwrap_or((page, 0))
    }
}

/// Logical and physical maxima written with a short positive encoding
/// (`0x25 0xFF`) are unsigned when the matching minimum is non-negative.
fn fix_extent(min: i32, max: i32, max_unsigned: u32) -> i32 {
    if min >= 0 && max < min {
        max_unsigned as i32
    } else {
        max
    }
}

/// Parse a raw report descriptor
pub fn parse(descriptor: &[u8]) -> Result<ParsedDescriptor, DescriptorError> {
    if descriptor.is_empty() {
        return Err(DescriptorError::Empty);
    }

    let mut out = ParsedDescriptor::default();
    let mut global = GlobalState::default();
    let mut global_stack: Vec<GlobalState> = Vec::new();
    let mut local = LocalState::default();
    let mut collections: Vec<(UsagePage, Usage)> = Vec::new();
    let mut top_level_seen = false;

    for item in ItemTokenizer::new(descriptor) {
        let item = item?;
        match item.item_type {
            ItemType::Main => {
                match item.tag {
                    main_tag::INPUT | main_tag::OUTPUT | main_tag::FEATURE => {
                        let kind = match item.tag {
                            main_tag::INPUT => ReportKind::Input,
                            main_tag::OUTPUT => ReportKind::Output,
                            _ => ReportKind::Feature,
                        };
                        let bit_size =
                            global
                                .report_size
                                .ok_or(DescriptorError::MissingGlobal {
                                    offset: item.offset,
                                    missing: "Report Size",
                                })?;
                        let count = global
                            .report_count
                            .ok_or(DescriptorError::MissingGlobal {
                                offset: item.offset,
                                missing: "Report Count",
                            })?;

                        if !(1..=32).contains(&bit_size) {
                            return Err(DescriptorError::InvalidReportSize {
                                offset: item.offset,
                                size: bit_size,
                            });
                        }

                        let bits = out
                            .report_bits
                            .entry((kind, global.report_id))
                            .or_insert(8);
                        let bit_offset = *bits;
                        *bits = bit_size
                            .checked_mul(count)
                            .and_then(|field_bits| bit_offset.checked_add(field_bits))
                            .filter(|&total| total <= MAX_REPORT_BITS)
                            .ok_or(DescriptorError::ReportTooLong {
                                offset: item.offset,
                                kind,
                                report_id: global.report_id,
                            })?;

                        let logical_max = fix_extent(
                            global.logical_min,
                            global.logical_max,
                            global.logical_max_unsigned,
                        );
                        let mut physical_min = global.physical_min;
                        let mut physical_max = fix_extent(
                            global.physical_min,
                            global.physical_max,
                            global.physical_max_unsigned,
                        );
                        if physical_min == 0 && physical_max == 0 {
                            physical_min = global.logical_min;
                            physical_max = logical_max;
                        }

                        let (link_usage_page, link_usage) =
                            collections.last().copied().unwrap_or((0, 0));

                        out.fields.push(ReportField {
                            kind,
                            report_id: global.report_id,
                            bit_offset,
                            bit_size,
                            count,
                            flags: FieldFlags(item.unsigned()),
                            usages: local.spans(global.usage_page),
                            logical_min: global.logical_min,
                            logical_max,
                            physical_min,
                            physical_max,
                            link_usage_page,
                            link_usage,
                        });
                    }
                    main_tag::COLLECTION => {
                        let usage = local.first(global.usage_page);
                        if !top_level_seen
                            && collections.is_empty()
                            && item.unsigned() == COLLECTION_APPLICATION
                        {
                            out.top_level = TopLevelUsage {
                                usage_page: usage.0,
                                usage: usage.1,
                            };
                            top_level_seen = true;
                        }
                        collections.push(usage);
                    }
                    main_tag::END_COLLECTION => {
                        if collections.pop().is_none() {
                            return Err(DescriptorError::UnbalancedCollection {
                                offset: item.offset,
                            });
                        }
                    }
                    tag => warn!("Ignoring unknown main item tag 0x{:X}", tag),
                }
                // Local state applies only to the next main item
                local = LocalState::default();
            }
            ItemType::Global => match item.tag {
                global_tag::USAGE_PAGE => global.usage_page = item.unsigned() as UsagePage,
                global_tag::LOGICAL_MINIMUM => global.logical_min = item.signed(),
                global_tag::LOGICAL_MAXIMUM => {
                    global.logical_max = item.signed();
                    global.logical_max_unsigned = item.unsigned();
                }
                global_tag::PHYSICAL_MINIMUM => global.physical_min = item.signed(),
                global_tag::PHYSICAL_MAXIMUM => {
                    global.physical_max = item.signed();
                    global.physical_max_unsigned = item.unsigned();
                }
                global_tag::REPORT_SIZE => global.report_size = Some(item.unsigned()),
                global_tag::REPORT_COUNT => global.report_count = Some(item.unsigned()),
                global_tag::REPORT_ID => {
                    let id = item.unsigned() as u8;
                    if id == 0 {
                        return Err(DescriptorError::ReservedReportId {
                            offset: item.offset,
                        });
                    }
                    global.report_id = id;
                    out.numbered_reports = true;
                }
                global_tag::PUSH => global_stack.push(global.clone()),
                global_tag::POP => {
                    global = global_stack
                        .pop()
                        .ok_or(DescriptorError::PopWithoutPush {
                            offset: item.offset,
                        })?;
                }
                global_tag::UNIT | global_tag::UNIT_EXPONENT => {}
                tag => debug!("Ignoring global item tag 0x{:X}", tag),
            },
            ItemType::Local => match item.tag {
                local_tag::USAGE => {
                    local.push_single(LocalUsage::from_data(item.unsigned(), item.data.len()))
                }
                local_tag::USAGE_MINIMUM => {
                    local.set_min(LocalUsage::from_data(item.unsigned(), item.data.len()))
                }
                local_tag::USAGE_MAXIMUM => {
                    local.set_max(LocalUsage::from_data(item.unsigned(), item.data.len()))
                }
                local_tag::DELIMITER => {}
                tag => debug!("Ignoring local item tag 0x{:X}", tag),
            },
            ItemType::Reserved => debug!("Skipping reserved item at offset {}", item.offset),
        }
    }

    if !collections.is_empty() {
        return Err(DescriptorError::UnclosedCollection {
            open: collections.len(),
        });
    }

    debug!(
        "Parsed report descriptor: {} fields, numbered reports: {}",
        out.fields.len(),
        out.numbered_reports
    );
    Ok(out)
}
