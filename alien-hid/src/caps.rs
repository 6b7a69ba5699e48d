//! Capability model
//!
//! Builds the flat, ordered list of [`DataItem`]s for one report kind from
//! the device's button and value capabilities. The layout is fixed at open
//! time and is what the report decoder fills in on every read:
//!
//! 1. one [`ButtonItem`] per button capability, in capability order, with
//!    usage ranges kept as ranges;
//! 2. one [`ValueItem`] per usage, with ranged value capabilities expanded
//!    so every usage in the range gets its own item.

use thiserror::Error;
use tracing::debug;

use crate::preparsed::{CapabilityQuery, HidpStatus};
use crate::types::{ReportKind, ReportShape, Usage, UsagePage};

/// Button capability: one usage or usage range of an on/off control
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ButtonCapability {
    pub usage_page: UsagePage,
    pub report_id: u8,
    pub is_range: bool,
    pub usage_min: Usage,
    pub usage_max: Usage,
    pub link_usage_page: UsagePage,
    pub link_usage: Usage,
}

/// Value capability: one usage or usage range of a multi-bit control
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ValueCapability {
    pub usage_page: UsagePage,
    pub report_id: u8,
    pub is_range: bool,
    pub usage_min: Usage,
    pub usage_max: Usage,
    pub bit_size: u32,
    pub report_count: u32,
    pub logical_min: i32,
    pub logical_max: i32,
    pub physical_min: i32,
    pub physical_max: i32,
    pub has_null: bool,
    pub link_usage_page: UsagePage,
    pub link_usage: Usage,
}

/// Decoded state of one button capability
///
/// `active_usages` always has `max_usage_count` slots. Usages asserted in
/// the last matching report are compacted to the front; the rest are 0.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ButtonItem {
    pub usage_page: UsagePage,
    pub usage_min: Usage,
    pub usage_max: Usage,
    pub report_id: u8,
    pub max_usage_count: usize,
    pub active_usages: Vec<Usage>,
}

impl ButtonItem {
    /// Asserted usages, without the zero padding
    pub fn pressed(&self) -> impl Iterator<Item = Usage> + '_ {
        self.active_usages.iter().copied().take_while(|&u| u != 0)
    }

    pub fn contains(&self, usage: Usage) -> bool {
        (self.usage_min..=self.usage_max).contains(&usage)
    }
}

/// Decoded state of one value usage
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValueItem {
    pub usage_page: UsagePage,
    pub usage: Usage,
    pub report_id: u8,
    pub raw_value: u32,
    pub scaled_value: i32,
    /// False until a report carrying this value has been decoded
    pub has_value: bool,
}

/// One slot of the decode layout
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DataItem {
    Button(ButtonItem),
    Value(ValueItem),
}

impl DataItem {
    pub fn report_id(&self) -> u8 {
        match self {
            DataItem::Button(b) => b.report_id,
            DataItem::Value(v) => v.report_id,
        }
    }

    pub fn usage_page(&self) -> UsagePage {
        match self {
            DataItem::Button(b) => b.usage_page,
            DataItem::Value(v) => v.usage_page,
        }
    }

    pub fn as_button(&self) -> Option<&ButtonItem> {
        match self {
            DataItem::Button(b) => Some(b),
            DataItem::Value(_) => None,
        }
    }

    pub fn as_value(&self) -> Option<&ValueItem> {
        match self {
            DataItem::Value(v) => Some(v),
            DataItem::Button(_) => None,
        }
    }
}

/// Errors from building the capability model
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CapabilityError {
    #[error("{kind} {query} query failed: {status}")]
    Query {
        kind: ReportKind,
        query: &'static str,
        status: HidpStatus,
    },

    #[error("{kind} {query} query returned {actual} capabilities, shape declares {expected}")]
    CountMismatch {
        kind: ReportKind,
        query: &'static str,
        expected: usize,
        actual: usize,
    },

    #[error(
        "{kind} value capability on page 0x{usage_page:04X} has inverted usage range 0x{usage_min:04X}..0x{usage_max:04X}"
    )]
    RangeInversion {
        kind: ReportKind,
        usage_page: UsagePage,
        usage_min: Usage,
        usage_max: Usage,
    },
}

/// Number of value items a set of value capabilities expands to
pub fn expanded_value_count(
    kind: ReportKind,
    caps: &[ValueCapability],
) -> Result<usize, CapabilityError> {
    caps.iter().try_fold(0usize, |total, cap| {
        if !cap.is_range {
            return Ok(total + 1);
        }
        if cap.usage_min > cap.usage_max {
            return Err(CapabilityError::RangeInversion {
                kind,
                usage_page: cap.usage_page,
                usage_min: cap.usage_min,
                usage_max: cap.usage_max,
            });
        }
        Ok(total + (cap.usage_max - cap.usage_min) as usize + 1)
    })
}

/// First pass: one button item per button capability, ranges kept intact
pub fn button_items<Q: CapabilityQuery + ?Sized>(
    query: &Q,
    kind: ReportKind,
    caps: &[ButtonCapability],
) -> Vec<DataItem> {
    caps.iter()
        .map(|cap| {
            let max_usage_count = query.max_usage_list_length(kind, cap.usage_page);
            DataItem::Button(ButtonItem {
                usage_page: cap.usage_page,
                usage_min: cap.usage_min,
                usage_max: cap.usage_max,
                report_id: cap.report_id,
                max_usage_count,
                active_usages: vec![0; max_usage_count],
            })
        })
        .collect()
}

/// Second pass: one value item per usage, ranges expanded
pub fn value_items(caps: &[ValueCapability]) -> Vec<DataItem> {
    let mut items = Vec::new();
    for cap in caps {
        let usages = if cap.is_range {
            cap.usage_min..=cap.usage_max
        } else {
            cap.usage_min..=cap.usage_min
        };
        for usage in usages {
            items.push(DataItem::Value(ValueItem {
                usage_page: cap.usage_page,
                usage,
                report_id: cap.report_id,
                raw_value: 0,
                scaled_value: 0,
                has_value: false,
            }));
        }
    }
    items
}

/// Build the decode layout for one report kind
///
/// Returns all button items followed by all (expanded) value items. The
/// total length is `shape.button_caps` plus the expanded value count.
pub fn build_items<Q: CapabilityQuery + ?Sized>(
    query: &Q,
    kind: ReportKind,
    shape: &ReportShape,
) -> Result<Vec<DataItem>, CapabilityError> {
    let buttons = query
        .button_caps(kind)
        .map_err(|status| CapabilityError::Query {
            kind,
            query: "button capability",
            status,
        })?;
    if buttons.len() != shape.button_caps {
        return Err(CapabilityError::CountMismatch {
            kind,
            query: "button capability",
            expected: shape.button_caps,
            actual: buttons.len(),
        });
    }

    let values = query
        .value_caps(kind)
        .map_err(|status| CapabilityError::Query {
            kind,
            query: "value capability",
            status,
        })?;
    if values.len() != shape.value_caps {
        return Err(CapabilityError::CountMismatch {
            kind,
            query: "value capability",
            expected: shape.value_caps,
            actual: values.len(),
        });
    }

    let value_count = expanded_value_count(kind, &values)?;

    let mut items = button_items(query, kind, &buttons);
    items.reserve(value_count);
    items.extend(value_items(&values));

    debug!(
        "Built {} layout: {} button items, {} value items",
        kind,
        buttons.len(),
        value_count
    );
    Ok(items)
}
