//! Parsed capability descriptor and report queries
//!
//! [`PreparsedData`] is the immutable result of parsing an interface's
//! report descriptor. It answers the capability queries the capability
//! model is built from, and extracts button usages and values from raw
//! report buffers. Report buffers always start with the report ID byte
//! (0 for devices without numbered reports).

use thiserror::Error;

use crate::caps::{ButtonCapability, ValueCapability};
use crate::descriptor::{self, DescriptorError, ReportField};
use crate::types::{ReportKind, ReportShape, TopLevelUsage, Usage, UsagePage};

/// Status of a failed capability or report query
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum HidpStatus {
    #[error("invalid preparsed data")]
    InvalidPreparsedData,

    #[error("report length {actual} does not match expected {expected}")]
    InvalidReportLength { expected: usize, actual: usize },

    #[error("report ID {0} is not used by this report kind")]
    IncompatibleReportId(u8),

    #[error("usage not found")]
    UsageNotFound,

    #[error("usage list needs {needed} slots, buffer has {available}")]
    BufferTooSmall { needed: usize, available: usize },

    /// The control reports its null state ("value not present")
    #[error("value is null")]
    Null,

    #[error("invalid logical or physical range")]
    BadLogPhyValues,

    #[error("value out of logical range")]
    ValueOutOfRange,
}

/// Capability and report queries over a parsed interface
///
/// The capability model and the report decoder are written against this
/// trait; [`PreparsedData`] is the real implementation.
pub trait CapabilityQuery {
    /// Report sizes and capability counts for `kind`
    fn shape(&self, kind: ReportKind) -> ReportShape;

    fn button_caps(&self, kind: ReportKind) -> Result<Vec<ButtonCapability>, HidpStatus>;

    fn value_caps(&self, kind: ReportKind) -> Result<Vec<ValueCapability>, HidpStatus>;

    /// Maximum number of usages on `usage_page` that one report can assert
    fn max_usage_list_length(&self, kind: ReportKind, usage_page: UsagePage) -> usize;

    /// Button usages on `usage_page` asserted in `report`
    fn usages(
        &self,
        kind: ReportKind,
        usage_page: UsagePage,
        report: &[u8],
        max: usize,
    ) -> Result<Vec<Usage>, HidpStatus>;

    /// Unscaled value of `usage` in `report`
    fn usage_value(
        &self,
        kind: ReportKind,
        usage_page: UsagePage,
        usage: Usage,
        report: &[u8],
    ) -> Result<u32, HidpStatus>;

    /// Value of `usage` mapped from logical to physical units
    fn scaled_usage_value(
        &self,
        kind: ReportKind,
        usage_page: UsagePage,
        usage: Usage,
        report: &[u8],
    ) -> Result<i32, HidpStatus>;
}

/// Parsed report descriptor of one HID interface
#[derive(Debug, Clone)]
pub struct PreparsedData {
    fields: Vec<ReportField>,
    top_level: TopLevelUsage,
    numbered_reports: bool,
    shapes: [ReportShape; 3],
    button_caps: [Vec<ButtonCapability>; 3],
    value_caps: [Vec<ValueCapability>; 3],
}

impl PreparsedData {
    /// Parse a raw report descriptor
    pub fn parse(descriptor: &[u8]) -> Result<Self, DescriptorError> {
        let parsed = descriptor::parse(descriptor)?;

        let mut button_caps: [Vec<ButtonCapability>; 3] = Default::default();
        let mut value_caps: [Vec<ValueCapability>; 3] = Default::default();

        for field in parsed.fields.iter().filter(|f| !f.flags.is_constant()) {
            let k = field.kind.index();
            // Data items without usages still get a capability, on usage 0
            let spans = if field.usages.is_empty() {
                vec![descriptor::UsageSpan::single(0, 0)]
            } else {
                field.usages.clone()
            };
            for span in spans {
                if field.is_button() {
                    button_caps[k].push(ButtonCapability {
                        usage_page: span.usage_page,
                        report_id: field.report_id,
                        is_range: span.is_range,
                        usage_min: span.min,
                        usage_max: span.max,
                        link_usage_page: field.link_usage_page,
                        link_usage: field.link_usage,
                    });
                } else {
                    value_caps[k].push(ValueCapability {
                        usage_page: span.usage_page,
                        report_id: field.report_id,
                        is_range: span.is_range,
                        usage_min: span.min,
                        usage_max: span.max,
                        bit_size: field.bit_size,
                        report_count: field.count,
                        logical_min: field.logical_min,
                        logical_max: field.logical_max,
                        physical_min: field.physical_min,
                        physical_max: field.physical_max,
                        has_null: field.flags.has_null_state(),
                        link_usage_page: field.link_usage_page,
                        link_usage: field.link_usage,
                    });
                }
            }
        }

        let mut shapes = [ReportShape::default(); 3];
        for kind in ReportKind::ALL {
            let k = kind.index();
            let bits = parsed
                .report_bits
                .iter()
                .filter(|((rk, _), _)| *rk == kind)
                .map(|(_, &bits)| bits)
                .max()
                .unwrap_or(0);
            shapes[k] = ReportShape {
                byte_length: bits.div_ceil(8) as usize,
                button_caps: button_caps[k].len(),
                value_caps: value_caps[k].len(),
            };
        }

        Ok(Self {
            fields: parsed.fields,
            top_level: parsed.top_level,
            numbered_reports: parsed.numbered_reports,
            shapes,
            button_caps,
            value_caps,
        })
    }

    /// Usage page and usage of the top-level application collection
    pub fn top_level(&self) -> TopLevelUsage {
        self.top_level
    }

    /// Whether reports carry a report ID on the wire
    pub fn numbered_reports(&self) -> bool {
        self.numbered_reports
    }

    pub fn fields(&self) -> &[ReportField] {
        &self.fields
    }

    fn data_fields(&self, kind: ReportKind) -> impl Iterator<Item = &ReportField> {
        self.fields
            .iter()
            .filter(move |f| f.kind == kind && !f.flags.is_constant())
    }

    /// Validate the buffer length and report ID of `report`
    fn check_report(&self, kind: ReportKind, report: &[u8]) -> Result<u8, HidpStatus> {
        let expected = self.shapes[kind.index()].byte_length;
        if expected == 0 || report.len() != expected {
            return Err(HidpStatus::InvalidReportLength {
                expected,
                actual: report.len(),
            });
        }
        let id = report[0];
        if !self
            .fields
            .iter()
            .any(|f| f.kind == kind && f.report_id == id)
        {
            return Err(HidpStatus::IncompatibleReportId(id));
        }
        Ok(id)
    }

    /// Locate the value field and element for `(page, usage)` in report `id`
    fn value_element(
        &self,
        kind: ReportKind,
        id: u8,
        page: UsagePage,
        usage: Usage,
    ) -> Result<(&ReportField, u32), HidpStatus> {
        let mut elsewhere = false;
        for field in self.data_fields(kind).filter(|f| !f.is_button()) {
            if let Some(element) = field.element_for(page, usage) {
                if field.report_id == id {
                    return Ok((field, element));
                }
                elsewhere = true;
            } else if field.usages.is_empty() && page == 0 && usage == 0 && field.report_id == id
            {
                return Ok((field, 0));
            }
        }
        if elsewhere {
            Err(HidpStatus::IncompatibleReportId(id))
        } else {
            Err(HidpStatus::UsageNotFound)
        }
    }
}

impl CapabilityQuery for PreparsedData {
    fn shape(&self, kind: ReportKind) -> ReportShape {
        self.shapes[kind.index()]
    }

    fn button_caps(&self, kind: ReportKind) -> Result<Vec<ButtonCapability>, HidpStatus> {
        Ok(self.button_caps[kind.index()].clone())
    }

    fn value_caps(&self, kind: ReportKind) -> Result<Vec<ValueCapability>, HidpStatus> {
        Ok(self.value_caps[kind.index()].clone())
    }

    fn max_usage_list_length(&self, kind: ReportKind, usage_page: UsagePage) -> usize {
        self.data_fields(kind)
            .filter(|f| f.is_button() && f.on_page(usage_page))
            .map(|f| f.count as usize)
            .sum()
    }

    fn usages(
        &self,
        kind: ReportKind,
        usage_page: UsagePage,
        report: &[u8],
        max: usize,
    ) -> Result<Vec<Usage>, HidpStatus> {
        let id = self.check_report(kind, report)?;
        let mut usages = Vec::new();

        for field in self
            .data_fields(kind)
            .filter(|f| f.is_button() && f.report_id == id)
        {
            for element in 0..field.count {
                let hit = if field.flags.is_variable() {
                    if field.raw_element(report, element) == 0 {
                        continue;
                    }
                    field.element_usage(element)
                } else {
                    // Array elements hold a selector into the usage list
                    let selector = field.raw_element(report, element) as i64;
                    let index = selector - field.logical_min as i64;
                    if index < 0 || selector > field.logical_max as i64 {
                        continue;
                    }
                    field.usage_at(index as u32)
                };
                if let Some((page, usage)) = hit {
                    if page == usage_page && usage != 0 {
                        usages.push(usage);
                    }
                }
            }
        }

        if usages.len() > max {
            return Err(HidpStatus::BufferTooSmall {
                needed: usages.len(),
                available: max,
            });
        }
        Ok(usages)
    }

    fn usage_value(
        &self,
        kind: ReportKind,
        usage_page: UsagePage,
        usage: Usage,
        report: &[u8],
    ) -> Result<u32, HidpStatus> {
        let id = self.check_report(kind, report)?;
        let (field, element) = self.value_element(kind, id, usage_page, usage)?;
        Ok(field.raw_element(report, element))
    }

    fn scaled_usage_value(
        &self,
        kind: ReportKind,
        usage_page: UsagePage,
        usage: Usage,
        report: &[u8],
    ) -> Result<i32, HidpStatus> {
        let id = self.check_report(kind, report)?;
        let (field, element) = self.value_element(kind, id, usage_page, usage)?;

        // Full 32-bit extents overflow i64 in the product below
        let (lmin, lmax) = (field.logical_min as i128, field.logical_max as i128);
        let (pmin, pmax) = (field.physical_min as i128, field.physical_max as i128);
        if lmin >= lmax || pmin >= pmax {
            return Err(HidpStatus::BadLogPhyValues);
        }

        let value = field.signed_element(report, element) as i128;
        if value < lmin || value > lmax {
            return Err(if field.flags.has_null_state() {
                HidpStatus::Null
            } else {
                HidpStatus::ValueOutOfRange
            });
        }

        let scaled = (value - lmin) * (pmax - pmin) / (lmax - lmin) + pmin;
        i32::try_from(scaled).map_err(|_| HidpStatus::ValueOutOfRange)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const MACRO_KEYS: &[u8] = &[
        0x05, 0x0C, // Usage Page (Consumer)
        0x09, 0x01, // Usage (Consumer Control)
        0xA1, 0x01, // Collection (Application)
        0x85, 0x01, //   Report ID (1)
        0x19, 0x4C, //   Usage Minimum (0x4C)
        0x29, 0x4F, //   Usage Maximum (0x4F)
        0x15, 0x4C, //   Logical Minimum (0x4C)
        0x25, 0x4F, //   Logical Maximum (0x4F)
        0x75, 0x08, //   Report Size (8)
        0x95, 0x04, //   Report Count (4)
        0x81, 0x00, //   Input (Data,Array,Abs)
        0xC0, //       End Collection
    ];

    /// Gamepad: 8 bitmap buttons, signed X/Y, a hat switch with null state,
    /// and a one-byte output report.
    const GAMEPAD: &[u8] = &[
        0x05, 0x01, //       Usage Page (Generic Desktop)
        0x09, 0x05, //       Usage (Game Pad)
        0xA1, 0x01, //       Collection (Application)
        0x05, 0x09, //         Usage Page (Button)
        0x19, 0x01, //         Usage Minimum (1)
        0x29, 0x08, //         Usage Maximum (8)
        0x15, 0x00, //         Logical Minimum (0)
        0x25, 0x01, //         Logical Maximum (1)
        0x75, 0x01, //         Report Size (1)
        0x95, 0x08, //         Report Count (8)
        0x81, 0x02, //         Input (Data,Var,Abs)
        0x05, 0x01, //         Usage Page (Generic Desktop)
        0x09, 0x30, //         Usage (X)
        0x09, 0x31, //         Usage (Y)
        0x15, 0x81, //         Logical Minimum (-127)
        0x25, 0x7F, //         Logical Maximum (127)
        0x35, 0x00, //         Physical Minimum (0)
        0x46, 0xFE, 0x00, //   Physical Maximum (254)
        0x75, 0x08, //         Report Size (8)
        0x95, 0x02, //         Report Count (2)
        0x81, 0x02, //         Input (Data,Var,Abs)
        0x09, 0x39, //         Usage (Hat Switch)
        0x15, 0x00, //         Logical Minimum (0)
        0x25, 0x07, //         Logical Maximum (7)
        0x35, 0x00, //         Physical Minimum (0)
        0x46, 0x3B, 0x01, //   Physical Maximum (315)
        0x75, 0x04, //         Report Size (4)
        0x95, 0x01, //         Report Count (1)
        0x81, 0x42, //         Input (Data,Var,Abs,Null)
        0x75, 0x04, //         Report Size (4)
        0x95, 0x01, //         Report Count (1)
        0x81, 0x03, //         Input (Cnst,Var,Abs)
        0x05, 0x08, //         Usage Page (LEDs)
        0x09, 0x01, //         Usage (Num Lock)
        0x15, 0x00, //         Logical Minimum (0)
        0x25, 0x01, //         Logical Maximum (1)
        0x75, 0x01, //         Report Size (1)
        0x95, 0x01, //         Report Count (1)
        0x91, 0x02, //         Output (Data,Var,Abs)
        0x75, 0x07, //         Report Size (7)
        0x91, 0x03, //         Output (Cnst,Var,Abs)
        0xC0, //             End Collection
    ];

    #[test]
    fn test_macro_keys_shape_and_caps() {
        let pd = PreparsedData::parse(MACRO_KEYS).unwrap();
        assert_eq!(
            pd.shape(ReportKind::Input),
            ReportShape {
                byte_length: 5,
                button_caps: 1,
                value_caps: 0
            }
        );
        let caps = pd.button_caps(ReportKind::Input).unwrap();
        assert_eq!(caps[0].usage_page, 0x0C);
        assert_eq!((caps[0].usage_min, caps[0].usage_max), (0x4C, 0x4F));
        assert_eq!(caps[0].report_id, 1);
        assert_eq!(pd.max_usage_list_length(ReportKind::Input, 0x0C), 4);
        assert_eq!(pd.max_usage_list_length(ReportKind::Input, 0x07), 0);
    }

    #[test]
    fn test_array_usages() {
        let pd = PreparsedData::parse(MACRO_KEYS).unwrap();
        let usages = pd
            .usages(ReportKind::Input, 0x0C, &[1, 0x4D, 0, 0, 0], 4)
            .unwrap();
        assert_eq!(usages, vec![0x4D]);

        let usages = pd
            .usages(ReportKind::Input, 0x0C, &[1, 0x4F, 0x4C, 0, 0], 4)
            .unwrap();
        assert_eq!(usages, vec![0x4F, 0x4C]);

        assert_eq!(
            pd.usages(ReportKind::Input, 0x0C, &[1, 0x4F, 0x4C, 0, 0], 1),
            Err(HidpStatus::BufferTooSmall {
                needed: 2,
                available: 1
            })
        );
    }

    #[test]
    fn test_report_checks() {
        let pd = PreparsedData::parse(MACRO_KEYS).unwrap();
        assert_eq!(
            pd.usages(ReportKind::Input, 0x0C, &[1, 0x4D, 0], 4),
            Err(HidpStatus::InvalidReportLength {
                expected: 5,
                actual: 3
            })
        );
        assert_eq!(
            pd.usages(ReportKind::Input, 0x0C, &[7, 0x4D, 0, 0, 0], 4),
            Err(HidpStatus::IncompatibleReportId(7))
        );
        assert!(matches!(
            pd.usages(ReportKind::Output, 0x0C, &[], 4),
            Err(HidpStatus::InvalidReportLength { expected: 0, .. })
        ));
    }

    #[test]
    fn test_gamepad_shapes() {
        let pd = PreparsedData::parse(GAMEPAD).unwrap();
        assert!(!pd.numbered_reports());
        assert_eq!(pd.top_level().usage, 0x05);
        // id byte + 8 button bits + 2 axes + hat nibble + padding nibble
        assert_eq!(pd.shape(ReportKind::Input).byte_length, 5);
        assert_eq!(pd.shape(ReportKind::Input).button_caps, 1);
        // X and Y are separate usages, hat is a third
        assert_eq!(pd.shape(ReportKind::Input).value_caps, 3);
        assert_eq!(pd.shape(ReportKind::Output).byte_length, 2);
        assert_eq!(pd.shape(ReportKind::Output).button_caps, 1);
        assert!(pd.shape(ReportKind::Feature).is_empty());
    }

    #[test]
    fn test_bitmap_buttons() {
        let pd = PreparsedData::parse(GAMEPAD).unwrap();
        let report = [0, 0b1000_0101, 0, 0, 0];
        assert_eq!(
            pd.usages(ReportKind::Input, 0x09, &report, 8).unwrap(),
            vec![1, 3, 8]
        );
        assert!(pd
            .usages(ReportKind::Input, 0x01, &report, 8)
            .unwrap()
            .is_empty());
    }

    #[test]
    fn test_values_and_scaling() {
        let pd = PreparsedData::parse(GAMEPAD).unwrap();
        // X = -127, Y = 127, hat = 2
        let report = [0, 0, 0x81, 0x7F, 0x02];
        assert_eq!(
            pd.usage_value(ReportKind::Input, 0x01, 0x30, &report),
            Ok(0x81)
        );
        assert_eq!(
            pd.scaled_usage_value(ReportKind::Input, 0x01, 0x30, &report),
            Ok(0)
        );
        assert_eq!(
            pd.scaled_usage_value(ReportKind::Input, 0x01, 0x31, &report),
            Ok(254)
        );
        assert_eq!(
            pd.scaled_usage_value(ReportKind::Input, 0x01, 0x39, &report),
            Ok(90)
        );
        assert_eq!(
            pd.usage_value(ReportKind::Input, 0x01, 0x32, &report),
            Err(HidpStatus::UsageNotFound)
        );
    }

    #[test]
    fn test_null_hat() {
        let pd = PreparsedData::parse(GAMEPAD).unwrap();
        // hat nibble 0xF is outside 0..=7
        let report = [0, 0, 0, 0, 0x0F];
        assert_eq!(
            pd.usage_value(ReportKind::Input, 0x01, 0x39, &report),
            Ok(0x0F)
        );
        assert_eq!(
            pd.scaled_usage_value(ReportKind::Input, 0x01, 0x39, &report),
            Err(HidpStatus::Null)
        );
    }

    #[test]
    fn test_scaling_full_32_bit_extents() {
        let desc = [
            0x05, 0x01, //                   Usage Page (Generic Desktop)
            0x09, 0x04, //                   Usage (Joystick)
            0xA1, 0x01, //                   Collection (Application)
            0x09, 0x30, //                     Usage (X)
            0x17, 0x00, 0x00, 0x00, 0x80, //   Logical Minimum (i32::MIN)
            0x27, 0xFF, 0xFF, 0xFF, 0x7F, //   Logical Maximum (i32::MAX)
            0x37, 0x00, 0x00, 0x00, 0x80, //   Physical Minimum (i32::MIN)
            0x47, 0xFF, 0xFF, 0xFF, 0x7F, //   Physical Maximum (i32::MAX)
            0x75, 0x20, //                     Report Size (32)
            0x95, 0x01, //                     Report Count (1)
            0x81, 0x02, //                     Input (Data,Var,Abs)
            0xC0, //                         End Collection
        ];
        let pd = PreparsedData::parse(&desc).unwrap();
        let scaled = |report: [u8; 5]| {
            pd.scaled_usage_value(ReportKind::Input, 0x01, 0x30, &report)
        };
        assert_eq!(scaled([0, 0xFF, 0xFF, 0xFF, 0x7F]), Ok(i32::MAX));
        assert_eq!(scaled([0, 0x00, 0x00, 0x00, 0x80]), Ok(i32::MIN));
        assert_eq!(scaled([0, 0x00, 0x00, 0x00, 0x00]), Ok(0));
        assert_eq!(scaled([0, 0xFF, 0xFF, 0xFF, 0xFF]), Ok(-1));
    }
}
