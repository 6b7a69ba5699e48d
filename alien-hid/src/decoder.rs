//! Report decoder
//!
//! Fills a data-item layout from one raw report buffer. Only items whose
//! report ID matches byte 0 of the buffer are touched; all other items keep
//! the state of the last report that carried them.
//!
//! Decoding stops at the first failing query. Items updated before the
//! failure keep their new state.

use thiserror::Error;

use crate::caps::{ButtonItem, DataItem, ValueItem};
use crate::preparsed::{CapabilityQuery, HidpStatus};
use crate::types::{ReportKind, Usage, UsagePage};

/// Errors from decoding a report
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DecodeError {
    #[error("Empty report buffer")]
    EmptyReport,

    #[error("Usage query on page 0x{usage_page:04X} failed: {status}")]
    UsageQuery {
        usage_page: UsagePage,
        status: HidpStatus,
    },

    #[error("Value query for usage 0x{usage_page:04X}:0x{usage:04X} failed: {status}")]
    ValueQuery {
        usage_page: UsagePage,
        usage: Usage,
        status: HidpStatus,
    },
}

/// Decode `report` into the matching items of `items`
pub fn decode_report<Q: CapabilityQuery + ?Sized>(
    query: &Q,
    kind: ReportKind,
    report: &[u8],
    items: &mut [DataItem],
) -> Result<(), DecodeError> {
    let report_id = *report.first().ok_or(DecodeError::EmptyReport)?;

    for item in items.iter_mut().filter(|i| i.report_id() == report_id) {
        match item {
            DataItem::Button(button) => decode_button(query, kind, report, button)?,
            DataItem::Value(value) => decode_value(query, kind, report, value)?,
        }
    }
    Ok(())
}

fn decode_button<Q: CapabilityQuery + ?Sized>(
    query: &Q,
    kind: ReportKind,
    report: &[u8],
    button: &mut ButtonItem,
) -> Result<(), DecodeError> {
    let asserted = query
        .usages(kind, button.usage_page, report, button.max_usage_count)
        .map_err(|status| DecodeError::UsageQuery {
            usage_page: button.usage_page,
            status,
        })?;

    // Keep only this item's range, compacted to the front
    let mut slot = 0;
    for usage in asserted {
        if button.contains(usage) && slot < button.active_usages.len() {
            button.active_usages[slot] = usage;
            slot += 1;
        }
    }
    button.active_usages[slot..].fill(0);
    Ok(())
}

fn decode_value<Q: CapabilityQuery + ?Sized>(
    query: &Q,
    kind: ReportKind,
    report: &[u8],
    value: &mut ValueItem,
) -> Result<(), DecodeError> {
    let value_error = |status| DecodeError::ValueQuery {
        usage_page: value.usage_page,
        usage: value.usage,
        status,
    };

    let raw = query
        .usage_value(kind, value.usage_page, value.usage, report)
        .map_err(value_error)?;

    let scaled = match query.scaled_usage_value(kind, value.usage_page, value.usage, report) {
        Ok(scaled) => Some(scaled),
        // Value not present: keep the raw value, leave the scaled one alone
        Err(HidpStatus::Null) => None,
        Err(status) => return Err(value_error(status)),
    };

    value.raw_value = raw;
    if let Some(scaled) = scaled {
        value.scaled_value = scaled;
    }
    value.has_value = true;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::caps::build_items;
    use crate::PreparsedData;

    const MACRO_KEYS: &[u8] = &[
        0x05, 0x0C, 0x09, 0x01, 0xA1, 0x01, 0x85, 0x01, 0x19, 0x4C, 0x29, 0x4F, 0x15, 0x4C, 0x25,
        0x4F, 0x75, 0x08, 0x95, 0x04, 0x81, 0x00, 0xC0,
    ];

    /// Two reports: ID 1 carries a consumer button array, ID 2 a
    /// vendor value with a null state.
    const TWO_REPORTS: &[u8] = &[
        0x05, 0x0C, //       Usage Page (Consumer)
        0x09, 0x01, //       Usage (Consumer Control)
        0xA1, 0x01, //       Collection (Application)
        0x85, 0x01, //         Report ID (1)
        0x19, 0x4C, //         Usage Minimum (0x4C)
        0x29, 0x4F, //         Usage Maximum (0x4F)
        0x15, 0x4C, //         Logical Minimum (0x4C)
        0x25, 0x4F, //         Logical Maximum (0x4F)
        0x75, 0x08, //         Report Size (8)
        0x95, 0x02, //         Report Count (2)
        0x81, 0x00, //         Input (Data,Array,Abs)
        0x85, 0x02, //         Report ID (2)
        0x06, 0x00, 0xFF, //   Usage Page (Vendor 0xFF00)
        0x09, 0x10, //         Usage (0x10)
        0x15, 0x00, //         Logical Minimum (0)
        0x25, 0x64, //         Logical Maximum (100)
        0x75, 0x08, //         Report Size (8)
        0x95, 0x01, //         Report Count (1)
        0x81, 0x42, //         Input (Data,Var,Abs,Null)
        0x95, 0x01, //         Report Count (1)
        0x81, 0x03, //         Input (Cnst,Var,Abs)
        0xC0, //             End Collection
    ];

    fn layout(desc: &[u8]) -> (PreparsedData, Vec<DataItem>) {
        let pd = PreparsedData::parse(desc).unwrap();
        let shape = pd.shape(ReportKind::Input);
        let items = build_items(&pd, ReportKind::Input, &shape).unwrap();
        (pd, items)
    }

    #[test]
    fn test_single_macro_key() {
        let (pd, mut items) = layout(MACRO_KEYS);
        decode_report(&pd, ReportKind::Input, &[1, 0x4D, 0, 0, 0], &mut items).unwrap();
        let button = items[0].as_button().unwrap();
        assert_eq!(button.active_usages, vec![0x4D, 0, 0, 0]);
        assert_eq!(button.pressed().collect::<Vec<_>>(), vec![0x4D]);

        // release report clears the slots
        decode_report(&pd, ReportKind::Input, &[1, 0, 0, 0, 0], &mut items).unwrap();
        assert_eq!(items[0].as_button().unwrap().active_usages, vec![0; 4]);
    }

    #[test]
    fn test_other_report_id_leaves_items_untouched() {
        let (pd, mut items) = layout(TWO_REPORTS);
        assert_eq!(items.len(), 2);

        decode_report(&pd, ReportKind::Input, &[1, 0x4E, 0x4C], &mut items).unwrap();
        assert_eq!(items[0].as_button().unwrap().active_usages, vec![0x4E, 0x4C]);
        assert!(!items[1].as_value().unwrap().has_value);

        decode_report(&pd, ReportKind::Input, &[2, 40, 0], &mut items).unwrap();
        // button state survives a report for another ID
        assert_eq!(items[0].as_button().unwrap().active_usages, vec![0x4E, 0x4C]);
        let value = items[1].as_value().unwrap();
        assert!(value.has_value);
        assert_eq!((value.raw_value, value.scaled_value), (40, 40));
    }

    #[test]
    fn test_null_value_keeps_scaled() {
        let (pd, mut items) = layout(TWO_REPORTS);
        decode_report(&pd, ReportKind::Input, &[2, 50, 0], &mut items).unwrap();
        decode_report(&pd, ReportKind::Input, &[2, 0xFF, 0], &mut items).unwrap();
        let value = items[1].as_value().unwrap();
        assert_eq!(value.raw_value, 0xFF);
        assert_eq!(value.scaled_value, 50);
        assert!(value.has_value);
    }

    #[test]
    fn test_failed_query_is_reported() {
        let (pd, mut items) = layout(MACRO_KEYS);
        // Wrong length: the usage query itself fails
        let err = decode_report(&pd, ReportKind::Input, &[1, 0x4D], &mut items).unwrap_err();
        assert_eq!(
            err,
            DecodeError::UsageQuery {
                usage_page: 0x0C,
                status: HidpStatus::InvalidReportLength {
                    expected: 5,
                    actual: 2
                },
            }
        );
    }

    /// Query double: fixed asserted usages, per-usage value results
    struct ScriptedQuery {
        asserted: Vec<Usage>,
        raw: Vec<(Usage, Result<u32, HidpStatus>)>,
        scaled: Vec<(Usage, Result<i32, HidpStatus>)>,
    }

    fn lookup<T: Copy>(
        table: &[(Usage, Result<T, HidpStatus>)],
        usage: Usage,
    ) -> Result<T, HidpStatus> {
        table
            .iter()
            .find(|(u, _)| *u == usage)
            .map(|(_, r)| *r)
            .unwrap_or(Err(HidpStatus::UsageNotFound))
    }

    impl CapabilityQuery for ScriptedQuery {
        fn shape(&self, _kind: ReportKind) -> crate::ReportShape {
            crate::ReportShape::default()
        }
        fn button_caps(&self, _kind: ReportKind) -> Result<Vec<crate::ButtonCapability>, HidpStatus> {
            Ok(Vec::new())
        }
        fn value_caps(&self, _kind: ReportKind) -> Result<Vec<crate::ValueCapability>, HidpStatus> {
            Ok(Vec::new())
        }
        fn max_usage_list_length(&self, _kind: ReportKind, _usage_page: UsagePage) -> usize {
            2
        }
        fn usages(
            &self,
            _kind: ReportKind,
            _usage_page: UsagePage,
            _report: &[u8],
            _max: usize,
        ) -> Result<Vec<Usage>, HidpStatus> {
            Ok(self.asserted.clone())
        }
        fn usage_value(
            &self,
            _kind: ReportKind,
            _usage_page: UsagePage,
            usage: Usage,
            _report: &[u8],
        ) -> Result<u32, HidpStatus> {
            lookup(&self.raw, usage)
        }
        fn scaled_usage_value(
            &self,
            _kind: ReportKind,
            _usage_page: UsagePage,
            usage: Usage,
            _report: &[u8],
        ) -> Result<i32, HidpStatus> {
            lookup(&self.scaled, usage)
        }
    }

    /// Macro-key button item followed by X, Y and Z values, all in report 1
    fn scripted_items() -> Vec<DataItem> {
        let value = |usage| {
            DataItem::Value(ValueItem {
                usage_page: 0x01,
                usage,
                report_id: 1,
                raw_value: 0,
                scaled_value: 0,
                has_value: false,
            })
        };
        vec![
            DataItem::Button(ButtonItem {
                usage_page: 0x0C,
                usage_min: 0x4C,
                usage_max: 0x4F,
                report_id: 1,
                max_usage_count: 2,
                active_usages: vec![0; 2],
            }),
            value(0x30),
            value(0x31),
            value(0x32),
        ]
    }

    #[test]
    fn test_raw_value_failure_stops_decoding() {
        let query = ScriptedQuery {
            asserted: vec![0x4D],
            raw: vec![(0x30, Ok(7)), (0x32, Ok(9))],
            scaled: vec![(0x30, Ok(70)), (0x31, Ok(80)), (0x32, Ok(90))],
        };
        let mut items = scripted_items();
        let err = decode_report(&query, ReportKind::Input, &[1, 0, 0], &mut items).unwrap_err();
        assert_eq!(
            err,
            DecodeError::ValueQuery {
                usage_page: 0x01,
                usage: 0x31,
                status: HidpStatus::UsageNotFound,
            }
        );

        // items before the failure keep their new state
        assert_eq!(items[0].as_button().unwrap().active_usages, vec![0x4D, 0]);
        let x = items[1].as_value().unwrap();
        assert!(x.has_value);
        assert_eq!((x.raw_value, x.scaled_value), (7, 70));
        // the failing item and everything after it are untouched
        assert!(!items[2].as_value().unwrap().has_value);
        assert!(!items[3].as_value().unwrap().has_value);
        assert_eq!(items[3].as_value().unwrap().raw_value, 0);
    }

    #[test]
    fn test_scaled_failure_other_than_null_stops_decoding() {
        let query = ScriptedQuery {
            asserted: vec![0x4C, 0x4F],
            raw: vec![(0x30, Ok(7)), (0x31, Ok(8)), (0x32, Ok(9))],
            scaled: vec![
                (0x30, Ok(70)),
                (0x31, Err(HidpStatus::BadLogPhyValues)),
                (0x32, Ok(90)),
            ],
        };
        let mut items = scripted_items();
        let err = decode_report(&query, ReportKind::Input, &[1, 0, 0], &mut items).unwrap_err();
        assert_eq!(
            err,
            DecodeError::ValueQuery {
                usage_page: 0x01,
                usage: 0x31,
                status: HidpStatus::BadLogPhyValues,
            }
        );

        assert_eq!(
            items[0].as_button().unwrap().active_usages,
            vec![0x4C, 0x4F]
        );
        assert!(items[1].as_value().unwrap().has_value);
        // raw value is not committed when scaling fails
        let y = items[2].as_value().unwrap();
        assert!(!y.has_value);
        assert_eq!(y.raw_value, 0);
        assert!(!items[3].as_value().unwrap().has_value);
    }

    #[test]
    fn test_empty_report() {
        let (pd, mut items) = layout(MACRO_KEYS);
        assert_eq!(
            decode_report(&pd, ReportKind::Input, &[], &mut items),
            Err(DecodeError::EmptyReport)
        );
    }
}
