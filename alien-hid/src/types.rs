//! Shared HID types

use std::fmt;

/// HID usage ID within a usage page
pub type Usage = u16;

/// HID usage page
pub type UsagePage = u16;

/// Direction of a HID report
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ReportKind {
    Input,
    Output,
    Feature,
}

impl ReportKind {
    pub const ALL: [ReportKind; 3] = [ReportKind::Input, ReportKind::Output, ReportKind::Feature];

    /// Stable index for per-kind tables
    pub(crate) fn index(self) -> usize {
        match self {
            ReportKind::Input => 0,
            ReportKind::Output => 1,
            ReportKind::Feature => 2,
        }
    }
}

impl fmt::Display for ReportKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            ReportKind::Input => "input",
            ReportKind::Output => "output",
            ReportKind::Feature => "feature",
        })
    }
}

/// Size summary of one report kind
///
/// `byte_length` includes the leading report ID byte and is the length of
/// the largest report of this kind. A kind the device does not use has a
/// zero-length shape.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ReportShape {
    pub byte_length: usize,
    pub button_caps: usize,
    pub value_caps: usize,
}

impl ReportShape {
    pub fn is_empty(&self) -> bool {
        self.byte_length == 0
    }
}

/// Top-level application collection of an interface
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct TopLevelUsage {
    pub usage_page: UsagePage,
    pub usage: Usage,
}
