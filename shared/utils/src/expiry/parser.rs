//! Date Parser
//!
//! Turns a scanned substring into a calendar date. Dates are naive: no
//! timezone or locale is involved.

use chrono::{Datelike, NaiveDate};

/// Recognized textual layouts, in the order they are tried.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DateFormat {
    DaySlash,
    DayDash,
    DayDot,
    YearSlash,
    YearDash,
}

impl DateFormat {
    pub const ALL: [DateFormat; 5] = [
        Self::DaySlash,
        Self::DayDash,
        Self::DayDot,
        Self::YearSlash,
        Self::YearDash,
    ];

    /// `chrono` format string for this layout.
    pub fn pattern(&self) -> &'static str {
        match self {
            Self::DaySlash => "%d/%m/%Y",
            Self::DayDash => "%d-%m-%Y",
            Self::DayDot => "%d.%m.%Y",
            Self::YearSlash => "%Y/%m/%d",
            Self::YearDash => "%Y-%m-%d",
        }
    }
}

/// First layout that yields a real calendar date, or `None`.
///
/// Year 0 is rejected; on a scan it is only ever OCR noise.
pub fn parse_date(raw: &str) -> Option<NaiveDate> {
    DateFormat::ALL.iter().find_map(|format| {
        NaiveDate::parse_from_str(raw, format.pattern())
            .ok()
            .filter(|date| date.year() >= 1)
    })
}
