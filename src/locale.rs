//! Dutch month and quarter vocabulary, and the canonical [`Period`] built
//! from a (year, month) pair.
//!
//! All lookups go through static tables. Supporting another locale means
//! adding tables, not new branches.

use crate::error::{ReportError, Result};
use crate::utils::first_of_month;
use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Lower-cased full names and abbreviations accepted as month labels.
const MONTH_VOCABULARY: [(&str, u32); 23] = [
    ("januari", 1),
    ("jan", 1),
    ("februari", 2),
    ("feb", 2),
    ("maart", 3),
    ("mrt", 3),
    ("april", 4),
    ("apr", 4),
    ("mei", 5),
    ("juni", 6),
    ("jun", 6),
    ("juli", 7),
    ("jul", 7),
    ("augustus", 8),
    ("aug", 8),
    ("september", 9),
    ("sep", 9),
    ("oktober", 10),
    ("okt", 10),
    ("november", 11),
    ("nov", 11),
    ("december", 12),
    ("dec", 12),
];

const MONTH_NAMES: [&str; 12] = [
    "Januari",
    "Februari",
    "Maart",
    "April",
    "Mei",
    "Juni",
    "Juli",
    "Augustus",
    "September",
    "Oktober",
    "November",
    "December",
];

const MONTH_ABBREVIATIONS: [&str; 12] = [
    "Jan", "Feb", "Mrt", "Apr", "Mei", "Jun", "Jul", "Aug", "Sep", "Okt", "Nov", "Dec",
];

/// Lower-cased quarter labels found in the statistical extracts.
const QUARTER_VOCABULARY: [(&str, u32); 12] = [
    ("q1", 1),
    ("q2", 2),
    ("q3", 3),
    ("q4", 4),
    ("kwartaal 1", 1),
    ("kwartaal 2", 2),
    ("kwartaal 3", 3),
    ("kwartaal 4", 4),
    ("1e kwartaal", 1),
    ("2e kwartaal", 2),
    ("3e kwartaal", 3),
    ("4e kwartaal", 4),
];

/// Converts an optional month cell to its number (1-12). A missing label is
/// `InvalidInput`; see [`parse_month`] for the accepted vocabulary.
pub fn month_to_number(label: Option<&str>) -> Result<u32> {
    let label =
        label.ok_or_else(|| ReportError::InvalidInput("Month label is missing".to_string()))?;
    parse_month(label)
}

/// Converts a Dutch month name or abbreviation to its number (1-12).
///
/// Matching ignores case and surrounding whitespace, so `"januari"`,
/// `"Jan"` and `" JANUARI "` all map to `1`.
pub fn parse_month(label: &str) -> Result<u32> {
    let clean = label.trim().to_lowercase();
    if clean.is_empty() {
        return Err(ReportError::InvalidInput(
            "Month label is empty".to_string(),
        ));
    }

    MONTH_VOCABULARY
        .iter()
        .find(|(name, _)| *name == clean)
        .map(|(_, number)| *number)
        .ok_or_else(|| ReportError::UnrecognizedMonth {
            row: None,
            label: label.to_string(),
        })
}

/// Quarter (1-4) that a month number falls in.
pub fn quarter_of_month(month: u32) -> Result<u32> {
    validate_month(month)?;
    Ok((month - 1) / 3 + 1)
}

/// Canonical full name of a month number, e.g. `3` -> `"Maart"`.
pub fn month_name(month: u32) -> Result<&'static str> {
    validate_month(month)?;
    Ok(MONTH_NAMES[month as usize - 1])
}

/// Fixed three-letter form of a month number, e.g. `3` -> `"Mrt"`.
pub fn month_abbreviation(month: u32) -> Result<&'static str> {
    validate_month(month)?;
    Ok(MONTH_ABBREVIATIONS[month as usize - 1])
}

/// Resolves labels such as `"Q2"`, `"Kwartaal 2"` or `"2e kwartaal"`.
pub fn quarter_label_to_number(label: &str) -> Result<u32> {
    let clean = label.trim().to_lowercase();
    QUARTER_VOCABULARY
        .iter()
        .find(|(name, _)| *name == clean)
        .map(|(_, number)| *number)
        .ok_or_else(|| ReportError::InvalidInput(format!("Unknown quarter label: {}", label)))
}

/// The three month numbers belonging to a quarter.
pub fn quarter_months(quarter: u32) -> Result<[u32; 3]> {
    if !(1..=4).contains(&quarter) {
        return Err(ReportError::InvalidInput(format!(
            "Quarter {} out of range 1-4",
            quarter
        )));
    }
    let first = (quarter - 1) * 3 + 1;
    Ok([first, first + 1, first + 2])
}

/// Splits a `YYYY-QN` key into year and quarter number.
pub fn parse_quarter_key(key: &str) -> Result<(i32, u32)> {
    let invalid = || ReportError::InvalidPeriodKey(key.to_string());

    let (year, quarter) = key.trim().split_once("-Q").ok_or_else(invalid)?;
    let year: i32 = year.parse().map_err(|_| invalid())?;
    let quarter: u32 = quarter.parse().map_err(|_| invalid())?;

    if !(1..=4).contains(&quarter) {
        return Err(invalid());
    }
    Ok((year, quarter))
}

/// Splits a `YYYY-MM` key into year and month number.
pub fn parse_month_key(key: &str) -> Result<(i32, u32)> {
    let invalid = || ReportError::InvalidPeriodKey(key.to_string());

    let (year, month) = key.trim().split_once('-').ok_or_else(invalid)?;
    if month.len() != 2 {
        return Err(invalid());
    }
    let year: i32 = year.parse().map_err(|_| invalid())?;
    let month: u32 = month.parse().map_err(|_| invalid())?;

    if !(1..=12).contains(&month) {
        return Err(invalid());
    }
    Ok((year, month))
}

fn validate_month(month: u32) -> Result<()> {
    if !(1..=12).contains(&month) {
        return Err(ReportError::InvalidInput(format!(
            "Month number {} out of range 1-12",
            month
        )));
    }
    Ok(())
}

/// A calendar month, stored as its first day so that ordering is
/// chronological.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Period {
    date: NaiveDate,
}

impl Period {
    pub fn new(year: i32, month: u32) -> Result<Self> {
        validate_month(month)?;
        Ok(Self {
            date: first_of_month(year, month)?,
        })
    }

    pub fn from_label(year: i32, month_label: &str) -> Result<Self> {
        Self::new(year, parse_month(month_label)?)
    }

    pub fn from_date(date: NaiveDate) -> Self {
        Self {
            date: date.with_day(1).unwrap_or(date),
        }
    }

    pub fn year(&self) -> i32 {
        self.date.year()
    }

    pub fn month(&self) -> u32 {
        self.date.month()
    }

    pub fn quarter(&self) -> u32 {
        self.date.month0() / 3 + 1
    }

    /// First day of the month.
    pub fn date(&self) -> NaiveDate {
        self.date
    }

    /// `YYYY-MM`
    pub fn month_key(&self) -> String {
        format!("{}-{:02}", self.year(), self.month())
    }

    /// `YYYY-QN`
    pub fn quarter_key(&self) -> String {
        format!("{}-Q{}", self.year(), self.quarter())
    }

    /// Full month name followed by the year, e.g. `"Maart 2023"`.
    pub fn display(&self) -> String {
        format!("{} {}", MONTH_NAMES[self.date.month0() as usize], self.year())
    }

    pub fn display_short(&self) -> String {
        format!(
            "{} {}",
            MONTH_ABBREVIATIONS[self.date.month0() as usize],
            self.year()
        )
    }
}

impl fmt::Display for Period {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.month_key())
    }
}
