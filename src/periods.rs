//! Attaches canonical period columns to tables keyed by a year column and a
//! Dutch month-label column.
//!
//! Rows whose period cannot be resolved are never silently discarded: they
//! are dropped from the output and listed in [`Normalized::rejected`].

use crate::error::{ReportError, Result};
use crate::locale::{month_name, parse_month, Period};
use crate::table::{Table, Value};
use log::{debug, warn};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

pub const DEFAULT_YEAR_COLUMN: &str = "jaar";
pub const DEFAULT_MONTH_COLUMN: &str = "maand";

pub const DATE_COLUMN: &str = "datum";
pub const PERIOD_COLUMN: &str = "periode";
pub const QUARTER_COLUMN: &str = "kwartaal";
pub const DISPLAY_COLUMN: &str = "periode_display";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum PeriodType {
    /// `YYYY-MM`
    Month,
    /// `YYYY-QN`
    Quarter,
    /// `YYYY`
    Year,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum DisplayFormat {
    /// "Januari 2023"
    Full,
    /// "Jan 2023"
    Short,
    /// "2023-01"
    Compact,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RejectionKind {
    UnrecognizedMonth,
    MissingMonth,
    InvalidYear,
}

/// A source row left out of a derived table or series.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RejectedRow {
    /// Position of the row in the input table.
    pub row: usize,
    /// The raw month cell, rendered as text.
    pub label: String,
    pub kind: RejectionKind,
}

impl RejectedRow {
    pub fn into_error(self) -> ReportError {
        match self.kind {
            RejectionKind::UnrecognizedMonth => ReportError::UnrecognizedMonth {
                row: Some(self.row),
                label: self.label,
            },
            RejectionKind::MissingMonth => ReportError::InvalidInput(format!(
                "Missing or non-text month label at row {}",
                self.row
            )),
            RejectionKind::InvalidYear => ReportError::InvalidInput(format!(
                "Missing or non-integer year at row {}",
                self.row
            )),
        }
    }
}

/// Output of an operation that consumes month labels, together with the
/// rows it could not place.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Normalized<T> {
    pub value: T,
    pub rejected: Vec<RejectedRow>,
}

impl<T> Normalized<T> {
    pub fn clean(value: T) -> Self {
        Self {
            value,
            rejected: Vec::new(),
        }
    }

    pub fn is_clean(&self) -> bool {
        self.rejected.is_empty()
    }

    /// Fails on the first rejected row instead of returning a partial result.
    pub fn into_strict(self) -> Result<T> {
        match self.rejected.into_iter().next() {
            Some(rejected) => Err(rejected.into_error()),
            None => Ok(self.value),
        }
    }

    pub fn map<U, F: FnOnce(T) -> U>(self, f: F) -> Normalized<U> {
        Normalized {
            value: f(self.value),
            rejected: self.rejected,
        }
    }
}

/// Resolves the period of a single row.
pub(crate) fn row_period(
    row: &[Value],
    row_idx: usize,
    year_idx: usize,
    month_idx: usize,
) -> std::result::Result<Period, RejectedRow> {
    let raw_label = match &row[month_idx] {
        Value::Text(label) => label,
        other => {
            return Err(RejectedRow {
                row: row_idx,
                label: render_cell(other),
                kind: RejectionKind::MissingMonth,
            })
        }
    };

    let year = row[year_idx].as_year().ok_or_else(|| RejectedRow {
        row: row_idx,
        label: raw_label.clone(),
        kind: RejectionKind::InvalidYear,
    })?;

    let month = parse_month(raw_label).map_err(|e| RejectedRow {
        row: row_idx,
        label: raw_label.clone(),
        kind: match e {
            ReportError::UnrecognizedMonth { .. } => RejectionKind::UnrecognizedMonth,
            _ => RejectionKind::MissingMonth,
        },
    })?;

    Period::new(year, month).map_err(|_| RejectedRow {
        row: row_idx,
        label: raw_label.clone(),
        kind: RejectionKind::InvalidYear,
    })
}

fn render_cell(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::Int(v) => v.to_string(),
        Value::Float(v) => v.to_string(),
        Value::Date(d) => d.to_string(),
        Value::Text(s) => s.clone(),
    }
}

/// Resolves every row's period; unresolved rows map to `None`.
fn resolve_periods(
    table: &Table,
    year_col: &str,
    month_col: &str,
) -> Result<Normalized<Vec<Option<Period>>>> {
    let year_idx = table.column_index(year_col)?;
    let month_idx = table.column_index(month_col)?;

    let mut periods = Vec::with_capacity(table.len());
    let mut rejected = Vec::new();

    for (row_idx, row) in table.rows().iter().enumerate() {
        match row_period(row, row_idx, year_idx, month_idx) {
            Ok(period) => periods.push(Some(period)),
            Err(rejection) => {
                periods.push(None);
                rejected.push(rejection);
            }
        }
    }

    if !rejected.is_empty() {
        warn!(
            "{} of {} rows have an unresolvable period in columns '{}'/'{}'",
            rejected.len(),
            table.len(),
            year_col,
            month_col
        );
    }

    Ok(Normalized {
        value: periods,
        rejected,
    })
}

/// Adds `datum`, `periode`, `kwartaal` and `periode_display` to a copy of
/// `table`.
///
/// Running it again on its own output overwrites the derived columns with
/// identical values.
pub fn standardize_date_columns(
    table: &Table,
    year_col: &str,
    month_col: &str,
) -> Result<Normalized<Table>> {
    let resolved = resolve_periods(table, year_col, month_col)?;

    let mut kept = Vec::with_capacity(table.len());
    let mut dates = Vec::with_capacity(table.len());
    let mut month_keys = Vec::with_capacity(table.len());
    let mut quarter_keys = Vec::with_capacity(table.len());
    let mut displays = Vec::with_capacity(table.len());

    for (row_idx, period) in resolved.value.iter().enumerate() {
        if let Some(period) = period {
            kept.push(row_idx);
            dates.push(Value::Date(period.date()));
            month_keys.push(Value::Text(period.month_key()));
            quarter_keys.push(Value::Text(period.quarter_key()));
            displays.push(Value::Text(period.display()));
        }
    }

    let standardized = table.select_rows(&kept).with_columns(vec![
        (DATE_COLUMN.to_string(), dates),
        (PERIOD_COLUMN.to_string(), month_keys),
        (QUARTER_COLUMN.to_string(), quarter_keys),
        (DISPLAY_COLUMN.to_string(), displays),
    ])?;

    debug!(
        "Standardized {} rows ({} rejected)",
        standardized.len(),
        resolved.rejected.len()
    );

    Ok(Normalized {
        value: standardized,
        rejected: resolved.rejected,
    })
}

/// One period key per row, aligned with the input. Rows whose period cannot
/// be resolved hold `Value::Null` and are listed as rejected.
pub fn create_period_column(
    table: &Table,
    year_col: &str,
    month_col: &str,
    period_type: PeriodType,
) -> Result<Normalized<Vec<Value>>> {
    if period_type == PeriodType::Year {
        let year_idx = table.column_index(year_col)?;
        let mut rejected = Vec::new();
        let values = table
            .rows()
            .iter()
            .enumerate()
            .map(|(row_idx, row)| match row[year_idx].as_year() {
                Some(year) => Value::Text(year.to_string()),
                None => {
                    rejected.push(RejectedRow {
                        row: row_idx,
                        label: render_cell(&row[year_idx]),
                        kind: RejectionKind::InvalidYear,
                    });
                    Value::Null
                }
            })
            .collect();
        return Ok(Normalized {
            value: values,
            rejected,
        });
    }

    let resolved = resolve_periods(table, year_col, month_col)?;
    Ok(resolved.map(|periods| {
        periods
            .into_iter()
            .map(|period| match (period, period_type) {
                (Some(p), PeriodType::Quarter) => Value::Text(p.quarter_key()),
                (Some(p), _) => Value::Text(p.month_key()),
                (None, _) => Value::Null,
            })
            .collect()
    }))
}

/// Human-readable period labels, aligned with the input rows.
pub fn format_period_for_display(
    table: &Table,
    year_col: &str,
    month_col: &str,
    format: DisplayFormat,
) -> Result<Normalized<Vec<Value>>> {
    let resolved = resolve_periods(table, year_col, month_col)?;
    Ok(resolved.map(|periods| {
        periods
            .into_iter()
            .map(|period| match period {
                Some(p) => Value::Text(match format {
                    DisplayFormat::Full => p.display(),
                    DisplayFormat::Short => p.display_short(),
                    DisplayFormat::Compact => p.month_key(),
                }),
                None => Value::Null,
            })
            .collect()
    }))
}

/// Inverse of the synthesizer: derives year and month columns from a date
/// column. With `dutch_months` the month column holds full Dutch names,
/// otherwise month numbers.
pub fn extract_year_month_from_date(
    table: &Table,
    date_col: &str,
    year_col: &str,
    month_col: &str,
    dutch_months: bool,
) -> Result<Table> {
    let mut years = Vec::with_capacity(table.len());
    let mut months = Vec::with_capacity(table.len());

    for (row_idx, value) in table.column(date_col)?.enumerate() {
        let period = value.as_date().map(Period::from_date).ok_or_else(|| {
            ReportError::InvalidInput(format!(
                "Value {:?} in column '{}' at row {} is not a date",
                value, date_col, row_idx
            ))
        })?;

        years.push(Value::Int(period.year() as i64));
        months.push(if dutch_months {
            Value::text(month_name(period.month())?)
        } else {
            Value::Int(period.month() as i64)
        });
    }

    table.with_columns(vec![
        (year_col.to_string(), years),
        (month_col.to_string(), months),
    ])
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn sample() -> Table {
        Table::from_rows(
            ["jaar", "maand", "waarde"],
            vec![
                vec![2023.into(), "Januari".into(), 100.into()],
                vec![2023.into(), "Februari".into(), 110.into()],
                vec![2023.into(), "Maart".into(), 120.into()],
                vec![2024.into(), "April".into(), 130.into()],
                vec![2024.into(), "Mei".into(), 140.into()],
            ],
        )
        .unwrap()
    }

    #[test]
    fn test_standardize_adds_four_columns() {
        let table = sample();
        let result = standardize_date_columns(&table, "jaar", "maand").unwrap();
        assert!(result.is_clean());

        let out = result.value;
        assert_eq!(out.len(), 5);
        assert_eq!(
            out.value(2, DATE_COLUMN),
            Some(&Value::Date(NaiveDate::from_ymd_opt(2023, 3, 1).unwrap()))
        );
        assert_eq!(out.value(2, PERIOD_COLUMN), Some(&Value::text("2023-03")));
        assert_eq!(out.value(2, QUARTER_COLUMN), Some(&Value::text("2023-Q1")));
        assert_eq!(out.value(4, DISPLAY_COLUMN), Some(&Value::text("Mei 2024")));

        // input untouched
        assert_eq!(table.columns().len(), 3);
    }

    #[test]
    fn test_standardize_is_idempotent() {
        let once = standardize_date_columns(&sample(), "jaar", "maand")
            .unwrap()
            .value;
        let twice = standardize_date_columns(&once, "jaar", "maand")
            .unwrap()
            .value;
        assert_eq!(once, twice);
    }

    #[test]
    fn test_standardize_display_uses_canonical_name() {
        let table = Table::from_rows(
            ["jaar", "maand"],
            vec![vec![2023.into(), " jan ".into()]],
        )
        .unwrap();
        let out = standardize_date_columns(&table, "jaar", "maand")
            .unwrap()
            .value;
        assert_eq!(out.value(0, DISPLAY_COLUMN), Some(&Value::text("Januari 2023")));
    }

    #[test]
    fn test_standardize_missing_column() {
        let result = standardize_date_columns(&sample(), "year", "maand");
        assert!(matches!(result, Err(ReportError::MissingColumn(c)) if c == "year"));
    }

    #[test]
    fn test_standardize_reports_unrecognized_rows() {
        let table = Table::from_rows(
            ["jaar", "maand"],
            vec![
                vec![2023.into(), "Januari".into()],
                vec![2023.into(), "Smarch".into()],
                vec![Value::Null, "Maart".into()],
                vec![2023.into(), Value::Null],
            ],
        )
        .unwrap();

        let result = standardize_date_columns(&table, "jaar", "maand").unwrap();
        assert_eq!(result.value.len(), 1);
        assert_eq!(result.rejected.len(), 3);
        assert_eq!(result.rejected[0].row, 1);
        assert_eq!(result.rejected[0].kind, RejectionKind::UnrecognizedMonth);
        assert_eq!(result.rejected[1].kind, RejectionKind::InvalidYear);
        assert_eq!(result.rejected[2].kind, RejectionKind::MissingMonth);

        match result.into_strict() {
            Err(ReportError::UnrecognizedMonth { row, label }) => {
                assert_eq!(row, Some(1));
                assert_eq!(label, "Smarch");
            }
            other => panic!("expected UnrecognizedMonth, got {:?}", other),
        }
    }

    #[test]
    fn test_create_period_column() {
        let table = sample();
        let months = create_period_column(&table, "jaar", "maand", PeriodType::Month)
            .unwrap()
            .into_strict()
            .unwrap();
        assert_eq!(months[0], Value::text("2023-01"));

        let quarters = create_period_column(&table, "jaar", "maand", PeriodType::Quarter)
            .unwrap()
            .into_strict()
            .unwrap();
        assert!(quarters[..3].iter().all(|q| *q == Value::text("2023-Q1")));
        assert_eq!(quarters[3], Value::text("2024-Q2"));

        let years = create_period_column(&table, "jaar", "maand", PeriodType::Year)
            .unwrap()
            .into_strict()
            .unwrap();
        assert_eq!(years[4], Value::text("2024"));
    }

    #[test]
    fn test_create_period_column_keeps_alignment() {
        let table = Table::from_rows(
            ["jaar", "maand"],
            vec![
                vec![2023.into(), "Smarch".into()],
                vec![2023.into(), "Juli".into()],
            ],
        )
        .unwrap();
        let result = create_period_column(&table, "jaar", "maand", PeriodType::Quarter).unwrap();
        assert_eq!(result.value, vec![Value::Null, Value::text("2023-Q3")]);
        assert_eq!(result.rejected.len(), 1);
    }

    #[test]
    fn test_format_period_for_display() {
        let table = sample();
        let full = format_period_for_display(&table, "jaar", "maand", DisplayFormat::Full)
            .unwrap()
            .value;
        let short = format_period_for_display(&table, "jaar", "maand", DisplayFormat::Short)
            .unwrap()
            .value;
        let compact = format_period_for_display(&table, "jaar", "maand", DisplayFormat::Compact)
            .unwrap()
            .value;

        assert_eq!(full[2], Value::text("Maart 2023"));
        assert_eq!(short[2], Value::text("Mrt 2023"));
        assert_eq!(compact[2], Value::text("2023-03"));
    }

    #[test]
    fn test_extract_year_month_from_date() {
        let table = Table::from_rows(
            ["datum"],
            vec![
                vec![NaiveDate::from_ymd_opt(2023, 8, 1).unwrap().into()],
                vec!["2024-02-15".into()],
            ],
        )
        .unwrap();

        let dutch = extract_year_month_from_date(&table, "datum", "jaar", "maand", true).unwrap();
        assert_eq!(dutch.value(0, "jaar"), Some(&Value::Int(2023)));
        assert_eq!(dutch.value(0, "maand"), Some(&Value::text("Augustus")));
        assert_eq!(dutch.value(1, "maand"), Some(&Value::text("Februari")));

        let numeric = extract_year_month_from_date(&table, "datum", "jaar", "maand", false).unwrap();
        assert_eq!(numeric.value(1, "maand"), Some(&Value::Int(2)));

        let bad = Table::from_rows(["datum"], vec![vec!["gisteren".into()]]).unwrap();
        assert!(extract_year_month_from_date(&bad, "datum", "jaar", "maand", true).is_err());
    }
}
