use crate::error::Result;
use crate::table::{Table, Value};
use log::debug;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Row selection by year range and raw month label. All criteria are
/// optional and combined with AND; year bounds are inclusive.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct PeriodFilter {
    #[serde(default)]
    pub start_year: Option<i32>,

    #[serde(default)]
    pub end_year: Option<i32>,

    /// Month labels compared verbatim (case-sensitive) with the stored
    /// labels, e.g. `["April", "Mei"]`.
    #[serde(default)]
    pub months: Option<Vec<String>>,
}

impl PeriodFilter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn since_year(mut self, year: i32) -> Self {
        self.start_year = Some(year);
        self
    }

    pub fn until_year(mut self, year: i32) -> Self {
        self.end_year = Some(year);
        self
    }

    pub fn in_months<S: Into<String>>(mut self, months: impl IntoIterator<Item = S>) -> Self {
        self.months = Some(months.into_iter().map(Into::into).collect());
        self
    }

    pub fn is_unbounded(&self) -> bool {
        self.start_year.is_none() && self.end_year.is_none() && self.months.is_none()
    }

    fn year_matches(&self, year: &Value) -> bool {
        if self.start_year.is_none() && self.end_year.is_none() {
            return true;
        }
        let Some(year) = year.as_year() else {
            return false;
        };
        self.start_year.map_or(true, |start| year >= start)
            && self.end_year.map_or(true, |end| year <= end)
    }

    fn month_matches(&self, month: &Value) -> bool {
        match (&self.months, month) {
            (None, _) => true,
            (Some(months), Value::Text(label)) => months.iter().any(|m| m == label),
            (Some(_), _) => false,
        }
    }
}

/// Returns the rows of `table` that satisfy `filter`. Columns are only
/// required when the corresponding criterion is set. An empty result is not
/// an error.
pub fn filter_by_period(
    table: &Table,
    year_col: &str,
    month_col: &str,
    filter: &PeriodFilter,
) -> Result<Table> {
    if filter.is_unbounded() {
        return Ok(table.clone());
    }

    let year_idx = if filter.start_year.is_some() || filter.end_year.is_some() {
        Some(table.column_index(year_col)?)
    } else {
        None
    };
    let month_idx = if filter.months.is_some() {
        Some(table.column_index(month_col)?)
    } else {
        None
    };

    let filtered = table.filter_rows(|row| {
        year_idx.map_or(true, |idx| filter.year_matches(&row[idx]))
            && month_idx.map_or(true, |idx| filter.month_matches(&row[idx]))
    });

    debug!(
        "Period filter kept {} of {} rows",
        filtered.len(),
        table.len()
    );

    Ok(filtered)
}
