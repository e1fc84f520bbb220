//! Monthly time series and trailing averages.
//!
//! A series holds one point per (year, month) that actually occurs in the
//! data. Months without observations are absent, not zero.
//!
//! By default a window of `n` covers the last `n` *points* of the series
//! ([`WindowAnchor::Positions`]). When months are missing, such a window
//! reaches further back than `n` calendar months.
//! [`WindowAnchor::Calendar`] instead keeps only the points within the last
//! `n` calendar months.

use crate::error::{ReportError, Result};
use crate::locale::Period;
use crate::periods::{row_period, Normalized};
use crate::table::{Table, Value};
use crate::utils::months_between;
use chrono::NaiveDate;
use log::debug;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

pub const DEFAULT_ROLLING_WINDOW: usize = 12;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum WindowAnchor {
    #[schemars(description = "Window covers the last N points of the series, regardless of gaps")]
    #[default]
    Positions,

    #[schemars(description = "Window covers points dated within the last N calendar months")]
    Calendar,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MonthlyPoint {
    pub period: Period,
    /// Exact metric sums, in the order of [`MonthlySeries::metrics`].
    pub values: Vec<Value>,
}

impl MonthlyPoint {
    pub fn date(&self) -> NaiveDate {
        self.period.date()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MonthlySeries {
    pub metrics: Vec<String>,
    /// Ascending by date.
    pub points: Vec<MonthlyPoint>,
}

impl MonthlySeries {
    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    pub fn dates(&self) -> Vec<NaiveDate> {
        self.points.iter().map(MonthlyPoint::date).collect()
    }

    fn metric_index(&self, metric: &str) -> Result<usize> {
        self.metrics
            .iter()
            .position(|m| m == metric)
            .ok_or_else(|| ReportError::MissingColumn(metric.to_string()))
    }

    /// The exact monthly sums of `metric`.
    pub fn totals(&self, metric: &str) -> Result<Vec<Value>> {
        let idx = self.metric_index(metric)?;
        Ok(self.points.iter().map(|p| p.values[idx].clone()).collect())
    }

    /// The monthly sums of `metric` as floats, for averaging and charts.
    pub fn values(&self, metric: &str) -> Result<Vec<f64>> {
        let idx = self.metric_index(metric)?;
        Ok(self
            .points
            .iter()
            .map(|p| p.values[idx].as_f64().unwrap_or_default())
            .collect())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RollingPoint {
    pub date: NaiveDate,
    pub value: f64,
}

/// One date with the trailing average of several metrics.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RollingSeriesPoint {
    pub date: NaiveDate,
    pub values: BTreeMap<String, f64>,
}

/// Sums `metric_columns` per (year, month) and orders the buckets by date.
///
/// Month labels are normalized first, so `"Januari"` and `"jan"` in the same
/// year land in one bucket. Rows whose period cannot be resolved are left
/// out and reported.
pub fn monthly_series(
    table: &Table,
    year_col: &str,
    month_col: &str,
    metric_columns: &[&str],
) -> Result<Normalized<MonthlySeries>> {
    let year_idx = table.column_index(year_col)?;
    let month_idx = table.column_index(month_col)?;
    let metric_idx = metric_columns
        .iter()
        .map(|m| table.column_index(m))
        .collect::<Result<Vec<_>>>()?;

    let mut buckets: BTreeMap<Period, Vec<Value>> = BTreeMap::new();
    let mut rejected = Vec::new();

    for (row_idx, row) in table.rows().iter().enumerate() {
        let period = match row_period(row, row_idx, year_idx, month_idx) {
            Ok(period) => period,
            Err(rejection) => {
                rejected.push(rejection);
                continue;
            }
        };

        let sums = buckets
            .entry(period)
            .or_insert_with(|| vec![Value::Int(0); metric_idx.len()]);
        for (slot, (&col, name)) in metric_idx.iter().zip(metric_columns).enumerate() {
            let cell = &row[col];
            if cell.is_null() {
                continue;
            }
            sums[slot] = sums[slot].checked_add(cell).ok_or_else(|| {
                ReportError::InvalidInput(format!(
                    "Non-numeric value {:?} in metric column '{}' at row {}",
                    cell, name, row_idx
                ))
            })?;
        }
    }

    let points: Vec<MonthlyPoint> = buckets
        .into_iter()
        .map(|(period, values)| MonthlyPoint { period, values })
        .collect();

    debug!(
        "Built monthly series with {} points from {} rows ({} rejected)",
        points.len(),
        table.len(),
        rejected.len()
    );

    Ok(Normalized {
        value: MonthlySeries {
            metrics: metric_columns.iter().map(|m| m.to_string()).collect(),
            points,
        },
        rejected,
    })
}

/// Trailing mean of `metric` over the last `window` points.
///
/// Early points average over however many points exist so far, so the
/// output has exactly one value per input point.
pub fn rolling_average(
    series: &MonthlySeries,
    metric: &str,
    window: usize,
) -> Result<Vec<RollingPoint>> {
    rolling_average_with(series, metric, window, WindowAnchor::Positions)
}

pub fn rolling_average_with(
    series: &MonthlySeries,
    metric: &str,
    window: usize,
    anchor: WindowAnchor,
) -> Result<Vec<RollingPoint>> {
    if window == 0 {
        return Err(ReportError::InvalidInput(
            "Rolling window must cover at least one point".to_string(),
        ));
    }

    let values = series.values(metric)?;
    let dates = series.dates();
    let mut out = Vec::with_capacity(values.len());
    let mut start = 0;

    for i in 0..values.len() {
        start = match anchor {
            WindowAnchor::Positions => (i + 1).saturating_sub(window),
            WindowAnchor::Calendar => {
                // dates ascend, so the window start only moves forward
                while months_between(dates[start], dates[i]) >= window as i64 {
                    start += 1;
                }
                start
            }
        };

        let slice = &values[start..=i];
        out.push(RollingPoint {
            date: dates[i],
            value: slice.iter().sum::<f64>() / slice.len() as f64,
        });
    }

    Ok(out)
}

/// Rolling averages for several metrics, one entry per series point.
pub fn rolling_averages(
    series: &MonthlySeries,
    metrics: &[&str],
    window: usize,
    anchor: WindowAnchor,
) -> Result<Vec<RollingSeriesPoint>> {
    let mut points: Vec<RollingSeriesPoint> = series
        .dates()
        .into_iter()
        .map(|date| RollingSeriesPoint {
            date,
            values: BTreeMap::new(),
        })
        .collect();

    for metric in metrics {
        let averaged = rolling_average_with(series, metric, window, anchor)?;
        for (point, rolled) in points.iter_mut().zip(averaged) {
            point.values.insert(metric.to_string(), rolled.value);
        }
    }

    Ok(points)
}
