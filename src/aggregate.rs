//! Grouped sums over period keys and the year x quarter pivot used by the
//! quarterly summary tables.

use crate::error::{ReportError, Result};
use crate::locale::parse_quarter_key;
use crate::table::{KeyValue, Table, Value};
use log::debug;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

pub const PIVOT_YEAR_COLUMN: &str = "jaar";
pub const PIVOT_TOTAL_COLUMN: &str = "Totaal";
pub const PIVOT_QUARTER_COLUMNS: [&str; 4] = ["Q1", "Q2", "Q3", "Q4"];

/// Groups rows by the tuple of `group_keys` and sums each metric column.
///
/// The result has the key columns followed by the metric columns, one row
/// per distinct key tuple in ascending key order. Integer metrics stay
/// integers; null cells add nothing.
pub fn group_sum(table: &Table, group_keys: &[&str], metric_columns: &[&str]) -> Result<Table> {
    if group_keys.is_empty() {
        return Err(ReportError::InvalidInput(
            "group_sum needs at least one group key".to_string(),
        ));
    }
    if let Some(overlap) = metric_columns.iter().find(|m| group_keys.contains(*m)) {
        return Err(ReportError::InvalidInput(format!(
            "Column '{}' cannot be both a group key and a metric",
            overlap
        )));
    }

    let key_idx = group_keys
        .iter()
        .map(|k| table.column_index(k))
        .collect::<Result<Vec<_>>>()?;
    let metric_idx = metric_columns
        .iter()
        .map(|m| table.column_index(m))
        .collect::<Result<Vec<_>>>()?;

    let mut groups: BTreeMap<Vec<KeyValue>, Vec<Value>> = BTreeMap::new();

    for (row_idx, row) in table.rows().iter().enumerate() {
        let key: Vec<KeyValue> = key_idx.iter().map(|&i| KeyValue(row[i].clone())).collect();
        let sums = groups
            .entry(key)
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

    let columns: Vec<&str> = group_keys.iter().chain(metric_columns).copied().collect();
    let mut result = Table::new(columns);
    for (key, sums) in groups {
        let mut row: Vec<Value> = key.into_iter().map(|k| k.0).collect();
        row.extend(sums);
        result.push_row(row)?;
    }

    debug!(
        "Grouped {} rows into {} buckets by {:?}",
        table.len(),
        result.len(),
        group_keys
    );

    Ok(result)
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PivotRow {
    pub year: i32,
    /// Q1..Q4, zero where the input had no bucket. Exact sums: integer
    /// inputs stay `Int`.
    pub quarters: [Value; 4],
    pub total: Value,
}

/// Wide year x quarter view of one metric.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QuarterPivot {
    pub metric: String,
    /// Ascending by year.
    pub rows: Vec<PivotRow>,
}

impl QuarterPivot {
    pub fn year(&self, year: i32) -> Option<&PivotRow> {
        self.rows.iter().find(|r| r.year == year)
    }

    /// `jaar`, `Q1`..`Q4`, `Totaal`.
    pub fn to_table(&self) -> Result<Table> {
        let columns = std::iter::once(PIVOT_YEAR_COLUMN)
            .chain(PIVOT_QUARTER_COLUMNS)
            .chain(std::iter::once(PIVOT_TOTAL_COLUMN));
        let mut table = Table::new(columns);

        for row in &self.rows {
            let mut cells = vec![Value::Int(row.year as i64)];
            cells.extend(row.quarters.iter().cloned());
            cells.push(row.total.clone());
            table.push_row(cells)?;
        }

        Ok(table)
    }
}

/// Pivots quarter buckets into one row per year with Q1..Q4 and a total.
///
/// Year and quarter come from the `YYYY-QN` key in `quarter_col`. Every year
/// present in the input gets all four cells (missing ones are zero); years
/// absent from the input never appear. Several rows for the same quarter
/// are added together.
pub fn pivot_year_by_quarter(
    table: &Table,
    quarter_col: &str,
    metric_col: &str,
) -> Result<QuarterPivot> {
    let quarter_idx = table.column_index(quarter_col)?;
    let metric_idx = table.column_index(metric_col)?;

    let mut years: BTreeMap<i32, [Value; 4]> = BTreeMap::new();

    for (row_idx, row) in table.rows().iter().enumerate() {
        let key = row[quarter_idx].as_str().ok_or_else(|| {
            ReportError::InvalidInput(format!(
                "Quarter key at row {} is not text: {:?}",
                row_idx, row[quarter_idx]
            ))
        })?;
        let (year, quarter) = parse_quarter_key(key)?;

        let cells = years
            .entry(year)
            .or_insert_with(|| std::array::from_fn(|_| Value::Int(0)));

        let cell = &row[metric_idx];
        if cell.is_null() {
            continue;
        }
        let slot = &mut cells[quarter as usize - 1];
        *slot = slot.checked_add(cell).ok_or_else(|| {
            ReportError::InvalidInput(format!(
                "Non-numeric value {:?} in metric column '{}' at row {}",
                cell, metric_col, row_idx
            ))
        })?;
    }

    let rows = years
        .into_iter()
        .map(|(year, quarters)| {
            let total = Value::sum(&quarters).ok_or_else(|| {
                ReportError::InvalidInput(format!("Non-numeric quarter total for {}", year))
            })?;
            Ok(PivotRow {
                year,
                quarters,
                total,
            })
        })
        .collect::<Result<Vec<_>>>()?;

    Ok(QuarterPivot {
        metric: metric_col.to_string(),
        rows,
    })
}
