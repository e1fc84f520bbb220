use crate::error::{ReportError, Result};
use crate::table::{Table, Value};
use log::warn;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Single-family dwellings.
pub const HOUSES_COLUMN: &str = "aantal_huizen";
/// Dwellings in multi-unit buildings: total minus single-family.
pub const FLATS_COLUMN: &str = "aantal_flats";
/// All dwellings.
pub const ALL_DWELLINGS_COLUMN: &str = "alle_woningen";

pub const PERMIT_METRICS: [&str; 3] = [HOUSES_COLUMN, FLATS_COLUMN, ALL_DWELLINGS_COLUMN];

/// Source columns the permit metrics are derived from.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct MetricColumns {
    #[schemars(description = "Column with the total number of dwellings permitted")]
    pub total: String,

    #[schemars(description = "Column with the number of buildings containing a single dwelling")]
    pub single_family: String,
}

impl Default for MetricColumns {
    fn default() -> Self {
        Self {
            total: "aantal woningen".to_string(),
            single_family: "aantal gebouwen met één woning".to_string(),
        }
    }
}

/// Appends `aantal_huizen`, `aantal_flats` and `alle_woningen` to a copy of
/// `table`.
///
/// A negative flat count means the source totals are inconsistent. It is
/// kept as-is and logged.
pub fn derive_permit_metrics(table: &Table, columns: &MetricColumns) -> Result<Table> {
    let total_idx = table.column_index(&columns.total)?;
    let single_idx = table.column_index(&columns.single_family)?;

    let mut houses = Vec::with_capacity(table.len());
    let mut flats = Vec::with_capacity(table.len());
    let mut all = Vec::with_capacity(table.len());
    let mut negative_rows = 0usize;

    for (row_idx, row) in table.rows().iter().enumerate() {
        let total = &row[total_idx];
        let single = &row[single_idx];

        let multi = if total.is_null() || single.is_null() {
            Value::Null
        } else {
            total.checked_sub(single).ok_or_else(|| {
                ReportError::InvalidInput(format!(
                    "Non-numeric permit counts at row {}: total {:?}, single-family {:?}",
                    row_idx, total, single
                ))
            })?
        };

        if multi.as_f64().is_some_and(|v| v < 0.0) {
            negative_rows += 1;
        }

        houses.push(single.clone());
        flats.push(multi);
        all.push(total.clone());
    }

    if negative_rows > 0 {
        warn!(
            "{} rows have more single-family buildings than dwellings ('{}' < '{}')",
            negative_rows, columns.total, columns.single_family
        );
    }

    table.with_columns(vec![
        (HOUSES_COLUMN.to_string(), houses),
        (FLATS_COLUMN.to_string(), flats),
        (ALL_DWELLINGS_COLUMN.to_string(), all),
    ])
}
