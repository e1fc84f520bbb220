//! A small immutable-by-convention table: named columns over rows of
//! [`Value`] cells. Every transform returns a new table; none of the
//! methods taking `&self` modify the receiver.

use crate::error::{ReportError, Result};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::collections::BTreeMap;

/// A table cell.
///
/// Serialized untagged, dates as ISO `YYYY-MM-DD` strings. `Text` is tried
/// before `Date` when reading JSON back, so a date comes back as `Text`
/// (which [`Value::as_date`] still reads) and text is never turned into a
/// date.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Value {
    Null,
    Int(i64),
    Float(f64),
    Text(String),
    Date(NaiveDate),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum ValueKind {
    Null,
    Int,
    Float,
    Date,
    Text,
}

impl Value {
    pub fn text(value: impl Into<String>) -> Self {
        Value::Text(value.into())
    }

    pub fn kind(&self) -> ValueKind {
        match self {
            Value::Null => ValueKind::Null,
            Value::Int(_) => ValueKind::Int,
            Value::Float(_) => ValueKind::Float,
            Value::Date(_) => ValueKind::Date,
            Value::Text(_) => ValueKind::Text,
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::Text(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Int(v) => Some(*v as f64),
            Value::Float(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_date(&self) -> Option<NaiveDate> {
        match self {
            Value::Date(d) => Some(*d),
            Value::Text(s) => NaiveDate::parse_from_str(s.trim(), "%Y-%m-%d").ok(),
            _ => None,
        }
    }

    /// Reads a calendar year from integers, whole floats, or numeric text.
    pub fn as_year(&self) -> Option<i32> {
        match self {
            Value::Int(v) => i32::try_from(*v).ok(),
            Value::Float(v) if v.fract() == 0.0 => i32::try_from(*v as i64).ok(),
            Value::Text(s) => s.trim().parse().ok(),
            _ => None,
        }
    }

    /// Numeric addition. `Int + Int` stays integral, anything involving a
    /// float is promoted. Returns `None` for non-numeric operands.
    pub fn checked_add(&self, other: &Value) -> Option<Value> {
        match (self, other) {
            (Value::Int(a), Value::Int(b)) => Some(
                a.checked_add(*b)
                    .map(Value::Int)
                    .unwrap_or(Value::Float(*a as f64 + *b as f64)),
            ),
            _ => Some(Value::Float(self.as_f64()? + other.as_f64()?)),
        }
    }

    /// Exact sum of numeric values, nulls skipped. An empty input sums to
    /// `Int(0)`; `None` if any value is not numeric.
    pub fn sum<'a>(values: impl IntoIterator<Item = &'a Value>) -> Option<Value> {
        values
            .into_iter()
            .filter(|v| !v.is_null())
            .try_fold(Value::Int(0), |acc, v| acc.checked_add(v))
    }

    pub fn checked_sub(&self, other: &Value) -> Option<Value> {
        match (self, other) {
            (Value::Int(a), Value::Int(b)) => Some(
                a.checked_sub(*b)
                    .map(Value::Int)
                    .unwrap_or(Value::Float(*a as f64 - *b as f64)),
            ),
            _ => Some(Value::Float(self.as_f64()? - other.as_f64()?)),
        }
    }

    /// Total order used for grouping and sorting. Values of different kinds
    /// order by kind, numbers compare numerically across `Int` and `Float`.
    pub fn total_cmp(&self, other: &Value) -> Ordering {
        match (self, other) {
            (Value::Int(a), Value::Int(b)) => a.cmp(b),
            (Value::Int(_) | Value::Float(_), Value::Int(_) | Value::Float(_)) => {
                let a = self.as_f64().unwrap_or_default();
                let b = other.as_f64().unwrap_or_default();
                a.total_cmp(&b)
            }
            (Value::Date(a), Value::Date(b)) => a.cmp(b),
            (Value::Text(a), Value::Text(b)) => a.cmp(b),
            (Value::Null, Value::Null) => Ordering::Equal,
            _ => self.kind_rank().cmp(&other.kind_rank()),
        }
    }

    fn kind_rank(&self) -> u8 {
        match self {
            Value::Null => 0,
            Value::Int(_) | Value::Float(_) => 1,
            Value::Date(_) => 2,
            Value::Text(_) => 3,
        }
    }
}

impl From<i64> for Value {
    fn from(value: i64) -> Self {
        Value::Int(value)
    }
}

impl From<i32> for Value {
    fn from(value: i32) -> Self {
        Value::Int(value as i64)
    }
}

impl From<f64> for Value {
    fn from(value: f64) -> Self {
        Value::Float(value)
    }
}

impl From<&str> for Value {
    fn from(value: &str) -> Self {
        Value::Text(value.to_string())
    }
}

impl From<String> for Value {
    fn from(value: String) -> Self {
        Value::Text(value)
    }
}

impl From<NaiveDate> for Value {
    fn from(value: NaiveDate) -> Self {
        Value::Date(value)
    }
}

/// Wrapper giving [`Value`] `Ord` so it can key a `BTreeMap`.
#[derive(Debug, Clone)]
pub struct KeyValue(pub Value);

impl PartialEq for KeyValue {
    fn eq(&self, other: &Self) -> bool {
        self.0.total_cmp(&other.0) == Ordering::Equal
    }
}

impl Eq for KeyValue {}

impl PartialOrd for KeyValue {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for KeyValue {
    fn cmp(&self, other: &Self) -> Ordering {
        self.0.total_cmp(&other.0)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Table {
    columns: Vec<String>,
    rows: Vec<Vec<Value>>,
}

/// Shape and per-column summary of a loaded table.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TableInfo {
    pub rows: usize,
    pub columns: Vec<String>,
    pub null_counts: BTreeMap<String, usize>,
    /// Kinds observed in each column, nulls excluded.
    pub kinds: BTreeMap<String, Vec<ValueKind>>,
}

impl Table {
    pub fn new<S: Into<String>>(columns: impl IntoIterator<Item = S>) -> Self {
        Self {
            columns: columns.into_iter().map(Into::into).collect(),
            rows: Vec::new(),
        }
    }

    pub fn from_rows<S: Into<String>>(
        columns: impl IntoIterator<Item = S>,
        rows: Vec<Vec<Value>>,
    ) -> Result<Self> {
        let mut table = Self::new(columns);
        for row in rows {
            table.push_row(row)?;
        }
        Ok(table)
    }

    /// Appends a row while the table is being built.
    pub fn push_row(&mut self, row: Vec<Value>) -> Result<()> {
        if row.len() != self.columns.len() {
            return Err(ReportError::InvalidInput(format!(
                "Row {} has {} cells, table has {} columns",
                self.rows.len(),
                row.len(),
                self.columns.len()
            )));
        }
        self.rows.push(row);
        Ok(())
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn rows(&self) -> &[Vec<Value>] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn has_column(&self, name: &str) -> bool {
        self.columns.iter().any(|c| c == name)
    }

    pub fn column_index(&self, name: &str) -> Result<usize> {
        self.columns
            .iter()
            .position(|c| c == name)
            .ok_or_else(|| ReportError::MissingColumn(name.to_string()))
    }

    pub fn column(&self, name: &str) -> Result<impl Iterator<Item = &Value> + '_> {
        let idx = self.column_index(name)?;
        Ok(self.rows.iter().map(move |row| &row[idx]))
    }

    pub fn value(&self, row: usize, column: &str) -> Option<&Value> {
        let idx = self.columns.iter().position(|c| c == column)?;
        self.rows.get(row).map(|r| &r[idx])
    }

    /// Returns a copy with `name` set to `values`, replacing an existing
    /// column of that name or appending a new one.
    pub fn with_column(&self, name: &str, values: Vec<Value>) -> Result<Table> {
        self.with_columns(vec![(name.to_string(), values)])
    }

    pub fn with_columns(&self, new_columns: Vec<(String, Vec<Value>)>) -> Result<Table> {
        let mut table = self.clone();

        for (name, values) in new_columns {
            if values.len() != table.rows.len() {
                return Err(ReportError::InvalidInput(format!(
                    "Column '{}' has {} values, table has {} rows",
                    name,
                    values.len(),
                    table.rows.len()
                )));
            }

            match table.columns.iter().position(|c| *c == name) {
                Some(idx) => {
                    for (row, value) in table.rows.iter_mut().zip(values) {
                        row[idx] = value;
                    }
                }
                None => {
                    table.columns.push(name);
                    for (row, value) in table.rows.iter_mut().zip(values) {
                        row.push(value);
                    }
                }
            }
        }

        Ok(table)
    }

    /// Rows at the given positions, in the given order.
    pub fn select_rows(&self, indices: &[usize]) -> Table {
        Table {
            columns: self.columns.clone(),
            rows: indices
                .iter()
                .filter_map(|&i| self.rows.get(i).cloned())
                .collect(),
        }
    }

    pub fn filter_rows<F>(&self, predicate: F) -> Table
    where
        F: Fn(&[Value]) -> bool,
    {
        Table {
            columns: self.columns.clone(),
            rows: self
                .rows
                .iter()
                .filter(|row| predicate(row))
                .cloned()
                .collect(),
        }
    }

    /// Rows whose `column` holds exactly `value`.
    pub fn filter_eq(&self, column: &str, value: &Value) -> Result<Table> {
        let idx = self.column_index(column)?;
        Ok(self.filter_rows(|row| row[idx] == *value))
    }

    /// Stable ascending sort on one column.
    pub fn sort_by_column(&self, column: &str) -> Result<Table> {
        let idx = self.column_index(column)?;
        let mut rows = self.rows.clone();
        rows.sort_by(|a, b| a[idx].total_cmp(&b[idx]));
        Ok(Table {
            columns: self.columns.clone(),
            rows,
        })
    }

    /// Distinct values of a column, ascending.
    pub fn unique(&self, column: &str) -> Result<Vec<Value>> {
        let mut values: Vec<Value> = self.column(column)?.cloned().collect();
        values.sort_by(|a, b| a.total_cmp(b));
        values.dedup_by(|a, b| a.total_cmp(b) == Ordering::Equal);
        Ok(values)
    }

    /// Exact sum of the numeric cells of a column; nulls are skipped and
    /// integer columns sum to an `Int`.
    pub fn sum(&self, column: &str) -> Result<Value> {
        let idx = self.column_index(column)?;
        let mut total = Value::Int(0);
        for (row_idx, row) in self.rows.iter().enumerate() {
            let value = &row[idx];
            if value.is_null() {
                continue;
            }
            total = total.checked_add(value).ok_or_else(|| {
                ReportError::InvalidInput(format!(
                    "Non-numeric value {:?} in column '{}' at row {}",
                    value, column, row_idx
                ))
            })?;
        }
        Ok(total)
    }

    pub fn info(&self) -> TableInfo {
        let mut null_counts = BTreeMap::new();
        let mut kinds = BTreeMap::new();

        for (idx, name) in self.columns.iter().enumerate() {
            let mut nulls = 0;
            let mut seen: Vec<ValueKind> = Vec::new();
            for row in &self.rows {
                let kind = row[idx].kind();
                if kind == ValueKind::Null {
                    nulls += 1;
                } else if !seen.contains(&kind) {
                    seen.push(kind);
                }
            }
            seen.sort();
            null_counts.insert(name.clone(), nulls);
            kinds.insert(name.clone(), seen);
        }

        TableInfo {
            rows: self.rows.len(),
            columns: self.columns.clone(),
            null_counts,
            kinds,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Table {
        Table::from_rows(
            ["jaar", "maand", "waarde"],
            vec![
                vec![2023.into(), "Januari".into(), 100.into()],
                vec![2023.into(), "Februari".into(), Value::Null],
                vec![2024.into(), "Januari".into(), 12.5.into()],
            ],
        )
        .unwrap()
    }

    #[test]
    fn test_from_rows_rejects_ragged_rows() {
        let result = Table::from_rows(["a", "b"], vec![vec![1.into()]]);
        assert!(matches!(result, Err(ReportError::InvalidInput(_))));
    }

    #[test]
    fn test_with_column_is_copy_on_write() {
        let table = sample();
        let extended = table
            .with_column("flag", vec![1.into(), 2.into(), 3.into()])
            .unwrap();

        assert_eq!(table.columns().len(), 3);
        assert_eq!(extended.columns().len(), 4);
        assert_eq!(extended.value(2, "flag"), Some(&Value::Int(3)));

        let replaced = extended
            .with_column("flag", vec![Value::Null, Value::Null, Value::Null])
            .unwrap();
        assert_eq!(replaced.columns().len(), 4);
        assert_eq!(extended.value(2, "flag"), Some(&Value::Int(3)));
        assert_eq!(replaced.value(2, "flag"), Some(&Value::Null));
    }

    #[test]
    fn test_with_column_length_mismatch() {
        let table = sample();
        assert!(table.with_column("x", vec![1.into()]).is_err());
    }

    #[test]
    fn test_missing_column() {
        let table = sample();
        match table.column_index("regio") {
            Err(ReportError::MissingColumn(name)) => assert_eq!(name, "regio"),
            other => panic!("expected MissingColumn, got {:?}", other),
        }
    }

    #[test]
    fn test_checked_arithmetic_keeps_integers() {
        assert_eq!(
            Value::Int(2).checked_add(&Value::Int(3)),
            Some(Value::Int(5))
        );
        assert_eq!(
            Value::Int(2).checked_add(&Value::Float(0.5)),
            Some(Value::Float(2.5))
        );
        assert_eq!(
            Value::Int(2).checked_sub(&Value::Int(5)),
            Some(Value::Int(-3))
        );
        assert_eq!(Value::text("x").checked_add(&Value::Int(1)), None);
    }

    #[test]
    fn test_as_year() {
        assert_eq!(Value::Int(2023).as_year(), Some(2023));
        assert_eq!(Value::Float(2023.0).as_year(), Some(2023));
        assert_eq!(Value::text(" 2023 ").as_year(), Some(2023));
        assert_eq!(Value::Float(2023.5).as_year(), None);
        assert_eq!(Value::Null.as_year(), None);
    }

    #[test]
    fn test_unique_and_sum() {
        let table = sample();
        assert_eq!(
            table.unique("jaar").unwrap(),
            vec![Value::Int(2023), Value::Int(2024)]
        );
        assert_eq!(table.sum("waarde").unwrap(), Value::Float(112.5));
        assert!(table.sum("maand").is_err());
    }

    #[test]
    fn test_integer_sums_are_exact() {
        let big = 9_007_199_254_740_993_i64;
        let table = Table::from_rows(
            ["waarde"],
            vec![vec![big.into()], vec![Value::Null], vec![1.into()]],
        )
        .unwrap();
        assert_eq!(table.sum("waarde").unwrap(), Value::Int(big + 1));
        assert_eq!(
            Value::sum(&[Value::Int(big), Value::Int(-1)]),
            Some(Value::Int(big - 1))
        );
        assert_eq!(Value::sum(&[]), Some(Value::Int(0)));
        assert_eq!(Value::sum(&[Value::text("x")]), None);
    }

    #[test]
    fn test_json_round_trip_keeps_date_like_text() {
        let cells = vec![
            Value::text("2023-01-01"),
            Value::Date(NaiveDate::from_ymd_opt(2023, 3, 1).unwrap()),
            Value::Int(7),
            Value::Float(1.5),
            Value::Null,
        ];
        let json = serde_json::to_string(&cells).unwrap();
        assert_eq!(json, r#"["2023-01-01","2023-03-01",7,1.5,null]"#);

        let back: Vec<Value> = serde_json::from_str(&json).unwrap();
        assert_eq!(back[0], Value::text("2023-01-01"));
        assert_eq!(back[1].as_date(), NaiveDate::from_ymd_opt(2023, 3, 1));
        assert_eq!(back[2..], cells[2..]);
    }

    #[test]
    fn test_sort_by_column() {
        let table = sample().sort_by_column("maand").unwrap();
        assert_eq!(table.value(0, "maand"), Some(&Value::text("Februari")));
    }

    #[test]
    fn test_info_counts_nulls_and_kinds() {
        let info = sample().info();
        assert_eq!(info.rows, 3);
        assert_eq!(info.null_counts["waarde"], 1);
        assert_eq!(info.kinds["waarde"], vec![ValueKind::Int, ValueKind::Float]);
        assert_eq!(info.kinds["maand"], vec![ValueKind::Text]);
    }
}
