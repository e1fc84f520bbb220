use crate::error::Result;
use crate::table::{Table, Value};
use log::{debug, info};
use std::fs::File;
use std::io::Read;
use std::path::Path;

/// Reads a CSV extract with a header row into a [`Table`].
///
/// Cells are typed by inspection: empty cells become `Null`, then integers,
/// then floats, and anything else stays text.
pub fn read_csv<R: Read>(reader: R) -> Result<Table> {
    let mut csv_reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .trim(csv::Trim::Headers)
        .from_reader(reader);

    let headers: Vec<String> = csv_reader.headers()?.iter().map(String::from).collect();
    let mut table = Table::new(headers);

    for record in csv_reader.records() {
        let record = record?;
        table.push_row(record.iter().map(infer_value).collect())?;
    }

    debug!("Null counts per column: {:?}", table.info().null_counts);

    Ok(table)
}

pub fn read_csv_path(path: impl AsRef<Path>) -> Result<Table> {
    let path = path.as_ref();
    info!("Loading data from {}", path.display());

    let table = read_csv(File::open(path)?)?;

    info!(
        "Data loaded: {} rows, {} columns",
        table.len(),
        table.columns().len()
    );
    Ok(table)
}

fn infer_value(raw: &str) -> Value {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Value::Null;
    }
    if let Ok(v) = trimmed.parse::<i64>() {
        return Value::Int(v);
    }
    if let Ok(v) = trimmed.parse::<f64>() {
        if v.is_finite() {
            return Value::Float(v);
        }
    }
    Value::Text(raw.to_string())
}
