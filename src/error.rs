use thiserror::Error;

#[derive(Error, Debug)]
pub enum ReportError {
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Unrecognized month label '{label}'{}", at_row(.row))]
    UnrecognizedMonth { row: Option<usize>, label: String },

    #[error("Column '{0}' not found in table")]
    MissingColumn(String),

    #[error("Invalid period key '{0}': expected YYYY-MM or YYYY-QN")]
    InvalidPeriodKey(String),

    #[error("No data found for region: {0}")]
    EmptyRegion(String),

    #[error("Invalid report configuration: {0}")]
    InvalidConfig(String),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
}

fn at_row(row: &Option<usize>) -> String {
    match row {
        Some(row) => format!(" at row {}", row),
        None => String::new(),
    }
}

pub type Result<T> = std::result::Result<T, ReportError>;
