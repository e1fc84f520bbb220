//! # Period Report Builder
//!
//! A library for turning periodically refreshed statistical extracts (Dutch
//! year/month tables such as building permit counts) into the derived
//! tables behind static HTML reports.
//!
//! ## Core Concepts
//!
//! - **Period**: a (year, month) pair resolved from a Dutch month label, with
//!   a first-of-month date, a `YYYY-MM` key and a `YYYY-QN` key
//! - **Standardized table**: the source table plus `datum`, `periode`,
//!   `kwartaal` and `periode_display`
//! - **Quarter pivot**: one row per year with Q1..Q4 and a total
//! - **Rolling series**: trailing averages over the monthly series, one
//!   point per month present in the data
//! - **Rejected rows**: rows whose period cannot be resolved are dropped and
//!   listed, never silently discarded
//!
//! ## Example
//!
//! ```rust,ignore
//! use period_report_builder::*;
//!
//! let table = read_csv_path("data/csv/bouwvergunningen.csv")?;
//! let config = ReportConfig::default();
//!
//! let prepared = prepare_observations(&table, &config)?;
//! for rejected in &prepared.rejected {
//!     eprintln!("skipped row {}: {:?}", rejected.row, rejected.kind);
//! }
//!
//! let report = RegionReport::build(&prepared.value, "VLAAMS GEWEST", &config)?;
//! println!("{}", report.quarterly_table_html());
//!
//! let mut sink = JsonDirectorySink::new("reports/building_permits")?;
//! let outcome = generate_all_reports(&table, &config, &mut sink)?;
//! println!("{} reports written", outcome.generated.len());
//! ```

pub mod aggregate;
pub mod config;
pub mod error;
pub mod filter;
pub mod ingestion;
pub mod locale;
pub mod metrics;
pub mod periods;
pub mod report;
pub mod rolling;
pub mod table;
pub mod utils;

pub use aggregate::{group_sum, pivot_year_by_quarter, PivotRow, QuarterPivot};
pub use config::ReportConfig;
pub use error::{ReportError, Result};
pub use filter::{filter_by_period, PeriodFilter};
pub use ingestion::{read_csv, read_csv_path};
pub use locale::{month_name, month_to_number, parse_month, quarter_of_month, Period};
pub use metrics::{derive_permit_metrics, MetricColumns};
pub use periods::*;
pub use report::{
    generate_all_reports, render_quarterly_table, BatchOutcome, ChartRenderer, ChartSeries,
    ChartSpec, JsonDirectorySink, RegionReport, ReportSink, ReportSummary,
};
pub use rolling::{
    monthly_series, rolling_average, rolling_average_with, rolling_averages, MonthlySeries,
    RollingPoint, RollingSeriesPoint, WindowAnchor, DEFAULT_ROLLING_WINDOW,
};
pub use table::{Table, TableInfo, Value};
pub use utils::{format_count, format_thousands};

use log::{debug, info, warn};

/// Derives the permit metrics and the canonical period columns.
///
/// The result is the input for [`RegionReport::build`]; rows with an
/// unresolvable period are left out and returned in `rejected`.
pub fn prepare_observations(table: &Table, config: &ReportConfig) -> Result<Normalized<Table>> {
    config.validate()?;

    info!(
        "Preparing {} rows ({} columns)",
        table.len(),
        table.columns().len()
    );

    let with_metrics = derive_permit_metrics(table, &config.metric_columns)?;
    let standardized =
        standardize_date_columns(&with_metrics, &config.year_column, &config.month_column)?;

    if !standardized.is_clean() {
        warn!(
            "{} rows dropped because their period could not be resolved",
            standardized.rejected.len()
        );
        for rejected in &standardized.rejected {
            debug!(
                "Rejected row {} ({:?}): '{}'",
                rejected.row, rejected.kind, rejected.label
            );
        }
    }

    Ok(standardized)
}
