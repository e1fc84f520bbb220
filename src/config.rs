use crate::error::{ReportError, Result};
use crate::metrics::MetricColumns;
use crate::periods::{DEFAULT_MONTH_COLUMN, DEFAULT_YEAR_COLUMN};
use crate::rolling::{WindowAnchor, DEFAULT_ROLLING_WINDOW};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

pub const DEFAULT_START_YEAR: i32 = 2015;
pub const DEFAULT_REGION_COLUMN: &str = "regio";
pub const DEFAULT_PROVINCE_PREFIX: &str = "PROVINCIE";
pub const DEFAULT_REGIONS: [&str; 3] = [
    "VLAAMS GEWEST",
    "WAALS GEWEST",
    "BRUSSELS HOOFDSTEDELIJK GEWEST",
];

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(default)]
pub struct ReportConfig {
    #[schemars(description = "Column holding the calendar year of each observation")]
    pub year_column: String,

    #[schemars(description = "Column holding the Dutch month label (e.g. 'Januari', 'mrt')")]
    pub month_column: String,

    #[schemars(description = "Column holding the region name each row belongs to")]
    pub region_column: String,

    #[schemars(description = "Source columns the house/flat/all-dwelling metrics are derived from")]
    pub metric_columns: MetricColumns,

    #[schemars(description = "First year included in the analysis window (inclusive). Null for no lower bound.")]
    pub start_year: Option<i32>,

    #[schemars(description = "Last year included in the analysis window (inclusive). Null for no upper bound.")]
    pub end_year: Option<i32>,

    #[schemars(description = "Number of points (or calendar months) averaged by the rolling series. Must be at least 1.")]
    pub rolling_window: usize,

    #[schemars(description = "Whether the rolling window counts series points or calendar months")]
    pub window_anchor: WindowAnchor,

    #[schemars(description = "Regions whose name starts with this prefix are reported as provinces")]
    pub province_prefix: String,

    #[schemars(description = "Additional regions that always get a report, in this order")]
    pub regions: Vec<String>,
}

impl Default for ReportConfig {
    fn default() -> Self {
        Self {
            year_column: DEFAULT_YEAR_COLUMN.to_string(),
            month_column: DEFAULT_MONTH_COLUMN.to_string(),
            region_column: DEFAULT_REGION_COLUMN.to_string(),
            metric_columns: MetricColumns::default(),
            start_year: Some(DEFAULT_START_YEAR),
            end_year: None,
            rolling_window: DEFAULT_ROLLING_WINDOW,
            window_anchor: WindowAnchor::Positions,
            province_prefix: DEFAULT_PROVINCE_PREFIX.to_string(),
            regions: DEFAULT_REGIONS.iter().map(|r| r.to_string()).collect(),
        }
    }
}

impl ReportConfig {
    pub fn from_json(json: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.rolling_window == 0 {
            return Err(ReportError::InvalidConfig(
                "rolling_window must be at least 1".to_string(),
            ));
        }

        if let (Some(start), Some(end)) = (self.start_year, self.end_year) {
            if end < start {
                return Err(ReportError::InvalidConfig(format!(
                    "end_year {} is before start_year {}",
                    end, start
                )));
            }
        }

        let columns = [
            ("year_column", &self.year_column),
            ("month_column", &self.month_column),
            ("region_column", &self.region_column),
            ("metric_columns.total", &self.metric_columns.total),
            ("metric_columns.single_family", &self.metric_columns.single_family),
        ];
        for (field, value) in columns {
            if value.trim().is_empty() {
                return Err(ReportError::InvalidConfig(format!("{} is empty", field)));
            }
        }

        Ok(())
    }

    pub fn generate_json_schema() -> schemars::schema::RootSchema {
        schemars::schema_for!(ReportConfig)
    }

    pub fn schema_as_json() -> std::result::Result<String, serde_json::Error> {
        let schema = Self::generate_json_schema();
        serde_json::to_string_pretty(&schema)
    }
}
