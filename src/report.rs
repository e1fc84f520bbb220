//! Per-region report assembly and batch generation.
//!
//! A [`RegionReport`] holds everything the presentation layer needs for one
//! region: quarterly sums, the year x quarter pivot, the rolling series and
//! summary figures, plus ready-made chart series. Writing the final document
//! is left to a [`ReportSink`].

use crate::aggregate::{group_sum, pivot_year_by_quarter, QuarterPivot, PIVOT_QUARTER_COLUMNS};
use crate::config::ReportConfig;
use crate::error::{ReportError, Result};
use crate::filter::{filter_by_period, PeriodFilter};
use crate::locale::parse_quarter_key;
use crate::metrics::{ALL_DWELLINGS_COLUMN, FLATS_COLUMN, HOUSES_COLUMN, PERMIT_METRICS};
use crate::periods::{RejectedRow, QUARTER_COLUMN};
use crate::rolling::{monthly_series, rolling_averages, RollingSeriesPoint};
use crate::table::{Table, Value};
use crate::utils::{format_count, sanitize_file_stem};
use log::{error, info, warn};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

const COLOR_TEAL: &str = "#19b6c8";
const COLOR_DARK: &str = "#2f2f2f";
const COLOR_DARK_TEAL: &str = "#15a0ab";
const COLOR_GRAY: &str = "#666666";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChartStyle {
    pub color: String,
    pub width: u32,
    pub markers: bool,
}

impl ChartStyle {
    fn line(color: &str, width: u32, markers: bool) -> Self {
        Self {
            color: color.to_string(),
            width,
            markers,
        }
    }
}

/// One line of a chart, in the shape chart libraries take it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChartSeries {
    pub label: String,
    pub x: Vec<String>,
    pub y: Vec<f64>,
    pub style: ChartStyle,
}

/// A complete chart: where it goes in the page, its titles and its lines.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChartSpec {
    /// Element id the rendered fragment is placed under.
    pub id: String,
    pub title: String,
    pub x_title: String,
    pub y_title: String,
    pub series: Vec<ChartSeries>,
}

/// Turns a chart into an embeddable fragment (for instance a `<div>` plus
/// the script a charting library needs).
pub trait ChartRenderer {
    fn render(&self, chart: &ChartSpec) -> Result<String>;
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReportSummary {
    /// Exact sums; integer counts stay `Int`.
    pub total_permits: Value,
    pub total_houses: Value,
    pub total_flats: Value,
    pub first_year: Option<i32>,
    pub last_year: Option<i32>,
}

impl ReportSummary {
    /// "2015 - 2024", or "-" when the analysis window holds no rows.
    pub fn date_range(&self) -> String {
        match (self.first_year, self.last_year) {
            (Some(first), Some(last)) => format!("{} - {}", first, last),
            _ => "-".to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RegionReport {
    pub region: String,
    /// `kwartaal` plus the three permit metrics, one row per quarter.
    pub quarterly: Table,
    /// `jaar`, `kwartaal`, `alle_woningen`.
    pub year_quarter: Table,
    pub pivot: QuarterPivot,
    pub rolling: Vec<RollingSeriesPoint>,
    pub rolling_window: usize,
    pub summary: ReportSummary,
}

impl RegionReport {
    /// Builds the report for `region` from a table already passed through
    /// [`crate::prepare_observations`].
    pub fn build(prepared: &Table, region: &str, config: &ReportConfig) -> Result<Self> {
        let region_rows = prepared.filter_eq(&config.region_column, &Value::text(region))?;
        if region_rows.is_empty() {
            return Err(ReportError::EmptyRegion(region.to_string()));
        }

        let window = PeriodFilter {
            start_year: config.start_year,
            end_year: config.end_year,
            months: None,
        };
        let filtered = filter_by_period(
            &region_rows,
            &config.year_column,
            &config.month_column,
            &window,
        )?;

        let quarterly = group_sum(&filtered, &[QUARTER_COLUMN], &PERMIT_METRICS)?;
        let year_quarter = group_sum(
            &filtered,
            &[config.year_column.as_str(), QUARTER_COLUMN],
            &[ALL_DWELLINGS_COLUMN],
        )?;
        let pivot = pivot_year_by_quarter(&year_quarter, QUARTER_COLUMN, ALL_DWELLINGS_COLUMN)?;

        // prepared rows already carry a valid period
        let series = monthly_series(
            &filtered,
            &config.year_column,
            &config.month_column,
            &PERMIT_METRICS,
        )?
        .into_strict()?;
        let rolling = rolling_averages(
            &series,
            &PERMIT_METRICS,
            config.rolling_window,
            config.window_anchor,
        )?;

        let years: Vec<i32> = filtered
            .column(&config.year_column)?
            .filter_map(Value::as_year)
            .collect();

        let summary = ReportSummary {
            total_permits: filtered.sum(ALL_DWELLINGS_COLUMN)?,
            total_houses: filtered.sum(HOUSES_COLUMN)?,
            total_flats: filtered.sum(FLATS_COLUMN)?,
            first_year: years.iter().min().copied(),
            last_year: years.iter().max().copied(),
        };

        Ok(Self {
            region: region.to_string(),
            quarterly,
            year_quarter,
            pivot,
            rolling,
            rolling_window: config.rolling_window,
            summary,
        })
    }

    pub fn file_name(&self, extension: &str) -> String {
        report_file_name(&self.region, extension)
    }

    pub fn quarterly_table_html(&self) -> String {
        render_quarterly_table(&self.pivot)
    }

    /// The three permit metrics per quarter.
    pub fn quarterly_chart(&self) -> Result<Vec<ChartSeries>> {
        let x: Vec<String> = self
            .quarterly
            .column(QUARTER_COLUMN)?
            .map(|v| v.as_str().unwrap_or_default().to_string())
            .collect();

        let lines = [
            (HOUSES_COLUMN, "Aantal Huizen", COLOR_TEAL),
            (FLATS_COLUMN, "Aantal Flats", COLOR_DARK),
            (ALL_DWELLINGS_COLUMN, "Alle Woningen", COLOR_DARK_TEAL),
        ];

        lines
            .into_iter()
            .map(|(column, label, color)| {
                Ok(ChartSeries {
                    label: label.to_string(),
                    x: x.clone(),
                    y: self
                        .quarterly
                        .column(column)?
                        .map(|v| v.as_f64().unwrap_or(0.0))
                        .collect(),
                    style: ChartStyle::line(color, 3, true),
                })
            })
            .collect()
    }

    /// One line per quarter across years, for quarters that have data.
    pub fn yearly_quarters_chart(&self) -> Result<Vec<ChartSeries>> {
        let colors = [COLOR_TEAL, COLOR_DARK, COLOR_DARK_TEAL, COLOR_GRAY];
        let mut lines: Vec<ChartSeries> = PIVOT_QUARTER_COLUMNS
            .iter()
            .zip(colors)
            .map(|(label, color)| ChartSeries {
                label: label.to_string(),
                x: Vec::new(),
                y: Vec::new(),
                style: ChartStyle::line(color, 3, true),
            })
            .collect();

        let key_idx = self.year_quarter.column_index(QUARTER_COLUMN)?;
        let value_idx = self.year_quarter.column_index(ALL_DWELLINGS_COLUMN)?;

        // year_quarter is ordered by year, so every line comes out sorted
        for row in self.year_quarter.rows() {
            let key = row[key_idx].as_str().unwrap_or_default();
            let (year, quarter) = parse_quarter_key(key)?;
            let line = &mut lines[quarter as usize - 1];
            line.x.push(year.to_string());
            line.y.push(row[value_idx].as_f64().unwrap_or(0.0));
        }

        lines.retain(|line| !line.x.is_empty());
        Ok(lines)
    }

    pub fn rolling_chart(&self) -> Vec<ChartSeries> {
        let x: Vec<String> = self
            .rolling
            .iter()
            .map(|p| p.date.format("%Y-%m-%d").to_string())
            .collect();
        let suffix = format!("({}m gemiddelde)", self.rolling_window);

        let lines = [
            (HOUSES_COLUMN, "Huizen", COLOR_TEAL, 3),
            (FLATS_COLUMN, "Flats", COLOR_DARK, 3),
            (ALL_DWELLINGS_COLUMN, "Alle Woningen", COLOR_DARK_TEAL, 4),
        ];

        lines
            .into_iter()
            .map(|(column, label, color, width)| ChartSeries {
                label: format!("{} {}", label, suffix),
                x: x.clone(),
                y: self
                    .rolling
                    .iter()
                    .map(|p| p.values.get(column).copied().unwrap_or(0.0))
                    .collect(),
                style: ChartStyle::line(color, width, false),
            })
            .collect()
    }

    /// The three charts of a report page, in page order.
    pub fn charts(&self) -> Result<Vec<ChartSpec>> {
        Ok(vec![
            ChartSpec {
                id: "quarterly-chart".to_string(),
                title: format!("Bouwvergunningen per Kwartaal - {}", self.region),
                x_title: "Kwartaal".to_string(),
                y_title: "Aantal Vergunningen".to_string(),
                series: self.quarterly_chart()?,
            },
            ChartSpec {
                id: "yearly-quarters-chart".to_string(),
                title: format!("Woningen per Jaar en Kwartaal - {}", self.region),
                x_title: "Jaar".to_string(),
                y_title: "Aantal Woningen".to_string(),
                series: self.yearly_quarters_chart()?,
            },
            ChartSpec {
                id: "rolling-average-chart".to_string(),
                title: format!(
                    "{}-Maands Lopend Gemiddelde - {}",
                    self.rolling_window, self.region
                ),
                x_title: "Datum".to_string(),
                y_title: format!(
                    "Gemiddeld Aantal Woningen ({} maanden)",
                    self.rolling_window
                ),
                series: self.rolling_chart(),
            },
        ])
    }

    pub fn render_charts(&self, renderer: &dyn ChartRenderer) -> Result<Vec<String>> {
        self.charts()?
            .iter()
            .map(|chart| renderer.render(chart))
            .collect()
    }
}

/// `("WAALS GEWEST", "html")` -> `"WAALS_GEWEST_rapport.html"`
pub fn report_file_name(region: &str, extension: &str) -> String {
    format!("{}_rapport.{}", sanitize_file_stem(region), extension)
}

/// HTML table with one row per year: Q1..Q4 and the yearly total, counts
/// shown with thousands separators.
pub fn render_quarterly_table(pivot: &QuarterPivot) -> String {
    let mut html = String::from("<table class=\"quarterly-table\">\n");
    html.push_str("<thead>\n<tr>\n<th>Jaar</th>");
    for quarter in PIVOT_QUARTER_COLUMNS {
        html.push_str(&format!("<th>{}</th>", quarter));
    }
    html.push_str("<th>Totaal</th>\n</tr>\n</thead>\n<tbody>\n");

    for row in &pivot.rows {
        html.push_str(&format!("<tr>\n<td><strong>{}</strong></td>\n", row.year));
        for value in &row.quarters {
            html.push_str(&format!("<td>{}</td>\n", format_count(value)));
        }
        html.push_str(&format!(
            "<td><strong>{}</strong></td>\n</tr>\n",
            format_count(&row.total)
        ));
    }

    html.push_str("</tbody>\n</table>\n");
    html
}

/// Regions whose name starts with the configured province prefix, sorted.
pub fn provinces(table: &Table, config: &ReportConfig) -> Result<Vec<String>> {
    Ok(table
        .unique(&config.region_column)?
        .iter()
        .filter_map(Value::as_str)
        .filter(|name| name.starts_with(&config.province_prefix))
        .map(String::from)
        .collect())
}

/// Receives finished reports. Implementations render and store them.
pub trait ReportSink {
    fn write_report(&mut self, report: &RegionReport) -> Result<()>;

    fn write_index(&mut self, provinces: &[String], regions: &[String]) -> Result<()>;
}

/// Writes every report as pretty JSON next to an `index.json`, for
/// templating tools that run after the batch.
pub struct JsonDirectorySink {
    dir: PathBuf,
    written: Vec<String>,
}

#[derive(Debug, Serialize)]
struct IndexFile<'a> {
    provinces: &'a [String],
    regions: &'a [String],
    reports: &'a [String],
}

impl JsonDirectorySink {
    pub fn new(dir: impl AsRef<Path>) -> Result<Self> {
        let dir = dir.as_ref().to_path_buf();
        fs::create_dir_all(&dir)?;
        Ok(Self {
            dir,
            written: Vec::new(),
        })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }
}

impl ReportSink for JsonDirectorySink {
    fn write_report(&mut self, report: &RegionReport) -> Result<()> {
        let file_name = report.file_name("json");
        let path = self.dir.join(&file_name);
        fs::write(&path, serde_json::to_string_pretty(report)?)?;
        info!("Report generated: {}", path.display());
        self.written.push(file_name);
        Ok(())
    }

    fn write_index(&mut self, provinces: &[String], regions: &[String]) -> Result<()> {
        let index = IndexFile {
            provinces,
            regions,
            reports: &self.written,
        };
        let path = self.dir.join("index.json");
        fs::write(&path, serde_json::to_string_pretty(&index)?)?;
        info!("Index file created: {}", path.display());
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ReportFailure {
    pub region: String,
    pub message: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct BatchOutcome {
    pub generated: Vec<String>,
    /// Configured regions without any rows.
    pub skipped: Vec<String>,
    pub failures: Vec<ReportFailure>,
    /// Source rows left out because their period could not be resolved.
    pub rejected: Vec<RejectedRow>,
}

/// Builds and writes a report for every province and configured region.
///
/// A failing region is logged and recorded in the outcome; the remaining
/// regions are still generated.
pub fn generate_all_reports(
    table: &Table,
    config: &ReportConfig,
    sink: &mut dyn ReportSink,
) -> Result<BatchOutcome> {
    config.validate()?;

    let prepared = crate::prepare_observations(table, config)?;
    let provinces = provinces(&prepared.value, config)?;

    let mut outcome = BatchOutcome {
        rejected: prepared.rejected.clone(),
        ..BatchOutcome::default()
    };

    // a configured region may also carry the province prefix
    let mut targets: Vec<&String> = Vec::with_capacity(provinces.len() + config.regions.len());
    for region in provinces.iter().chain(&config.regions) {
        if !targets.contains(&region) {
            targets.push(region);
        }
    }

    info!(
        "Generating reports for {} regions ({} provinces)",
        targets.len(),
        provinces.len()
    );

    for region in targets {
        let result = RegionReport::build(&prepared.value, region, config)
            .and_then(|report| sink.write_report(&report));

        match result {
            Ok(()) => outcome.generated.push(region.clone()),
            Err(ReportError::EmptyRegion(_)) => {
                warn!("No data found for region: {}", region);
                outcome.skipped.push(region.clone());
            }
            Err(e) => {
                error!("Error generating report for {}: {}", region, e);
                outcome.failures.push(ReportFailure {
                    region: region.clone(),
                    message: e.to_string(),
                });
            }
        }
    }

    sink.write_index(&provinces, &config.regions)?;

    info!(
        "Report generation complete: {} generated, {} skipped, {} failed",
        outcome.generated.len(),
        outcome.skipped.len(),
        outcome.failures.len()
    );

    Ok(outcome)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::aggregate::PivotRow;

    fn prepared() -> Table {
        let raw = Table::from_rows(
            [
                "jaar",
                "maand",
                "regio",
                "aantal woningen",
                "aantal gebouwen met één woning",
            ],
            vec![
                vec![2014.into(), "December".into(), "VLAAMS GEWEST".into(), 999.into(), 1.into()],
                vec![2015.into(), "Januari".into(), "VLAAMS GEWEST".into(), 100.into(), 60.into()],
                vec![2015.into(), "Februari".into(), "VLAAMS GEWEST".into(), 50.into(), 30.into()],
                vec![2015.into(), "Juli".into(), "VLAAMS GEWEST".into(), 20.into(), 20.into()],
                vec![2016.into(), "April".into(), "VLAAMS GEWEST".into(), 1500.into(), 500.into()],
                vec![2015.into(), "Januari".into(), "PROVINCIE LIMBURG".into(), 10.into(), 5.into()],
            ],
        )
        .unwrap();
        crate::prepare_observations(&raw, &ReportConfig::default())
            .unwrap()
            .into_strict()
            .unwrap()
    }

    #[test]
    fn test_build_region_report() {
        let report = RegionReport::build(&prepared(), "VLAAMS GEWEST", &ReportConfig::default())
            .unwrap();

        // 2014 is outside the analysis window
        assert_eq!(report.summary.total_permits, Value::Int(1670));
        assert_eq!(report.summary.total_houses, Value::Int(610));
        assert_eq!(report.summary.total_flats, Value::Int(1060));
        assert_eq!(report.summary.date_range(), "2015 - 2016");

        assert_eq!(report.quarterly.len(), 3);
        assert_eq!(report.quarterly.value(0, "kwartaal"), Some(&Value::text("2015-Q1")));
        assert_eq!(report.quarterly.value(0, "alle_woningen"), Some(&Value::Int(150)));

        assert_eq!(
            report.pivot.rows,
            vec![
                PivotRow {
                    year: 2015,
                    quarters: [150, 0, 20, 0].map(Value::Int),
                    total: Value::Int(170),
                },
                PivotRow {
                    year: 2016,
                    quarters: [0, 1500, 0, 0].map(Value::Int),
                    total: Value::Int(1500),
                },
            ]
        );

        assert_eq!(report.rolling.len(), 4);
        assert_eq!(report.rolling[1].values["alle_woningen"], 75.0);
        assert_eq!(report.file_name("html"), "VLAAMS_GEWEST_rapport.html");
        assert_eq!(report.file_name("json"), "VLAAMS_GEWEST_rapport.json");
    }

    #[test]
    fn test_unknown_region_is_empty() {
        assert!(matches!(
            RegionReport::build(&prepared(), "WAALS GEWEST", &ReportConfig::default()),
            Err(ReportError::EmptyRegion(_))
        ));
    }

    #[test]
    fn test_region_outside_window_gives_empty_report() {
        let config = ReportConfig {
            start_year: Some(2020),
            ..ReportConfig::default()
        };
        let report = RegionReport::build(&prepared(), "VLAAMS GEWEST", &config).unwrap();
        assert!(report.pivot.rows.is_empty());
        assert!(report.rolling.is_empty());
        assert_eq!(report.summary.date_range(), "-");
    }

    #[test]
    fn test_chart_series() {
        let report = RegionReport::build(&prepared(), "VLAAMS GEWEST", &ReportConfig::default())
            .unwrap();

        let quarterly = report.quarterly_chart().unwrap();
        assert_eq!(quarterly.len(), 3);
        assert_eq!(quarterly[2].label, "Alle Woningen");
        assert_eq!(quarterly[2].x, vec!["2015-Q1", "2015-Q3", "2016-Q2"]);
        assert_eq!(quarterly[2].y, vec![150.0, 20.0, 1500.0]);

        let yearly = report.yearly_quarters_chart().unwrap();
        let labels: Vec<&str> = yearly.iter().map(|l| l.label.as_str()).collect();
        assert_eq!(labels, vec!["Q1", "Q2", "Q3"]);
        assert_eq!(yearly[0].x, vec!["2015"]);

        let rolling = report.rolling_chart();
        assert_eq!(rolling[0].label, "Huizen (12m gemiddelde)");
        assert_eq!(rolling[0].x[0], "2015-01-01");
        assert_eq!(rolling[2].style.width, 4);
    }

    struct DivRenderer;

    impl ChartRenderer for DivRenderer {
        fn render(&self, chart: &ChartSpec) -> Result<String> {
            Ok(format!(
                "<div id=\"{}\" data-lines=\"{}\">{}</div>",
                chart.id,
                chart.series.len(),
                chart.title
            ))
        }
    }

    #[test]
    fn test_render_charts() {
        let report = RegionReport::build(&prepared(), "VLAAMS GEWEST", &ReportConfig::default())
            .unwrap();

        let fragments = report.render_charts(&DivRenderer).unwrap();
        assert_eq!(
            fragments,
            vec![
                "<div id=\"quarterly-chart\" data-lines=\"3\">Bouwvergunningen per Kwartaal - VLAAMS GEWEST</div>",
                "<div id=\"yearly-quarters-chart\" data-lines=\"3\">Woningen per Jaar en Kwartaal - VLAAMS GEWEST</div>",
                "<div id=\"rolling-average-chart\" data-lines=\"3\">12-Maands Lopend Gemiddelde - VLAAMS GEWEST</div>",
            ]
        );
    }

    #[test]
    fn test_render_quarterly_table() {
        let pivot = QuarterPivot {
            metric: "alle_woningen".to_string(),
            rows: vec![PivotRow {
                year: 2016,
                quarters: [1200, 0, 35, 4].map(Value::Int),
                total: Value::Int(1239),
            }],
        };
        let html = render_quarterly_table(&pivot);
        assert!(html.starts_with("<table class=\"quarterly-table\">"));
        assert!(html.contains("<th>Jaar</th><th>Q1</th><th>Q2</th><th>Q3</th><th>Q4</th><th>Totaal</th>"));
        assert!(html.contains("<td><strong>2016</strong></td>"));
        assert!(html.contains("<td>1,200</td>"));
        assert!(html.contains("<td><strong>1,239</strong></td>"));
    }

    #[test]
    fn test_quarterly_table_prints_large_counts_exactly() {
        let big = 9_007_199_254_740_993_i64;
        let pivot = QuarterPivot {
            metric: "alle_woningen".to_string(),
            rows: vec![PivotRow {
                year: 2023,
                quarters: [big, 0, 0, 0].map(Value::Int),
                total: Value::Int(big),
            }],
        };
        let html = render_quarterly_table(&pivot);
        assert!(html.contains("<td>9,007,199,254,740,993</td>"));
        assert!(html.contains("<td><strong>9,007,199,254,740,993</strong></td>"));
    }

    #[test]
    fn test_provinces() {
        let names = provinces(&prepared(), &ReportConfig::default()).unwrap();
        assert_eq!(names, vec!["PROVINCIE LIMBURG"]);
    }
}
