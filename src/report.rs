//! Report table
//!
//! The merged per-day table handed to formatters. It is produced once per
//! input by the aggregator and never modified afterwards; formatters read it
//! through the accessors here instead of re-deriving anything.

use crate::types::{DayKey, DistanceBucket};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Metric families of the report
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Metric {
    /// Exposure duration in minutes
    ExposureMinutes,
    /// Number of exposure windows
    ContactCount,
    /// Device-reported daily score
    OfficialScore,
    /// Attenuation-weighted duration computed here
    ApproximatedScore,
    /// Approximated score if every sample had its minimum attenuation
    BestCaseScore,
}

impl Metric {
    pub fn label(&self) -> &'static str {
        match self {
            Metric::ExposureMinutes => "minutes",
            Metric::ContactCount => "contacts",
            Metric::OfficialScore => "official score",
            Metric::ApproximatedScore => "score",
            Metric::BestCaseScore => "best-case score",
        }
    }
}

/// One column: a metric, optionally narrowed to a distance bucket.
///
/// `bucket == None` is the metric's total across buckets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ReportColumn {
    pub metric: Metric,
    pub bucket: Option<DistanceBucket>,
}

impl ReportColumn {
    const fn total(metric: Metric) -> Self {
        Self {
            metric,
            bucket: None,
        }
    }

    const fn bucket(metric: Metric, bucket: DistanceBucket) -> Self {
        Self {
            metric,
            bucket: Some(bucket),
        }
    }

    pub fn heading(&self) -> String {
        match (self.metric, self.bucket) {
            (Metric::ContactCount, _) | (Metric::OfficialScore, _) | (Metric::BestCaseScore, _) => {
                self.metric.label().to_string()
            }
            (metric, Some(bucket)) => format!("{} {}", metric.label(), bucket.label()),
            (metric, None) => format!("{} total", metric.label()),
        }
    }
}

impl fmt::Display for ReportColumn {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.heading())
    }
}

/// Column layout of every report, in display order
pub const COLUMNS: [ReportColumn; 13] = [
    ReportColumn::bucket(Metric::ExposureMinutes, DistanceBucket::Immediate),
    ReportColumn::bucket(Metric::ExposureMinutes, DistanceBucket::Near),
    ReportColumn::bucket(Metric::ExposureMinutes, DistanceBucket::Medium),
    ReportColumn::bucket(Metric::ExposureMinutes, DistanceBucket::Other),
    ReportColumn::total(Metric::ExposureMinutes),
    ReportColumn::total(Metric::ContactCount),
    ReportColumn::total(Metric::OfficialScore),
    ReportColumn::bucket(Metric::ApproximatedScore, DistanceBucket::Immediate),
    ReportColumn::bucket(Metric::ApproximatedScore, DistanceBucket::Near),
    ReportColumn::bucket(Metric::ApproximatedScore, DistanceBucket::Medium),
    ReportColumn::bucket(Metric::ApproximatedScore, DistanceBucket::Other),
    ReportColumn::total(Metric::ApproximatedScore),
    ReportColumn::total(Metric::BestCaseScore),
];

/// Row identity: a calendar day or the synthetic grand total
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RowKey {
    Day(DayKey),
    GrandTotal,
}

impl RowKey {
    /// Date label, `"Total"` for the grand-total row
    pub fn date_label(&self) -> String {
        match self {
            RowKey::Day(day) => day.date.format("%Y-%m-%d").to_string(),
            RowKey::GrandTotal => "Total".to_string(),
        }
    }

    pub fn day_of_week(&self) -> &str {
        match self {
            RowKey::Day(day) => &day.day_of_week,
            RowKey::GrandTotal => "",
        }
    }
}

/// One row of the merged table
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReportRow {
    pub key: RowKey,
    /// Exposure minutes per bucket, indexed by [`DistanceBucket::index`]
    pub minutes_by_bucket: [f64; 4],
    pub minutes_total: f64,
    pub contact_count: u64,
    pub official_score: f64,
    /// Approximated score per bucket, indexed by [`DistanceBucket::index`]
    pub score_by_bucket: [f64; 4],
    pub score_total: f64,
    pub best_case_score: f64,
}

impl ReportRow {
    /// All-zero row for `key`
    pub fn zeroed(key: RowKey) -> Self {
        Self {
            key,
            minutes_by_bucket: [0.0; 4],
            minutes_total: 0.0,
            contact_count: 0,
            official_score: 0.0,
            score_by_bucket: [0.0; 4],
            score_total: 0.0,
            best_case_score: 0.0,
        }
    }

    pub fn is_grand_total(&self) -> bool {
        matches!(self.key, RowKey::GrandTotal)
    }

    pub fn value(&self, column: ReportColumn) -> f64 {
        match (column.metric, column.bucket) {
            (Metric::ExposureMinutes, Some(b)) => self.minutes_by_bucket[b.index()],
            (Metric::ExposureMinutes, None) => self.minutes_total,
            (Metric::ApproximatedScore, Some(b)) => self.score_by_bucket[b.index()],
            (Metric::ApproximatedScore, None) => self.score_total,
            (Metric::ContactCount, _) => self.contact_count as f64,
            (Metric::OfficialScore, _) => self.official_score,
            (Metric::BestCaseScore, _) => self.best_case_score,
        }
    }

    /// Values in [`COLUMNS`] order
    pub fn values(&self) -> Vec<f64> {
        COLUMNS.iter().map(|c| self.value(*c)).collect()
    }

    /// True if either score column meets `threshold`
    pub fn exceeds(&self, threshold: f64) -> bool {
        self.official_score >= threshold || self.score_total >= threshold
    }
}

/// The four bar charts drawn from a report
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChartMetric {
    ContactCount,
    ExposureMinutes,
    OfficialScore,
    ApproximatedScore,
}

impl ChartMetric {
    pub const ALL: [ChartMetric; 4] = [
        ChartMetric::ContactCount,
        ChartMetric::ExposureMinutes,
        ChartMetric::OfficialScore,
        ChartMetric::ApproximatedScore,
    ];

    /// Column charted for this metric
    pub fn column(&self) -> ReportColumn {
        match self {
            ChartMetric::ContactCount => ReportColumn::total(Metric::ContactCount),
            ChartMetric::ExposureMinutes => ReportColumn::total(Metric::ExposureMinutes),
            ChartMetric::OfficialScore => ReportColumn::total(Metric::OfficialScore),
            ChartMetric::ApproximatedScore => ReportColumn::total(Metric::ApproximatedScore),
        }
    }

    pub fn title(&self) -> &'static str {
        match self {
            ChartMetric::ContactCount => "Contact count",
            ChartMetric::ExposureMinutes => "Exposure minutes",
            ChartMetric::OfficialScore => "Official score",
            ChartMetric::ApproximatedScore => "Approximated score",
        }
    }
}

/// One bar of a chart
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SeriesPoint {
    pub label: String,
    pub value: f64,
}

/// Dense per-day report with a trailing grand total
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReportTable {
    rows: Vec<ReportRow>,
    grand_total: ReportRow,
}

impl ReportTable {
    /// Build a table from date-ordered rows and their grand total
    pub(crate) fn new(rows: Vec<ReportRow>, grand_total: ReportRow) -> Self {
        Self { rows, grand_total }
    }

    /// Per-day rows, ascending by date
    pub fn data_rows(&self) -> &[ReportRow] {
        &self.rows
    }

    pub fn grand_total(&self) -> &ReportRow {
        &self.grand_total
    }

    /// Per-day rows followed by the grand total
    pub fn rows(&self) -> impl Iterator<Item = &ReportRow> {
        self.rows.iter().chain(std::iter::once(&self.grand_total))
    }

    /// False when the table holds nothing but a grand total
    pub fn has_data(&self) -> bool {
        !self.rows.is_empty()
    }

    pub fn columns(&self) -> &'static [ReportColumn] {
        &COLUMNS
    }

    /// Headings including the leading date and weekday columns
    pub fn headings(&self) -> Vec<String> {
        let mut headings = vec!["date".to_string(), "dow".to_string()];
        headings.extend(COLUMNS.iter().map(|c| c.heading()));
        headings
    }

    /// One point per date for a chart; the grand total is not charted
    pub fn metric_series(&self, metric: ChartMetric) -> Vec<SeriesPoint> {
        let column = metric.column();
        self.rows
            .iter()
            .map(|row| SeriesPoint {
                label: row.key.date_label(),
                value: row.value(column),
            })
            .collect()
    }

    /// Days whose official or approximated score meets `threshold`
    pub fn alert_rows(&self, threshold: f64) -> Vec<&ReportRow> {
        self.rows.iter().filter(|row| row.exceeds(threshold)).collect()
    }
}
