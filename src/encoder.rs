//! Report encoding
//!
//! Encodes a check outcome into a JSON payload or a plain-text table.
//! Values are rounded to one decimal place here and only here.

use crate::config::{CheckerConfig, ConfigEcho};
use crate::error::CheckerError;
use crate::pipeline::{CheckOutcome, ReportStatus};
use crate::report::{ReportRow, ReportTable};
use crate::types::LogSummary;
use crate::{CHECKER_VERSION, PRODUCER_NAME};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Current report payload version
pub const REPORT_VERSION: &str = "1.0.0";

/// Producer metadata
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReportProducer {
    pub name: String,
    pub version: String,
    pub instance_id: String,
}

/// Where and how the report was computed
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReportProvenance {
    #[serde(flatten)]
    pub config: ConfigEcho,
    pub computed_at_utc: String,
}

/// One encoded table row
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PayloadRow {
    pub date: String,
    pub day_of_week: String,
    /// Values in `columns` order
    pub values: Vec<f64>,
    /// Official or approximated score at or above the alert threshold
    pub alert: bool,
}

/// Complete encoded report
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReportPayload {
    pub report_version: String,
    pub producer: ReportProducer,
    pub provenance: ReportProvenance,
    pub status: ReportStatus,
    pub details: Vec<String>,
    pub summary: Option<LogSummary>,
    pub columns: Vec<String>,
    pub rows: Vec<PayloadRow>,
    pub grand_total: Option<PayloadRow>,
}

/// Report encoder
pub struct ReportEncoder {
    instance_id: String,
}

impl Default for ReportEncoder {
    fn default() -> Self {
        Self::new()
    }
}

impl ReportEncoder {
    /// Create a new encoder with a unique instance ID
    pub fn new() -> Self {
        Self {
            instance_id: Uuid::new_v4().to_string(),
        }
    }

    /// Create an encoder with a specific instance ID
    pub fn with_instance_id(instance_id: String) -> Self {
        Self { instance_id }
    }

    /// Encode a check outcome into a payload
    pub fn encode(&self, outcome: &CheckOutcome, config: &CheckerConfig) -> ReportPayload {
        let threshold = config.score_alert_threshold;
        let report = outcome.report.as_ref();

        let columns = report.map(|r| r.headings()[2..].to_vec()).unwrap_or_default();
        let rows: Vec<PayloadRow> = report
            .map(|r| r.data_rows().iter().map(|row| encode_row(row, threshold)).collect())
            .unwrap_or_default();
        let grand_total = report.map(|r| encode_row(r.grand_total(), threshold));

        ReportPayload {
            report_version: REPORT_VERSION.to_string(),
            producer: ReportProducer {
                name: PRODUCER_NAME.to_string(),
                version: CHECKER_VERSION.to_string(),
                instance_id: self.instance_id.clone(),
            },
            provenance: ReportProvenance {
                config: ConfigEcho::from(config),
                computed_at_utc: Utc::now().to_rfc3339(),
            },
            status: outcome.status,
            details: outcome.details.clone(),
            summary: outcome.summary.clone(),
            columns,
            rows,
            grand_total,
        }
    }

    /// Encode to compact JSON
    pub fn encode_to_json(
        &self,
        outcome: &CheckOutcome,
        config: &CheckerConfig,
    ) -> Result<String, CheckerError> {
        let payload = self.encode(outcome, config);
        serde_json::to_string(&payload).map_err(|e| CheckerError::EncodingError(e.to_string()))
    }

    /// Encode to pretty-printed JSON
    pub fn encode_to_json_pretty(
        &self,
        outcome: &CheckOutcome,
        config: &CheckerConfig,
    ) -> Result<String, CheckerError> {
        let payload = self.encode(outcome, config);
        serde_json::to_string_pretty(&payload)
            .map_err(|e| CheckerError::EncodingError(e.to_string()))
    }
}

fn encode_row(row: &ReportRow, threshold: f64) -> PayloadRow {
    PayloadRow {
        date: row.key.date_label(),
        day_of_week: row.key.day_of_week().to_string(),
        values: row.values(),
        alert: !row.is_grand_total() && row.exceeds(threshold),
    }
}

/// Render the table as aligned plain text, marking alert days with `!`
pub fn render_text_table(report: &ReportTable, threshold: f64) -> String {
    let headings = report.headings();
    let mut lines: Vec<Vec<String>> = vec![headings];

    for row in report.rows() {
        let mut cells = vec![row.key.date_label(), row.key.day_of_week().to_string()];
        cells.extend(row.values().into_iter().map(format_value));
        if !row.is_grand_total() && row.exceeds(threshold) {
            cells[0].push('!');
        }
        lines.push(cells);
    }

    let widths: Vec<usize> = (0..lines[0].len())
        .map(|col| {
            lines
                .iter()
                .map(|cells| cells[col].chars().count())
                .max()
                .unwrap_or(0)
        })
        .collect();

    let mut out = String::new();
    for cells in &lines {
        let padded: Vec<String> = cells
            .iter()
            .zip(&widths)
            .enumerate()
            .map(|(i, (cell, width))| {
                let pad = width - cell.chars().count();
                if i < 2 {
                    format!("{}{}", cell, " ".repeat(pad))
                } else {
                    format!("{}{}", " ".repeat(pad), cell)
                }
            })
            .collect();
        out.push_str(padded.join("  ").trim_end());
        out.push('\n');
    }
    out
}

/// One decimal place with thousands separators, e.g. `1,350.0`
pub fn format_value(value: f64) -> String {
    let fixed = format!("{:.1}", value.abs());
    let (int_part, frac_part) = fixed.split_once('.').unwrap_or((fixed.as_str(), "0"));

    let mut grouped = String::with_capacity(int_part.len() + int_part.len() / 3);
    for (i, ch) in int_part.chars().enumerate() {
        if i > 0 && (int_part.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(ch);
    }

    let negative = value < 0.0 && fixed.chars().any(|c| c != '0' && c != '.');
    format!("{}{}.{}", if negative { "-" } else { "" }, grouped, frac_part)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::check_log;

    const LOG: &str = r#"{
        "daily_summaries": [
            { "DateMillisSinceEpoch": 1660489200000, "DaySummary": { "WeightedDurationSum": 1500.0 } }
        ],
        "exposure_windows": [
            { "DateMillisSinceEpoch": 1660489200000, "ScanInstances": [
                { "TypicalAttenuationDb": 30, "MinAttenuationDb": 30, "SecondsSinceLastScan": 120 }
            ] }
        ],
        "app_version": "1.4.1", "platform": "Android", "platform_version": "12",
        "model": "Pixel 6", "device_type": "Phone", "build_number": "72", "en_version": "1.8"
    }"#;

    #[test]
    fn test_format_value() {
        assert_eq!(format_value(0.0), "0.0");
        assert_eq!(format_value(2.0), "2.0");
        assert_eq!(format_value(1350.0), "1,350.0");
        assert_eq!(format_value(1234567.3), "1,234,567.3");
        assert_eq!(format_value(0.04), "0.0");
        assert_eq!(format_value(-1500.5), "-1,500.5");
        assert_eq!(format_value(-0.01), "0.0");
    }

    #[test]
    fn test_encode_payload() {
        let config = CheckerConfig::default();
        let outcome = check_log(LOG, &config);
        let encoder = ReportEncoder::with_instance_id("test-instance".to_string());

        let json = encoder.encode_to_json(&outcome, &config).unwrap();
        let payload: serde_json::Value = serde_json::from_str(&json).unwrap();

        assert_eq!(payload["report_version"], "1.0.0");
        assert_eq!(payload["producer"]["name"], "cocoa-log-checker");
        assert_eq!(payload["producer"]["instance_id"], "test-instance");
        assert_eq!(payload["provenance"]["timezone"], "Asia/Tokyo (+09:00)");
        assert_eq!(payload["status"], "ready");
        assert_eq!(payload["summary"]["metadata"]["model"], "Pixel 6");
        assert_eq!(payload["columns"][0], "minutes ≤1m");
        assert_eq!(payload["rows"][0]["date"], "2022-08-15");
        assert_eq!(payload["rows"][0]["day_of_week"], "Mon");
        assert_eq!(payload["rows"][0]["values"][0], 2.0);
        assert_eq!(payload["rows"][0]["alert"], true);
        assert_eq!(payload["grand_total"]["date"], "Total");
        assert_eq!(payload["grand_total"]["alert"], false);
    }

    #[test]
    fn test_encode_malformed_outcome() {
        let config = CheckerConfig::default();
        let outcome = check_log("not json", &config);
        let payload = ReportEncoder::new().encode(&outcome, &config);

        assert_eq!(payload.status, ReportStatus::Malformed);
        assert!(payload.rows.is_empty());
        assert!(payload.grand_total.is_none());
        assert!(payload.columns.is_empty());
    }

    #[test]
    fn test_render_text_table() {
        let config = CheckerConfig::default();
        let outcome = check_log(LOG, &config);
        let text = render_text_table(outcome.report.as_ref().unwrap(), 1350.0);
        let lines: Vec<&str> = text.lines().collect();

        assert_eq!(lines.len(), 3);
        assert!(lines[0].starts_with("date"));
        assert!(lines[1].starts_with("2022-08-15!"));
        assert!(lines[1].contains("1,500.0"));
        assert!(lines[2].starts_with("Total"));
    }
}
