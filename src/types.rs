//! Core types for the checker pipeline
//!
//! This module defines the records that flow between stages: exposure samples
//! as read from the log, classified samples, contact events, official daily
//! scores, and the log summary echoed to collaborators.

use chrono::{DateTime, FixedOffset, NaiveDate};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Proximity class derived from signal attenuation.
///
/// The "1–3m" label overlaps "1–2m" semantically. Both labels are kept as the
/// upstream app reported them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum DistanceBucket {
    /// ≤ 45 dB
    #[serde(rename = "≤1m")]
    Immediate,
    /// 46–59 dB
    #[serde(rename = "1–2m")]
    Near,
    /// 60–64 dB
    #[serde(rename = "1–3m")]
    Medium,
    /// ≥ 65 dB
    #[serde(rename = "≥2m")]
    Other,
}

impl DistanceBucket {
    /// All buckets in column order
    pub const ALL: [DistanceBucket; 4] = [
        DistanceBucket::Immediate,
        DistanceBucket::Near,
        DistanceBucket::Medium,
        DistanceBucket::Other,
    ];

    pub fn label(&self) -> &'static str {
        match self {
            DistanceBucket::Immediate => "≤1m",
            DistanceBucket::Near => "1–2m",
            DistanceBucket::Medium => "1–3m",
            DistanceBucket::Other => "≥2m",
        }
    }

    /// Column position of this bucket in per-bucket arrays
    pub fn index(&self) -> usize {
        match self {
            DistanceBucket::Immediate => 0,
            DistanceBucket::Near => 1,
            DistanceBucket::Medium => 2,
            DistanceBucket::Other => 3,
        }
    }
}

impl fmt::Display for DistanceBucket {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Grouping key shared by every per-day table
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct DayKey {
    /// Calendar day in the report timezone
    pub date: NaiveDate,
    /// Abbreviated weekday, e.g. "Mon"
    pub day_of_week: String,
}

impl DayKey {
    /// Key for the calendar day containing `timestamp`
    pub fn from_timestamp(timestamp: &DateTime<FixedOffset>) -> Self {
        Self {
            date: timestamp.date_naive(),
            day_of_week: timestamp.format("%a").to_string(),
        }
    }
}

/// One proximity reading from a scan instance
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExposureSample {
    pub date: NaiveDate,
    pub day_of_week: String,
    /// Window start, localized to the report timezone
    pub timestamp: DateTime<FixedOffset>,
    /// Typical signal attenuation (dB, lower is closer)
    pub typical_attenuation_db: i32,
    /// Best-case signal attenuation (dB)
    pub min_attenuation_db: i32,
    /// Seconds since the previous scan
    pub duration_seconds: u32,
}

impl ExposureSample {
    pub fn day_key(&self) -> DayKey {
        DayKey {
            date: self.date,
            day_of_week: self.day_of_week.clone(),
        }
    }
}

/// Exposure sample with its distance class and weighted scores
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClassifiedSample {
    /// Source sample
    pub sample: ExposureSample,
    /// Bucket derived from the typical attenuation
    pub distance_bucket: DistanceBucket,
    /// Duration weighted by the typical-attenuation multiplier
    pub score: f64,
    /// Duration weighted by the best-case (minimum) attenuation multiplier
    pub min_score: f64,
}

/// One exposure window, counted as a single contact
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContactEvent {
    pub date: NaiveDate,
    pub day_of_week: String,
    pub timestamp: DateTime<FixedOffset>,
}

impl ContactEvent {
    pub fn day_key(&self) -> DayKey {
        DayKey {
            date: self.date,
            day_of_week: self.day_of_week.clone(),
        }
    }
}

/// Daily score as computed by the source device
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DailyOfficialScore {
    pub date: NaiveDate,
    pub day_of_week: String,
    /// `WeightedDurationSum` from the daily summary
    pub score: f64,
}

impl DailyOfficialScore {
    pub fn day_key(&self) -> DayKey {
        DayKey {
            date: self.date,
            day_of_week: self.day_of_week.clone(),
        }
    }
}

/// Device and app metadata echoed from the log
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LogMetadata {
    pub app_version: String,
    pub platform: String,
    pub platform_version: String,
    pub model: String,
    pub device_type: String,
    pub build_number: String,
    pub en_version: String,
}

/// Counts and metadata describing a parsed log
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LogSummary {
    pub exposure_window_count: usize,
    pub daily_summary_count: usize,
    pub scan_instance_count: usize,
    pub metadata: LogMetadata,
}

impl LogSummary {
    /// Human-readable lines for log-info displays
    pub fn lines(&self) -> Vec<String> {
        let m = &self.metadata;
        vec![
            format!("# of exposure_windows: {}", self.exposure_window_count),
            format!("# of daily_summaries: {}", self.daily_summary_count),
            format!("# of scan_instances: {}", self.scan_instance_count),
            format!("app_version: {}", m.app_version),
            format!("platform: {}", m.platform),
            format!("platform_version: {}", m.platform_version),
            format!("model: {}", m.model),
            format!("device_type: {}", m.device_type),
            format!("build_number: {}", m.build_number),
            format!("en_version: {}", m.en_version),
        ]
    }
}

/// The three record streams extracted from one log
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ParsedLog {
    pub daily_scores: Vec<DailyOfficialScore>,
    pub samples: Vec<ClassifiedSample>,
    pub events: Vec<ContactEvent>,
    pub summary: LogSummary,
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_bucket_labels_and_order() {
        let labels: Vec<&str> = DistanceBucket::ALL.iter().map(|b| b.label()).collect();
        assert_eq!(labels, vec!["≤1m", "1–2m", "1–3m", "≥2m"]);
        for (i, bucket) in DistanceBucket::ALL.iter().enumerate() {
            assert_eq!(bucket.index(), i);
        }
    }

    #[test]
    fn test_bucket_serializes_as_label() {
        let json = serde_json::to_string(&DistanceBucket::Medium).unwrap();
        assert_eq!(json, "\"1–3m\"");
    }

    #[test]
    fn test_day_key_uses_local_date() {
        let jst = FixedOffset::east_opt(9 * 3600).unwrap();
        // 2022-08-15T15:30:00Z is already Tuesday in Tokyo
        let ts = jst.timestamp_millis_opt(1_660_577_400_000).unwrap();
        let key = DayKey::from_timestamp(&ts);
        assert_eq!(key.date, NaiveDate::from_ymd_opt(2022, 8, 16).unwrap());
        assert_eq!(key.day_of_week, "Tue");
    }

    #[test]
    fn test_summary_lines() {
        let summary = LogSummary {
            exposure_window_count: 3,
            daily_summary_count: 2,
            scan_instance_count: 7,
            metadata: LogMetadata {
                app_version: "1.4.1".into(),
                ..Default::default()
            },
        };
        let lines = summary.lines();
        assert_eq!(lines[0], "# of exposure_windows: 3");
        assert_eq!(lines[1], "# of daily_summaries: 2");
        assert_eq!(lines[3], "app_version: 1.4.1");
    }
}
