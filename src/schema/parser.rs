//! Parser for converting an exposure log into typed record streams
//!
//! Structural validation happens here, once. Downstream stages only ever see
//! records whose required fields are known to exist.

use crate::classifier::SampleClassifier;
use crate::config::ReportTimezone;
use crate::error::CheckerError;
use crate::schema::exposure_log::*;
use crate::types::{
    ContactEvent, DailyOfficialScore, DayKey, ExposureSample, LogMetadata, LogSummary, ParsedLog,
};
use chrono::{DateTime, FixedOffset, TimeZone};
use serde_json::error::Category;

/// Parser for exposure logs
pub struct LogParser;

impl LogParser {
    /// Parse a raw JSON document
    pub fn parse(raw_json: &str, timezone: &ReportTimezone) -> Result<ParsedLog, CheckerError> {
        let log: ExposureLog = serde_json::from_str(raw_json).map_err(classify_json_error)?;
        Self::extract(log, timezone)
    }

    /// Parse an already-decoded JSON value
    pub fn parse_value(
        value: serde_json::Value,
        timezone: &ReportTimezone,
    ) -> Result<ParsedLog, CheckerError> {
        let log: ExposureLog = serde_json::from_value(value).map_err(classify_json_error)?;
        Self::extract(log, timezone)
    }

    /// Flatten a validated log into the three record streams
    pub fn extract(log: ExposureLog, timezone: &ReportTimezone) -> Result<ParsedLog, CheckerError> {
        let offset = timezone.offset();

        let mut daily_scores = Vec::with_capacity(log.daily_summaries.len());
        for summary in &log.daily_summaries {
            let timestamp = localize(summary.date_millis_since_epoch, offset)?;
            let key = DayKey::from_timestamp(&timestamp);
            daily_scores.push(DailyOfficialScore {
                date: key.date,
                day_of_week: key.day_of_week,
                score: summary.day_summary.weighted_duration_sum,
            });
        }

        let mut samples = Vec::new();
        let mut events = Vec::with_capacity(log.exposure_windows.len());
        for window in &log.exposure_windows {
            let timestamp = localize(window.date_millis_since_epoch, offset)?;
            let key = DayKey::from_timestamp(&timestamp);

            for instance in &window.scan_instances {
                let sample = ExposureSample {
                    date: key.date,
                    day_of_week: key.day_of_week.clone(),
                    timestamp,
                    typical_attenuation_db: instance.typical_attenuation_db,
                    min_attenuation_db: instance.min_attenuation_db,
                    duration_seconds: instance.seconds_since_last_scan,
                };
                samples.push(SampleClassifier::classify_sample(sample));
            }

            events.push(ContactEvent {
                date: key.date,
                day_of_week: key.day_of_week,
                timestamp,
            });
        }

        let summary = LogSummary {
            exposure_window_count: log.exposure_windows.len(),
            daily_summary_count: log.daily_summaries.len(),
            scan_instance_count: samples.len(),
            metadata: LogMetadata {
                app_version: metadata_text(&log.app_version),
                platform: metadata_text(&log.platform),
                platform_version: metadata_text(&log.platform_version),
                model: metadata_text(&log.model),
                device_type: metadata_text(&log.device_type),
                build_number: metadata_text(&log.build_number),
                en_version: metadata_text(&log.en_version),
            },
        };

        for line in summary.lines() {
            log::info!("{}", line);
        }

        Ok(ParsedLog {
            daily_scores,
            samples,
            events,
            summary,
        })
    }
}

/// Missing or mistyped keys become `MalformedLog`; syntax errors stay `InvalidJson`
fn classify_json_error(err: serde_json::Error) -> CheckerError {
    match err.classify() {
        Category::Data => {
            log::debug!("exposure log failed schema validation: {}", err);
            CheckerError::MalformedLog(format!(
                "{}; expected keys: {}",
                err,
                REQUIRED_KEYS.join(", ")
            ))
        }
        Category::Syntax | Category::Eof | Category::Io => {
            log::error!("exposure log is not valid JSON: {:?}", err);
            CheckerError::InvalidJson(err)
        }
    }
}

fn localize(millis: i64, offset: FixedOffset) -> Result<DateTime<FixedOffset>, CheckerError> {
    offset.timestamp_millis_opt(millis).single().ok_or_else(|| {
        CheckerError::MalformedLog(format!(
            "DateMillisSinceEpoch out of range: {}",
            millis
        ))
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::DistanceBucket;
    use chrono::NaiveDate;
    use pretty_assertions::assert_eq;

    // 2022-08-15T00:00:00+09:00
    const AUG_15_JST: i64 = 1_660_489_200_000;

    fn sample_log_json() -> String {
        format!(
            r#"{{
                "daily_summaries": [{{
                    "DateMillisSinceEpoch": {day},
                    "DaySummary": {{ "WeightedDurationSum": 100.0, "ScoreSum": 0 }},
                    "ConfirmedClinicalDiagnosisSummary": {{}}
                }}],
                "exposure_windows": [{{
                    "DateMillisSinceEpoch": {day},
                    "Infectiousness": 1,
                    "ScanInstances": [
                        {{ "TypicalAttenuationDb": 30, "MinAttenuationDb": 30, "SecondsSinceLastScan": 120 }},
                        {{ "TypicalAttenuationDb": 62, "MinAttenuationDb": 50, "SecondsSinceLastScan": 60 }}
                    ]
                }}],
                "app_version": "1.4.1",
                "platform": "Android",
                "platform_version": "12",
                "model": "Pixel 6",
                "device_type": "Phone",
                "build_number": 72,
                "en_version": "1.8"
            }}"#,
            day = AUG_15_JST
        )
    }

    #[test]
    fn test_parse_streams() {
        let parsed = LogParser::parse(&sample_log_json(), &ReportTimezone::tokyo()).unwrap();
        let aug_15 = NaiveDate::from_ymd_opt(2022, 8, 15).unwrap();

        assert_eq!(parsed.daily_scores.len(), 1);
        assert_eq!(parsed.daily_scores[0].date, aug_15);
        assert_eq!(parsed.daily_scores[0].day_of_week, "Mon");
        assert_eq!(parsed.daily_scores[0].score, 100.0);

        assert_eq!(parsed.events.len(), 1);
        assert_eq!(parsed.samples.len(), 2);
        assert_eq!(parsed.samples[0].distance_bucket, DistanceBucket::Immediate);
        assert_eq!(parsed.samples[1].distance_bucket, DistanceBucket::Medium);
        assert_eq!(parsed.samples[1].min_score, 150.0);
    }

    #[test]
    fn test_summary_echoes_metadata() {
        let parsed = LogParser::parse(&sample_log_json(), &ReportTimezone::tokyo()).unwrap();
        let summary = &parsed.summary;

        assert_eq!(summary.exposure_window_count, 1);
        assert_eq!(summary.daily_summary_count, 1);
        assert_eq!(summary.scan_instance_count, 2);
        assert_eq!(summary.metadata.platform, "Android");
        assert_eq!(summary.metadata.build_number, "72");
    }

    #[test]
    fn test_timezone_changes_grouping_date() {
        let parsed = LogParser::parse(&sample_log_json(), &ReportTimezone::utc()).unwrap();
        // Midnight in Tokyo is still the previous day in UTC
        assert_eq!(
            parsed.events[0].date,
            NaiveDate::from_ymd_opt(2022, 8, 14).unwrap()
        );
        assert_eq!(parsed.events[0].day_of_week, "Sun");
    }

    #[test]
    fn test_missing_app_version_is_malformed() {
        let mut value: serde_json::Value = serde_json::from_str(&sample_log_json()).unwrap();
        value.as_object_mut().unwrap().remove("app_version");

        let err = LogParser::parse_value(value, &ReportTimezone::tokyo()).unwrap_err();
        assert!(matches!(err, CheckerError::MalformedLog(_)));
        assert!(err.to_string().contains("app_version"));
    }

    #[test]
    fn test_missing_nested_key_is_malformed() {
        let mut value: serde_json::Value = serde_json::from_str(&sample_log_json()).unwrap();
        value["exposure_windows"][0]["ScanInstances"][1]
            .as_object_mut()
            .unwrap()
            .remove("MinAttenuationDb");

        let err = LogParser::parse_value(value, &ReportTimezone::tokyo()).unwrap_err();
        assert!(matches!(err, CheckerError::MalformedLog(_)));
    }

    #[test]
    fn test_non_json_is_invalid_json() {
        let err = LogParser::parse("<html>not a log</html>", &ReportTimezone::tokyo()).unwrap_err();
        assert!(matches!(err, CheckerError::InvalidJson(_)));
        assert!(err.is_malformed());
    }

    #[test]
    fn test_window_without_instances_still_counts_as_event() {
        let mut value: serde_json::Value = serde_json::from_str(&sample_log_json()).unwrap();
        value["exposure_windows"][0]["ScanInstances"] = serde_json::json!([]);

        let parsed = LogParser::parse_value(value, &ReportTimezone::tokyo()).unwrap();
        assert!(parsed.samples.is_empty());
        assert_eq!(parsed.events.len(), 1);
    }
}
