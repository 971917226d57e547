//! exposure_data.json schema definition
//!
//! Only the fields the checker consumes are modelled. Every modelled field is
//! required; unknown fields are ignored.

use serde::{Deserialize, Serialize};

/// Top-level exposure log written by the COCOA app
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExposureLog {
    pub daily_summaries: Vec<DailySummaryRecord>,
    pub exposure_windows: Vec<ExposureWindowRecord>,
    pub app_version: serde_json::Value,
    pub platform: serde_json::Value,
    pub platform_version: serde_json::Value,
    pub model: serde_json::Value,
    pub device_type: serde_json::Value,
    pub build_number: serde_json::Value,
    pub en_version: serde_json::Value,
}

/// One day of the device's own exposure summary
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct DailySummaryRecord {
    pub date_millis_since_epoch: i64,
    pub day_summary: DaySummary,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct DaySummary {
    pub weighted_duration_sum: f64,
}

/// One scan session against a single remote device
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct ExposureWindowRecord {
    pub date_millis_since_epoch: i64,
    pub scan_instances: Vec<ScanInstanceRecord>,
}

/// One proximity reading inside an exposure window
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct ScanInstanceRecord {
    pub typical_attenuation_db: i32,
    pub min_attenuation_db: i32,
    pub seconds_since_last_scan: u32,
}

/// Keys a valid log must carry, for error messages
pub const REQUIRED_KEYS: &[&str] = &[
    "daily_summaries[].DateMillisSinceEpoch",
    "daily_summaries[].DaySummary.WeightedDurationSum",
    "exposure_windows[].DateMillisSinceEpoch",
    "exposure_windows[].ScanInstances[].TypicalAttenuationDb",
    "exposure_windows[].ScanInstances[].MinAttenuationDb",
    "exposure_windows[].ScanInstances[].SecondsSinceLastScan",
    "app_version",
    "platform",
    "platform_version",
    "model",
    "device_type",
    "build_number",
    "en_version",
];

/// Render a metadata value without JSON quoting for strings
pub fn metadata_text(value: &serde_json::Value) -> String {
    match value {
        serde_json::Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_deserialize_scan_instance() {
        let json = r#"{
            "TypicalAttenuationDb": 52,
            "MinAttenuationDb": 48,
            "SecondsSinceLastScan": 180,
            "UnusedField": true
        }"#;
        let record: ScanInstanceRecord = serde_json::from_str(json).unwrap();
        assert_eq!(record.typical_attenuation_db, 52);
        assert_eq!(record.min_attenuation_db, 48);
        assert_eq!(record.seconds_since_last_scan, 180);
    }

    #[test]
    fn test_negative_duration_rejected() {
        let json = r#"{
            "TypicalAttenuationDb": 52,
            "MinAttenuationDb": 48,
            "SecondsSinceLastScan": -1
        }"#;
        assert!(serde_json::from_str::<ScanInstanceRecord>(json).is_err());
    }

    #[test]
    fn test_metadata_text() {
        assert_eq!(metadata_text(&serde_json::json!("1.4.1")), "1.4.1");
        assert_eq!(metadata_text(&serde_json::json!(42)), "42");
        assert_eq!(metadata_text(&serde_json::Value::Null), "null");
    }
}
