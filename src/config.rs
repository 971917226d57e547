//! Checker configuration
//!
//! Everything the pipeline needs to know about its environment is carried in a
//! [`CheckerConfig`] value and passed into the parser and pipeline entry points.

use crate::error::CheckerError;
use chrono::{FixedOffset, Offset, Utc};
use serde::{Deserialize, Serialize};
use std::env;
use std::path::PathBuf;

/// Default log file name when neither `COCOA_LOG` nor a flag is given
pub const DEFAULT_LOG_FILE: &str = "exposure_data.json";

/// Official or approximated daily score at or above which a day is flagged
pub const SCORE_ALERT_THRESHOLD: f64 = 1350.0;

/// Timezone name used when none is configured
pub const DEFAULT_TIMEZONE: &str = "Asia/Tokyo";

/// Environment variable holding the log path
pub const ENV_LOG_PATH: &str = "COCOA_LOG";

/// Environment variable holding the report timezone
pub const ENV_TIMEZONE: &str = "COCOA_TIMEZONE";

/// Timezone used to turn epoch timestamps into calendar days.
///
/// Only fixed offsets are supported. Asia/Tokyo has not observed DST since
/// 1951, so a fixed +09:00 is exact for every log this tool will see.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReportTimezone {
    name: &'static str,
    offset: FixedOffset,
}

impl ReportTimezone {
    /// Japan Standard Time (+09:00)
    pub fn tokyo() -> Self {
        Self {
            name: DEFAULT_TIMEZONE,
            offset: hours_east(9),
        }
    }

    pub fn utc() -> Self {
        Self {
            name: "UTC",
            offset: hours_east(0),
        }
    }

    /// Parse a timezone name or a `±HH:MM` offset
    pub fn parse(input: &str) -> Result<Self, CheckerError> {
        let trimmed = input.trim();
        match trimmed {
            "Asia/Tokyo" | "JST" => return Ok(Self::tokyo()),
            "UTC" | "Etc/UTC" | "Z" => return Ok(Self::utc()),
            _ => {}
        }

        let offset = parse_offset(trimmed)
            .ok_or_else(|| CheckerError::InvalidTimezone(input.to_string()))?;
        Ok(Self {
            name: "fixed",
            offset,
        })
    }

    pub fn name(&self) -> &str {
        self.name
    }

    pub fn offset(&self) -> FixedOffset {
        self.offset
    }

    /// Display label, e.g. `Asia/Tokyo (+09:00)`
    pub fn label(&self) -> String {
        format!("{} ({})", self.name, self.offset)
    }
}

impl Default for ReportTimezone {
    fn default() -> Self {
        Self::tokyo()
    }
}

fn hours_east(hours: i32) -> FixedOffset {
    match FixedOffset::east_opt(hours * 3600) {
        Some(offset) => offset,
        None => Utc.fix(),
    }
}

fn parse_offset(s: &str) -> Option<FixedOffset> {
    let (sign, rest) = match s.as_bytes().first()? {
        b'+' => (1, &s[1..]),
        b'-' => (-1, &s[1..]),
        _ => return None,
    };
    let (hours, minutes) = match rest.split_once(':') {
        Some((h, m)) => (h.parse::<i32>().ok()?, m.parse::<i32>().ok()?),
        None => (rest.parse::<i32>().ok()?, 0),
    };
    if !(0..=14).contains(&hours) || !(0..60).contains(&minutes) {
        return None;
    }
    FixedOffset::east_opt(sign * (hours * 3600 + minutes * 60))
}

/// Configuration threaded through a single check run
#[derive(Debug, Clone, PartialEq)]
pub struct CheckerConfig {
    /// Path of the exposure log to read
    pub log_path: PathBuf,
    /// Timezone used to derive the grouping date and day of week
    pub timezone: ReportTimezone,
    /// Threshold for score alerts in downstream formatters
    pub score_alert_threshold: f64,
}

impl Default for CheckerConfig {
    fn default() -> Self {
        Self {
            log_path: PathBuf::from(DEFAULT_LOG_FILE),
            timezone: ReportTimezone::default(),
            score_alert_threshold: SCORE_ALERT_THRESHOLD,
        }
    }
}

impl CheckerConfig {
    /// Build a config from `COCOA_LOG` and `COCOA_TIMEZONE`, falling back to defaults
    pub fn from_env() -> Result<Self, CheckerError> {
        Self::from_vars(|key| env::var(key).ok())
    }

    /// Build a config from any variable lookup, e.g. a map in tests.
    ///
    /// Empty values count as unset.
    pub fn from_vars<F>(lookup: F) -> Result<Self, CheckerError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let log_path = var(ENV_LOG_PATH).unwrap_or_else(|| DEFAULT_LOG_FILE.to_string());
        let timezone = match var(ENV_TIMEZONE) {
            Some(tz) => ReportTimezone::parse(&tz)?,
            None => ReportTimezone::default(),
        };

        Ok(Self {
            log_path: PathBuf::from(log_path),
            timezone,
            score_alert_threshold: SCORE_ALERT_THRESHOLD,
        })
    }

    /// Same config pointed at a different log file
    pub fn with_log_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.log_path = path.into();
        self
    }

    pub fn with_timezone(mut self, timezone: ReportTimezone) -> Self {
        self.timezone = timezone;
        self
    }
}

/// Report metadata echoed from the config into encoded output
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConfigEcho {
    pub source: String,
    pub timezone: String,
    pub score_alert_threshold: f64,
}

impl From<&CheckerConfig> for ConfigEcho {
    fn from(config: &CheckerConfig) -> Self {
        Self {
            source: config.log_path.display().to_string(),
            timezone: config.timezone.label(),
            score_alert_threshold: config.score_alert_threshold,
        }
    }
}
