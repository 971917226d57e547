//! Pipeline orchestration
//!
//! This module provides the public API of the checker. It runs the full
//! pipeline from raw log JSON to a [`ReportTable`] and reports the result as a
//! validity status plus human-readable details instead of an error.

use crate::aggregator::Aggregator;
use crate::config::CheckerConfig;
use crate::error::CheckerError;
use crate::report::ReportTable;
use crate::schema::LogParser;
use crate::types::LogSummary;
use serde::{Deserialize, Serialize};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

/// Validity of a check run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReportStatus {
    /// Report has at least one data row
    Ready,
    /// Log is valid but produced no data rows; nothing to render
    Empty,
    /// Content is not JSON or lacks required keys
    Malformed,
    /// Configured log file does not exist
    NotFound,
}

impl ReportStatus {
    /// True when formatters may render the report
    pub fn is_renderable(&self) -> bool {
        matches!(self, ReportStatus::Ready)
    }

    /// True when the input could not be used at all
    pub fn is_failure(&self) -> bool {
        matches!(self, ReportStatus::Malformed | ReportStatus::NotFound)
    }
}

/// Result of one check run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CheckOutcome {
    pub status: ReportStatus,
    /// Human-readable notes explaining the status
    pub details: Vec<String>,
    /// Present whenever the log parsed
    pub summary: Option<LogSummary>,
    /// Present whenever the log parsed, even if it has no data rows
    pub report: Option<ReportTable>,
}

impl CheckOutcome {
    fn failed(status: ReportStatus, details: Vec<String>) -> Self {
        Self {
            status,
            details,
            summary: None,
            report: None,
        }
    }

    fn from_error(err: &CheckerError) -> Self {
        let status = match err {
            CheckerError::InputNotFound(_) => ReportStatus::NotFound,
            _ => ReportStatus::Malformed,
        };
        Self::failed(status, vec![err.to_string()])
    }

    /// The report, only if it has data to render
    pub fn renderable_report(&self) -> Option<&ReportTable> {
        match self.status {
            ReportStatus::Ready => self.report.as_ref(),
            _ => None,
        }
    }
}

/// Check a raw JSON log.
///
/// Pipeline stages:
/// 1. LogParser - Validate and flatten into record streams
/// 2. SampleClassifier - Bucket and score each sample (applied while parsing)
/// 3. Aggregator - Group, pivot and merge into the report table
pub fn check_log(raw_json: &str, config: &CheckerConfig) -> CheckOutcome {
    let parsed = match LogParser::parse(raw_json, &config.timezone) {
        Ok(parsed) => parsed,
        Err(err) => {
            log::warn!(
                "not a valid exposure log ({}): {}",
                config.log_path.display(),
                err
            );
            return CheckOutcome::from_error(&err);
        }
    };

    let report = Aggregator::aggregate(&parsed.daily_scores, &parsed.samples, &parsed.events);

    let (status, details) = if report.has_data() {
        (
            ReportStatus::Ready,
            vec![format!(
                "{} days aggregated from {}",
                report.data_rows().len(),
                config.log_path.display()
            )],
        )
    } else {
        log::warn!(
            "exposure log {} contains no usable data",
            config.log_path.display()
        );
        (
            ReportStatus::Empty,
            vec!["log is valid but contains no exposure data".to_string()],
        )
    };

    CheckOutcome {
        status,
        details,
        summary: Some(parsed.summary),
        report: Some(report),
    }
}

/// Read the configured log file and check it
pub fn check_log_file(config: &CheckerConfig) -> CheckOutcome {
    log::info!("cocoa_log: {}", config.log_path.display());

    match read_log(&config.log_path) {
        Ok(raw) => check_log(&raw, config),
        Err(err) => {
            log::warn!("{}", err);
            CheckOutcome::from_error(&err)
        }
    }
}

fn read_log(path: &Path) -> Result<String, CheckerError> {
    fs::read_to_string(path).map_err(|e| match e.kind() {
        io::ErrorKind::NotFound => CheckerError::InputNotFound(path.to_path_buf()),
        _ => CheckerError::Io(e),
    })
}

/// Stateful checker for interactive viewers.
///
/// Holds the active configuration and the last valid report. Selecting a file
/// that turns out to be unusable leaves the previous report in place.
pub struct ReportSession {
    config: CheckerConfig,
    latest: CheckOutcome,
    current: Option<CheckOutcome>,
}

impl ReportSession {
    /// Create a session and check the configured log
    pub fn open(config: CheckerConfig) -> Self {
        let latest = check_log_file(&config);
        let current = latest.status.is_renderable().then(|| latest.clone());
        Self {
            config,
            latest,
            current,
        }
    }

    pub fn config(&self) -> &CheckerConfig {
        &self.config
    }

    /// Outcome of the most recent check, valid or not
    pub fn latest(&self) -> &CheckOutcome {
        &self.latest
    }

    /// Most recent renderable outcome
    pub fn current(&self) -> Option<&CheckOutcome> {
        self.current.as_ref()
    }

    /// True until some log has produced a renderable report
    pub fn is_awaiting_valid_log(&self) -> bool {
        self.current.is_none()
    }

    /// Switch to another log file and re-run the pipeline.
    ///
    /// Returns the new status. The active path only changes when the new file
    /// yields a renderable report.
    pub fn reselect(&mut self, path: impl Into<PathBuf>) -> ReportStatus {
        let candidate = self.config.clone().with_log_path(path);
        let outcome = check_log_file(&candidate);
        let status = outcome.status;

        if status.is_renderable() {
            self.config = candidate;
            self.current = Some(outcome.clone());
        }
        self.latest = outcome;
        status
    }

    /// Re-run the pipeline on the active file
    pub fn refresh(&mut self) -> ReportStatus {
        let path = self.config.log_path.clone();
        self.reselect(path)
    }

    /// Status line for a viewer
    pub fn status_message(&self) -> String {
        match self.latest.status {
            ReportStatus::Ready => format!("COCOA log: {}", self.config.log_path.display()),
            ReportStatus::Empty => "COCOA log contains no exposure data".to_string(),
            ReportStatus::Malformed => "Not a valid COCOA log".to_string(),
            ReportStatus::NotFound => "COCOA log file not found".to_string(),
        }
    }
}
