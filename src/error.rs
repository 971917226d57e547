//! Error types for the COCOA log checker

use std::path::PathBuf;
use thiserror::Error;

/// Errors that can occur while loading or checking an exposure log
#[derive(Debug, Error)]
pub enum CheckerError {
    #[error("Log file not found: {}", .0.display())]
    InputNotFound(PathBuf),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid JSON: {0}")]
    InvalidJson(#[from] serde_json::Error),

    #[error("Not a valid exposure log: {0}")]
    MalformedLog(String),

    #[error("Invalid timezone: {0}")]
    InvalidTimezone(String),

    #[error("Encoding error: {0}")]
    EncodingError(String),
}

impl CheckerError {
    /// True for every failure that means "this is not a usable log".
    ///
    /// Non-JSON content and JSON with missing keys are reported the same way.
    pub fn is_malformed(&self) -> bool {
        matches!(
            self,
            CheckerError::InvalidJson(_) | CheckerError::MalformedLog(_)
        )
    }
}
