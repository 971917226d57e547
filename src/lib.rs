//! COCOA Log Checker - exposure-notification log analysis
//!
//! Turns an `exposure_data.json` log into one dense per-day report through a
//! deterministic pipeline: schema validation → sample classification →
//! aggregation (group, pivot, merge) → encoding.
//!
//! ## Modules
//!
//! - **Classifier**: distance bucket and weighted score per scan instance
//! - **Schema**: typed log shape and the parser that validates it
//! - **Aggregator**: per-day tables merged into a [`ReportTable`]
//! - **Pipeline**: validity status, file loading, and interactive sessions

pub mod aggregator;
pub mod classifier;
pub mod config;
pub mod encoder;
pub mod error;
pub mod pipeline;
pub mod report;
pub mod schema;
pub mod types;

// FFI bindings for C interop (always available for cdylib/staticlib builds)
pub mod ffi;

pub use aggregator::Aggregator;
pub use classifier::SampleClassifier;
pub use config::{CheckerConfig, ReportTimezone};
pub use error::CheckerError;
pub use pipeline::{check_log, check_log_file, CheckOutcome, ReportSession, ReportStatus};
pub use report::{ChartMetric, ReportTable};
pub use schema::LogParser;

/// Checker version embedded in encoded reports
pub const CHECKER_VERSION: &str = env!("CARGO_PKG_VERSION");

/// Producer name for encoded reports
pub const PRODUCER_NAME: &str = "cocoa-log-checker";
