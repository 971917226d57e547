//! cocoa-check - Command-line interface for the COCOA log checker
//!
//! Commands:
//! - report: Render the daily exposure report (text or JSON)
//! - info: Print the log summary (window counts and app metadata)
//! - validate: Check whether a file is a usable exposure log

use clap::{Parser, Subcommand, ValueEnum};
use std::fs::{self, File};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use cocoa_log_checker::config::ENV_LOG_PATH;
use cocoa_log_checker::encoder::{render_text_table, ReportEncoder};
use cocoa_log_checker::{
    check_log_file, CheckOutcome, CheckerConfig, CheckerError, ReportStatus, ReportTimezone,
    CHECKER_VERSION,
};

/// cocoa-check - Daily exposure report from a COCOA exposure_data.json log
#[derive(Parser)]
#[command(name = "cocoa-check")]
#[command(version = CHECKER_VERSION)]
#[command(about = "Summarise a COCOA exposure-notification log", long_about = None)]
struct Cli {
    /// Exposure log file [env: COCOA_LOG] [default: exposure_data.json]
    #[arg(short = 'l', long = "cocoa-log", global = true)]
    cocoa_log: Option<PathBuf>,

    /// Report timezone: Asia/Tokyo, UTC, or an offset such as +09:00 [env: COCOA_TIMEZONE]
    #[arg(long, global = true)]
    timezone: Option<String>,

    /// Write log output to this file instead of stderr
    #[arg(long, env = "DEBUGFILE", global = true)]
    debug_file: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Render the daily exposure report
    Report {
        /// Output format
        #[arg(long, default_value = "text")]
        format: OutputFormat,

        /// Output file path (use - for stdout)
        #[arg(short, long, default_value = "-")]
        output: PathBuf,
    },

    /// Print the log summary
    Info,

    /// Check whether the log is usable
    Validate {
        /// Output validation result as JSON
        #[arg(long)]
        json: bool,
    },
}

#[derive(Clone, Copy, ValueEnum)]
enum OutputFormat {
    /// Aligned plain-text table
    Text,
    /// Compact JSON payload
    Json,
    /// Pretty-printed JSON payload
    JsonPretty,
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    if let Err(e) = init_logging(cli.debug_file.as_deref()) {
        eprintln!("{}", to_stderr_json(CliError::from(e)));
        return ExitCode::FAILURE;
    }

    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("{}", to_stderr_json(CliError::from(e)));
            ExitCode::FAILURE
        }
    }
}

fn init_logging(debug_file: Option<&Path>) -> Result<(), CheckCliError> {
    let mut builder =
        env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"));
    if let Some(path) = debug_file {
        let file = File::create(path)?;
        builder.target(env_logger::Target::Pipe(Box::new(file)));
    }
    builder.init();
    Ok(())
}

fn run(cli: Cli) -> Result<(), CheckCliError> {
    // Flags override COCOA_LOG / COCOA_TIMEZONE
    let mut config = CheckerConfig::from_env()?;
    if let Some(path) = cli.cocoa_log {
        config = config.with_log_path(path);
    }
    if let Some(name) = cli.timezone.as_deref() {
        config = config.with_timezone(ReportTimezone::parse(name)?);
    }

    match cli.command {
        Commands::Report { format, output } => cmd_report(&config, format, &output),
        Commands::Info => cmd_info(&config),
        Commands::Validate { json } => cmd_validate(&config, json),
    }
}

fn cmd_report(
    config: &CheckerConfig,
    format: OutputFormat,
    output: &Path,
) -> Result<(), CheckCliError> {
    let outcome = check_log_file(config);
    ensure_usable(&outcome)?;

    let rendered = match format {
        OutputFormat::Text => match outcome.renderable_report() {
            Some(report) => render_text_table(report, config.score_alert_threshold),
            None => {
                eprintln!("Warning: {}", outcome.details.join("; "));
                return Ok(());
            }
        },
        OutputFormat::Json => format!("{}\n", ReportEncoder::new().encode_to_json(&outcome, config)?),
        OutputFormat::JsonPretty => format!(
            "{}\n",
            ReportEncoder::new().encode_to_json_pretty(&outcome, config)?
        ),
    };

    if outcome.status == ReportStatus::Empty {
        eprintln!("Warning: {}", outcome.details.join("; "));
    }

    if output.to_string_lossy() == "-" {
        let stdout = io::stdout();
        let mut handle = stdout.lock();
        handle.write_all(rendered.as_bytes())?;
        handle.flush()?;
    } else {
        fs::write(output, rendered)?;
    }
    Ok(())
}

fn cmd_info(config: &CheckerConfig) -> Result<(), CheckCliError> {
    let outcome = check_log_file(config);
    ensure_usable(&outcome)?;

    println!("COCOA log: {}", config.log_path.display());
    println!("Timezone:  {}", config.timezone.label());
    if let Some(summary) = &outcome.summary {
        for line in summary.lines() {
            println!("{}", line);
        }
    }
    Ok(())
}

fn cmd_validate(config: &CheckerConfig, json: bool) -> Result<(), CheckCliError> {
    let outcome = check_log_file(config);

    let report = ValidationReport {
        source: config.log_path.display().to_string(),
        status: outcome.status,
        data_rows: outcome
            .report
            .as_ref()
            .map(|r| r.data_rows().len())
            .unwrap_or(0),
        details: outcome.details.clone(),
    };

    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        println!("Validation Report");
        println!("=================");
        println!("Source:    {}", report.source);
        println!("Status:    {}", status_label(report.status));
        println!("Data rows: {}", report.data_rows);

        if !report.details.is_empty() {
            println!("\nDetails:");
            for detail in &report.details {
                println!("  - {}", detail);
            }
        }
    }

    if report.status.is_failure() {
        Err(CheckCliError::Unusable(report.status))
    } else {
        Ok(())
    }
}

fn ensure_usable(outcome: &CheckOutcome) -> Result<(), CheckCliError> {
    if outcome.status.is_failure() {
        for detail in &outcome.details {
            log::error!("{}", detail);
        }
        return Err(CheckCliError::Unusable(outcome.status));
    }
    Ok(())
}

fn status_label(status: ReportStatus) -> &'static str {
    match status {
        ReportStatus::Ready => "ready",
        ReportStatus::Empty => "empty (no exposure data)",
        ReportStatus::Malformed => "malformed",
        ReportStatus::NotFound => "not found",
    }
}

fn to_stderr_json(err: CliError) -> String {
    serde_json::to_string(&err).unwrap_or_else(|_| "Unknown error".to_string())
}

// Error types

#[derive(Debug)]
enum CheckCliError {
    Io(io::Error),
    Checker(CheckerError),
    Json(serde_json::Error),
    Unusable(ReportStatus),
}

impl From<io::Error> for CheckCliError {
    fn from(e: io::Error) -> Self {
        CheckCliError::Io(e)
    }
}

impl From<CheckerError> for CheckCliError {
    fn from(e: CheckerError) -> Self {
        CheckCliError::Checker(e)
    }
}

impl From<serde_json::Error> for CheckCliError {
    fn from(e: serde_json::Error) -> Self {
        CheckCliError::Json(e)
    }
}

#[derive(serde::Serialize)]
struct CliError {
    code: String,
    message: String,
    hint: Option<String>,
}

impl From<CheckCliError> for CliError {
    fn from(e: CheckCliError) -> Self {
        match e {
            CheckCliError::Io(e) => CliError {
                code: "IO_ERROR".to_string(),
                message: e.to_string(),
                hint: Some("Check file paths and permissions".to_string()),
            },
            CheckCliError::Checker(CheckerError::InvalidTimezone(name)) => CliError {
                code: "INVALID_TIMEZONE".to_string(),
                message: format!("Unsupported timezone: {}", name),
                hint: Some("Use Asia/Tokyo, UTC, or an offset such as +09:00".to_string()),
            },
            CheckCliError::Checker(e) => CliError {
                code: "CHECK_ERROR".to_string(),
                message: e.to_string(),
                hint: None,
            },
            CheckCliError::Json(e) => CliError {
                code: "JSON_ERROR".to_string(),
                message: e.to_string(),
                hint: None,
            },
            CheckCliError::Unusable(ReportStatus::NotFound) => CliError {
                code: "LOG_NOT_FOUND".to_string(),
                message: "COCOA log file not found".to_string(),
                hint: Some(format!(
                    "Pass the log with --cocoa-log or set {}",
                    ENV_LOG_PATH
                )),
            },
            CheckCliError::Unusable(status) => CliError {
                code: "MALFORMED_LOG".to_string(),
                message: format!("Not a valid COCOA log ({})", status_label(status)),
                hint: Some("Export exposure_data.json again from the COCOA app".to_string()),
            },
        }
    }
}

// Report types

#[derive(serde::Serialize)]
struct ValidationReport {
    source: String,
    status: ReportStatus,
    data_rows: usize,
    details: Vec<String>,
}
