//! Error types for the clickcheck pipeline.
//!
//! - [`IngestError`] - Spreadsheet reading errors
//! - [`ConfigError`] - Invalid rule configuration
//! - [`ReportError`] - Report sink errors
//! - [`EnrichError`] - Lookup table and column errors
//! - [`PipelineError`] - Top-level orchestration errors
//! - [`ServerError`] - HTTP layer errors
//!
//! Business-rule failures are never errors: they are data on
//! [`crate::models::RowVerdict`]. Everything here is either an I/O problem
//! or a contract violation that must stop the run.

use thiserror::Error;

// =============================================================================
// Ingestion Errors
// =============================================================================

/// Errors while reading a spreadsheet into a [`crate::parser::Sheet`].
#[derive(Debug, Error)]
pub enum IngestError {
    /// Failed to read file.
    #[error("Failed to read file: {0}")]
    Io(#[from] std::io::Error),

    /// Workbook could not be opened or its first sheet read.
    #[error("Failed to read workbook: {0}")]
    Workbook(String),

    /// Failed to decode text content.
    #[error("Failed to decode content as {encoding}: {message}")]
    Encoding { encoding: String, message: String },

    /// Invalid CSV syntax.
    #[error("Invalid CSV at line {line}: {message}")]
    Csv { line: u64, message: String },

    /// Empty file or empty first sheet.
    #[error("Spreadsheet is empty")]
    EmptyFile,

    /// Fewer rows than `skip_rows + 1`, so there is no header line.
    #[error("No header row found after skipping {skipped} row(s)")]
    NoHeaders { skipped: usize },
}

impl From<csv::Error> for IngestError {
    fn from(err: csv::Error) -> Self {
        let line = err.position().map(|p| p.line()).unwrap_or(0);
        IngestError::Csv {
            line,
            message: err.to_string(),
        }
    }
}

impl From<calamine::Error> for IngestError {
    fn from(err: calamine::Error) -> Self {
        IngestError::Workbook(err.to_string())
    }
}

// =============================================================================
// Rule Configuration Errors
// =============================================================================

/// A [`crate::rules::RuleSettings`] that cannot become a usable
/// [`crate::rules::RuleConfig`].
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Structured code needs exactly one allowed set per segment.
    #[error("Expected {expected} allowed-value sets for the structured code, got {found}")]
    SegmentSetCount { expected: usize, found: usize },

    /// An allowed set with no values would reject every row.
    #[error("Allowed-value set for segment {segment} is empty")]
    EmptySegmentSet { segment: usize },

    /// Upper bound must be a positive finite number.
    #[error("Invalid dimension upper bound: {0}")]
    InvalidUpperBound(f64),

    /// Text measurement pattern does not compile.
    #[error("Invalid text measurement pattern '{pattern}': {message}")]
    InvalidPattern { pattern: String, message: String },

    /// A header needle is blank and would match every header.
    #[error("Header name for field '{0}' is empty")]
    EmptyFieldName(&'static str),

    /// Failed to read the rules file.
    #[error("Failed to read rules file: {0}")]
    Io(#[from] std::io::Error),

    /// Rules file is not valid JSON for [`crate::rules::RuleSettings`].
    #[error("Invalid rules file: {0}")]
    Json(#[from] serde_json::Error),
}

// =============================================================================
// Report Errors
// =============================================================================

/// Errors raised by a [`crate::report::ReportSink`].
#[derive(Debug, Error)]
pub enum ReportError {
    /// IO error.
    #[error("Report IO error: {0}")]
    Io(#[from] std::io::Error),

    /// CSV writer error.
    #[error("Report CSV error: {0}")]
    Csv(#[from] csv::Error),

    /// JSON error.
    #[error("Report JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

// =============================================================================
// Enrichment Errors
// =============================================================================

/// Errors while preparing a lookup comparison.
#[derive(Debug, Error)]
pub enum EnrichError {
    /// No header matches the requested column name.
    #[error("Column not found: {0}")]
    UnknownColumn(String),

    /// Failed to read the lookup file.
    #[error("Failed to read lookup file: {0}")]
    Io(#[from] std::io::Error),

    /// Lookup file is not a flat JSON object.
    #[error("Invalid lookup file: {0}")]
    Json(#[from] serde_json::Error),
}

// =============================================================================
// Pipeline Errors (top-level)
// =============================================================================

/// Top-level pipeline orchestration errors.
///
/// This is the error type returned by [`crate::pipeline::check_file`] and
/// [`crate::pipeline::check_bytes`].
#[derive(Debug, Error)]
pub enum PipelineError {
    /// Spreadsheet reading error.
    #[error("Ingest error: {0}")]
    Ingest(#[from] IngestError),

    /// Rule configuration error.
    #[error("Config error: {0}")]
    Config(#[from] ConfigError),

    /// Report sink error.
    #[error("Report error: {0}")]
    Report(#[from] ReportError),
}

// =============================================================================
// Server Errors
// =============================================================================

/// HTTP server errors.
#[derive(Debug, Error)]
pub enum ServerError {
    /// Pipeline error.
    #[error("Pipeline error: {0}")]
    Pipeline(#[from] PipelineError),

    /// Invalid request.
    #[error("Invalid request: {0}")]
    BadRequest(String),

    /// Failed to bind or serve.
    #[error("Server IO error: {0}")]
    Io(#[from] std::io::Error),
}

// =============================================================================
// Result Type Aliases
// =============================================================================

/// Result type for ingestion.
pub type IngestResult<T> = Result<T, IngestError>;

/// Result type for rule configuration.
pub type ConfigResult<T> = Result<T, ConfigError>;

/// Result type for report sinks.
pub type ReportResult<T> = Result<T, ReportError>;

/// Result type for lookup enrichment.
pub type EnrichResult<T> = Result<T, EnrichError>;

/// Result type for server operations.
pub type ServerResult<T> = Result<T, ServerError>;
