//! # clickcheck - product data quality checks
//!
//! Checks manufacturer product export sheets row by row against three
//! independent business rules and reports which rows are usable.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────┐     ┌─────────────┐     ┌─────────────┐     ┌─────────────┐
//! │ CSV / XLSX  │────▶│   Parser    │────▶│    Rules    │────▶│   Reports   │
//! │  (upload)   │     │ (auto-det.) │     │ (3 checks)  │     │ (CSV/JSON)  │
//! └─────────────┘     └─────────────┘     └─────────────┘     └─────────────┘
//! ```
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use clickcheck::{check_file, IngestOptions, RuleConfig};
//!
//! let result = check_file("export.xlsx", IngestOptions::default(), &RuleConfig::default())?;
//! println!("{} of {} rows failed", result.summary.invalid_rows, result.summary.total_rows);
//! ```
//!
//! ## Modules
//!
//! - [`error`] - Hierarchical error types
//! - [`models`] - Rows, header map, verdicts and run summary
//! - [`rules`] - Rule configuration and the three row rules
//! - [`parser`] - CSV and workbook ingestion with auto-detection
//! - [`report`] - Report sinks
//! - [`enrich`] - Comparison against an item lookup source
//! - [`pipeline`] - Ingest, classify, report
//! - [`api`] - HTTP API server

// Core modules
pub mod error;
pub mod models;
pub mod rules;

// Ingestion
pub mod parser;

// Output
pub mod report;

// Lookup comparison
pub mod enrich;

// Orchestration
pub mod pipeline;

// HTTP API
pub mod api;

// =============================================================================
// Re-exports - Error types
// =============================================================================

pub use error::{
    ConfigError, EnrichError, IngestError, PipelineError, ReportError, ServerError,
};

// =============================================================================
// Re-exports - Models
// =============================================================================

pub use models::{
    HeaderMap, LogicalField, Row, RowVerdict, RuleFailure, RuleName, RuleVerdict, RunSummary,
};

// =============================================================================
// Re-exports - Rules
// =============================================================================

pub use rules::{evaluate_row, summarize, Classifier, RuleConfig, RuleSettings, RunAggregator};

// =============================================================================
// Re-exports - Parsing
// =============================================================================

pub use parser::{parse_bytes_auto, parse_file_auto, IngestOptions, Sheet, SheetInfo};

// =============================================================================
// Re-exports - Reports and enrichment
// =============================================================================

pub use report::{summary_lines, CollectingSink, CsvReportSink, ReportSink};

pub use enrich::{compare, enrich_sheet, Agreement, ItemLookup, StaticLookup};

// =============================================================================
// Re-exports - Pipeline
// =============================================================================

pub use pipeline::{check_bytes, check_file, check_sheet, run_check, CheckResult};

// Server
pub mod server {
    pub use crate::api::server::start_server;
}
