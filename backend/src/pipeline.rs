//! Check pipeline.
//!
//! Ingest → resolve headers → classify every row in source order → notify
//! the sink → summary. Progress goes through the log broadcaster; the rule
//! evaluators themselves never log.

use serde::Serialize;
use std::path::Path;

use crate::api::logs::{log_info, log_info_indent, log_success, log_warning};
use crate::error::{PipelineError, ReportResult};
use crate::models::{RowVerdict, RuleName, RunSummary};
use crate::parser::{parse_bytes_auto, parse_file_auto, IngestOptions, Sheet, SheetInfo};
use crate::report::{CollectingSink, ReportSink};
use crate::rules::{Classifier, RuleConfig};

/// Everything a check run produces.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CheckResult {
    pub sheet_info: SheetInfo,
    pub verdicts: Vec<RowVerdict>,
    pub summary: RunSummary,
}

impl CheckResult {
    pub fn has_failures(&self) -> bool {
        self.summary.invalid_rows > 0
    }

    pub fn failed(&self) -> impl Iterator<Item = &RowVerdict> {
        self.verdicts.iter().filter(|v| !v.is_valid())
    }
}

/// Classify every row of `sheet` and feed `sink`.
///
/// The header map is resolved once. The sink sees rows in source order and
/// receives the summary last.
pub fn run_check<S: ReportSink + ?Sized>(
    sheet: &Sheet,
    config: &RuleConfig,
    sink: &mut S,
) -> ReportResult<RunSummary> {
    let mut classifier = Classifier::new(config, &sheet.headers);

    let unmapped = classifier.headers().unmapped();
    if !unmapped.is_empty() {
        let names: Vec<&str> = unmapped.iter().map(|f| config.fields().name(*f)).collect();
        log_warning(format!("No column found for: {}", names.join(", ")));
    }

    for row in &sheet.rows {
        let verdict = classifier.classify(row);
        sink.row(row, &verdict)?;
    }

    let summary = classifier.summary();
    sink.finish(&summary)?;
    log_summary(&summary);
    Ok(summary)
}

/// Classify a parsed sheet, keeping all verdicts in memory.
pub fn check_sheet(sheet: &Sheet, config: &RuleConfig) -> ReportResult<CheckResult> {
    let mut sink = CollectingSink::new();
    let summary = run_check(sheet, config, &mut sink)?;
    let (verdicts, _) = sink.into_parts();

    Ok(CheckResult {
        sheet_info: sheet.info(),
        verdicts,
        summary,
    })
}

/// Read and check a spreadsheet file.
pub fn check_file<P: AsRef<Path>>(
    path: P,
    options: IngestOptions,
    config: &RuleConfig,
) -> Result<CheckResult, PipelineError> {
    let path = path.as_ref();
    log_info(format!("📖 Reading {}", path.display()));
    let sheet = parse_file_auto(path, options)?;
    log_sheet(&sheet);
    Ok(check_sheet(&sheet, config)?)
}

/// Check an in-memory upload.
pub fn check_bytes(
    bytes: &[u8],
    file_name: Option<&str>,
    options: IngestOptions,
    config: &RuleConfig,
) -> Result<CheckResult, PipelineError> {
    log_info(format!(
        "📖 Reading {} ({} bytes)",
        file_name.unwrap_or("upload"),
        bytes.len()
    ));
    let sheet = parse_bytes_auto(bytes, file_name, options)?;
    log_sheet(&sheet);
    Ok(check_sheet(&sheet, config)?)
}

fn log_sheet(sheet: &Sheet) {
    if let Some(encoding) = &sheet.encoding {
        log_success(format!("Detected encoding: {}", encoding));
    }
    if let Some(delimiter) = sheet.delimiter {
        log_success(format!(
            "Detected separator: '{}'",
            crate::parser::format_delimiter(delimiter)
        ));
    }
    log_success(format!(
        "Read {} rows, {} columns",
        sheet.rows.len(),
        sheet.headers.len()
    ));
}

fn log_summary(summary: &RunSummary) {
    log_info(format!(
        "📊 {} rows: {} valid, {} with errors ({}%)",
        summary.total_rows, summary.valid_rows, summary.invalid_rows, summary.invalid_rate
    ));
    for rule in RuleName::ALL {
        let failures = summary.failures(rule);
        if failures > 0 {
            log_info_indent(
                format!("{}: {} ({}%)", rule.summary_label(), failures, summary.failure_rate(rule)),
                1,
            );
        }
    }
    if summary.invalid_rows == 0 {
        log_success("All rows passed");
    } else {
        log_warning(format!("{} row(s) failed", summary.invalid_rows));
    }
}
