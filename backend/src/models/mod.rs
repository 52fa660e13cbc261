//! Domain models for the row check.
//!
//! This module contains the plain data passed between ingestion, the rule
//! engine and the report sinks:
//!
//! - [`Row`] - One data record with its original sheet row number
//! - [`HeaderMap`] - Logical field name to column position, resolved once per sheet
//! - [`RuleName`] - The three business rules
//! - [`RuleVerdict`] / [`RuleFailure`] - Outcome of one rule on one row
//! - [`RowVerdict`] - Outcome of all rules on one row
//! - [`RunSummary`] - Aggregate counts and rates for a whole run

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

use crate::rules::normalize::fold_case;

// =============================================================================
// Column labels
// =============================================================================

/// Convert a 0-based column position to its spreadsheet letter (0 = A, 26 = AA).
pub fn column_letter(position: usize) -> String {
    let mut result = String::new();
    let mut n = position;
    loop {
        result.insert(0, (b'A' + (n % 26) as u8) as char);
        if n < 26 {
            break;
        }
        n = n / 26 - 1;
    }
    result
}

// =============================================================================
// Logical fields
// =============================================================================

/// Columns that the rules address by header name rather than by position.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum LogicalField {
    Length,
    Width,
    Height,
    MaterialText,
    Weight,
    StructuredCode,
}

impl LogicalField {
    pub const ALL: [LogicalField; 6] = [
        LogicalField::Length,
        LogicalField::Width,
        LogicalField::Height,
        LogicalField::MaterialText,
        LogicalField::Weight,
        LogicalField::StructuredCode,
    ];

    /// Stable identifier used in config errors and JSON.
    pub fn key(&self) -> &'static str {
        match self {
            Self::Length => "length",
            Self::Width => "width",
            Self::Height => "height",
            Self::MaterialText => "materialText",
            Self::Weight => "weight",
            Self::StructuredCode => "structuredCode",
        }
    }
}

// =============================================================================
// Row
// =============================================================================

/// One data record of a sheet.
///
/// `cells` are the raw cell texts in column order. The core never mutates a
/// row; it only reads cells through [`Row::cell`] and [`Row::field`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Row {
    /// Original 1-based row number in the source sheet.
    pub index: usize,
    pub cells: Vec<String>,
}

impl Row {
    pub fn new(index: usize, cells: Vec<String>) -> Self {
        Self { index, cells }
    }

    /// Trimmed value at `position`, or `None` when the cell is missing or blank.
    ///
    /// A row shorter than `position` behaves as if the cell were empty.
    pub fn cell(&self, position: usize) -> Option<&str> {
        self.cells
            .get(position)
            .map(|s| s.trim())
            .filter(|s| !s.is_empty())
    }

    /// Trimmed value of a header-addressed field, `None` if the sheet has no
    /// such column or the cell is blank.
    pub fn field(&self, headers: &HeaderMap, field: LogicalField) -> Option<&str> {
        headers.position(field).and_then(|pos| self.cell(pos))
    }

    /// True when every cell is blank.
    pub fn is_blank(&self) -> bool {
        self.cells.iter().all(|c| c.trim().is_empty())
    }
}

// =============================================================================
// Header map
// =============================================================================

/// Resolved header row of a sheet.
///
/// Each logical field maps to the first header whose text contains the
/// configured name, compared case-insensitively. An unmapped field is a valid
/// state: the field is simply absent for every row of that sheet.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct HeaderMap {
    headers: Vec<String>,
    positions: BTreeMap<LogicalField, usize>,
}

impl HeaderMap {
    /// Resolve `needles` (logical field, header name) against a header row.
    pub fn resolve<'a, I>(headers: &[String], needles: I) -> Self
    where
        I: IntoIterator<Item = (LogicalField, &'a str)>,
    {
        let folded: Vec<String> = headers.iter().map(|h| fold_case(h)).collect();
        let mut positions = BTreeMap::new();

        for (field, needle) in needles {
            let needle = fold_case(needle);
            if needle.is_empty() {
                continue;
            }
            if let Some(pos) = folded.iter().position(|h| h.contains(&needle)) {
                positions.insert(field, pos);
            }
        }

        Self {
            headers: headers.to_vec(),
            positions,
        }
    }

    /// Column position of a logical field.
    pub fn position(&self, field: LogicalField) -> Option<usize> {
        self.positions.get(&field).copied()
    }

    /// Header text at a column position, if the header row reaches that far
    /// and the cell is not blank.
    pub fn header_at(&self, position: usize) -> Option<&str> {
        self.headers
            .get(position)
            .map(|h| h.trim())
            .filter(|h| !h.is_empty())
    }

    pub fn headers(&self) -> &[String] {
        &self.headers
    }

    /// Logical fields that no header matched.
    pub fn unmapped(&self) -> Vec<LogicalField> {
        LogicalField::ALL
            .into_iter()
            .filter(|f| !self.positions.contains_key(f))
            .collect()
    }
}

// =============================================================================
// Rules and verdicts
// =============================================================================

/// The three independent business rules.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum RuleName {
    MandatoryFields,
    StructuredCode,
    Measurement,
}

impl RuleName {
    pub const ALL: [RuleName; 3] = [
        RuleName::MandatoryFields,
        RuleName::StructuredCode,
        RuleName::Measurement,
    ];

    /// Row label in the quality summary table.
    pub fn summary_label(&self) -> &'static str {
        match self {
            Self::MandatoryFields => "Vollständigkeit_Pflichtfeld",
            Self::StructuredCode => "Vollständigkeit_Fert./Prüfhinweis",
            Self::Measurement => "Gültigkeit_Maß",
        }
    }

    /// Name of the 0/1 flag column in the row reports.
    pub fn flag_column(&self) -> &'static str {
        match self {
            Self::MandatoryFields => "Fehler_Pflichtfelder",
            Self::StructuredCode => "Fehler_Fert./Prüfhinweis",
            Self::Measurement => "Fehler_Maßprüfung",
        }
    }
}

/// Reference to a cell that caused a failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", content = "value", rename_all = "camelCase")]
pub enum FieldRef {
    /// Positionally addressed column.
    Column(usize),
    /// Header-addressed column.
    Field(LogicalField),
}

/// A required column that was blank.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MissingColumn {
    pub position: usize,
    /// Spreadsheet letter of `position`.
    pub label: String,
    /// Header text at `position`, `None` if the header row has none there.
    pub header: Option<String>,
}

impl fmt::Display for MissingColumn {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.label, self.header.as_deref().unwrap_or("unknown"))
    }
}

/// A structured-code segment not found in its allowed set.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct InvalidSegment {
    /// 1-based segment position.
    pub segment: usize,
    pub value: String,
}

/// One finding of the measurement rule.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "issue", rename_all = "camelCase")]
pub enum MeasurementIssue {
    /// Length, width and height are all zero and the material text carries
    /// no textual measurement either.
    AllDimensionsZero,
    NegativeDimension { fields: Vec<LogicalField> },
    ExceedsMaximum { fields: Vec<LogicalField>, bound: f64 },
    NonPositiveWeight { value: f64 },
}

impl MeasurementIssue {
    fn fields(&self) -> Vec<LogicalField> {
        match self {
            Self::AllDimensionsZero => vec![
                LogicalField::Length,
                LogicalField::Width,
                LogicalField::Height,
                LogicalField::MaterialText,
            ],
            Self::NegativeDimension { fields } | Self::ExceedsMaximum { fields, .. } => {
                fields.clone()
            }
            Self::NonPositiveWeight { .. } => vec![LogicalField::Weight],
        }
    }
}

impl fmt::Display for MeasurementIssue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::AllDimensionsZero => {
                write!(f, "all dimensions zero, no textual measurement found")
            }
            Self::NegativeDimension { fields } => {
                write!(f, "negative dimension: {}", join_keys(fields))
            }
            Self::ExceedsMaximum { fields, bound } => {
                write!(
                    f,
                    "dimension exceeds plausible maximum {}: {}",
                    bound,
                    join_keys(fields)
                )
            }
            Self::NonPositiveWeight { value } => write!(f, "non-positive weight: {}", value),
        }
    }
}

fn join_keys(fields: &[LogicalField]) -> String {
    fields.iter().map(|f| f.key()).collect::<Vec<_>>().join(", ")
}

/// Why a rule rejected a row.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "code", rename_all = "camelCase")]
pub enum RuleFailure {
    /// Mandatory columns that were blank, every one of them.
    MissingFields { missing: Vec<MissingColumn> },
    /// Structured code absent or blank.
    MissingValue,
    /// Structured code did not split into the expected number of segments.
    WrongSegmentCount { expected: usize, found: usize },
    /// Structured code had the right shape but unknown segment values.
    InvalidSegments { segments: Vec<InvalidSegment> },
    /// Dimension and/or weight findings, never empty.
    ImplausibleMeasurement { issues: Vec<MeasurementIssue> },
}

impl RuleFailure {
    /// Machine-readable reason code.
    pub fn code(&self) -> &'static str {
        match self {
            Self::MissingFields { .. } => "missingFields",
            Self::MissingValue => "missingValue",
            Self::WrongSegmentCount { .. } => "wrongSegmentCount",
            Self::InvalidSegments { .. } => "invalidSegments",
            Self::ImplausibleMeasurement { .. } => "implausibleMeasurement",
        }
    }

    /// Cells responsible for the failure.
    pub fn fields(&self) -> Vec<FieldRef> {
        match self {
            Self::MissingFields { missing } => {
                missing.iter().map(|m| FieldRef::Column(m.position)).collect()
            }
            Self::MissingValue | Self::WrongSegmentCount { .. } | Self::InvalidSegments { .. } => {
                vec![FieldRef::Field(LogicalField::StructuredCode)]
            }
            Self::ImplausibleMeasurement { issues } => {
                let mut fields: Vec<LogicalField> =
                    issues.iter().flat_map(MeasurementIssue::fields).collect();
                fields.sort();
                fields.dedup();
                fields.into_iter().map(FieldRef::Field).collect()
            }
        }
    }
}

impl fmt::Display for RuleFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::MissingFields { missing } => {
                let list: Vec<String> = missing.iter().map(|m| m.to_string()).collect();
                write!(f, "missing mandatory fields: {}", list.join(", "))
            }
            Self::MissingValue => write!(f, "missing value"),
            Self::WrongSegmentCount { expected, found } => {
                write!(f, "wrong segment count: expected {}, found {}", expected, found)
            }
            Self::InvalidSegments { segments } => {
                let list: Vec<String> = segments
                    .iter()
                    .map(|s| format!("segment {} '{}'", s.segment, s.value))
                    .collect();
                write!(f, "invalid segment value(s): {}", list.join(", "))
            }
            Self::ImplausibleMeasurement { issues } => {
                let list: Vec<String> = issues.iter().map(|i| i.to_string()).collect();
                write!(f, "{}", list.join("; "))
            }
        }
    }
}

/// Outcome of one rule on one row. Invalid iff it carries a failure.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RuleVerdict {
    rule: RuleName,
    valid: bool,
    reason: Option<String>,
    failure: Option<RuleFailure>,
}

impl RuleVerdict {
    pub fn pass(rule: RuleName) -> Self {
        Self {
            rule,
            valid: true,
            reason: None,
            failure: None,
        }
    }

    pub fn fail(rule: RuleName, failure: RuleFailure) -> Self {
        Self {
            rule,
            valid: false,
            reason: Some(failure.to_string()),
            failure: Some(failure),
        }
    }

    pub fn rule(&self) -> RuleName {
        self.rule
    }

    pub fn is_valid(&self) -> bool {
        self.valid
    }

    /// Human-readable reason, present iff the verdict is invalid.
    pub fn reason(&self) -> Option<&str> {
        self.reason.as_deref()
    }

    /// Structured detail of the failure.
    pub fn failure(&self) -> Option<&RuleFailure> {
        self.failure.as_ref()
    }
}

/// Outcome of all three rules on one row.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RowVerdict {
    row_index: usize,
    mandatory_fields: RuleVerdict,
    structured_code: RuleVerdict,
    measurement: RuleVerdict,
    overall_valid: bool,
    failure_reasons: Vec<String>,
}

impl RowVerdict {
    /// Combine the three rule verdicts. `overall_valid` is their conjunction.
    pub fn new(
        row_index: usize,
        mandatory_fields: RuleVerdict,
        structured_code: RuleVerdict,
        measurement: RuleVerdict,
    ) -> Self {
        let overall_valid =
            mandatory_fields.is_valid() && structured_code.is_valid() && measurement.is_valid();
        let failure_reasons = [&mandatory_fields, &structured_code, &measurement]
            .iter()
            .filter_map(|v| v.reason().map(str::to_string))
            .collect();

        Self {
            row_index,
            mandatory_fields,
            structured_code,
            measurement,
            overall_valid,
            failure_reasons,
        }
    }

    pub fn row_index(&self) -> usize {
        self.row_index
    }

    pub fn mandatory_fields(&self) -> &RuleVerdict {
        &self.mandatory_fields
    }

    pub fn structured_code(&self) -> &RuleVerdict {
        &self.structured_code
    }

    pub fn measurement(&self) -> &RuleVerdict {
        &self.measurement
    }

    pub fn is_valid(&self) -> bool {
        self.overall_valid
    }

    /// Reasons of the failed rules, in rule order.
    pub fn failure_reasons(&self) -> &[String] {
        &self.failure_reasons
    }

    /// Verdicts in rule order.
    pub fn verdicts(&self) -> [&RuleVerdict; 3] {
        [&self.mandatory_fields, &self.structured_code, &self.measurement]
    }

    /// Verdict of a specific rule.
    pub fn verdict(&self, rule: RuleName) -> &RuleVerdict {
        match rule {
            RuleName::MandatoryFields => &self.mandatory_fields,
            RuleName::StructuredCode => &self.structured_code,
            RuleName::Measurement => &self.measurement,
        }
    }

    pub fn failed_rules(&self) -> Vec<RuleName> {
        self.verdicts()
            .into_iter()
            .filter(|v| !v.is_valid())
            .map(RuleVerdict::rule)
            .collect()
    }

    /// Cells responsible for any failure on this row.
    pub fn failed_fields(&self) -> Vec<FieldRef> {
        self.verdicts()
            .into_iter()
            .filter_map(RuleVerdict::failure)
            .flat_map(RuleFailure::fields)
            .collect()
    }
}

// =============================================================================
// Run summary
// =============================================================================

/// `count / total * 100`, rounded to two decimals; `0.0` when `total == 0`.
pub fn percentage(count: usize, total: usize) -> f64 {
    if total == 0 {
        return 0.0;
    }
    ((count as f64 / total as f64) * 100.0 * 100.0).round() / 100.0
}

/// Aggregate counts for a whole run.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RunSummary {
    pub total_rows: usize,
    pub valid_rows: usize,
    pub invalid_rows: usize,
    /// Rows that failed each rule; a row failing two rules counts in both.
    pub rule_failures: BTreeMap<RuleName, usize>,
    /// Percentage of invalid rows.
    pub invalid_rate: f64,
    pub rule_failure_rates: BTreeMap<RuleName, f64>,
}

impl RunSummary {
    /// Build a summary from raw counts. Rules missing from `rule_failures`
    /// count as zero; `valid_rows` is capped at `total_rows`.
    pub fn from_counts(
        total_rows: usize,
        valid_rows: usize,
        rule_failures: &BTreeMap<RuleName, usize>,
    ) -> Self {
        let rule_failures: BTreeMap<RuleName, usize> = RuleName::ALL
            .into_iter()
            .map(|rule| (rule, rule_failures.get(&rule).copied().unwrap_or(0)))
            .collect();
        let valid_rows = valid_rows.min(total_rows);
        let invalid_rows = total_rows - valid_rows;
        let rule_failure_rates = rule_failures
            .iter()
            .map(|(rule, count)| (*rule, percentage(*count, total_rows)))
            .collect();

        Self {
            total_rows,
            valid_rows,
            invalid_rows,
            rule_failures,
            invalid_rate: percentage(invalid_rows, total_rows),
            rule_failure_rates,
        }
    }

    pub fn failures(&self, rule: RuleName) -> usize {
        self.rule_failures.get(&rule).copied().unwrap_or(0)
    }

    pub fn failure_rate(&self, rule: RuleName) -> f64 {
        self.rule_failure_rates.get(&rule).copied().unwrap_or(0.0)
    }
}
