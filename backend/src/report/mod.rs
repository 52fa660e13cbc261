//! Report sinks.
//!
//! The rule engine hands every [`RowVerdict`] to a [`ReportSink`] as soon as
//! it is computed, and the final [`RunSummary`] once at the end. Rendering is
//! entirely the sink's business.
//!
//! - [`CollectingSink`] - keeps verdicts in memory (HTTP API, tests)
//! - [`CsvReportSink`] - passed list, failed list and quality summary as CSV

pub mod csv;

pub use self::csv::CsvReportSink;

use serde::Serialize;

use crate::error::ReportResult;
use crate::models::{Row, RowVerdict, RuleName, RunSummary};

/// Receives verdicts in source order, then the summary.
pub trait ReportSink {
    fn row(&mut self, row: &Row, verdict: &RowVerdict) -> ReportResult<()>;

    fn finish(&mut self, summary: &RunSummary) -> ReportResult<()>;
}

impl<S: ReportSink + ?Sized> ReportSink for &mut S {
    fn row(&mut self, row: &Row, verdict: &RowVerdict) -> ReportResult<()> {
        (**self).row(row, verdict)
    }

    fn finish(&mut self, summary: &RunSummary) -> ReportResult<()> {
        (**self).finish(summary)
    }
}

/// Feed two sinks at once.
impl<A: ReportSink, B: ReportSink> ReportSink for (A, B) {
    fn row(&mut self, row: &Row, verdict: &RowVerdict) -> ReportResult<()> {
        self.0.row(row, verdict)?;
        self.1.row(row, verdict)
    }

    fn finish(&mut self, summary: &RunSummary) -> ReportResult<()> {
        self.0.finish(summary)?;
        self.1.finish(summary)
    }
}

/// Keeps every verdict and the summary in memory.
#[derive(Debug, Default)]
pub struct CollectingSink {
    verdicts: Vec<RowVerdict>,
    summary: Option<RunSummary>,
}

impl CollectingSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn verdicts(&self) -> &[RowVerdict] {
        &self.verdicts
    }

    pub fn summary(&self) -> Option<&RunSummary> {
        self.summary.as_ref()
    }

    pub fn into_parts(self) -> (Vec<RowVerdict>, Option<RunSummary>) {
        (self.verdicts, self.summary)
    }
}

impl ReportSink for CollectingSink {
    fn row(&mut self, _row: &Row, verdict: &RowVerdict) -> ReportResult<()> {
        self.verdicts.push(verdict.clone());
        Ok(())
    }

    fn finish(&mut self, summary: &RunSummary) -> ReportResult<()> {
        self.summary = Some(summary.clone());
        Ok(())
    }
}

// =============================================================================
// Quality summary table
// =============================================================================

/// One line of the quality summary ("Qualitätsprüfung").
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SummaryLine {
    pub label: String,
    pub count: usize,
    /// Percentage of all rows, two decimals.
    pub rate: f64,
}

impl SummaryLine {
    pub fn rate_text(&self) -> String {
        format!("{}%", self.rate)
    }
}

/// Overall line first, then one line per rule.
pub fn summary_lines(summary: &RunSummary) -> Vec<SummaryLine> {
    let mut lines = vec![SummaryLine {
        label: format!("Gesamt({})", summary.total_rows),
        count: summary.invalid_rows,
        rate: summary.invalid_rate,
    }];

    lines.extend(RuleName::ALL.into_iter().map(|rule| SummaryLine {
        label: rule.summary_label().to_string(),
        count: summary.failures(rule),
        rate: summary.failure_rate(rule),
    }));

    lines
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{RuleFailure, RuleVerdict};
    use std::collections::BTreeMap;

    fn verdict(index: usize, valid: bool) -> RowVerdict {
        let structured = if valid {
            RuleVerdict::pass(RuleName::StructuredCode)
        } else {
            RuleVerdict::fail(RuleName::StructuredCode, RuleFailure::MissingValue)
        };
        RowVerdict::new(
            index,
            RuleVerdict::pass(RuleName::MandatoryFields),
            structured,
            RuleVerdict::pass(RuleName::Measurement),
        )
    }

    #[test]
    fn test_collecting_sink() {
        let mut sink = CollectingSink::new();
        let row = Row::new(4, vec![]);
        sink.row(&row, &verdict(4, true)).unwrap();
        sink.row(&row, &verdict(5, false)).unwrap();
        let summary = RunSummary::from_counts(2, 1, &BTreeMap::new());
        sink.finish(&summary).unwrap();

        assert_eq!(sink.verdicts().len(), 2);
        let (verdicts, summary) = sink.into_parts();
        assert_eq!(verdicts[1].row_index(), 5);
        assert_eq!(summary.unwrap().total_rows, 2);
    }

    #[test]
    fn test_pair_feeds_both() {
        let mut pair = (CollectingSink::new(), CollectingSink::new());
        pair.row(&Row::new(4, vec![]), &verdict(4, true)).unwrap();
        assert_eq!(pair.0.verdicts().len(), 1);
        assert_eq!(pair.1.verdicts().len(), 1);
    }

    #[test]
    fn test_summary_lines() {
        let mut failures = BTreeMap::new();
        failures.insert(RuleName::MandatoryFields, 1);
        failures.insert(RuleName::Measurement, 2);
        let summary = RunSummary::from_counts(8, 6, &failures);

        let lines = summary_lines(&summary);
        assert_eq!(lines.len(), 4);
        assert_eq!(lines[0].label, "Gesamt(8)");
        assert_eq!(lines[0].count, 2);
        assert_eq!(lines[0].rate_text(), "25%");
        assert_eq!(lines[1].label, "Vollständigkeit_Pflichtfeld");
        assert_eq!(lines[1].rate, 12.5);
        assert_eq!(lines[2].count, 0);
        assert_eq!(lines[3].label, "Gültigkeit_Maß");
    }

    #[test]
    fn test_summary_lines_no_rows() {
        let summary = RunSummary::from_counts(0, 0, &BTreeMap::new());
        let lines = summary_lines(&summary);
        assert_eq!(lines[0].label, "Gesamt(0)");
        assert!(lines.iter().all(|l| l.rate == 0.0));
    }
}
