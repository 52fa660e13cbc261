//! Plain CSV report: passed rows, failed rows, quality summary.
//!
//! Row files carry the original columns followed by one 0/1 flag per rule,
//! the overall flag, the failing cells and the failure reasons.
//! `;`-separated so that German spreadsheet applications open them without
//! an import dialog.

use std::fs::{self, File};
use std::io::Write;
use std::path::Path;

use super::{summary_lines, ReportSink};
use crate::error::ReportResult;
use crate::models::{column_letter, FieldRef, HeaderMap, Row, RowVerdict, RuleName, RunSummary};

pub const PASSED_FILE: &str = "ohne_fehler.csv";
pub const FAILED_FILE: &str = "mit_fehlern.csv";
pub const SUMMARY_FILE: &str = "qualitaetspruefung.csv";

const OVERALL_FLAG_COLUMN: &str = "Fehler";
const FIELDS_COLUMN: &str = "Fehlerfelder";
const REASONS_COLUMN: &str = "Fehlergründe";

fn writer<W: Write>(inner: W) -> ::csv::Writer<W> {
    ::csv::WriterBuilder::new()
        .delimiter(b';')
        .flexible(true)
        .from_writer(inner)
}

fn flag(failed: bool) -> &'static str {
    if failed {
        "1"
    } else {
        "0"
    }
}

/// Writes the passed list, the failed list and the summary.
pub struct CsvReportSink<W: Write> {
    headers: HeaderMap,
    passed: ::csv::Writer<W>,
    failed: ::csv::Writer<W>,
    summary: ::csv::Writer<W>,
}

impl CsvReportSink<File> {
    /// Create the three report files in `dir`, creating it if needed.
    pub fn create(dir: &Path, headers: &HeaderMap) -> ReportResult<Self> {
        fs::create_dir_all(dir)?;
        Self::from_writers(
            File::create(dir.join(PASSED_FILE))?,
            File::create(dir.join(FAILED_FILE))?,
            File::create(dir.join(SUMMARY_FILE))?,
            headers,
        )
    }
}

impl<W: Write> CsvReportSink<W> {
    pub fn from_writers(passed: W, failed: W, summary: W, headers: &HeaderMap) -> ReportResult<Self> {
        let mut header_row: Vec<&str> = headers.headers().iter().map(String::as_str).collect();
        header_row.extend(RuleName::ALL.iter().map(|r| r.flag_column()));
        header_row.push(OVERALL_FLAG_COLUMN);
        header_row.push(FIELDS_COLUMN);
        header_row.push(REASONS_COLUMN);

        let mut passed = writer(passed);
        let mut failed = writer(failed);
        passed.write_record(&header_row)?;
        failed.write_record(&header_row)?;

        Ok(Self {
            headers: headers.clone(),
            passed,
            failed,
            summary: writer(summary),
        })
    }

    /// Flush everything and hand back the writers.
    pub fn into_inner(self) -> ReportResult<(W, W, W)> {
        let take = |w: ::csv::Writer<W>| w.into_inner().map_err(|e| e.into_error());
        Ok((take(self.passed)?, take(self.failed)?, take(self.summary)?))
    }

    /// `N (Fert./Prüfhinweis)` for a located cell, the field key for a
    /// header-addressed field the sheet does not have.
    fn field_label(&self, field: FieldRef) -> String {
        let position = match field {
            FieldRef::Column(pos) => Some(pos),
            FieldRef::Field(f) => self.headers.position(f),
        };
        match (position, field) {
            (Some(pos), _) => match self.headers.header_at(pos) {
                Some(header) => format!("{} ({})", column_letter(pos), header),
                None => column_letter(pos),
            },
            (None, FieldRef::Field(f)) => f.key().to_string(),
            (None, FieldRef::Column(pos)) => column_letter(pos),
        }
    }

    fn failed_cells(&self, verdict: &RowVerdict) -> String {
        let mut labels: Vec<String> = Vec::new();
        for field in verdict.failed_fields() {
            let label = self.field_label(field);
            if !labels.contains(&label) {
                labels.push(label);
            }
        }
        labels.join(", ")
    }
}

impl<W: Write> ReportSink for CsvReportSink<W> {
    fn row(&mut self, row: &Row, verdict: &RowVerdict) -> ReportResult<()> {
        let width = self.headers.headers().len().max(row.cells.len());
        let mut record: Vec<&str> = (0..width)
            .map(|i| row.cells.get(i).map(String::as_str).unwrap_or(""))
            .collect();
        record.extend(
            RuleName::ALL
                .iter()
                .map(|r| flag(!verdict.verdict(*r).is_valid())),
        );
        record.push(flag(!verdict.is_valid()));
        let cells = self.failed_cells(verdict);
        record.push(&cells);
        let reasons = verdict.failure_reasons().join("; ");
        record.push(&reasons);

        let target = if verdict.is_valid() {
            &mut self.passed
        } else {
            &mut self.failed
        };
        target.write_record(&record)?;
        Ok(())
    }

    fn finish(&mut self, summary: &RunSummary) -> ReportResult<()> {
        self.summary.write_record(["", "Fehleranzahl", "Fehlerquote"])?;
        for line in summary_lines(summary) {
            let rate = line.rate_text();
            self.summary
                .write_record([line.label, line.count.to_string(), rate])?;
        }
        self.passed.flush()?;
        self.failed.flush()?;
        self.summary.flush()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{MeasurementIssue, MissingColumn, RuleFailure, RuleVerdict};
    use crate::rules::RuleConfig;
    use tempfile::tempdir;

    fn header_map() -> HeaderMap {
        let headers = vec!["Nr".to_string(), "Fert./Prüfhinweis".to_string()];
        HeaderMap::resolve(&headers, RuleConfig::default().fields().needles())
    }

    fn failing_verdict(index: usize) -> RowVerdict {
        RowVerdict::new(
            index,
            RuleVerdict::pass(RuleName::MandatoryFields),
            RuleVerdict::fail(
                RuleName::StructuredCode,
                RuleFailure::WrongSegmentCount { expected: 5, found: 4 },
            ),
            RuleVerdict::pass(RuleName::Measurement),
        )
    }

    fn passing_verdict(index: usize) -> RowVerdict {
        RowVerdict::new(
            index,
            RuleVerdict::pass(RuleName::MandatoryFields),
            RuleVerdict::pass(RuleName::StructuredCode),
            RuleVerdict::pass(RuleName::Measurement),
        )
    }

    #[test]
    fn test_rows_partitioned() {
        let mut sink =
            CsvReportSink::from_writers(Vec::new(), Vec::new(), Vec::new(), &header_map()).unwrap();

        sink.row(&Row::new(4, vec!["1".into(), "OHNE/N/N/N/N".into()]), &passing_verdict(4))
            .unwrap();
        sink.row(&Row::new(5, vec!["2".into()]), &failing_verdict(5))
            .unwrap();
        let summary = crate::rules::summarize([&passing_verdict(4), &failing_verdict(5)]);
        sink.finish(&summary).unwrap();

        let (passed, failed, summary) = sink.into_inner().unwrap();
        let passed = String::from_utf8(passed).unwrap();
        let failed = String::from_utf8(failed).unwrap();
        let summary = String::from_utf8(summary).unwrap();

        let passed_lines: Vec<&str> = passed.lines().collect();
        assert_eq!(
            passed_lines[0],
            "Nr;Fert./Prüfhinweis;Fehler_Pflichtfelder;Fehler_Fert./Prüfhinweis;Fehler_Maßprüfung;Fehler;Fehlerfelder;Fehlergründe"
        );
        assert_eq!(passed_lines[1], "1;OHNE/N/N/N/N;0;0;0;0;;");
        assert_eq!(passed_lines.len(), 2);

        let failed_lines: Vec<&str> = failed.lines().collect();
        assert_eq!(
            failed_lines[1],
            "2;;0;1;0;1;B (Fert./Prüfhinweis);wrong segment count: expected 5, found 4"
        );

        assert!(summary.contains("Gesamt(2);1;50%"));
        assert!(summary.contains("Vollständigkeit_Fert./Prüfhinweis;1;50%"));
    }

    #[test]
    fn test_failed_cells_labels() {
        let mut sink =
            CsvReportSink::from_writers(Vec::new(), Vec::new(), Vec::new(), &header_map()).unwrap();
        let verdict = RowVerdict::new(
            6,
            RuleVerdict::fail(
                RuleName::MandatoryFields,
                RuleFailure::MissingFields {
                    missing: vec![MissingColumn {
                        position: 3,
                        label: "D".into(),
                        header: None,
                    }],
                },
            ),
            RuleVerdict::pass(RuleName::StructuredCode),
            RuleVerdict::fail(
                RuleName::Measurement,
                RuleFailure::ImplausibleMeasurement {
                    issues: vec![MeasurementIssue::NonPositiveWeight { value: 0.0 }],
                },
            ),
        );

        // D has no header; the sheet has no weight column
        assert_eq!(sink.failed_cells(&verdict), "D, weight");

        sink.row(&Row::new(6, vec!["3".into(), "x".into()]), &verdict).unwrap();
        let (_, failed, _) = sink.into_inner().unwrap();
        let failed = String::from_utf8(failed).unwrap();
        assert!(failed.lines().nth(1).unwrap().contains(";D, weight;"));
    }

    #[test]
    fn test_create_writes_files() {
        let dir = tempdir().unwrap();
        let out = dir.path().join("report");
        let mut sink = CsvReportSink::create(&out, &header_map()).unwrap();
        sink.finish(&crate::rules::summarize(std::iter::empty::<&RowVerdict>()))
            .unwrap();
        drop(sink);

        assert!(out.join(PASSED_FILE).exists());
        assert!(out.join(FAILED_FILE).exists());
        let summary = fs::read_to_string(out.join(SUMMARY_FILE)).unwrap();
        assert!(summary.contains("Gesamt(0);0;0%"));
    }
}
