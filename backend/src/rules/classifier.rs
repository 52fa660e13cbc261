//! Row classification and run aggregation.
//!
//! Every rule runs on every row; no rule short-circuits another, so a row
//! can carry several failure reasons at once.

use std::collections::BTreeMap;

use super::mandatory::check_mandatory_fields;
use super::measurement::check_measurement;
use super::structured_code::check_structured_code;
use super::RuleConfig;
use crate::models::{HeaderMap, LogicalField, Row, RowVerdict, RuleName, RunSummary};

/// Evaluate all three rules on one row.
///
/// Pure: the same row, header map and config always give the same verdict.
pub fn evaluate_row(row: &Row, headers: &HeaderMap, config: &RuleConfig) -> RowVerdict {
    let mandatory = check_mandatory_fields(row, headers, config.mandatory_positions());
    let structured = check_structured_code(
        row.field(headers, LogicalField::StructuredCode),
        config.allowed_sets(),
    );
    let measurement = check_measurement(row, headers, config);

    RowVerdict::new(row.index, mandatory, structured, measurement)
}

/// Running counts over the rows classified so far.
#[derive(Debug, Clone, Default)]
pub struct RunAggregator {
    total: usize,
    valid: usize,
    failures: BTreeMap<RuleName, usize>,
}

impl RunAggregator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&mut self, verdict: &RowVerdict) {
        self.total += 1;
        if verdict.is_valid() {
            self.valid += 1;
        }
        for rule in verdict.failed_rules() {
            *self.failures.entry(rule).or_insert(0) += 1;
        }
    }

    /// Snapshot of the counts with derived percentages.
    pub fn finish(&self) -> RunSummary {
        RunSummary::from_counts(self.total, self.valid, &self.failures)
    }
}

/// Aggregate an already computed sequence of verdicts.
pub fn summarize<'a, I>(verdicts: I) -> RunSummary
where
    I: IntoIterator<Item = &'a RowVerdict>,
{
    let mut aggregator = RunAggregator::new();
    for verdict in verdicts {
        aggregator.record(verdict);
    }
    aggregator.finish()
}

/// Classifies the rows of one sheet: header map resolved once, counts kept
/// across calls.
#[derive(Debug)]
pub struct Classifier<'c> {
    config: &'c RuleConfig,
    headers: HeaderMap,
    aggregator: RunAggregator,
}

impl<'c> Classifier<'c> {
    pub fn new(config: &'c RuleConfig, header_row: &[String]) -> Self {
        Self {
            config,
            headers: HeaderMap::resolve(header_row, config.fields().needles()),
            aggregator: RunAggregator::new(),
        }
    }

    pub fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    pub fn classify(&mut self, row: &Row) -> RowVerdict {
        let verdict = evaluate_row(row, &self.headers, self.config);
        self.aggregator.record(&verdict);
        verdict
    }

    pub fn summary(&self) -> RunSummary {
        self.aggregator.finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// A..W plus the header-addressed columns in X..AC.
    fn header_row() -> Vec<String> {
        let mut headers: Vec<String> = (0..23).map(|i| format!("Spalte {}", i)).collect();
        headers[13] = "Fert./Prüfhinweis".to_string();
        headers.extend(
            ["Länge", "Breite", "Höhe", "Materialkurztext", "Gewicht"]
                .iter()
                .map(|s| s.to_string()),
        );
        headers
    }

    fn full_row(index: usize) -> Row {
        let mut cells: Vec<String> = (0..23).map(|i| format!("v{}", i)).collect();
        cells[0] = String::new();
        cells[13] = "1/N/N/N/N".to_string();
        cells.extend(["10", "10", "10", "Karton", "2,5"].iter().map(|s| s.to_string()));
        Row::new(index, cells)
    }

    fn set(row: &mut Row, header: &str, value: &str) {
        let pos = header_row().iter().position(|h| h == header).unwrap();
        row.cells[pos] = value.to_string();
    }

    #[test]
    fn test_fully_valid_row() {
        let config = RuleConfig::default();
        let mut classifier = Classifier::new(&config, &header_row());
        let verdict = classifier.classify(&full_row(4));
        assert!(verdict.is_valid(), "{:?}", verdict.failure_reasons());
        assert!(verdict.failure_reasons().is_empty());
        assert_eq!(verdict.row_index(), 4);
    }

    #[test]
    fn test_zero_dimensions_fail_measurement_only() {
        let config = RuleConfig::default();
        let mut classifier = Classifier::new(&config, &header_row());
        let mut row = full_row(5);
        set(&mut row, "Länge", "0");
        set(&mut row, "Breite", "0");
        set(&mut row, "Höhe", "0");

        let verdict = classifier.classify(&row);
        assert!(!verdict.is_valid());
        assert_eq!(verdict.failed_rules(), vec![RuleName::Measurement]);
        assert!(verdict.mandatory_fields().is_valid());
        assert!(verdict.structured_code().is_valid());
    }

    #[test]
    fn test_multiple_reasons_collected() {
        let config = RuleConfig::default();
        let mut classifier = Classifier::new(&config, &header_row());
        let mut row = full_row(6);
        row.cells[2] = " ".to_string();
        set(&mut row, "Fert./Prüfhinweis", "X/N/N/N/N");
        set(&mut row, "Höhe", "-4");

        let verdict = classifier.classify(&row);
        assert_eq!(verdict.failed_rules(), RuleName::ALL.to_vec());
        assert_eq!(verdict.failure_reasons().len(), 3);
        assert!(verdict.failure_reasons()[0].contains("C (Spalte 2)"));
    }

    #[test]
    fn test_overall_valid_iff_no_reason() {
        let config = RuleConfig::default();
        let map = HeaderMap::resolve(&header_row(), config.fields().needles());
        let mut broken = full_row(8);
        broken.cells.truncate(5);

        for row in [full_row(7), broken] {
            let verdict = evaluate_row(&row, &map, &config);
            let any_reason = verdict.verdicts().iter().any(|v| v.reason().is_some());
            assert_eq!(verdict.is_valid(), !any_reason);
        }
    }

    #[test]
    fn test_evaluate_is_idempotent() {
        let config = RuleConfig::default();
        let map = HeaderMap::resolve(&header_row(), config.fields().needles());
        let mut row = full_row(9);
        set(&mut row, "Gewicht", "0");
        assert_eq!(
            evaluate_row(&row, &map, &config),
            evaluate_row(&row, &map, &config)
        );
    }

    #[test]
    fn test_missing_structured_code_column() {
        let config = RuleConfig::default();
        let mut headers = header_row();
        headers[13] = "Bemerkung".to_string();
        let map = HeaderMap::resolve(&headers, config.fields().needles());
        let verdict = evaluate_row(&full_row(3), &map, &config);
        assert_eq!(verdict.structured_code().reason(), Some("missing value"));
    }

    #[test]
    fn test_summary_counts() {
        let config = RuleConfig::default();
        let mut classifier = Classifier::new(&config, &header_row());

        let valid = full_row(4);
        let mut two_failures = full_row(5);
        two_failures.cells[1].clear();
        set(&mut two_failures, "Gewicht", "-1");
        let mut one_failure = full_row(6);
        set(&mut one_failure, "Fert./Prüfhinweis", "OHNE/N/N/N");

        let verdicts: Vec<RowVerdict> = [valid, two_failures, one_failure]
            .iter()
            .map(|r| classifier.classify(r))
            .collect();

        let summary = classifier.summary();
        assert_eq!(summary, summarize(&verdicts));
        assert_eq!(summary.total_rows, 3);
        assert_eq!(summary.valid_rows, 1);
        assert_eq!(summary.invalid_rows, 2);
        assert_eq!(summary.failures(RuleName::MandatoryFields), 1);
        assert_eq!(summary.failures(RuleName::StructuredCode), 1);
        assert_eq!(summary.failures(RuleName::Measurement), 1);
        assert_eq!(summary.invalid_rate, 66.67);
        assert_eq!(summary.failure_rate(RuleName::Measurement), 33.33);
    }

    #[test]
    fn test_summarize_empty() {
        let summary = summarize(std::iter::empty::<&RowVerdict>());
        assert_eq!(summary.total_rows, 0);
        assert_eq!(summary.valid_rows + summary.invalid_rows, 0);
        assert_eq!(summary.invalid_rate, 0.0);
        assert!(summary.rule_failure_rates.values().all(|r| *r == 0.0));
    }
}
