//! Measurement plausibility rule.
//!
//! Checks length/width/height and, when present, the weight. A row whose
//! three dimensions are all zero is still accepted if its material short
//! text carries a measurement such as `12x34`.

use crate::models::{HeaderMap, LogicalField, MeasurementIssue, Row, RuleFailure, RuleName, RuleVerdict};
use crate::rules::normalize::number_or_zero;
use crate::rules::RuleConfig;

/// Raw measurement cells of one row, blank cells as `None`.
#[derive(Debug, Clone, Copy, Default)]
pub struct MeasurementInput<'a> {
    pub length: Option<&'a str>,
    pub width: Option<&'a str>,
    pub height: Option<&'a str>,
    pub material_text: Option<&'a str>,
    pub weight: Option<&'a str>,
}

impl<'a> MeasurementInput<'a> {
    pub fn from_row(row: &'a Row, headers: &HeaderMap) -> Self {
        Self {
            length: row.field(headers, LogicalField::Length),
            width: row.field(headers, LogicalField::Width),
            height: row.field(headers, LogicalField::Height),
            material_text: row.field(headers, LogicalField::MaterialText),
            weight: row.field(headers, LogicalField::Weight),
        }
    }

    /// Evaluate the dimension checks, then the weight check. Both findings
    /// are collected; neither masks the other.
    pub fn evaluate(&self, config: &RuleConfig) -> RuleVerdict {
        let mut issues = Vec::new();

        if let Some(issue) = self.dimension_issue(config) {
            issues.push(issue);
        }
        if config.check_weight() {
            if let Some(raw) = self.weight {
                let value = number_or_zero(Some(raw));
                if value <= 0.0 {
                    issues.push(MeasurementIssue::NonPositiveWeight { value });
                }
            }
        }

        if issues.is_empty() {
            RuleVerdict::pass(RuleName::Measurement)
        } else {
            RuleVerdict::fail(
                RuleName::Measurement,
                RuleFailure::ImplausibleMeasurement { issues },
            )
        }
    }

    fn dimensions(&self) -> [(LogicalField, f64); 3] {
        [
            (LogicalField::Length, number_or_zero(self.length)),
            (LogicalField::Width, number_or_zero(self.width)),
            (LogicalField::Height, number_or_zero(self.height)),
        ]
    }

    /// Negative beats everything, including a textual fallback; the upper
    /// bound only applies when nothing else was raised.
    fn dimension_issue(&self, config: &RuleConfig) -> Option<MeasurementIssue> {
        let dims = self.dimensions();

        let negative: Vec<LogicalField> = dims
            .iter()
            .filter(|(_, v)| *v < 0.0)
            .map(|(f, _)| *f)
            .collect();
        if !negative.is_empty() {
            return Some(MeasurementIssue::NegativeDimension { fields: negative });
        }

        if dims.iter().all(|(_, v)| *v == 0.0) {
            let has_text = self
                .material_text
                .is_some_and(|t| config.text_measurement().is_match(t));
            return if has_text {
                None
            } else {
                Some(MeasurementIssue::AllDimensionsZero)
            };
        }

        let bound = config.dimension_upper_bound();
        let oversized: Vec<LogicalField> = dims
            .iter()
            .filter(|(_, v)| *v > bound)
            .map(|(f, _)| *f)
            .collect();
        if !oversized.is_empty() {
            return Some(MeasurementIssue::ExceedsMaximum {
                fields: oversized,
                bound,
            });
        }

        None
    }
}

/// Measurement rule for one row.
pub fn check_measurement(row: &Row, headers: &HeaderMap, config: &RuleConfig) -> RuleVerdict {
    MeasurementInput::from_row(row, headers).evaluate(config)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rules::RuleSettings;

    fn dims<'a>(l: &'a str, w: &'a str, h: &'a str, text: &'a str) -> MeasurementInput<'a> {
        let opt = |s: &'a str| if s.trim().is_empty() { None } else { Some(s) };
        MeasurementInput {
            length: opt(l),
            width: opt(w),
            height: opt(h),
            material_text: opt(text),
            weight: None,
        }
    }

    fn issues(verdict: &RuleVerdict) -> Vec<MeasurementIssue> {
        match verdict.failure() {
            Some(RuleFailure::ImplausibleMeasurement { issues }) => issues.clone(),
            None => vec![],
            other => panic!("unexpected failure: {:?}", other),
        }
    }

    #[test]
    fn test_regular_dimensions_valid() {
        let config = RuleConfig::default();
        assert!(dims("10", "10", "10", "").evaluate(&config).is_valid());
        assert!(dims("10,5", "0", "0", "").evaluate(&config).is_valid());
    }

    #[test]
    fn test_all_zero_with_text_measurement() {
        let config = RuleConfig::default();
        assert!(dims("0", "0", "0", "12x34").evaluate(&config).is_valid());
        assert!(dims("", "", "", "Karton 40 X 60").evaluate(&config).is_valid());
    }

    #[test]
    fn test_all_zero_without_text_measurement() {
        let config = RuleConfig::default();
        let verdict = dims("0", "0", "0", "no numbers here").evaluate(&config);
        assert!(!verdict.is_valid());
        assert_eq!(issues(&verdict), vec![MeasurementIssue::AllDimensionsZero]);
        assert!(verdict.reason().unwrap().contains("no textual measurement"));
    }

    #[test]
    fn test_unparseable_counts_as_zero() {
        let config = RuleConfig::default();
        let verdict = dims("abc", "", "n/a", "Karton").evaluate(&config);
        assert_eq!(issues(&verdict), vec![MeasurementIssue::AllDimensionsZero]);
    }

    #[test]
    fn test_negative_dimension_despite_text() {
        let config = RuleConfig::default();
        let verdict = dims("-1", "5", "5", "12x34").evaluate(&config);
        assert!(!verdict.is_valid());
        assert_eq!(
            issues(&verdict),
            vec![MeasurementIssue::NegativeDimension {
                fields: vec![LogicalField::Length]
            }]
        );
        assert!(verdict.reason().unwrap().starts_with("negative dimension"));
    }

    #[test]
    fn test_exceeds_upper_bound() {
        let config = RuleConfig::default();
        let verdict = dims("20000", "5", "5", "").evaluate(&config);
        assert!(!verdict.is_valid());
        assert!(verdict
            .reason()
            .unwrap()
            .contains("exceeds plausible maximum"));
        // Exactly the bound is still plausible
        assert!(dims("10000", "5", "5", "").evaluate(&config).is_valid());
    }

    #[test]
    fn test_configurable_upper_bound() {
        let config = RuleConfig::new(RuleSettings {
            dimension_upper_bound: 100.0,
            ..Default::default()
        })
        .unwrap();
        let verdict = dims("50", "150", "150", "").evaluate(&config);
        assert_eq!(
            issues(&verdict),
            vec![MeasurementIssue::ExceedsMaximum {
                fields: vec![LogicalField::Width, LogicalField::Height],
                bound: 100.0,
            }]
        );
    }

    #[test]
    fn test_non_positive_weight_independent() {
        let config = RuleConfig::default();

        let mut input = dims("10", "10", "10", "");
        input.weight = Some("0");
        let verdict = input.evaluate(&config);
        assert_eq!(
            issues(&verdict),
            vec![MeasurementIssue::NonPositiveWeight { value: 0.0 }]
        );

        let mut input = dims("-1", "10", "10", "");
        input.weight = Some("-3");
        let found = issues(&input.evaluate(&config));
        assert_eq!(found.len(), 2);
        assert_eq!(found[1], MeasurementIssue::NonPositiveWeight { value: -3.0 });

        let mut input = dims("10", "10", "10", "");
        input.weight = Some("0,2");
        assert!(input.evaluate(&config).is_valid());
    }

    #[test]
    fn test_weight_check_disabled() {
        let config = RuleConfig::new(RuleSettings {
            check_weight: false,
            ..Default::default()
        })
        .unwrap();
        let mut input = dims("10", "10", "10", "");
        input.weight = Some("0");
        assert!(input.evaluate(&config).is_valid());
    }

    #[test]
    fn test_from_row_uses_header_map() {
        let headers: Vec<String> = ["Länge", "Breite", "Höhe", "Materialkurztext", "Gewicht"]
            .iter()
            .map(|s| s.to_string())
            .collect();
        let config = RuleConfig::default();
        let map = HeaderMap::resolve(&headers, config.fields().needles());
        let row = Row::new(
            5,
            vec!["0".into(), "0".into(), "0".into(), "Karton".into(), "1.5".into()],
        );
        let verdict = check_measurement(&row, &map, &config);
        assert_eq!(issues(&verdict), vec![MeasurementIssue::AllDimensionsZero]);
    }
}
