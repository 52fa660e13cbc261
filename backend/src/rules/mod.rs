//! Row validation rules.
//!
//! Three independent rules run on every data row:
//!
//! | Rule | Addressing | Fails when |
//! |------|------------|------------|
//! | [`mandatory`] | fixed positions (B–J, N, R–W) | any required cell is blank |
//! | [`structured_code`] | header `Fert./Prüfhinweis` | not five known `/` segments |
//! | [`measurement`] | headers `Länge`, `Breite`, `Höhe`, `Gewicht` | dimensions implausible |
//!
//! [`classifier`] combines them into a [`crate::models::RowVerdict`] and keeps
//! the run counters. Everything here is synchronous and side-effect free.
//!
//! # Example
//!
//! ```
//! use clickcheck::models::{HeaderMap, Row};
//! use clickcheck::rules::{evaluate_row, RuleConfig};
//!
//! let config = RuleConfig::default();
//! let headers = vec!["Fert./Prüfhinweis".to_string()];
//! let map = HeaderMap::resolve(&headers, config.fields().needles());
//!
//! let verdict = evaluate_row(&Row::new(4, vec!["OHNE/N/N/N".into()]), &map, &config);
//! assert!(!verdict.is_valid());
//! ```

pub mod classifier;
pub mod config;
pub mod mandatory;
pub mod measurement;
pub mod normalize;
pub mod structured_code;

pub use classifier::{evaluate_row, summarize, Classifier, RunAggregator};
pub use config::{FieldNames, RuleConfig, RuleSettings, RULES_ENV};
pub use mandatory::check_mandatory_fields;
pub use measurement::{check_measurement, MeasurementInput};
pub use normalize::{number_or_zero, parse_number, TextMeasurementMatcher};
pub use structured_code::{check_structured_code, SEGMENT_COUNT};
