//! Value normalizers.
//!
//! Pure functions that turn raw cell text into canonical forms. None of them
//! fail: unusable input becomes `None` (or `0` via [`number_or_zero`]).

use once_cell::sync::Lazy;
use regex::Regex;

use crate::error::{ConfigError, ConfigResult};

/// Two 1-4 digit numbers separated by 1-3 of: whitespace, `×`, `x`, `X`, `*`, `/`.
/// Matches material texts such as `Karton 12x34`, `12 × 34`, `12*34`, `12/34`.
pub const DEFAULT_TEXT_MEASUREMENT_PATTERN: &str = r"\d{1,4}[\s×xX*/]{1,3}\d{1,4}";

static DEFAULT_TEXT_MEASUREMENT: Lazy<Regex> = Lazy::new(|| {
    Regex::new(DEFAULT_TEXT_MEASUREMENT_PATTERN).expect("Invalid built-in measurement pattern")
});

/// Trim, collapse inner whitespace runs and lowercase.
///
/// Used for header matching and for lookup comparisons.
pub fn fold_case(raw: &str) -> String {
    raw.split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_lowercase()
}

/// Parse a number written with either `.` or `,` as decimal separator.
///
/// When both appear, the one occurring last is the decimal separator and the
/// other is a thousands separator (`1.234,5` and `1,234.5` both give 1234.5).
/// Non-finite results (`inf`, `NaN`) are rejected.
///
/// # Example
/// ```
/// use clickcheck::rules::normalize::parse_number;
///
/// assert_eq!(parse_number("12,5"), Some(12.5));
/// assert_eq!(parse_number(" 7 "), Some(7.0));
/// assert_eq!(parse_number("n/a"), None);
/// ```
pub fn parse_number(raw: &str) -> Option<f64> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return None;
    }

    let normalized = match (trimmed.rfind(','), trimmed.rfind('.')) {
        (Some(comma), Some(dot)) if comma > dot => trimmed.replace('.', "").replace(',', "."),
        (Some(_), Some(_)) => trimmed.replace(',', ""),
        (Some(_), None) => trimmed.replace(',', "."),
        _ => trimmed.to_string(),
    };

    normalized.parse::<f64>().ok().filter(|n| n.is_finite())
}

/// Absent or unparseable values count as `0`.
pub fn number_or_zero(raw: Option<&str>) -> f64 {
    raw.and_then(parse_number).unwrap_or(0.0)
}

/// Detects a measurement written into free text.
#[derive(Debug, Clone)]
pub struct TextMeasurementMatcher {
    regex: Regex,
}

impl TextMeasurementMatcher {
    /// Compile a custom pattern.
    pub fn new(pattern: &str) -> ConfigResult<Self> {
        let regex = Regex::new(pattern).map_err(|e| ConfigError::InvalidPattern {
            pattern: pattern.to_string(),
            message: e.to_string(),
        })?;
        Ok(Self { regex })
    }

    pub fn is_match(&self, text: &str) -> bool {
        self.regex.is_match(text)
    }
}

impl Default for TextMeasurementMatcher {
    fn default() -> Self {
        Self {
            regex: DEFAULT_TEXT_MEASUREMENT.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_number_separators() {
        assert_eq!(parse_number("10"), Some(10.0));
        assert_eq!(parse_number("10.5"), Some(10.5));
        assert_eq!(parse_number("10,5"), Some(10.5));
        assert_eq!(parse_number("1.234,5"), Some(1234.5));
        assert_eq!(parse_number("1,234.5"), Some(1234.5));
        assert_eq!(parse_number("-3"), Some(-3.0));
    }

    #[test]
    fn test_parse_number_rejects_garbage() {
        assert_eq!(parse_number(""), None);
        assert_eq!(parse_number("   "), None);
        assert_eq!(parse_number("abc"), None);
        assert_eq!(parse_number("12 cm"), None);
        assert_eq!(parse_number("inf"), None);
        assert_eq!(parse_number("NaN"), None);
    }

    #[test]
    fn test_number_or_zero() {
        assert_eq!(number_or_zero(None), 0.0);
        assert_eq!(number_or_zero(Some("x")), 0.0);
        assert_eq!(number_or_zero(Some("2,5")), 2.5);
    }

    #[test]
    fn test_fold_case() {
        assert_eq!(fold_case("  Fert./Prüfhinweis "), "fert./prüfhinweis");
        assert_eq!(fold_case("HÖHE\t in  mm"), "höhe in mm");
    }

    #[test]
    fn test_default_text_measurement() {
        let m = TextMeasurementMatcher::default();
        assert!(m.is_match("12x34"));
        assert!(m.is_match("Karton 12 X 34"));
        assert!(m.is_match("12×34"));
        assert!(m.is_match("12*34"));
        assert!(m.is_match("12/34"));
        assert!(m.is_match("Rohr 100 x 20 mm"));
        assert!(!m.is_match("Karton"));
        assert!(!m.is_match("no numbers here"));
        assert!(!m.is_match("12-34"));
        // Separator run longer than three characters
        assert!(!m.is_match("12    34"));
        assert!(m.is_match("Platte 20x30 blau"));
    }

    #[test]
    fn test_custom_pattern() {
        let m = TextMeasurementMatcher::new(r"\d+-\d+").unwrap();
        assert!(m.is_match("12-34"));
        assert!(!m.is_match("12x34"));
    }

    #[test]
    fn test_invalid_pattern() {
        let err = TextMeasurementMatcher::new("(").unwrap_err();
        assert!(matches!(err, ConfigError::InvalidPattern { .. }));
    }
}
