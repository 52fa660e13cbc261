//! Rule configuration.
//!
//! [`RuleSettings`] is the serialisable form (JSON rules file, defaults for
//! the manufacturer export). [`RuleConfig`] is the validated, immutable form
//! the evaluators run against. Conversion fails fast on contract violations
//! so that no row evaluation can hit a broken config.

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::path::Path;

use super::normalize::{TextMeasurementMatcher, DEFAULT_TEXT_MEASUREMENT_PATTERN};
use super::structured_code::SEGMENT_COUNT;
use crate::error::{ConfigError, ConfigResult};
use crate::models::LogicalField;

/// Environment variable naming a JSON rules file.
pub const RULES_ENV: &str = "CLICKCHECK_RULES";

/// Upper bound for a single dimension value. The unit is not documented by
/// the data supplier, hence configurable.
pub const DEFAULT_DIMENSION_UPPER_BOUND: f64 = 10_000.0;

/// Header names used to locate the header-addressed fields.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct FieldNames {
    pub length: String,
    pub width: String,
    pub height: String,
    pub material_text: String,
    pub weight: String,
    pub structured_code: String,
}

impl Default for FieldNames {
    fn default() -> Self {
        Self {
            length: "Länge".to_string(),
            width: "Breite".to_string(),
            height: "Höhe".to_string(),
            material_text: "Materialkurztext".to_string(),
            weight: "Gewicht".to_string(),
            structured_code: "Fert./Prüfhinweis".to_string(),
        }
    }
}

impl FieldNames {
    pub fn name(&self, field: LogicalField) -> &str {
        match field {
            LogicalField::Length => &self.length,
            LogicalField::Width => &self.width,
            LogicalField::Height => &self.height,
            LogicalField::MaterialText => &self.material_text,
            LogicalField::Weight => &self.weight,
            LogicalField::StructuredCode => &self.structured_code,
        }
    }

    /// `(field, header name)` pairs for [`crate::models::HeaderMap::resolve`].
    pub fn needles(&self) -> impl Iterator<Item = (LogicalField, &str)> {
        LogicalField::ALL.into_iter().map(move |f| (f, self.name(f)))
    }
}

/// Serialisable rule settings.
///
/// Every field has a default, so a rules file only needs the keys it changes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct RuleSettings {
    /// 0-based column offsets that must be filled.
    pub mandatory_positions: Vec<usize>,

    /// One allowed-value set per structured-code segment.
    pub structured_code_allowed_sets: Vec<Vec<String>>,

    pub dimension_upper_bound: f64,

    /// Regex detecting a measurement written into the material text.
    pub text_measurement_pattern: String,

    /// Reject non-positive weights when a weight column exists.
    pub check_weight: bool,

    pub fields: FieldNames,
}

impl Default for RuleSettings {
    fn default() -> Self {
        // B-J, N, R-W
        let mandatory_positions = (1..=9).chain([13]).chain(17..=22).collect();

        let sets: [&[&str]; SEGMENT_COUNT] = [
            &["OHNE", "1", "2", "3"],
            &["N", "3.2", "3.1", "2.2", "2.1"],
            &["N", "CL1", "CL2", "CL3"],
            &["N", "J"],
            &["N", "A1", "A2", "A3", "A5", "A+"],
        ];

        Self {
            mandatory_positions,
            structured_code_allowed_sets: sets
                .iter()
                .map(|set| set.iter().map(|v| v.to_string()).collect())
                .collect(),
            dimension_upper_bound: DEFAULT_DIMENSION_UPPER_BOUND,
            text_measurement_pattern: DEFAULT_TEXT_MEASUREMENT_PATTERN.to_string(),
            check_weight: true,
            fields: FieldNames::default(),
        }
    }
}

impl RuleSettings {
    /// Read settings from a JSON file.
    pub fn from_json_file(path: impl AsRef<Path>) -> ConfigResult<Self> {
        let content = std::fs::read_to_string(path.as_ref())?;
        Ok(serde_json::from_str(&content)?)
    }

    /// Settings from `path`, else from the file named by [`RULES_ENV`], else
    /// the defaults.
    pub fn load(path: Option<&Path>) -> ConfigResult<Self> {
        if let Some(p) = path {
            return Self::from_json_file(p);
        }
        match std::env::var(RULES_ENV) {
            Ok(p) if !p.trim().is_empty() => Self::from_json_file(p.trim()),
            _ => Ok(Self::default()),
        }
    }

    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }
}

/// Validated rule configuration.
#[derive(Debug, Clone)]
pub struct RuleConfig {
    mandatory_positions: Vec<usize>,
    allowed_sets: [BTreeSet<String>; SEGMENT_COUNT],
    dimension_upper_bound: f64,
    text_measurement: TextMeasurementMatcher,
    check_weight: bool,
    fields: FieldNames,
}

impl RuleConfig {
    pub fn new(settings: RuleSettings) -> ConfigResult<Self> {
        let RuleSettings {
            mandatory_positions,
            structured_code_allowed_sets,
            dimension_upper_bound,
            text_measurement_pattern,
            check_weight,
            fields,
        } = settings;

        let found = structured_code_allowed_sets.len();
        let sets: Vec<BTreeSet<String>> = structured_code_allowed_sets
            .into_iter()
            .map(|set| set.into_iter().map(|v| v.trim().to_string()).collect())
            .collect();
        let allowed_sets: [BTreeSet<String>; SEGMENT_COUNT] =
            sets.try_into().map_err(|_| ConfigError::SegmentSetCount {
                expected: SEGMENT_COUNT,
                found,
            })?;
        if let Some(idx) = allowed_sets.iter().position(BTreeSet::is_empty) {
            return Err(ConfigError::EmptySegmentSet { segment: idx + 1 });
        }

        if !dimension_upper_bound.is_finite() || dimension_upper_bound <= 0.0 {
            return Err(ConfigError::InvalidUpperBound(dimension_upper_bound));
        }

        let text_measurement = if text_measurement_pattern == DEFAULT_TEXT_MEASUREMENT_PATTERN {
            TextMeasurementMatcher::default()
        } else {
            TextMeasurementMatcher::new(&text_measurement_pattern)?
        };

        if let Some((field, _)) = fields.needles().find(|(_, name)| name.trim().is_empty()) {
            return Err(ConfigError::EmptyFieldName(field.key()));
        }

        let mut mandatory_positions = mandatory_positions;
        mandatory_positions.sort_unstable();
        mandatory_positions.dedup();

        Ok(Self {
            mandatory_positions,
            allowed_sets,
            dimension_upper_bound,
            text_measurement,
            check_weight,
            fields,
        })
    }

    /// Load and validate in one step, see [`RuleSettings::load`].
    pub fn load(path: Option<&Path>) -> ConfigResult<Self> {
        Self::new(RuleSettings::load(path)?)
    }

    /// Required positions, ascending and without duplicates.
    pub fn mandatory_positions(&self) -> &[usize] {
        &self.mandatory_positions
    }

    pub fn allowed_sets(&self) -> &[BTreeSet<String>; SEGMENT_COUNT] {
        &self.allowed_sets
    }

    pub fn dimension_upper_bound(&self) -> f64 {
        self.dimension_upper_bound
    }

    pub fn text_measurement(&self) -> &TextMeasurementMatcher {
        &self.text_measurement
    }

    pub fn check_weight(&self) -> bool {
        self.check_weight
    }

    pub fn fields(&self) -> &FieldNames {
        &self.fields
    }
}

impl TryFrom<RuleSettings> for RuleConfig {
    type Error = ConfigError;

    fn try_from(settings: RuleSettings) -> ConfigResult<Self> {
        Self::new(settings)
    }
}

impl Default for RuleConfig {
    fn default() -> Self {
        Self::new(RuleSettings::default()).expect("Invalid built-in rule settings")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_default_positions() {
        let config = RuleConfig::default();
        assert_eq!(
            config.mandatory_positions(),
            &[1, 2, 3, 4, 5, 6, 7, 8, 9, 13, 17, 18, 19, 20, 21, 22]
        );
        assert_eq!(config.dimension_upper_bound(), 10_000.0);
        assert!(config.check_weight());
    }

    #[test]
    fn test_default_allowed_sets() {
        let config = RuleConfig::default();
        let sets = config.allowed_sets();
        assert!(sets[0].contains("OHNE"));
        assert!(sets[1].contains("3.1"));
        assert!(sets[2].contains("CL2"));
        assert!(sets[3].contains("J"));
        assert!(sets[4].contains("A+"));
        assert!(!sets[0].contains("N"));
    }

    #[test]
    fn test_wrong_set_count_fails_fast() {
        let mut settings = RuleSettings::default();
        settings.structured_code_allowed_sets.pop();
        let err = RuleConfig::new(settings).unwrap_err();
        assert!(matches!(
            err,
            ConfigError::SegmentSetCount { expected: 5, found: 4 }
        ));
    }

    #[test]
    fn test_empty_set_fails_fast() {
        let mut settings = RuleSettings::default();
        settings.structured_code_allowed_sets[2].clear();
        let err = RuleConfig::new(settings).unwrap_err();
        assert!(matches!(err, ConfigError::EmptySegmentSet { segment: 3 }));
    }

    #[test]
    fn test_invalid_bound_and_pattern() {
        let settings = RuleSettings {
            dimension_upper_bound: -1.0,
            ..Default::default()
        };
        assert!(matches!(
            RuleConfig::new(settings),
            Err(ConfigError::InvalidUpperBound(_))
        ));

        let settings = RuleSettings {
            text_measurement_pattern: "[".to_string(),
            ..Default::default()
        };
        assert!(matches!(
            RuleConfig::new(settings),
            Err(ConfigError::InvalidPattern { .. })
        ));
    }

    #[test]
    fn test_blank_field_name_rejected() {
        let mut settings = RuleSettings::default();
        settings.fields.weight = "  ".to_string();
        let err = RuleConfig::new(settings).unwrap_err();
        assert!(matches!(err, ConfigError::EmptyFieldName("weight")));
    }

    #[test]
    fn test_positions_sorted_and_deduped() {
        let settings = RuleSettings {
            mandatory_positions: vec![5, 1, 5, 3],
            ..Default::default()
        };
        let config = RuleConfig::new(settings).unwrap();
        assert_eq!(config.mandatory_positions(), &[1, 3, 5]);
    }

    #[test]
    fn test_partial_rules_file() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("rules.json");
        std::fs::write(&path, r#"{ "dimensionUpperBound": 500, "checkWeight": false }"#).unwrap();

        let config = RuleConfig::load(Some(path.as_path())).unwrap();
        assert_eq!(config.dimension_upper_bound(), 500.0);
        assert!(!config.check_weight());
        // Untouched keys keep their defaults
        assert_eq!(config.fields().length, "Länge");
        assert_eq!(config.mandatory_positions().len(), 16);
    }

    #[test]
    fn test_settings_json_roundtrip_keys() {
        let json = RuleSettings::default().to_json().unwrap();
        assert!(json.contains("mandatoryPositions"));
        assert!(json.contains("structuredCodeAllowedSets"));
        assert!(json.contains("Fert./Prüfhinweis"));
    }
}
