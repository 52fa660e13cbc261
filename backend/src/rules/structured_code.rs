//! Structured-code rule ("Fert./Prüfhinweis").
//!
//! The code is five `/`-separated segments, each drawn from its own
//! enumeration, e.g. `OHNE/N/N/N/N` or `2/3.1/CL2/J/A+`. Segments are
//! trimmed and then matched exactly (case-sensitive).

use std::collections::BTreeSet;

use crate::models::{InvalidSegment, RuleFailure, RuleName, RuleVerdict};

pub const SEGMENT_COUNT: usize = 5;
pub const SEGMENT_SEPARATOR: char = '/';

/// Check a structured code value. `None` means the cell is absent or blank.
pub fn check_structured_code(
    value: Option<&str>,
    allowed: &[BTreeSet<String>; SEGMENT_COUNT],
) -> RuleVerdict {
    let Some(value) = value else {
        return RuleVerdict::fail(RuleName::StructuredCode, RuleFailure::MissingValue);
    };

    let segments: Vec<&str> = value.split(SEGMENT_SEPARATOR).map(str::trim).collect();
    if segments.len() != SEGMENT_COUNT {
        return RuleVerdict::fail(
            RuleName::StructuredCode,
            RuleFailure::WrongSegmentCount {
                expected: SEGMENT_COUNT,
                found: segments.len(),
            },
        );
    }

    let invalid: Vec<InvalidSegment> = segments
        .iter()
        .zip(allowed.iter())
        .enumerate()
        .filter(|(_, (segment, set))| !set.contains(**segment))
        .map(|(idx, (segment, _))| InvalidSegment {
            segment: idx + 1,
            value: segment.to_string(),
        })
        .collect();

    if invalid.is_empty() {
        RuleVerdict::pass(RuleName::StructuredCode)
    } else {
        RuleVerdict::fail(
            RuleName::StructuredCode,
            RuleFailure::InvalidSegments { segments: invalid },
        )
    }
}
