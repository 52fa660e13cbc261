//! Mandatory-field rule.
//!
//! Required columns are addressed by position only: the supplier template
//! keeps their order stable while header texts vary.

use crate::models::{column_letter, HeaderMap, MissingColumn, Row, RuleFailure, RuleName, RuleVerdict};

/// Valid iff every position in `positions` holds a non-blank value.
///
/// On failure every missing position is reported, labelled with its column
/// letter and the header found there.
pub fn check_mandatory_fields(row: &Row, headers: &HeaderMap, positions: &[usize]) -> RuleVerdict {
    let missing: Vec<MissingColumn> = positions
        .iter()
        .filter(|&&pos| row.cell(pos).is_none())
        .map(|&pos| MissingColumn {
            position: pos,
            label: column_letter(pos),
            header: headers.header_at(pos).map(str::to_string),
        })
        .collect();

    if missing.is_empty() {
        RuleVerdict::pass(RuleName::MandatoryFields)
    } else {
        RuleVerdict::fail(RuleName::MandatoryFields, RuleFailure::MissingFields { missing })
    }
}
