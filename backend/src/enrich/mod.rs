//! Lookup enrichment.
//!
//! Compares a value stored in the sheet against the value an external item
//! source reports for the same key (typically an article number). The source
//! is abstracted behind [`ItemLookup`]; [`StaticLookup`] is the in-memory
//! implementation loaded from a JSON object.

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::path::Path;

use crate::error::{EnrichError, EnrichResult};
use crate::parser::Sheet;
use crate::rules::normalize::{fold_case, parse_number};

/// Resolves an item key to the value the source holds for it.
pub trait ItemLookup {
    fn lookup(&self, key: &str) -> Option<String>;
}

/// In-memory lookup table. Keys are matched after [`fold_case`].
#[derive(Debug, Clone, Default)]
pub struct StaticLookup {
    entries: HashMap<String, String>,
}

impl StaticLookup {
    pub fn new<I, K, V>(entries: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: Into<String>,
    {
        Self {
            entries: entries
                .into_iter()
                .map(|(k, v)| (fold_case(k.as_ref()), v.into()))
                .collect(),
        }
    }

    /// Parse a flat JSON object. Numbers and booleans are kept as text.
    pub fn from_json_str(json: &str) -> EnrichResult<Self> {
        let raw: BTreeMap<String, serde_json::Value> = serde_json::from_str(json)?;
        Ok(Self::new(raw.into_iter().filter_map(|(k, v)| {
            let text = match v {
                serde_json::Value::String(s) => s,
                serde_json::Value::Null => return None,
                other => other.to_string(),
            };
            Some((k, text))
        })))
    }

    pub fn from_json_file(path: impl AsRef<Path>) -> EnrichResult<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_json_str(&content)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl ItemLookup for StaticLookup {
    fn lookup(&self, key: &str) -> Option<String> {
        self.entries.get(&fold_case(key)).cloned()
    }
}

/// Outcome of comparing a stored value with the looked-up one.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "camelCase")]
pub enum Agreement {
    Match,
    Mismatch { stored: String, found: String },
    /// The source has no entry for the key.
    NotFound,
    /// The row has no key to look up.
    MissingKey,
    /// The source has a value but the row does not.
    MissingStored,
}

impl Agreement {
    pub fn is_match(&self) -> bool {
        matches!(self, Agreement::Match)
    }
}

fn same_value(a: &str, b: &str) -> bool {
    match (parse_number(a), parse_number(b)) {
        (Some(x), Some(y)) => x == y,
        _ => fold_case(a) == fold_case(b),
    }
}

/// Compare a stored value with a looked-up value.
///
/// Whitespace runs and case are ignored; two numeric values compare by value,
/// so `12,50` matches `12.5`. A missing lookup result is
/// [`Agreement::NotFound`].
pub fn compare(stored: Option<&str>, looked_up: Option<&str>) -> Agreement {
    let stored = stored.map(str::trim).filter(|s| !s.is_empty());
    match (stored, looked_up) {
        (_, None) => Agreement::NotFound,
        (None, Some(_)) => Agreement::MissingStored,
        (Some(s), Some(f)) if same_value(s, f) => Agreement::Match,
        (Some(s), Some(f)) => Agreement::Mismatch {
            stored: s.to_string(),
            found: f.trim().to_string(),
        },
    }
}

/// One row of an enrichment run.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EnrichedRow {
    pub row_index: usize,
    pub key: Option<String>,
    pub stored: Option<String>,
    pub found: Option<String>,
    pub agreement: Agreement,
}

/// Per-outcome totals of an enrichment run.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AgreementCounts {
    pub total: usize,
    pub matched: usize,
    pub mismatched: usize,
    pub not_found: usize,
    pub missing_key: usize,
    pub missing_stored: usize,
}

impl AgreementCounts {
    pub fn from_rows(rows: &[EnrichedRow]) -> Self {
        let mut counts = Self {
            total: rows.len(),
            ..Self::default()
        };
        for row in rows {
            match row.agreement {
                Agreement::Match => counts.matched += 1,
                Agreement::Mismatch { .. } => counts.mismatched += 1,
                Agreement::NotFound => counts.not_found += 1,
                Agreement::MissingKey => counts.missing_key += 1,
                Agreement::MissingStored => counts.missing_stored += 1,
            }
        }
        counts
    }
}

/// Find a column by header: exact (case-folded) match first, then the first
/// header containing the name.
pub fn find_column(headers: &[String], name: &str) -> EnrichResult<usize> {
    let needle = fold_case(name);
    if needle.is_empty() {
        return Err(EnrichError::UnknownColumn(name.to_string()));
    }
    let folded: Vec<String> = headers.iter().map(|h| fold_case(h)).collect();
    folded
        .iter()
        .position(|h| *h == needle)
        .or_else(|| folded.iter().position(|h| h.contains(&needle)))
        .ok_or_else(|| EnrichError::UnknownColumn(name.to_string()))
}

/// Look up every row's key and compare the result with the row's stored value.
pub fn enrich_sheet<L: ItemLookup + ?Sized>(
    sheet: &Sheet,
    key_column: &str,
    value_column: &str,
    lookup: &L,
) -> EnrichResult<Vec<EnrichedRow>> {
    let key_pos = find_column(&sheet.headers, key_column)?;
    let value_pos = find_column(&sheet.headers, value_column)?;

    Ok(sheet
        .rows
        .iter()
        .map(|row| {
            let key = row.cell(key_pos).map(str::to_string);
            let stored = row.cell(value_pos).map(str::to_string);
            let (found, agreement) = match &key {
                None => (None, Agreement::MissingKey),
                Some(k) => {
                    let found = lookup.lookup(k);
                    let agreement = compare(stored.as_deref(), found.as_deref());
                    (found, agreement)
                }
            };
            EnrichedRow {
                row_index: row.index,
                key,
                stored,
                found,
                agreement,
            }
        })
        .collect())
}
