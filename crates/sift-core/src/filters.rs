//! Search filters and the filter validator.
//!
//! [`SearchFilters`] is exactly what a caller sent. [`ValidatedFilters`] can
//! only be produced by [`FilterValidator::validate`], and it is the only filter
//! type the store traits accept, so unvalidated input cannot reach query
//! construction.
//!
//! # Rules
//!
//! - Taxonomy segments must match `^[A-Za-z0-9_\- ]+$` after trimming.
//! - Content types must belong to the validator's allow-list (case-insensitive).
//! - Dates are `YYYY-MM-DD`; either bound may be omitted; `from <= to`.

use std::collections::BTreeSet;

use chrono::NaiveDate;
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::defaults;
use crate::error::ValidationError;

static TAXONOMY_SEGMENT: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[A-Za-z0-9_\- ]+$").expect("taxonomy segment pattern is valid"));

static DATE_SHAPE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^\d{4}-\d{2}-\d{2}$").expect("date shape pattern is valid"));

const DATE_FORMAT: &str = "%Y-%m-%d";

/// Filters as supplied by the caller. Untrusted.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchFilters {
    /// Taxonomy path prefix, root first (e.g. `["Engineering", "Databases"]`)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub taxonomy_path: Option<Vec<String>>,
    /// Content types to include
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content_types: Option<Vec<String>>,
    /// Inclusive lower bound on publication date (`YYYY-MM-DD`)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub date_from: Option<String>,
    /// Inclusive upper bound on publication date (`YYYY-MM-DD`)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub date_to: Option<String>,
}

/// Inclusive publication date range; an absent bound is open.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub struct DateRange {
    pub from: Option<NaiveDate>,
    pub to: Option<NaiveDate>,
}

/// Filters that passed validation.
///
/// Serialization is canonical: segment order is preserved, content types are
/// lowercased and sorted, dates render as `YYYY-MM-DD`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize)]
pub struct ValidatedFilters {
    taxonomy_path: Vec<String>,
    content_types: BTreeSet<String>,
    date_range: Option<DateRange>,
}

impl ValidatedFilters {
    /// Filters that match everything.
    pub fn none() -> Self {
        Self::default()
    }

    pub fn taxonomy_path(&self) -> &[String] {
        &self.taxonomy_path
    }

    pub fn content_types(&self) -> &BTreeSet<String> {
        &self.content_types
    }

    pub fn date_range(&self) -> Option<DateRange> {
        self.date_range
    }

    pub fn is_empty(&self) -> bool {
        self.taxonomy_path.is_empty() && self.content_types.is_empty() && self.date_range.is_none()
    }

    /// Whether a chunk's taxonomy path falls under the filter's prefix.
    pub fn matches_taxonomy(&self, path: &[String]) -> bool {
        path.len() >= self.taxonomy_path.len()
            && self
                .taxonomy_path
                .iter()
                .zip(path)
                .all(|(want, have)| want == have)
    }

    /// Whether a chunk's content type passes the filter.
    pub fn matches_content_type(&self, content_type: &str) -> bool {
        self.content_types.is_empty()
            || self
                .content_types
                .contains(&content_type.trim().to_lowercase())
    }

    /// Whether a publication date passes the filter. Undated chunks only pass
    /// when no range is set.
    pub fn matches_date(&self, date: Option<NaiveDate>) -> bool {
        let Some(range) = self.date_range else {
            return true;
        };
        let Some(date) = date else {
            return false;
        };
        range.from.map_or(true, |from| date >= from) && range.to.map_or(true, |to| date <= to)
    }
}

/// Whitelists caller-supplied filter values.
#[derive(Debug, Clone)]
pub struct FilterValidator {
    allowed_content_types: BTreeSet<String>,
    max_taxonomy_depth: usize,
    max_content_types: usize,
}

impl Default for FilterValidator {
    fn default() -> Self {
        Self::new(defaults::ALLOWED_CONTENT_TYPES.iter().copied())
    }
}

impl FilterValidator {
    /// Create a validator with a custom content-type allow-list.
    pub fn new<I, S>(allowed_content_types: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Self {
            allowed_content_types: allowed_content_types
                .into_iter()
                .map(|t| t.as_ref().trim().to_lowercase())
                .filter(|t| !t.is_empty())
                .collect(),
            max_taxonomy_depth: defaults::MAX_TAXONOMY_DEPTH,
            max_content_types: defaults::MAX_CONTENT_TYPES,
        }
    }

    pub fn allowed_content_types(&self) -> &BTreeSet<String> {
        &self.allowed_content_types
    }

    /// Validate and canonicalize caller filters.
    pub fn validate(&self, filters: &SearchFilters) -> Result<ValidatedFilters, ValidationError> {
        let taxonomy_path = match &filters.taxonomy_path {
            Some(path) => self.validate_taxonomy(path)?,
            None => Vec::new(),
        };

        let content_types = match &filters.content_types {
            Some(types) => self.validate_content_types(types)?,
            None => BTreeSet::new(),
        };

        let date_range =
            validate_date_range(filters.date_from.as_deref(), filters.date_to.as_deref())?;

        debug!(
            subsystem = "search",
            component = "filter_validator",
            taxonomy_depth = taxonomy_path.len(),
            content_type_count = content_types.len(),
            has_date_range = date_range.is_some(),
            "Filters validated"
        );

        Ok(ValidatedFilters {
            taxonomy_path,
            content_types,
            date_range,
        })
    }

    fn validate_taxonomy(&self, path: &[String]) -> Result<Vec<String>, ValidationError> {
        if path.len() > self.max_taxonomy_depth {
            return Err(ValidationError::TaxonomyPathTooLong {
                len: path.len(),
                max: self.max_taxonomy_depth,
            });
        }

        path.iter()
            .map(|segment| {
                let trimmed = segment.trim();
                if TAXONOMY_SEGMENT.is_match(trimmed) {
                    Ok(trimmed.to_string())
                } else {
                    Err(ValidationError::InvalidTaxonomySegment {
                        segment: segment.clone(),
                    })
                }
            })
            .collect()
    }

    fn validate_content_types(&self, types: &[String]) -> Result<BTreeSet<String>, ValidationError> {
        if types.len() > self.max_content_types {
            return Err(ValidationError::TooManyContentTypes {
                len: types.len(),
                max: self.max_content_types,
            });
        }

        types
            .iter()
            .map(|t| {
                let normalized = t.trim().to_lowercase();
                if self.allowed_content_types.contains(&normalized) {
                    Ok(normalized)
                } else {
                    Err(ValidationError::UnknownContentType(t.clone()))
                }
            })
            .collect()
    }
}

/// Zero-padded `YYYY-MM-DD` only; chrono alone also takes `2024-1-5`.
fn parse_date(field: &str, raw: &str) -> Result<NaiveDate, ValidationError> {
    let trimmed = raw.trim();
    let invalid =
        || ValidationError::InvalidDateRange(format!("{field} {raw:?} is not a YYYY-MM-DD date"));
    if !DATE_SHAPE.is_match(trimmed) {
        return Err(invalid());
    }
    NaiveDate::parse_from_str(trimmed, DATE_FORMAT).map_err(|_| invalid())
}

fn validate_date_range(
    from: Option<&str>,
    to: Option<&str>,
) -> Result<Option<DateRange>, ValidationError> {
    let from = from.map(|raw| parse_date("date_from", raw)).transpose()?;
    let to = to.map(|raw| parse_date("date_to", raw)).transpose()?;

    if let (Some(f), Some(t)) = (from, to) {
        if f > t {
            return Err(ValidationError::InvalidDateRange(format!(
                "date_from {f} is after date_to {t}"
            )));
        }
    }

    if from.is_none() && to.is_none() {
        return Ok(None);
    }
    Ok(Some(DateRange { from, to }))
}
