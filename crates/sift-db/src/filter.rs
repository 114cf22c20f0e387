//! SQL WHERE clause generation for validated chunk filters.
//!
//! Values never appear in the SQL text; every value is a bound parameter.
//! The only thing interpolated is the taxonomy prefix length, which comes
//! from `Vec::len` and not from caller input.

use chrono::NaiveDate;

use sift_core::ValidatedFilters;

/// Type-safe parameter binding for generated clauses.
#[derive(Debug, Clone, PartialEq)]
pub enum QueryParam {
    /// Array of strings (`text[]`).
    StringArray(Vec<String>),
    /// Calendar date (`date`).
    Date(NaiveDate),
}

/// Builds the WHERE fragment for a chunk query.
///
/// ```rust,ignore
/// let builder = ChunkFilterQueryBuilder::new(&filters, 1);
/// let (sql, params) = builder.build();
/// // sql: "c.taxonomy_path[1:2] = $2::text[] AND lower(c.content_type) = ANY($3::text[])"
/// ```
pub struct ChunkFilterQueryBuilder<'a> {
    filters: &'a ValidatedFilters,
    param_offset: usize,
    table_alias: &'static str,
}

impl<'a> ChunkFilterQueryBuilder<'a> {
    /// `param_offset` is the number of parameters already in the query.
    pub fn new(filters: &'a ValidatedFilters, param_offset: usize) -> Self {
        Self {
            filters,
            param_offset,
            table_alias: "c",
        }
    }

    /// Override the chunk table alias (default `c`).
    pub fn with_alias(mut self, alias: &'static str) -> Self {
        self.table_alias = alias;
        self
    }

    /// Number of parameters [`build`](Self::build) will emit.
    pub fn param_count(&self) -> usize {
        self.build().1.len()
    }

    /// Returns the SQL fragment and its parameters in placeholder order.
    /// An empty filter yields `("TRUE", [])`.
    pub fn build(&self) -> (String, Vec<QueryParam>) {
        let alias = self.table_alias;
        let mut clauses = Vec::new();
        let mut params = Vec::new();
        let mut idx = self.param_offset;

        let path = self.filters.taxonomy_path();
        if !path.is_empty() {
            idx += 1;
            clauses.push(format!(
                "{alias}.taxonomy_path[1:{}] = ${idx}::text[]",
                path.len()
            ));
            params.push(QueryParam::StringArray(path.to_vec()));
        }

        let types = self.filters.content_types();
        if !types.is_empty() {
            idx += 1;
            clauses.push(format!("lower({alias}.content_type) = ANY(${idx}::text[])"));
            params.push(QueryParam::StringArray(types.iter().cloned().collect()));
        }

        if let Some(range) = self.filters.date_range() {
            if let Some(from) = range.from {
                idx += 1;
                clauses.push(format!("{alias}.published_on >= ${idx}::date"));
                params.push(QueryParam::Date(from));
            }
            if let Some(to) = range.to {
                idx += 1;
                clauses.push(format!("{alias}.published_on <= ${idx}::date"));
                params.push(QueryParam::Date(to));
            }
        }

        if clauses.is_empty() {
            ("TRUE".to_string(), params)
        } else {
            (clauses.join(" AND "), params)
        }
    }
}
