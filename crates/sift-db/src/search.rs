//! Lexical retrieval over chunk text using PostgreSQL full-text search.
//!
//! `ts_rank_cd` with normalization flag 32 (`rank / (rank + 1)`) stands in for
//! BM25: it rewards term frequency and proximity and saturates like BM25 does.
//! Query parsing goes through `websearch_to_tsquery`, so quoted phrases, `or`
//! and `-term` behave the way users expect from a web search box.

use std::time::Instant;

use async_trait::async_trait;
use sqlx::{Pool, Postgres};
use tracing::{debug, trace};

use sift_core::{Error, LexicalStore, Result, RetrievalCandidate, ValidatedFilters};

use crate::bind_filter_params;
use crate::filter::ChunkFilterQueryBuilder;
use crate::row_to_candidate;

/// Text search configuration used for both the stored `tsv` column and queries.
pub const TEXT_SEARCH_CONFIG: &str = "english";

/// Lexical store backed by the `chunk.tsv` column.
pub struct PgLexicalSearch {
    pool: Pool<Postgres>,
}

impl PgLexicalSearch {
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self { pool }
    }

    /// Build the ranked lexical query. `$1` is the query text, filter
    /// parameters follow, the limit is last.
    pub(crate) fn build_sql(filters: &ValidatedFilters) -> (String, Vec<crate::QueryParam>) {
        let (filter_clause, params) = ChunkFilterQueryBuilder::new(filters, 1).build();
        let limit_idx = params.len() + 2;
        let sql = format!(
            r#"
            SELECT c.chunk_id,
                   c.text,
                   c.document_title,
                   c.source_url,
                   c.taxonomy_path,
                   ts_rank_cd(c.tsv, websearch_to_tsquery('{cfg}', $1), 32) AS score
            FROM chunk c
            WHERE c.tsv @@ websearch_to_tsquery('{cfg}', $1)
              AND {filter_clause}
            ORDER BY score DESC, c.chunk_id ASC
            LIMIT ${limit_idx}
            "#,
            cfg = TEXT_SEARCH_CONFIG,
        );
        (sql, params)
    }
}

#[async_trait]
impl LexicalStore for PgLexicalSearch {
    async fn search_lexical(
        &self,
        query: &str,
        filters: &ValidatedFilters,
        limit: usize,
    ) -> Result<Vec<RetrievalCandidate>> {
        let start = Instant::now();
        let (sql, params) = Self::build_sql(filters);

        let q = sqlx::query(&sql).bind(query);
        let q = bind_filter_params(q, &params).bind(limit as i64);

        let rows = q.fetch_all(&self.pool).await.map_err(Error::Database)?;

        let candidates = rows
            .iter()
            .map(|row| row_to_candidate(row).map(|(c, score)| c.with_bm25_score(score)))
            .collect::<Result<Vec<_>>>()?;

        debug!(
            subsystem = "db",
            component = "lexical_search",
            op = "search_lexical",
            filter_params = params.len(),
            result_count = candidates.len(),
            duration_ms = start.elapsed().as_millis() as u64,
            "Lexical query complete"
        );
        for c in &candidates {
            trace!(chunk_id = %c.chunk_id, score = ?c.raw_bm25_score, "Lexical candidate");
        }

        Ok(candidates)
    }
}
