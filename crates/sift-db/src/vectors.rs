//! Vector retrieval over chunk embeddings with pgvector.

use std::time::Instant;

use async_trait::async_trait;
use sqlx::{Pool, Postgres};
use tracing::{debug, trace};

use sift_core::{Error, Result, RetrievalCandidate, ValidatedFilters, Vector, VectorStore};

use crate::bind_filter_params;
use crate::filter::{ChunkFilterQueryBuilder, QueryParam};
use crate::row_to_candidate;

/// Vector store backed by the `chunk.embedding` column.
///
/// Scores are cosine similarity (`1 - cosine distance`), so higher is better
/// and identical directions score 1.0.
pub struct PgVectorSearch {
    pool: Pool<Postgres>,
}

impl PgVectorSearch {
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self { pool }
    }

    pub(crate) fn build_sql(filters: &ValidatedFilters) -> (String, Vec<QueryParam>) {
        let (filter_clause, params) = ChunkFilterQueryBuilder::new(filters, 1).build();
        let limit_idx = params.len() + 2;
        let sql = format!(
            r#"
            SELECT c.chunk_id,
                   c.text,
                   c.document_title,
                   c.source_url,
                   c.taxonomy_path,
                   (1.0 - (c.embedding <=> $1::vector))::real AS score
            FROM chunk c
            WHERE c.embedding IS NOT NULL
              AND {filter_clause}
            ORDER BY c.embedding <=> $1::vector, c.chunk_id ASC
            LIMIT ${limit_idx}
            "#
        );
        (sql, params)
    }
}

#[async_trait]
impl VectorStore for PgVectorSearch {
    async fn search_vector(
        &self,
        embedding: &Vector,
        filters: &ValidatedFilters,
        limit: usize,
    ) -> Result<Vec<RetrievalCandidate>> {
        let start = Instant::now();
        let (sql, params) = Self::build_sql(filters);

        let q = sqlx::query(&sql).bind(embedding);
        let q = bind_filter_params(q, &params).bind(limit as i64);

        let rows = q.fetch_all(&self.pool).await.map_err(Error::Database)?;

        let candidates = rows
            .iter()
            .map(|row| row_to_candidate(row).map(|(c, score)| c.with_vector_score(score)))
            .collect::<Result<Vec<_>>>()?;

        debug!(
            subsystem = "db",
            component = "vector_search",
            op = "search_vector",
            dimension = embedding.as_slice().len(),
            result_count = candidates.len(),
            duration_ms = start.elapsed().as_millis() as u64,
            "Vector query complete"
        );
        for c in &candidates {
            trace!(chunk_id = %c.chunk_id, score = ?c.raw_vector_score, "Vector candidate");
        }

        Ok(candidates)
    }
}
