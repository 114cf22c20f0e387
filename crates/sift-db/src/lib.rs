//! # sift-db
//!
//! PostgreSQL retrieval stores for sift.
//!
//! This crate provides:
//! - Connection pool management
//! - Lexical retrieval with PostgreSQL tsvector ([`PgLexicalSearch`])
//! - Vector retrieval with pgvector ([`PgVectorSearch`])
//! - Parameterized filter clauses ([`ChunkFilterQueryBuilder`])
//!
//! The chunk table is owned by the ingestion pipeline; this crate only reads it.
//!
//! ## Example
//!
//! ```rust,ignore
//! use sift_db::Database;
//!
//! let db = Database::connect("postgres://localhost/sift").await?;
//! let engine = HybridSearchEngine::builder()
//!     .lexical_store(db.lexical.clone())
//!     .vector_store(db.vectors.clone())
//!     // ...
//! ```

pub mod filter;
pub mod pool;
pub mod search;
pub mod vectors;

use std::sync::Arc;

use sqlx::postgres::{PgArguments, PgRow};
use sqlx::query::Query;
use sqlx::{PgPool, Postgres, Row};

use sift_core::{Error, Result, RetrievalCandidate};

pub use filter::{ChunkFilterQueryBuilder, QueryParam};
pub use pool::{open_pool, PoolConfig};
pub use search::PgLexicalSearch;
pub use vectors::PgVectorSearch;

/// Both retrieval stores over one connection pool.
#[derive(Clone)]
pub struct Database {
    pub pool: PgPool,
    pub lexical: Arc<PgLexicalSearch>,
    pub vectors: Arc<PgVectorSearch>,
}

impl Database {
    pub fn new(pool: PgPool) -> Self {
        Self {
            lexical: Arc::new(PgLexicalSearch::new(pool.clone())),
            vectors: Arc::new(PgVectorSearch::new(pool.clone())),
            pool,
        }
    }

    /// Connect with the default pool configuration.
    pub async fn connect(database_url: &str) -> Result<Self> {
        Self::connect_with_config(database_url, PoolConfig::default()).await
    }

    pub async fn connect_with_config(database_url: &str, config: PoolConfig) -> Result<Self> {
        Ok(Self::new(open_pool(database_url, &config).await?))
    }

    /// Round-trip a trivial query.
    pub async fn health_check(&self) -> Result<()> {
        sqlx::query("SELECT 1")
            .execute(&self.pool)
            .await
            .map_err(Error::Database)?;
        Ok(())
    }
}

pub(crate) fn bind_filter_params<'q>(
    mut q: Query<'q, Postgres, PgArguments>,
    params: &'q [QueryParam],
) -> Query<'q, Postgres, PgArguments> {
    for param in params {
        q = match param {
            QueryParam::StringArray(arr) => q.bind(arr),
            QueryParam::Date(d) => q.bind(d),
        };
    }
    q
}

/// Map a result row to a candidate plus its raw `score` column.
pub(crate) fn row_to_candidate(row: &PgRow) -> Result<(RetrievalCandidate, f32)> {
    let chunk_id: String = row.try_get("chunk_id")?;
    let text: String = row.try_get("text")?;
    let title: Option<String> = row.try_get("document_title")?;
    let url: Option<String> = row.try_get("source_url")?;
    let taxonomy: Option<Vec<String>> = row.try_get("taxonomy_path")?;
    let score: Option<f32> = row.try_get("score")?;

    let candidate = RetrievalCandidate::new(chunk_id, text)
        .with_source(title.unwrap_or_default(), url.unwrap_or_default())
        .with_taxonomy(taxonomy.unwrap_or_default());

    Ok((candidate, score.unwrap_or(0.0)))
}
