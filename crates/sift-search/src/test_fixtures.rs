//! In-memory stores for engine tests.
//!
//! [`FixtureStore`] implements both [`LexicalStore`] and [`VectorStore`] over
//! preset candidate lists. Filters are applied with the same
//! [`ValidatedFilters`] predicates the SQL builder mirrors, and each path can
//! be slowed down or made to fail independently.
//!
//! ## Usage
//!
//! ```rust,ignore
//! use sift_search::test_fixtures::{FixtureChunk, FixtureStore};
//!
//! let store = FixtureStore::new()
//!     .with_lexical([FixtureChunk::new("c1", "rust async").with_bm25_score(2.5)])
//!     .with_vector([FixtureChunk::new("c1", "rust async").with_vector_score(0.91)]);
//! store.set_vector_failing(true);
//! ```

use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::NaiveDate;

use sift_core::{
    Error, LexicalStore, Result, RetrievalCandidate, ValidatedFilters, Vector, VectorStore,
};

/// A candidate plus the metadata the filters look at.
#[derive(Debug, Clone)]
pub struct FixtureChunk {
    pub candidate: RetrievalCandidate,
    pub content_type: String,
    pub published_on: Option<NaiveDate>,
}

impl FixtureChunk {
    pub fn new(chunk_id: impl Into<String>, text: impl Into<String>) -> Self {
        let chunk_id = chunk_id.into();
        Self {
            candidate: RetrievalCandidate::new(chunk_id.clone(), text)
                .with_source(format!("Doc {chunk_id}"), format!("https://docs.test/{chunk_id}")),
            content_type: "article".to_string(),
            published_on: None,
        }
    }

    pub fn with_bm25_score(mut self, score: f32) -> Self {
        self.candidate.raw_bm25_score = Some(score);
        self
    }

    pub fn with_vector_score(mut self, score: f32) -> Self {
        self.candidate.raw_vector_score = Some(score);
        self
    }

    pub fn with_taxonomy<I, S>(mut self, path: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.candidate = self.candidate.with_taxonomy(path);
        self
    }

    pub fn with_content_type(mut self, content_type: impl Into<String>) -> Self {
        self.content_type = content_type.into();
        self
    }

    pub fn with_published_on(mut self, date: NaiveDate) -> Self {
        self.published_on = Some(date);
        self
    }

    fn matches(&self, filters: &ValidatedFilters) -> bool {
        filters.matches_taxonomy(&self.candidate.taxonomy_path)
            && filters.matches_content_type(&self.content_type)
            && filters.matches_date(self.published_on)
    }
}

#[derive(Debug, Default)]
struct PathState {
    calls: AtomicUsize,
    failing: AtomicBool,
    delay_ms: AtomicU64,
}

impl PathState {
    async fn enter(&self, path: &str) -> Result<()> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let delay = self.delay_ms.load(Ordering::SeqCst);
        if delay > 0 {
            tokio::time::sleep(Duration::from_millis(delay)).await;
        }
        if self.failing.load(Ordering::SeqCst) {
            return Err(Error::Search(format!("{path} fixture unavailable")));
        }
        Ok(())
    }
}

/// Preset lexical and vector result lists. Clones share state.
#[derive(Debug, Clone, Default)]
pub struct FixtureStore {
    lexical: Arc<Vec<FixtureChunk>>,
    vector: Arc<Vec<FixtureChunk>>,
    lexical_state: Arc<PathState>,
    vector_state: Arc<PathState>,
}

impl FixtureStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Lexical results, in rank order.
    pub fn with_lexical(mut self, chunks: impl IntoIterator<Item = FixtureChunk>) -> Self {
        self.lexical = Arc::new(chunks.into_iter().collect());
        self
    }

    /// Vector results, in rank order.
    pub fn with_vector(mut self, chunks: impl IntoIterator<Item = FixtureChunk>) -> Self {
        self.vector = Arc::new(chunks.into_iter().collect());
        self
    }

    pub fn set_lexical_failing(&self, failing: bool) {
        self.lexical_state.failing.store(failing, Ordering::SeqCst);
    }

    pub fn set_vector_failing(&self, failing: bool) {
        self.vector_state.failing.store(failing, Ordering::SeqCst);
    }

    pub fn set_lexical_delay(&self, delay: Duration) {
        self.lexical_state
            .delay_ms
            .store(delay.as_millis() as u64, Ordering::SeqCst);
    }

    pub fn set_vector_delay(&self, delay: Duration) {
        self.vector_state
            .delay_ms
            .store(delay.as_millis() as u64, Ordering::SeqCst);
    }

    pub fn lexical_calls(&self) -> usize {
        self.lexical_state.calls.load(Ordering::SeqCst)
    }

    pub fn vector_calls(&self) -> usize {
        self.vector_state.calls.load(Ordering::SeqCst)
    }

    /// Total store calls across both paths.
    pub fn total_calls(&self) -> usize {
        self.lexical_calls() + self.vector_calls()
    }

    fn select(chunks: &[FixtureChunk], filters: &ValidatedFilters, limit: usize) -> Vec<RetrievalCandidate> {
        chunks
            .iter()
            .filter(|c| c.matches(filters))
            .take(limit)
            .map(|c| c.candidate.clone())
            .collect()
    }
}

#[async_trait]
impl LexicalStore for FixtureStore {
    async fn search_lexical(
        &self,
        _query: &str,
        filters: &ValidatedFilters,
        limit: usize,
    ) -> Result<Vec<RetrievalCandidate>> {
        self.lexical_state.enter("lexical").await?;
        Ok(Self::select(&self.lexical, filters, limit))
    }
}

#[async_trait]
impl VectorStore for FixtureStore {
    async fn search_vector(
        &self,
        _embedding: &Vector,
        filters: &ValidatedFilters,
        limit: usize,
    ) -> Result<Vec<RetrievalCandidate>> {
        self.vector_state.enter("vector").await?;
        Ok(Self::select(&self.vector, filters, limit))
    }
}
