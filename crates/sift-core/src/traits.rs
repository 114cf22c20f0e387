//! Collaborator traits for the search engine.
//!
//! Stores and inference backends sit behind these traits so the engine can be
//! exercised against in-memory fixtures and HTTP mocks.

use async_trait::async_trait;

use crate::error::{Error, Result};
use crate::filters::ValidatedFilters;
use crate::models::{RetrievalCandidate, Vector};

// =============================================================================
// STORES
// =============================================================================

/// Lexical (BM25-equivalent) ranking over chunk text.
#[async_trait]
pub trait LexicalStore: Send + Sync {
    /// Return up to `limit` candidates with `raw_bm25_score` set, best first.
    async fn search_lexical(
        &self,
        query: &str,
        filters: &ValidatedFilters,
        limit: usize,
    ) -> Result<Vec<RetrievalCandidate>>;
}

/// Nearest-neighbour search over chunk embeddings.
#[async_trait]
pub trait VectorStore: Send + Sync {
    /// Return up to `limit` candidates with `raw_vector_score` set (cosine
    /// similarity), best first.
    async fn search_vector(
        &self,
        embedding: &Vector,
        filters: &ValidatedFilters,
        limit: usize,
    ) -> Result<Vec<RetrievalCandidate>>;
}

// =============================================================================
// INFERENCE
// =============================================================================

/// Backend for generating embeddings.
#[async_trait]
pub trait EmbeddingBackend: Send + Sync {
    /// Generate embeddings for the given texts.
    ///
    /// Returns a vector of embedding vectors, one per input text.
    async fn embed_texts(&self, texts: &[String]) -> Result<Vec<Vector>>;

    /// Embed a single text.
    async fn embed(&self, text: &str) -> Result<Vector> {
        self.embed_texts(&[text.to_string()])
            .await?
            .into_iter()
            .next()
            .ok_or_else(|| Error::Embedding("backend returned no embedding".to_string()))
    }

    /// Get the expected dimension of embedding vectors.
    fn dimension(&self) -> usize;

    /// Get the model name being used.
    fn model_name(&self) -> &str;
}

/// Cross-encoder relevance scoring for (query, passage) pairs.
#[async_trait]
pub trait RerankBackend: Send + Sync {
    /// Score each passage against the query. Output order matches `texts`.
    async fn score_pairs(&self, query: &str, texts: &[String]) -> Result<Vec<f32>>;

    /// Whether the model is loaded and answering.
    async fn health_check(&self) -> Result<bool>;

    fn model_name(&self) -> &str;
}

#[cfg(test)]
mod tests {
    use super::*;

    struct FixedEmbedder {
        vectors: Vec<Vector>,
    }

    #[async_trait]
    impl EmbeddingBackend for FixedEmbedder {
        async fn embed_texts(&self, _texts: &[String]) -> Result<Vec<Vector>> {
            Ok(self.vectors.clone())
        }

        fn dimension(&self) -> usize {
            3
        }

        fn model_name(&self) -> &str {
            "fixed"
        }
    }

    #[tokio::test]
    async fn test_embed_returns_first_vector() {
        let backend = FixedEmbedder {
            vectors: vec![Vector::from(vec![1.0, 0.0, 0.0])],
        };
        let v = backend.embed("hello").await.unwrap();
        assert_eq!(v.as_slice(), &[1.0, 0.0, 0.0]);
    }

    #[tokio::test]
    async fn test_embed_empty_response_is_error() {
        let backend = FixedEmbedder { vectors: vec![] };
        let err = backend.embed("hello").await.unwrap_err();
        assert!(matches!(err, Error::Embedding(_)));
    }
}
