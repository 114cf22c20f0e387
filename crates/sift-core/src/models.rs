//! Request, candidate, and response types shared across sift crates.

use serde::{Deserialize, Serialize};

use crate::filters::{SearchFilters, ValidatedFilters};

pub use pgvector::Vector;

// =============================================================================
// REQUEST
// =============================================================================

/// Search request as received from a caller.
///
/// Nothing in here is trusted: the facade validates `query`, `top_k` and
/// `filters` before any retrieval happens.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SearchRequest {
    /// Free-text query (required, non-empty)
    pub query: String,
    /// Number of hits to return (defaults to the engine's `default_top_k`)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub top_k: Option<usize>,
    /// Optional filters
    #[serde(default)]
    pub filters: SearchFilters,
}

impl SearchRequest {
    /// Create a new request with a text query.
    pub fn new(query: impl Into<String>) -> Self {
        Self {
            query: query.into(),
            ..Default::default()
        }
    }

    /// Set the number of hits to return.
    pub fn with_top_k(mut self, top_k: usize) -> Self {
        self.top_k = Some(top_k);
        self
    }

    /// Restrict results to a taxonomy path prefix.
    pub fn with_taxonomy_path<I, S>(mut self, path: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.filters.taxonomy_path = Some(path.into_iter().map(Into::into).collect());
        self
    }

    /// Restrict results to the given content types.
    pub fn with_content_types<I, S>(mut self, types: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.filters.content_types = Some(types.into_iter().map(Into::into).collect());
        self
    }

    /// Restrict results to a publication date range (`YYYY-MM-DD`, inclusive).
    pub fn with_date_range(
        mut self,
        from: Option<impl Into<String>>,
        to: Option<impl Into<String>>,
    ) -> Self {
        self.filters.date_from = from.map(Into::into);
        self.filters.date_to = to.map(Into::into);
        self
    }

    /// Replace all filters.
    pub fn with_filters(mut self, filters: SearchFilters) -> Self {
        self.filters = filters;
        self
    }
}

/// A validated query, immutable for the rest of the request.
#[derive(Debug, Clone, PartialEq)]
pub struct SearchQuery {
    pub text: String,
    pub top_k: usize,
    pub filters: ValidatedFilters,
}

// =============================================================================
// CANDIDATES
// =============================================================================

/// One chunk returned by a retrieval path.
///
/// A raw score is `None` when the chunk was not returned by that path; it
/// stays absent (not zero) until normalization.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RetrievalCandidate {
    pub chunk_id: String,
    pub text: String,
    pub document_title: String,
    pub source_url: String,
    #[serde(default)]
    pub taxonomy_path: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub raw_bm25_score: Option<f32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub raw_vector_score: Option<f32>,
}

impl RetrievalCandidate {
    /// Create a candidate with no scores attached.
    pub fn new(chunk_id: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            chunk_id: chunk_id.into(),
            text: text.into(),
            document_title: String::new(),
            source_url: String::new(),
            taxonomy_path: Vec::new(),
            raw_bm25_score: None,
            raw_vector_score: None,
        }
    }

    /// Set document title and source URL.
    pub fn with_source(mut self, title: impl Into<String>, url: impl Into<String>) -> Self {
        self.document_title = title.into();
        self.source_url = url.into();
        self
    }

    /// Set the taxonomy path.
    pub fn with_taxonomy<I, S>(mut self, path: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.taxonomy_path = path.into_iter().map(Into::into).collect();
        self
    }

    /// Attach a lexical rank score.
    pub fn with_bm25_score(mut self, score: f32) -> Self {
        self.raw_bm25_score = Some(score);
        self
    }

    /// Attach a vector similarity score.
    pub fn with_vector_score(mut self, score: f32) -> Self {
        self.raw_vector_score = Some(score);
        self
    }
}

/// A candidate with normalized, fused, and (optionally) reranked scores.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoredResult {
    #[serde(flatten)]
    pub candidate: RetrievalCandidate,
    pub normalized_bm25: f32,
    pub normalized_vector: f32,
    pub hybrid_score: f32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rerank_score: Option<f32>,
}

impl ScoredResult {
    /// Wrap a candidate with zeroed scores.
    pub fn unscored(candidate: RetrievalCandidate) -> Self {
        Self {
            candidate,
            normalized_bm25: 0.0,
            normalized_vector: 0.0,
            hybrid_score: 0.0,
            rerank_score: None,
        }
    }

    pub fn chunk_id(&self) -> &str {
        &self.candidate.chunk_id
    }

    /// Final sort key: `rerank_score` when present, else `hybrid_score`.
    pub fn effective_score(&self) -> f32 {
        self.rerank_score.unwrap_or(self.hybrid_score)
    }
}

// =============================================================================
// RESPONSE
// =============================================================================

/// Where a hit came from.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HitSource {
    pub url: String,
    pub title: String,
}

/// One ranked hit in a response.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchHit {
    pub chunk_id: String,
    pub text: String,
    pub score: f32,
    pub source: HitSource,
    pub taxonomy_path: Vec<String>,
}

impl From<&ScoredResult> for SearchHit {
    fn from(result: &ScoredResult) -> Self {
        Self {
            chunk_id: result.candidate.chunk_id.clone(),
            text: result.candidate.text.clone(),
            score: result.effective_score(),
            source: HitSource {
                url: result.candidate.source_url.clone(),
                title: result.candidate.document_title.clone(),
            },
            taxonomy_path: result.candidate.taxonomy_path.clone(),
        }
    }
}

/// Search response returned by the facade.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchResponse {
    pub hits: Vec<SearchHit>,
    pub latency_ms: u64,
    pub cache_hit: bool,
    pub request_id: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_search_request_builder() {
        let request = SearchRequest::new("machine learning")
            .with_top_k(5)
            .with_taxonomy_path(["Science", "Computing"])
            .with_content_types(["article"])
            .with_date_range(Some("2024-01-01"), None::<String>);

        assert_eq!(request.query, "machine learning");
        assert_eq!(request.top_k, Some(5));
        assert_eq!(
            request.filters.taxonomy_path,
            Some(vec!["Science".to_string(), "Computing".to_string()])
        );
        assert_eq!(request.filters.date_from.as_deref(), Some("2024-01-01"));
        assert!(request.filters.date_to.is_none());
    }

    #[test]
    fn test_search_request_deserialize_minimal() {
        let request: SearchRequest = serde_json::from_str(r#"{"query": "rust"}"#).unwrap();
        assert_eq!(request.query, "rust");
        assert!(request.top_k.is_none());
        assert_eq!(request.filters, SearchFilters::default());
    }

    #[test]
    fn test_search_request_deserialize_filters() {
        let json = r#"{
            "query": "rust",
            "top_k": 3,
            "filters": {"taxonomy_path": ["Engineering"], "date_from": "2024-01-01", "date_to": "2024-12-31"}
        }"#;
        let request: SearchRequest = serde_json::from_str(json).unwrap();
        assert_eq!(request.top_k, Some(3));
        assert_eq!(
            request.filters.taxonomy_path,
            Some(vec!["Engineering".to_string()])
        );
        assert_eq!(request.filters.date_to.as_deref(), Some("2024-12-31"));
    }

    #[test]
    fn test_effective_score_prefers_rerank() {
        let mut result = ScoredResult::unscored(RetrievalCandidate::new("c1", "text"));
        result.hybrid_score = 0.4;
        assert_eq!(result.effective_score(), 0.4);

        result.rerank_score = Some(0.9);
        assert_eq!(result.effective_score(), 0.9);
    }

    #[test]
    fn test_search_hit_from_scored_result() {
        let candidate = RetrievalCandidate::new("c1", "body")
            .with_source("Title", "https://example.com/doc")
            .with_taxonomy(["A", "B"]);
        let mut result = ScoredResult::unscored(candidate);
        result.hybrid_score = 0.25;

        let hit = SearchHit::from(&result);
        assert_eq!(hit.chunk_id, "c1");
        assert_eq!(hit.score, 0.25);
        assert_eq!(hit.source.url, "https://example.com/doc");
        assert_eq!(hit.source.title, "Title");
        assert_eq!(hit.taxonomy_path, vec!["A", "B"]);
    }

    #[test]
    fn test_scored_result_serialization_flattens_candidate() {
        let result = ScoredResult::unscored(RetrievalCandidate::new("c1", "body"));
        let value = serde_json::to_value(&result).unwrap();
        assert_eq!(value["chunk_id"], "c1");
        assert!(value.get("candidate").is_none());
        assert!(value.get("rerank_score").is_none());
    }
}
