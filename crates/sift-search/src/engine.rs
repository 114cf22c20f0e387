//! Hybrid search facade.
//!
//! `validate → cache lookup → retrieve → normalize → fuse → rerank → cache
//! store → respond`. The whole miss path runs under one request deadline.

use std::sync::Arc;
use std::time::Instant;

use tracing::{debug, info, instrument, warn, Span};

use sift_core::logging::query_hash;
use sift_core::{
    new_request_id, EmbeddingBackend, Error, FilterValidator, LexicalStore, RerankBackend,
    Result, RetrievalPath, ScoredResult, SearchHit, SearchQuery, SearchRequest, SearchResponse,
    ValidationError, VectorStore,
};

use crate::cache::{cache_key, CacheStats, ResultCache};
use crate::characteristics::QueryCharacteristics;
use crate::config::EngineConfig;
use crate::fusion::{fuse_with_weights, select_weights, FusionWeights};
use crate::normalize::normalize_candidates;
use crate::rerank::{select_reranker, Reranker, RerankerKind};
use crate::retrieval::RetrievalOrchestrator;

/// Result of one uncached pipeline run.
struct Execution {
    results: Vec<ScoredResult>,
    bm25_hits: usize,
    vector_hits: usize,
    weights: FusionWeights,
    degraded: Option<RetrievalPath>,
}

/// The search engine. Cheap to share behind an `Arc`; the result cache is the
/// only state shared between requests.
pub struct HybridSearchEngine {
    config: EngineConfig,
    validator: FilterValidator,
    orchestrator: RetrievalOrchestrator,
    reranker: Arc<dyn Reranker>,
    cache: ResultCache,
}

impl HybridSearchEngine {
    pub fn builder() -> HybridSearchEngineBuilder {
        HybridSearchEngineBuilder::default()
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn reranker_kind(&self) -> RerankerKind {
        self.reranker.kind()
    }

    pub async fn cache_stats(&self) -> CacheStats {
        self.cache.stats().await
    }

    pub async fn clear_cache(&self) {
        self.cache.clear().await;
    }

    /// Validate a raw request into an immutable [`SearchQuery`].
    pub fn validate_request(&self, request: &SearchRequest) -> Result<SearchQuery> {
        let text = request.query.trim();
        if text.is_empty() {
            return Err(ValidationError::EmptyQuery.into());
        }

        let top_k = request.top_k.unwrap_or(self.config.default_top_k);
        if top_k == 0 || top_k > self.config.max_top_k {
            return Err(ValidationError::InvalidTopK {
                top_k,
                max: self.config.max_top_k,
            }
            .into());
        }

        let filters = self.validator.validate(&request.filters)?;

        Ok(SearchQuery {
            text: text.to_string(),
            top_k,
            filters,
        })
    }

    /// Run one search.
    #[instrument(skip(self, request), fields(
        subsystem = "search",
        component = "engine",
        op = "search",
        request_id = tracing::field::Empty,
        query_hash = tracing::field::Empty,
    ))]
    pub async fn search(&self, request: SearchRequest) -> Result<SearchResponse> {
        let start = Instant::now();
        let request_id = new_request_id().to_string();
        let hash = query_hash(&request.query);
        let span = Span::current();
        span.record("request_id", request_id.as_str());
        span.record("query_hash", hash.as_str());

        let query = self.validate_request(&request).inspect_err(|e| {
            debug!(error = %e, "Search request rejected");
        })?;

        let key = match cache_key(&query.text, &query.filters, query.top_k) {
            Ok(key) => Some(key),
            Err(e) => {
                warn!(
                    component = "cache",
                    error = %e,
                    "Cache key encoding failed, bypassing cache"
                );
                None
            }
        };

        if let Some(key) = key.as_deref() {
            if let Some(results) = self.cache.get(key).await {
                let latency_ms = start.elapsed().as_millis() as u64;
                info!(
                    cache_hit = true,
                    result_count = results.len(),
                    duration_ms = latency_ms,
                    "Search served from cache"
                );
                return Ok(SearchResponse {
                    hits: results.iter().map(SearchHit::from).collect(),
                    latency_ms,
                    cache_hit: true,
                    request_id,
                });
            }
        }

        let deadline = self.config.request_timeout();
        let execution = match tokio::time::timeout(deadline, self.execute(&query)).await {
            Ok(result) => result?,
            Err(_) => {
                warn!(
                    timeout_ms = self.config.request_timeout_ms,
                    "Search exceeded request deadline"
                );
                return Err(Error::Timeout(self.config.request_timeout_ms));
            }
        };

        let hits: Vec<SearchHit> = execution.results.iter().map(SearchHit::from).collect();
        // Only full two-path results are cached.
        match (key, execution.degraded) {
            (Some(key), None) => self.cache.put(key, execution.results).await,
            (Some(_), Some(path)) => {
                debug!(failed_path = path.as_str(), "Degraded result not cached");
            }
            (None, _) => {}
        }

        let latency_ms = start.elapsed().as_millis() as u64;
        info!(
            cache_hit = false,
            bm25_hits = execution.bm25_hits,
            vector_hits = execution.vector_hits,
            bm25_weight = execution.weights.bm25,
            vector_weight = execution.weights.vector,
            degraded_path = execution.degraded.map(|p| p.as_str()),
            reranker = %self.reranker.kind(),
            result_count = hits.len(),
            duration_ms = latency_ms,
            "Search completed"
        );
        if latency_ms > self.config.slow_search_ms {
            warn!(
                slow = true,
                duration_ms = latency_ms,
                threshold_ms = self.config.slow_search_ms,
                "Slow search"
            );
        }

        Ok(SearchResponse {
            hits,
            latency_ms,
            cache_hit: false,
            request_id,
        })
    }

    async fn execute(&self, query: &SearchQuery) -> Result<Execution> {
        let outcome = self
            .orchestrator
            .retrieve(&query.text, &query.filters, self.config.candidate_limit)
            .await?;

        let merged = outcome.merged();
        let normalized = normalize_candidates(merged, self.config.normalization);

        let characteristics = QueryCharacteristics::analyze(&query.text);
        let weights = select_weights(&characteristics, self.config.base_weights());
        let mut fused = fuse_with_weights(normalized, weights);

        fused.truncate(self.config.rerank_candidates.max(query.top_k));
        let mut results = self.reranker.rerank(&query.text, fused).await;
        results.truncate(query.top_k);

        Ok(Execution {
            results,
            bm25_hits: outcome.bm25_hits(),
            vector_hits: outcome.vector_hits(),
            weights,
            degraded: outcome.failed_path(),
        })
    }
}

/// Builder for [`HybridSearchEngine`].
#[derive(Default)]
pub struct HybridSearchEngineBuilder {
    config: Option<EngineConfig>,
    lexical: Option<Arc<dyn LexicalStore>>,
    vectors: Option<Arc<dyn VectorStore>>,
    embedder: Option<Arc<dyn EmbeddingBackend>>,
    rerank_backend: Option<Arc<dyn RerankBackend>>,
    reranker: Option<Arc<dyn Reranker>>,
}

impl HybridSearchEngineBuilder {
    pub fn config(mut self, config: EngineConfig) -> Self {
        self.config = Some(config);
        self
    }

    pub fn lexical_store(mut self, store: Arc<dyn LexicalStore>) -> Self {
        self.lexical = Some(store);
        self
    }

    pub fn vector_store(mut self, store: Arc<dyn VectorStore>) -> Self {
        self.vectors = Some(store);
        self
    }

    pub fn embedder(mut self, embedder: Arc<dyn EmbeddingBackend>) -> Self {
        self.embedder = Some(embedder);
        self
    }

    /// Optional cross-encoder. Used when its health check passes at build time.
    pub fn rerank_backend(mut self, backend: Arc<dyn RerankBackend>) -> Self {
        self.rerank_backend = Some(backend);
        self
    }

    /// Use this reranker as is, skipping backend selection.
    pub fn reranker(mut self, reranker: Arc<dyn Reranker>) -> Self {
        self.reranker = Some(reranker);
        self
    }

    pub async fn build(self) -> Result<HybridSearchEngine> {
        let config = self.config.unwrap_or_default();
        config.validate()?;

        let lexical = self
            .lexical
            .ok_or_else(|| Error::Config("lexical store is required".to_string()))?;
        let vectors = self
            .vectors
            .ok_or_else(|| Error::Config("vector store is required".to_string()))?;
        let embedder = self
            .embedder
            .ok_or_else(|| Error::Config("embedding backend is required".to_string()))?;

        let reranker = match self.reranker {
            Some(reranker) => reranker,
            None => select_reranker(self.rerank_backend).await,
        };

        info!(
            subsystem = "search",
            component = "engine",
            reranker = %reranker.kind(),
            embed_model = embedder.model_name(),
            normalization = %config.normalization,
            bm25_weight = config.bm25_weight,
            vector_weight = config.vector_weight,
            cache_max_size = config.cache_max_size,
            cache_ttl_secs = config.cache_ttl_secs,
            "Hybrid search engine ready"
        );

        Ok(HybridSearchEngine {
            validator: FilterValidator::new(config.allowed_content_types.iter().cloned()),
            orchestrator: RetrievalOrchestrator::new(
                lexical,
                vectors,
                embedder,
                config.path_timeout(),
            ),
            reranker,
            cache: ResultCache::new(config.cache_max_size, config.cache_ttl()),
            config,
        })
    }
}
