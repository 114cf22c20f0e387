//! Reranking of fused results.
//!
//! [`NeuralReranker`] asks a cross-encoder for one score per (query, text)
//! pair and falls back to [`HeuristicReranker`] when the model errors. Which
//! one an engine uses is decided once, at construction, by [`select_reranker`].
//!
//! The heuristic boosts the hybrid score:
//!
//! ```text
//! rerank = hybrid * (1 + 0.2 * term_overlap + 0.1 * length_fit + 0.1 * diversity)
//! ```

use std::collections::HashSet;
use std::fmt;
use std::sync::Arc;
use std::time::Instant;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use sift_core::logging::query_hash;
use sift_core::{Error, RerankBackend, ScoredResult};

use crate::fusion::sort_ranked;

const OVERLAP_WEIGHT: f32 = 0.2;
const LENGTH_WEIGHT: f32 = 0.1;
const DIVERSITY_WEIGHT: f32 = 0.1;

/// Which reranker an engine is running.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RerankerKind {
    Neural,
    Heuristic,
}

impl RerankerKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            RerankerKind::Neural => "neural",
            RerankerKind::Heuristic => "heuristic",
        }
    }
}

impl fmt::Display for RerankerKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Sets `rerank_score` on every result and re-sorts by it.
///
/// Implementations never fail: a reranker that cannot score returns results
/// scored some other way rather than an error.
#[async_trait]
pub trait Reranker: Send + Sync {
    async fn rerank(&self, query: &str, results: Vec<ScoredResult>) -> Vec<ScoredResult>;

    fn kind(&self) -> RerankerKind;
}

// =============================================================================
// HEURISTIC
// =============================================================================

/// Rule-based reranker: query term overlap, passage length and taxonomy diversity.
#[derive(Debug, Clone, Copy, Default)]
pub struct HeuristicReranker;

impl HeuristicReranker {
    pub fn new() -> Self {
        Self
    }

    /// Score and sort. `results` is expected in hybrid order, which the
    /// diversity walk depends on.
    pub fn score(&self, query: &str, mut results: Vec<ScoredResult>) -> Vec<ScoredResult> {
        let terms = query_terms(query);
        let mut seen_top: HashSet<Option<&str>> = HashSet::new();
        let mut seen_paths: HashSet<&[String]> = HashSet::new();

        let mut scores = Vec::with_capacity(results.len());
        for r in &results {
            let path = r.candidate.taxonomy_path.as_slice();
            let top = path.first().map(String::as_str);
            let diversity = if seen_paths.contains(path) {
                0.0
            } else if seen_top.contains(&top) {
                0.5
            } else {
                1.0
            };
            seen_top.insert(top);
            seen_paths.insert(path);

            let overlap = term_overlap(&terms, &r.candidate.text);
            let fit = length_fit(r.candidate.text.chars().count());
            scores.push(
                r.hybrid_score
                    * (1.0 + OVERLAP_WEIGHT * overlap + LENGTH_WEIGHT * fit + DIVERSITY_WEIGHT * diversity),
            );
        }

        for (r, s) in results.iter_mut().zip(scores) {
            r.rerank_score = Some(s);
        }
        sort_ranked(&mut results, ScoredResult::effective_score);
        results
    }
}

#[async_trait]
impl Reranker for HeuristicReranker {
    async fn rerank(&self, query: &str, results: Vec<ScoredResult>) -> Vec<ScoredResult> {
        self.score(query, results)
    }

    fn kind(&self) -> RerankerKind {
        RerankerKind::Heuristic
    }
}

/// Distinct lowercase alphanumeric query tokens.
fn query_terms(query: &str) -> Vec<String> {
    let mut seen = HashSet::new();
    query
        .split(|c: char| !c.is_alphanumeric())
        .filter(|t| !t.is_empty())
        .map(str::to_lowercase)
        .filter(|t| seen.insert(t.clone()))
        .collect()
}

/// Fraction of query terms that occur in `text` (case-insensitive).
pub fn term_overlap(terms: &[String], text: &str) -> f32 {
    if terms.is_empty() {
        return 0.0;
    }
    let text = text.to_lowercase();
    let hits = terms.iter().filter(|t| text.contains(t.as_str())).count();
    hits as f32 / terms.len() as f32
}

/// Preference for passages of 100-500 characters.
pub fn length_fit(chars: usize) -> f32 {
    let len = chars as f32;
    match chars {
        0..=49 => 0.7,
        50..=99 => 0.7 + 0.3 * (len - 50.0) / 50.0,
        100..=500 => 1.0,
        501..=1000 => 1.0 - 0.2 * (len - 500.0) / 500.0,
        _ => 0.8,
    }
}

// =============================================================================
// NEURAL
// =============================================================================

/// Cross-encoder reranker with heuristic fallback.
pub struct NeuralReranker {
    backend: Arc<dyn RerankBackend>,
    fallback: HeuristicReranker,
}

impl NeuralReranker {
    pub fn new(backend: Arc<dyn RerankBackend>) -> Self {
        Self {
            backend,
            fallback: HeuristicReranker,
        }
    }

    async fn model_scores(&self, query: &str, texts: &[String]) -> sift_core::Result<Vec<f32>> {
        let scores = self.backend.score_pairs(query, texts).await?;
        if scores.len() != texts.len() {
            return Err(Error::Rerank(format!(
                "model returned {} scores for {} passages",
                scores.len(),
                texts.len()
            )));
        }
        if scores.iter().any(|s| !s.is_finite()) {
            return Err(Error::Rerank("model returned a non-finite score".to_string()));
        }
        Ok(scores)
    }
}

#[async_trait]
impl Reranker for NeuralReranker {
    async fn rerank(&self, query: &str, mut results: Vec<ScoredResult>) -> Vec<ScoredResult> {
        if results.is_empty() {
            return results;
        }

        let start = Instant::now();
        let texts: Vec<String> = results.iter().map(|r| r.candidate.text.clone()).collect();

        match self.model_scores(query, &texts).await {
            Ok(scores) => {
                for (r, s) in results.iter_mut().zip(scores) {
                    r.rerank_score = Some(s);
                }
                sort_ranked(&mut results, ScoredResult::effective_score);
                debug!(
                    subsystem = "search",
                    component = "reranker",
                    model = self.backend.model_name(),
                    result_count = results.len(),
                    duration_ms = start.elapsed().as_millis() as u64,
                    "Neural rerank complete"
                );
                results
            }
            Err(e) => {
                warn!(
                    subsystem = "search",
                    component = "reranker",
                    query_hash = %query_hash(query),
                    model = self.backend.model_name(),
                    error = %e,
                    "Neural rerank failed, using heuristic"
                );
                self.fallback.score(query, results)
            }
        }
    }

    fn kind(&self) -> RerankerKind {
        RerankerKind::Neural
    }
}

/// Choose the reranker for an engine: neural when a backend is configured and
/// answers its health check, heuristic otherwise.
pub async fn select_reranker(backend: Option<Arc<dyn RerankBackend>>) -> Arc<dyn Reranker> {
    let Some(backend) = backend else {
        info!(
            subsystem = "search",
            component = "reranker",
            kind = "heuristic",
            "No rerank backend configured"
        );
        return Arc::new(HeuristicReranker);
    };

    match backend.health_check().await {
        Ok(true) => {
            info!(
                subsystem = "search",
                component = "reranker",
                kind = "neural",
                model = backend.model_name(),
                "Rerank backend healthy"
            );
            Arc::new(NeuralReranker::new(backend))
        }
        Ok(false) => {
            warn!(
                subsystem = "search",
                component = "reranker",
                kind = "heuristic",
                model = backend.model_name(),
                "Rerank backend unhealthy, using heuristic reranker"
            );
            Arc::new(HeuristicReranker)
        }
        Err(e) => {
            warn!(
                subsystem = "search",
                component = "reranker",
                kind = "heuristic",
                model = backend.model_name(),
                error = %e,
                "Rerank health check errored, using heuristic reranker"
            );
            Arc::new(HeuristicReranker)
        }
    }
}
