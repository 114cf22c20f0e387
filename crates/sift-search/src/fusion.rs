//! Adaptive weighted fusion of normalized lexical and vector scores.
//!
//! Short exact-term queries ("cat", `HTTP2`) lean lexical; long natural
//! language queries lean semantic. At most one shift is applied per query and
//! it applies to the whole batch.

use std::cmp::Ordering;

use serde::{Deserialize, Serialize};
use tracing::debug;

use sift_core::ScoredResult;

use crate::characteristics::QueryCharacteristics;

/// Weight added to the favoured path.
pub const WEIGHT_SHIFT: f32 = 0.2;

/// Upper bound for a shifted weight.
pub const MAX_SHIFTED_WEIGHT: f32 = 0.8;

/// Queries with at most this many tokens may get the lexical shift.
pub const SHORT_QUERY_TOKENS: usize = 3;

/// Semantic complexity above which the vector shift applies.
pub const COMPLEX_QUERY_THRESHOLD: f32 = 0.7;

/// Lexical and vector weight pair, always summing to 1.0.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FusionWeights {
    pub bm25: f32,
    pub vector: f32,
}

impl Default for FusionWeights {
    fn default() -> Self {
        Self {
            bm25: sift_core::defaults::BM25_WEIGHT,
            vector: sift_core::defaults::VECTOR_WEIGHT,
        }
    }
}

impl FusionWeights {
    pub fn new(bm25: f32, vector: f32) -> Self {
        Self { bm25, vector }
    }
}

/// Pick the weights for one query.
///
/// | Condition | Effect |
/// |-----------|--------|
/// | `token_count <= 3 && has_exact_terms` | `bm25 = min(0.8, base + 0.2)` |
/// | otherwise, `semantic_complexity > 0.7` | `vector = min(0.8, base + 0.2)` |
/// | otherwise | base weights |
pub fn select_weights(
    characteristics: &QueryCharacteristics,
    base: FusionWeights,
) -> FusionWeights {
    let (weights, strategy) = if characteristics.token_count <= SHORT_QUERY_TOKENS
        && characteristics.has_exact_terms
    {
        let bm25 = (base.bm25 + WEIGHT_SHIFT).min(MAX_SHIFTED_WEIGHT).max(base.bm25);
        (FusionWeights::new(bm25, 1.0 - bm25), "lexical_shift")
    } else if characteristics.semantic_complexity > COMPLEX_QUERY_THRESHOLD {
        let vector = (base.vector + WEIGHT_SHIFT)
            .min(MAX_SHIFTED_WEIGHT)
            .max(base.vector);
        (FusionWeights::new(1.0 - vector, vector), "vector_shift")
    } else {
        (base, "base")
    };

    debug!(
        subsystem = "search",
        component = "fusion",
        strategy,
        bm25_weight = weights.bm25,
        vector_weight = weights.vector,
        token_count = characteristics.token_count,
        has_exact_terms = characteristics.has_exact_terms,
        semantic_complexity = characteristics.semantic_complexity,
        "Fusion weights selected"
    );

    weights
}

/// Select weights for the query and fuse.
pub fn fuse(
    results: Vec<ScoredResult>,
    characteristics: &QueryCharacteristics,
    base: FusionWeights,
) -> Vec<ScoredResult> {
    fuse_with_weights(results, select_weights(characteristics, base))
}

/// Compute `hybrid_score` for every result and sort.
pub fn fuse_with_weights(mut results: Vec<ScoredResult>, weights: FusionWeights) -> Vec<ScoredResult> {
    for r in &mut results {
        let score = weights.bm25 * r.normalized_bm25 + weights.vector * r.normalized_vector;
        r.hybrid_score = if score.is_finite() {
            score.clamp(0.0, 1.0)
        } else {
            0.0
        };
    }
    sort_ranked(&mut results, |r| r.hybrid_score);
    results
}

/// Sort descending by `key`, ties broken by `chunk_id` ascending.
pub fn sort_ranked(results: &mut [ScoredResult], key: impl Fn(&ScoredResult) -> f32) {
    results.sort_by(|a, b| match key(b).total_cmp(&key(a)) {
        Ordering::Equal => a.chunk_id().cmp(b.chunk_id()),
        other => other,
    });
}
