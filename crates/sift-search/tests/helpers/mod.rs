//! Shared setup for engine integration tests.

#![allow(dead_code)]

use std::sync::Arc;

use async_trait::async_trait;
use chrono::NaiveDate;

use sift_inference::mock::MockEmbeddingBackend;
use sift_search::test_fixtures::{FixtureChunk, FixtureStore};
use sift_search::{EngineConfig, HybridSearchEngine, Reranker, RerankerKind, ScoredResult};

pub const EMBED_DIM: usize = 16;

/// Leaves fused order and scores untouched, so hit scores are hybrid scores.
pub struct PassThroughReranker;

#[async_trait]
impl Reranker for PassThroughReranker {
    async fn rerank(&self, _query: &str, results: Vec<ScoredResult>) -> Vec<ScoredResult> {
        results
    }

    fn kind(&self) -> RerankerKind {
        RerankerKind::Heuristic
    }
}

pub fn date(s: &str) -> NaiveDate {
    NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
}

/// 8 lexical and 6 vector hits; `s1`..`s3` appear in both lists.
pub fn ml_corpus() -> FixtureStore {
    let lexical = [
        ("l1", "Machine learning pipelines in production", 9.1, ["Engineering", "ML"]),
        ("s1", "An introduction to machine learning", 8.4, ["Engineering", "ML"]),
        ("l2", "Learning rate schedules for machine translation", 7.7, ["Research", "NLP"]),
        ("s2", "Machine learning model evaluation", 6.9, ["Research", "ML"]),
        ("l3", "Machine shop safety training", 5.2, ["Operations", "Safety"]),
        ("s3", "Feature stores for learning systems", 4.8, ["Engineering", "Data"]),
        ("l4", "Continuous learning culture at work", 3.3, ["People", "Culture"]),
        ("l5", "Vending machine maintenance", 1.2, ["Operations", "Facilities"]),
    ];
    let vector = [
        ("s1", "An introduction to machine learning", 0.93, ["Engineering", "ML"]),
        ("v1", "Neural networks explained", 0.88, ["Research", "ML"]),
        ("s2", "Machine learning model evaluation", 0.84, ["Research", "ML"]),
        ("v2", "Gradient descent from first principles", 0.79, ["Research", "Math"]),
        ("s3", "Feature stores for learning systems", 0.71, ["Engineering", "Data"]),
        ("v3", "Statistical inference primer", 0.64, ["Research", "Statistics"]),
    ];

    FixtureStore::new()
        .with_lexical(lexical.into_iter().map(|(id, text, score, path)| {
            FixtureChunk::new(id, text)
                .with_bm25_score(score)
                .with_taxonomy(path)
                .with_published_on(date("2024-03-01"))
        }))
        .with_vector(vector.into_iter().map(|(id, text, score, path)| {
            FixtureChunk::new(id, text)
                .with_vector_score(score)
                .with_taxonomy(path)
                .with_published_on(date("2024-03-01"))
        }))
}

pub async fn build_engine(store: &FixtureStore, config: EngineConfig) -> HybridSearchEngine {
    build_engine_with(store, config, None).await
}

pub async fn build_engine_with(
    store: &FixtureStore,
    config: EngineConfig,
    reranker: Option<Arc<dyn Reranker>>,
) -> HybridSearchEngine {
    let mut builder = HybridSearchEngine::builder()
        .config(config)
        .lexical_store(Arc::new(store.clone()))
        .vector_store(Arc::new(store.clone()))
        .embedder(Arc::new(MockEmbeddingBackend::new(EMBED_DIM)));
    if let Some(reranker) = reranker {
        builder = builder.reranker(reranker);
    }
    builder.build().await.unwrap()
}
