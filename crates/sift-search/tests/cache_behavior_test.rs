//! Result cache behaviour as seen through the engine.

mod helpers;

use std::sync::Arc;
use std::time::Duration;

use helpers::{build_engine, build_engine_with, ml_corpus, PassThroughReranker};
use sift_search::{EngineConfig, NormalizationMethod, SearchRequest};

#[tokio::test(start_paused = true)]
async fn test_entry_expires_after_ttl() {
    let store = ml_corpus();
    let config = EngineConfig::default().with_cache(100, Duration::from_secs(60));
    let engine = build_engine(&store, config).await;
    let request = SearchRequest::new("gradient descent").with_top_k(3);

    assert!(!engine.search(request.clone()).await.unwrap().cache_hit);

    tokio::time::advance(Duration::from_secs(30)).await;
    assert!(engine.search(request.clone()).await.unwrap().cache_hit);
    assert_eq!(store.total_calls(), 2);

    tokio::time::advance(Duration::from_secs(31)).await;
    let response = engine.search(request).await.unwrap();
    assert!(!response.cache_hit);
    assert_eq!(store.total_calls(), 4);

    let stats = engine.cache_stats().await;
    assert_eq!(stats.expirations, 1);
    assert_eq!(stats.hits, 1);
}

#[tokio::test]
async fn test_lru_evicts_least_recently_used_request() {
    let store = ml_corpus();
    let config = EngineConfig::default().with_cache(2, Duration::from_secs(300));
    let engine = build_engine(&store, config).await;

    let q1 = SearchRequest::new("neural networks");
    let q2 = SearchRequest::new("statistical inference");
    let q3 = SearchRequest::new("feature stores");

    engine.search(q1.clone()).await.unwrap();
    engine.search(q2.clone()).await.unwrap();
    // Touch q1 so q2 becomes the eviction candidate.
    assert!(engine.search(q1.clone()).await.unwrap().cache_hit);
    engine.search(q3.clone()).await.unwrap();

    assert!(engine.search(q1).await.unwrap().cache_hit);
    assert!(!engine.search(q2).await.unwrap().cache_hit);

    let stats = engine.cache_stats().await;
    assert_eq!(stats.size, 2);
    assert_eq!(stats.capacity, 2);
    assert_eq!(stats.evictions, 2);
}

#[tokio::test]
async fn test_equivalent_requests_share_an_entry() {
    let store = ml_corpus();
    let engine = build_engine(&store, EngineConfig::default()).await;

    engine
        .search(
            SearchRequest::new("machine   learning")
                .with_content_types(["Tutorial", "article"])
                .with_top_k(5),
        )
        .await
        .unwrap();
    let again = engine
        .search(
            SearchRequest::new("  machine learning ")
                .with_content_types(["article", "tutorial"])
                .with_top_k(5),
        )
        .await
        .unwrap();
    assert!(again.cache_hit);
}

#[tokio::test]
async fn test_different_top_k_is_a_different_entry() {
    let store = ml_corpus();
    let engine = build_engine(&store, EngineConfig::default()).await;

    engine
        .search(SearchRequest::new("machine learning").with_top_k(5))
        .await
        .unwrap();
    let other = engine
        .search(SearchRequest::new("machine learning").with_top_k(6))
        .await
        .unwrap();
    assert!(!other.cache_hit);
    assert_eq!(other.hits.len(), 6);
}

#[tokio::test]
async fn test_clear_cache_forces_retrieval() {
    let store = ml_corpus();
    let engine = build_engine(&store, EngineConfig::default()).await;
    let request = SearchRequest::new("machine learning");

    engine.search(request.clone()).await.unwrap();
    engine.clear_cache().await;
    assert!(!engine.search(request).await.unwrap().cache_hit);
    assert_eq!(store.total_calls(), 4);
}

#[tokio::test]
async fn test_queries_differing_in_case_do_not_share_an_entry() {
    let config = EngineConfig::default().with_normalization(NormalizationMethod::MinMax);
    let shared = build_engine_with(
        &ml_corpus(),
        config.clone(),
        Some(Arc::new(PassThroughReranker)),
    )
    .await;
    let fresh =
        build_engine_with(&ml_corpus(), config, Some(Arc::new(PassThroughReranker))).await;

    let upper = SearchRequest::new("what is API").with_top_k(5);
    let lower = SearchRequest::new("what is api").with_top_k(5);

    shared.search(upper).await.unwrap();
    let second = shared.search(lower.clone()).await.unwrap();
    assert!(!second.cache_hit);

    let expected = fresh.search(lower).await.unwrap();
    assert_eq!(second.hits, expected.hits);
}

#[tokio::test]
async fn test_degraded_result_is_not_cached() {
    let store = ml_corpus();
    let engine = build_engine(&store, EngineConfig::default()).await;
    let request = SearchRequest::new("machine learning").with_top_k(10);

    store.set_lexical_failing(true);
    let degraded = engine.search(request.clone()).await.unwrap();
    assert!(degraded.hits.iter().all(|h| !h.chunk_id.starts_with('l')));
    assert_eq!(engine.cache_stats().await.size, 0);

    store.set_lexical_failing(false);
    let recovered = engine.search(request.clone()).await.unwrap();
    assert!(!recovered.cache_hit);
    assert!(recovered.hits.iter().any(|h| h.chunk_id.starts_with('l')));

    assert!(engine.search(request).await.unwrap().cache_hit);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_searches_share_one_bounded_cache() {
    const CAPACITY: usize = 3;
    const REQUESTS: usize = 12;

    let store = ml_corpus();
    let config = EngineConfig::default().with_cache(CAPACITY, Duration::from_secs(300));
    let engine = Arc::new(build_engine(&store, config).await);

    let tasks: Vec<_> = (0..REQUESTS)
        .map(|i| {
            let engine = Arc::clone(&engine);
            tokio::spawn(async move {
                engine
                    .search(SearchRequest::new(format!("machine learning topic {i}")))
                    .await
            })
        })
        .collect();
    for task in tasks {
        let response = task.await.unwrap().unwrap();
        assert!(!response.cache_hit);
    }

    let stats = engine.cache_stats().await;
    assert!(stats.size <= CAPACITY);
    assert_eq!(stats.size, CAPACITY);
    assert_eq!(stats.misses, REQUESTS as u64);
    assert_eq!(stats.evictions, (REQUESTS - CAPACITY) as u64);
    assert_eq!(store.total_calls(), 2 * REQUESTS);
}
