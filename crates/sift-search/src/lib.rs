//! # sift-search
//!
//! Hybrid search engine (BM25 + vector) for sift.
//!
//! This crate provides:
//! - Concurrent lexical and vector retrieval with per-path timeouts
//! - Score normalization (min-max, z-score, reciprocal rank)
//! - Adaptive weighted fusion driven by query characteristics
//! - Neural cross-encoder reranking with a heuristic fallback
//! - An in-memory LRU + TTL result cache
//!
//! ## Example
//!
//! ```ignore
//! use std::sync::Arc;
//! use sift_search::{EngineConfig, HybridSearchEngine, SearchRequest};
//!
//! let db = sift_db::Database::connect("postgres://...").await?;
//! let engine = HybridSearchEngine::builder()
//!     .config(EngineConfig::from_env()?)
//!     .lexical_store(db.lexical.clone())
//!     .vector_store(db.vectors.clone())
//!     .embedder(Arc::new(sift_inference::OllamaBackend::from_env()?))
//!     .build()
//!     .await?;
//!
//! let response = engine
//!     .search(SearchRequest::new("machine learning").with_top_k(5))
//!     .await?;
//! ```

pub mod cache;
pub mod characteristics;
pub mod config;
pub mod engine;
pub mod fusion;
pub mod normalize;
pub mod rerank;
pub mod retrieval;
pub mod test_fixtures;

// Re-export core types
pub use sift_core::*;

pub use cache::{cache_key, CacheError, CacheStats, ResultCache};
pub use characteristics::QueryCharacteristics;
pub use config::EngineConfig;
pub use engine::{HybridSearchEngine, HybridSearchEngineBuilder};
pub use fusion::{fuse, fuse_with_weights, select_weights, sort_ranked, FusionWeights};
pub use normalize::{normalize, normalize_candidates, NormalizationMethod};
pub use rerank::{select_reranker, HeuristicReranker, NeuralReranker, Reranker, RerankerKind};
pub use retrieval::{merge_candidates, RetrievalOrchestrator, RetrievalOutcome};
