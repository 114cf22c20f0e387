//! Deterministic mock backends for testing.
//!
//! Both mocks are cheap to clone and share state between clones, so a test
//! can hand one clone to the engine and keep another for assertions or to
//! flip failure injection mid-test.
//!
//! ```rust,ignore
//! let embedder = MockEmbeddingBackend::new(8).with_latency_ms(50);
//! let engine = HybridSearchEngine::builder()
//!     .embedder(Arc::new(embedder.clone()))
//!     // ...
//! embedder.set_failing(true);
//! assert_eq!(embedder.call_count(), 1);
//! ```

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;

use sift_core::{EmbeddingBackend, Error, RerankBackend, Result, Vector};

#[derive(Debug, Default)]
struct MockState {
    calls: AtomicUsize,
    failing: AtomicBool,
}

impl MockState {
    fn record(&self) -> bool {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.failing.load(Ordering::SeqCst)
    }
}

async fn simulate_latency(latency: Duration) {
    if !latency.is_zero() {
        tokio::time::sleep(latency).await;
    }
}

// =============================================================================
// EMBEDDINGS
// =============================================================================

/// Embedding backend producing deterministic unit vectors from text.
#[derive(Clone)]
pub struct MockEmbeddingBackend {
    dimension: usize,
    latency: Duration,
    fixed: Arc<HashMap<String, Vec<f32>>>,
    state: Arc<MockState>,
}

impl MockEmbeddingBackend {
    pub fn new(dimension: usize) -> Self {
        Self {
            dimension,
            latency: Duration::ZERO,
            fixed: Arc::new(HashMap::new()),
            state: Arc::new(MockState::default()),
        }
    }

    /// Return `vector` for exactly `text`.
    pub fn with_fixed(mut self, text: impl Into<String>, vector: Vec<f32>) -> Self {
        Arc::make_mut(&mut self.fixed).insert(text.into(), vector);
        self
    }

    /// Sleep this long (tokio time) before answering.
    pub fn with_latency_ms(mut self, ms: u64) -> Self {
        self.latency = Duration::from_millis(ms);
        self
    }

    /// Start in the failing state.
    pub fn failing(self) -> Self {
        self.set_failing(true);
        self
    }

    pub fn set_failing(&self, failing: bool) {
        self.state.failing.store(failing, Ordering::SeqCst);
    }

    /// Number of `embed_texts` calls so far.
    pub fn call_count(&self) -> usize {
        self.state.calls.load(Ordering::SeqCst)
    }

    /// Deterministic unit vector derived from character codes.
    pub fn generate(text: &str, dimension: usize) -> Vec<f32> {
        let mut vec = vec![0.0f32; dimension.max(1)];
        for (i, c) in text.chars().enumerate() {
            let idx = (c as usize + i) % vec.len();
            vec[idx] += 0.1;
        }
        let magnitude: f32 = vec.iter().map(|x| x * x).sum::<f32>().sqrt();
        if magnitude > 0.0 {
            vec.iter_mut().for_each(|x| *x /= magnitude);
        }
        vec
    }
}

#[async_trait]
impl EmbeddingBackend for MockEmbeddingBackend {
    async fn embed_texts(&self, texts: &[String]) -> Result<Vec<Vector>> {
        let failing = self.state.record();
        simulate_latency(self.latency).await;
        if failing {
            return Err(Error::Embedding("simulated embedding failure".to_string()));
        }
        Ok(texts
            .iter()
            .map(|t| {
                let v = self
                    .fixed
                    .get(t)
                    .cloned()
                    .unwrap_or_else(|| Self::generate(t, self.dimension));
                Vector::from(v)
            })
            .collect())
    }

    fn dimension(&self) -> usize {
        self.dimension
    }

    fn model_name(&self) -> &str {
        "mock-embed"
    }
}

// =============================================================================
// RERANK
// =============================================================================

/// Rerank backend scoring a passage by the fraction of query terms it contains.
#[derive(Clone)]
pub struct MockRerankBackend {
    latency: Duration,
    fixed: Arc<HashMap<String, f32>>,
    healthy: Arc<AtomicBool>,
    state: Arc<MockState>,
}

impl Default for MockRerankBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl MockRerankBackend {
    pub fn new() -> Self {
        Self {
            latency: Duration::ZERO,
            fixed: Arc::new(HashMap::new()),
            healthy: Arc::new(AtomicBool::new(true)),
            state: Arc::new(MockState::default()),
        }
    }

    /// Score passages equal to `text` with `score`.
    pub fn with_score(mut self, text: impl Into<String>, score: f32) -> Self {
        Arc::make_mut(&mut self.fixed).insert(text.into(), score);
        self
    }

    pub fn with_latency_ms(mut self, ms: u64) -> Self {
        self.latency = Duration::from_millis(ms);
        self
    }

    pub fn failing(self) -> Self {
        self.set_failing(true);
        self
    }

    pub fn set_failing(&self, failing: bool) {
        self.state.failing.store(failing, Ordering::SeqCst);
    }

    pub fn set_healthy(&self, healthy: bool) {
        self.healthy.store(healthy, Ordering::SeqCst);
    }

    /// Number of `score_pairs` calls so far.
    pub fn call_count(&self) -> usize {
        self.state.calls.load(Ordering::SeqCst)
    }

    fn overlap_score(query: &str, text: &str) -> f32 {
        let text = text.to_lowercase();
        let terms: Vec<String> = query.split_whitespace().map(str::to_lowercase).collect();
        if terms.is_empty() {
            return 0.0;
        }
        let hits = terms.iter().filter(|t| text.contains(t.as_str())).count();
        hits as f32 / terms.len() as f32
    }
}

#[async_trait]
impl RerankBackend for MockRerankBackend {
    async fn score_pairs(&self, query: &str, texts: &[String]) -> Result<Vec<f32>> {
        let failing = self.state.record();
        simulate_latency(self.latency).await;
        if failing {
            return Err(Error::Rerank("simulated rerank failure".to_string()));
        }
        Ok(texts
            .iter()
            .map(|t| {
                self.fixed
                    .get(t)
                    .copied()
                    .unwrap_or_else(|| Self::overlap_score(query, t))
            })
            .collect())
    }

    async fn health_check(&self) -> Result<bool> {
        Ok(self.healthy.load(Ordering::SeqCst))
    }

    fn model_name(&self) -> &str {
        "mock-rerank"
    }
}
