//! Cross-encoder rerank backend over HTTP.
//!
//! Speaks the text-embeddings-inference rerank protocol:
//! `POST /rerank {"query", "texts"}` returns `[{"index", "score"}, ...]`,
//! possibly reordered by score. Scores are put back in input order here.

use std::time::{Duration, Instant};

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, instrument, warn};

use sift_core::{Error, RerankBackend, Result};

/// Default rerank model name reported when none is configured.
pub const DEFAULT_RERANK_MODEL: &str = sift_core::defaults::RERANK_MODEL;

/// Cross-encoder served behind an HTTP endpoint.
pub struct HttpRerankBackend {
    client: Client,
    base_url: String,
    model: String,
    timeout: Duration,
}

#[derive(Serialize)]
struct RerankRequest<'a> {
    query: &'a str,
    texts: &'a [String],
    #[serde(skip_serializing_if = "Option::is_none")]
    model: Option<&'a str>,
}

#[derive(Deserialize)]
struct RerankScore {
    index: usize,
    score: f32,
}

impl HttpRerankBackend {
    pub fn new(base_url: impl Into<String>, model: impl Into<String>) -> Result<Self> {
        let timeout = Duration::from_secs(sift_core::defaults::RERANK_TIMEOUT_SECS);
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| Error::Config(format!("Failed to create HTTP client: {}", e)))?;

        let base_url = base_url.into().trim_end_matches('/').to_string();
        let model = model.into();

        info!(
            subsystem = "inference",
            component = "rerank",
            url = %base_url,
            model = %model,
            "Initializing HTTP rerank backend"
        );

        Ok(Self {
            client,
            base_url,
            model,
            timeout,
        })
    }

    /// Create from `SIFT_RERANK_URL`, `SIFT_RERANK_MODEL` and
    /// `SIFT_RERANK_TIMEOUT_SECS`. Returns `Ok(None)` when no URL is set.
    pub fn from_env() -> Result<Option<Self>> {
        let Ok(url) = std::env::var("SIFT_RERANK_URL") else {
            return Ok(None);
        };
        if url.trim().is_empty() {
            return Ok(None);
        }
        let model =
            std::env::var("SIFT_RERANK_MODEL").unwrap_or_else(|_| DEFAULT_RERANK_MODEL.to_string());
        let mut backend = Self::new(url, model)?;
        if let Some(secs) = std::env::var("SIFT_RERANK_TIMEOUT_SECS")
            .ok()
            .and_then(|v| v.parse::<u64>().ok())
        {
            backend.timeout = Duration::from_secs(secs);
        }
        Ok(Some(backend))
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    fn request_model(&self) -> Option<&str> {
        (!self.model.is_empty()).then_some(self.model.as_str())
    }
}

/// Put index-tagged scores back into input order. Every input must be scored
/// exactly once.
fn reassemble(scores: Vec<RerankScore>, expected: usize) -> Result<Vec<f32>> {
    let mut out: Vec<Option<f32>> = vec![None; expected];
    for s in scores {
        let slot = out
            .get_mut(s.index)
            .ok_or_else(|| Error::Rerank(format!("score index {} out of range", s.index)))?;
        if slot.replace(s.score).is_some() {
            return Err(Error::Rerank(format!("duplicate score for index {}", s.index)));
        }
    }
    out.into_iter()
        .enumerate()
        .map(|(i, s)| s.ok_or_else(|| Error::Rerank(format!("missing score for index {}", i))))
        .collect()
}

#[async_trait]
impl RerankBackend for HttpRerankBackend {
    #[instrument(skip(self, query, texts), fields(subsystem = "inference", component = "rerank", op = "score_pairs", model = %self.model, input_count = texts.len()))]
    async fn score_pairs(&self, query: &str, texts: &[String]) -> Result<Vec<f32>> {
        if texts.is_empty() {
            return Ok(vec![]);
        }

        let start = Instant::now();
        let request = RerankRequest {
            query,
            texts,
            model: self.request_model(),
        };

        let response = self
            .client
            .post(format!("{}/rerank", self.base_url))
            .timeout(self.timeout)
            .json(&request)
            .send()
            .await
            .map_err(|e| Error::Rerank(format!("Request failed: {}", e)))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(Error::Rerank(format!(
                "Rerank server returned {}: {}",
                status, body
            )));
        }

        let scores: Vec<RerankScore> = response
            .json()
            .await
            .map_err(|e| Error::Rerank(format!("Failed to parse response: {}", e)))?;

        let scores = reassemble(scores, texts.len())?;

        debug!(
            result_count = scores.len(),
            duration_ms = start.elapsed().as_millis() as u64,
            "Rerank scoring complete"
        );
        Ok(scores)
    }

    async fn health_check(&self) -> Result<bool> {
        match self
            .client
            .get(format!("{}/health", self.base_url))
            .timeout(self.timeout)
            .send()
            .await
        {
            Ok(resp) => Ok(resp.status().is_success()),
            Err(e) => {
                warn!(
                    subsystem = "inference",
                    component = "rerank",
                    error = %e,
                    "Rerank health check failed"
                );
                Ok(false)
            }
        }
    }

    fn model_name(&self) -> &str {
        &self.model
    }
}
