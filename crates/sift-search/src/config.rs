//! Engine configuration.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use sift_core::defaults;
use sift_core::{Error, Result};

use crate::fusion::FusionWeights;
use crate::normalize::NormalizationMethod;

const WEIGHT_SUM_TOLERANCE: f32 = 1e-4;

/// Tunables for a [`HybridSearchEngine`](crate::HybridSearchEngine).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Base lexical weight (sums to 1.0 with `vector_weight`)
    pub bm25_weight: f32,
    /// Base vector weight
    pub vector_weight: f32,
    pub normalization: NormalizationMethod,
    /// Candidates requested from each retrieval path
    pub candidate_limit: usize,
    /// Fused results handed to the reranker (raised to `top_k` when smaller)
    pub rerank_candidates: usize,
    pub path_timeout_ms: u64,
    pub request_timeout_ms: u64,
    pub slow_search_ms: u64,
    pub cache_ttl_secs: u64,
    pub cache_max_size: usize,
    pub default_top_k: usize,
    pub max_top_k: usize,
    /// Content types accepted by the filter validator
    pub allowed_content_types: Vec<String>,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            bm25_weight: defaults::BM25_WEIGHT,
            vector_weight: defaults::VECTOR_WEIGHT,
            normalization: NormalizationMethod::default(),
            candidate_limit: defaults::CANDIDATE_LIMIT,
            rerank_candidates: defaults::RERANK_CANDIDATES,
            path_timeout_ms: defaults::PATH_TIMEOUT_MS,
            request_timeout_ms: defaults::REQUEST_TIMEOUT_MS,
            slow_search_ms: defaults::SLOW_SEARCH_MS,
            cache_ttl_secs: defaults::CACHE_TTL_SECS,
            cache_max_size: defaults::CACHE_MAX_SIZE,
            default_top_k: defaults::TOP_K,
            max_top_k: defaults::MAX_TOP_K,
            allowed_content_types: defaults::ALLOWED_CONTENT_TYPES
                .iter()
                .map(|s| s.to_string())
                .collect(),
        }
    }
}

impl EngineConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Read `SIFT_*` overrides on top of the defaults and validate.
    ///
    /// Setting only one of `SIFT_BM25_WEIGHT` / `SIFT_VECTOR_WEIGHT` derives
    /// the other as its complement.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Like [`from_env`](Self::from_env) with an arbitrary variable source.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let mut config = Self::default();

        let bm25: Option<f32> = parse_var(&lookup, "SIFT_BM25_WEIGHT")?;
        let vector: Option<f32> = parse_var(&lookup, "SIFT_VECTOR_WEIGHT")?;
        match (bm25, vector) {
            (Some(b), Some(v)) => config = config.with_weights(b, v),
            (Some(b), None) => config = config.with_weights(b, 1.0 - b),
            (None, Some(v)) => config = config.with_weights(1.0 - v, v),
            (None, None) => {}
        }

        if let Some(raw) = lookup("SIFT_NORMALIZATION") {
            config.normalization = raw
                .parse()
                .map_err(|e| Error::Config(format!("SIFT_NORMALIZATION: {e}")))?;
        }
        if let Some(v) = parse_var(&lookup, "SIFT_CANDIDATE_LIMIT")? {
            config.candidate_limit = v;
        }
        if let Some(v) = parse_var(&lookup, "SIFT_RERANK_CANDIDATES")? {
            config.rerank_candidates = v;
        }
        if let Some(v) = parse_var(&lookup, "SIFT_PATH_TIMEOUT_MS")? {
            config.path_timeout_ms = v;
        }
        if let Some(v) = parse_var(&lookup, "SIFT_REQUEST_TIMEOUT_MS")? {
            config.request_timeout_ms = v;
        }
        if let Some(v) = parse_var(&lookup, "SIFT_SLOW_SEARCH_MS")? {
            config.slow_search_ms = v;
        }
        if let Some(v) = parse_var(&lookup, "SIFT_CACHE_TTL_SECS")? {
            config.cache_ttl_secs = v;
        }
        if let Some(v) = parse_var(&lookup, "SIFT_CACHE_MAX_SIZE")? {
            config.cache_max_size = v;
        }
        if let Some(v) = parse_var(&lookup, "SIFT_DEFAULT_TOP_K")? {
            config.default_top_k = v;
        }
        if let Some(v) = parse_var(&lookup, "SIFT_MAX_TOP_K")? {
            config.max_top_k = v;
        }
        if let Some(raw) = lookup("SIFT_CONTENT_TYPES") {
            config.allowed_content_types = raw
                .split(',')
                .map(|s| s.trim().to_string())
                .filter(|s| !s.is_empty())
                .collect();
        }

        config.validate()?;
        Ok(config)
    }

    pub fn with_weights(mut self, bm25: f32, vector: f32) -> Self {
        self.bm25_weight = bm25;
        self.vector_weight = vector;
        self
    }

    pub fn with_normalization(mut self, method: NormalizationMethod) -> Self {
        self.normalization = method;
        self
    }

    pub fn with_candidate_limit(mut self, limit: usize) -> Self {
        self.candidate_limit = limit;
        self
    }

    pub fn with_rerank_candidates(mut self, n: usize) -> Self {
        self.rerank_candidates = n;
        self
    }

    pub fn with_path_timeout(mut self, timeout: Duration) -> Self {
        self.path_timeout_ms = timeout.as_millis() as u64;
        self
    }

    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout_ms = timeout.as_millis() as u64;
        self
    }

    pub fn with_cache(mut self, max_size: usize, ttl: Duration) -> Self {
        self.cache_max_size = max_size;
        self.cache_ttl_secs = ttl.as_secs();
        self
    }

    pub fn with_allowed_content_types<I, S>(mut self, types: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.allowed_content_types = types.into_iter().map(Into::into).collect();
        self
    }

    pub fn base_weights(&self) -> FusionWeights {
        FusionWeights::new(self.bm25_weight, self.vector_weight)
    }

    pub fn path_timeout(&self) -> Duration {
        Duration::from_millis(self.path_timeout_ms)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout_ms)
    }

    pub fn cache_ttl(&self) -> Duration {
        Duration::from_secs(self.cache_ttl_secs)
    }

    /// Check invariants the engine relies on.
    pub fn validate(&self) -> Result<()> {
        for (name, w) in [("bm25_weight", self.bm25_weight), ("vector_weight", self.vector_weight)] {
            if !(0.0..=1.0).contains(&w) {
                return Err(Error::Config(format!("{name} must be in [0, 1], got {w}")));
            }
        }
        if (self.bm25_weight + self.vector_weight - 1.0).abs() > WEIGHT_SUM_TOLERANCE {
            return Err(Error::Config(format!(
                "bm25_weight + vector_weight must equal 1.0, got {}",
                self.bm25_weight + self.vector_weight
            )));
        }
        for (name, v) in [
            ("candidate_limit", self.candidate_limit),
            ("rerank_candidates", self.rerank_candidates),
            ("cache_max_size", self.cache_max_size),
            ("default_top_k", self.default_top_k),
            ("max_top_k", self.max_top_k),
        ] {
            if v == 0 {
                return Err(Error::Config(format!("{name} must be positive")));
            }
        }
        for (name, v) in [
            ("path_timeout_ms", self.path_timeout_ms),
            ("request_timeout_ms", self.request_timeout_ms),
            ("cache_ttl_secs", self.cache_ttl_secs),
        ] {
            if v == 0 {
                return Err(Error::Config(format!("{name} must be positive")));
            }
        }
        if self.default_top_k > self.max_top_k {
            return Err(Error::Config(format!(
                "default_top_k ({}) exceeds max_top_k ({})",
                self.default_top_k, self.max_top_k
            )));
        }
        if self.allowed_content_types.is_empty() {
            return Err(Error::Config(
                "allowed_content_types must not be empty".to_string(),
            ));
        }
        Ok(())
    }
}

fn parse_var<T: std::str::FromStr>(
    lookup: &impl Fn(&str) -> Option<String>,
    name: &str,
) -> Result<Option<T>> {
    match lookup(name) {
        None => Ok(None),
        Some(raw) => raw
            .trim()
            .parse()
            .map(Some)
            .map_err(|_| Error::Config(format!("{name}: cannot parse {raw:?}"))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |name| map.get(name).cloned()
    }

    #[test]
    fn test_defaults_are_valid() {
        let config = EngineConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.default_top_k, 10);
        assert_eq!(config.max_top_k, 100);
        assert_eq!(config.request_timeout(), Duration::from_secs(5));
        assert_eq!(config.path_timeout(), Duration::from_secs(2));
        assert_eq!(config.normalization, NormalizationMethod::ReciprocalRank);
    }

    #[test]
    fn test_weights_must_sum_to_one() {
        let err = EngineConfig::new().with_weights(0.6, 0.6).validate().unwrap_err();
        assert!(matches!(err, Error::Config(_)));
        assert!(EngineConfig::new().with_weights(0.3, 0.7).validate().is_ok());
    }

    #[test]
    fn test_zero_sizes_rejected() {
        assert!(EngineConfig::new().with_candidate_limit(0).validate().is_err());
        assert!(EngineConfig::new()
            .with_cache(0, Duration::from_secs(1))
            .validate()
            .is_err());
        assert!(EngineConfig::new()
            .with_request_timeout(Duration::ZERO)
            .validate()
            .is_err());
    }

    #[test]
    fn test_from_lookup_overrides() {
        let config = EngineConfig::from_lookup(lookup(&[
            ("SIFT_BM25_WEIGHT", "0.4"),
            ("SIFT_NORMALIZATION", "min_max"),
            ("SIFT_CANDIDATE_LIMIT", "80"),
            ("SIFT_CACHE_TTL_SECS", "60"),
            ("SIFT_CONTENT_TYPES", "memo, Article ,"),
        ]))
        .unwrap();

        assert!((config.vector_weight - 0.6).abs() < 1e-6);
        assert_eq!(config.normalization, NormalizationMethod::MinMax);
        assert_eq!(config.candidate_limit, 80);
        assert_eq!(config.cache_ttl(), Duration::from_secs(60));
        assert_eq!(config.allowed_content_types, vec!["memo", "Article"]);
    }

    #[test]
    fn test_from_lookup_parse_error() {
        let err = EngineConfig::from_lookup(lookup(&[("SIFT_MAX_TOP_K", "lots")])).unwrap_err();
        assert!(err.to_string().contains("SIFT_MAX_TOP_K"));
    }

    #[test]
    fn test_from_lookup_validates() {
        let err = EngineConfig::from_lookup(lookup(&[
            ("SIFT_BM25_WEIGHT", "0.9"),
            ("SIFT_VECTOR_WEIGHT", "0.9"),
        ]))
        .unwrap_err();
        assert!(matches!(err, Error::Config(_)));
    }

    #[test]
    fn test_serde_defaults_fill_missing_fields() {
        let config: EngineConfig = serde_json::from_str(r#"{"candidate_limit": 20}"#).unwrap();
        assert_eq!(config.candidate_limit, 20);
        assert_eq!(config.max_top_k, 100);
    }
}
