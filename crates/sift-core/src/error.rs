//! Error types for sift.

use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Result type alias using sift's Error type.
pub type Result<T> = std::result::Result<T, Error>;

/// Core error type for sift operations.
#[derive(Error, Debug)]
pub enum Error {
    /// Request or filter input was rejected before retrieval
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),

    /// Retrieval failed on every path
    #[error("Retrieval error: {0}")]
    Retrieval(#[from] RetrievalError),

    /// The per-request deadline elapsed
    #[error("Search timed out after {0} ms")]
    Timeout(u64),

    /// Database operation failed (wraps sqlx::Error)
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Embedding generation failed
    #[error("Embedding error: {0}")]
    Embedding(String),

    /// Reranking model call failed
    #[error("Rerank error: {0}")]
    Rerank(String),

    /// Search operation failed
    #[error("Search error: {0}")]
    Search(String),

    /// Serialization/deserialization error
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// HTTP/network request failed
    #[error("Request error: {0}")]
    Request(String),

    /// Internal error
    #[error("Internal error: {0}")]
    Internal(String),
}

impl Error {
    /// Stable snake_case label for the error kind, used at the API boundary.
    pub fn kind(&self) -> &'static str {
        match self {
            Error::Validation(_) => "validation_error",
            Error::Retrieval(RetrievalError::BothPathsFailed { .. }) => "retrieval_failed",
            Error::Retrieval(RetrievalError::PathFailed { .. }) => "retrieval_path_failed",
            Error::Timeout(_) => "timeout",
            Error::Database(_) => "database_error",
            Error::Embedding(_) => "embedding_error",
            Error::Rerank(_) => "rerank_error",
            Error::Search(_) => "search_error",
            Error::Serialization(_) => "serialization_error",
            Error::Config(_) => "config_error",
            Error::Request(_) => "request_error",
            Error::Internal(_) => "internal_error",
        }
    }
}

impl From<serde_json::Error> for Error {
    fn from(e: serde_json::Error) -> Self {
        Error::Serialization(e.to_string())
    }
}

impl From<reqwest::Error> for Error {
    fn from(e: reqwest::Error) -> Self {
        Error::Request(e.to_string())
    }
}

/// Rejected request or filter input.
///
/// Raised before any query is built; a request failing validation never
/// reaches a store.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    #[error("invalid taxonomy segment {segment:?}")]
    InvalidTaxonomySegment { segment: String },

    #[error("taxonomy path has {len} segments (max {max})")]
    TaxonomyPathTooLong { len: usize, max: usize },

    #[error("unknown content type {0:?}")]
    UnknownContentType(String),

    #[error("{len} content types requested (max {max})")]
    TooManyContentTypes { len: usize, max: usize },

    #[error("invalid date range: {0}")]
    InvalidDateRange(String),

    #[error("query must not be empty")]
    EmptyQuery,

    #[error("top_k must be between 1 and {max}, got {top_k}")]
    InvalidTopK { top_k: usize, max: usize },
}

/// One of the two retrieval paths.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RetrievalPath {
    /// Lexical (BM25-equivalent) ranking
    Bm25,
    /// Embedding nearest-neighbour search
    Vector,
}

impl RetrievalPath {
    pub fn as_str(&self) -> &'static str {
        match self {
            RetrievalPath::Bm25 => "bm25",
            RetrievalPath::Vector => "vector",
        }
    }
}

impl fmt::Display for RetrievalPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Retrieval failure, per path or overall.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RetrievalError {
    /// A single path failed or timed out. Absorbed by the orchestrator.
    #[error("{path} retrieval failed: {reason}")]
    PathFailed { path: RetrievalPath, reason: String },

    /// Neither path produced results.
    #[error("both retrieval paths failed (bm25: {bm25}; vector: {vector})")]
    BothPathsFailed { bm25: String, vector: String },
}

impl RetrievalError {
    pub fn path_failed(path: RetrievalPath, reason: impl Into<String>) -> Self {
        RetrievalError::PathFailed {
            path,
            reason: reason.into(),
        }
    }

    /// Failure reason without the path prefix.
    pub fn reason(&self) -> String {
        match self {
            RetrievalError::PathFailed { reason, .. } => reason.clone(),
            other => other.to_string(),
        }
    }
}
