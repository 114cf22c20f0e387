//! Structured logging schema and field name constants for sift.
//!
//! All crates use these names for structured `tracing` fields so log
//! aggregation can query every subsystem the same way.
//!
//! ## Log Level Contract
//!
//! | Level | Usage |
//! |-------|-------|
//! | ERROR | Request failed, caller receives an error |
//! | WARN  | Recoverable issue, automatic fallback applied |
//! | INFO  | Lifecycle events, completed searches |
//! | DEBUG | Decision points (weights, cache hits, reranker choice) |
//! | TRACE | Per-item data (candidates, scores) |
//!
//! Raw query text is logged at DEBUG and below only; use [`QUERY_HASH`]
//! to correlate at higher levels.

use sha2::{Digest, Sha256};

// ─── Identity fields ───────────────────────────────────────────────────────

/// Correlation ID for one search request (UUIDv7).
pub const REQUEST_ID: &str = "request_id";

/// Subsystem originating the log event ("search", "db", "inference", "api").
pub const SUBSYSTEM: &str = "subsystem";

/// Component within a subsystem ("orchestrator", "fusion", "reranker", "cache").
pub const COMPONENT: &str = "component";

/// Logical operation name.
pub const OPERATION: &str = "op";

/// Short stable hash of the query text.
pub const QUERY_HASH: &str = "query_hash";

// ─── Measurement fields ────────────────────────────────────────────────────

/// Wall-clock duration in milliseconds.
pub const DURATION_MS: &str = "duration_ms";

/// Number of results returned.
pub const RESULT_COUNT: &str = "result_count";

/// Lexical candidates before fusion.
pub const BM25_HITS: &str = "bm25_hits";

/// Vector candidates before fusion.
pub const VECTOR_HITS: &str = "vector_hits";

/// Effective lexical weight used in fusion.
pub const BM25_WEIGHT: &str = "bm25_weight";

/// Effective vector weight used in fusion.
pub const VECTOR_WEIGHT: &str = "vector_weight";

// ─── Outcome fields ────────────────────────────────────────────────────────

/// Which retrieval path an event concerns ("bm25", "vector").
pub const PATH: &str = "path";

/// Whether the response was served from the result cache.
pub const CACHE_HIT: &str = "cache_hit";

/// Error message when an operation fails or degrades.
pub const ERROR_MSG: &str = "error";

/// Slow operation threshold exceeded.
pub const SLOW: &str = "slow";

/// Short hex digest of the query text for log correlation.
pub fn query_hash(query: &str) -> String {
    let digest = Sha256::digest(query.trim().as_bytes());
    hex::encode(&digest[..6])
}
