//! Centralized default constants for sift.
//!
//! **This module is the single source of truth** for shared default values.
//! Crates reference these constants instead of defining their own magic numbers.

// =============================================================================
// REQUEST
// =============================================================================

/// Results returned when a request does not specify `top_k`.
pub const TOP_K: usize = 10;

/// Largest `top_k` a caller may request.
pub const MAX_TOP_K: usize = 100;

// =============================================================================
// RETRIEVAL
// =============================================================================

/// Candidates requested from each retrieval path.
pub const CANDIDATE_LIMIT: usize = 50;

/// Budget for one retrieval path (embedding + vector query, or lexical query).
pub const PATH_TIMEOUT_MS: u64 = 2_000;

/// Outer deadline for a whole search request.
pub const REQUEST_TIMEOUT_MS: u64 = 5_000;

/// Searches slower than this are logged with `slow = true`.
pub const SLOW_SEARCH_MS: u64 = 1_000;

// =============================================================================
// FUSION
// =============================================================================

/// Base lexical weight before adaptive adjustment.
pub const BM25_WEIGHT: f32 = 0.5;

/// Base semantic weight before adaptive adjustment.
pub const VECTOR_WEIGHT: f32 = 0.5;

/// Reciprocal rank constant (Cormack et al. 2009).
pub const RRF_K: f32 = 60.0;

/// Fused candidates handed to the reranker.
pub const RERANK_CANDIDATES: usize = 30;

// =============================================================================
// CACHE
// =============================================================================

/// Result cache entry lifetime in seconds.
pub const CACHE_TTL_SECS: u64 = 300;

/// Result cache capacity (entries).
pub const CACHE_MAX_SIZE: usize = 1_000;

/// Prefix for result cache keys.
pub const CACHE_KEY_PREFIX: &str = "sift:search:";

// =============================================================================
// FILTERS
// =============================================================================

/// Content types accepted by the filter validator unless overridden.
pub const ALLOWED_CONTENT_TYPES: &[&str] = &[
    "article",
    "documentation",
    "faq",
    "guide",
    "policy",
    "reference",
    "transcript",
    "tutorial",
];

/// Maximum taxonomy path depth accepted in a filter.
pub const MAX_TAXONOMY_DEPTH: usize = 16;

/// Maximum number of content types accepted in a filter.
pub const MAX_CONTENT_TYPES: usize = 32;

// =============================================================================
// INFERENCE
// =============================================================================

/// Default Ollama endpoint.
pub const OLLAMA_URL: &str = "http://127.0.0.1:11434";

/// Default embedding model name (Ollama).
pub const EMBED_MODEL: &str = "nomic-embed-text";

/// Default embedding vector dimension for nomic-embed-text.
pub const EMBED_DIMENSION: usize = 768;

/// Timeout for embedding requests (seconds).
pub const EMBED_TIMEOUT_SECS: u64 = 10;

/// Default cross-encoder model name.
pub const RERANK_MODEL: &str = "BAAI/bge-reranker-base";

/// Timeout for rerank requests (seconds).
pub const RERANK_TIMEOUT_SECS: u64 = 3;

// =============================================================================
// DATABASE
// =============================================================================

/// Connections held by the retrieval pool.
pub const DB_MAX_CONNECTIONS: u32 = 10;

/// How long a query waits for a pooled connection (milliseconds).
/// Kept below [`PATH_TIMEOUT_MS`] so a starved pool fails the path, not the request.
pub const DB_ACQUIRE_TIMEOUT_MS: u64 = 1_500;

// =============================================================================
// SERVER
// =============================================================================

/// Default HTTP server port.
pub const SERVER_PORT: u16 = 3000;

/// Maximum accepted request body in bytes.
pub const MAX_BODY_BYTES: usize = 64 * 1024;
