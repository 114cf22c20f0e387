//! In-memory LRU + TTL result cache.
//!
//! One `lru::LruCache` behind one `tokio::sync::Mutex` holds both the entries
//! and their recency order. Stale entries are evicted lazily when a lookup
//! finds them; at capacity, inserting evicts the least recently accessed entry.
//!
//! Keys are `sift:search:` + hex SHA-256 of a canonical JSON encoding of the
//! normalized query text, the validated filters and `top_k`.

use std::num::NonZeroUsize;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use lru::LruCache;
use serde::Serialize;
use sha2::{Digest, Sha256};
use thiserror::Error;
use tokio::sync::Mutex;
use tokio::time::Instant;
use tracing::{debug, trace};

use sift_core::defaults::CACHE_KEY_PREFIX;
use sift_core::{ScoredResult, ValidatedFilters};

/// Cache key could not be computed. Callers treat this as a miss.
#[derive(Error, Debug)]
pub enum CacheError {
    #[error("cache key encoding failed: {0}")]
    KeyEncoding(#[from] serde_json::Error),
}

#[derive(Serialize)]
struct CanonicalKey<'a> {
    query: String,
    filters: &'a ValidatedFilters,
    top_k: usize,
}

/// Trim and collapse inner whitespace. Case is kept: `API` and `api`
/// analyze and embed differently.
pub fn normalize_query(query: &str) -> String {
    query.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Deterministic cache key for a validated request.
pub fn cache_key(
    query_text: &str,
    filters: &ValidatedFilters,
    top_k: usize,
) -> Result<String, CacheError> {
    let canonical = CanonicalKey {
        query: normalize_query(query_text),
        filters,
        top_k,
    };
    let encoded = serde_json::to_vec(&canonical)?;
    let digest = Sha256::digest(&encoded);
    Ok(format!("{}{}", CACHE_KEY_PREFIX, hex::encode(digest)))
}

/// One cached result list.
#[derive(Debug, Clone)]
pub struct CacheEntry {
    pub key: String,
    pub results: Vec<ScoredResult>,
    pub created_at: Instant,
    pub last_access: Instant,
}

/// Counters since construction (or the last [`ResultCache::clear`]).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct CacheStats {
    pub hits: u64,
    pub misses: u64,
    pub evictions: u64,
    pub expirations: u64,
    pub size: usize,
    pub capacity: usize,
}

impl CacheStats {
    pub fn hit_rate(&self) -> f64 {
        let total = self.hits + self.misses;
        if total == 0 {
            0.0
        } else {
            self.hits as f64 / total as f64
        }
    }
}

#[derive(Debug, Default)]
struct Counters {
    hits: AtomicU64,
    misses: AtomicU64,
    evictions: AtomicU64,
    expirations: AtomicU64,
}

impl Counters {
    fn bump(counter: &AtomicU64) {
        counter.fetch_add(1, Ordering::Relaxed);
    }

    fn reset(&self) {
        for c in [&self.hits, &self.misses, &self.evictions, &self.expirations] {
            c.store(0, Ordering::Relaxed);
        }
    }
}

/// LRU cache of search results with a fixed time-to-live.
pub struct ResultCache {
    entries: Mutex<LruCache<String, CacheEntry>>,
    ttl: Duration,
    capacity: NonZeroUsize,
    counters: Counters,
}

impl ResultCache {
    /// A zero `max_size` is raised to one.
    pub fn new(max_size: usize, ttl: Duration) -> Self {
        let capacity = NonZeroUsize::new(max_size).unwrap_or(NonZeroUsize::MIN);
        Self {
            entries: Mutex::new(LruCache::new(capacity)),
            ttl,
            capacity,
            counters: Counters::default(),
        }
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Fresh results for `key`, refreshing its recency. A stale entry is
    /// removed and reported as a miss.
    pub async fn get(&self, key: &str) -> Option<Vec<ScoredResult>> {
        let now = Instant::now();
        let mut entries = self.entries.lock().await;

        let expired = match entries.peek(key) {
            None => {
                Counters::bump(&self.counters.misses);
                trace!(key, "Cache miss");
                return None;
            }
            Some(entry) => now.duration_since(entry.created_at) >= self.ttl,
        };

        if expired {
            entries.pop(key);
            Counters::bump(&self.counters.expirations);
            Counters::bump(&self.counters.misses);
            debug!(
                subsystem = "search",
                component = "cache",
                key,
                "Cache entry expired"
            );
            return None;
        }

        let entry = entries.get_mut(key)?;
        entry.last_access = now;
        Counters::bump(&self.counters.hits);
        trace!(key, "Cache hit");
        Some(entry.results.clone())
    }

    /// Insert or replace `key`. At capacity the least recently accessed
    /// other entry is evicted first.
    pub async fn put(&self, key: String, results: Vec<ScoredResult>) {
        let now = Instant::now();
        let entry = CacheEntry {
            key: key.clone(),
            results,
            created_at: now,
            last_access: now,
        };

        let mut entries = self.entries.lock().await;
        if let Some((evicted, _)) = entries.push(key.clone(), entry) {
            if evicted != key {
                Counters::bump(&self.counters.evictions);
                debug!(
                    subsystem = "search",
                    component = "cache",
                    evicted_key = %evicted,
                    "Cache entry evicted (LRU)"
                );
            }
        }
    }

    /// Remove one entry. Returns whether it was present.
    pub async fn invalidate(&self, key: &str) -> bool {
        self.entries.lock().await.pop(key).is_some()
    }

    /// Remove every entry and reset counters.
    pub async fn clear(&self) {
        self.entries.lock().await.clear();
        self.counters.reset();
    }

    /// Entries currently held, including stale ones not yet looked up.
    pub async fn len(&self) -> usize {
        self.entries.lock().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }

    pub async fn contains(&self, key: &str) -> bool {
        self.entries.lock().await.contains(key)
    }

    pub async fn stats(&self) -> CacheStats {
        CacheStats {
            hits: self.counters.hits.load(Ordering::Relaxed),
            misses: self.counters.misses.load(Ordering::Relaxed),
            evictions: self.counters.evictions.load(Ordering::Relaxed),
            expirations: self.counters.expirations.load(Ordering::Relaxed),
            size: self.len().await,
            capacity: self.capacity.get(),
        }
    }
}
