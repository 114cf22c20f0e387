//! Connection pool for the chunk stores.

use std::time::{Duration, Instant};

use sqlx::postgres::{PgPool, PgPoolOptions};
use tracing::info;

use sift_core::{defaults, Error, Result};

/// Pool size and connection wait. The stores only read, so nothing else is tuned.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PoolConfig {
    pub max_connections: u32,
    pub acquire_timeout: Duration,
}

impl Default for PoolConfig {
    fn default() -> Self {
        Self {
            max_connections: defaults::DB_MAX_CONNECTIONS,
            acquire_timeout: Duration::from_millis(defaults::DB_ACQUIRE_TIMEOUT_MS),
        }
    }
}

impl PoolConfig {
    /// Read `SIFT_DB_MAX_CONNECTIONS` and `SIFT_DB_ACQUIRE_TIMEOUT_MS`.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let mut config = Self::default();
        if let Some(raw) = lookup("SIFT_DB_MAX_CONNECTIONS") {
            config.max_connections = parse_positive("SIFT_DB_MAX_CONNECTIONS", &raw)?;
        }
        if let Some(raw) = lookup("SIFT_DB_ACQUIRE_TIMEOUT_MS") {
            let ms: u64 = parse_positive("SIFT_DB_ACQUIRE_TIMEOUT_MS", &raw)?;
            config.acquire_timeout = Duration::from_millis(ms);
        }
        Ok(config)
    }

    pub fn with_max_connections(mut self, n: u32) -> Self {
        self.max_connections = n;
        self
    }

    pub fn with_acquire_timeout(mut self, timeout: Duration) -> Self {
        self.acquire_timeout = timeout;
        self
    }
}

fn parse_positive<T>(name: &str, raw: &str) -> Result<T>
where
    T: std::str::FromStr + PartialOrd + Default,
{
    match raw.trim().parse::<T>() {
        Ok(v) if v > T::default() => Ok(v),
        _ => Err(Error::Config(format!(
            "{name}: expected a positive integer, got {raw:?}"
        ))),
    }
}

/// Open a pool and wait for the first connection.
pub async fn open_pool(database_url: &str, config: &PoolConfig) -> Result<PgPool> {
    let start = Instant::now();

    let pool = PgPoolOptions::new()
        .max_connections(config.max_connections)
        .acquire_timeout(config.acquire_timeout)
        .connect(database_url)
        .await
        .map_err(Error::Database)?;

    info!(
        subsystem = "db",
        component = "pool",
        max_connections = config.max_connections,
        acquire_timeout_ms = config.acquire_timeout.as_millis() as u64,
        duration_ms = start.elapsed().as_millis() as u64,
        "Retrieval pool ready"
    );
    Ok(pool)
}
