//! In-memory response cache
//!
//! Time-boxed memoization keyed by a logical request fingerprint. An entry
//! older than the freshness window is treated as absent and evicted lazily
//! on the next access. Concurrent puts to the same key are last-writer-wins.

use dashmap::DashMap;
use serde_json::Value;
use std::time::{Duration, Instant};

/// Default freshness window (5 minutes)
pub const DEFAULT_TTL: Duration = Duration::from_secs(300);

#[derive(Debug, Clone)]
struct CacheEntry {
    value: Value,
    stored_at: Instant,
}

/// Thread-safe TTL cache for normalized upstream responses
#[derive(Debug)]
pub struct ResponseCache {
    entries: DashMap<String, CacheEntry>,
    ttl: Duration,
}

impl ResponseCache {
    /// Create a cache with an explicit freshness window
    pub fn new(ttl: Duration) -> Self {
        Self {
            entries: DashMap::new(),
            ttl,
        }
    }

    /// Create a cache with the default 5-minute freshness window
    pub fn with_default_ttl() -> Self {
        Self::new(DEFAULT_TTL)
    }

    /// Get a cached value if present and fresh. Stale entries are discarded.
    pub fn get(&self, key: &str) -> Option<Value> {
        {
            let entry = self.entries.get(key)?;
            if entry.stored_at.elapsed() < self.ttl {
                tracing::debug!("Cache hit: {}", key);
                return Some(entry.value.clone());
            }
            // Guard must be dropped before removal to avoid deadlock
        }

        self.entries
            .remove_if(key, |_, entry| entry.stored_at.elapsed() >= self.ttl);
        None
    }

    /// Store a value, unconditionally overwriting any prior entry
    pub fn put(&self, key: &str, value: Value) {
        tracing::debug!("Cached: {}", key);
        self.entries.insert(
            key.to_string(),
            CacheEntry {
                value,
                stored_at: Instant::now(),
            },
        );
    }

    /// Number of resident entries (including stale ones), for tests
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Cache key for a quote request. Symbols canonicalize to uppercase so
/// "aapl" and "AAPL" share one entry.
pub fn quote_key(symbol: &str) -> String {
    format!("quote:{}", symbol.trim().to_uppercase())
}

/// Cache key for a daily time-series request
pub fn timeseries_key(symbol: &str) -> String {
    format!("timeseries:{}", symbol.trim().to_uppercase())
}

/// Cache key for a symbol search. Queries canonicalize to lowercase.
pub fn search_key(query: &str) -> String {
    format!("search:{}", query.trim().to_lowercase())
}
