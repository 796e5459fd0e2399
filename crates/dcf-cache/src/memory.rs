//! In-memory cache implementation.

use async_trait::async_trait;
use chrono::Utc;
use dcf_core::{DEFAULT_MAX_SIZE_BYTES, DcfError, FinancialCache, Result};
use serde_json::Value;
use std::collections::HashMap;
use std::time::Duration;
use tokio::sync::RwLock;
use tracing::{debug, instrument};

/// Cache entry with timestamp for TTL-based invalidation and eviction order.
#[derive(Debug, Clone)]
struct CacheEntry {
    value: Value,
    size_bytes: u64,
    cached_at: chrono::DateTime<Utc>,
    sequence: u64,
}

impl CacheEntry {
    fn is_stale(&self, ttl: Duration) -> bool {
        let age = Utc::now().signed_duration_since(self.cached_at);
        age > chrono::TimeDelta::from_std(ttl).unwrap_or(chrono::TimeDelta::MAX)
    }
}

#[derive(Debug, Default)]
struct Entries {
    map: HashMap<String, CacheEntry>,
    used_bytes: u64,
    next_sequence: u64,
}

impl Entries {
    fn remove(&mut self, key: &str) {
        if let Some(entry) = self.map.remove(key) {
            self.used_bytes = self.used_bytes.saturating_sub(entry.size_bytes);
        }
    }

    fn oldest_key(&self) -> Option<String> {
        self.map
            .iter()
            .min_by_key(|(_, entry)| entry.sequence)
            .map(|(key, _)| key.clone())
    }
}

/// Simple in-memory cache for testing and development.
///
/// Data is stored in a `RwLock`-protected `HashMap` and is lost when the cache
/// is dropped. Capacity accounting matches [`SqliteCache`](crate::SqliteCache):
/// the serialized JSON length of each value counts against the cap, oldest
/// entries are evicted first, and oversized values are dropped.
#[derive(Debug)]
pub struct InMemoryCache {
    entries: RwLock<Entries>,
    max_size_bytes: u64,
}

impl Default for InMemoryCache {
    fn default() -> Self {
        Self {
            entries: RwLock::new(Entries::default()),
            max_size_bytes: DEFAULT_MAX_SIZE_BYTES,
        }
    }
}

impl InMemoryCache {
    /// Create a new empty in-memory cache with the default capacity.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a new empty in-memory cache holding at most `max_size_bytes`.
    ///
    /// # Errors
    /// Returns a validation error if `max_size_bytes` is zero.
    pub fn with_capacity(max_size_bytes: u64) -> Result<Self> {
        if max_size_bytes == 0 {
            return Err(DcfError::validation("Invalid max cache size: must be > 0"));
        }
        Ok(Self {
            entries: RwLock::new(Entries::default()),
            max_size_bytes,
        })
    }

    /// Returns the number of cached entries.
    pub async fn len(&self) -> usize {
        self.entries.read().await.map.len()
    }

    /// Returns true if nothing is cached.
    pub async fn is_empty(&self) -> bool {
        self.entries.read().await.map.is_empty()
    }
}

#[async_trait]
impl FinancialCache for InMemoryCache {
    #[instrument(skip(self))]
    async fn get(&self, key: &str) -> Result<Option<Value>> {
        let entries = self.entries.read().await;
        match entries.map.get(key) {
            Some(entry) => {
                debug!("Cache hit");
                Ok(Some(entry.value.clone()))
            }
            None => {
                debug!("Cache miss");
                Ok(None)
            }
        }
    }

    #[instrument(skip(self, value))]
    async fn put(&self, key: &str, value: &Value) -> Result<()> {
        let size_bytes = value.to_string().len() as u64;
        if size_bytes > self.max_size_bytes {
            debug!(size_bytes, "Value exceeds cache capacity, not cached");
            return Ok(());
        }

        let mut entries = self.entries.write().await;
        entries.remove(key);

        while entries.used_bytes + size_bytes > self.max_size_bytes {
            match entries.oldest_key() {
                Some(oldest) => entries.remove(&oldest),
                None => break,
            }
        }

        let sequence = entries.next_sequence;
        entries.next_sequence += 1;
        entries.used_bytes += size_bytes;
        entries.map.insert(
            key.to_string(),
            CacheEntry {
                value: value.clone(),
                size_bytes,
                cached_at: Utc::now(),
                sequence,
            },
        );
        Ok(())
    }

    #[instrument(skip(self))]
    async fn invalidate_stale(&self, ttl: Duration) -> Result<usize> {
        let mut entries = self.entries.write().await;
        let stale: Vec<String> = entries
            .map
            .iter()
            .filter(|(_, entry)| entry.is_stale(ttl))
            .map(|(key, _)| key.clone())
            .collect();

        for key in &stale {
            entries.remove(key);
        }

        if !stale.is_empty() {
            debug!("Invalidated {} stale cache entries", stale.len());
        }
        Ok(stale.len())
    }

    async fn clear(&self) -> Result<()> {
        let mut entries = self.entries.write().await;
        entries.map.clear();
        entries.used_bytes = 0;
        debug!("Cleared all cache entries");
        Ok(())
    }

    async fn size_bytes(&self) -> Result<u64> {
        Ok(self.entries.read().await.used_bytes)
    }

    fn max_size_bytes(&self) -> u64 {
        self.max_size_bytes
    }
}
