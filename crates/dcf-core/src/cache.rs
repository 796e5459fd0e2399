//! Cache trait for storing fetched financial data.
//!
//! This module defines the [`FinancialCache`] trait, a key/value store placed in
//! front of a data provider to avoid repeat network calls. Values are stored as
//! JSON so that statements, metrics and any other serializable data share one
//! backend.

use async_trait::async_trait;
use serde::{Serialize, de::DeserializeOwned};
use serde_json::Value;
use std::time::Duration;

use crate::error::{DcfError, Result};

/// Default cache capacity: 4 GB.
pub const DEFAULT_MAX_SIZE_BYTES: u64 = 4_000_000_000;

/// Trait for caching fetched financial data.
///
/// Implementations are bounded by a byte capacity. A write whose payload does
/// not fit in the capacity is dropped silently: `put` still returns `Ok(())`
/// and a later `get` returns `Ok(None)`.
#[async_trait]
pub trait FinancialCache: Send + Sync {
    /// Retrieves a cached value.
    ///
    /// Returns `Ok(Some(value))` if cached, `Ok(None)` if not cached.
    async fn get(&self, key: &str) -> Result<Option<Value>>;

    /// Stores a value, replacing any previous value under the same key.
    async fn put(&self, key: &str, value: &Value) -> Result<()>;

    /// Removes cache entries older than the specified TTL.
    ///
    /// Returns the number of entries invalidated.
    async fn invalidate_stale(&self, ttl: Duration) -> Result<usize>;

    /// Clears all cached data.
    async fn clear(&self) -> Result<()>;

    /// Returns the number of payload bytes currently stored.
    async fn size_bytes(&self) -> Result<u64>;

    /// Returns the configured capacity in bytes.
    fn max_size_bytes(&self) -> u64;
}

/// Reads a typed value from a cache.
///
/// # Errors
/// Returns a validation error if the cached JSON does not match `T`.
pub async fn get_typed<T: DeserializeOwned>(
    cache: &dyn FinancialCache,
    key: &str,
) -> Result<Option<T>> {
    match cache.get(key).await? {
        Some(value) => serde_json::from_value(value).map(Some).map_err(|e| {
            DcfError::validation(format!("Cached value for '{key}' is malformed")).with_cause(e)
        }),
        None => Ok(None),
    }
}

/// Writes a typed value to a cache.
///
/// # Errors
/// Returns a validation error if `value` cannot be serialized.
pub async fn put_typed<T: Serialize + Sync>(
    cache: &dyn FinancialCache,
    key: &str,
    value: &T,
) -> Result<()> {
    let value = serde_json::to_value(value).map_err(|e| {
        DcfError::validation(format!("Value for '{key}' cannot be cached")).with_cause(e)
    })?;
    cache.put(key, &value).await
}
