//! No-op cache implementation.

use async_trait::async_trait;
use dcf_core::{FinancialCache, Result};
use serde_json::Value;
use std::time::Duration;
use tracing::trace;

/// A no-op cache that doesn't store anything.
///
/// `get` always returns `Ok(None)` and `put` always returns `Ok(())`.
/// Used when caching is disabled from the command line.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopCache;

impl NoopCache {
    /// Create a new no-op cache.
    #[must_use]
    pub const fn new() -> Self {
        Self
    }
}

#[async_trait]
impl FinancialCache for NoopCache {
    async fn get(&self, _key: &str) -> Result<Option<Value>> {
        trace!("NoopCache: get called, returning None");
        Ok(None)
    }

    async fn put(&self, _key: &str, _value: &Value) -> Result<()> {
        trace!("NoopCache: put called, doing nothing");
        Ok(())
    }

    async fn invalidate_stale(&self, _ttl: Duration) -> Result<usize> {
        Ok(0)
    }

    async fn clear(&self) -> Result<()> {
        Ok(())
    }

    async fn size_bytes(&self) -> Result<u64> {
        Ok(0)
    }

    fn max_size_bytes(&self) -> u64 {
        0
    }
}
