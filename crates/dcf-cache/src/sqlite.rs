//! SQLite-based cache implementation.

use async_trait::async_trait;
use chrono::Utc;
use dcf_core::{DEFAULT_MAX_SIZE_BYTES, DcfError, FinancialCache, Result};
use rusqlite::{Connection, OptionalExtension, params};
use serde_json::Value;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use std::time::Duration;
use tracing::{debug, instrument};

/// File name of the cache database inside the cache directory.
pub const CACHE_FILE_NAME: &str = "financial-cache.db";

fn cache_error(e: rusqlite::Error) -> DcfError {
    DcfError::data("Financial cache operation failed").with_cause(e)
}

fn lock_error<T>(e: std::sync::PoisonError<T>) -> DcfError {
    DcfError::data("Financial cache lock poisoned").with_cause(e.to_string())
}

/// SQLite-based key/value cache for financial data.
///
/// Values are stored as JSON text in a SQLite database file inside the cache
/// directory, so the cache survives application restarts. The total payload is
/// capped at `max_size_bytes`; oldest entries are evicted to make room, and a
/// single value larger than the whole capacity is dropped without error.
#[derive(Debug)]
pub struct SqliteCache {
    conn: Mutex<Connection>,
    max_size_bytes: u64,
    path: Option<PathBuf>,
}

impl SqliteCache {
    /// Opens (or creates) a cache in `dir` with the default 4 GB capacity.
    ///
    /// # Errors
    /// See [`SqliteCache::open`].
    pub fn open_default(dir: impl AsRef<Path>) -> Result<Self> {
        Self::open(dir, DEFAULT_MAX_SIZE_BYTES)
    }

    /// Opens (or creates) a cache in `dir`.
    ///
    /// # Arguments
    /// * `dir` - Directory holding the cache database; created if missing
    /// * `max_size_bytes` - Maximum total payload size in bytes
    ///
    /// # Errors
    /// Returns a file system error if the directory cannot be created, a
    /// validation error if `max_size_bytes` is zero, and a data error if the
    /// database cannot be opened.
    pub fn open(dir: impl AsRef<Path>, max_size_bytes: u64) -> Result<Self> {
        let dir = dir.as_ref();
        if dir.as_os_str().is_empty() {
            return Err(DcfError::file_system(
                "Can't create cache directory: path is empty",
            ));
        }

        std::fs::create_dir_all(dir).map_err(|e| {
            DcfError::file_system(format!("Can't create directory: {}", dir.display()))
                .with_cause(e)
        })?;

        validate_capacity(max_size_bytes)?;

        let path = dir.join(CACHE_FILE_NAME);
        let conn = Connection::open(&path).map_err(cache_error)?;
        let cache = Self {
            conn: Mutex::new(conn),
            max_size_bytes,
            path: Some(path),
        };
        cache.initialize_schema()?;
        debug!(path = %dir.display(), max_size_bytes, "Cache was initialized");
        Ok(cache)
    }

    /// Create an in-memory SQLite cache.
    ///
    /// Useful for testing; data is lost when the cache is dropped.
    ///
    /// # Errors
    /// Returns an error if `max_size_bytes` is zero or schema creation fails.
    pub fn in_memory(max_size_bytes: u64) -> Result<Self> {
        validate_capacity(max_size_bytes)?;
        let conn = Connection::open_in_memory().map_err(cache_error)?;
        let cache = Self {
            conn: Mutex::new(conn),
            max_size_bytes,
            path: None,
        };
        cache.initialize_schema()?;
        Ok(cache)
    }

    /// Returns the database file path, or `None` for in-memory caches.
    #[must_use]
    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    /// Initialize the database schema.
    fn initialize_schema(&self) -> Result<()> {
        let conn = self.conn.lock().map_err(lock_error)?;

        conn.execute(
            "CREATE TABLE IF NOT EXISTS kv_cache (
                key TEXT NOT NULL PRIMARY KEY,
                value_json TEXT NOT NULL,
                size_bytes INTEGER NOT NULL,
                cached_at TEXT NOT NULL
            )",
            [],
        )
        .map_err(cache_error)?;

        conn.execute(
            "CREATE INDEX IF NOT EXISTS idx_kv_cache_cached_at ON kv_cache(cached_at)",
            [],
        )
        .map_err(cache_error)?;

        debug!("SQLite cache schema initialized");
        Ok(())
    }
}

fn validate_capacity(max_size_bytes: u64) -> Result<()> {
    if max_size_bytes == 0 {
        return Err(DcfError::validation("Invalid max cache size: must be > 0"));
    }
    Ok(())
}

fn to_sql_size(size: u64) -> i64 {
    i64::try_from(size).unwrap_or(i64::MAX)
}

fn from_sql_size(size: i64) -> u64 {
    u64::try_from(size).unwrap_or(0)
}

#[async_trait]
impl FinancialCache for SqliteCache {
    #[instrument(skip(self))]
    async fn get(&self, key: &str) -> Result<Option<Value>> {
        let conn = self.conn.lock().map_err(lock_error)?;

        let result = conn
            .query_row(
                "SELECT value_json FROM kv_cache WHERE key = ?1",
                params![key],
                |row| row.get::<_, String>(0),
            )
            .optional()
            .map_err(cache_error)?;

        match result {
            Some(json) => {
                let value: Value = serde_json::from_str(&json).map_err(|e| {
                    DcfError::validation(format!("Cached value for '{key}' is malformed"))
                        .with_cause(e)
                })?;
                debug!("Cache hit");
                Ok(Some(value))
            }
            None => {
                debug!("{key} not found inside cache");
                Ok(None)
            }
        }
    }

    #[instrument(skip(self, value))]
    async fn put(&self, key: &str, value: &Value) -> Result<()> {
        let json = value.to_string();
        let size = json.len() as u64;

        if size > self.max_size_bytes {
            debug!(
                size,
                max_size_bytes = self.max_size_bytes,
                "Value exceeds cache capacity, not cached"
            );
            return Ok(());
        }

        let cached_at = Utc::now().to_rfc3339();
        let conn = self.conn.lock().map_err(lock_error)?;
        let tx = conn.unchecked_transaction().map_err(cache_error)?;

        tx.execute("DELETE FROM kv_cache WHERE key = ?1", params![key])
            .map_err(cache_error)?;

        let mut used = from_sql_size(
            tx.query_row(
                "SELECT COALESCE(SUM(size_bytes), 0) FROM kv_cache",
                [],
                |row| row.get::<_, i64>(0),
            )
            .map_err(cache_error)?,
        );

        let mut evicted = 0usize;
        while used + size > self.max_size_bytes {
            let oldest = tx
                .query_row(
                    "SELECT key, size_bytes FROM kv_cache ORDER BY cached_at ASC, rowid ASC LIMIT 1",
                    [],
                    |row| Ok((row.get::<_, String>(0)?, row.get::<_, i64>(1)?)),
                )
                .optional()
                .map_err(cache_error)?;

            let Some((oldest_key, oldest_size)) = oldest else {
                break;
            };
            tx.execute("DELETE FROM kv_cache WHERE key = ?1", params![oldest_key])
                .map_err(cache_error)?;
            used = used.saturating_sub(from_sql_size(oldest_size));
            evicted += 1;
        }

        tx.execute(
            "INSERT INTO kv_cache (key, value_json, size_bytes, cached_at)
             VALUES (?1, ?2, ?3, ?4)",
            params![key, json, to_sql_size(size), cached_at],
        )
        .map_err(cache_error)?;

        tx.commit().map_err(cache_error)?;

        if evicted > 0 {
            debug!(evicted, "Evicted cache entries to make room");
        }
        debug!(size, "Cached value");
        Ok(())
    }

    #[instrument(skip(self))]
    async fn invalidate_stale(&self, ttl: Duration) -> Result<usize> {
        let cutoff = Utc::now()
            - chrono::Duration::from_std(ttl).map_err(|e| {
                DcfError::validation(format!("Invalid TTL duration: {ttl:?}")).with_cause(e)
            })?;
        let cutoff_str = cutoff.to_rfc3339();

        let conn = self.conn.lock().map_err(lock_error)?;

        let deleted = conn
            .execute(
                "DELETE FROM kv_cache WHERE cached_at < ?1",
                params![cutoff_str],
            )
            .map_err(cache_error)?;

        if deleted > 0 {
            debug!("Invalidated {} stale cache entries", deleted);
        }

        Ok(deleted)
    }

    #[instrument(skip(self))]
    async fn clear(&self) -> Result<()> {
        let conn = self.conn.lock().map_err(lock_error)?;

        conn.execute("DELETE FROM kv_cache", [])
            .map_err(cache_error)?;

        debug!("Cleared all cache entries");
        Ok(())
    }

    async fn size_bytes(&self) -> Result<u64> {
        let conn = self.conn.lock().map_err(lock_error)?;

        let used = conn
            .query_row(
                "SELECT COALESCE(SUM(size_bytes), 0) FROM kv_cache",
                [],
                |row| row.get::<_, i64>(0),
            )
            .map_err(cache_error)?;

        Ok(from_sql_size(used))
    }

    fn max_size_bytes(&self) -> u64 {
        self.max_size_bytes
    }
}
