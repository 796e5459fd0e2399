//! Read-through caching in front of a data provider.

use std::collections::BTreeMap;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::NaiveDate;
use dcf_core::{
    DataProvider, FinancialCache, FinancialDataProvider, Result, StatementKind, StatementRecord,
    Symbol,
    cache::{get_typed, put_typed},
};
use tracing::{debug, instrument, warn};

/// A provider that answers statement and metric requests from a cache,
/// fetching from the wrapped provider on a miss.
///
/// Statements are cached under `{TICKER}-{statement code}-{year}` and metrics
/// under `{TICKER}-{tag}-{year}`. Daily prices always go to the wrapped
/// provider. A cache that fails to read or write is logged and bypassed.
///
/// # Example
///
/// ```rust,ignore
/// use std::sync::Arc;
/// use dcf::{CachedProvider, IntrinioProvider, SqliteCache};
///
/// let cache = Arc::new(SqliteCache::open_default("./financial-data/")?);
/// let provider = CachedProvider::new(IntrinioProvider::new("key"), cache);
/// ```
pub struct CachedProvider<P> {
    inner: P,
    cache: Arc<dyn FinancialCache>,
}

impl<P: std::fmt::Debug> std::fmt::Debug for CachedProvider<P> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CachedProvider")
            .field("inner", &self.inner)
            .field("cache_max_size_bytes", &self.cache.max_size_bytes())
            .finish()
    }
}

impl<P> CachedProvider<P> {
    /// Wraps `inner` with `cache`.
    pub fn new(inner: P, cache: Arc<dyn FinancialCache>) -> Self {
        Self { inner, cache }
    }

    /// The wrapped provider.
    pub fn inner(&self) -> &P {
        &self.inner
    }

    /// The cache in front of the provider.
    pub fn cache(&self) -> &Arc<dyn FinancialCache> {
        &self.cache
    }
}

/// Cache key of a fiscal-year statement.
pub fn statement_key(symbol: &Symbol, kind: StatementKind, year: i32) -> String {
    format!("{}-{}-{year}", symbol.as_str(), kind.code())
}

/// Cache key of a fiscal-year metric.
pub fn metric_key(symbol: &Symbol, tag: &str, year: i32) -> String {
    format!("{}-{tag}-{year}", symbol.as_str())
}

impl<P: FinancialDataProvider> CachedProvider<P> {
    async fn read<T: serde::de::DeserializeOwned>(&self, key: &str) -> Option<T> {
        match get_typed(self.cache.as_ref(), key).await {
            Ok(Some(value)) => {
                debug!(key, "Cache hit");
                Some(value)
            }
            Ok(None) => {
                debug!(key, "Cache miss");
                None
            }
            Err(e) => {
                warn!(key, error = %e, "Failed to read from cache");
                None
            }
        }
    }

    async fn write<T: serde::Serialize + Sync>(&self, key: &str, value: &T) {
        if let Err(e) = put_typed(self.cache.as_ref(), key, value).await {
            warn!(key, error = %e, "Failed to write to cache");
        }
    }
}

impl<P: DataProvider> DataProvider for CachedProvider<P> {
    fn name(&self) -> &str {
        self.inner.name()
    }

    fn description(&self) -> &str {
        self.inner.description()
    }
}

#[async_trait]
impl<P: FinancialDataProvider> FinancialDataProvider for CachedProvider<P> {
    #[instrument(skip(self), fields(provider = self.inner.name()))]
    async fn fetch_statement(
        &self,
        symbol: &Symbol,
        kind: StatementKind,
        year: i32,
    ) -> Result<StatementRecord> {
        let key = statement_key(symbol, kind, year);
        if let Some(record) = self.read(&key).await {
            return Ok(record);
        }

        let record = self.inner.fetch_statement(symbol, kind, year).await?;
        self.write(&key, &record).await;
        Ok(record)
    }

    #[instrument(skip(self), fields(provider = self.inner.name()))]
    async fn fetch_metric(&self, symbol: &Symbol, tag: &str, year: i32) -> Result<f64> {
        let key = metric_key(symbol, tag, year);
        if let Some(value) = self.read(&key).await {
            return Ok(value);
        }

        let value = self.inner.fetch_metric(symbol, tag, year).await?;
        self.write(&key, &value).await;
        Ok(value)
    }

    async fn fetch_daily_close_prices(
        &self,
        symbol: &Symbol,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<BTreeMap<NaiveDate, f64>> {
        self.inner.fetch_daily_close_prices(symbol, start, end).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use dcf_cache::InMemoryCache;
    use dcf_core::{DcfError, tags};
    use serde_json::Value;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    #[derive(Debug, Default)]
    struct CountingProvider {
        calls: AtomicUsize,
    }

    impl CountingProvider {
        fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    impl DataProvider for CountingProvider {
        fn name(&self) -> &str {
            "counting"
        }

        fn description(&self) -> &str {
            "Counts upstream calls"
        }
    }

    #[async_trait]
    impl FinancialDataProvider for CountingProvider {
        async fn fetch_statement(
            &self,
            _symbol: &Symbol,
            _kind: StatementKind,
            year: i32,
        ) -> Result<StatementRecord> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if year < 2010 {
                return Err(DcfError::data("no statement"));
            }
            Ok([(tags::NET_INCOME.to_string(), f64::from(year))]
                .into_iter()
                .collect())
        }

        async fn fetch_metric(&self, _symbol: &Symbol, _tag: &str, _year: i32) -> Result<f64> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(1000.0)
        }

        async fn fetch_daily_close_prices(
            &self,
            _symbol: &Symbol,
            start: NaiveDate,
            _end: NaiveDate,
        ) -> Result<BTreeMap<NaiveDate, f64>> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok([(start, 150.0)].into_iter().collect())
        }
    }

    /// A cache whose every operation fails.
    struct BrokenCache;

    #[async_trait]
    impl FinancialCache for BrokenCache {
        async fn get(&self, _key: &str) -> Result<Option<Value>> {
            Err(DcfError::data("cache unavailable"))
        }

        async fn put(&self, _key: &str, _value: &Value) -> Result<()> {
            Err(DcfError::data("cache unavailable"))
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

    #[test]
    fn test_cache_keys() {
        let symbol = Symbol::new("aapl");
        assert_eq!(
            statement_key(&symbol, StatementKind::CashFlowStatement, 2018),
            "AAPL-cash_flow_statement-2018"
        );
        assert_eq!(
            metric_key(&symbol, tags::ADJUSTED_DILUTED_EPS, 2018),
            "AAPL-adjdilutedeps-2018"
        );
    }

    #[tokio::test]
    async fn test_statements_served_from_cache() {
        let cache = Arc::new(InMemoryCache::new());
        let provider = CachedProvider::new(CountingProvider::default(), cache.clone());
        let symbol = Symbol::new("AAPL");

        let first = provider
            .historical_cashflow_stmt(&symbol, 2014, 2018, None)
            .await
            .unwrap();
        let second = provider
            .historical_cashflow_stmt(&symbol, 2014, 2018, None)
            .await
            .unwrap();

        assert_eq!(first, second);
        assert_eq!(provider.inner().calls(), 5);
        assert_eq!(cache.len().await, 5);
    }

    #[tokio::test]
    async fn test_metrics_served_from_cache() {
        let provider =
            CachedProvider::new(CountingProvider::default(), Arc::new(InMemoryCache::new()));
        let symbol = Symbol::new("AAPL");

        for _ in 0..3 {
            let shares = provider.outstanding_diluted_shares(&symbol, 2018).await.unwrap();
            assert_eq!(shares, 1000.0);
        }
        assert_eq!(provider.inner().calls(), 1);
    }

    #[tokio::test]
    async fn test_prices_are_not_cached() {
        let provider =
            CachedProvider::new(CountingProvider::default(), Arc::new(InMemoryCache::new()));
        let symbol = Symbol::new("AAPL");
        let as_of = NaiveDate::from_ymd_opt(2019, 1, 4).unwrap();

        provider.latest_close_price(&symbol, as_of).await.unwrap();
        provider.latest_close_price(&symbol, as_of).await.unwrap();
        assert_eq!(provider.inner().calls(), 2);
    }

    #[tokio::test]
    async fn test_errors_are_not_cached() {
        let cache = Arc::new(InMemoryCache::new());
        let provider = CachedProvider::new(CountingProvider::default(), cache.clone());
        let symbol = Symbol::new("AAPL");

        let result = provider
            .fetch_statement(&symbol, StatementKind::CashFlowStatement, 2005)
            .await;
        assert!(matches!(result, Err(DcfError::Data { .. })));
        assert!(cache.is_empty().await);
    }

    #[tokio::test]
    async fn test_broken_cache_falls_back_to_provider() {
        let provider = CachedProvider::new(CountingProvider::default(), Arc::new(BrokenCache));
        let symbol = Symbol::new("AAPL");

        let record = provider
            .fetch_statement(&symbol, StatementKind::CashFlowStatement, 2018)
            .await
            .unwrap();
        assert_eq!(record[tags::NET_INCOME], 2018.0);

        provider
            .fetch_statement(&symbol, StatementKind::CashFlowStatement, 2018)
            .await
            .unwrap();
        assert_eq!(provider.inner().calls(), 2);
        assert_eq!(provider.name(), "counting");
    }
}
