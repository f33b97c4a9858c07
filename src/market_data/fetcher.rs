use std::sync::Arc;

use async_trait::async_trait;
use tracing::{info, warn};

use crate::error::DataUnavailable;
use crate::market_data::{CacheKey, PriceCache, PriceSeries};
use crate::types::Period;

/// A remote source of daily adjusted closes.
#[async_trait]
pub trait PriceSource: Send + Sync {
    async fn daily_adjusted_closes(
        &self,
        ticker: &str,
        period: Period,
    ) -> Result<PriceSeries, DataUnavailable>;
}

/// Memoising front for a [`PriceSource`].
///
/// Both collaborators are injected so tests can swap in a fake source and
/// control cache contents directly.
#[derive(Clone)]
pub struct DataFetcher {
    source: Arc<dyn PriceSource>,
    cache: Arc<PriceCache>,
}

impl DataFetcher {
    pub fn new(source: Arc<dyn PriceSource>, cache: Arc<PriceCache>) -> Self {
        Self { source, cache }
    }

    pub fn cache(&self) -> &Arc<PriceCache> {
        &self.cache
    }

    /// Return the series for `(ticker, period)`, hitting the source only on a
    /// cache miss. Failures are never cached, so the next call retries.
    pub async fn fetch(
        &self,
        ticker: &str,
        period: Period,
    ) -> Result<Arc<PriceSeries>, DataUnavailable> {
        let key = CacheKey::new(ticker, period);
        if let Some(series) = self.cache.get(&key) {
            return Ok(series);
        }

        let series = match self.source.daily_adjusted_closes(ticker, period).await {
            Ok(s) if s.is_empty() => {
                return Err(DataUnavailable::new(ticker, "provider returned no prices"));
            }
            Ok(s) => Arc::new(s),
            Err(e) => {
                warn!(ticker, period = %period, reason = %e.reason, "price fetch failed");
                return Err(e);
            }
        };

        info!(ticker, period = %period, points = series.len(), "price series fetched and cached");
        self.cache.insert(key, series.clone());
        Ok(series)
    }
}

impl std::fmt::Debug for DataFetcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DataFetcher")
            .field("cache", &self.cache)
            .finish()
    }
}

// =============================================================================
// Tests
// =============================================================================
#[cfg(test)]
pub(crate) mod tests {
    use std::collections::HashMap;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use super::*;
    use crate::market_data::series::tests::series_from;

    /// In-memory source that counts every call.
    #[derive(Default)]
    pub(crate) struct FakeSource {
        pub(crate) series: HashMap<String, PriceSeries>,
        pub(crate) calls: AtomicUsize,
    }

    impl FakeSource {
        pub(crate) fn with(ticker: &str, closes: &[f64]) -> Self {
            let mut series = HashMap::new();
            series.insert(ticker.to_string(), series_from(closes));
            Self {
                series,
                calls: AtomicUsize::new(0),
            }
        }

        pub(crate) fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl PriceSource for FakeSource {
        async fn daily_adjusted_closes(
            &self,
            ticker: &str,
            _period: Period,
        ) -> Result<PriceSeries, DataUnavailable> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.series
                .get(ticker)
                .cloned()
                .ok_or_else(|| DataUnavailable::new(ticker, "No data found, symbol may be delisted"))
        }
    }

    fn fetcher_with(source: Arc<FakeSource>) -> DataFetcher {
        DataFetcher::new(source, Arc::new(PriceCache::unbounded()))
    }

    #[tokio::test]
    async fn second_fetch_is_served_from_cache() {
        let source = Arc::new(FakeSource::with("SPY", &[100.0, 101.0, 102.0]));
        let fetcher = fetcher_with(source.clone());

        let first = fetcher.fetch("SPY", Period::TwoYears).await.unwrap();
        let second = fetcher.fetch("SPY", Period::TwoYears).await.unwrap();

        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(*first, *second);
        assert_eq!(source.calls(), 1);
    }

    #[tokio::test]
    async fn different_period_is_a_new_fetch() {
        let source = Arc::new(FakeSource::with("SPY", &[100.0, 101.0]));
        let fetcher = fetcher_with(source.clone());

        fetcher.fetch("SPY", Period::OneYear).await.unwrap();
        fetcher.fetch("SPY", Period::FiveYears).await.unwrap();
        assert_eq!(source.calls(), 2);
    }

    #[tokio::test]
    async fn failures_are_not_cached() {
        let source = Arc::new(FakeSource::default());
        let fetcher = fetcher_with(source.clone());

        let err = fetcher.fetch("ZZZINVALID", Period::OneYear).await.unwrap_err();
        assert_eq!(err.ticker, "ZZZINVALID");
        assert!(fetcher.fetch("ZZZINVALID", Period::OneYear).await.is_err());
        assert_eq!(source.calls(), 2);
        assert!(fetcher.cache().is_empty());
    }

    #[tokio::test]
    async fn empty_series_is_data_unavailable() {
        let source = Arc::new(FakeSource::with("EMPTY", &[]));
        let fetcher = fetcher_with(source);
        let err = fetcher.fetch("EMPTY", Period::OneYear).await.unwrap_err();
        assert!(err.reason.contains("no prices"));
    }

    #[tokio::test]
    async fn invalidation_forces_refetch() {
        let source = Arc::new(FakeSource::with("SPY", &[1.0, 2.0]));
        let fetcher = fetcher_with(source.clone());

        fetcher.fetch("SPY", Period::TwoYears).await.unwrap();
        fetcher
            .cache()
            .invalidate(&CacheKey::new("SPY", Period::TwoYears));
        fetcher.fetch("SPY", Period::TwoYears).await.unwrap();
        assert_eq!(source.calls(), 2);
    }
}
