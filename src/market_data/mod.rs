// =============================================================================
// Market Data Module
// =============================================================================
//
// Daily price retrieval behind the `PriceSource` seam, memoised per
// (ticker, period) by an injectable `PriceCache`.

pub mod cache;
pub mod fetcher;
pub mod series;
pub mod yahoo;

pub use cache::{CacheKey, CacheStats, PriceCache};
pub use fetcher::{DataFetcher, PriceSource};
pub use series::{PricePoint, PriceSeries};
pub use yahoo::YahooChartClient;
