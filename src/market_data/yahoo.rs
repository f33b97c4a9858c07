// =============================================================================
// Yahoo Finance Chart Client — daily adjusted closes over HTTP
// =============================================================================
//
// Public endpoint, no credentials:
//
//   GET {base}/v8/finance/chart/{ticker}?range=2y&interval=1d&includeAdjustedClose=true
//
// Unknown or delisted symbols come back as 404 with a `chart.error` payload,
// which is surfaced as `DataUnavailable`. Every request carries a bounded
// timeout so a hung provider cannot stall a render forever.
// =============================================================================

use std::time::Duration;

use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::DateTime;
use serde::Deserialize;
use tracing::{debug, instrument};

use crate::error::DataUnavailable;
use crate::market_data::{PricePoint, PriceSeries, PriceSource};
use crate::runtime_config::ProviderConfig;
use crate::types::Period;

/// HTTP client for the Yahoo Finance v8 chart API.
#[derive(Clone)]
pub struct YahooChartClient {
    base_url: reqwest::Url,
    client: reqwest::Client,
}

impl YahooChartClient {
    // -------------------------------------------------------------------------
    // Construction
    // -------------------------------------------------------------------------

    pub fn new(config: &ProviderConfig) -> Result<Self> {
        let base_url = reqwest::Url::parse(&config.base_url)
            .with_context(|| format!("invalid provider base url '{}'", config.base_url))?;
        if base_url.cannot_be_a_base() {
            anyhow::bail!("provider base url '{}' cannot carry a path", config.base_url);
        }

        let client = reqwest::Client::builder()
            .user_agent(config.user_agent.clone())
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .context("failed to build reqwest client")?;

        debug!(base_url = %base_url, timeout_secs = config.timeout_secs, "YahooChartClient initialised");

        Ok(Self { base_url, client })
    }

    /// `{base}/v8/finance/chart/{ticker}` with the ticker as one encoded segment.
    fn chart_url(&self, ticker: &str, period: Period) -> Result<reqwest::Url> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|_| anyhow::anyhow!("provider base url cannot carry a path"))?
            .pop_if_empty()
            .extend(["v8", "finance", "chart", ticker]);
        url.query_pairs_mut()
            .append_pair("range", period.as_str())
            .append_pair("interval", "1d")
            .append_pair("includeAdjustedClose", "true");
        Ok(url)
    }

    // -------------------------------------------------------------------------
    // Public market data
    // -------------------------------------------------------------------------

    /// GET /v8/finance/chart/{ticker}, parsed into an ascending daily series.
    #[instrument(skip(self), name = "yahoo::get_chart")]
    pub async fn get_chart(&self, ticker: &str, period: Period) -> Result<PriceSeries> {
        let url = self.chart_url(ticker, period)?;

        let resp = self
            .client
            .get(url)
            .send()
            .await
            .context("GET /v8/finance/chart request failed")?;

        let status = resp.status();
        let body = resp
            .text()
            .await
            .context("failed to read chart response body")?;

        // Error payloads ride on 4xx statuses, so try the envelope first.
        let envelope: ChartEnvelope = match serde_json::from_str(&body) {
            Ok(env) => env,
            Err(e) if !status.is_success() => {
                anyhow::bail!("Yahoo GET /v8/finance/chart returned {status}: {e}")
            }
            Err(e) => return Err(e).context("failed to parse chart response"),
        };

        if let Some(err) = envelope.chart.error.as_ref() {
            anyhow::bail!("provider error {}: {}", err.code_str(), err.description_str());
        }
        if !status.is_success() {
            anyhow::bail!("Yahoo GET /v8/finance/chart returned {status}");
        }

        let series = parse_chart(envelope)?;
        debug!(ticker, period = %period, count = series.len(), "chart fetched");
        Ok(series)
    }
}

#[async_trait]
impl PriceSource for YahooChartClient {
    async fn daily_adjusted_closes(
        &self,
        ticker: &str,
        period: Period,
    ) -> std::result::Result<PriceSeries, DataUnavailable> {
        self.get_chart(ticker, period)
            .await
            .map_err(|e| DataUnavailable::from_anyhow(ticker, &e))
    }
}

impl std::fmt::Debug for YahooChartClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("YahooChartClient")
            .field("base_url", &self.base_url.as_str())
            .finish()
    }
}

// =============================================================================
// Response model
// =============================================================================

#[derive(Debug, Deserialize)]
struct ChartEnvelope {
    chart: ChartBody,
}

#[derive(Debug, Deserialize)]
struct ChartBody {
    #[serde(default)]
    result: Option<Vec<ChartResult>>,
    #[serde(default)]
    error: Option<ChartError>,
}

#[derive(Debug, Deserialize)]
struct ChartError {
    code: Option<String>,
    description: Option<String>,
}

impl ChartError {
    fn code_str(&self) -> &str {
        self.code.as_deref().unwrap_or("unknown")
    }

    fn description_str(&self) -> &str {
        self.description.as_deref().unwrap_or("no description")
    }
}

#[derive(Debug, Deserialize)]
struct ChartResult {
    #[serde(default)]
    meta: ChartMeta,
    #[serde(default)]
    timestamp: Vec<i64>,
    #[serde(default)]
    indicators: Indicators,
}

#[derive(Debug, Default, Deserialize)]
struct ChartMeta {
    /// Exchange offset from UTC in seconds; shifts bar timestamps onto the
    /// exchange-local trading date.
    #[serde(default)]
    gmtoffset: i64,
}

#[derive(Debug, Default, Deserialize)]
struct Indicators {
    #[serde(default)]
    quote: Vec<Quote>,
    #[serde(default)]
    adjclose: Vec<AdjClose>,
}

#[derive(Debug, Deserialize)]
struct Quote {
    #[serde(default)]
    close: Vec<Option<f64>>,
}

#[derive(Debug, Deserialize)]
struct AdjClose {
    #[serde(default)]
    adjclose: Vec<Option<f64>>,
}

/// Turn the first chart result into a [`PriceSeries`].
///
/// Prefers the adjusted close; falls back to the raw close for instruments
/// without corporate-action adjustments. Null, non-finite and non-positive
/// values are skipped.
fn parse_chart(envelope: ChartEnvelope) -> Result<PriceSeries> {
    let result = envelope
        .chart
        .result
        .and_then(|r| r.into_iter().next())
        .context("chart response has no result")?;

    let offset = result.meta.gmtoffset;
    let prices = match result.indicators.adjclose.into_iter().next() {
        Some(adj) if !adj.adjclose.is_empty() => adj.adjclose,
        _ => result
            .indicators
            .quote
            .into_iter()
            .next()
            .map(|q| q.close)
            .context("chart response has neither adjclose nor close")?,
    };

    if prices.len() != result.timestamp.len() {
        anyhow::bail!(
            "chart arrays misaligned: {} timestamps, {} prices",
            result.timestamp.len(),
            prices.len()
        );
    }

    let mut points = Vec::with_capacity(prices.len());
    let mut skipped = 0usize;
    for (ts, price) in result.timestamp.iter().zip(prices) {
        let date = match DateTime::from_timestamp(ts + offset, 0) {
            Some(dt) => dt.date_naive(),
            None => {
                skipped += 1;
                continue;
            }
        };
        match price {
            Some(p) if p.is_finite() && p > 0.0 => points.push(PricePoint { date, price: p }),
            _ => skipped += 1,
        }
    }

    if skipped > 0 {
        debug!(skipped, "skipped unusable chart points");
    }
    if points.is_empty() {
        anyhow::bail!("chart response contains no usable prices");
    }

    Ok(PriceSeries::new(points))
}
