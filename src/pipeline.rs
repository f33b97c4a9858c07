// =============================================================================
// Analysis Pipeline — fetch → compute → classify
// =============================================================================
//
// One call is one dashboard render. Stages run strictly in order on the
// calling task; each returns its own typed error, which is lifted into
// `PipelineError` here. Either every output is produced or none is.
// =============================================================================

use std::sync::Arc;

use chrono::NaiveDate;
use serde::Serialize;
use tracing::{debug, instrument};

use crate::error::{ComputationError, PipelineError};
use crate::indicators::{rolling_volatility, VolatilityParams, VolatilitySeries};
use crate::market_data::{DataFetcher, PricePoint, PriceSeries};
use crate::regime::{classify, RegimeState};
use crate::types::{Period, ThresholdPct};

/// The three user inputs of one render.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AnalysisRequest {
    pub ticker: String,
    pub period: Period,
    pub threshold: ThresholdPct,
}

/// Everything a successful render shows.
#[derive(Debug, Clone)]
pub struct AnalysisReport {
    pub request: AnalysisRequest,
    pub prices: Arc<PriceSeries>,
    pub volatility: VolatilitySeries,
    pub latest_price: PricePoint,
    /// Latest annualized volatility in percent.
    pub latest_volatility_pct: f64,
    pub regime: RegimeState,
}

impl AnalysisReport {
    pub fn as_of(&self) -> NaiveDate {
        self.latest_price.date
    }

    pub fn threshold_pct(&self) -> f64 {
        self.request.threshold.as_f64()
    }
}

/// Run the full chain for `request`.
#[instrument(skip(fetcher, params, request), fields(ticker = %request.ticker, period = %request.period))]
pub async fn run(
    fetcher: &DataFetcher,
    params: &VolatilityParams,
    request: AnalysisRequest,
) -> Result<AnalysisReport, PipelineError> {
    // 1. Fetch
    let prices = fetcher.fetch(&request.ticker, request.period).await?;

    // 2. Rolling volatility
    let volatility = rolling_volatility(&prices, params);
    if volatility.is_empty() {
        return Err(ComputationError::InsufficientData {
            window: params.window,
            available: prices.len(),
        }
        .into());
    }
    let latest_vol = *volatility
        .latest()
        .ok_or_else(|| anyhow::anyhow!("volatility series emptied after length check"))?;
    let latest_price = *prices
        .latest()
        .ok_or_else(|| anyhow::anyhow!("price series emptied after volatility was computed"))?;

    // 3. Classify
    let latest_volatility_pct = latest_vol.pct();
    let regime = classify(latest_volatility_pct, request.threshold.as_f64());

    debug!(
        points = prices.len(),
        vol_points = volatility.len(),
        latest_price = latest_price.price,
        latest_vol_pct = format!("{:.2}", latest_volatility_pct),
        regime = ?regime,
        "analysis complete"
    );

    Ok(AnalysisReport {
        request,
        prices,
        volatility,
        latest_price,
        latest_volatility_pct,
        regime,
    })
}
