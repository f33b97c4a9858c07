// =============================================================================
// Regime Dashboard — Main Entry Point
// =============================================================================
//
// Serves a single-page volatility regime dashboard: pick a ticker, lookback
// and alert threshold; see the latest price, the 22-day annualized
// volatility, the regime badge and a price/volatility chart.
// =============================================================================

// ── Module declarations ──────────────────────────────────────────────────────
mod api;
mod app_state;
mod error;
mod indicators;
mod market_data;
mod pipeline;
mod regime;
mod runtime_config;
mod types;

use std::sync::Arc;

use anyhow::Context;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use crate::app_state::AppState;
use crate::market_data::{DataFetcher, PriceCache, YahooChartClient};
use crate::runtime_config::DashboardConfig;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // ── 1. Environment & config ──────────────────────────────────────────
    let _ = dotenv::dotenv();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    info!(version = env!("CARGO_PKG_VERSION"), "Regime dashboard starting up");

    let config_path =
        std::env::var("DASHBOARD_CONFIG").unwrap_or_else(|_| "dashboard_config.json".into());
    let mut config = DashboardConfig::load(&config_path).unwrap_or_else(|e| {
        warn!(error = %e, path = %config_path, "Failed to load config, using defaults");
        DashboardConfig::default()
    });
    config.apply_env_overrides();
    config.validate().context("invalid dashboard configuration")?;

    info!(
        default_ticker = %config.default_ticker,
        default_period = %config.default_period,
        default_threshold = %config.default_threshold(),
        window = config.volatility.window,
        cache_capacity = config.cache_capacity,
        "Configuration ready"
    );

    // ── 2. Data provider & cache ─────────────────────────────────────────
    let source = Arc::new(YahooChartClient::new(&config.provider)?);
    let cache = Arc::new(PriceCache::new(config.cache_capacity));
    let fetcher = DataFetcher::new(source, cache);

    // ── 3. Shared state ──────────────────────────────────────────────────
    let bind_addr = config.bind_addr.clone();
    let state = Arc::new(AppState::new(config, fetcher));

    // ── 4. HTTP server ───────────────────────────────────────────────────
    let app = api::rest::router(state);
    let listener = tokio::net::TcpListener::bind(&bind_addr)
        .await
        .with_context(|| format!("failed to bind {bind_addr}"))?;
    info!(addr = %bind_addr, "Dashboard listening. Press Ctrl+C to stop.");

    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            if let Err(e) = tokio::signal::ctrl_c().await {
                warn!(error = %e, "Failed to listen for Ctrl+C");
            }
            warn!("Shutdown signal received — stopping gracefully");
        })
        .await
        .context("dashboard server failed")?;

    info!("Regime dashboard shut down complete.");
    Ok(())
}
