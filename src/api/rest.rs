// =============================================================================
// HTTP Router — Axum 0.7
// =============================================================================
//
// `/` serves the dashboard page. Machine-readable endpoints live under
// `/api/v1/`. Unlike the page, the JSON endpoints validate strictly: an
// unknown period or an out-of-range threshold is a 400, not a silent default.
//
// CORS is configured permissively; the dashboard is read-only.
// =============================================================================

use axum::{
    extract::{rejection::QueryRejection, Json, Query, State},
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    routing::get,
    Router,
};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use tower::ServiceBuilder;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::api::{chart, dashboard};
use crate::app_state::{ErrorRecord, SharedState};
use crate::error::user_message;
use crate::indicators::VolatilityPoint;
use crate::market_data::{CacheStats, PricePoint};
use crate::pipeline::{AnalysisReport, AnalysisRequest};
use crate::regime::RegimeState;
use crate::types::{Period, ThresholdPct};

type ApiError = (StatusCode, Json<serde_json::Value>);

fn api_error(status: StatusCode, message: impl Into<String>) -> ApiError {
    (
        status,
        Json(serde_json::json!({ "error": message.into() })),
    )
}

// =============================================================================
// Router construction
// =============================================================================

/// Build the full router with tracing, CORS and shared state.
pub fn router(state: SharedState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        // ── Page ────────────────────────────────────────────────────
        .route("/", get(dashboard::dashboard))
        // ── API ─────────────────────────────────────────────────────
        .route("/api/v1/health", get(health))
        .route("/api/v1/analysis", get(analysis))
        .route("/api/v1/chart.svg", get(chart_svg))
        .route("/api/v1/errors", get(recent_errors))
        // ── Middleware & State ───────────────────────────────────────
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(cors),
        )
        .with_state(state)
}

// =============================================================================
// Health
// =============================================================================

#[derive(Serialize)]
struct HealthResponse {
    status: &'static str,
    uptime_secs: u64,
    renders: u64,
    cache: CacheStats,
    server_time: i64,
}

async fn health(State(state): State<SharedState>) -> impl IntoResponse {
    Json(HealthResponse {
        status: "ok",
        uptime_secs: state.start_time.elapsed().as_secs(),
        renders: state.render_count(),
        cache: state.fetcher.cache().stats(),
        server_time: chrono::Utc::now().timestamp_millis(),
    })
}

// =============================================================================
// Analysis
// =============================================================================

#[derive(Debug, Default, Deserialize)]
struct AnalysisQuery {
    #[serde(default)]
    ticker: Option<String>,
    #[serde(default)]
    period: Option<Period>,
    #[serde(default)]
    threshold: Option<i64>,
}

impl AnalysisQuery {
    fn into_request(self, state: &SharedState) -> Result<AnalysisRequest, ApiError> {
        let threshold = match self.threshold {
            None => state.config.default_threshold(),
            Some(raw) => ThresholdPct::new(raw).ok_or_else(|| {
                api_error(
                    StatusCode::BAD_REQUEST,
                    format!(
                        "threshold {} outside [{}, {}]",
                        raw,
                        ThresholdPct::MIN,
                        ThresholdPct::MAX
                    ),
                )
            })?,
        };

        Ok(AnalysisRequest {
            ticker: self
                .ticker
                .unwrap_or_else(|| state.config.default_ticker.clone()),
            period: self.period.unwrap_or(state.config.default_period),
            threshold,
        })
    }
}

/// Parse the query and run the pipeline. Failures surface only the generic
/// message; the internal cause stays in the error log.
async fn run_analysis(
    state: &SharedState,
    query: Result<Query<AnalysisQuery>, QueryRejection>,
) -> Result<AnalysisReport, ApiError> {
    let Query(query) =
        query.map_err(|e| api_error(StatusCode::BAD_REQUEST, e.body_text()))?;
    let request = query.into_request(state)?;
    let ticker = request.ticker.clone();

    state
        .analyze(request)
        .await
        .map_err(|_| api_error(StatusCode::UNPROCESSABLE_ENTITY, user_message(&ticker)))
}

#[derive(Serialize)]
struct AnalysisResponse {
    ticker: String,
    period: Period,
    threshold_pct: u8,
    as_of: NaiveDate,
    latest_price: f64,
    latest_volatility_pct: f64,
    regime: RegimeState,
    regime_label: &'static str,
    price_points: usize,
    volatility: Vec<VolatilityPoint>,
    recent_prices: Vec<PricePoint>,
}

impl AnalysisResponse {
    fn from_report(report: &AnalysisReport, table_rows: usize) -> Self {
        Self {
            ticker: report.request.ticker.clone(),
            period: report.request.period,
            threshold_pct: report.request.threshold.get(),
            as_of: report.as_of(),
            latest_price: report.latest_price.price,
            latest_volatility_pct: report.latest_volatility_pct,
            regime: report.regime,
            regime_label: report.regime.label(),
            price_points: report.prices.len(),
            volatility: report.volatility.points().to_vec(),
            recent_prices: report.prices.tail(table_rows).to_vec(),
        }
    }
}

async fn analysis(
    State(state): State<SharedState>,
    query: Result<Query<AnalysisQuery>, QueryRejection>,
) -> Result<Json<AnalysisResponse>, ApiError> {
    let report = run_analysis(&state, query).await?;
    Ok(Json(AnalysisResponse::from_report(
        &report,
        state.config.table_rows,
    )))
}

async fn chart_svg(
    State(state): State<SharedState>,
    query: Result<Query<AnalysisQuery>, QueryRejection>,
) -> Result<Response, ApiError> {
    let report = run_analysis(&state, query).await?;
    let svg = chart::render_svg(&report, &state.config.chart);
    Ok(([(header::CONTENT_TYPE, "image/svg+xml")], svg).into_response())
}

// =============================================================================
// Recent errors
// =============================================================================

async fn recent_errors(State(state): State<SharedState>) -> Json<Vec<ErrorRecord>> {
    Json(state.recent_errors())
}
