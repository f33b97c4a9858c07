// =============================================================================
// Dashboard Page — server-rendered HTML
// =============================================================================
//
// `GET /` is one render: read the three form inputs, run the pipeline, and
// return either the full set of outputs (metrics, badge, chart, raw-data
// table) or only the generic error message. Never a mix of both.
//
// Form inputs arrive as free-form query strings; anything the widgets could
// not have produced falls back to the configured default (period) or snaps
// to the slider bounds (threshold). The ticker is passed through verbatim.
// =============================================================================

use axum::{
    extract::{rejection::QueryRejection, Query, State},
    response::Html,
};
use serde::Deserialize;
use tracing::{debug, warn};

use crate::api::{chart, escape_html};
use crate::app_state::SharedState;
use crate::error::user_message;
use crate::pipeline::{AnalysisReport, AnalysisRequest};
use crate::runtime_config::DashboardConfig;
use crate::types::{Period, ThresholdPct};

/// Raw form values as submitted by the page.
#[derive(Debug, Default, Deserialize)]
pub struct DashboardQuery {
    #[serde(default)]
    pub ticker: Option<String>,
    #[serde(default)]
    pub period: Option<String>,
    #[serde(default)]
    pub threshold: Option<String>,
}

impl DashboardQuery {
    /// Resolve the form into a pipeline request using widget semantics.
    pub fn resolve(&self, config: &DashboardConfig) -> AnalysisRequest {
        let ticker = self
            .ticker
            .clone()
            .unwrap_or_else(|| config.default_ticker.clone());

        let period = match self.period.as_deref() {
            None => config.default_period,
            Some(raw) => raw.parse::<Period>().unwrap_or_else(|e| {
                warn!(error = %e, "unknown period from form, using default");
                config.default_period
            }),
        };

        let threshold = match self.threshold.as_deref().map(str::trim) {
            None | Some("") => config.default_threshold(),
            Some(raw) => match raw.parse::<f64>() {
                Ok(v) if v.is_finite() => ThresholdPct::clamped(v.round() as i64),
                _ => {
                    warn!(threshold = raw, "unparseable threshold from form, using default");
                    config.default_threshold()
                }
            },
        };

        AnalysisRequest {
            ticker,
            period,
            threshold,
        }
    }
}

/// GET / — the dashboard.
pub async fn dashboard(
    State(state): State<SharedState>,
    query: Result<Query<DashboardQuery>, QueryRejection>,
) -> Html<String> {
    // A malformed query string (e.g. a repeated field) still gets a page.
    let query = query.map(|Query(q)| q).unwrap_or_else(|e| {
        warn!(error = %e.body_text(), "unreadable dashboard query, using defaults");
        DashboardQuery::default()
    });
    let request = query.resolve(&state.config);
    debug!(ticker = %request.ticker, period = %request.period, threshold = %request.threshold, "dashboard render");

    let content = match state.analyze(request.clone()).await {
        Ok(report) => render_report(&report, &state.config),
        Err(_) => render_error(&request.ticker),
    };

    Html(render_page(&request, &content))
}

// =============================================================================
// Rendering
// =============================================================================

fn render_error(ticker: &str) -> String {
    format!(
        r#"<div class="alert error" role="alert">{}</div>"#,
        escape_html(&user_message(ticker))
    )
}

fn render_report(report: &AnalysisReport, config: &DashboardConfig) -> String {
    let (badge_class, badge_icon) = if report.regime.is_high() {
        ("error", "🔴")
    } else {
        ("success", "🟢")
    };

    let mut rows = String::new();
    for p in report.prices.tail(config.table_rows) {
        rows.push_str(&format!(
            "<tr><td>{}</td><td>{:.2}</td></tr>",
            p.date.format("%Y-%m-%d"),
            p.price
        ));
    }

    format!(
        r##"<section class="metrics">
  <div class="metric"><div class="metric-label">Current Price</div><div class="metric-value">${price:.2}</div></div>
  <div class="metric"><div class="metric-label">30-Day Volatility</div><div class="metric-value">{vol:.2}%</div></div>
  <div class="alert {badge_class}" data-regime="{regime_key}">{badge_icon} {badge_label}</div>
</section>
<h2>Price vs. Volatility Regime</h2>
<figure class="chart">{svg}</figure>
<details>
  <summary>View Raw Data</summary>
  <table>
    <thead><tr><th>Date</th><th>Adj Close</th></tr></thead>
    <tbody>{rows}</tbody>
  </table>
</details>"##,
        price = report.latest_price.price,
        vol = report.latest_volatility_pct,
        badge_class = badge_class,
        regime_key = serde_json::to_value(report.regime)
            .ok()
            .and_then(|v| v.as_str().map(str::to_string))
            .unwrap_or_default(),
        badge_icon = badge_icon,
        badge_label = report.regime.label(),
        svg = chart::render_svg(report, &config.chart),
        rows = rows,
    )
}

fn render_page(request: &AnalysisRequest, content: &str) -> String {
    let mut options = String::new();
    for p in Period::ALL {
        let selected = if p == request.period { " selected" } else { "" };
        options.push_str(&format!(r#"<option value="{p}"{selected}>{p}</option>"#));
    }

    format!(
        r##"<!DOCTYPE html>
<html lang="en">
<head>
<meta charset="utf-8">
<meta name="viewport" content="width=device-width, initial-scale=1">
<title>Market Regime Analyzer</title>
<style>
  body {{ font-family: sans-serif; margin: 0; display: flex; color: #262730; }}
  aside {{ width: 260px; padding: 24px; background: #f0f2f6; min-height: 100vh; box-sizing: border-box; }}
  aside label {{ display: block; margin: 14px 0 4px; font-size: 14px; }}
  aside input[type=text], aside select {{ width: 100%; padding: 6px; box-sizing: border-box; }}
  aside input[type=range] {{ width: 100%; }}
  aside button {{ margin-top: 18px; padding: 8px 16px; }}
  main {{ flex: 1; padding: 24px 40px; }}
  .metrics {{ display: grid; grid-template-columns: repeat(3, 1fr); gap: 16px; align-items: center; }}
  .metric-label {{ font-size: 14px; color: #555; }}
  .metric-value {{ font-size: 32px; }}
  .alert {{ padding: 14px 16px; border-radius: 6px; }}
  .alert.error {{ background: #ffe4e4; color: #7d1a1a; }}
  .alert.success {{ background: #ddf4e4; color: #10572b; }}
  .chart svg {{ max-width: 100%; height: auto; }}
  table {{ border-collapse: collapse; margin-top: 8px; }}
  td, th {{ padding: 4px 12px; border-bottom: 1px solid #ddd; text-align: right; }}
</style>
</head>
<body>
<aside>
  <h3>Configuration</h3>
  <form method="get" action="/">
    <label for="ticker">Ticker Symbol</label>
    <input type="text" id="ticker" name="ticker" value="{ticker}" title="Enter a valid Yahoo Finance ticker (e.g., AAPL, BTC-USD, TSLA)">
    <label for="period">Lookback Period</label>
    <select id="period" name="period">{options}</select>
    <label for="threshold">Volatility Alert Threshold (%): <output id="threshold-out">{threshold}</output></label>
    <input type="range" id="threshold" name="threshold" min="{min}" max="{max}" step="1" value="{threshold}" oninput="document.getElementById('threshold-out').value = this.value">
    <button type="submit">Analyze</button>
  </form>
</aside>
<main>
  <h1>⚡ Market Regime Analyzer</h1>
  <p>This tool analyzes the "Volatility Regime" of an asset to determine if the market is currently in a state of <em>Panic</em> or <em>Stability</em>.</p>
  {content}
</main>
</body>
</html>"##,
        ticker = escape_html(&request.ticker),
        options = options,
        threshold = request.threshold.get(),
        min = ThresholdPct::MIN,
        max = ThresholdPct::MAX,
        content = content,
    )
}
