// =============================================================================
// Central Application State — Regime Dashboard
// =============================================================================
//
// Shared by every request handler via `Arc<AppState>`. Holds the immutable
// configuration, the memoising data fetcher, and a small ring of recent
// pipeline failures for operator diagnostics.
//
// Thread safety:
//   - The price cache inside the fetcher guards itself with a mutex.
//   - parking_lot::RwLock for the error ring.
// =============================================================================

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use chrono::Utc;
use parking_lot::RwLock;
use serde::Serialize;
use tracing::{error, warn};

use crate::error::{ErrorKind, PipelineError};
use crate::indicators::VolatilityParams;
use crate::market_data::DataFetcher;
use crate::pipeline::{self, AnalysisReport, AnalysisRequest};
use crate::runtime_config::DashboardConfig;

// =============================================================================
// Error Record
// =============================================================================

/// A recorded pipeline failure.
#[derive(Debug, Clone, Serialize)]
pub struct ErrorRecord {
    pub kind: ErrorKind,
    pub ticker: String,
    /// Full internal cause, never shown on the dashboard itself.
    pub detail: String,
    /// ISO 8601 timestamp.
    pub at: String,
}

// =============================================================================
// AppState
// =============================================================================

/// Maximum number of recent errors to retain.
const MAX_RECENT_ERRORS: usize = 50;

pub struct AppState {
    pub config: DashboardConfig,
    pub fetcher: DataFetcher,
    pub recent_errors: RwLock<Vec<ErrorRecord>>,

    /// Completed renders, successful or not.
    pub renders: AtomicU64,

    /// Instant when the server was started. Used for uptime calculations.
    pub start_time: std::time::Instant,
}

impl AppState {
    pub fn new(config: DashboardConfig, fetcher: DataFetcher) -> Self {
        Self {
            config,
            fetcher,
            recent_errors: RwLock::new(Vec::new()),
            renders: AtomicU64::new(0),
            start_time: std::time::Instant::now(),
        }
    }

    pub fn volatility_params(&self) -> &VolatilityParams {
        &self.config.volatility
    }

    /// Run one render's pipeline, recording any failure before returning it.
    pub async fn analyze(&self, request: AnalysisRequest) -> Result<AnalysisReport, PipelineError> {
        let ticker = request.ticker.clone();
        let result = pipeline::run(&self.fetcher, self.volatility_params(), request).await;
        self.renders.fetch_add(1, Ordering::Relaxed);

        if let Err(e) = &result {
            match e.kind() {
                ErrorKind::Unknown => error!(ticker = %ticker, kind = %e.kind(), error = %e, "analysis failed"),
                _ => warn!(ticker = %ticker, kind = %e.kind(), error = %e, "analysis failed"),
            }
            self.push_error(&ticker, e);
        }
        result
    }

    pub fn render_count(&self) -> u64 {
        self.renders.load(Ordering::Relaxed)
    }

    // ── Error Logging ───────────────────────────────────────────────────

    /// Record a failure. The ring buffer is capped at [`MAX_RECENT_ERRORS`];
    /// oldest entries are evicted when the limit is reached.
    pub fn push_error(&self, ticker: &str, err: &PipelineError) {
        let record = ErrorRecord {
            kind: err.kind(),
            ticker: ticker.to_string(),
            detail: err.to_string(),
            at: Utc::now().to_rfc3339(),
        };

        let mut errors = self.recent_errors.write();
        errors.push(record);
        while errors.len() > MAX_RECENT_ERRORS {
            errors.remove(0);
        }
    }

    pub fn recent_errors(&self) -> Vec<ErrorRecord> {
        self.recent_errors.read().clone()
    }
}

impl std::fmt::Debug for AppState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppState")
            .field("fetcher", &self.fetcher)
            .field("renders", &self.render_count())
            .finish()
    }
}

/// Convenience alias used by the router.
pub type SharedState = Arc<AppState>;

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::error::DataUnavailable;
    use crate::market_data::fetcher::tests::FakeSource;
    use crate::pipeline::tests::{fake_fetcher, spy_like_closes};
    use crate::types::{Period, ThresholdPct};

    /// State backed by a fake source that knows only SPY.
    pub(crate) fn test_state() -> (SharedState, Arc<FakeSource>) {
        let (fetcher, source) = fake_fetcher(FakeSource::with("SPY", &spy_like_closes(502)));
        (Arc::new(AppState::new(DashboardConfig::default(), fetcher)), source)
    }

    #[tokio::test]
    async fn analyze_records_failures() {
        let (state, _) = test_state();
        let req = AnalysisRequest {
            ticker: "ZZZINVALID".to_string(),
            period: Period::OneYear,
            threshold: ThresholdPct::default(),
        };
        assert!(state.analyze(req).await.is_err());

        let errors = state.recent_errors();
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].ticker, "ZZZINVALID");
        assert_eq!(errors[0].kind, ErrorKind::DataUnavailable);
        assert_eq!(state.render_count(), 1);
    }

    #[tokio::test]
    async fn analyze_success_leaves_error_log_empty() {
        let (state, _) = test_state();
        let req = AnalysisRequest {
            ticker: "SPY".to_string(),
            period: Period::TwoYears,
            threshold: ThresholdPct::default(),
        };
        assert!(state.analyze(req).await.is_ok());
        assert!(state.recent_errors().is_empty());
    }

    #[test]
    fn error_ring_is_bounded() {
        let (state, _) = test_state();
        for i in 0..(MAX_RECENT_ERRORS + 7) {
            let err: PipelineError = DataUnavailable::new(format!("T{i}"), "nope").into();
            state.push_error(&format!("T{i}"), &err);
        }
        let errors = state.recent_errors();
        assert_eq!(errors.len(), MAX_RECENT_ERRORS);
        assert_eq!(errors[0].ticker, "T7");
    }
}
