// =============================================================================
// Volatility Regime Classifier
// =============================================================================
//
//   HIGH_VOLATILITY — latest volatility % strictly above the threshold
//   STABLE          — everything else, including equality and NaN
//
// No hysteresis and no memory: every call is an independent comparison.
// =============================================================================

use serde::{Deserialize, Serialize};
use tracing::trace;

/// Discrete market state derived from the latest volatility reading.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RegimeState {
    /// Volatility at or below the threshold.
    Stable,
    /// Volatility above the threshold; defensive posture.
    HighVolatility,
}

impl RegimeState {
    /// Badge text shown on the dashboard.
    pub fn label(self) -> &'static str {
        match self {
            Self::Stable => "NORMAL VOLATILITY (Stable)",
            Self::HighVolatility => "HIGH VOLATILITY (Defensive)",
        }
    }

    pub fn is_high(self) -> bool {
        matches!(self, Self::HighVolatility)
    }
}

impl std::fmt::Display for RegimeState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

/// Classify the latest volatility (in percent) against `threshold_pct`.
pub fn classify(latest_volatility_pct: f64, threshold_pct: f64) -> RegimeState {
    let regime = if latest_volatility_pct > threshold_pct {
        RegimeState::HighVolatility
    } else {
        RegimeState::Stable
    };
    trace!(
        latest = format!("{:.4}", latest_volatility_pct),
        threshold = format!("{:.2}", threshold_pct),
        regime = ?regime,
        "Regime classified"
    );
    regime
}
