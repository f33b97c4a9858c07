// =============================================================================
// Rolling Annualized Volatility
// =============================================================================
//
// For each index i >= window - 1 the window spans the `window` prices ending
// at i, i.e. `window - 1` daily returns r_k:
//
//   log:    r_k = ln(p_k / p_{k-1})
//   simple: r_k = p_k / p_{k-1} - 1
//
//   σ_i = sqrt( Σ (r_k - r̄)² / (m - 1) ) * sqrt(periods_per_year)
//
// with m = window - 1 (sample standard deviation). Windows holding fewer than
// two returns report 0. The output has exactly `len - window + 1` points,
// each dated on a date of the input series.
//
// Defaults: window 22 (~one trading month), simple returns, 252 periods/year.
// =============================================================================

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::market_data::PriceSeries;

pub const DEFAULT_WINDOW: usize = 22;
pub const TRADING_DAYS_PER_YEAR: f64 = 252.0;

/// Return convention used before taking the standard deviation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReturnKind {
    #[default]
    Simple,
    Log,
}

impl ReturnKind {
    fn between(self, prev: f64, next: f64) -> f64 {
        match self {
            Self::Log => (next / prev).ln(),
            Self::Simple => next / prev - 1.0,
        }
    }
}

fn default_window() -> usize {
    DEFAULT_WINDOW
}

fn default_periods_per_year() -> f64 {
    TRADING_DAYS_PER_YEAR
}

/// Tunables for [`rolling_volatility`].
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct VolatilityParams {
    /// Number of prices per rolling window.
    #[serde(default = "default_window")]
    pub window: usize,

    #[serde(default)]
    pub return_kind: ReturnKind,

    /// Annualisation base; the daily σ is scaled by its square root.
    #[serde(default = "default_periods_per_year")]
    pub periods_per_year: f64,
}

impl Default for VolatilityParams {
    fn default() -> Self {
        Self {
            window: DEFAULT_WINDOW,
            return_kind: ReturnKind::Simple,
            periods_per_year: TRADING_DAYS_PER_YEAR,
        }
    }
}

/// One point of a [`VolatilitySeries`]. `value` is a fraction (0.18 = 18%).
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct VolatilityPoint {
    pub date: NaiveDate,
    pub value: f64,
}

impl VolatilityPoint {
    pub fn pct(&self) -> f64 {
        self.value * 100.0
    }
}

/// Trailing annualized volatility aligned to the tail of a [`PriceSeries`].
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct VolatilitySeries {
    points: Vec<VolatilityPoint>,
}

impl VolatilitySeries {
    pub fn points(&self) -> &[VolatilityPoint] {
        &self.points
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    pub fn latest(&self) -> Option<&VolatilityPoint> {
        self.points.last()
    }

    /// Largest value in the series, as a percentage.
    pub fn max_pct(&self) -> Option<f64> {
        self.points
            .iter()
            .map(VolatilityPoint::pct)
            .fold(None, |acc, v| Some(acc.map_or(v, |a: f64| a.max(v))))
    }
}

/// Rolling volatility of `prices` over `params.window` prices.
///
/// Returns an empty series when `window` is zero or exceeds the input length.
pub fn rolling_volatility(prices: &PriceSeries, params: &VolatilityParams) -> VolatilitySeries {
    let window = params.window;
    let points = prices.points();
    if window == 0 || points.len() < window {
        return VolatilitySeries::default();
    }

    let returns: Vec<f64> = points
        .windows(2)
        .map(|w| params.return_kind.between(w[0].price, w[1].price))
        .collect();
    let scale = params.periods_per_year.max(0.0).sqrt();

    // returns[k] ends at price index k + 1, so the window ending at price
    // index i covers returns[i + 1 - window .. i].
    let out = (window - 1..points.len())
        .map(|i| {
            let slice = &returns[i + 1 - window..i];
            VolatilityPoint {
                date: points[i].date,
                value: sample_std(slice) * scale,
            }
        })
        .collect();

    VolatilitySeries { points: out }
}

/// Sample standard deviation; 0 for fewer than two values or non-finite input.
fn sample_std(values: &[f64]) -> f64 {
    let n = values.len();
    if n < 2 {
        return 0.0;
    }
    let mean = values.iter().sum::<f64>() / n as f64;
    let var = values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / (n - 1) as f64;
    let std = var.max(0.0).sqrt();
    if std.is_finite() {
        std
    } else {
        0.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::market_data::series::tests::series_from;

    fn vol(s: &PriceSeries, window: usize) -> VolatilitySeries {
        rolling_volatility(
            s,
            &VolatilityParams {
                window,
                ..VolatilityParams::default()
            },
        )
    }

    fn zigzag(n: usize) -> Vec<f64> {
        (0..n)
            .map(|i| if i % 2 == 0 { 100.0 } else { 102.0 })
            .collect()
    }

    #[test]
    fn output_length_is_input_minus_window_plus_one() {
        let s = series_from(&zigzag(100));
        let v = vol(&s, 22);
        assert_eq!(v.len(), 100 - 21);
    }

    #[test]
    fn exactly_window_points_gives_one_value() {
        let s = series_from(&zigzag(22));
        let v = vol(&s, 22);
        assert_eq!(v.len(), 1);
        assert_eq!(v.latest().unwrap().date, s.latest().unwrap().date);
    }

    #[test]
    fn short_input_gives_empty_series() {
        let s = series_from(&zigzag(21));
        assert!(vol(&s, 22).is_empty());
    }

    #[test]
    fn zero_window_gives_empty_series() {
        let s = series_from(&zigzag(30));
        assert!(vol(&s, 0).is_empty());
    }

    #[test]
    fn dates_are_suffix_of_price_dates() {
        let s = series_from(&zigzag(40));
        let v = vol(&s, 10);
        let price_dates = s.dates();
        let tail = &price_dates[price_dates.len() - v.len()..];
        let vol_dates: Vec<_> = v.points().iter().map(|p| p.date).collect();
        assert_eq!(vol_dates, tail);
    }

    #[test]
    fn constant_prices_have_zero_volatility() {
        let s = series_from(&[50.0; 30]);
        let v = vol(&s, 22);
        assert!(v.points().iter().all(|p| p.value == 0.0));
    }

    #[test]
    fn values_are_never_negative() {
        let closes: Vec<f64> = (0..200)
            .map(|i| 100.0 + ((i * 37) % 23) as f64 - 11.0 + (i as f64) * 0.1)
            .collect();
        let s = series_from(&closes);
        let v = vol(&s, 22);
        assert!(!v.is_empty());
        assert!(v.points().iter().all(|p| p.value >= 0.0 && p.value.is_finite()));
    }

    #[test]
    fn default_matches_hand_computed_simple_returns() {
        // Prices 100, 110, 99: simple returns +10% and -10%.
        let s = series_from(&[100.0, 110.0, 99.0]);
        let v = vol(&s, 3);
        // mean 0, sample variance (0.01 + 0.01) / 1 = 0.02
        let expected = 0.02f64.sqrt() * 252f64.sqrt();
        assert_eq!(v.len(), 1);
        assert!((v.points()[0].value - expected).abs() < 1e-12);
        assert!((v.points()[0].pct() - 224.4994).abs() < 1e-3);
    }

    #[test]
    fn log_returns_match_hand_computed_value() {
        let s = series_from(&[100.0, 110.0, 99.0]);
        let v = rolling_volatility(
            &s,
            &VolatilityParams {
                window: 3,
                return_kind: ReturnKind::Log,
                ..VolatilityParams::default()
            },
        );
        let r1 = 1.1f64.ln();
        let r2 = 0.9f64.ln();
        let mean = (r1 + r2) / 2.0;
        let var = (r1 - mean).powi(2) + (r2 - mean).powi(2);
        let expected = var.sqrt() * 252f64.sqrt();
        assert!((v.points()[0].value - expected).abs() < 1e-12);
    }

    #[test]
    fn simple_returns_differ_from_log_returns() {
        let s = series_from(&[100.0, 110.0, 99.0, 120.0]);
        let simple = vol(&s, 4);
        let log = rolling_volatility(
            &s,
            &VolatilityParams {
                window: 4,
                return_kind: ReturnKind::Log,
                ..VolatilityParams::default()
            },
        );
        assert_eq!(log.len(), 1);
        assert_eq!(simple.len(), 1);
        assert!((log.points()[0].value - simple.points()[0].value).abs() > 1e-6);
    }

    #[test]
    fn window_of_two_has_single_return_and_reports_zero() {
        let s = series_from(&[100.0, 105.0, 95.0]);
        let v = vol(&s, 2);
        assert_eq!(v.len(), 2);
        assert!(v.points().iter().all(|p| p.value == 0.0));
    }

    #[test]
    fn pct_and_max() {
        let s = series_from(&zigzag(30));
        let v = vol(&s, 5);
        let max = v.max_pct().unwrap();
        assert!(v.points().iter().all(|p| p.pct() <= max));
        assert!(v.points().iter().any(|p| (p.pct() - max).abs() < 1e-12));
        assert!(VolatilitySeries::default().max_pct().is_none());
    }

    #[test]
    fn params_deserialise_with_defaults() {
        let p: VolatilityParams = serde_json::from_str("{}").unwrap();
        assert_eq!(p, VolatilityParams::default());
        assert_eq!(p.return_kind, ReturnKind::Simple);
        let p: VolatilityParams = serde_json::from_str(r#"{"return_kind":"log","window":10}"#).unwrap();
        assert_eq!(p.return_kind, ReturnKind::Log);
        assert_eq!(p.window, 10);
    }
}
