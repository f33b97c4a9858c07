// =============================================================================
// Runtime Configuration — dashboard defaults, provider and chart settings
// =============================================================================
//
// Loaded once at startup from a JSON file. All fields carry `#[serde(default)]`
// so that a partial (or empty) file still yields a complete configuration.
// A missing file is reported to the caller, which falls back to defaults.
//
// =============================================================================

use std::path::Path;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::indicators::VolatilityParams;
use crate::types::{Period, ThresholdPct};

// =============================================================================
// Default-value helpers (required by serde `default = "..."` attribute)
// =============================================================================

fn default_bind_addr() -> String {
    "0.0.0.0:3001".to_string()
}

fn default_ticker() -> String {
    "SPY".to_string()
}

fn default_threshold_pct() -> i64 {
    ThresholdPct::DEFAULT as i64
}

fn default_cache_capacity() -> usize {
    128
}

fn default_table_rows() -> usize {
    30
}

fn default_base_url() -> String {
    "https://query1.finance.yahoo.com".to_string()
}

fn default_timeout_secs() -> u64 {
    10
}

fn default_user_agent() -> String {
    concat!("Mozilla/5.0 (compatible; regime-dashboard/", env!("CARGO_PKG_VERSION"), ")").to_string()
}

fn default_chart_width() -> u32 {
    1200
}

fn default_chart_height() -> u32 {
    600
}

// =============================================================================
// ProviderConfig
// =============================================================================

/// Market-data provider connection settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProviderConfig {
    /// Scheme + host of the chart API.
    #[serde(default = "default_base_url")]
    pub base_url: String,

    /// Per-request timeout in seconds.
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,

    #[serde(default = "default_user_agent")]
    pub user_agent: String,
}

impl Default for ProviderConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            timeout_secs: default_timeout_secs(),
            user_agent: default_user_agent(),
        }
    }
}

// =============================================================================
// ChartConfig
// =============================================================================

/// Pixel size of the rendered SVG chart.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct ChartConfig {
    #[serde(default = "default_chart_width")]
    pub width: u32,
    #[serde(default = "default_chart_height")]
    pub height: u32,
}

impl Default for ChartConfig {
    fn default() -> Self {
        Self {
            width: default_chart_width(),
            height: default_chart_height(),
        }
    }
}

// =============================================================================
// DashboardConfig
// =============================================================================

/// Top-level configuration for the dashboard server.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DashboardConfig {
    // --- Server --------------------------------------------------------------

    /// Socket address the HTTP server binds to.
    #[serde(default = "default_bind_addr")]
    pub bind_addr: String,

    // --- Form defaults ---------------------------------------------------------

    #[serde(default = "default_ticker")]
    pub default_ticker: String,

    #[serde(default)]
    pub default_period: Period,

    /// Must lie within the slider range [10, 50].
    #[serde(default = "default_threshold_pct")]
    pub default_threshold_pct: i64,

    // --- Analytics -------------------------------------------------------------

    #[serde(default)]
    pub volatility: VolatilityParams,

    // --- Data --------------------------------------------------------------------

    /// Maximum cached (ticker, period) series; 0 keeps every entry.
    #[serde(default = "default_cache_capacity")]
    pub cache_capacity: usize,

    #[serde(default)]
    pub provider: ProviderConfig,

    // --- Rendering -----------------------------------------------------------

    /// Rows shown in the raw-data table.
    #[serde(default = "default_table_rows")]
    pub table_rows: usize,

    #[serde(default)]
    pub chart: ChartConfig,
}

impl Default for DashboardConfig {
    fn default() -> Self {
        Self {
            bind_addr: default_bind_addr(),
            default_ticker: default_ticker(),
            default_period: Period::default(),
            default_threshold_pct: default_threshold_pct(),
            volatility: VolatilityParams::default(),
            cache_capacity: default_cache_capacity(),
            provider: ProviderConfig::default(),
            table_rows: default_table_rows(),
            chart: ChartConfig::default(),
        }
    }
}

impl DashboardConfig {
    /// Load configuration from a JSON file at `path`.
    ///
    /// If the file does not exist, returns an error so the caller can fall
    /// back to defaults with a warning.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();

        let content = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read dashboard config from {}", path.display()))?;

        let config: Self = serde_json::from_str(&content)
            .with_context(|| format!("failed to parse dashboard config from {}", path.display()))?;

        info!(
            path = %path.display(),
            bind_addr = %config.bind_addr,
            default_ticker = %config.default_ticker,
            "dashboard config loaded"
        );

        Ok(config)
    }

    /// Apply `DASHBOARD_BIND_ADDR` if set.
    pub fn apply_env_overrides(&mut self) {
        self.apply_overrides(|key| std::env::var(key).ok());
    }

    fn apply_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if let Some(addr) = lookup("DASHBOARD_BIND_ADDR") {
            let addr = addr.trim();
            if !addr.is_empty() {
                self.bind_addr = addr.to_string();
            }
        }
    }

    /// The configured default threshold as a validated value.
    pub fn default_threshold(&self) -> ThresholdPct {
        ThresholdPct::clamped(self.default_threshold_pct)
    }

    /// Reject values the pipeline or renderer cannot work with.
    pub fn validate(&self) -> Result<()> {
        if self.volatility.window == 0 {
            anyhow::bail!("volatility.window must be at least 1");
        }
        if !(self.volatility.periods_per_year > 0.0 && self.volatility.periods_per_year.is_finite())
        {
            anyhow::bail!(
                "volatility.periods_per_year must be positive, got {}",
                self.volatility.periods_per_year
            );
        }
        if ThresholdPct::new(self.default_threshold_pct).is_none() {
            anyhow::bail!(
                "default_threshold_pct {} outside [{}, {}]",
                self.default_threshold_pct,
                ThresholdPct::MIN,
                ThresholdPct::MAX
            );
        }
        if self.provider.timeout_secs == 0 {
            anyhow::bail!("provider.timeout_secs must be at least 1");
        }
        if self.table_rows == 0 {
            anyhow::bail!("table_rows must be at least 1");
        }
        if self.chart.width < 200 || self.chart.height < 120 {
            anyhow::bail!(
                "chart must be at least 200x120, got {}x{}",
                self.chart.width,
                self.chart.height
            );
        }
        self.bind_addr
            .parse::<std::net::SocketAddr>()
            .with_context(|| format!("invalid bind_addr '{}'", self.bind_addr))?;
        Ok(())
    }
}

// =============================================================================
// Tests
// =============================================================================
#[cfg(test)]
mod tests {
    use super::*;
    use crate::indicators::volatility::ReturnKind;

    #[test]
    fn default_config_has_expected_values() {
        let cfg = DashboardConfig::default();
        assert_eq!(cfg.bind_addr, "0.0.0.0:3001");
        assert_eq!(cfg.default_ticker, "SPY");
        assert_eq!(cfg.default_period, Period::TwoYears);
        assert_eq!(cfg.default_threshold().get(), 20);
        assert_eq!(cfg.volatility.window, 22);
        assert_eq!(cfg.volatility.return_kind, ReturnKind::Simple);
        assert!((cfg.volatility.periods_per_year - 252.0).abs() < f64::EPSILON);
        assert_eq!(cfg.table_rows, 30);
        assert_eq!(cfg.chart.width, 1200);
        assert_eq!(cfg.chart.height, 600);
        assert!(cfg.validate().is_ok());
    }

    #[test]
    fn deserialise_empty_json_uses_defaults() {
        let cfg: DashboardConfig = serde_json::from_str("{}").unwrap();
        assert_eq!(cfg.default_ticker, "SPY");
        assert_eq!(cfg.cache_capacity, 128);
        assert_eq!(cfg.provider.timeout_secs, 10);
        assert!(cfg.provider.base_url.starts_with("https://"));
    }

    #[test]
    fn deserialise_partial_json_fills_defaults() {
        let json = r#"{ "default_period": "5y", "volatility": { "window": 10 } }"#;
        let cfg: DashboardConfig = serde_json::from_str(json).unwrap();
        assert_eq!(cfg.default_period, Period::FiveYears);
        assert_eq!(cfg.volatility.window, 10);
        assert_eq!(cfg.volatility.return_kind, ReturnKind::Simple);
        assert_eq!(cfg.table_rows, 30);
    }

    #[test]
    fn load_reads_file_and_reports_missing() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("dashboard_config.json");
        std::fs::write(&path, r#"{ "default_ticker": "QQQ", "cache_capacity": 0 }"#).unwrap();

        let cfg = DashboardConfig::load(&path).unwrap();
        assert_eq!(cfg.default_ticker, "QQQ");
        assert_eq!(cfg.cache_capacity, 0);

        assert!(DashboardConfig::load(dir.path().join("missing.json")).is_err());
    }

    #[test]
    fn load_rejects_malformed_json() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bad.json");
        std::fs::write(&path, "{ not json").unwrap();
        let err = DashboardConfig::load(&path).unwrap_err();
        assert!(format!("{err:#}").contains("failed to parse"));
    }

    #[test]
    fn env_override_replaces_bind_addr() {
        let mut cfg = DashboardConfig::default();
        cfg.apply_overrides(|key| {
            (key == "DASHBOARD_BIND_ADDR").then(|| "127.0.0.1:8080".to_string())
        });
        assert_eq!(cfg.bind_addr, "127.0.0.1:8080");

        cfg.apply_overrides(|_| Some("   ".to_string()));
        assert_eq!(cfg.bind_addr, "127.0.0.1:8080");
    }

    #[test]
    fn validate_rejects_bad_values() {
        let mut cfg = DashboardConfig::default();
        cfg.volatility.window = 0;
        assert!(cfg.validate().is_err());

        let mut cfg = DashboardConfig::default();
        cfg.default_threshold_pct = 75;
        assert!(cfg.validate().is_err());

        let mut cfg = DashboardConfig::default();
        cfg.volatility.periods_per_year = 0.0;
        assert!(cfg.validate().is_err());

        let mut cfg = DashboardConfig::default();
        cfg.bind_addr = "not an address".to_string();
        assert!(cfg.validate().is_err());

        let mut cfg = DashboardConfig::default();
        cfg.chart.width = 10;
        assert!(cfg.validate().is_err());
    }
}
