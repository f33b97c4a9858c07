// =============================================================================
// Shared types used across the regime dashboard
// =============================================================================

use serde::{Deserialize, Serialize};

/// Lookback range requested from the market-data provider.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Period {
    #[serde(rename = "1y")]
    OneYear,
    #[serde(rename = "2y")]
    TwoYears,
    #[serde(rename = "5y")]
    FiveYears,
    #[serde(rename = "10y")]
    TenYears,
}

impl Period {
    pub const ALL: [Period; 4] = [
        Period::OneYear,
        Period::TwoYears,
        Period::FiveYears,
        Period::TenYears,
    ];

    /// Wire form, identical to the provider's `range` parameter.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::OneYear => "1y",
            Self::TwoYears => "2y",
            Self::FiveYears => "5y",
            Self::TenYears => "10y",
        }
    }
}

impl Default for Period {
    fn default() -> Self {
        Self::TwoYears
    }
}

impl std::fmt::Display for Period {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for Period {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|p| p.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| anyhow::anyhow!("invalid period '{s}'; expected one of 1y, 2y, 5y, 10y"))
    }
}

/// Volatility alert threshold in whole percent, restricted to [10, 50].
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "i64", into = "i64")]
pub struct ThresholdPct(u8);

impl ThresholdPct {
    pub const MIN: u8 = 10;
    pub const MAX: u8 = 50;
    pub const DEFAULT: u8 = 20;

    /// Returns `None` outside `[MIN, MAX]`.
    pub fn new(pct: i64) -> Option<Self> {
        if (Self::MIN as i64..=Self::MAX as i64).contains(&pct) {
            Some(Self(pct as u8))
        } else {
            None
        }
    }

    /// Slider semantics: out-of-range input snaps to the nearest bound.
    pub fn clamped(pct: i64) -> Self {
        Self(pct.clamp(Self::MIN as i64, Self::MAX as i64) as u8)
    }

    pub fn get(self) -> u8 {
        self.0
    }

    pub fn as_f64(self) -> f64 {
        self.0 as f64
    }
}

impl Default for ThresholdPct {
    fn default() -> Self {
        Self(Self::DEFAULT)
    }
}

impl TryFrom<i64> for ThresholdPct {
    type Error = String;

    fn try_from(value: i64) -> Result<Self, Self::Error> {
        Self::new(value).ok_or_else(|| {
            format!(
                "threshold {value} outside [{}, {}]",
                Self::MIN,
                Self::MAX
            )
        })
    }
}

impl From<ThresholdPct> for i64 {
    fn from(value: ThresholdPct) -> Self {
        value.0 as i64
    }
}

impl std::fmt::Display for ThresholdPct {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}%", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn period_parses_all_variants() {
        for p in Period::ALL {
            assert_eq!(p.as_str().parse::<Period>().unwrap(), p);
        }
        assert!("3y".parse::<Period>().is_err());
        assert!("".parse::<Period>().is_err());
    }

    #[test]
    fn period_serde_uses_wire_form() {
        assert_eq!(serde_json::to_string(&Period::TenYears).unwrap(), "\"10y\"");
        let p: Period = serde_json::from_str("\"5y\"").unwrap();
        assert_eq!(p, Period::FiveYears);
    }

    #[test]
    fn default_period_is_two_years() {
        assert_eq!(Period::default(), Period::TwoYears);
    }

    #[test]
    fn threshold_bounds() {
        assert!(ThresholdPct::new(9).is_none());
        assert!(ThresholdPct::new(51).is_none());
        assert_eq!(ThresholdPct::new(10).unwrap().get(), 10);
        assert_eq!(ThresholdPct::new(50).unwrap().get(), 50);
        assert_eq!(ThresholdPct::default().get(), 20);
    }

    #[test]
    fn threshold_clamps_like_a_slider() {
        assert_eq!(ThresholdPct::clamped(-4).get(), 10);
        assert_eq!(ThresholdPct::clamped(99).get(), 50);
        assert_eq!(ThresholdPct::clamped(33).get(), 33);
    }

    #[test]
    fn threshold_deserialise_rejects_out_of_range() {
        assert!(serde_json::from_str::<ThresholdPct>("60").is_err());
        let t: ThresholdPct = serde_json::from_str("25").unwrap();
        assert_eq!(t.get(), 25);
    }
}
