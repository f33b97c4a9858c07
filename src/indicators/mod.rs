// =============================================================================
// Technical Indicators Module
// =============================================================================
//
// Pure, side-effect-free computations over price series.

pub mod volatility;

pub use volatility::{rolling_volatility, VolatilityParams, VolatilityPoint, VolatilitySeries};
