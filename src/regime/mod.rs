// =============================================================================
// Regime Classification Module
// =============================================================================
//
// Point-in-time volatility regime: the latest annualized volatility against a
// user-chosen percentage threshold.

pub mod classifier;

pub use classifier::{classify, RegimeState};
