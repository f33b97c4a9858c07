// =============================================================================
// Pipeline Error Types
// =============================================================================
//
// Each stage returns its own typed error. The presentation layer collapses all
// of them into one user-facing message, while `ErrorKind` keeps the stage
// identity available for logs and the recent-errors ring.
// =============================================================================

use serde::Serialize;
use thiserror::Error;

/// The fetch stage could not produce a price series.
#[derive(Debug, Clone, Error)]
#[error("data unavailable for '{ticker}': {reason}")]
pub struct DataUnavailable {
    pub ticker: String,
    pub reason: String,
}

impl DataUnavailable {
    pub fn new(ticker: impl Into<String>, reason: impl Into<String>) -> Self {
        Self {
            ticker: ticker.into(),
            reason: reason.into(),
        }
    }

    /// Wrap an `anyhow` chain, keeping every context layer in `reason`.
    pub fn from_anyhow(ticker: impl Into<String>, err: &anyhow::Error) -> Self {
        Self::new(ticker, format!("{err:#}"))
    }
}

/// The volatility stage could not produce a usable series.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ComputationError {
    #[error("{available} prices cannot fill a {window}-day rolling window")]
    InsufficientData { window: usize, available: usize },
}

/// Any failure of the fetch → compute → classify chain.
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error(transparent)]
    DataUnavailable(#[from] DataUnavailable),

    #[error(transparent)]
    Computation(#[from] ComputationError),

    #[error("unexpected failure: {0:#}")]
    Unknown(#[from] anyhow::Error),
}

/// Stage identity of a [`PipelineError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    DataUnavailable,
    Computation,
    Unknown,
}

impl std::fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::DataUnavailable => write!(f, "data_unavailable"),
            Self::Computation => write!(f, "computation"),
            Self::Unknown => write!(f, "unknown"),
        }
    }
}

impl PipelineError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::DataUnavailable(_) => ErrorKind::DataUnavailable,
            Self::Computation(_) => ErrorKind::Computation,
            Self::Unknown(_) => ErrorKind::Unknown,
        }
    }
}

/// The single message shown to users regardless of which stage failed.
pub fn user_message(ticker: &str) -> String {
    format!("Error: Could not fetch data for ticker '{ticker}'. Please check the symbol.")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kinds_map_from_stage_errors() {
        let e: PipelineError = DataUnavailable::new("ZZZ", "not found").into();
        assert_eq!(e.kind(), ErrorKind::DataUnavailable);

        let e: PipelineError = ComputationError::InsufficientData {
            window: 22,
            available: 5,
        }
        .into();
        assert_eq!(e.kind(), ErrorKind::Computation);

        let e: PipelineError = anyhow::anyhow!("boom").into();
        assert_eq!(e.kind(), ErrorKind::Unknown);
    }

    #[test]
    fn user_message_names_the_ticker() {
        let msg = user_message("ZZZINVALID");
        assert_eq!(
            msg,
            "Error: Could not fetch data for ticker 'ZZZINVALID'. Please check the symbol."
        );
    }

    #[test]
    fn from_anyhow_keeps_context_chain() {
        let err = anyhow::anyhow!("connection refused").context("GET chart failed");
        let du = DataUnavailable::from_anyhow("SPY", &err);
        assert!(du.reason.contains("GET chart failed"));
        assert!(du.reason.contains("connection refused"));
    }

    #[test]
    fn error_kind_serialises_snake_case() {
        assert_eq!(
            serde_json::to_string(&ErrorKind::DataUnavailable).unwrap(),
            "\"data_unavailable\""
        );
    }
}
