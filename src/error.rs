//! Error types for ledger loading and rate solving

use thiserror::Error;

/// Result alias used throughout the crate
pub type FundResult<T> = Result<T, FundError>;

/// Errors that abort processing of a ledger (or of a single period)
#[derive(Error, Debug)]
pub enum FundError {
    /// A non-skipped ledger row is missing a required field or holds a non-numeric value
    #[error("Malformed ledger record at row {row}: {reason}")]
    MalformedRecord {
        /// 1-based data row (header excluded)
        row: usize,
        /// What was wrong with the row
        reason: String,
    },

    /// Root-finder did not converge for the cash-flow prefix ending at `period`
    #[error("IRR solve for period {period} did not converge after {iterations} iterations (residual: {residual:.2e})")]
    NonConvergence {
        period: u32,
        iterations: u32,
        residual: f64,
    },

    /// Input that no computation can be run on (e.g., an empty cash-flow series)
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Missing or invalid run configuration
    #[error("Configuration error: {0}")]
    Config(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Csv(#[from] csv::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

impl FundError {
    pub(crate) fn malformed(row: usize, reason: impl Into<String>) -> Self {
        FundError::MalformedRecord {
            row,
            reason: reason.into(),
        }
    }
}
