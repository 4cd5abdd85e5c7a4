//! Error types for the scoring engine

use thiserror::Error;

/// Errors surfaced by the statistics engine and the transaction handler
#[derive(Debug, Error)]
pub enum EngineError {
    /// Negative input to the integer square root
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    /// Observed values must be non-negative
    #[error("Observed value must be non-negative, got {0}")]
    NegativeValue(String),

    #[error("Smoothing factor must be in (0, 1] at 6 digit precision, got {0}")]
    InvalidAlpha(String),

    #[error("Thresholds must satisfy normal <= low <= mid, got {normal}/{low}/{mid}")]
    InvalidThresholds { normal: u64, low: u64, mid: u64 },

    /// A gas amount or price string could not be parsed
    #[error("Invalid quantity '{0}'")]
    InvalidQuantity(String),

    #[error("Receipt lookup failed for transaction {hash}: {source}")]
    ReceiptLookup {
        hash: String,
        #[source]
        source: anyhow::Error,
    },
}

pub type Result<T> = std::result::Result<T, EngineError>;
