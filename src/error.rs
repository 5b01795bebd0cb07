//! Error types for txgate

use thiserror::Error;

/// Main error type for transaction preparation
#[derive(Error, Debug)]
pub enum PrepError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Failed to parse {field} as a hex quantity: {value:?}")]
    Parse { field: &'static str, value: String },

    #[error("Invalid parameter: {0}")]
    InvalidParameter(String),

    #[error("Insufficient balance: have {have}, need {need}")]
    InsufficientBalance { have: String, need: String },

    #[error("Gas estimate {estimated} exceeds block gas limit {block_limit}")]
    OversizedEstimate {
        estimated: String,
        block_limit: String,
    },

    #[error("Arithmetic overflow computing {0}")]
    Overflow(&'static str),

    #[error("Chain {chain_id} not found")]
    ChainNotFound { chain_id: u64 },

    #[error("Status endpoint error: {0}")]
    Status(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl PrepError {
    /// Check if error is retryable
    pub fn is_retryable(&self) -> bool {
        matches!(self, PrepError::Status(_))
    }

    /// Check if error rejects a caller-supplied transaction rather than
    /// reporting a service-side failure. Each rejection maps to a distinct
    /// corrective action: fix the input, fund the account, or lower the
    /// estimate.
    pub fn is_rejection(&self) -> bool {
        matches!(
            self,
            PrepError::Parse { .. }
                | PrepError::InvalidParameter(_)
                | PrepError::InsufficientBalance { .. }
                | PrepError::OversizedEstimate { .. }
                | PrepError::Overflow(_)
        )
    }
}

/// Result type for preparation operations
pub type PrepResult<T> = Result<T, PrepError>;
