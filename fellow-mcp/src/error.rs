//! Error types for Fellow API operations
//!
//! Every failure of the call layer either resolves through a retry or ends up
//! as one of these variants; nothing is swallowed.

use crate::retry::RetryError;
use crate::transport::TransportError;
use thiserror::Error;

/// Fellow client error types.
#[derive(Debug, Error)]
pub enum FellowError {
    /// Terminal upstream failure, surfaced verbatim
    #[error(transparent)]
    Upstream(#[from] TransportError),

    /// Every attempt failed with a retryable status
    #[error("Fellow API unavailable after {attempts} attempts")]
    RetriesExhausted {
        /// Attempts made before giving up.
        attempts: u32,
    },

    /// The request succeeded but carried no entity
    #[error("{kind} not found: {id}")]
    NotFound {
        /// Entity kind ("note", "recording").
        kind: &'static str,
        /// Requested identifier.
        id: String,
    },

    /// Caller supplied an out-of-range or malformed argument
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),
}

/// Result type for Fellow client operations.
pub type FellowResult<T> = Result<T, FellowError>;

impl From<RetryError<TransportError>> for FellowError {
    fn from(err: RetryError<TransportError>) -> Self {
        match err {
            RetryError::Terminal(e) => FellowError::Upstream(e),
            RetryError::Exhausted { attempts } => FellowError::RetriesExhausted { attempts },
        }
    }
}

impl FellowError {
    /// Whether this is a not-found domain failure.
    pub fn is_not_found(&self) -> bool {
        matches!(self, FellowError::NotFound { .. })
    }

    /// Whether the caller supplied bad input.
    pub fn is_invalid_argument(&self) -> bool {
        matches!(self, FellowError::InvalidArgument(_))
    }
}
