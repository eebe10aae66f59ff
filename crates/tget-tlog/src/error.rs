//! Error types for tget-tlog

use thiserror::Error;

/// Errors that can occur in log client operations
#[derive(Error, Debug)]
pub enum Error {
    /// A trust cache operation failed (storage or transport)
    #[error(transparent)]
    Ops(#[from] tget_cache::Error),

    /// The log response could not be parsed as a signed note
    #[error("malformed note: {0}")]
    BadNote(String),

    /// The verifier key string could not be parsed
    #[error("malformed verifier key: {0}")]
    BadVerifierKey(String),

    /// Verification failed. Fail closed: callers must not act on any data
    /// from the operation that produced this error.
    #[error("security violation: {0}")]
    SecurityViolation(String),
}

impl Error {
    /// True if verification failed and the operation must not be trusted
    pub fn is_security_violation(&self) -> bool {
        matches!(self, Error::SecurityViolation(_))
    }
}

/// Result type for log client operations
pub type Result<T> = std::result::Result<T, Error>;
