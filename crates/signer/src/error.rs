//! Signer error types.

use thiserror::Error;

/// Token signing errors.
#[derive(Debug, Error)]
pub enum SignerError {
    #[error("secret key must not be empty")]
    EmptySecret,

    #[error("invalid key: {0}")]
    InvalidKey(String),

    #[error("malformed token: {0}")]
    MalformedToken(String),

    #[error("timestamp error: {0}")]
    Timestamp(String),

    #[error("verification failed")]
    VerificationFailed,
}

/// Result type for signing operations.
pub type SignerResult<T> = std::result::Result<T, SignerError>;
