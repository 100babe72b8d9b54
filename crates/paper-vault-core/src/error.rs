//! Error types for Paper Vault core.

use chrono::{DateTime, Utc};
use thiserror::Error;

/// Errors raised by the streaming cipher and key material handling.
#[derive(Debug, Error)]
pub enum CryptoError {
    #[error("invalid key length: expected {expected} bytes, got {got}")]
    InvalidKeyLength { expected: usize, got: usize },

    #[error("invalid iv length: expected {expected} bytes, got {got}")]
    InvalidIvLength { expected: usize, got: usize },

    #[error("invalid hex encoding: {0}")]
    InvalidHex(#[from] hex::FromHexError),

    /// Ciphertext is truncated, not block aligned, or carries bad padding.
    #[error("corrupt ciphertext: {0}")]
    Corrupt(String),

    /// The authentication tag did not match.
    #[error("ciphertext integrity check failed")]
    IntegrityCheckFailed,

    #[error("I/O error during transform: {0}")]
    Io(#[from] std::io::Error),
}

/// Errors raised when constructing or mutating a distribution window.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum WindowError {
    #[error("window end {end} must be strictly after start {start}")]
    EmptyOrInverted {
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    },

    #[error("window duration must be positive")]
    NonPositiveDuration,
}
