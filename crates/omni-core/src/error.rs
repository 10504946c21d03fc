//! Error types for omni-core.

use thiserror::Error;

/// Listing codec errors.
///
/// A record that fails to decode is never partially populated.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DecodeError {
    #[error("Invalid listing length: expected {expected} bytes, got {actual}")]
    InvalidLength { expected: usize, actual: usize },

    #[error("Invalid registry key length: expected {expected} bytes, got {actual}")]
    InvalidKeyLength { expected: usize, actual: usize },
}

/// Core error types.
#[derive(Debug, Error)]
pub enum CoreError {
    #[error("Invalid address: {0}")]
    InvalidAddress(String),

    #[error("Invalid amount: {0}")]
    InvalidAmount(String),

    #[error("Decode error: {0}")]
    Decode(#[from] DecodeError),
}

/// Result type alias for core operations.
pub type Result<T> = std::result::Result<T, CoreError>;
