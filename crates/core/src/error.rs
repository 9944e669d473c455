//! Error types for the core primitives

use thiserror::Error;

/// Core primitive errors
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CoreError {
    /// Byte input of the wrong length
    #[error("Invalid length: expected {expected}, got {actual}")]
    InvalidLength {
        /// Required number of bytes
        expected: usize,
        /// Number of bytes supplied
        actual: usize,
    },

    /// Invalid format error with detailed description
    #[error("Invalid format: {message}")]
    InvalidFormat {
        /// Error message describing the format issue
        message: String,
    },
}

/// Result type for core operations
pub type CoreResult<T> = Result<T, CoreError>;
