//! Relay error types

use std::io;

use thiserror::Error;

/// Errors returned by relay operations
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RelayError {
    /// A non-blocking call could not proceed immediately
    #[error("Operation would block")]
    WouldBlock,

    /// A blocking wait was cancelled before data or space became available
    #[error("Wait interrupted")]
    Interrupted,

    /// A bounded wait reached its deadline
    #[error("Wait timed out")]
    TimedOut,

    #[error("Invalid capacity {requested} (must be 1..={max} bytes)")]
    InvalidArgument { requested: usize, max: usize },

    #[error("Failed to allocate {requested} bytes")]
    OutOfMemory { requested: usize },
}

/// Result type alias for relay operations
pub type Result<T> = std::result::Result<T, RelayError>;

impl From<RelayError> for io::Error {
    fn from(err: RelayError) -> Self {
        let kind = match err {
            RelayError::WouldBlock => io::ErrorKind::WouldBlock,
            RelayError::Interrupted => io::ErrorKind::Interrupted,
            RelayError::TimedOut => io::ErrorKind::TimedOut,
            RelayError::InvalidArgument { .. } => io::ErrorKind::InvalidInput,
            RelayError::OutOfMemory { .. } => io::ErrorKind::OutOfMemory,
        };
        io::Error::new(kind, err)
    }
}
