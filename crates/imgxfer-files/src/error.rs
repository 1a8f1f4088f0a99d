//! Error types for direct I/O transfers.

use std::io;
use thiserror::Error;

/// Result type for file operations
pub type Result<T> = std::result::Result<T, FileError>;

/// File transfer errors
#[derive(Debug, Error)]
pub enum FileError {
    /// Size, offset or alignment is not a multiple of the sector size
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// Source stream ended before the requested number of bytes
    #[error("source exhausted after {received} of {size} bytes")]
    SourceExhausted {
        /// Bytes written to the target before the stream ended
        received: u64,
        /// Bytes requested
        size: u64,
    },

    /// Read, write or sync failure
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
}

impl FileError {
    pub(crate) fn invalid(msg: impl Into<String>) -> Self {
        Self::InvalidArgument(msg.into())
    }
}
