//! Error types for pixbridge.

use std::time::Duration;
use thiserror::Error;

/// Result type alias using pixbridge's Error.
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for pixbridge operations.
#[derive(Error, Debug)]
pub enum Error {
    /// Byte count disagrees with the declared image dimensions.
    #[error("shape mismatch: expected {expected} bytes, got {actual}")]
    ShapeMismatch {
        /// Number of bytes the declared shape requires.
        expected: usize,
        /// Number of bytes actually supplied.
        actual: usize,
    },

    /// Channel count outside {1, 3}.
    #[error("unsupported channel count: {0} (expected 1 or 3)")]
    UnsupportedChannelCount(u8),

    /// External encoder or decoder failed.
    #[error("codec error: {0}")]
    Codec(String),

    /// I/O error on backing storage, transient files or system calls.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The shared region lock was not acquired within the bound.
    #[error("timed out after {0:?} waiting for shared region lock")]
    LockTimeout(Duration),

    /// A retrieval was attempted before any image was set.
    #[error("no image has been set")]
    NoImage,

    /// The shared channel has no live mapping.
    #[error("shared region is not mapped")]
    Unmapped,
}

impl Error {
    /// Whether the caller may reasonably retry the same operation.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Error::LockTimeout(_))
    }

    pub(crate) fn shape(expected: usize, actual: usize) -> Self {
        Error::ShapeMismatch { expected, actual }
    }
}

impl From<rustix::io::Errno> for Error {
    fn from(errno: rustix::io::Errno) -> Self {
        Error::Io(errno.into())
    }
}
