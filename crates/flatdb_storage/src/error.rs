//! Error types for storage operations.

use std::io;
use std::path::PathBuf;
use thiserror::Error;

/// Result type for storage operations.
pub type StorageResult<T> = Result<T, StorageError>;

/// Errors that can occur during storage operations.
#[derive(Debug, Error)]
pub enum StorageError {
    /// An I/O error occurred.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// Attempted to read beyond the end of storage.
    #[error("read beyond end of storage: offset {offset}, len {len}, size {size}")]
    ReadPastEnd {
        /// The requested read offset.
        offset: u64,
        /// The requested read length.
        len: usize,
        /// The current storage size.
        size: u64,
    },

    /// The backend was opened read-only.
    #[error("storage is read-only")]
    ReadOnly,

    /// A non-blocking lock request found the file already locked.
    #[error("file is locked by another holder: {}", path.display())]
    Locked {
        /// The file that could not be locked.
        path: PathBuf,
    },

    /// The file required by the access mode does not exist.
    #[error("file does not exist: {}", path.display())]
    NotFound {
        /// The missing file.
        path: PathBuf,
    },
}

impl StorageError {
    /// Creates an invalid-input I/O error with the given message.
    pub fn invalid_input(message: impl Into<String>) -> Self {
        Self::Io(io::Error::new(io::ErrorKind::InvalidInput, message.into()))
    }
}
