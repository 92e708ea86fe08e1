//! Error types for engine operations.

use crate::control::Tier;
use flatdb_storage::StorageError;
use thiserror::Error;

/// Result type for engine operations.
pub type EngineResult<T> = Result<T, EngineError>;

/// Errors reported by engines and the driver table.
#[derive(Debug, Error)]
pub enum EngineError {
    /// Storage backend error.
    #[error("storage error: {0}")]
    Storage(#[from] StorageError),

    /// The control string is malformed.
    #[error("invalid control string {control:?}: {reason}")]
    InvalidControl {
        /// The rejected control string.
        control: String,
        /// Why it was rejected.
        reason: String,
    },

    /// No driver with this name is compiled in.
    #[error("unknown driver: {name}")]
    UnknownDriver {
        /// The requested driver name.
        name: String,
    },

    /// The driver cannot be opened with this access tier.
    #[error("driver {driver} does not support access tier '{}'", tier.as_char())]
    UnsupportedTier {
        /// The driver name.
        driver: &'static str,
        /// The requested tier.
        tier: Tier,
    },

    /// The driver does not implement this operation.
    #[error("driver {driver} does not support {operation}")]
    Unsupported {
        /// The driver name.
        driver: &'static str,
        /// The rejected operation.
        operation: &'static str,
    },

    /// The connection has already been closed.
    #[error("connection is closed")]
    Closed,

    /// The connection was opened read-only.
    #[error("engine is read-only")]
    ReadOnly,

    /// Insert on a key that already holds a value.
    #[error("key already exists")]
    KeyExists,

    /// Delete on a key that holds no value.
    #[error("key not found")]
    KeyNotFound,

    /// The file does not hold data in the driver's format.
    #[error("corrupted {driver} file: {message}")]
    Corrupted {
        /// The driver that read the file.
        driver: &'static str,
        /// Description of the corruption.
        message: String,
    },

    /// The data exceeds a limit of the on-disk format.
    #[error("{driver} format limit exceeded: {message}")]
    TooLarge {
        /// The driver whose format overflowed.
        driver: &'static str,
        /// Description of the limit.
        message: String,
    },
}

impl EngineError {
    /// Creates an invalid control string error.
    pub fn invalid_control(control: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidControl {
            control: control.into(),
            reason: reason.into(),
        }
    }

    /// Creates a corruption error.
    pub fn corrupted(driver: &'static str, message: impl Into<String>) -> Self {
        Self::Corrupted {
            driver,
            message: message.into(),
        }
    }

    /// Creates a format limit error.
    pub fn too_large(driver: &'static str, message: impl Into<String>) -> Self {
        Self::TooLarge {
            driver,
            message: message.into(),
        }
    }
}
