//! Error types for FlatDB core.

use crate::key::EffectiveKey;
use crate::mode::OpenMode;
use flatdb_engine::EngineError;
use std::path::PathBuf;
use thiserror::Error;

/// Result type for store operations.
pub type StoreResult<T> = Result<T, StoreError>;

/// Errors reported by stores and handles.
///
/// Absent keys are never errors; lookups return `None` or `false`.
#[derive(Debug, Error)]
pub enum StoreError {
    /// The open mode has no access tier flag.
    #[error("invalid open mode {mode}: one of READ, WRITE, CREATE or TRUNCATE is required")]
    InvalidMode {
        /// The rejected mode.
        mode: OpenMode,
    },

    /// The engine connection could not be opened.
    #[error("cannot open {} with control string {control:?}: {source}", path.display())]
    Open {
        /// Database path.
        path: PathBuf,
        /// Control string the open was attempted with.
        control: String,
        /// Underlying failure.
        #[source]
        source: EngineError,
    },

    /// The engine rejected an insert.
    #[error("cannot insert {key}: {source}")]
    Insert {
        /// The effective key.
        key: EffectiveKey,
        /// Underlying failure.
        #[source]
        source: EngineError,
    },

    /// The engine rejected a replace.
    #[error("cannot replace {key}: {source}")]
    Replace {
        /// The effective key.
        key: EffectiveKey,
        /// Underlying failure.
        #[source]
        source: EngineError,
    },

    /// The engine rejected a delete.
    #[error("cannot delete {key}: {source}")]
    Delete {
        /// The effective key.
        key: EffectiveKey,
        /// Underlying failure.
        #[source]
        source: EngineError,
    },

    /// Flushing to disk failed.
    #[error("sync failed: {source}")]
    Sync {
        /// Underlying failure.
        #[source]
        source: EngineError,
    },

    /// Compaction failed.
    #[error("optimize failed: {source}")]
    Optimize {
        /// Underlying failure.
        #[source]
        source: EngineError,
    },

    /// Closing the connection failed.
    #[error("close failed: {source}")]
    Close {
        /// Underlying failure.
        #[source]
        source: EngineError,
    },

    /// A namespaced key could not be encoded.
    #[error("key codec error: {0}")]
    Codec(#[from] flatdb_codec::CodecError),
}

impl StoreError {
    /// Returns the engine error behind this error, if any.
    #[must_use]
    pub fn engine_error(&self) -> Option<&EngineError> {
        match self {
            Self::Open { source, .. }
            | Self::Insert { source, .. }
            | Self::Replace { source, .. }
            | Self::Delete { source, .. }
            | Self::Sync { source }
            | Self::Optimize { source }
            | Self::Close { source } => Some(source),
            Self::InvalidMode { .. } | Self::Codec(_) => None,
        }
    }
}
