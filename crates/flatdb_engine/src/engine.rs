//! The engine operation contract.

use crate::error::EngineResult;

/// What an opened engine can do.
///
/// The connection layer consults these flags instead of guessing a driver's
/// behaviour from its name.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Capabilities {
    /// `insert` on an existing key appends another value instead of failing.
    pub duplicates: bool,
    /// The cursor yields keys in ascending byte order.
    pub sorted_keys: bool,
    /// Writes are rejected.
    pub read_only: bool,
    /// Writes only become visible after the file is closed and reopened.
    pub deferred_writes: bool,
}

/// A flat-file key-value engine.
///
/// Keys and values are opaque bytes. An engine is one open connection to one
/// file; its cursor state (`first_key`/`next_key`) belongs to the connection,
/// so only one traversal can be in progress at a time.
///
/// # Invariants
///
/// - Read operations never fail: absence is `false` or `None`
/// - `delete` removes every value stored under a key
/// - `close` is called at most once; dropping an engine without closing it
///   may lose buffered writes
pub trait Engine: Send {
    /// Returns the driver name this engine was opened with.
    fn driver(&self) -> &'static str;

    /// Returns the capabilities of this connection.
    fn capabilities(&self) -> Capabilities;

    /// Stores `value` under a new key, or appends it when duplicates are
    /// supported.
    ///
    /// # Errors
    ///
    /// Returns `KeyExists` when the key already holds a value and duplicates
    /// are not supported, or `ReadOnly` on a read-only connection.
    fn insert(&mut self, key: &[u8], value: &[u8]) -> EngineResult<()>;

    /// Overwrites the first value under `key`, creating the key if needed.
    ///
    /// # Errors
    ///
    /// Returns `ReadOnly` on a read-only connection or `Unsupported` when the
    /// format cannot overwrite.
    fn replace(&mut self, key: &[u8], value: &[u8]) -> EngineResult<()>;

    /// Removes every value stored under `key`.
    ///
    /// # Errors
    ///
    /// Returns `KeyNotFound` when nothing is stored under `key`, or
    /// `ReadOnly` on a read-only connection.
    fn delete(&mut self, key: &[u8]) -> EngineResult<()>;

    /// Returns whether any value is stored under `key`.
    fn exists(&self, key: &[u8]) -> bool;

    /// Returns the value at offset `skip` under `key`.
    fn fetch(&self, key: &[u8], skip: usize) -> Option<Vec<u8>>;

    /// Positions the cursor at the first key and returns it.
    fn first_key(&mut self) -> Option<Vec<u8>>;

    /// Advances the cursor and returns the next key.
    fn next_key(&mut self) -> Option<Vec<u8>>;

    /// Makes all accepted writes durable.
    ///
    /// # Errors
    ///
    /// Returns an error if the underlying storage fails.
    fn sync(&mut self) -> EngineResult<()>;

    /// Reclaims space held by superseded data.
    ///
    /// # Errors
    ///
    /// Returns an error if the underlying storage fails.
    fn optimize(&mut self) -> EngineResult<()>;

    /// Flushes pending data and releases the file.
    ///
    /// # Errors
    ///
    /// Returns an error if pending data cannot be written.
    fn close(self: Box<Self>) -> EngineResult<()>;
}
