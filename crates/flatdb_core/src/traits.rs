//! Capability traits implemented by [`KeyStore`](crate::KeyStore).

use crate::error::StoreResult;
use crate::key::EffectiveKey;

/// Map-style access to single values.
///
/// Keys are caller keys; implementations apply their current namespace.
pub trait KeyedAccess {
    /// Returns the first value under `key`.
    fn get(&self, key: &[u8]) -> Option<Vec<u8>>;

    /// Sets the first value under `key`.
    ///
    /// # Errors
    ///
    /// Returns an error if the write is rejected.
    fn set(&mut self, key: &[u8], value: &[u8]) -> StoreResult<()>;

    /// Removes every value under `key`.
    ///
    /// # Errors
    ///
    /// Returns an error if the key is absent or the write is rejected.
    fn remove(&mut self, key: &[u8]) -> StoreResult<()>;

    /// Returns whether `key` holds a value.
    fn contains(&self, key: &[u8]) -> bool;
}

/// A source of `(key, value)` pairs read from the start.
pub trait EntrySource {
    /// The pair iterator.
    type Entries<'a>: Iterator<Item = (EffectiveKey, Vec<u8>)>
    where
        Self: 'a;

    /// Returns an iterator positioned before the first pair.
    ///
    /// The sequence is finite and yields the first value of each key.
    fn entries_from_start(&self) -> Self::Entries<'_>;
}
