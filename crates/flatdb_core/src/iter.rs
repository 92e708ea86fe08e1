//! Forward cursors over a store.
//!
//! A [`StoreIterator`] drives the connection's single engine cursor. Two
//! iterators over the same connection share that cursor and disturb each
//! other; only one traversal should be active at a time.

use crate::handle::EngineHandle;
use crate::key::EffectiveKey;

#[derive(Debug, Clone, PartialEq, Eq)]
enum CursorState {
    Unpositioned,
    Positioned(EffectiveKey),
    Exhausted,
}

/// A restartable cursor yielding effective keys in engine order.
///
/// Keys are yielded whole, namespace included; use [`EffectiveKey::key`] to
/// get the caller key back.
#[derive(Debug)]
pub struct StoreIterator<'a> {
    handle: &'a EngineHandle,
    state: CursorState,
}

impl<'a> StoreIterator<'a> {
    pub(crate) fn new(handle: &'a EngineHandle) -> Self {
        Self {
            handle,
            state: CursorState::Unpositioned,
        }
    }

    fn settle(&mut self, key: Option<EffectiveKey>) {
        self.state = match key {
            Some(key) => CursorState::Positioned(key),
            None => CursorState::Exhausted,
        };
    }

    /// Moves to the first key.
    pub fn rewind(&mut self) {
        let key = self.handle.raw_first_key();
        self.settle(key);
    }

    /// Moves to the next key.
    ///
    /// An iterator that was never positioned rewinds instead. Once exhausted
    /// it stays exhausted until [`rewind`](Self::rewind).
    #[allow(clippy::should_implement_trait)]
    pub fn next(&mut self) {
        match self.state {
            CursorState::Unpositioned => self.rewind(),
            CursorState::Positioned(_) => {
                let key = self.handle.raw_next_key();
                self.settle(key);
            }
            CursorState::Exhausted => {}
        }
    }

    /// Returns whether the iterator is on a key.
    #[must_use]
    pub fn valid(&self) -> bool {
        matches!(self.state, CursorState::Positioned(_))
    }

    /// Returns the current key.
    #[must_use]
    pub fn key(&self) -> Option<&EffectiveKey> {
        match &self.state {
            CursorState::Positioned(key) => Some(key),
            _ => None,
        }
    }

    /// Returns the first value under the current key.
    #[must_use]
    pub fn current(&self) -> Option<Vec<u8>> {
        self.key().and_then(|key| self.handle.raw_fetch(key, 0))
    }

    /// Converts the cursor into an [`Iterator`] over `(key, value)` pairs,
    /// starting from the first key.
    #[must_use]
    pub fn entries(self) -> Entries<'a> {
        Entries {
            cursor: self,
            started: false,
        }
    }
}

/// Iterator over `(key, first value)` pairs of a store.
#[derive(Debug)]
pub struct Entries<'a> {
    cursor: StoreIterator<'a>,
    started: bool,
}

impl Iterator for Entries<'_> {
    type Item = (EffectiveKey, Vec<u8>);

    fn next(&mut self) -> Option<Self::Item> {
        if self.started {
            self.cursor.next();
        } else {
            self.cursor.rewind();
            self.started = true;
        }

        loop {
            let key = self.cursor.key()?.clone();
            match self.cursor.current() {
                Some(value) => return Some((key, value)),
                // Removed since the cursor passed it.
                None => self.cursor.next(),
            }
        }
    }
}
