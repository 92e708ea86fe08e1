//! The `btree` driver: sorted keys with duplicate values.

use crate::control::Tier;
use crate::engine::{Capabilities, Engine};
use crate::error::{EngineError, EngineResult};
use crate::log::{LogOp, LogRecord, LogStore, MAGIC_SIZE};
use flatdb_storage::{FileBackend, StorageBackend};
use std::collections::BTreeMap;
use std::ops::Bound;
use std::path::Path;
use tracing::debug;

const DRIVER: &str = "btree";
const MAGIC: &[u8; MAGIC_SIZE] = b"FDBTREE1";

/// A sorted engine that keeps every value inserted under a key.
///
/// Values under one key are ordered by insertion; `fetch` with a skip count
/// selects among them. `replace` overwrites the first value only.
pub struct BTreeEngine {
    log: LogStore,
    tree: BTreeMap<Vec<u8>, Vec<Vec<u8>>>,
    cursor: Option<Vec<u8>>,
}

fn apply_replace(tree: &mut BTreeMap<Vec<u8>, Vec<Vec<u8>>>, key: Vec<u8>, value: Vec<u8>) {
    match tree.get_mut(&key) {
        Some(values) => values[0] = value,
        None => {
            tree.insert(key, vec![value]);
        }
    }
}

impl BTreeEngine {
    /// Opens the file at `path` under `tier`.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be opened or is not a btree file.
    pub fn open(path: &Path, tier: Tier) -> EngineResult<Self> {
        let backend = FileBackend::open_with(path, tier.access_mode())?;
        Self::with_backend(Box::new(backend), tier)
    }

    /// Opens an engine over an existing backend.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend holds data in another format.
    pub fn with_backend(mut backend: Box<dyn StorageBackend>, tier: Tier) -> EngineResult<Self> {
        if tier == Tier::Truncate {
            backend.truncate(0)?;
        }
        let writable = tier.is_writable() && !backend.is_read_only();

        let mut tree: BTreeMap<Vec<u8>, Vec<Vec<u8>>> = BTreeMap::new();
        let log = LogStore::open(DRIVER, MAGIC, backend, writable, |record| match record.op {
            LogOp::Insert => tree.entry(record.key).or_default().push(record.value),
            LogOp::Replace => apply_replace(&mut tree, record.key, record.value),
            LogOp::Delete => {
                tree.remove(&record.key);
            }
        })?;

        debug!(keys = tree.len(), writable, "opened btree engine");

        Ok(Self {
            log,
            tree,
            cursor: None,
        })
    }

    /// Returns the number of distinct keys.
    #[must_use]
    pub fn len(&self) -> usize {
        self.tree.len()
    }

    /// Returns whether no keys are stored.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.tree.is_empty()
    }

    /// Returns how many values are stored under `key`.
    #[must_use]
    pub fn value_count(&self, key: &[u8]) -> usize {
        self.tree.get(key).map_or(0, Vec::len)
    }
}

impl Engine for BTreeEngine {
    fn driver(&self) -> &'static str {
        DRIVER
    }

    fn capabilities(&self) -> Capabilities {
        Capabilities {
            duplicates: true,
            sorted_keys: true,
            read_only: !self.log.is_writable(),
            deferred_writes: false,
        }
    }

    fn insert(&mut self, key: &[u8], value: &[u8]) -> EngineResult<()> {
        self.log.append(&LogRecord::insert(key, value))?;
        self.tree.entry(key.to_vec()).or_default().push(value.to_vec());
        Ok(())
    }

    fn replace(&mut self, key: &[u8], value: &[u8]) -> EngineResult<()> {
        self.log.append(&LogRecord::replace(key, value))?;
        apply_replace(&mut self.tree, key.to_vec(), value.to_vec());
        Ok(())
    }

    fn delete(&mut self, key: &[u8]) -> EngineResult<()> {
        if !self.log.is_writable() {
            return Err(EngineError::ReadOnly);
        }
        if !self.tree.contains_key(key) {
            return Err(EngineError::KeyNotFound);
        }
        self.log.append(&LogRecord::delete(key))?;
        self.tree.remove(key);
        Ok(())
    }

    fn exists(&self, key: &[u8]) -> bool {
        self.tree.contains_key(key)
    }

    fn fetch(&self, key: &[u8], skip: usize) -> Option<Vec<u8>> {
        self.tree.get(key)?.get(skip).cloned()
    }

    fn first_key(&mut self) -> Option<Vec<u8>> {
        self.cursor = self.tree.keys().next().cloned();
        self.cursor.clone()
    }

    fn next_key(&mut self) -> Option<Vec<u8>> {
        let last = self.cursor.take()?;
        self.cursor = self
            .tree
            .range::<[u8], _>((Bound::Excluded(last.as_slice()), Bound::Unbounded))
            .next()
            .map(|(k, _)| k.clone());
        self.cursor.clone()
    }

    fn sync(&mut self) -> EngineResult<()> {
        if self.log.is_writable() {
            self.log.sync()?;
        }
        Ok(())
    }

    fn optimize(&mut self) -> EngineResult<()> {
        let records: Vec<LogRecord> = self
            .tree
            .iter()
            .flat_map(|(k, values)| values.iter().map(move |v| LogRecord::insert(k, v)))
            .collect();
        self.log.rewrite(records)
    }

    fn close(mut self: Box<Self>) -> EngineResult<()> {
        self.sync()
    }
}
