//! The `hash` driver: one value per key, unordered traversal.

use crate::control::Tier;
use crate::engine::{Capabilities, Engine};
use crate::error::{EngineError, EngineResult};
use crate::log::{LogOp, LogRecord, LogStore, MAGIC_SIZE};
use flatdb_storage::{FileBackend, StorageBackend};
use std::collections::HashMap;
use std::path::Path;
use tracing::debug;

const DRIVER: &str = "hash";
const MAGIC: &[u8; MAGIC_SIZE] = b"FDBHASH1";

/// A hash table engine persisted as an operation log.
///
/// Inserting an existing key fails with [`EngineError::KeyExists`]; use
/// `replace` to overwrite.
pub struct HashEngine {
    log: LogStore,
    table: HashMap<Vec<u8>, Vec<u8>>,
    cursor: Vec<Vec<u8>>,
    position: usize,
    superseded: usize,
}

impl HashEngine {
    /// Opens the file at `path` under `tier`.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be opened or is not a hash file.
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

        let mut table = HashMap::new();
        let mut superseded = 0usize;
        let log = LogStore::open(DRIVER, MAGIC, backend, writable, |record| match record.op {
            LogOp::Insert | LogOp::Replace => {
                if table.insert(record.key, record.value).is_some() {
                    superseded += 1;
                }
            }
            LogOp::Delete => {
                table.remove(&record.key);
                superseded += 1;
            }
        })?;

        debug!(keys = table.len(), writable, "opened hash engine");

        Ok(Self {
            log,
            table,
            cursor: Vec::new(),
            position: 0,
            superseded,
        })
    }

    /// Returns the number of keys.
    #[must_use]
    pub fn len(&self) -> usize {
        self.table.len()
    }

    /// Returns whether no keys are stored.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.table.is_empty()
    }

    fn advance(&mut self) -> Option<Vec<u8>> {
        while let Some(key) = self.cursor.get(self.position) {
            self.position += 1;
            if self.table.contains_key(key) {
                return Some(key.clone());
            }
        }
        None
    }
}

impl Engine for HashEngine {
    fn driver(&self) -> &'static str {
        DRIVER
    }

    fn capabilities(&self) -> Capabilities {
        Capabilities {
            duplicates: false,
            sorted_keys: false,
            read_only: !self.log.is_writable(),
            deferred_writes: false,
        }
    }

    fn insert(&mut self, key: &[u8], value: &[u8]) -> EngineResult<()> {
        if !self.log.is_writable() {
            return Err(EngineError::ReadOnly);
        }
        if self.table.contains_key(key) {
            return Err(EngineError::KeyExists);
        }
        self.log.append(&LogRecord::insert(key, value))?;
        self.table.insert(key.to_vec(), value.to_vec());
        Ok(())
    }

    fn replace(&mut self, key: &[u8], value: &[u8]) -> EngineResult<()> {
        self.log.append(&LogRecord::replace(key, value))?;
        if self.table.insert(key.to_vec(), value.to_vec()).is_some() {
            self.superseded += 1;
        }
        Ok(())
    }

    fn delete(&mut self, key: &[u8]) -> EngineResult<()> {
        if !self.log.is_writable() {
            return Err(EngineError::ReadOnly);
        }
        if !self.table.contains_key(key) {
            return Err(EngineError::KeyNotFound);
        }
        self.log.append(&LogRecord::delete(key))?;
        self.table.remove(key);
        self.superseded += 1;
        Ok(())
    }

    fn exists(&self, key: &[u8]) -> bool {
        self.table.contains_key(key)
    }

    fn fetch(&self, key: &[u8], skip: usize) -> Option<Vec<u8>> {
        if skip > 0 {
            return None;
        }
        self.table.get(key).cloned()
    }

    fn first_key(&mut self) -> Option<Vec<u8>> {
        self.cursor = self.table.keys().cloned().collect();
        self.position = 0;
        self.advance()
    }

    fn next_key(&mut self) -> Option<Vec<u8>> {
        self.advance()
    }

    fn sync(&mut self) -> EngineResult<()> {
        if self.log.is_writable() {
            self.log.sync()?;
        }
        Ok(())
    }

    fn optimize(&mut self) -> EngineResult<()> {
        if !self.log.is_writable() {
            return Err(EngineError::ReadOnly);
        }
        let records: Vec<LogRecord> = self
            .table
            .iter()
            .map(|(k, v)| LogRecord::insert(k, v))
            .collect();
        self.log.rewrite(records)?;
        debug!(reclaimed = self.superseded, "optimized hash engine");
        self.superseded = 0;
        Ok(())
    }

    fn close(mut self: Box<Self>) -> EngineResult<()> {
        self.sync()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use flatdb_storage::InMemoryBackend;
    use std::collections::HashSet;
    use tempfile::tempdir;

    fn memory_engine() -> HashEngine {
        HashEngine::with_backend(Box::new(InMemoryBackend::new()), Tier::Create).unwrap()
    }

    #[test]
    fn insert_fetch_replace_delete() {
        let mut engine = memory_engine();
        engine.insert(b"k", b"v1").unwrap();
        assert!(engine.exists(b"k"));
        assert_eq!(engine.fetch(b"k", 0), Some(b"v1".to_vec()));
        assert_eq!(engine.fetch(b"k", 1), None);

        engine.replace(b"k", b"v2").unwrap();
        assert_eq!(engine.fetch(b"k", 0), Some(b"v2".to_vec()));

        engine.delete(b"k").unwrap();
        assert!(!engine.exists(b"k"));
        assert!(engine.is_empty());
    }

    #[test]
    fn insert_existing_key_fails() {
        let mut engine = memory_engine();
        engine.insert(b"k", b"v1").unwrap();
        assert!(matches!(engine.insert(b"k", b"v2"), Err(EngineError::KeyExists)));
        assert_eq!(engine.fetch(b"k", 0), Some(b"v1".to_vec()));
    }

    #[test]
    fn delete_missing_key_fails() {
        let mut engine = memory_engine();
        assert!(matches!(engine.delete(b"nope"), Err(EngineError::KeyNotFound)));
    }

    #[test]
    fn cursor_visits_every_key_once() {
        let mut engine = memory_engine();
        for i in 0..20u8 {
            engine.insert(&[i], &[i]).unwrap();
        }

        let mut seen = HashSet::new();
        let mut key = engine.first_key();
        while let Some(k) = key {
            assert!(seen.insert(k));
            key = engine.next_key();
        }
        assert_eq!(seen.len(), 20);
        assert_eq!(engine.next_key(), None);
    }

    #[test]
    fn cursor_skips_keys_deleted_mid_traversal() {
        let mut engine = memory_engine();
        engine.insert(b"a", b"1").unwrap();
        engine.insert(b"b", b"2").unwrap();

        let first = engine.first_key().unwrap();
        let other: &[u8] = if first == b"a" { b"b" } else { b"a" };
        engine.delete(other).unwrap();
        assert_eq!(engine.next_key(), None);
    }

    #[test]
    fn reopen_replays_log() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("test.hash");

        let mut engine = HashEngine::open(&path, Tier::Create).unwrap();
        engine.insert(b"a", b"1").unwrap();
        engine.insert(b"b", b"2").unwrap();
        engine.replace(b"a", b"3").unwrap();
        engine.delete(b"b").unwrap();
        Box::new(engine).close().unwrap();

        let engine = HashEngine::open(&path, Tier::Read).unwrap();
        assert_eq!(engine.fetch(b"a", 0), Some(b"3".to_vec()));
        assert!(!engine.exists(b"b"));
        assert!(engine.capabilities().read_only);
    }

    #[test]
    fn read_tier_rejects_writes() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("ro.hash");
        Box::new(HashEngine::open(&path, Tier::Create).unwrap()).close().unwrap();

        let mut engine = HashEngine::open(&path, Tier::Read).unwrap();
        assert!(matches!(engine.insert(b"k", b"v"), Err(EngineError::ReadOnly)));
        assert!(matches!(engine.replace(b"k", b"v"), Err(EngineError::ReadOnly)));
        assert!(matches!(engine.delete(b"k"), Err(EngineError::ReadOnly)));
        assert!(matches!(engine.optimize(), Err(EngineError::ReadOnly)));
    }

    #[test]
    fn truncate_tier_discards_contents() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("t.hash");

        let mut engine = HashEngine::open(&path, Tier::Create).unwrap();
        engine.insert(b"k", b"v").unwrap();
        Box::new(engine).close().unwrap();

        let engine = HashEngine::open(&path, Tier::Truncate).unwrap();
        assert!(engine.is_empty());
    }

    #[test]
    fn optimize_shrinks_file() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("opt.hash");

        let mut engine = HashEngine::open(&path, Tier::Create).unwrap();
        for i in 0..100u32 {
            engine.replace(b"counter", &i.to_le_bytes()).unwrap();
        }
        engine.sync().unwrap();
        let before = std::fs::metadata(&path).unwrap().len();

        engine.optimize().unwrap();
        let after = std::fs::metadata(&path).unwrap().len();
        assert!(after < before);
        assert_eq!(engine.fetch(b"counter", 0), Some(99u32.to_le_bytes().to_vec()));
        Box::new(engine).close().unwrap();

        let engine = HashEngine::open(&path, Tier::Write).unwrap();
        assert_eq!(engine.len(), 1);
        assert_eq!(engine.fetch(b"counter", 0), Some(99u32.to_le_bytes().to_vec()));
    }

    #[test]
    fn missing_file_with_write_tier_fails() {
        let dir = tempdir().unwrap();
        let result = HashEngine::open(&dir.path().join("absent.hash"), Tier::Write);
        assert!(matches!(result, Err(EngineError::Storage(_))));
    }
}
