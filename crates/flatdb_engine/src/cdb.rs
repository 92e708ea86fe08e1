//! Constant databases in the djb `cdb` layout.
//!
//! ```text
//! header   256 x (table_pos u32 LE, table_slots u32 LE)     2048 bytes
//! records  (key_len u32 LE, data_len u32 LE, key, data)*
//! tables   256 x table_slots x (hash u32 LE, record_pos u32 LE)
//! ```
//!
//! A key lives in table `hash & 255`, probed linearly from slot
//! `(hash >> 8) % table_slots`. An empty slot has `record_pos == 0`.
//!
//! Two drivers share the format: `cdb_make` builds a file and writes it when
//! closed, `cdb` reads a finished file. A database is never modified in place.

use crate::engine::{Capabilities, Engine};
use crate::error::{EngineError, EngineResult};
use flatdb_storage::{AccessMode, FileBackend, StorageBackend};
use std::path::Path;
use tracing::debug;

const READER: &str = "cdb";
const MAKER: &str = "cdb_make";

const TABLE_COUNT: usize = 256;
const HEADER_SIZE: usize = TABLE_COUNT * 8;

/// The cdb hash function.
#[must_use]
pub fn cdb_hash(key: &[u8]) -> u32 {
    key.iter()
        .fold(5381u32, |h, &c| (h << 5).wrapping_add(h) ^ u32::from(c))
}

fn read_u32(data: &[u8], pos: usize) -> Option<u32> {
    let bytes = data.get(pos..pos.checked_add(4)?)?;
    Some(u32::from_le_bytes(bytes.try_into().ok()?))
}

fn to_u32(n: usize) -> EngineResult<u32> {
    u32::try_from(n).map_err(|_| EngineError::too_large(MAKER, "file exceeds 4 GiB"))
}

/// Builds a cdb file from records in insertion order.
fn build(records: &[(Vec<u8>, Vec<u8>)]) -> EngineResult<Vec<u8>> {
    let mut out = vec![0u8; HEADER_SIZE];
    let mut tables: Vec<Vec<(u32, u32)>> = vec![Vec::new(); TABLE_COUNT];

    for (key, data) in records {
        let pos = to_u32(out.len())?;
        out.extend_from_slice(&to_u32(key.len())?.to_le_bytes());
        out.extend_from_slice(&to_u32(data.len())?.to_le_bytes());
        out.extend_from_slice(key);
        out.extend_from_slice(data);

        let hash = cdb_hash(key);
        tables[(hash & 0xff) as usize].push((hash, pos));
    }

    let mut header = Vec::with_capacity(HEADER_SIZE);
    for entries in &tables {
        let slot_count = entries.len() * 2;
        header.extend_from_slice(&to_u32(out.len())?.to_le_bytes());
        header.extend_from_slice(&to_u32(slot_count)?.to_le_bytes());

        let mut slots = vec![(0u32, 0u32); slot_count];
        for &(hash, pos) in entries {
            let mut slot = (hash >> 8) as usize % slot_count;
            while slots[slot].1 != 0 {
                slot = (slot + 1) % slot_count;
            }
            slots[slot] = (hash, pos);
        }
        for (hash, pos) in slots {
            out.extend_from_slice(&hash.to_le_bytes());
            out.extend_from_slice(&pos.to_le_bytes());
        }
    }

    to_u32(out.len())?;
    out[..HEADER_SIZE].copy_from_slice(&header);
    Ok(out)
}

/// Writer half of the format (`cdb_make`).
///
/// Records are buffered and the file is written by `close`. Until the file is
/// reopened with the `cdb` driver nothing written is visible: `exists`,
/// `fetch` and the cursor all report an empty database.
pub struct CdbMaker {
    backend: Box<dyn StorageBackend>,
    records: Vec<(Vec<u8>, Vec<u8>)>,
}

impl CdbMaker {
    /// Creates a builder writing to `path`. Existing contents are discarded.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be created.
    pub fn create(path: &Path) -> EngineResult<Self> {
        let backend = FileBackend::open_with(path, AccessMode::Truncate)?;
        Ok(Self::with_backend(Box::new(backend)))
    }

    /// Creates a builder writing to `backend`.
    #[must_use]
    pub fn with_backend(backend: Box<dyn StorageBackend>) -> Self {
        Self {
            backend,
            records: Vec::new(),
        }
    }

    /// Returns the number of buffered records.
    #[must_use]
    pub fn pending(&self) -> usize {
        self.records.len()
    }
}

impl Engine for CdbMaker {
    fn driver(&self) -> &'static str {
        MAKER
    }

    fn capabilities(&self) -> Capabilities {
        Capabilities {
            duplicates: true,
            sorted_keys: false,
            read_only: false,
            deferred_writes: true,
        }
    }

    fn insert(&mut self, key: &[u8], value: &[u8]) -> EngineResult<()> {
        self.records.push((key.to_vec(), value.to_vec()));
        Ok(())
    }

    fn replace(&mut self, _key: &[u8], _value: &[u8]) -> EngineResult<()> {
        Err(EngineError::Unsupported {
            driver: MAKER,
            operation: "replace",
        })
    }

    fn delete(&mut self, _key: &[u8]) -> EngineResult<()> {
        Err(EngineError::Unsupported {
            driver: MAKER,
            operation: "delete",
        })
    }

    fn exists(&self, _key: &[u8]) -> bool {
        false
    }

    fn fetch(&self, _key: &[u8], _skip: usize) -> Option<Vec<u8>> {
        None
    }

    fn first_key(&mut self) -> Option<Vec<u8>> {
        None
    }

    fn next_key(&mut self) -> Option<Vec<u8>> {
        None
    }

    fn sync(&mut self) -> EngineResult<()> {
        Ok(())
    }

    fn optimize(&mut self) -> EngineResult<()> {
        Ok(())
    }

    fn close(mut self: Box<Self>) -> EngineResult<()> {
        let data = build(&self.records)?;
        self.backend.truncate(0)?;
        self.backend.append(&data)?;
        self.backend.sync()?;
        debug!(records = self.records.len(), bytes = data.len(), "wrote cdb file");
        Ok(())
    }
}

/// Reader half of the format (`cdb`).
///
/// The whole file is loaded and validated at open. The cursor walks records
/// in file order, so a key stored several times is visited once per record.
pub struct CdbReader {
    data: Vec<u8>,
    tables: Vec<(usize, usize)>,
    records_end: usize,
    cursor: usize,
}

impl CdbReader {
    /// Opens the database at `path`.
    ///
    /// # Errors
    ///
    /// Returns an error if the file is missing or not a valid cdb file.
    pub fn open(path: &Path) -> EngineResult<Self> {
        let backend = FileBackend::open_with(path, AccessMode::ReadOnly)?;
        Self::from_bytes(backend.read_all()?)
    }

    /// Opens a database held in memory.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::Corrupted`] if the bytes are not a valid cdb
    /// file.
    pub fn from_bytes(data: Vec<u8>) -> EngineResult<Self> {
        if data.len() < HEADER_SIZE {
            return Err(EngineError::corrupted(READER, "file shorter than header"));
        }

        let mut tables = Vec::with_capacity(TABLE_COUNT);
        for i in 0..TABLE_COUNT {
            let pos = read_u32(&data, i * 8).unwrap_or(0) as usize;
            let slots = read_u32(&data, i * 8 + 4).unwrap_or(0) as usize;
            let end = slots
                .checked_mul(8)
                .and_then(|n| n.checked_add(pos))
                .filter(|&end| pos >= HEADER_SIZE && end <= data.len());
            if end.is_none() {
                return Err(EngineError::corrupted(
                    READER,
                    format!("hash table {i} out of bounds"),
                ));
            }
            tables.push((pos, slots));
        }

        let records_end = tables[0].0;
        debug!(bytes = data.len(), records_end, "opened cdb file");

        Ok(Self {
            data,
            tables,
            records_end,
            cursor: HEADER_SIZE,
        })
    }

    /// Returns the key and data of the record at `pos`.
    fn record_at(&self, pos: usize) -> Option<(&[u8], &[u8], usize)> {
        let key_len = read_u32(&self.data, pos)? as usize;
        let data_len = read_u32(&self.data, pos + 4)? as usize;
        let key_start = pos + 8;
        let data_start = key_start.checked_add(key_len)?;
        let end = data_start.checked_add(data_len)?;
        if end > self.records_end {
            return None;
        }
        Some((
            &self.data[key_start..data_start],
            &self.data[data_start..end],
            end,
        ))
    }

    /// Finds the `skip`-th value stored under `key`.
    fn find(&self, key: &[u8], mut skip: usize) -> Option<&[u8]> {
        let hash = cdb_hash(key);
        let (table_pos, slots) = self.tables[(hash & 0xff) as usize];
        if slots == 0 {
            return None;
        }

        let mut slot = (hash >> 8) as usize % slots;
        for _ in 0..slots {
            let slot_pos = table_pos + slot * 8;
            let slot_hash = read_u32(&self.data, slot_pos)?;
            let record_pos = read_u32(&self.data, slot_pos + 4)? as usize;
            if record_pos == 0 {
                return None;
            }
            if slot_hash == hash {
                if let Some((k, v, _)) = self.record_at(record_pos) {
                    if k == key {
                        if skip == 0 {
                            return Some(v);
                        }
                        skip -= 1;
                    }
                }
            }
            slot = (slot + 1) % slots;
        }
        None
    }

    fn read_cursor(&mut self) -> Option<Vec<u8>> {
        let (key, _, end) = self.record_at(self.cursor)?;
        let key = key.to_vec();
        self.cursor = end;
        Some(key)
    }
}

impl Engine for CdbReader {
    fn driver(&self) -> &'static str {
        READER
    }

    fn capabilities(&self) -> Capabilities {
        Capabilities {
            duplicates: true,
            sorted_keys: false,
            read_only: true,
            deferred_writes: false,
        }
    }

    fn insert(&mut self, _key: &[u8], _value: &[u8]) -> EngineResult<()> {
        Err(EngineError::ReadOnly)
    }

    fn replace(&mut self, _key: &[u8], _value: &[u8]) -> EngineResult<()> {
        Err(EngineError::ReadOnly)
    }

    fn delete(&mut self, _key: &[u8]) -> EngineResult<()> {
        Err(EngineError::ReadOnly)
    }

    fn exists(&self, key: &[u8]) -> bool {
        self.find(key, 0).is_some()
    }

    fn fetch(&self, key: &[u8], skip: usize) -> Option<Vec<u8>> {
        self.find(key, skip).map(<[u8]>::to_vec)
    }

    fn first_key(&mut self) -> Option<Vec<u8>> {
        self.cursor = HEADER_SIZE;
        self.read_cursor()
    }

    fn next_key(&mut self) -> Option<Vec<u8>> {
        self.read_cursor()
    }

    fn sync(&mut self) -> EngineResult<()> {
        Ok(())
    }

    fn optimize(&mut self) -> EngineResult<()> {
        Ok(())
    }

    fn close(self: Box<Self>) -> EngineResult<()> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn built(records: &[(&[u8], &[u8])]) -> CdbReader {
        let owned: Vec<(Vec<u8>, Vec<u8>)> = records
            .iter()
            .map(|(k, v)| (k.to_vec(), v.to_vec()))
            .collect();
        CdbReader::from_bytes(build(&owned).unwrap()).unwrap()
    }

    #[test]
    fn hash_matches_reference_values() {
        assert_eq!(cdb_hash(b""), 5381);
        assert_eq!(cdb_hash(b"a"), 177_604);
    }

    #[test]
    fn empty_database() {
        let mut reader = built(&[]);
        assert!(!reader.exists(b"anything"));
        assert_eq!(reader.first_key(), None);
    }

    #[test]
    fn lookup_and_duplicates() {
        let reader = built(&[
            (b"one", b"1"),
            (b"two", b"2"),
            (b"one", b"uno"),
            (b"", b"empty"),
        ]);

        assert_eq!(reader.fetch(b"one", 0), Some(b"1".to_vec()));
        assert_eq!(reader.fetch(b"one", 1), Some(b"uno".to_vec()));
        assert_eq!(reader.fetch(b"one", 2), None);
        assert_eq!(reader.fetch(b"two", 0), Some(b"2".to_vec()));
        assert_eq!(reader.fetch(b"", 0), Some(b"empty".to_vec()));
        assert!(!reader.exists(b"three"));
    }

    #[test]
    fn cursor_walks_file_order() {
        let mut reader = built(&[(b"b", b"1"), (b"a", b"2"), (b"b", b"3")]);
        let mut keys = Vec::new();
        let mut key = reader.first_key();
        while let Some(k) = key {
            keys.push(k);
            key = reader.next_key();
        }
        assert_eq!(keys, vec![b"b".to_vec(), b"a".to_vec(), b"b".to_vec()]);

        assert_eq!(reader.first_key(), Some(b"b".to_vec()));
    }

    #[test]
    fn many_keys_share_tables() {
        let records: Vec<(Vec<u8>, Vec<u8>)> = (0..2000u32)
            .map(|i| (format!("key{i}").into_bytes(), i.to_le_bytes().to_vec()))
            .collect();
        let reader = CdbReader::from_bytes(build(&records).unwrap()).unwrap();
        for (key, value) in &records {
            assert_eq!(reader.fetch(key, 0).as_ref(), Some(value));
        }
    }

    #[test]
    fn reader_rejects_writes() {
        let mut reader = built(&[(b"k", b"v")]);
        assert!(matches!(reader.insert(b"k", b"v"), Err(EngineError::ReadOnly)));
        assert!(matches!(reader.replace(b"k", b"v"), Err(EngineError::ReadOnly)));
        assert!(matches!(reader.delete(b"k"), Err(EngineError::ReadOnly)));
    }

    #[test]
    fn short_file_is_corrupted() {
        assert!(matches!(
            CdbReader::from_bytes(vec![0; 100]),
            Err(EngineError::Corrupted { driver: "cdb", .. })
        ));
    }

    #[test]
    fn out_of_bounds_table_is_corrupted() {
        let mut data = build(&[]).unwrap();
        data[4..8].copy_from_slice(&1000u32.to_le_bytes());
        assert!(matches!(
            CdbReader::from_bytes(data),
            Err(EngineError::Corrupted { .. })
        ));
    }

    #[test]
    fn maker_hides_writes_until_reopen() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("test.cdb");

        let mut maker = CdbMaker::create(&path).unwrap();
        maker.insert(b"k", b"v1").unwrap();
        maker.insert(b"k", b"v2").unwrap();
        assert_eq!(maker.pending(), 2);
        assert!(!maker.exists(b"k"));
        assert_eq!(maker.fetch(b"k", 0), None);
        assert_eq!(maker.first_key(), None);
        assert!(matches!(maker.replace(b"k", b"x"), Err(EngineError::Unsupported { .. })));
        assert!(matches!(maker.delete(b"k"), Err(EngineError::Unsupported { .. })));
        Box::new(maker).close().unwrap();

        let reader = CdbReader::open(&path).unwrap();
        assert_eq!(reader.fetch(b"k", 0), Some(b"v1".to_vec()));
        assert_eq!(reader.fetch(b"k", 1), Some(b"v2".to_vec()));
    }

    #[test]
    fn missing_file_fails_to_open() {
        let dir = tempdir().unwrap();
        assert!(matches!(
            CdbReader::open(&dir.path().join("absent.cdb")),
            Err(EngineError::Storage(_))
        ));
    }
}
