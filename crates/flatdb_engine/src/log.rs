//! Append-only operation log shared by the `hash` and `btree` drivers.
//!
//! File layout:
//!
//! ```text
//! magic (8 bytes, one per driver)
//! record*
//!
//! record = len u32 LE      total record length, including len and crc
//!          op u8           1 insert, 2 replace, 3 delete
//!          key_len u32 LE
//!          key bytes
//!          value bytes     (len - 13 - key_len bytes)
//!          crc u32 LE      crc32 of everything before it
//! ```
//!
//! Opening replays every record into the engine's in-memory table. A torn or
//! corrupt tail stops the replay and, on writable connections, is truncated
//! away so new records follow the last good one.

use crate::error::{EngineError, EngineResult};
use flatdb_storage::StorageBackend;
use tracing::{debug, warn};

/// Length of the record header: len + op + key_len.
const HEADER_SIZE: usize = 9;
/// Length of the trailing checksum.
const CRC_SIZE: usize = 4;
/// Length of the file magic.
pub(crate) const MAGIC_SIZE: usize = 8;

/// A logged mutation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum LogOp {
    Insert,
    Replace,
    Delete,
}

impl LogOp {
    const fn as_byte(self) -> u8 {
        match self {
            Self::Insert => 1,
            Self::Replace => 2,
            Self::Delete => 3,
        }
    }

    const fn from_byte(b: u8) -> Option<Self> {
        match b {
            1 => Some(Self::Insert),
            2 => Some(Self::Replace),
            3 => Some(Self::Delete),
            _ => None,
        }
    }
}

/// One record of the log.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct LogRecord {
    pub op: LogOp,
    pub key: Vec<u8>,
    pub value: Vec<u8>,
}

impl LogRecord {
    pub fn insert(key: &[u8], value: &[u8]) -> Self {
        Self {
            op: LogOp::Insert,
            key: key.to_vec(),
            value: value.to_vec(),
        }
    }

    pub fn replace(key: &[u8], value: &[u8]) -> Self {
        Self {
            op: LogOp::Replace,
            key: key.to_vec(),
            value: value.to_vec(),
        }
    }

    pub fn delete(key: &[u8]) -> Self {
        Self {
            op: LogOp::Delete,
            key: key.to_vec(),
            value: Vec::new(),
        }
    }

    /// Appends the encoded record to `buf`.
    #[allow(clippy::cast_possible_truncation)]
    pub fn encode_into(&self, buf: &mut Vec<u8>) {
        let start = buf.len();
        let record_len = HEADER_SIZE + self.key.len() + self.value.len() + CRC_SIZE;

        buf.extend_from_slice(&(record_len as u32).to_le_bytes());
        buf.push(self.op.as_byte());
        buf.extend_from_slice(&(self.key.len() as u32).to_le_bytes());
        buf.extend_from_slice(&self.key);
        buf.extend_from_slice(&self.value);

        let crc = crc32fast::hash(&buf[start..]);
        buf.extend_from_slice(&crc.to_le_bytes());
    }

    /// Decodes the record at the start of `data`.
    ///
    /// Returns the record and its encoded length, or `None` if the bytes do
    /// not hold a complete, intact record.
    pub fn decode(data: &[u8]) -> Option<(Self, usize)> {
        if data.len() < HEADER_SIZE + CRC_SIZE {
            return None;
        }
        let record_len = u32::from_le_bytes(data[0..4].try_into().ok()?) as usize;
        if record_len < HEADER_SIZE + CRC_SIZE || record_len > data.len() {
            return None;
        }

        let body = &data[..record_len - CRC_SIZE];
        let stored_crc = u32::from_le_bytes(data[record_len - CRC_SIZE..record_len].try_into().ok()?);
        if crc32fast::hash(body) != stored_crc {
            return None;
        }

        let op = LogOp::from_byte(body[4])?;
        let key_len = u32::from_le_bytes(body[5..9].try_into().ok()?) as usize;
        if HEADER_SIZE + key_len > body.len() {
            return None;
        }
        let key = body[HEADER_SIZE..HEADER_SIZE + key_len].to_vec();
        let value = body[HEADER_SIZE + key_len..].to_vec();

        Some((Self { op, key, value }, record_len))
    }
}

/// The on-disk log of one connection.
pub(crate) struct LogStore {
    driver: &'static str,
    magic: &'static [u8; MAGIC_SIZE],
    backend: Box<dyn StorageBackend>,
    writable: bool,
}

impl LogStore {
    /// Opens the log, feeding every intact record to `apply` in file order.
    pub fn open(
        driver: &'static str,
        magic: &'static [u8; MAGIC_SIZE],
        mut backend: Box<dyn StorageBackend>,
        writable: bool,
        mut apply: impl FnMut(LogRecord),
    ) -> EngineResult<Self> {
        let data = backend.read_all()?;

        if data.is_empty() {
            if writable {
                backend.append(magic)?;
            }
            return Ok(Self {
                driver,
                magic,
                backend,
                writable,
            });
        }

        if data.len() < MAGIC_SIZE || &data[..MAGIC_SIZE] != magic {
            return Err(EngineError::corrupted(driver, "missing or foreign file magic"));
        }

        let mut offset = MAGIC_SIZE;
        let mut replayed = 0usize;
        while offset < data.len() {
            match LogRecord::decode(&data[offset..]) {
                Some((record, len)) => {
                    apply(record);
                    offset += len;
                    replayed += 1;
                }
                None => break,
            }
        }

        if offset < data.len() {
            warn!(
                driver,
                offset,
                dropped = data.len() - offset,
                "discarding torn log tail"
            );
            if writable {
                backend.truncate(offset as u64)?;
            }
        }

        debug!(driver, replayed, "replayed log");

        Ok(Self {
            driver,
            magic,
            backend,
            writable,
        })
    }

    /// Returns whether the log accepts writes.
    pub fn is_writable(&self) -> bool {
        self.writable
    }

    /// Appends one record.
    pub fn append(&mut self, record: &LogRecord) -> EngineResult<()> {
        if !self.writable {
            return Err(EngineError::ReadOnly);
        }
        let mut buf = Vec::new();
        record.encode_into(&mut buf);
        self.backend.append(&buf)?;
        Ok(())
    }

    /// Makes appended records durable.
    pub fn sync(&mut self) -> EngineResult<()> {
        self.backend.sync()?;
        Ok(())
    }

    /// Replaces the whole log with `records`.
    ///
    /// The file is rewritten in place so that locks held on it stay valid.
    pub fn rewrite(&mut self, records: impl IntoIterator<Item = LogRecord>) -> EngineResult<()> {
        if !self.writable {
            return Err(EngineError::ReadOnly);
        }

        let mut buf = self.magic.to_vec();
        let mut count = 0usize;
        for record in records {
            record.encode_into(&mut buf);
            count += 1;
        }

        let before = self.backend.size()?;
        self.backend.truncate(0)?;
        self.backend.append(&buf)?;
        self.backend.sync()?;

        debug!(
            driver = self.driver,
            records = count,
            before,
            after = buf.len(),
            "compacted log"
        );
        Ok(())
    }
}
