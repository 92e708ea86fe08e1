//! The `flatfile` driver: length-prefixed text records in insertion order.
//!
//! Each record is
//!
//! ```text
//! <key length>\n<key bytes>\n<value length>\n<value bytes>\n
//! ```
//!
//! with lengths in ASCII decimal. The file is read whole at open and written
//! whole on `sync`, `optimize` and `close`.

use crate::control::Tier;
use crate::engine::{Capabilities, Engine};
use crate::error::{EngineError, EngineResult};
use flatdb_storage::{FileBackend, StorageBackend};
use std::path::Path;
use tracing::debug;

const DRIVER: &str = "flatfile";

fn parse_length(data: &[u8], pos: &mut usize) -> EngineResult<usize> {
    let rest = &data[*pos..];
    let newline = rest
        .iter()
        .position(|&b| b == b'\n')
        .ok_or_else(|| EngineError::corrupted(DRIVER, format!("unterminated length at byte {pos}")))?;
    let text = std::str::from_utf8(&rest[..newline])
        .ok()
        .filter(|t| !t.is_empty() && t.bytes().all(|b| b.is_ascii_digit()))
        .ok_or_else(|| EngineError::corrupted(DRIVER, format!("bad length at byte {pos}")))?;
    let len = text
        .parse::<usize>()
        .map_err(|_| EngineError::corrupted(DRIVER, format!("length overflow at byte {pos}")))?;
    *pos += newline + 1;
    Ok(len)
}

fn parse_field(data: &[u8], pos: &mut usize) -> EngineResult<Vec<u8>> {
    let len = parse_length(data, pos)?;
    let end = pos
        .checked_add(len)
        .filter(|&end| end < data.len() && data[end] == b'\n')
        .ok_or_else(|| EngineError::corrupted(DRIVER, format!("truncated field at byte {pos}")))?;
    let field = data[*pos..end].to_vec();
    *pos = end + 1;
    Ok(field)
}

fn parse(data: &[u8]) -> EngineResult<Vec<(Vec<u8>, Vec<u8>)>> {
    let mut entries = Vec::new();
    let mut pos = 0;
    while pos < data.len() {
        let key = parse_field(data, &mut pos)?;
        let value = parse_field(data, &mut pos)?;
        entries.push((key, value));
    }
    Ok(entries)
}

fn serialize(entries: &[(Vec<u8>, Vec<u8>)]) -> Vec<u8> {
    let mut out = Vec::new();
    for (key, value) in entries {
        for field in [key, value] {
            out.extend_from_slice(field.len().to_string().as_bytes());
            out.push(b'\n');
            out.extend_from_slice(field);
            out.push(b'\n');
        }
    }
    out
}

/// A plain-text engine holding one value per key.
pub struct FlatFileEngine {
    backend: Box<dyn StorageBackend>,
    entries: Vec<(Vec<u8>, Vec<u8>)>,
    writable: bool,
    dirty: bool,
    next_index: usize,
}

impl FlatFileEngine {
    /// Opens the file at `path` under `tier`.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be opened or parsed.
    pub fn open(path: &Path, tier: Tier) -> EngineResult<Self> {
        let backend = FileBackend::open_with(path, tier.access_mode())?;
        Self::with_backend(Box::new(backend), tier)
    }

    /// Opens an engine over an existing backend.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::Corrupted`] if the contents cannot be parsed.
    pub fn with_backend(mut backend: Box<dyn StorageBackend>, tier: Tier) -> EngineResult<Self> {
        if tier == Tier::Truncate {
            backend.truncate(0)?;
        }
        let writable = tier.is_writable() && !backend.is_read_only();
        let entries = parse(&backend.read_all()?)?;
        debug!(records = entries.len(), writable, "opened flatfile engine");

        Ok(Self {
            backend,
            entries,
            writable,
            dirty: false,
            next_index: 0,
        })
    }

    fn position(&self, key: &[u8]) -> Option<usize> {
        self.entries.iter().position(|(k, _)| k == key)
    }

    fn check_writable(&self) -> EngineResult<()> {
        if self.writable {
            Ok(())
        } else {
            Err(EngineError::ReadOnly)
        }
    }

    fn advance(&mut self) -> Option<Vec<u8>> {
        let key = self.entries.get(self.next_index)?.0.clone();
        self.next_index += 1;
        Some(key)
    }

    fn flush(&mut self) -> EngineResult<()> {
        let data = serialize(&self.entries);
        self.backend.truncate(0)?;
        self.backend.append(&data)?;
        self.backend.sync()?;
        self.dirty = false;
        Ok(())
    }
}

impl Engine for FlatFileEngine {
    fn driver(&self) -> &'static str {
        DRIVER
    }

    fn capabilities(&self) -> Capabilities {
        Capabilities {
            duplicates: false,
            sorted_keys: false,
            read_only: !self.writable,
            deferred_writes: false,
        }
    }

    fn insert(&mut self, key: &[u8], value: &[u8]) -> EngineResult<()> {
        self.check_writable()?;
        if self.position(key).is_some() {
            return Err(EngineError::KeyExists);
        }
        self.entries.push((key.to_vec(), value.to_vec()));
        self.dirty = true;
        Ok(())
    }

    fn replace(&mut self, key: &[u8], value: &[u8]) -> EngineResult<()> {
        self.check_writable()?;
        match self.position(key) {
            Some(i) => self.entries[i].1 = value.to_vec(),
            None => self.entries.push((key.to_vec(), value.to_vec())),
        }
        self.dirty = true;
        Ok(())
    }

    fn delete(&mut self, key: &[u8]) -> EngineResult<()> {
        self.check_writable()?;
        let i = self.position(key).ok_or(EngineError::KeyNotFound)?;
        self.entries.remove(i);
        if i < self.next_index {
            self.next_index -= 1;
        }
        self.dirty = true;
        Ok(())
    }

    fn exists(&self, key: &[u8]) -> bool {
        self.position(key).is_some()
    }

    fn fetch(&self, key: &[u8], skip: usize) -> Option<Vec<u8>> {
        if skip > 0 {
            return None;
        }
        self.position(key).map(|i| self.entries[i].1.clone())
    }

    fn first_key(&mut self) -> Option<Vec<u8>> {
        self.next_index = 0;
        self.advance()
    }

    fn next_key(&mut self) -> Option<Vec<u8>> {
        self.advance()
    }

    fn sync(&mut self) -> EngineResult<()> {
        if self.dirty {
            self.flush()?;
        }
        Ok(())
    }

    fn optimize(&mut self) -> EngineResult<()> {
        self.check_writable()?;
        self.flush()
    }

    fn close(mut self: Box<Self>) -> EngineResult<()> {
        self.sync()
    }
}
