//! File-based storage backend for persistent storage.

use crate::backend::StorageBackend;
use crate::error::{StorageError, StorageResult};
use parking_lot::Mutex;
use std::fs::{File, OpenOptions};
use std::io::{self, Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};

/// How a [`FileBackend`] opens its file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AccessMode {
    /// Open an existing file for reading only.
    ReadOnly,
    /// Open an existing file for reading and writing.
    ReadWrite,
    /// Open for reading and writing, creating the file if missing.
    Create,
    /// Open for reading and writing, creating the file and discarding contents.
    Truncate,
}

impl AccessMode {
    /// Returns whether files opened with this mode accept writes.
    #[must_use]
    pub const fn is_writable(self) -> bool {
        !matches!(self, Self::ReadOnly)
    }

    /// Returns whether this mode creates a missing file.
    #[must_use]
    pub const fn creates(self) -> bool {
        matches!(self, Self::Create | Self::Truncate)
    }
}

/// A file-based storage backend.
///
/// This backend provides persistent storage using OS file APIs.
/// Data survives process restarts.
///
/// # Durability
///
/// - `sync()` calls `File::sync_all()` to ensure data is on disk
///
/// # Thread Safety
///
/// Reads take an internal lock around seek-then-read, so a shared
/// `&FileBackend` can be read from several threads.
///
/// # Example
///
/// ```no_run
/// use flatdb_storage::{AccessMode, StorageBackend, FileBackend};
/// use std::path::Path;
///
/// let mut backend = FileBackend::open_with(Path::new("data.bin"), AccessMode::Create).unwrap();
/// let offset = backend.append(b"persistent data").unwrap();
/// backend.sync().unwrap();  // Ensure data is durable
/// ```
#[derive(Debug)]
pub struct FileBackend {
    path: PathBuf,
    state: Mutex<OpenFile>,
    mode: AccessMode,
}

/// The handle and its logical length, which always move together.
#[derive(Debug)]
struct OpenFile {
    file: File,
    len: u64,
}

impl FileBackend {
    /// Opens or creates a file backend at the given path.
    ///
    /// Shorthand for [`AccessMode::Create`].
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be opened or created.
    pub fn open(path: &Path) -> StorageResult<Self> {
        Self::open_with(path, AccessMode::Create)
    }

    /// Opens a file backend at the given path with the given access mode.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError::NotFound`] if the mode requires an existing file
    /// and there is none, or an I/O error if the file cannot be opened.
    pub fn open_with(path: &Path, mode: AccessMode) -> StorageResult<Self> {
        let file = OpenOptions::new()
            .read(true)
            .write(mode.is_writable())
            .create(mode.creates())
            .truncate(matches!(mode, AccessMode::Truncate))
            .open(path)
            .map_err(|e| match e.kind() {
                io::ErrorKind::NotFound => StorageError::NotFound {
                    path: path.to_path_buf(),
                },
                _ => StorageError::Io(e),
            })?;

        let len = file.metadata()?.len();

        Ok(Self {
            path: path.to_path_buf(),
            state: Mutex::new(OpenFile { file, len }),
            mode,
        })
    }

    /// Returns the path to the underlying file.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Returns the access mode the file was opened with.
    #[must_use]
    pub fn mode(&self) -> AccessMode {
        self.mode
    }
}

impl FileBackend {
    fn writable_state(&mut self) -> StorageResult<&mut OpenFile> {
        if self.mode.is_writable() {
            Ok(self.state.get_mut())
        } else {
            Err(StorageError::ReadOnly)
        }
    }
}

impl StorageBackend for FileBackend {
    fn read_at(&self, offset: u64, len: usize) -> StorageResult<Vec<u8>> {
        let mut state = self.state.lock();
        let size = state.len;
        match offset.checked_add(len as u64) {
            Some(end) if end <= size => {}
            _ => return Err(StorageError::ReadPastEnd { offset, len, size }),
        }

        let mut buffer = vec![0u8; len];
        if len > 0 {
            state.file.seek(SeekFrom::Start(offset))?;
            state.file.read_exact(&mut buffer)?;
        }
        Ok(buffer)
    }

    fn append(&mut self, data: &[u8]) -> StorageResult<u64> {
        let state = self.writable_state()?;
        let offset = state.len;
        if !data.is_empty() {
            state.file.seek(SeekFrom::Start(offset))?;
            state.file.write_all(data)?;
            state.len += data.len() as u64;
        }
        Ok(offset)
    }

    fn size(&self) -> StorageResult<u64> {
        Ok(self.state.lock().len)
    }

    fn sync(&mut self) -> StorageResult<()> {
        match self.writable_state() {
            Ok(state) => Ok(state.file.sync_all()?),
            Err(_) => Ok(()),
        }
    }

    fn truncate(&mut self, new_size: u64) -> StorageResult<()> {
        let state = self.writable_state()?;
        if new_size > state.len {
            return Err(StorageError::invalid_input(format!(
                "cannot grow {} bytes to {new_size} by truncation",
                state.len
            )));
        }
        state.file.set_len(new_size)?;
        state.file.sync_all()?;
        state.len = new_size;
        Ok(())
    }

    fn is_read_only(&self) -> bool {
        !self.mode.is_writable()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::{tempdir, TempDir};

    fn scratch(name: &str) -> (TempDir, PathBuf) {
        let dir = tempdir().unwrap();
        let path = dir.path().join(name);
        (dir, path)
    }

    #[test]
    fn append_read_and_reopen() {
        let (_dir, path) = scratch("data.log");

        let mut backend = FileBackend::open(&path).unwrap();
        assert!(path.exists());
        assert_eq!(backend.append(b"first").unwrap(), 0);
        assert_eq!(backend.append(b"").unwrap(), 5);
        assert_eq!(backend.append(b"second").unwrap(), 5);
        backend.sync().unwrap();
        drop(backend);

        let backend = FileBackend::open_with(&path, AccessMode::ReadWrite).unwrap();
        assert_eq!(backend.path(), path);
        assert_eq!(backend.mode(), AccessMode::ReadWrite);
        assert_eq!(backend.size().unwrap(), 11);
        assert_eq!(backend.read_at(5, 6).unwrap(), b"second");
        assert!(matches!(
            backend.read_at(9, 5),
            Err(StorageError::ReadPastEnd { size: 11, .. })
        ));
    }

    #[test]
    fn existing_file_modes_do_not_create() {
        let (_dir, path) = scratch("missing.db");
        for mode in [AccessMode::ReadOnly, AccessMode::ReadWrite] {
            let result = FileBackend::open_with(&path, mode);
            assert!(matches!(result, Err(StorageError::NotFound { .. })));
        }
        assert!(!path.exists());
    }

    #[test]
    fn truncate_mode_discards_contents() {
        let (_dir, path) = scratch("data.db");
        FileBackend::open(&path).unwrap().append(b"old").unwrap();

        let backend = FileBackend::open_with(&path, AccessMode::Truncate).unwrap();
        assert_eq!(backend.size().unwrap(), 0);
        assert_eq!(std::fs::metadata(&path).unwrap().len(), 0);
    }

    #[test]
    fn read_only_rejects_writes() {
        let (_dir, path) = scratch("data.db");
        FileBackend::open(&path).unwrap().append(b"x").unwrap();

        let mut backend = FileBackend::open_with(&path, AccessMode::ReadOnly).unwrap();
        assert!(backend.is_read_only());
        assert!(matches!(backend.append(b"y"), Err(StorageError::ReadOnly)));
        assert!(matches!(backend.truncate(0), Err(StorageError::ReadOnly)));
        backend.sync().unwrap();
        assert_eq!(backend.read_all().unwrap(), b"x");
    }

    #[test]
    fn truncate_then_append_overwrites_tail() {
        let (_dir, path) = scratch("data.db");

        let mut backend = FileBackend::open(&path).unwrap();
        backend.append(b"record|torn").unwrap();
        backend.truncate(6).unwrap();
        assert!(backend.truncate(7).is_err());
        assert_eq!(backend.append(b"!").unwrap(), 6);
        assert_eq!(backend.read_all().unwrap(), b"record!");
        assert_eq!(std::fs::read(&path).unwrap(), b"record!");
    }
}
