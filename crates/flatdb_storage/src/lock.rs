//! Advisory file locks.
//!
//! A [`FileLock`] keeps its own descriptor open on the locked file and
//! releases the lock when dropped. Locks are advisory: they only exclude
//! other holders that also lock, they never block reads or writes.

use crate::error::{StorageError, StorageResult};
use fs2::FileExt;
use std::fs::{File, OpenOptions};
use std::io;
use std::path::{Path, PathBuf};
use tracing::debug;

/// The kind of lock to take.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LockKind {
    /// Any number of shared holders may coexist.
    Shared,
    /// A single exclusive holder.
    Exclusive,
}

/// An advisory lock held on a file for the lifetime of this value.
#[derive(Debug)]
pub struct FileLock {
    path: PathBuf,
    kind: LockKind,
    file: File,
}

impl FileLock {
    /// Acquires a lock on `path`.
    ///
    /// With `create` the file is created when missing; otherwise a missing
    /// file fails with [`StorageError::NotFound`]. With `blocking` false the
    /// request fails with [`StorageError::Locked`] instead of waiting.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be opened, or the lock cannot be
    /// taken without waiting when `blocking` is false.
    pub fn acquire(path: &Path, kind: LockKind, blocking: bool, create: bool) -> StorageResult<Self> {
        let file = OpenOptions::new()
            .read(true)
            .write(create)
            .create(create)
            .truncate(false)
            .open(path)
            .map_err(|e| match e.kind() {
                io::ErrorKind::NotFound => StorageError::NotFound {
                    path: path.to_path_buf(),
                },
                _ => StorageError::Io(e),
            })?;

        let result = match (kind, blocking) {
            (LockKind::Shared, true) => FileExt::lock_shared(&file),
            (LockKind::Exclusive, true) => FileExt::lock_exclusive(&file),
            (LockKind::Shared, false) => FileExt::try_lock_shared(&file),
            (LockKind::Exclusive, false) => FileExt::try_lock_exclusive(&file),
        };

        if let Err(e) = result {
            if !blocking && e.kind() == fs2::lock_contended_error().kind() {
                return Err(StorageError::Locked {
                    path: path.to_path_buf(),
                });
            }
            return Err(StorageError::Io(e));
        }

        debug!(path = %path.display(), ?kind, "acquired file lock");

        Ok(Self {
            path: path.to_path_buf(),
            kind,
            file,
        })
    }

    /// Returns the locked path.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Returns the kind of lock held.
    #[must_use]
    pub fn kind(&self) -> LockKind {
        self.kind
    }
}

impl Drop for FileLock {
    fn drop(&mut self) {
        // Closing the descriptor releases the lock as well
        let _ = FileExt::unlock(&self.file);
        debug!(path = %self.path.display(), "released file lock");
    }
}
