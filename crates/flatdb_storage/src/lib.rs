//! # FlatDB Storage
//!
//! Byte-store backends and advisory file locks for FlatDB.
//!
//! This crate provides the lowest-level storage abstraction for FlatDB.
//! Storage backends are **opaque byte stores** - they do not interpret
//! the data they store. Engine formats (logs, constant databases, text
//! records) live in `flatdb_engine`.
//!
//! ## Available Backends
//!
//! - [`InMemoryBackend`] - For testing and ephemeral storage
//! - [`FileBackend`] - For persistent storage using OS file APIs
//!
//! ## Locks
//!
//! [`FileLock`] holds an advisory `flock`-style lock on a file for as long
//! as it is alive. Engines never lock; the connection layer does.
//!
//! ## Example
//!
//! ```rust
//! use flatdb_storage::{StorageBackend, InMemoryBackend};
//!
//! let mut backend = InMemoryBackend::new();
//! let offset = backend.append(b"hello world").unwrap();
//! let data = backend.read_at(offset, 11).unwrap();
//! assert_eq!(&data, b"hello world");
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod backend;
mod error;
mod file;
mod lock;
mod memory;

pub use backend::StorageBackend;
pub use error::{StorageError, StorageResult};
pub use file::{AccessMode, FileBackend};
pub use lock::{FileLock, LockKind};
pub use memory::InMemoryBackend;
