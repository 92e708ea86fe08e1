//! # FlatDB Core
//!
//! One API over interchangeable flat-file key-value engines.
//!
//! This crate provides:
//! - [`OpenMode`] flags and their encoding into engine control strings
//! - [`EngineHandle`], an engine connection with its file locks
//! - [`KeyStore`], namespacing and multi-value operations over a handle
//! - [`StoreIterator`], a restartable cursor over a store
//! - Driver and open-connection listings in [`registry`]
//!
//! ## Example
//!
//! ```rust,no_run
//! use flatdb_core::{KeyStore, OpenMode, StoreOptions};
//!
//! let store = KeyStore::open("data.db", OpenMode::CREATE, StoreOptions::with_driver("hash"))?;
//! store.set_value(b"greeting", b"hello")?;
//! for (key, value) in store.entries() {
//!     println!("{key} = {}", String::from_utf8_lossy(&value));
//! }
//! store.close()?;
//! # Ok::<(), flatdb_core::StoreError>(())
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod config;
mod error;
mod handle;
mod iter;
mod key;
mod mode;
pub mod registry;
mod store;
mod traits;

pub use config::{StoreOptions, DEFAULT_DRIVER};
pub use error::{StoreError, StoreResult};
pub use handle::{lockfile_path, EngineHandle};
pub use iter::{Entries, StoreIterator};
pub use key::EffectiveKey;
pub use mode::{encode, file_mode, lock_mode, OpenMode};
pub use registry::{driver_capabilities, has_driver, list_drivers, list_open_handles};
pub use store::KeyStore;
pub use traits::{EntrySource, KeyedAccess};

pub use flatdb_engine::{Capabilities, EngineError};
