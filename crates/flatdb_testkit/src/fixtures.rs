//! Test fixtures and store helpers.
//!
//! Provides convenience functions for setting up scratch databases and
//! common test scenarios.

use flatdb_core::{KeyStore, OpenMode, StoreOptions};
use std::path::{Path, PathBuf};
use tempfile::TempDir;

/// A scratch database directory with automatic cleanup.
pub struct TempStore {
    dir: TempDir,
    path: PathBuf,
    driver: String,
}

impl TempStore {
    /// Creates a scratch location for a database using `driver`.
    ///
    /// No file is created until a store is opened.
    pub fn new(driver: &str) -> Self {
        let dir = TempDir::new().expect("Failed to create temp directory");
        let path = dir.path().join(format!("test.{driver}"));
        Self {
            dir,
            path,
            driver: driver.to_string(),
        }
    }

    /// Returns the database path.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Returns the scratch directory.
    pub fn dir(&self) -> &Path {
        self.dir.path()
    }

    /// Returns the driver name.
    pub fn driver(&self) -> &str {
        &self.driver
    }

    /// Returns default options for this driver.
    pub fn options(&self) -> StoreOptions {
        StoreOptions::with_driver(self.driver.clone())
    }

    /// Opens the database with `mode`.
    pub fn open(&self, mode: OpenMode) -> KeyStore {
        self.try_open(mode).expect("Failed to open store")
    }

    /// Opens the database with `mode`, returning any error.
    pub fn try_open(&self, mode: OpenMode) -> flatdb_core::StoreResult<KeyStore> {
        KeyStore::open(&self.path, mode, self.options())
    }

    /// Opens the database with `mode` and explicit options.
    pub fn open_with(&self, mode: OpenMode, options: StoreOptions) -> KeyStore {
        KeyStore::open(&self.path, mode, options).expect("Failed to open store")
    }

    /// Opens the database for read-write access, creating it if missing.
    pub fn create(&self) -> KeyStore {
        self.open(OpenMode::CREATE)
    }

    /// Opens the database read-only.
    pub fn read(&self) -> KeyStore {
        self.open(OpenMode::READ)
    }
}

/// Runs a test against a freshly created store.
///
/// # Example
///
/// ```rust
/// use flatdb_testkit::with_temp_store;
///
/// with_temp_store("hash", |store| {
///     store.set_value(b"k", b"v").unwrap();
///     assert!(store.exists(b"k"));
/// });
/// ```
pub fn with_temp_store<F, R>(driver: &str, f: F) -> R
where
    F: FnOnce(&KeyStore) -> R,
{
    let temp = TempStore::new(driver);
    let store = temp.create();
    let result = f(&store);
    store.close().expect("Failed to close store");
    result
}

/// Runs a mutable test against a freshly created store.
pub fn with_temp_store_mut<F, R>(driver: &str, f: F) -> R
where
    F: FnOnce(&mut KeyStore) -> R,
{
    let temp = TempStore::new(driver);
    let mut store = temp.create();
    let result = f(&mut store);
    store.close().expect("Failed to close store");
    result
}

/// Test scenario helpers.
pub mod scenarios {
    use super::*;

    /// Creates a database holding `count` keys `key0..` with values `value0..`.
    pub fn populated_store(driver: &str, count: usize) -> TempStore {
        let temp = TempStore::new(driver);
        let store = temp.create();
        for i in 0..count {
            store
                .add_value(format!("key{i}").as_bytes(), format!("value{i}").as_bytes())
                .expect("Failed to add value");
        }
        store.close().expect("Failed to close store");
        temp
    }

    /// Builds a cdb file from `pairs` and returns its location, ready to be
    /// opened with the `cdb` driver.
    pub fn built_cdb(pairs: &[(&[u8], &[u8])]) -> TempStore {
        let builder = TempStore::new("cdb_make");
        let store = builder.open(OpenMode::TRUNCATE);
        for (key, value) in pairs {
            store.add_value(key, value).expect("Failed to add value");
        }
        store.close().expect("Failed to close builder");

        TempStore {
            dir: builder.dir,
            path: builder.path,
            driver: "cdb".to_string(),
        }
    }
}
