//! CLI command implementations.

pub mod drivers;
pub mod dump;
pub mod edit;
pub mod get;
pub mod optimize;

use flatdb_core::{KeyStore, OpenMode, StoreOptions};
use std::path::Path;

/// Result type shared by the commands.
pub type CommandResult<T = ()> = Result<T, Box<dyn std::error::Error>>;

/// Opens the store a command works on.
pub fn open_store(path: &Path, driver: &str, namespace: &str, mode: OpenMode) -> CommandResult<KeyStore> {
    let options = StoreOptions::with_driver(driver).namespace(namespace);
    Ok(KeyStore::open(path, mode, options)?)
}

/// Renders bytes for terminal output.
pub fn display_bytes(bytes: &[u8]) -> String {
    String::from_utf8_lossy(bytes).into_owned()
}
