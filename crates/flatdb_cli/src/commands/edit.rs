//! Set, add and delete command implementations.

use super::{open_store, CommandResult};
use flatdb_core::OpenMode;
use std::path::Path;
use tracing::info;

/// A single-key write.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Edit<'a> {
    /// Overwrite the first value.
    Set(&'a str),
    /// Append a value.
    Add(&'a str),
    /// Remove every value.
    Delete,
}

impl Edit<'_> {
    fn mode(self) -> OpenMode {
        match self {
            Self::Set(_) | Self::Add(_) => OpenMode::CREATE,
            Self::Delete => OpenMode::WRITE,
        }
    }
}

/// Runs a write command.
pub fn run(path: &Path, driver: &str, namespace: &str, key: &str, edit: Edit<'_>) -> CommandResult {
    let store = open_store(path, driver, namespace, edit.mode())?;
    let key_bytes = key.as_bytes();

    match edit {
        Edit::Set(value) => store.set_value(key_bytes, value.as_bytes())?,
        Edit::Add(value) => store.add_value(key_bytes, value.as_bytes())?,
        Edit::Delete => store.remove_values(key_bytes)?,
    }
    store.close()?;

    info!(key, ?edit, "done");
    Ok(())
}
