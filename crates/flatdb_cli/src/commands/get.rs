//! Get command implementation.

use super::{display_bytes, open_store, CommandResult};
use flatdb_core::OpenMode;
use std::path::Path;

/// Runs the get command.
pub fn run(path: &Path, driver: &str, namespace: &str, key: &str, all: bool) -> CommandResult {
    let store = open_store(path, driver, namespace, OpenMode::READ)?;

    let values = if all {
        store.get_values(key.as_bytes())
    } else {
        store.get_value(key.as_bytes(), 0).into_iter().collect()
    };
    store.close()?;

    if values.is_empty() {
        return Err(format!("key not found: {key}").into());
    }
    for value in values {
        println!("{}", display_bytes(&value));
    }
    Ok(())
}
