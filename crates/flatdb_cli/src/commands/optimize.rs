//! Optimize command implementation.

use super::{open_store, CommandResult};
use flatdb_core::OpenMode;
use std::path::Path;
use tracing::info;

/// Runs the optimize command.
pub fn run(path: &Path, driver: &str) -> CommandResult {
    let before = std::fs::metadata(path)?.len();

    let store = open_store(path, driver, "", OpenMode::WRITE)?;
    store.optimize()?;
    store.close()?;

    let after = std::fs::metadata(path)?.len();
    info!(before, after, "optimized");
    println!("{}: {before} -> {after} bytes", path.display());
    Ok(())
}
