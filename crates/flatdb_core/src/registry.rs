//! Process-wide driver and connection listings.
//!
//! Everything here is read-only for callers and usable before any store
//! exists.

use flatdb_engine::{driver_names, find_driver, Capabilities};
use parking_lot::{const_mutex, Mutex};
use std::collections::{BTreeMap, BTreeSet};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};

/// Open connections by registration id. Ids increase, so map order is open
/// order.
static OPEN_CONNECTIONS: Mutex<BTreeMap<u64, PathBuf>> = const_mutex(BTreeMap::new());

static NEXT_CONNECTION_ID: AtomicU64 = AtomicU64::new(1);

/// Returns the names of all available drivers.
#[must_use]
pub fn list_drivers() -> BTreeSet<&'static str> {
    driver_names().collect()
}

/// Returns whether a driver with this name is available.
#[must_use]
pub fn has_driver(name: &str) -> bool {
    find_driver(name).is_some()
}

/// Returns what the named driver can do, or `None` for an unknown driver.
#[must_use]
pub fn driver_capabilities(name: &str) -> Option<Capabilities> {
    find_driver(name).map(|info| info.capabilities)
}

/// Returns the paths of all open connections, oldest first.
///
/// A persistent connection shared by several stores is listed once.
#[must_use]
pub fn list_open_handles() -> Vec<String> {
    OPEN_CONNECTIONS
        .lock()
        .values()
        .map(|path| path.display().to_string())
        .collect()
}

/// Records a newly opened connection and returns its id.
pub(crate) fn register_connection(path: &Path) -> u64 {
    let id = NEXT_CONNECTION_ID.fetch_add(1, Ordering::Relaxed);
    OPEN_CONNECTIONS.lock().insert(id, path.to_path_buf());
    id
}

/// Forgets a closed connection.
pub(crate) fn unregister_connection(id: u64) {
    OPEN_CONNECTIONS.lock().remove(&id);
}
