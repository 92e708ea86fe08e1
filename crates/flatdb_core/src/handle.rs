//! Engine connections.
//!
//! An [`EngineHandle`] owns one connection: the engine, the locks its control
//! string asked for, and its entry in the open-connection registry. The
//! connection is closed exactly once, by [`EngineHandle::close`] or on drop.
//!
//! Persistent handles share their connection with every other persistent
//! handle opened on the same path, control string and driver. The shared
//! connection closes when its last handle goes away.

use crate::error::{StoreError, StoreResult};
use crate::key::EffectiveKey;
use crate::registry;
use flatdb_engine::{
    find_driver, open_driver, Capabilities, ControlString, Engine, EngineError, EngineResult, Tier,
};
use flatdb_storage::{FileLock, LockKind};
use parking_lot::{const_mutex, Mutex};
use std::collections::BTreeMap;
use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Weak};
use tracing::{debug, warn};

type PersistentKey = (PathBuf, String, String);

/// One slot per persistent key. The slot lock is held while its connection
/// opens, so only openers of the same key wait on a blocking file lock.
type PersistentSlot = Arc<Mutex<Weak<Mutex<Connection>>>>;

static PERSISTENT: Mutex<BTreeMap<PersistentKey, PersistentSlot>> =
    const_mutex(BTreeMap::new());

/// Returns the sidecar lock file path for a database.
#[must_use]
pub fn lockfile_path(path: &Path) -> PathBuf {
    let mut name = OsString::from(path.as_os_str());
    name.push(".lck");
    PathBuf::from(name)
}

/// One open engine plus the locks guarding it.
struct Connection {
    id: u64,
    path: PathBuf,
    engine: Option<Box<dyn Engine>>,
    // Released after the engine is closed.
    locks: Vec<FileLock>,
}

impl Connection {
    fn open(path: &Path, control: &ControlString, driver: &str) -> EngineResult<Self> {
        let info = find_driver(driver).ok_or_else(|| EngineError::UnknownDriver {
            name: driver.to_string(),
        })?;
        let tier = control.tier();
        if !info.supports(tier) {
            return Err(EngineError::UnsupportedTier {
                driver: info.name,
                tier,
            });
        }

        let kind = if tier == Tier::Read {
            LockKind::Shared
        } else {
            LockKind::Exclusive
        };
        let blocking = !control.is_test();
        let targets = control.lock_targets();

        let mut locks = Vec::new();
        if targets.lockfile {
            locks.push(FileLock::acquire(&lockfile_path(path), kind, blocking, true)?);
        }
        if targets.database {
            let create = tier.access_mode().creates();
            locks.push(FileLock::acquire(path, kind, blocking, create)?);
        }

        let engine = open_driver(info.name, path, control)?;
        let id = registry::register_connection(path);
        debug!(id, path = %path.display(), %control, driver = info.name, "opened connection");

        Ok(Self {
            id,
            path: path.to_path_buf(),
            engine: Some(engine),
            locks,
        })
    }

    fn engine(&self) -> EngineResult<&dyn Engine> {
        self.engine.as_deref().ok_or(EngineError::Closed)
    }

    fn engine_mut(&mut self) -> EngineResult<&mut (dyn Engine + 'static)> {
        self.engine.as_deref_mut().ok_or(EngineError::Closed)
    }

    fn shutdown(&mut self) -> EngineResult<()> {
        let Some(engine) = self.engine.take() else {
            return Ok(());
        };
        registry::unregister_connection(self.id);
        let result = engine.close();
        self.locks.clear();
        debug!(id = self.id, path = %self.path.display(), "closed connection");
        result
    }
}

impl Drop for Connection {
    fn drop(&mut self) {
        if let Err(e) = self.shutdown() {
            warn!(path = %self.path.display(), error = %e, "failed to close connection");
        }
    }
}

/// An open engine connection.
pub struct EngineHandle {
    connection: Arc<Mutex<Connection>>,
    path: PathBuf,
    control: ControlString,
    driver: &'static str,
    capabilities: Capabilities,
    persistent: bool,
}

impl std::fmt::Debug for EngineHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EngineHandle")
            .field("path", &self.path)
            .field("control", &self.control.as_str())
            .field("driver", &self.driver)
            .field("persistent", &self.persistent)
            .finish_non_exhaustive()
    }
}

impl EngineHandle {
    /// Opens `path` with the named driver.
    ///
    /// Locks are taken before the engine opens, as the control string asks:
    /// none for `-`, the database file for `d`, `<path>.lck` for `l`, and the
    /// database file when neither `d` nor `l` is given. Read tiers lock
    /// shared, all others exclusive. With `t` a held lock fails the open
    /// instead of blocking.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Open`] for an unknown driver, a malformed control
    /// string, a tier the driver rejects, lock contention under `t`, or any
    /// failure opening the file.
    pub fn open(path: &Path, control: &str, driver: &str, persistent: bool) -> StoreResult<Self> {
        let open_error = |source| StoreError::Open {
            path: path.to_path_buf(),
            control: control.to_string(),
            source,
        };

        let parsed = ControlString::parse(control).map_err(open_error)?;
        let connection = if persistent {
            Self::open_persistent(path, &parsed, driver).map_err(open_error)?
        } else {
            Arc::new(Mutex::new(
                Connection::open(path, &parsed, driver).map_err(open_error)?,
            ))
        };

        let (driver, capabilities) = {
            let guard = connection.lock();
            let engine = guard.engine().map_err(open_error)?;
            (engine.driver(), engine.capabilities())
        };

        Ok(Self {
            connection,
            path: path.to_path_buf(),
            control: parsed,
            driver,
            capabilities,
            persistent,
        })
    }

    fn open_persistent(
        path: &Path,
        control: &ControlString,
        driver: &str,
    ) -> EngineResult<Arc<Mutex<Connection>>> {
        let key = (
            path.to_path_buf(),
            control.as_str().to_string(),
            driver.to_string(),
        );

        let slot = {
            let mut table = PERSISTENT.lock();
            // A slot locked by an in-progress open is kept.
            table.retain(|_, slot| {
                slot.try_lock()
                    .map_or(true, |shared| shared.strong_count() > 0)
            });
            Arc::clone(table.entry(key).or_default())
        };

        let mut shared = slot.lock();
        if let Some(connection) = shared.upgrade() {
            debug!(path = %path.display(), %control, driver, "reusing persistent connection");
            return Ok(connection);
        }

        let connection = Arc::new(Mutex::new(Connection::open(path, control, driver)?));
        *shared = Arc::downgrade(&connection);
        Ok(connection)
    }

    /// Returns the database path.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Returns the control string the connection was opened with.
    #[must_use]
    pub fn control(&self) -> &str {
        self.control.as_str()
    }

    /// Returns the driver name.
    #[must_use]
    pub fn driver(&self) -> &'static str {
        self.driver
    }

    /// Returns the capabilities of the connection.
    #[must_use]
    pub fn capabilities(&self) -> Capabilities {
        self.capabilities
    }

    /// Returns whether the connection may be shared with other handles.
    #[must_use]
    pub fn is_persistent(&self) -> bool {
        self.persistent
    }

    /// Inserts a value, appending on duplicate-capable engines.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Insert`] if the key exists on a single-value
    /// engine, or the connection is read-only.
    pub fn raw_insert(&self, key: &EffectiveKey, value: &[u8]) -> StoreResult<()> {
        self.connection
            .lock()
            .engine_mut()
            .and_then(|engine| engine.insert(&key.encode(), value))
            .map_err(|source| StoreError::Insert {
                key: key.clone(),
                source,
            })
    }

    /// Overwrites the first value, creating the key if needed.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Replace`] if the engine rejects the write.
    pub fn raw_replace(&self, key: &EffectiveKey, value: &[u8]) -> StoreResult<()> {
        self.connection
            .lock()
            .engine_mut()
            .and_then(|engine| engine.replace(&key.encode(), value))
            .map_err(|source| StoreError::Replace {
                key: key.clone(),
                source,
            })
    }

    /// Removes every value under a key.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Delete`] if the key is absent or the engine
    /// rejects the write.
    pub fn raw_delete(&self, key: &EffectiveKey) -> StoreResult<()> {
        self.connection
            .lock()
            .engine_mut()
            .and_then(|engine| engine.delete(&key.encode()))
            .map_err(|source| StoreError::Delete {
                key: key.clone(),
                source,
            })
    }

    /// Returns whether a value is stored under `key`.
    #[must_use]
    pub fn raw_exists(&self, key: &EffectiveKey) -> bool {
        self.connection
            .lock()
            .engine()
            .is_ok_and(|engine| engine.exists(&key.encode()))
    }

    /// Returns the value at `offset` under `key`.
    #[must_use]
    pub fn raw_fetch(&self, key: &EffectiveKey, offset: usize) -> Option<Vec<u8>> {
        self.connection
            .lock()
            .engine()
            .ok()
            .and_then(|engine| engine.fetch(&key.encode(), offset))
    }

    /// Positions the connection cursor at the first key.
    #[must_use]
    pub fn raw_first_key(&self) -> Option<EffectiveKey> {
        let key = self.connection.lock().engine_mut().ok()?.first_key()?;
        Some(EffectiveKey::decode(&key))
    }

    /// Advances the connection cursor.
    #[must_use]
    pub fn raw_next_key(&self) -> Option<EffectiveKey> {
        let key = self.connection.lock().engine_mut().ok()?.next_key()?;
        Some(EffectiveKey::decode(&key))
    }

    /// Makes accepted writes durable.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Sync`] if the engine fails to flush.
    pub fn raw_sync(&self) -> StoreResult<()> {
        self.connection
            .lock()
            .engine_mut()
            .and_then(|engine| engine.sync())
            .map_err(|source| StoreError::Sync { source })
    }

    /// Reclaims space held by superseded data.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Optimize`] if the engine fails to compact.
    pub fn raw_optimize(&self) -> StoreResult<()> {
        self.connection
            .lock()
            .engine_mut()
            .and_then(|engine| engine.optimize())
            .map_err(|source| StoreError::Optimize { source })
    }

    /// Closes the handle.
    ///
    /// A persistent connection still held by other handles stays open.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Close`] if the engine fails to write pending
    /// data. The connection is released either way.
    pub fn close(self) -> StoreResult<()> {
        // Fails while any other handle holds the connection. A concurrent
        // persistent open either upgrades first or opens a fresh connection.
        match Arc::try_unwrap(self.connection) {
            Ok(connection) => connection
                .into_inner()
                .shutdown()
                .map_err(|source| StoreError::Close { source }),
            Err(_) => {
                debug!(path = %self.path.display(), "persistent connection still in use");
                Ok(())
            }
        }
    }
}
