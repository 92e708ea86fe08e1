//! The key-value store façade.

use crate::config::StoreOptions;
use crate::error::{StoreError, StoreResult};
use crate::handle::EngineHandle;
use crate::iter::{Entries, StoreIterator};
use crate::key::EffectiveKey;
use crate::mode::{self, OpenMode};
use crate::registry;
use crate::traits::{EntrySource, KeyedAccess};
use flatdb_engine::{Capabilities, EngineError};
use std::path::Path;
use tracing::debug;

/// A key-value store over one engine connection.
///
/// Keys passed to a store are caller keys. While a namespace is selected they
/// are composed with it before reaching the engine, so stores using different
/// namespaces on one database never see each other's keys.
///
/// # Example
///
/// ```rust,no_run
/// use flatdb_core::{KeyStore, OpenMode, StoreOptions};
///
/// let mut store = KeyStore::open(
///     "inventory.db",
///     OpenMode::CREATE | OpenMode::LOCK_DATABASE,
///     StoreOptions::with_driver("btree"),
/// )?;
///
/// store.add_value(b"fruit", b"apple")?;
/// store.add_value(b"fruit", b"pear")?;
/// assert_eq!(store.get_values(b"fruit").len(), 2);
///
/// store.set_namespace("archive");
/// assert!(!store.exists(b"fruit"));
/// store.close()?;
/// # Ok::<(), flatdb_core::StoreError>(())
/// ```
#[derive(Debug)]
pub struct KeyStore {
    handle: EngineHandle,
    namespace: String,
}

impl KeyStore {
    /// Opens a store.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::InvalidMode`] if `mode` has no access tier, or
    /// [`StoreError::Open`] if the driver is unknown or the connection cannot
    /// be opened.
    pub fn open(path: impl AsRef<Path>, mode: OpenMode, options: StoreOptions) -> StoreResult<Self> {
        let path = path.as_ref();
        let control = mode::encode(mode)?;

        if !registry::has_driver(&options.driver) {
            return Err(StoreError::Open {
                path: path.to_path_buf(),
                control,
                source: EngineError::UnknownDriver {
                    name: options.driver,
                },
            });
        }

        let handle = EngineHandle::open(path, &control, &options.driver, options.persistent)?;
        debug!(path = %path.display(), %control, driver = handle.driver(), "opened store");

        Ok(Self {
            handle,
            namespace: options.namespace,
        })
    }

    /// Wraps an already open handle.
    #[must_use]
    pub fn from_handle(handle: EngineHandle) -> Self {
        Self {
            handle,
            namespace: String::new(),
        }
    }

    /// Selects a namespace for later operations. An empty name clears it.
    pub fn set_namespace(&mut self, name: impl Into<String>) {
        self.namespace = name.into();
    }

    /// Returns the current namespace, empty if none.
    #[must_use]
    pub fn namespace(&self) -> &str {
        &self.namespace
    }

    /// Returns whether a namespace is selected.
    #[must_use]
    pub fn has_namespace(&self) -> bool {
        !self.namespace.is_empty()
    }

    /// Returns the effective key for `key` under the current namespace.
    #[must_use]
    pub fn compose_key(&self, key: &[u8]) -> EffectiveKey {
        if self.has_namespace() {
            EffectiveKey::namespaced(self.namespace.clone(), key)
        } else {
            EffectiveKey::plain(key)
        }
    }

    /// Adds a value under `key`.
    ///
    /// Duplicate-capable drivers append it after existing values; others
    /// fail when the key already holds a value.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Insert`] if the engine rejects the value.
    pub fn add_value(&self, key: &[u8], value: &[u8]) -> StoreResult<()> {
        self.handle.raw_insert(&self.compose_key(key), value)
    }

    /// Removes every value under `key`.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Delete`] if the key is absent or the engine
    /// rejects the delete.
    pub fn remove_values(&self, key: &[u8]) -> StoreResult<()> {
        self.handle.raw_delete(&self.compose_key(key))
    }

    /// Returns whether `key` holds a value.
    #[must_use]
    pub fn exists(&self, key: &[u8]) -> bool {
        self.handle.raw_exists(&self.compose_key(key))
    }

    /// Returns the value at offset `skip` under `key`.
    #[must_use]
    pub fn get_value(&self, key: &[u8], skip: usize) -> Option<Vec<u8>> {
        self.handle.raw_fetch(&self.compose_key(key), skip)
    }

    /// Returns every value under `key`, in stored order.
    #[must_use]
    pub fn get_values(&self, key: &[u8]) -> Vec<Vec<u8>> {
        let key = self.compose_key(key);
        (0..)
            .map_while(|offset| self.handle.raw_fetch(&key, offset))
            .collect()
    }

    /// Sets the first value under `key`, leaving any others in place.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Replace`] if the engine rejects the write.
    pub fn set_value(&self, key: &[u8], value: &[u8]) -> StoreResult<()> {
        self.handle.raw_replace(&self.compose_key(key), value)
    }

    /// Replaces all values under `key` with `values`.
    ///
    /// This removes the key and adds each value in turn. It is not atomic:
    /// a failure part way leaves the values added so far.
    ///
    /// # Errors
    ///
    /// Returns the first delete or insert error.
    pub fn set_values<V: AsRef<[u8]>>(&self, key: &[u8], values: &[V]) -> StoreResult<()> {
        if self.exists(key) {
            self.remove_values(key)?;
        }
        values
            .iter()
            .try_for_each(|value| self.add_value(key, value.as_ref()))
    }

    /// Makes accepted writes durable.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Sync`] if the engine fails to flush.
    pub fn sync(&self) -> StoreResult<()> {
        self.handle.raw_sync()
    }

    /// Compacts the database.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Optimize`] if the engine fails to compact.
    pub fn optimize(&self) -> StoreResult<()> {
        self.handle.raw_optimize()
    }

    /// Returns a cursor over the store's keys, all namespaces included.
    #[must_use]
    pub fn iter(&self) -> StoreIterator<'_> {
        StoreIterator::new(&self.handle)
    }

    /// Returns every `(key, first value)` pair in engine order.
    #[must_use]
    pub fn entries(&self) -> Vec<(EffectiveKey, Vec<u8>)> {
        self.iter().entries().collect()
    }

    /// Returns the capabilities of the connection.
    #[must_use]
    pub fn capabilities(&self) -> Capabilities {
        self.handle.capabilities()
    }

    /// Returns the driver name.
    #[must_use]
    pub fn driver(&self) -> &'static str {
        self.handle.driver()
    }

    /// Returns the database path.
    #[must_use]
    pub fn path(&self) -> &Path {
        self.handle.path()
    }

    /// Returns the control string the store was opened with.
    #[must_use]
    pub fn control(&self) -> &str {
        self.handle.control()
    }

    /// Returns the underlying handle.
    #[must_use]
    pub fn handle(&self) -> &EngineHandle {
        &self.handle
    }

    /// Closes the store.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Close`] if pending data cannot be written.
    pub fn close(self) -> StoreResult<()> {
        self.handle.close()
    }
}

impl KeyedAccess for KeyStore {
    fn get(&self, key: &[u8]) -> Option<Vec<u8>> {
        self.get_value(key, 0)
    }

    fn set(&mut self, key: &[u8], value: &[u8]) -> StoreResult<()> {
        self.set_value(key, value)
    }

    fn remove(&mut self, key: &[u8]) -> StoreResult<()> {
        self.remove_values(key)
    }

    fn contains(&self, key: &[u8]) -> bool {
        self.exists(key)
    }
}

impl EntrySource for KeyStore {
    type Entries<'a> = Entries<'a>;

    fn entries_from_start(&self) -> Entries<'_> {
        self.iter().entries()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;
    use tempfile::{tempdir, TempDir};

    fn open(driver: &str) -> (TempDir, KeyStore) {
        let dir = tempdir().unwrap();
        let store = KeyStore::open(
            dir.path().join("store.db"),
            OpenMode::CREATE,
            StoreOptions::with_driver(driver),
        )
        .unwrap();
        (dir, store)
    }

    #[test]
    fn add_get_round_trip() {
        for driver in ["hash", "btree", "flatfile"] {
            let (_dir, store) = open(driver);
            store.add_value(b"k", b"v").unwrap();
            assert!(store.exists(b"k"));
            assert_eq!(store.get_value(b"k", 0), Some(b"v".to_vec()), "{driver}");
        }
    }

    #[test]
    fn set_get_round_trip() {
        for driver in ["hash", "btree", "flatfile"] {
            let (_dir, store) = open(driver);
            store.set_value(b"k", b"one").unwrap();
            store.set_value(b"k", b"two").unwrap();
            assert_eq!(store.get_value(b"k", 0), Some(b"two".to_vec()), "{driver}");
        }
    }

    #[test]
    fn remove_then_absent() {
        for driver in ["hash", "btree", "flatfile"] {
            let (_dir, store) = open(driver);
            store.add_value(b"k", b"v").unwrap();
            store.remove_values(b"k").unwrap();
            assert!(!store.exists(b"k"));
            assert_eq!(store.get_value(b"k", 0), None);
            assert!(store.get_values(b"k").is_empty());
            assert!(matches!(
                store.remove_values(b"k"),
                Err(StoreError::Delete { .. })
            ));
        }
    }

    #[test]
    fn single_value_drivers_reject_second_add() {
        for driver in ["hash", "flatfile"] {
            let (_dir, store) = open(driver);
            assert!(!store.capabilities().duplicates);
            store.add_value(b"k", b"1").unwrap();
            assert!(matches!(
                store.add_value(b"k", b"2"),
                Err(StoreError::Insert { .. })
            ));
        }
    }

    #[test]
    fn multi_value_ordering() {
        let (_dir, store) = open("btree");
        for value in [&b"a"[..], b"b", b"c"] {
            store.add_value(b"k", value).unwrap();
        }
        assert_eq!(
            store.get_values(b"k"),
            vec![b"a".to_vec(), b"b".to_vec(), b"c".to_vec()]
        );
        assert_eq!(store.get_value(b"k", 1), Some(b"b".to_vec()));

        store.set_value(b"k", b"z").unwrap();
        assert_eq!(
            store.get_values(b"k"),
            vec![b"z".to_vec(), b"b".to_vec(), b"c".to_vec()]
        );
    }

    #[test]
    fn set_values_over_different_count() {
        let (_dir, store) = open("btree");
        store.set_values(b"k", &[b"1", b"2", b"3"]).unwrap();
        assert_eq!(store.get_values(b"k").len(), 3);

        store.set_values(b"k", &[b"x"]).unwrap();
        assert_eq!(store.get_values(b"k"), vec![b"x".to_vec()]);

        store.set_values::<&[u8]>(b"k", &[]).unwrap();
        assert!(!store.exists(b"k"));

        store.set_values(b"fresh", &[b"a", b"b"]).unwrap();
        assert_eq!(store.get_values(b"fresh"), vec![b"a".to_vec(), b"b".to_vec()]);
    }

    #[test]
    fn set_values_failure_keeps_partial_state() {
        let (_dir, store) = open("hash");
        store.set_value(b"k", b"old").unwrap();

        let err = store.set_values(b"k", &[b"a", b"b"]).unwrap_err();
        assert!(matches!(err, StoreError::Insert { .. }));
        assert_eq!(store.get_values(b"k"), vec![b"a".to_vec()]);
    }

    #[test]
    fn namespace_isolation() {
        let (_dir, mut store) = open("hash");
        store.add_value(b"k", b"root").unwrap();

        store.set_namespace("a");
        assert!(store.has_namespace());
        assert!(!store.exists(b"k"));
        store.add_value(b"k", b"in a").unwrap();

        store.set_namespace("b");
        assert!(!store.exists(b"k"));
        store.add_value(b"k", b"in b").unwrap();

        store.set_namespace("a");
        assert_eq!(store.get_value(b"k", 0), Some(b"in a".to_vec()));
        store.set_namespace("");
        assert!(!store.has_namespace());
        assert_eq!(store.get_value(b"k", 0), Some(b"root".to_vec()));
    }

    #[test]
    fn iteration_is_exhaustive() {
        let (_dir, mut store) = open("hash");
        let mut expected = BTreeMap::new();
        for i in 0..50u32 {
            let key = format!("key{i}").into_bytes();
            store.add_value(&key, &i.to_le_bytes()).unwrap();
            expected.insert(EffectiveKey::plain(key), i.to_le_bytes().to_vec());
        }
        store.set_namespace("ns");
        store.add_value(b"key0", b"namespaced").unwrap();
        expected.insert(EffectiveKey::namespaced("ns", &b"key0"[..]), b"namespaced".to_vec());

        let seen: BTreeMap<_, _> = store.entries().into_iter().collect();
        assert_eq!(seen, expected);
    }

    #[test]
    fn nested_array_shaped_keys_iterate_as_plain() {
        let (_dir, store) = open("btree");
        let key = vec![0x81u8; 64 * 1024];
        store.set_value(&key, b"deep").unwrap();
        store.set_value(b"k", b"v").unwrap();

        let seen: BTreeMap<_, _> = store.entries().into_iter().collect();
        assert_eq!(seen.len(), 2);
        assert_eq!(seen.get(&EffectiveKey::Plain(key)), Some(&b"deep".to_vec()));
    }

    #[test]
    fn iterator_states() {
        let (_dir, store) = open("btree");
        store.add_value(b"a", b"1").unwrap();
        store.add_value(b"b", b"2").unwrap();

        let mut iter = store.iter();
        assert!(!iter.valid());
        assert_eq!(iter.key(), None);

        iter.next();
        assert_eq!(iter.key(), Some(&EffectiveKey::plain(&b"a"[..])));
        assert_eq!(iter.current(), Some(b"1".to_vec()));

        iter.next();
        assert_eq!(iter.key(), Some(&EffectiveKey::plain(&b"b"[..])));
        iter.next();
        assert!(!iter.valid());
        iter.next();
        assert!(!iter.valid());
        assert_eq!(iter.current(), None);

        iter.rewind();
        assert_eq!(iter.key(), Some(&EffectiveKey::plain(&b"a"[..])));
    }

    #[test]
    fn empty_store_iteration() {
        let (_dir, store) = open("flatfile");
        let mut iter = store.iter();
        iter.rewind();
        assert!(!iter.valid());
        assert!(store.entries().is_empty());
    }

    #[test]
    fn keyed_access_trait() {
        fn bump<S: KeyedAccess>(store: &mut S, key: &[u8]) -> StoreResult<()> {
            let next = store.get(key).map_or(1, |v| v[0] + 1);
            store.set(key, &[next])
        }

        let (_dir, mut store) = open("hash");
        bump(&mut store, b"n").unwrap();
        bump(&mut store, b"n").unwrap();
        assert_eq!(store.get(b"n"), Some(vec![2]));
        assert!(store.contains(b"n"));
        store.remove(b"n").unwrap();
        assert!(!store.contains(b"n"));
    }

    #[test]
    fn entry_source_trait() {
        fn count<S: EntrySource>(source: &S) -> usize {
            source.entries_from_start().count()
        }

        let (_dir, store) = open("btree");
        store.add_value(b"x", b"1").unwrap();
        store.add_value(b"y", b"2").unwrap();
        assert_eq!(count(&store), 2);
        assert_eq!(count(&store), 2);
    }

    #[test]
    fn unknown_driver_fails_at_open() {
        let dir = tempdir().unwrap();
        let err = KeyStore::open(
            dir.path().join("x"),
            OpenMode::CREATE,
            StoreOptions::with_driver("ndbm"),
        )
        .unwrap_err();
        assert!(matches!(
            err,
            StoreError::Open {
                source: EngineError::UnknownDriver { .. },
                ..
            }
        ));
        assert!(!dir.path().join("x").exists());
    }

    #[test]
    fn mode_without_tier_fails() {
        let dir = tempdir().unwrap();
        let err = KeyStore::open(
            dir.path().join("x"),
            OpenMode::LOCK_DATABASE,
            StoreOptions::default(),
        )
        .unwrap_err();
        assert!(matches!(err, StoreError::InvalidMode { .. }));
    }

    #[test]
    fn initial_namespace_from_options() {
        let dir = tempdir().unwrap();
        let store = KeyStore::open(
            dir.path().join("ns.db"),
            OpenMode::CREATE,
            StoreOptions::with_driver("hash").namespace("users"),
        )
        .unwrap();
        assert_eq!(store.namespace(), "users");
        assert_eq!(store.compose_key(b"k"), EffectiveKey::namespaced("users", &b"k"[..]));
        assert_eq!(store.control(), "c");
        assert_eq!(store.driver(), "hash");
        store.close().unwrap();
    }

    #[test]
    fn optimize_keeps_data() {
        let (_dir, store) = open("btree");
        for i in 0..20u8 {
            store.set_value(b"k", &[i]).unwrap();
        }
        store.add_value(b"k", b"dup").unwrap();
        store.optimize().unwrap();
        store.sync().unwrap();
        assert_eq!(store.get_values(b"k"), vec![vec![19], b"dup".to_vec()]);
    }
}
