//! End-to-end tests across the storage, engine and store layers.

use flatdb_core::{
    list_open_handles, EffectiveKey, EngineError, KeyStore, OpenMode, StoreError, StoreOptions,
};
use flatdb_storage::StorageError;
use flatdb_testkit::prelude::*;
use proptest::prelude::*;
use std::collections::BTreeMap;

fn materialize(store: &KeyStore) -> BTreeMap<Vec<u8>, Vec<u8>> {
    store
        .entries()
        .into_iter()
        .map(|(key, value)| (key.key().to_vec(), value))
        .collect()
}

#[test]
fn insert_remove_replace_scenario() {
    for driver in ["hash", "btree", "flatfile"] {
        let temp = TempStore::new(driver);
        let store = temp.open(OpenMode::CREATE | OpenMode::TRUNCATE);

        store.add_value(b"foo", b"23").unwrap();
        store.add_value(b"bar", b"42").unwrap();
        store.add_value(b"foobar", b"1337").unwrap();
        store.remove_values(b"foo").unwrap();
        store.set_value(b"foobar", b"42").unwrap();

        let expected: BTreeMap<Vec<u8>, Vec<u8>> = [
            (b"bar".to_vec(), b"42".to_vec()),
            (b"foobar".to_vec(), b"42".to_vec()),
        ]
        .into_iter()
        .collect();
        assert_eq!(materialize(&store), expected, "driver {driver}");

        store.close().unwrap();
        let store = temp.read();
        assert_eq!(materialize(&store), expected, "driver {driver} after reopen");
    }
}

#[test]
fn cdb_build_then_reopen() {
    let temp = TempStore::new("cdb_make");
    let mut builder = temp.open(OpenMode::CREATE);
    builder.add_value(b"one", b"1").unwrap();
    builder.add_value(b"two", b"2").unwrap();
    builder.add_value(b"one", b"uno").unwrap();
    builder.set_namespace("ns");
    builder.add_value(b"one", b"ns one").unwrap();

    assert!(builder.entries().is_empty());
    assert!(!builder.exists(b"one"));
    builder.close().unwrap();

    let options = StoreOptions::with_driver("cdb");
    let mut reader = temp.open_with(OpenMode::READ, options.clone());
    assert_eq!(reader.get_values(b"one"), vec![b"1".to_vec(), b"uno".to_vec()]);
    assert_eq!(reader.get_value(b"two", 0), Some(b"2".to_vec()));

    // One entry per record in build order, each carrying the key's first value.
    let plain = |key: &[u8]| EffectiveKey::plain(key.to_vec());
    assert_eq!(
        reader.entries(),
        vec![
            (plain(b"one"), b"1".to_vec()),
            (plain(b"two"), b"2".to_vec()),
            (plain(b"one"), b"1".to_vec()),
            (EffectiveKey::namespaced("ns", b"one".to_vec()), b"ns one".to_vec()),
        ]
    );
    assert!(matches!(
        reader.add_value(b"three", b"3"),
        Err(StoreError::Insert { .. })
    ));
    reader.set_namespace("ns");
    assert_eq!(reader.get_values(b"one"), vec![b"ns one".to_vec()]);
    reader.close().unwrap();

    let err = KeyStore::open(temp.path(), OpenMode::WRITE, options).unwrap_err();
    assert!(matches!(err, StoreError::Open { .. }));
}

#[test]
fn namespaces_are_isolated() {
    let temp = TempStore::new("btree");
    let mut store = temp.create();

    store.set_value(b"key", b"plain").unwrap();
    store.set_namespace("alpha");
    store.set_value(b"key", b"in alpha").unwrap();
    store.set_namespace("beta");
    assert!(!store.exists(b"key"));
    store.set_value(b"key", b"in beta").unwrap();

    store.set_namespace("alpha");
    assert_eq!(store.get_value(b"key", 0), Some(b"in alpha".to_vec()));
    store.set_namespace("");
    assert_eq!(store.get_value(b"key", 0), Some(b"plain".to_vec()));

    let mut keys: Vec<EffectiveKey> = store.entries().into_iter().map(|(k, _)| k).collect();
    keys.sort();
    assert_eq!(
        keys,
        vec![
            EffectiveKey::plain(b"key".to_vec()),
            EffectiveKey::namespaced("alpha", b"key".to_vec()),
            EffectiveKey::namespaced("beta", b"key".to_vec()),
        ]
    );
}

#[test]
fn test_mode_reports_lock_contention() {
    let temp = TempStore::new("hash");
    let _holder = temp.open(OpenMode::CREATE | OpenMode::LOCK_DATABASE);

    let err = temp
        .try_open(OpenMode::WRITE | OpenMode::LOCK_DATABASE | OpenMode::TEST)
        .unwrap_err();
    assert!(matches!(
        err,
        StoreError::Open {
            source: EngineError::Storage(StorageError::Locked { .. }),
            ..
        }
    ));
}

#[test]
fn persistent_stores_share_one_connection() {
    let temp = TempStore::new("hash");
    let options = temp.options().persistent(true);
    let path = temp.path().display().to_string();

    let first = temp.open_with(OpenMode::CREATE, options.clone());
    let second = temp.open_with(OpenMode::CREATE, options);
    first.add_value(b"shared", b"yes").unwrap();
    assert_eq!(second.get_value(b"shared", 0), Some(b"yes".to_vec()));

    let open = list_open_handles().into_iter().filter(|p| *p == path).count();
    assert_eq!(open, 1);

    drop(first);
    drop(second);
    assert!(!list_open_handles().contains(&path));
}

#[test]
fn optimize_keeps_contents() {
    for driver in ["hash", "btree", "flatfile"] {
        let temp = scenarios::populated_store(driver, 100);
        let store = temp.create();
        for i in (0..100).step_by(2) {
            store.remove_values(format!("key{i}").as_bytes()).unwrap();
        }
        let before = materialize(&store);
        store.optimize().unwrap();
        assert_eq!(materialize(&store), before, "driver {driver}");
        store.close().unwrap();

        let store = temp.read();
        assert_eq!(materialize(&store).len(), 50, "driver {driver}");
    }
}

proptest! {
    #![proptest_config(PropTestConfig::quick().to_proptest_config())]

    #[test]
    fn stores_agree_with_model(ops in operation_sequence_strategy(1, 40)) {
        for driver in ["hash", "btree", "flatfile"] {
            let mut harness = IntegrationHarness::new(driver);
            for op in &ops {
                harness.apply(op);
            }
            harness.verify_all();
            harness.reopen();
            harness.verify_all();
        }
    }
}
