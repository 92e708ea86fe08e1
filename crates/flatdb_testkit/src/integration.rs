//! Cross-crate integration test helpers.
//!
//! Provides a store wrapper that mirrors every write into an in-memory model
//! and checks reads against it.

use crate::fixtures::TempStore;
use crate::generators::StoreOperation;
use flatdb_core::{EffectiveKey, KeyStore};
use std::collections::BTreeMap;

/// A test harness that checks a store against a model.
pub struct IntegrationHarness {
    temp: TempStore,
    store: Option<KeyStore>,
    model: BTreeMap<Vec<u8>, Vec<Vec<u8>>>,
    duplicates: bool,
}

impl IntegrationHarness {
    /// Creates a harness over a fresh database using `driver`.
    pub fn new(driver: &str) -> Self {
        let temp = TempStore::new(driver);
        let store = temp.create();
        let duplicates = store.capabilities().duplicates;
        Self {
            temp,
            store: Some(store),
            model: BTreeMap::new(),
            duplicates,
        }
    }

    /// Returns the store under test.
    pub fn store(&self) -> &KeyStore {
        self.store.as_ref().expect("Store is closed")
    }

    /// Applies an operation to both the store and the model.
    ///
    /// Operations the store rejects must be rejected by the model too.
    pub fn apply(&mut self, op: &StoreOperation) {
        match op {
            StoreOperation::Add { key, value } => {
                let exists = self.model.contains_key(key);
                let result = self.store().add_value(key, value);
                if exists && !self.duplicates {
                    assert!(result.is_err(), "duplicate add should fail on {key:?}");
                } else {
                    result.expect("Failed to add value");
                    self.model.entry(key.clone()).or_default().push(value.clone());
                }
            }
            StoreOperation::Set { key, value } => {
                self.store().set_value(key, value).expect("Failed to set value");
                match self.model.get_mut(key) {
                    Some(values) => values[0] = value.clone(),
                    None => {
                        self.model.insert(key.clone(), vec![value.clone()]);
                    }
                }
            }
            StoreOperation::Remove { key } => {
                let result = self.store().remove_values(key);
                if self.model.remove(key).is_some() {
                    result.expect("Failed to remove values");
                } else {
                    assert!(result.is_err(), "removing absent {key:?} should fail");
                }
            }
            StoreOperation::Get { key } => {
                self.verify_key(key);
            }
        }
    }

    /// Checks one key against the model.
    pub fn verify_key(&self, key: &[u8]) {
        let expected = self.model.get(key).cloned().unwrap_or_default();
        assert_eq!(self.store().get_values(key), expected, "values mismatch for {key:?}");
        assert_eq!(self.store().exists(key), !expected.is_empty());
    }

    /// Checks every key, and that iteration yields exactly the model's keys.
    pub fn verify_all(&self) {
        for key in self.model.keys() {
            self.verify_key(key);
        }

        let mut seen: Vec<EffectiveKey> =
            self.store().entries().into_iter().map(|(k, _)| k).collect();
        seen.sort();
        let expected: Vec<EffectiveKey> = self
            .model
            .keys()
            .map(|k| self.store().compose_key(k))
            .collect();
        assert_eq!(seen, expected);
    }

    /// Closes and reopens the store, keeping the model.
    pub fn reopen(&mut self) {
        if let Some(store) = self.store.take() {
            store.close().expect("Failed to close store");
        }
        self.store = Some(self.temp.create());
    }

    /// Returns the count of tracked keys.
    pub fn tracked_count(&self) -> usize {
        self.model.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_integration_harness() {
        for driver in ["hash", "btree", "flatfile"] {
            let mut harness = IntegrationHarness::new(driver);
            harness.apply(&StoreOperation::Add {
                key: b"a".to_vec(),
                value: b"1".to_vec(),
            });
            harness.apply(&StoreOperation::Add {
                key: b"a".to_vec(),
                value: b"2".to_vec(),
            });
            harness.apply(&StoreOperation::Set {
                key: b"b".to_vec(),
                value: b"3".to_vec(),
            });
            harness.apply(&StoreOperation::Remove { key: b"c".to_vec() });
            harness.verify_all();
            harness.reopen();
            harness.verify_all();
            assert_eq!(harness.tracked_count(), 2);
        }
    }
}
