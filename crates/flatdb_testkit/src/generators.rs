//! Property-based test generators using proptest.
//!
//! Provides strategies for generating modes, keys, values, namespaces and
//! operation sequences.

use flatdb_core::OpenMode;
use proptest::prelude::*;

/// Strategy for generating keys (arbitrary bytes, possibly empty).
pub fn key_strategy() -> impl Strategy<Value = Vec<u8>> {
    prop::collection::vec(any::<u8>(), 0..32)
}

/// Strategy for generating short keys, so sequences revisit keys often.
pub fn small_key_strategy() -> impl Strategy<Value = Vec<u8>> {
    prop::collection::vec(0u8..4, 1..3)
}

/// Strategy for generating values.
pub fn value_strategy() -> impl Strategy<Value = Vec<u8>> {
    prop::collection::vec(any::<u8>(), 0..256)
}

/// Strategy for generating non-empty namespace names.
pub fn namespace_strategy() -> impl Strategy<Value = String> {
    prop::string::string_regex("[a-zA-Z][a-zA-Z0-9_.-]{0,15}").expect("Invalid regex")
}

/// Strategy for generating open modes with at least one access tier.
pub fn open_mode_strategy() -> impl Strategy<Value = OpenMode> {
    (1u8..16, 0u8..16).prop_map(|(tier, extra)| OpenMode::from_bits(tier | (extra << 4)))
}

/// Strategy for generating arbitrary open modes, valid or not.
pub fn any_open_mode_strategy() -> impl Strategy<Value = OpenMode> {
    any::<u8>().prop_map(OpenMode::from_bits)
}

/// A store operation for model-based tests.
#[derive(Debug, Clone)]
pub enum StoreOperation {
    /// Add a value
    Add {
        /// Key
        key: Vec<u8>,
        /// Value
        value: Vec<u8>,
    },
    /// Set the first value
    Set {
        /// Key
        key: Vec<u8>,
        /// Value
        value: Vec<u8>,
    },
    /// Remove every value
    Remove {
        /// Key
        key: Vec<u8>,
    },
    /// Read a key
    Get {
        /// Key
        key: Vec<u8>,
    },
}

/// Strategy for generating store operations.
pub fn store_operation_strategy() -> impl Strategy<Value = StoreOperation> {
    prop_oneof![
        3 => (small_key_strategy(), value_strategy())
            .prop_map(|(key, value)| StoreOperation::Add { key, value }),
        2 => (small_key_strategy(), value_strategy())
            .prop_map(|(key, value)| StoreOperation::Set { key, value }),
        1 => small_key_strategy().prop_map(|key| StoreOperation::Remove { key }),
        2 => small_key_strategy().prop_map(|key| StoreOperation::Get { key }),
    ]
}

/// Strategy for generating a sequence of operations.
pub fn operation_sequence_strategy(
    min_ops: usize,
    max_ops: usize,
) -> impl Strategy<Value = Vec<StoreOperation>> {
    prop::collection::vec(store_operation_strategy(), min_ops..max_ops)
}

/// Configuration for property tests.
#[derive(Debug, Clone)]
pub struct PropTestConfig {
    /// Number of test cases to run.
    pub cases: u32,
    /// Maximum shrink iterations.
    pub max_shrink_iters: u32,
}

impl Default for PropTestConfig {
    fn default() -> Self {
        Self {
            cases: 256,
            max_shrink_iters: 1000,
        }
    }
}

impl PropTestConfig {
    /// Creates a configuration for quick tests.
    #[must_use]
    pub fn quick() -> Self {
        Self {
            cases: 32,
            max_shrink_iters: 100,
        }
    }

    /// Creates a configuration for thorough tests.
    #[must_use]
    pub fn thorough() -> Self {
        Self {
            cases: 1024,
            max_shrink_iters: 10000,
        }
    }

    /// Converts to proptest config.
    #[must_use]
    pub fn to_proptest_config(&self) -> ProptestConfig {
        ProptestConfig {
            cases: self.cases,
            max_shrink_iters: self.max_shrink_iters,
            ..ProptestConfig::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use flatdb_core::{encode, StoreError};

    proptest! {
        #![proptest_config(PropTestConfig::quick().to_proptest_config())]

        #[test]
        fn generated_modes_encode(mode in open_mode_strategy()) {
            let control = encode(mode).unwrap();
            prop_assert!(matches!(control.chars().next(), Some('r' | 'w' | 'c' | 'n')));
        }

        #[test]
        fn modes_without_tier_are_rejected(mode in any_open_mode_strategy()) {
            let has_tier = mode.bits() & 0x0f != 0;
            prop_assert_eq!(encode(mode).is_ok(), has_tier);
            if !has_tier {
                prop_assert!(
                    matches!(encode(mode), Err(StoreError::InvalidMode { .. })),
                    "expected InvalidMode"
                );
            }
        }

        #[test]
        fn namespaces_are_non_empty(ns in namespace_strategy()) {
            prop_assert!(!ns.is_empty());
        }
    }
}
