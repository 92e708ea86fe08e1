//! Effective keys: caller keys after namespace composition.
//!
//! A key without a namespace reaches the engine verbatim, so databases written
//! by other tools stay readable. A namespaced key is stored as the canonical
//! CBOR array `[text(namespace), bytes(key)]`.
//!
//! A plain key whose bytes happen to form such an array is indistinguishable
//! from the namespaced key it encodes. Mixing both styles in one database is
//! the caller's responsibility.

use crate::error::StoreResult;
use flatdb_codec::{from_cbor, to_canonical_cbor, CodecError, Value};
use std::fmt;

/// Leading byte of every namespaced key: a CBOR array of two items.
const NAMESPACED_HEAD: u8 = 0x82;

/// The key presented to an engine.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum EffectiveKey {
    /// A key stored verbatim.
    Plain(Vec<u8>),
    /// A key inside a namespace.
    Namespaced {
        /// Namespace name.
        namespace: String,
        /// Caller key.
        key: Vec<u8>,
    },
}

impl EffectiveKey {
    /// Creates a plain key.
    pub fn plain(key: impl Into<Vec<u8>>) -> Self {
        Self::Plain(key.into())
    }

    /// Creates a namespaced key.
    pub fn namespaced(namespace: impl Into<String>, key: impl Into<Vec<u8>>) -> Self {
        Self::Namespaced {
            namespace: namespace.into(),
            key: key.into(),
        }
    }

    /// Returns the caller key without its namespace.
    #[must_use]
    pub fn key(&self) -> &[u8] {
        match self {
            Self::Plain(key) | Self::Namespaced { key, .. } => key,
        }
    }

    /// Returns the namespace, if any.
    #[must_use]
    pub fn namespace(&self) -> Option<&str> {
        match self {
            Self::Plain(_) => None,
            Self::Namespaced { namespace, .. } => Some(namespace),
        }
    }

    /// Returns the bytes stored in the engine.
    #[must_use]
    pub fn encode(&self) -> Vec<u8> {
        match self {
            Self::Plain(key) => key.clone(),
            Self::Namespaced { namespace, key } => to_canonical_cbor(&Value::Array(vec![
                Value::Text(namespace.clone()),
                Value::Bytes(key.clone()),
            ])),
        }
    }

    /// Parses bytes that must hold a namespaced key.
    ///
    /// # Errors
    ///
    /// Returns a codec error if the bytes are not exactly a canonical
    /// `[text, bytes]` array.
    pub fn parse_namespaced(bytes: &[u8]) -> StoreResult<Self> {
        let shape_error = || CodecError::invalid_structure("expected [text, bytes] array");

        if bytes.first() != Some(&NAMESPACED_HEAD) {
            return Err(shape_error().into());
        }
        let items = from_cbor(bytes)?.into_array().ok_or_else(shape_error)?;
        match <[Value; 2]>::try_from(items) {
            Ok([Value::Text(namespace), Value::Bytes(key)]) => Ok(Self::Namespaced { namespace, key }),
            _ => Err(shape_error().into()),
        }
    }

    /// Interprets bytes read back from an engine.
    ///
    /// Yields `Namespaced` when the bytes are a namespaced key encoding and
    /// `Plain` otherwise.
    #[must_use]
    pub fn decode(bytes: &[u8]) -> Self {
        Self::parse_namespaced(bytes).unwrap_or_else(|_| Self::Plain(bytes.to_vec()))
    }
}

impl fmt::Display for EffectiveKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Plain(key) => write!(f, "{:?}", String::from_utf8_lossy(key)),
            Self::Namespaced { namespace, key } => {
                write!(f, "{namespace}/{:?}", String::from_utf8_lossy(key))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::StoreError;
    use proptest::prelude::*;

    #[test]
    fn plain_keys_are_verbatim() {
        let key = EffectiveKey::plain(&b"alice"[..]);
        assert_eq!(key.encode(), b"alice");
        assert_eq!(key.namespace(), None);
        assert_eq!(EffectiveKey::decode(b"alice"), key);
    }

    #[test]
    fn namespaced_layout() {
        let key = EffectiveKey::namespaced("ns", &b"k"[..]);
        assert_eq!(key.encode(), vec![0x82, 0x62, b'n', b's', 0x41, b'k']);
        assert_eq!(EffectiveKey::decode(&key.encode()), key);
        assert_eq!(key.key(), b"k");
        assert_eq!(key.namespace(), Some("ns"));
    }

    #[test]
    fn other_cbor_shapes_are_plain() {
        // [bytes, text], a three-element array, and a trailing byte.
        for bytes in [
            &[0x82, 0x41, b'k', 0x62, b'n', b's'][..],
            &[0x83, 0x60, 0x40, 0x40],
            &[0x82, 0x60, 0x40, 0x00],
        ] {
            assert!(matches!(
                EffectiveKey::parse_namespaced(bytes),
                Err(StoreError::Codec(_))
            ));
            assert_eq!(EffectiveKey::decode(bytes), EffectiveKey::Plain(bytes.to_vec()));
        }
    }

    #[test]
    fn nested_array_bytes_are_plain() {
        let bytes = vec![0x81u8; 64 * 1024];
        assert!(EffectiveKey::parse_namespaced(&bytes).is_err());
        assert_eq!(EffectiveKey::decode(&bytes), EffectiveKey::Plain(bytes.clone()));

        let mut deep = vec![0x82u8, 0x60];
        deep.extend(vec![0x81u8; 64 * 1024]);
        assert_eq!(EffectiveKey::decode(&deep), EffectiveKey::Plain(deep.clone()));
    }

    #[test]
    fn display() {
        assert_eq!(EffectiveKey::plain(&b"k"[..]).to_string(), "\"k\"");
        assert_eq!(EffectiveKey::namespaced("users", &b"bob"[..]).to_string(), "users/\"bob\"");
    }

    proptest! {
        #[test]
        fn namespaced_keys_decode_to_themselves(ns in "\\PC{0,12}", key in prop::collection::vec(any::<u8>(), 0..32)) {
            let original = EffectiveKey::namespaced(ns, key);
            prop_assert_eq!(EffectiveKey::decode(&original.encode()), original);
        }

        #[test]
        fn distinct_components_never_collide(
            a in ("[a-z]{0,4}", prop::collection::vec(any::<u8>(), 0..6)),
            b in ("[a-z]{0,4}", prop::collection::vec(any::<u8>(), 0..6)),
        ) {
            prop_assume!(a != b);
            let ka = EffectiveKey::namespaced(a.0, a.1);
            let kb = EffectiveKey::namespaced(b.0, b.1);
            prop_assert_ne!(ka.encode(), kb.encode());
        }
    }
}
