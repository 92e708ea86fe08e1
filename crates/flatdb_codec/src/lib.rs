//! # FlatDB Codec
//!
//! Canonical CBOR encoding/decoding for FlatDB composite keys.
//!
//! Namespaced keys are stored as a CBOR array of a text namespace and a
//! byte-string key. Because the encoding is canonical and length-prefixed:
//! - Identical inputs produce identical bytes
//! - Equal encodings imply equal components
//! - No separator byte inside a namespace or key can cause a collision
//!
//! ## Canonical CBOR Rules
//!
//! - Lengths use shortest encoding
//! - Strings must be UTF-8
//! - No indefinite-length items
//! - Only byte strings, text strings and arrays are accepted
//!
//! ## Usage
//!
//! ```
//! use flatdb_codec::{to_canonical_cbor, from_cbor, Value};
//!
//! let value = Value::Array(vec![Value::from("users"), Value::from(&b"alice"[..])]);
//! let bytes = to_canonical_cbor(&value);
//!
//! let decoded = from_cbor(&bytes).unwrap();
//! assert_eq!(value, decoded);
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod decoder;
mod encoder;
mod error;
mod value;

pub use decoder::{from_cbor, CanonicalDecoder};
pub use encoder::{to_canonical_cbor, CanonicalEncoder};
pub use error::{CodecError, CodecResult};
pub use value::Value;
