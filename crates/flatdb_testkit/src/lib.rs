//! # FlatDB Testkit
//!
//! Test utilities for FlatDB.
//!
//! This crate provides:
//! - Scratch database fixtures and scenario builders
//! - Property-based test generators using proptest
//! - A model-checking integration harness
//! - Stress testing utilities
//!
//! ## Usage
//!
//! ```rust
//! use flatdb_testkit::prelude::*;
//!
//! with_temp_store("btree", |store| {
//!     store.add_value(b"k", b"v").unwrap();
//!     assert_eq!(store.get_value(b"k", 0), Some(b"v".to_vec()));
//! });
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

pub mod fixtures;
pub mod generators;
pub mod integration;
pub mod stress;

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::fixtures::*;
    pub use crate::generators::*;
    pub use crate::integration::*;
    pub use crate::stress::*;
}

pub use fixtures::*;
pub use generators::*;
pub use integration::*;
pub use stress::*;
