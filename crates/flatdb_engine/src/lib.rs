//! # FlatDB Engines
//!
//! The operation contract shared by every flat-file key-value engine, the
//! control-string parser, and the compiled-in drivers.
//!
//! ## Drivers
//!
//! | Driver | Duplicates | Cursor order | Tiers |
//! |--------|-----------|--------------|-------|
//! | `hash` | no | unspecified | `r w c n` |
//! | `btree` | yes | sorted | `r w c n` |
//! | `cdb_make` | yes | none until reopened | `c n` |
//! | `cdb` | yes | file order | `r` |
//! | `flatfile` | no | insertion | `r w c n` |
//!
//! Engines do not lock files. Callers take the locks a control string asks
//! for before calling [`open_driver`].
//!
//! ## Example
//!
//! ```rust,no_run
//! use flatdb_engine::{open_driver, ControlString};
//! use std::path::Path;
//!
//! let control = ControlString::parse("c").unwrap();
//! let mut engine = open_driver("btree", Path::new("data.btree"), &control).unwrap();
//! engine.insert(b"key", b"value").unwrap();
//! assert_eq!(engine.fetch(b"key", 0), Some(b"value".to_vec()));
//! engine.close().unwrap();
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod btree;
mod cdb;
mod control;
mod driver;
mod engine;
mod error;
mod flatfile;
mod hash;
mod log;

pub use btree::BTreeEngine;
pub use cdb::{cdb_hash, CdbMaker, CdbReader};
pub use control::{ControlString, LockTargets, Tier};
pub use driver::{driver_names, drivers, find_driver, open_driver, DriverInfo};
pub use engine::{Capabilities, Engine};
pub use error::{EngineError, EngineResult};
pub use flatfile::FlatFileEngine;
pub use hash::HashEngine;
