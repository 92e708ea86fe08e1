//! The table of compiled-in drivers.

use crate::btree::BTreeEngine;
use crate::cdb::{CdbMaker, CdbReader};
use crate::control::{ControlString, Tier};
use crate::engine::{Capabilities, Engine};
use crate::error::{EngineError, EngineResult};
use crate::flatfile::FlatFileEngine;
use crate::hash::HashEngine;
use std::path::Path;
use tracing::debug;

const ALL_TIERS: &[Tier] = &[Tier::Read, Tier::Write, Tier::Create, Tier::Truncate];

/// Static description of a driver.
#[derive(Debug, Clone, Copy)]
pub struct DriverInfo {
    /// Name used to select the driver.
    pub name: &'static str,
    /// One-line description.
    pub description: &'static str,
    /// Access tiers the driver can be opened with.
    pub tiers: &'static [Tier],
    /// Capabilities of a writable connection.
    pub capabilities: Capabilities,
}

impl DriverInfo {
    /// Returns whether the driver accepts `tier`.
    #[must_use]
    pub fn supports(&self, tier: Tier) -> bool {
        self.tiers.contains(&tier)
    }
}

static DRIVERS: &[DriverInfo] = &[
    DriverInfo {
        name: "hash",
        description: "hash table over a checksummed operation log",
        tiers: ALL_TIERS,
        capabilities: Capabilities {
            duplicates: false,
            sorted_keys: false,
            read_only: false,
            deferred_writes: false,
        },
    },
    DriverInfo {
        name: "btree",
        description: "sorted keys with duplicate values over a checksummed operation log",
        tiers: ALL_TIERS,
        capabilities: Capabilities {
            duplicates: true,
            sorted_keys: true,
            read_only: false,
            deferred_writes: false,
        },
    },
    DriverInfo {
        name: "cdb",
        description: "constant database reader",
        tiers: &[Tier::Read],
        capabilities: Capabilities {
            duplicates: true,
            sorted_keys: false,
            read_only: true,
            deferred_writes: false,
        },
    },
    DriverInfo {
        name: "cdb_make",
        description: "constant database builder, written on close",
        tiers: &[Tier::Create, Tier::Truncate],
        capabilities: Capabilities {
            duplicates: true,
            sorted_keys: false,
            read_only: false,
            deferred_writes: true,
        },
    },
    DriverInfo {
        name: "flatfile",
        description: "length-prefixed text records",
        tiers: ALL_TIERS,
        capabilities: Capabilities {
            duplicates: false,
            sorted_keys: false,
            read_only: false,
            deferred_writes: false,
        },
    },
];

/// Returns every compiled-in driver.
#[must_use]
pub fn drivers() -> &'static [DriverInfo] {
    DRIVERS
}

/// Looks up a driver by name.
#[must_use]
pub fn find_driver(name: &str) -> Option<&'static DriverInfo> {
    DRIVERS.iter().find(|d| d.name == name)
}

/// Returns the names of all drivers.
pub fn driver_names() -> impl Iterator<Item = &'static str> {
    DRIVERS.iter().map(|d| d.name)
}

/// Opens `path` with the named driver.
///
/// Locking is not handled here; the caller holds whatever locks the control
/// string asks for.
///
/// # Errors
///
/// Returns [`EngineError::UnknownDriver`] for an unknown name,
/// [`EngineError::UnsupportedTier`] if the driver does not accept the control
/// string's tier, or the driver's own open error.
pub fn open_driver(name: &str, path: &Path, control: &ControlString) -> EngineResult<Box<dyn Engine>> {
    let info = find_driver(name).ok_or_else(|| EngineError::UnknownDriver {
        name: name.to_string(),
    })?;
    let tier = control.tier();
    if !info.supports(tier) {
        return Err(EngineError::UnsupportedTier {
            driver: info.name,
            tier,
        });
    }

    debug!(driver = info.name, path = %path.display(), %control, "opening engine");

    let engine: Box<dyn Engine> = match info.name {
        "hash" => Box::new(HashEngine::open(path, tier)?),
        "btree" => Box::new(BTreeEngine::open(path, tier)?),
        "cdb" => Box::new(CdbReader::open(path)?),
        "cdb_make" => Box::new(CdbMaker::create(path)?),
        "flatfile" => Box::new(FlatFileEngine::open(path, tier)?),
        other => {
            return Err(EngineError::UnknownDriver {
                name: other.to_string(),
            })
        }
    };
    Ok(engine)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn control(raw: &str) -> ControlString {
        ControlString::parse(raw).unwrap()
    }

    #[test]
    fn names_are_unique() {
        let mut names: Vec<_> = driver_names().collect();
        let count = names.len();
        names.sort_unstable();
        names.dedup();
        assert_eq!(names.len(), count);
        assert_eq!(count, 5);
    }

    #[test]
    fn unknown_driver() {
        let dir = tempdir().unwrap();
        let result = open_driver("gdbm", &dir.path().join("x"), &control("c"));
        assert!(matches!(result, Err(EngineError::UnknownDriver { name }) if name == "gdbm"));
    }

    #[test]
    fn cdb_rejects_write_tiers() {
        let dir = tempdir().unwrap();
        for raw in ["w", "c", "n"] {
            let result = open_driver("cdb", &dir.path().join("x.cdb"), &control(raw));
            assert!(matches!(
                result,
                Err(EngineError::UnsupportedTier { driver: "cdb", .. })
            ));
        }
    }

    #[test]
    fn cdb_make_rejects_read_and_write() {
        let dir = tempdir().unwrap();
        for raw in ["r", "w"] {
            let result = open_driver("cdb_make", &dir.path().join("x.cdb"), &control(raw));
            assert!(matches!(result, Err(EngineError::UnsupportedTier { .. })));
        }
    }

    #[test]
    fn opened_engine_reports_its_driver() {
        let dir = tempdir().unwrap();
        for info in drivers().iter().filter(|d| d.supports(Tier::Create)) {
            let path = dir.path().join(info.name);
            let engine = open_driver(info.name, &path, &control("c")).unwrap();
            assert_eq!(engine.driver(), info.name);
            assert_eq!(engine.capabilities(), info.capabilities);
            engine.close().unwrap();
        }
    }

    #[test]
    fn cdb_build_then_read() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("built.cdb");

        let mut maker = open_driver("cdb_make", &path, &control("n")).unwrap();
        maker.insert(b"k", b"v").unwrap();
        maker.close().unwrap();

        let reader = open_driver("cdb", &path, &control("r")).unwrap();
        assert_eq!(reader.fetch(b"k", 0), Some(b"v".to_vec()));
    }
}
