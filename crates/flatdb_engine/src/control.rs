//! Engine control strings.
//!
//! A control string tells a driver how to open its file:
//!
//! ```text
//! <tier>[d][l][-][t]
//!
//! tier  r  read-only, file must exist
//!       w  read-write, file must exist
//!       c  read-write, file created if missing
//!       n  read-write, file created and truncated
//! d        lock the database file
//! l        lock a sidecar `<path>.lck` file
//! -        take no lock at all
//! t        fail instead of waiting for a lock
//! ```
//!
//! Lock characters may appear in any order; `t` must come last.

use crate::error::{EngineError, EngineResult};
use flatdb_storage::AccessMode;
use std::fmt;

/// The file-access tier of a control string.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Tier {
    /// `r`: read-only access to an existing file.
    Read,
    /// `w`: read-write access to an existing file.
    Write,
    /// `c`: read-write access, creating the file if missing.
    Create,
    /// `n`: read-write access to a new, empty file.
    Truncate,
}

impl Tier {
    /// Returns the control-string character for this tier.
    #[must_use]
    pub const fn as_char(self) -> char {
        match self {
            Self::Read => 'r',
            Self::Write => 'w',
            Self::Create => 'c',
            Self::Truncate => 'n',
        }
    }

    /// Parses a tier character.
    #[must_use]
    pub const fn from_char(c: char) -> Option<Self> {
        match c {
            'r' => Some(Self::Read),
            'w' => Some(Self::Write),
            'c' => Some(Self::Create),
            'n' => Some(Self::Truncate),
            _ => None,
        }
    }

    /// Returns whether this tier permits writes.
    #[must_use]
    pub const fn is_writable(self) -> bool {
        !matches!(self, Self::Read)
    }

    /// Returns the storage access mode a file is opened with under this tier.
    #[must_use]
    pub const fn access_mode(self) -> AccessMode {
        match self {
            Self::Read => AccessMode::ReadOnly,
            Self::Write => AccessMode::ReadWrite,
            Self::Create => AccessMode::Create,
            Self::Truncate => AccessMode::Truncate,
        }
    }
}

/// Which files a connection locks, after defaults are applied.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LockTargets {
    /// Lock the database file itself.
    pub database: bool,
    /// Lock the `<path>.lck` sidecar file.
    pub lockfile: bool,
}

/// A parsed control string.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ControlString {
    raw: String,
    tier: Tier,
    lock_database: bool,
    lock_lockfile: bool,
    lock_ignore: bool,
    test: bool,
}

impl ControlString {
    /// Parses a control string.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::InvalidControl`] if the string is empty, does
    /// not start with a tier character, contains an unknown character, or
    /// has anything after `t`.
    pub fn parse(raw: &str) -> EngineResult<Self> {
        let mut chars = raw.chars();
        let tier = match chars.next() {
            Some(c) => Tier::from_char(c).ok_or_else(|| {
                EngineError::invalid_control(raw, format!("unknown access tier '{c}'"))
            })?,
            None => return Err(EngineError::invalid_control(raw, "empty control string")),
        };

        let mut control = Self {
            raw: raw.to_string(),
            tier,
            lock_database: false,
            lock_lockfile: false,
            lock_ignore: false,
            test: false,
        };

        for c in chars {
            if control.test {
                return Err(EngineError::invalid_control(raw, "'t' must be the last character"));
            }
            match c {
                'd' => control.lock_database = true,
                'l' => control.lock_lockfile = true,
                '-' => control.lock_ignore = true,
                't' => control.test = true,
                other => {
                    return Err(EngineError::invalid_control(
                        raw,
                        format!("unknown mode character '{other}'"),
                    ))
                }
            }
        }

        Ok(control)
    }

    /// Returns the control string as given.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.raw
    }

    /// Returns the access tier.
    #[must_use]
    pub fn tier(&self) -> Tier {
        self.tier
    }

    /// Returns whether `d` was given.
    #[must_use]
    pub fn lock_database(&self) -> bool {
        self.lock_database
    }

    /// Returns whether `l` was given.
    #[must_use]
    pub fn lock_lockfile(&self) -> bool {
        self.lock_lockfile
    }

    /// Returns whether `-` was given.
    #[must_use]
    pub fn lock_ignore(&self) -> bool {
        self.lock_ignore
    }

    /// Returns whether `t` was given.
    #[must_use]
    pub fn is_test(&self) -> bool {
        self.test
    }

    /// Resolves which files to lock.
    ///
    /// `-` disables locking. Otherwise `d` and `l` select their targets, and
    /// with neither given the database file is locked.
    #[must_use]
    pub fn lock_targets(&self) -> LockTargets {
        if self.lock_ignore {
            return LockTargets {
                database: false,
                lockfile: false,
            };
        }
        LockTargets {
            database: self.lock_database || !self.lock_lockfile,
            lockfile: self.lock_lockfile,
        }
    }
}

impl fmt::Display for ControlString {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.raw)
    }
}
