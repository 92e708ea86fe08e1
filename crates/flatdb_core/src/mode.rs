//! Open-mode flags and their control-string encoding.
//!
//! Engines are opened with a short control string (`"c"`, `"rdl-t"`, ...).
//! Callers describe their intent with [`OpenMode`] flags instead, and this
//! module turns the flags into the string.

use crate::error::{StoreError, StoreResult};
use std::fmt;
use std::ops::{BitOr, BitOrAssign};

/// Open-mode flags.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct OpenMode(u8);

impl OpenMode {
    /// No flags set.
    pub const NONE: Self = Self(0);
    /// Read access.
    pub const READ: Self = Self(1);
    /// Read-write access to an existing database.
    pub const WRITE: Self = Self(2);
    /// Read-write access, creating the database if missing.
    pub const CREATE: Self = Self(4);
    /// Read-write access to a new, empty database.
    pub const TRUNCATE: Self = Self(8);
    /// Lock the database file.
    pub const LOCK_DATABASE: Self = Self(16);
    /// Lock a `<path>.lck` sidecar file.
    pub const LOCK_LOCKFILE: Self = Self(32);
    /// Take no lock.
    pub const LOCK_IGNORE: Self = Self(64);
    /// Fail instead of waiting for a lock.
    pub const TEST: Self = Self(128);

    /// Creates flags from their raw bits.
    #[must_use]
    pub const fn from_bits(bits: u8) -> Self {
        Self(bits)
    }

    /// Returns the raw bits.
    #[must_use]
    pub const fn bits(self) -> u8 {
        self.0
    }

    /// Returns whether every flag in `other` is set.
    #[must_use]
    pub const fn contains(self, other: Self) -> bool {
        self.0 & other.0 == other.0
    }

    /// Returns these flags with `other` added.
    #[must_use]
    pub const fn with(self, other: Self) -> Self {
        Self(self.0 | other.0)
    }
}

impl BitOr for OpenMode {
    type Output = Self;

    fn bitor(self, rhs: Self) -> Self {
        self.with(rhs)
    }
}

impl BitOrAssign for OpenMode {
    fn bitor_assign(&mut self, rhs: Self) {
        *self = self.with(rhs);
    }
}

impl fmt::Display for OpenMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:#04x}", self.0)
    }
}

/// Returns the access tier character for `mode`.
///
/// The most destructive tier wins: truncate, then create, write, read.
///
/// # Errors
///
/// Returns [`StoreError::InvalidMode`] if no tier flag is set.
pub fn file_mode(mode: OpenMode) -> StoreResult<char> {
    [
        (OpenMode::TRUNCATE, 'n'),
        (OpenMode::CREATE, 'c'),
        (OpenMode::WRITE, 'w'),
        (OpenMode::READ, 'r'),
    ]
    .into_iter()
    .find(|&(flag, _)| mode.contains(flag))
    .map(|(_, c)| c)
    .ok_or(StoreError::InvalidMode { mode })
}

/// Returns the lock characters for `mode`, in `d`, `l`, `-` order.
#[must_use]
pub fn lock_mode(mode: OpenMode) -> String {
    [
        (OpenMode::LOCK_DATABASE, 'd'),
        (OpenMode::LOCK_LOCKFILE, 'l'),
        (OpenMode::LOCK_IGNORE, '-'),
    ]
    .into_iter()
    .filter(|&(flag, _)| mode.contains(flag))
    .map(|(_, c)| c)
    .collect()
}

/// Encodes `mode` as an engine control string.
///
/// # Errors
///
/// Returns [`StoreError::InvalidMode`] if no tier flag is set.
///
/// # Example
///
/// ```rust
/// use flatdb_core::{encode, OpenMode};
///
/// let mode = OpenMode::READ | OpenMode::LOCK_DATABASE | OpenMode::TEST;
/// assert_eq!(encode(mode).unwrap(), "rdt");
/// ```
pub fn encode(mode: OpenMode) -> StoreResult<String> {
    let mut control = String::with_capacity(5);
    control.push(file_mode(mode)?);
    control.push_str(&lock_mode(mode));
    if mode.contains(OpenMode::TEST) {
        control.push('t');
    }
    Ok(control)
}
