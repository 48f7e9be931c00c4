// SPDX-License-Identifier: Apache-2.0
//! Container format versioning and the per-container schema mode.
//!
//! The container declares a single `major.minor` version; every
//! version-dependent decision (optional wire fields, script dialect) is
//! resolved once into a [`SchemaMode`] and passed down, so record codecs
//! and emitters never compare versions themselves.

use std::fmt;

/// Container format version (`major.minor`), ordered lexicographically.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Version {
    /// Major version component.
    pub major: u8,
    /// Minor version component.
    pub minor: u8,
}

/// First version that carries init/exit call lists on goal records.
/// Streams older than this omit both lists entirely; decoding yields empty
/// lists by construction.
pub const VER_ADD_INIT_EXIT_CALLS: Version = Version::new(1, 4);

/// Last version rendered in the legacy inline-block script dialect.
/// Anything newer renders in the sectioned dialect.
pub const VER_LAST_INLINE_DIALECT: Version = Version::new(1, 4);

impl Version {
    /// Create a version from its components.
    pub const fn new(major: u8, minor: u8) -> Self {
        Self { major, minor }
    }

    /// Resolve this version into the schema mode used for all decode,
    /// encode, and emission decisions on records of this container.
    pub fn schema_mode(self) -> SchemaMode {
        SchemaMode {
            init_exit_calls: self >= VER_ADD_INIT_EXIT_CALLS,
            dialect: if self > VER_LAST_INLINE_DIALECT {
                Dialect::Sectioned
            } else {
                Dialect::Inline
            },
        }
    }
}

impl fmt::Display for Version {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.major, self.minor)
    }
}

/// Script grammar a container's goals render in. One dialect per
/// container; never mixed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Dialect {
    /// Legacy inline-block grammar (`Goal(i) { … }` plus `SubGoal` calls).
    Inline,
    /// Sectioned grammar (`INITSECTION` / `KBSECTION` / `EXITSECTION`).
    Sectioned,
}

/// Version-dependent decisions, resolved once per container.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SchemaMode {
    /// Whether goal records carry init/exit call lists on the wire.
    pub init_exit_calls: bool,
    /// Script dialect for emission.
    pub dialect: Dialect,
}
