// SPDX-License-Identifier: Apache-2.0
//! Story-level decode/encode/emission errors.

use fable_wire::WireError;

use crate::version::VER_ADD_INIT_EXIT_CALLS;

/// Maximum accepted element count for any count-prefixed list, to prevent
/// DoS via a corrupted count.
pub const MAX_LIST_LEN: u32 = 65536;

/// Errors raised while decoding, encoding, dumping, or emitting goal
/// records. Nothing here is retried; every failure is terminal for the
/// record and propagates to the caller.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum StoryError {
    /// Malformed stream: truncated read, bad length prefix, invalid UTF-8.
    #[error(transparent)]
    Wire(#[from] WireError),

    /// List count prefix exceeds the sanity maximum.
    #[error("count prefix for `{field}` at offset {offset} is {count}, exceeds max {MAX_LIST_LEN}")]
    ListOverflow {
        /// Field whose count prefix is out of range.
        field: &'static str,
        /// Offset of the count prefix.
        offset: usize,
        /// Declared element count.
        count: u32,
    },

    /// Subgoal combiner byte outside `{0 = OR, 1 = AND}`. Raised at decode
    /// (with the byte offset) and again at inline-dialect emission if a
    /// record holding such a value was constructed in memory.
    #[error("unknown subgoal combiner {value} on goal {goal}")]
    UnknownCombiner {
        /// Index of the goal carrying the bad combiner.
        goal: u32,
        /// The out-of-range byte.
        value: u8,
        /// Byte offset of the combiner, when detected during decode.
        offset: Option<usize>,
    },

    /// A stored goal index with no matching record in the container.
    #[error("goal {referenced_from} references goal {index}, which does not exist")]
    UnresolvedReference {
        /// The index that failed to resolve.
        index: u32,
        /// Index of the record holding the dangling reference.
        referenced_from: u32,
    },

    /// Strict encode requested at a version that cannot represent the
    /// record's populated init/exit call lists. Use
    /// [`Goal::encode_lossy`](crate::Goal::encode_lossy) to drop them
    /// explicitly instead.
    #[error("goal {goal}: init/exit call lists are not representable before version {VER_ADD_INIT_EXIT_CALLS}")]
    VersionMismatch {
        /// Index of the goal that cannot be represented.
        goal: u32,
    },
}
