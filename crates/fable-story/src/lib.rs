// SPDX-License-Identifier: Apache-2.0
//! Goal records for the Fable story container format.
//!
//! A story is a rule-based program serialized in a versioned binary
//! container. This crate models one record kind — the goal — end to end:
//!
//! * lossless binary decode/encode, tolerant of the format's schema
//!   evolution (init/exit call lists appeared in 1.4);
//! * lazy integer-index reference resolution into the container's goal
//!   table (goals form a DAG, so references are non-owning);
//! * a deterministic diagnostic dump;
//! * source-script reconstruction in one of two dialects, selected once
//!   per container by its version (inline blocks up to 1.4, sectioned
//!   after).
//!
//! The container is treated as a read-only snapshot during all four
//! operations; every failure propagates immediately and nothing is
//! retried.

pub mod call;
pub mod error;
pub mod goal;
pub mod rule;
pub mod story;
pub mod version;

pub use call::{Call, Tuple};
pub use error::{StoryError, MAX_LIST_LEN};
pub use goal::{Goal, COMBINER_AND, COMBINER_OR, GOAL_FLAG_CHILD};
pub use rule::{Node, Rule};
pub use story::{GoalRef, Story};
pub use version::{Dialect, SchemaMode, Version, VER_ADD_INIT_EXIT_CALLS};

use fable_wire::Cursor;

/// Read a list count prefix, enforcing [`MAX_LIST_LEN`].
pub(crate) fn decode_count(
    cursor: &mut Cursor<'_>,
    field: &'static str,
) -> Result<usize, StoryError> {
    let offset = cursor.offset();
    let count = cursor.read_u32(field)?;
    if count > MAX_LIST_LEN {
        return Err(StoryError::ListOverflow {
            field,
            offset,
            count,
        });
    }
    Ok(count as usize)
}
