// SPDX-License-Identifier: Apache-2.0
//! Call entities attached to goal records and rule bodies.
//!
//! Wire layout (Little-Endian):
//!
//! ```text
//! string   name      (length-prefixed)
//! u8       negate    (0 or nonzero)
//! u32      arg_count
//! string   arg       (× arg_count)
//! ```

use fable_wire::{Cursor, Writer};

use crate::decode_count;
use crate::error::StoryError;

/// Ordered slot bindings used when rendering calls inside a rule body.
/// Goal-level init/exit calls always render against the empty tuple, so
/// slot references fall through to their literal spelling.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Tuple {
    values: Vec<String>,
}

impl Tuple {
    /// The empty placeholder tuple.
    pub const fn empty() -> Self {
        Self { values: Vec::new() }
    }

    /// Create a tuple binding the given slot values in order.
    pub fn new(values: Vec<String>) -> Self {
        Self { values }
    }

    /// Value bound at `slot`, if any.
    pub fn binding(&self, slot: usize) -> Option<&str> {
        self.values.get(slot).map(String::as_str)
    }
}

/// One call: a named invocation with literal or tuple-bound arguments,
/// optionally negated.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Call {
    /// Invocation name.
    pub name: String,
    /// Arguments, in order. An argument of the form `#N` refers to tuple
    /// slot `N` and renders as that slot's binding when the tuple binds it.
    pub args: Vec<String>,
    /// Whether the call is negated (`NOT name(...)` in script form).
    pub negate: bool,
}

impl Call {
    /// Decode one call from the cursor.
    pub fn decode(cursor: &mut Cursor<'_>) -> Result<Self, StoryError> {
        let name = cursor.read_string("call.name")?;
        let negate = cursor.read_u8("call.negate")? != 0;
        let count = decode_count(cursor, "call.args")?;
        let mut args = Vec::with_capacity(count);
        for _ in 0..count {
            args.push(cursor.read_string("call.arg")?);
        }
        Ok(Self { name, args, negate })
    }

    /// Encode this call, mirroring [`Call::decode`] field for field.
    pub fn encode(&self, writer: &mut Writer) {
        writer.write_string(&self.name);
        writer.write_u8(u8::from(self.negate));
        writer.write_u32(self.args.len() as u32);
        for arg in &self.args {
            writer.write_string(arg);
        }
    }

    /// Render for the diagnostic dump: `name(a, b)`, `NOT`-prefixed when
    /// negated. Arguments are shown as stored, without tuple substitution.
    pub fn debug_dump(&self) -> String {
        let prefix = if self.negate { "NOT " } else { "" };
        format!("{prefix}{}({})", self.name, self.args.join(", "))
    }

    /// Render for script emission, substituting tuple-bound slots.
    pub fn make_script(&self, tuple: &Tuple) -> String {
        let prefix = if self.negate { "NOT " } else { "" };
        let args: Vec<&str> = self
            .args
            .iter()
            .map(|arg| Self::render_arg(arg, tuple))
            .collect();
        format!("{prefix}{}({})", self.name, args.join(", "))
    }

    fn render_arg<'a>(arg: &'a str, tuple: &'a Tuple) -> &'a str {
        arg.strip_prefix('#')
            .and_then(|slot| slot.parse::<usize>().ok())
            .and_then(|slot| tuple.binding(slot))
            .unwrap_or(arg)
    }
}
