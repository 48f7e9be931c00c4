// SPDX-License-Identifier: Apache-2.0
//! Container node table entries: rules and non-rule markers.
//!
//! The script emitter scans the node table linearly and keeps the rules
//! whose derived goal matches the goal being emitted; declaration order is
//! load-bearing and must never be reordered.

use crate::call::{Call, Tuple};
use crate::story::GoalRef;

/// One entry in the container's node table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Node {
    /// A rule node, eligible for KB-section emission.
    Rule(Rule),
    /// Any non-rule node kind, opaque to this crate and skipped by the
    /// rule scan. Carries the node's name for diagnostics.
    Other(String),
}

impl Node {
    /// The rule carried by this node, if it is rule-shaped.
    pub fn as_rule(&self) -> Option<&Rule> {
        match self {
            Self::Rule(rule) => Some(rule),
            Self::Other(_) => None,
        }
    }
}

/// A rule: conditions joined by `AND`, then a list of actions. Each rule
/// derives into exactly one goal's knowledge base.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Rule {
    /// The goal whose KB section this rule belongs to.
    pub derived_goal: GoalRef,
    /// Conditions, in order; the first renders after `IF`, the rest after
    /// `AND`.
    pub conditions: Vec<Call>,
    /// Actions, in order, each terminated with `;`.
    pub actions: Vec<Call>,
}

impl Rule {
    /// Render this rule in the `IF … THEN …` form shared by both script
    /// dialects.
    pub fn make_script(&self, tuple: &Tuple) -> String {
        let mut out = String::from("IF\n");
        for (i, cond) in self.conditions.iter().enumerate() {
            if i > 0 {
                out.push_str("AND\n");
            }
            out.push_str(&cond.make_script(tuple));
            out.push('\n');
        }
        out.push_str("THEN\n");
        for action in &self.actions {
            out.push_str(&action.make_script(tuple));
            out.push_str(";\n");
        }
        out
    }
}
