// SPDX-License-Identifier: Apache-2.0
//! The owning container: goal table, node table, reference resolution.
//!
//! Goals form a DAG/graph, not a tree, so parent/subgoal links are stored
//! as non-owning indices ([`GoalRef`]) into the container's goal table and
//! resolved lazily. Resolution requires only that the full table exists,
//! so forward references (a goal referencing a not-yet-decoded goal) work
//! as long as resolution happens after container construction.

use std::collections::BTreeMap;

use crate::error::StoryError;
use crate::goal::Goal;
use crate::rule::{Node, Rule};
use crate::version::{SchemaMode, Version};

/// Non-owning reference to a goal: the raw stored index, resolved lazily
/// against the container.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct GoalRef {
    /// The stored goal index.
    pub index: u32,
}

impl GoalRef {
    /// Create a reference to the goal with the given index.
    pub const fn new(index: u32) -> Self {
        Self { index }
    }

    /// Resolve to the referenced goal. Pure and idempotent.
    ///
    /// `referenced_from` is the index of the record holding this reference
    /// and is reported on failure.
    pub fn resolve<'a>(
        &self,
        story: &'a Story,
        referenced_from: u32,
    ) -> Result<&'a Goal, StoryError> {
        story
            .goal(self.index)
            .ok_or(StoryError::UnresolvedReference {
                index: self.index,
                referenced_from,
            })
    }
}

/// In-memory container snapshot: the full goal table keyed by index and
/// the node table in declaration order. Treated as read-only during
/// decode, encode, dump, and emission.
#[derive(Debug)]
pub struct Story {
    version: Version,
    goals: BTreeMap<u32, Goal>,
    nodes: Vec<Node>,
}

impl Story {
    /// Create an empty container declaring the given format version.
    pub fn new(version: Version) -> Self {
        Self {
            version,
            goals: BTreeMap::new(),
            nodes: Vec::new(),
        }
    }

    /// The container's declared format version.
    pub const fn version(&self) -> Version {
        self.version
    }

    /// The schema mode resolved from the container version.
    pub fn schema_mode(&self) -> SchemaMode {
        self.version.schema_mode()
    }

    /// Insert a goal, keyed by its index. Returns the previous goal with
    /// the same index, if any.
    pub fn add_goal(&mut self, goal: Goal) -> Option<Goal> {
        self.goals.insert(goal.index, goal)
    }

    /// Append a node to the node table. Declaration order is preserved.
    pub fn add_node(&mut self, node: Node) {
        self.nodes.push(node);
    }

    /// Look up a goal by index.
    pub fn goal(&self, index: u32) -> Option<&Goal> {
        self.goals.get(&index)
    }

    /// All goals, ordered by index.
    pub fn goals(&self) -> impl Iterator<Item = &Goal> {
        self.goals.values()
    }

    /// The node table, in declaration order.
    pub fn nodes(&self) -> &[Node] {
        &self.nodes
    }

    /// Rules whose derived goal is `goal_index`, in node-table order.
    /// This is deliberately a single linear scan over the full table;
    /// output order must match declaration order byte for byte.
    pub fn rules_deriving(&self, goal_index: u32) -> impl Iterator<Item = &Rule> {
        self.nodes
            .iter()
            .filter_map(Node::as_rule)
            .filter(move |rule| rule.derived_goal.index == goal_index)
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]

    use super::*;
    use crate::call::Call;

    fn goal(index: u32, name: &str) -> Goal {
        Goal {
            index,
            name: name.to_owned(),
            ..Goal::default()
        }
    }

    fn rule_for(goal_index: u32, action: &str) -> Node {
        Node::Rule(Rule {
            derived_goal: GoalRef::new(goal_index),
            conditions: vec![],
            actions: vec![Call {
                name: action.to_owned(),
                args: vec![],
                negate: false,
            }],
        })
    }

    #[test]
    fn resolve_succeeds_for_existing_goal() {
        let mut story = Story::new(Version::new(1, 4));
        story.add_goal(goal(7, "Child"));
        let resolved = GoalRef::new(7).resolve(&story, 3).unwrap();
        assert_eq!(resolved.name, "Child");
    }

    #[test]
    fn resolve_reports_both_indices_on_failure() {
        let story = Story::new(Version::new(1, 4));
        let err = GoalRef::new(7).resolve(&story, 3).unwrap_err();
        assert_eq!(
            err,
            StoryError::UnresolvedReference {
                index: 7,
                referenced_from: 3,
            }
        );
    }

    #[test]
    fn forward_references_resolve_after_table_is_built() {
        let mut story = Story::new(Version::new(1, 4));
        // Goal 3 references goal 7, inserted later.
        story.add_goal(goal(3, "Parent"));
        story.add_goal(goal(7, "Child"));
        assert!(GoalRef::new(7).resolve(&story, 3).is_ok());
    }

    #[test]
    fn rule_scan_preserves_table_order_and_skips_non_rules() {
        let mut story = Story::new(Version::new(1, 5));
        story.add_node(rule_for(3, "First"));
        story.add_node(Node::Other("database".to_owned()));
        story.add_node(rule_for(9, "OtherGoal"));
        story.add_node(rule_for(3, "Second"));

        let actions: Vec<&str> = story
            .rules_deriving(3)
            .map(|r| r.actions[0].name.as_str())
            .collect();
        assert_eq!(actions, ["First", "Second"]);
    }
}
