// SPDX-License-Identifier: Apache-2.0
//! Goal records: binary codec, diagnostic dump, dual-dialect script
//! emission.
//!
//! Wire layout (Little-Endian, one record):
//!
//! ```text
//! u32      index
//! string   name              (length-prefixed)
//! u8       combiner          (0 = OR, 1 = AND)
//! reflist  parent_goals      (u32 count + u32 index per entry)
//! reflist  sub_goals
//! u8       flags
//! [version >= 1.4 only]:
//!   list<Call>  init_calls   (u32 count + Call per entry)
//!   list<Call>  exit_calls
//! ```
//!
//! The trailing call lists are a historical schema addition: pre-1.4
//! streams simply end after `flags`, and decoding them yields empty lists,
//! never absent ones.

use fable_wire::{Cursor, Writer};

use crate::call::{Call, Tuple};
use crate::decode_count;
use crate::error::StoryError;
use crate::story::{GoalRef, Story};
use crate::version::{Dialect, SchemaMode};

/// Combiner value for OR subgoal combination.
pub const COMBINER_OR: u8 = 0;
/// Combiner value for AND subgoal combination.
pub const COMBINER_AND: u8 = 1;

/// Flag bit marking a child goal. Semantics are owned by the consumer and
/// not validated here.
pub const GOAL_FLAG_CHILD: u8 = 0x02;

/// One goal record, owned by the [`Story`] it was decoded into.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Goal {
    /// Identifier, unique within the owning container; the resolution key.
    pub index: u32,
    /// Human-readable label; not unique.
    pub name: String,
    /// Subgoal combination, stored raw: 0 = OR, 1 = AND. Anything else is
    /// an invariant violation, flagged rather than coerced.
    pub combiner: u8,
    /// Parent goal references, in stored order.
    pub parent_goals: Vec<GoalRef>,
    /// Subgoal references, in stored order.
    pub sub_goals: Vec<GoalRef>,
    /// Flag bitset (see [`GOAL_FLAG_CHILD`]).
    pub flags: u8,
    /// Calls executed on goal entry. Empty for pre-1.4 streams.
    pub init_calls: Vec<Call>,
    /// Calls executed on goal exit. Empty for pre-1.4 streams.
    pub exit_calls: Vec<Call>,
}

impl Goal {
    /// Decode one goal record from the cursor under the given schema mode.
    pub fn decode(cursor: &mut Cursor<'_>, mode: SchemaMode) -> Result<Self, StoryError> {
        let index = cursor.read_u32("goal.index")?;
        let name = cursor.read_string("goal.name")?;

        let combiner_offset = cursor.offset();
        let combiner = cursor.read_u8("goal.combiner")?;
        if combiner != COMBINER_OR && combiner != COMBINER_AND {
            return Err(StoryError::UnknownCombiner {
                goal: index,
                value: combiner,
                offset: Some(combiner_offset),
            });
        }

        let parent_goals = decode_ref_list(cursor, "goal.parent_goals")?;
        let sub_goals = decode_ref_list(cursor, "goal.sub_goals")?;
        let flags = cursor.read_u8("goal.flags")?;

        let (init_calls, exit_calls) = if mode.init_exit_calls {
            (
                decode_call_list(cursor, "goal.init_calls")?,
                decode_call_list(cursor, "goal.exit_calls")?,
            )
        } else {
            (Vec::new(), Vec::new())
        };

        Ok(Self {
            index,
            name,
            combiner,
            parent_goals,
            sub_goals,
            flags,
            init_calls,
            exit_calls,
        })
    }

    /// Encode this record, mirroring [`Goal::decode`] field for field.
    ///
    /// Strict: fails with [`StoryError::VersionMismatch`] if the target
    /// mode predates init/exit calls while either list is populated. Use
    /// [`Goal::encode_lossy`] to drop them deliberately.
    pub fn encode(&self, writer: &mut Writer, mode: SchemaMode) -> Result<(), StoryError> {
        if !mode.init_exit_calls && !(self.init_calls.is_empty() && self.exit_calls.is_empty()) {
            return Err(StoryError::VersionMismatch { goal: self.index });
        }
        self.write_fields(writer, mode);
        Ok(())
    }

    /// Encode this record, dropping init/exit call lists when the target
    /// mode cannot represent them. The truncation is logged, never silent.
    pub fn encode_lossy(&self, writer: &mut Writer, mode: SchemaMode) {
        if !mode.init_exit_calls && !(self.init_calls.is_empty() && self.exit_calls.is_empty()) {
            tracing::warn!(
                goal = self.index,
                init_calls = self.init_calls.len(),
                exit_calls = self.exit_calls.len(),
                "dropping init/exit calls: target version predates them"
            );
        }
        self.write_fields(writer, mode);
    }

    fn write_fields(&self, writer: &mut Writer, mode: SchemaMode) {
        writer.write_u32(self.index);
        writer.write_string(&self.name);
        writer.write_u8(self.combiner);
        write_ref_list(writer, &self.parent_goals);
        write_ref_list(writer, &self.sub_goals);
        writer.write_u8(self.flags);
        if mode.init_exit_calls {
            write_call_list(writer, &self.init_calls);
            write_call_list(writer, &self.exit_calls);
        }
    }

    /// Whether the child-goal flag bit is set.
    pub const fn is_child(&self) -> bool {
        self.flags & GOAL_FLAG_CHILD != 0
    }

    /// Render an indented diagnostic dump of this record and its resolved
    /// relationships. Aborts on the first unresolved reference rather than
    /// printing partial data.
    pub fn debug_dump(&self, story: &Story) -> Result<String, StoryError> {
        let mut out = format!("{}: SGC {}, Flags {}\n", self.name, self.combiner, self.flags);

        if !self.parent_goals.is_empty() {
            out.push_str("    Parent goals: ");
            out.push_str(&self.resolved_pairs(story, &self.parent_goals)?);
            out.push('\n');
        }
        if !self.sub_goals.is_empty() {
            out.push_str("    Subgoals: ");
            out.push_str(&self.resolved_pairs(story, &self.sub_goals)?);
            out.push('\n');
        }
        if !self.init_calls.is_empty() {
            out.push_str("    Init Calls:\n");
            for call in &self.init_calls {
                out.push_str("        ");
                out.push_str(&call.debug_dump());
                out.push('\n');
            }
        }
        if !self.exit_calls.is_empty() {
            out.push_str("    Exit Calls:\n");
            for call in &self.exit_calls {
                out.push_str("        ");
                out.push_str(&call.debug_dump());
                out.push('\n');
            }
        }
        Ok(out)
    }

    fn resolved_pairs(&self, story: &Story, refs: &[GoalRef]) -> Result<String, StoryError> {
        let mut pairs = Vec::with_capacity(refs.len());
        for goal_ref in refs {
            let goal = goal_ref.resolve(story, self.index)?;
            pairs.push(format!("#{} {}", goal.index, goal.name));
        }
        Ok(pairs.join(", "))
    }

    /// Reconstruct this goal's source script in the dialect dictated by
    /// the container version.
    pub fn make_script(&self, story: &Story) -> Result<String, StoryError> {
        match story.schema_mode().dialect {
            Dialect::Inline => self.script_inline(story),
            Dialect::Sectioned => self.script_sectioned(story),
        }
    }

    /// Legacy inline-block dialect (containers up to 1.4).
    fn script_inline(&self, story: &Story) -> Result<String, StoryError> {
        let tuple = Tuple::empty();
        let i = self.index;
        let mut out = format!("Goal({i}).Title(\"{}\");\n", self.name);
        out.push_str(&format!("Goal({i}) {{\n"));

        out.push_str("INIT {\n");
        for call in &self.init_calls {
            out.push_str(&call.make_script(&tuple));
            out.push_str(";\n");
        }
        out.push_str("}\n\n");

        out.push_str("KB {\n");
        for rule in story.rules_deriving(i) {
            out.push_str(&rule.make_script(&tuple));
            out.push('\n');
        }
        out.push_str("}\n\n");

        out.push_str("EXIT {\n");
        for call in &self.exit_calls {
            out.push_str(&call.make_script(&tuple));
            out.push_str(";\n");
        }
        out.push_str("}\n\n");

        out.push_str("}\n");

        match self.combiner {
            COMBINER_AND => out.push_str(&format!("Goal({i}).SubGoals(AND);\n")),
            COMBINER_OR => out.push_str(&format!("Goal({i}).SubGoals(OR);\n")),
            value => {
                return Err(StoryError::UnknownCombiner {
                    goal: i,
                    value,
                    offset: None,
                })
            }
        }
        for sub in &self.sub_goals {
            let target = sub.resolve(story, i)?;
            out.push_str(&format!("Goal({i}).SubGoal({});\n", target.index));
        }
        Ok(out)
    }

    /// Sectioned dialect (containers newer than 1.4).
    fn script_sectioned(&self, story: &Story) -> Result<String, StoryError> {
        let tuple = Tuple::empty();
        let mut out = String::from("Version 1\n");
        // The combiner is always rendered as AND: the legacy per-goal OR
        // choice is not expressible in this dialect.
        out.push_str("SubGoalCombiner SGC_AND\n\n");

        out.push_str("INITSECTION\n");
        for call in &self.init_calls {
            out.push_str(&call.make_script(&tuple));
            out.push_str(";\n");
        }
        out.push('\n');

        out.push_str("KBSECTION\n");
        for rule in story.rules_deriving(self.index) {
            out.push_str(&rule.make_script(&tuple));
            out.push('\n');
        }
        out.push('\n');

        out.push_str("EXITSECTION\n");
        for call in &self.exit_calls {
            out.push_str(&call.make_script(&tuple));
            out.push_str(";\n");
        }
        out.push_str("ENDEXITSECTION\n\n");

        for parent in &self.parent_goals {
            let target = parent.resolve(story, self.index)?;
            out.push_str(&format!("ParentTargetEdge \"{}\"\n", target.name));
        }
        Ok(out)
    }
}

fn decode_ref_list(
    cursor: &mut Cursor<'_>,
    field: &'static str,
) -> Result<Vec<GoalRef>, StoryError> {
    let count = decode_count(cursor, field)?;
    let mut refs = Vec::with_capacity(count);
    for _ in 0..count {
        refs.push(GoalRef::new(cursor.read_u32(field)?));
    }
    Ok(refs)
}

fn write_ref_list(writer: &mut Writer, refs: &[GoalRef]) {
    writer.write_u32(refs.len() as u32);
    for goal_ref in refs {
        writer.write_u32(goal_ref.index);
    }
}

fn decode_call_list(
    cursor: &mut Cursor<'_>,
    field: &'static str,
) -> Result<Vec<Call>, StoryError> {
    let count = decode_count(cursor, field)?;
    let mut calls = Vec::with_capacity(count);
    for _ in 0..count {
        calls.push(Call::decode(cursor)?);
    }
    Ok(calls)
}

fn write_call_list(writer: &mut Writer, calls: &[Call]) {
    writer.write_u32(calls.len() as u32);
    for call in calls {
        call.encode(writer);
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]

    use super::*;
    use crate::rule::{Node, Rule};
    use crate::version::Version;
    use fable_wire::WireError;

    fn call(name: &str, args: &[&str]) -> Call {
        Call {
            name: name.to_owned(),
            args: args.iter().map(|&a| a.to_owned()).collect(),
            negate: false,
        }
    }

    fn sample_goal() -> Goal {
        Goal {
            index: 3,
            name: "OpenDoor".to_owned(),
            combiner: COMBINER_AND,
            parent_goals: vec![GoalRef::new(1)],
            sub_goals: vec![GoalRef::new(7)],
            flags: GOAL_FLAG_CHILD,
            init_calls: vec![call("RegisterDoor", &["DOOR_1"])],
            exit_calls: vec![call("UnregisterDoor", &["DOOR_1"])],
        }
    }

    fn encode(goal: &Goal, mode: SchemaMode) -> Vec<u8> {
        let mut w = Writer::new();
        goal.encode(&mut w, mode).unwrap();
        w.into_bytes()
    }

    #[test]
    fn roundtrip_modern_mode() {
        let mode = Version::new(1, 6).schema_mode();
        let original = sample_goal();
        let bytes = encode(&original, mode);
        let mut c = Cursor::new(&bytes);
        let decoded = Goal::decode(&mut c, mode).unwrap();
        assert_eq!(decoded, original);
        assert!(c.is_at_end());
    }

    #[test]
    fn roundtrip_legacy_mode() {
        let mode = Version::new(1, 0).schema_mode();
        let original = Goal {
            init_calls: vec![],
            exit_calls: vec![],
            ..sample_goal()
        };
        let bytes = encode(&original, mode);
        let mut c = Cursor::new(&bytes);
        let decoded = Goal::decode(&mut c, mode).unwrap();
        assert_eq!(decoded, original);
        assert!(c.is_at_end());
    }

    #[test]
    fn encode_is_deterministic() {
        let mode = Version::new(1, 6).schema_mode();
        assert_eq!(encode(&sample_goal(), mode), encode(&sample_goal(), mode));
    }

    #[test]
    fn legacy_streams_decode_with_empty_call_lists() {
        // Encode without call lists, decode under the same legacy mode.
        let legacy = Version::new(1, 3).schema_mode();
        let goal = Goal {
            init_calls: vec![],
            exit_calls: vec![],
            ..sample_goal()
        };
        let bytes = encode(&goal, legacy);
        let decoded = Goal::decode(&mut Cursor::new(&bytes), legacy).unwrap();
        assert!(decoded.init_calls.is_empty());
        assert!(decoded.exit_calls.is_empty());
    }

    #[test]
    fn strict_encode_rejects_unrepresentable_call_lists() {
        let legacy = Version::new(1, 3).schema_mode();
        let mut w = Writer::new();
        let err = sample_goal().encode(&mut w, legacy).unwrap_err();
        assert_eq!(err, StoryError::VersionMismatch { goal: 3 });
    }

    #[test]
    fn lossy_encode_drops_call_lists() {
        let legacy = Version::new(1, 3).schema_mode();
        let mut w = Writer::new();
        sample_goal().encode_lossy(&mut w, legacy);
        let bytes = w.into_bytes();
        let decoded = Goal::decode(&mut Cursor::new(&bytes), legacy).unwrap();
        assert!(decoded.init_calls.is_empty());
        assert!(decoded.exit_calls.is_empty());
        assert_eq!(decoded.name, "OpenDoor");
    }

    #[test]
    fn decode_rejects_unknown_combiner_with_offset() {
        let mode = Version::new(1, 6).schema_mode();
        let mut bytes = encode(&sample_goal(), mode);
        // Combiner byte sits right after index (4) + name prefix (4) + name (8).
        let combiner_offset = 4 + 4 + "OpenDoor".len();
        bytes[combiner_offset] = 5;
        let err = Goal::decode(&mut Cursor::new(&bytes), mode).unwrap_err();
        assert_eq!(
            err,
            StoryError::UnknownCombiner {
                goal: 3,
                value: 5,
                offset: Some(combiner_offset),
            }
        );
    }

    #[test]
    fn decode_reports_truncation_with_field_context() {
        let mode = Version::new(1, 6).schema_mode();
        let bytes = encode(&sample_goal(), mode);
        let err = Goal::decode(&mut Cursor::new(&bytes[..6]), mode).unwrap_err();
        assert!(matches!(
            err,
            StoryError::Wire(WireError::Truncated { field: "goal.name", .. })
        ));
    }

    #[test]
    fn decode_rejects_oversized_ref_list() {
        let mut w = Writer::new();
        w.write_u32(3);
        w.write_string("G");
        w.write_u8(COMBINER_AND);
        w.write_u32(u32::MAX); // parent_goals count
        let bytes = w.into_bytes();
        let mode = Version::new(1, 6).schema_mode();
        let err = Goal::decode(&mut Cursor::new(&bytes), mode).unwrap_err();
        assert!(matches!(
            err,
            StoryError::ListOverflow { field: "goal.parent_goals", .. }
        ));
    }

    fn story_with_family() -> Story {
        let mut story = Story::new(Version::new(1, 4));
        story.add_goal(Goal {
            index: 1,
            name: "Root".to_owned(),
            combiner: COMBINER_AND,
            ..Goal::default()
        });
        story.add_goal(Goal {
            index: 7,
            name: "CloseDoor".to_owned(),
            combiner: COMBINER_AND,
            flags: GOAL_FLAG_CHILD,
            ..Goal::default()
        });
        story
    }

    #[test]
    fn dump_lists_resolved_relationships() {
        let story = story_with_family();
        let text = sample_goal().debug_dump(&story).unwrap();
        assert_eq!(
            text,
            "OpenDoor: SGC 1, Flags 2\n\
             \x20   Parent goals: #1 Root\n\
             \x20   Subgoals: #7 CloseDoor\n\
             \x20   Init Calls:\n\
             \x20       RegisterDoor(DOOR_1)\n\
             \x20   Exit Calls:\n\
             \x20       UnregisterDoor(DOOR_1)\n"
        );
    }

    #[test]
    fn dump_omits_empty_sections() {
        let story = story_with_family();
        let bare = Goal {
            index: 3,
            name: "Bare".to_owned(),
            combiner: COMBINER_OR,
            ..Goal::default()
        };
        let text = bare.debug_dump(&story).unwrap();
        assert_eq!(text, "Bare: SGC 0, Flags 0\n");
        assert!(!text.contains("Parent goals"));
        assert!(!text.contains("Subgoals"));
    }

    #[test]
    fn dump_fails_on_unresolved_reference() {
        let story = Story::new(Version::new(1, 4));
        let err = sample_goal().debug_dump(&story).unwrap_err();
        assert_eq!(
            err,
            StoryError::UnresolvedReference {
                index: 1,
                referenced_from: 3,
            }
        );
    }

    #[test]
    fn inline_script_emits_subgoal_wiring() {
        let mut story = story_with_family();
        assert_eq!(story.version(), Version::new(1, 4));
        story.add_node(Node::Rule(Rule {
            derived_goal: GoalRef::new(3),
            conditions: vec![call("DoorIsClosed", &["DOOR_1"])],
            actions: vec![call("OpenDoor", &["DOOR_1"])],
        }));

        let text = sample_goal().make_script(&story).unwrap();
        assert!(text.starts_with("Goal(3).Title(\"OpenDoor\");\n"));
        assert!(text.contains("Goal(3) {\n"));
        assert!(text.contains("INIT {\nRegisterDoor(DOOR_1);\n}\n"));
        assert!(text.contains("KB {\nIF\nDoorIsClosed(DOOR_1)\nTHEN\nOpenDoor(DOOR_1);\n\n}\n"));
        assert!(text.contains("EXIT {\nUnregisterDoor(DOOR_1);\n}\n"));
        assert!(text.contains("Goal(3).SubGoals(AND);\n"));
        assert!(text.ends_with("Goal(3).SubGoal(7);\n"));
        // Sectioned-dialect keywords must not leak into the legacy dialect.
        assert!(!text.contains("SubGoalCombiner"));
        assert!(!text.contains("INITSECTION"));
    }

    #[test]
    fn inline_script_emits_or_combiner() {
        let story = story_with_family();
        let goal = Goal {
            combiner: COMBINER_OR,
            ..sample_goal()
        };
        let text = goal.make_script(&story).unwrap();
        assert!(text.contains("Goal(3).SubGoals(OR);\n"));
    }

    #[test]
    fn sectioned_script_replaces_subgoal_wiring_with_parent_edges() {
        let mut story = Story::new(Version::new(1, 6));
        story.add_goal(Goal {
            index: 1,
            name: "Root".to_owned(),
            combiner: COMBINER_AND,
            ..Goal::default()
        });
        story.add_goal(Goal {
            index: 7,
            name: "CloseDoor".to_owned(),
            combiner: COMBINER_AND,
            ..Goal::default()
        });

        let text = sample_goal().make_script(&story).unwrap();
        assert!(text.starts_with("Version 1\nSubGoalCombiner SGC_AND\n\n"));
        assert!(text.contains("INITSECTION\nRegisterDoor(DOOR_1);\n"));
        assert!(text.contains("KBSECTION\n"));
        assert!(text.contains("EXITSECTION\nUnregisterDoor(DOOR_1);\nENDEXITSECTION\n"));
        assert!(text.ends_with("ParentTargetEdge \"Root\"\n"));
        // The legacy per-goal wiring must not appear in this dialect.
        assert!(!text.contains("SubGoals"));
        assert!(!text.contains("SubGoal("));
    }

    #[test]
    fn sectioned_script_renders_or_combiner_as_and() {
        let mut story = Story::new(Version::new(1, 5));
        story.add_goal(Goal {
            index: 1,
            name: "Root".to_owned(),
            ..Goal::default()
        });
        let goal = Goal {
            combiner: COMBINER_OR,
            sub_goals: vec![],
            ..sample_goal()
        };
        let text = goal.make_script(&story).unwrap();
        assert!(text.contains("SubGoalCombiner SGC_AND\n"));
    }

    #[test]
    fn inline_script_rejects_unknown_combiner() {
        let story = story_with_family();
        let goal = Goal {
            combiner: 5,
            ..sample_goal()
        };
        let err = goal.make_script(&story).unwrap_err();
        assert_eq!(
            err,
            StoryError::UnknownCombiner {
                goal: 3,
                value: 5,
                offset: None,
            }
        );
    }

    #[test]
    fn inline_script_fails_on_unresolved_subgoal() {
        let mut story = Story::new(Version::new(1, 4));
        story.add_goal(Goal {
            index: 1,
            name: "Root".to_owned(),
            ..Goal::default()
        });
        // Goal 7 (the subgoal) is missing from the table.
        let err = sample_goal().make_script(&story).unwrap_err();
        assert_eq!(
            err,
            StoryError::UnresolvedReference {
                index: 7,
                referenced_from: 3,
            }
        );
    }
}
