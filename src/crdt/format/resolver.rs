//! Per-character mark resolution.
//!
//! Resolution is a pure function of the character store and the format log:
//! replicas holding the same entries and ops resolve the same marks, whatever
//! order the ops arrived in.
//!
//! For each visible character and each mark type, the latest `AddMark` and the
//! latest `RemoveMark` covering the character are compared by timestamp. The
//! mark is active only when no removal covers the character or the add is
//! strictly later; equal timestamps resolve to removed.

use std::collections::{BTreeSet, HashMap};

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::crdt::format::log::FormatLog;
use crate::crdt::format::op::{BoundaryKind, FormatOp, MarkAttrs};
use crate::crdt::store::CharacterStore;
use crate::crdt::types::OpId;

/// Mark types the projector knows how to render.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MarkSchema {
    known: Vec<String>,
}

impl Default for MarkSchema {
    fn default() -> Self {
        MarkSchema::new(["bold", "italic", "underline", "strike", "code", "link"])
    }
}

impl MarkSchema {
    pub fn new<I, S>(known: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        MarkSchema {
            known: known.into_iter().map(Into::into).collect(),
        }
    }

    pub fn is_known(&self, mark_type: &str) -> bool {
        self.known.iter().any(|known| known == mark_type)
    }

    pub fn mark_types(&self) -> &[String] {
        &self.known
    }
}

/// An active mark on a character.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResolvedMark {
    #[serde(rename = "type")]
    pub mark_type: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub attrs: Option<MarkAttrs>,
}

/// A format op whose boundaries were found in the current snapshot.
struct PlacedOp<'a> {
    op: &'a FormatOp,
    start: usize,
    end: usize,
}

/// Tests whether the character at tombstone-inclusive `index` falls inside `op`.
///
/// `start` and `end` are the tombstone-inclusive indices of the op's boundary
/// characters.
pub fn is_within_mark(index: usize, op: &FormatOp, start: usize, end: usize) -> bool {
    let after_start = match op.start.kind {
        BoundaryKind::Before => index >= start,
        BoundaryKind::After => index > start,
    };
    let before_end = match op.end.kind {
        BoundaryKind::Before => index < end,
        BoundaryKind::After => index <= end,
    };
    after_start && before_end
}

/// Latest add and latest remove seen for one mark type on one character.
#[derive(Default)]
struct Contest<'a> {
    add: Option<&'a FormatOp>,
    remove: Option<&'a FormatOp>,
}

impl<'a> Contest<'a> {
    fn offer(&mut self, op: &'a FormatOp) {
        let slot = if op.is_add() {
            &mut self.add
        } else {
            &mut self.remove
        };
        let newer = slot.is_none_or(|current| {
            (op.timestamp, &op.op_id) > (current.timestamp, &current.op_id)
        });
        if newer {
            *slot = Some(op);
        }
    }

    fn winner(&self) -> Option<&'a FormatOp> {
        let add = self.add?;
        match self.remove {
            Some(remove) if add.timestamp <= remove.timestamp => None,
            _ => Some(add),
        }
    }
}

/// Resolves the active marks of every visible character, in document order.
///
/// Format ops whose boundary characters are unknown to this replica are
/// skipped; they take effect once the characters arrive. Unknown mark types
/// are skipped as well.
pub fn resolve_marks(
    store: &CharacterStore,
    log: &FormatLog,
    schema: &MarkSchema,
) -> Vec<Vec<ResolvedMark>> {
    let positions = store.positions();
    let placed = place_ops(log, &positions);

    let mut unknown: BTreeSet<&str> = BTreeSet::new();
    let resolved = store
        .entries()
        .iter()
        .enumerate()
        .filter(|(_, entry)| entry.is_visible())
        // entries() starts after the head sentinel
        .map(|(offset, _)| resolve_at(offset + 1, &placed, schema, &mut unknown))
        .collect();

    for mark_type in unknown {
        debug!(mark_type, "skipping unknown mark type");
    }
    resolved
}

/// Resolves the marks of a single character by id.
pub fn marks_of(
    store: &CharacterStore,
    log: &FormatLog,
    schema: &MarkSchema,
    char_id: &OpId,
) -> Vec<ResolvedMark> {
    let positions = store.positions();
    let Some(&index) = positions.get(char_id) else {
        return Vec::new();
    };
    let placed = place_ops(log, &positions);
    resolve_at(index, &placed, schema, &mut BTreeSet::new())
}

fn place_ops<'a>(log: &'a FormatLog, positions: &HashMap<&OpId, usize>) -> Vec<PlacedOp<'a>> {
    log.ops()
        .iter()
        .filter_map(|op| {
            let start = positions.get(&op.start.char_op_id);
            let end = positions.get(&op.end.char_op_id);
            match (start, end) {
                (Some(&start), Some(&end)) => Some(PlacedOp { op, start, end }),
                _ => {
                    debug!(op_id = %op.op_id, "format op boundary not resolvable yet");
                    None
                }
            }
        })
        .collect()
}

fn resolve_at<'a>(
    index: usize,
    placed: &[PlacedOp<'a>],
    schema: &MarkSchema,
    unknown: &mut BTreeSet<&'a str>,
) -> Vec<ResolvedMark> {
    let mut contests: HashMap<&'a str, Contest<'a>> = HashMap::new();

    for placed_op in placed {
        if is_within_mark(index, placed_op.op, placed_op.start, placed_op.end) {
            contests
                .entry(placed_op.op.mark_type.as_str())
                .or_default()
                .offer(placed_op.op);
        }
    }

    for mark_type in contests.keys() {
        if !schema.is_known(mark_type) {
            unknown.insert(*mark_type);
        }
    }

    schema
        .mark_types()
        .iter()
        .filter_map(|mark_type| {
            let winner = contests.get(mark_type.as_str())?.winner()?;
            let attrs = if mark_type == "link" {
                winner.attrs.clone()
            } else {
                None
            };
            Some(ResolvedMark {
                mark_type: mark_type.clone(),
                attrs,
            })
        })
        .collect()
}
