//! Format operations and their character boundaries.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::crdt::types::OpId;

/// Attributes carried by a mark (for example a link's `href`).
pub type MarkAttrs = BTreeMap<String, serde_json::Value>;

/// Whether a format operation applies or clears a mark.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum MarkAction {
    AddMark,
    RemoveMark,
}

/// Which side of the referenced character a boundary sits on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum BoundaryKind {
    /// Just before the character: inclusive at a start, exclusive at an end
    Before,
    /// Just after the character: exclusive at a start, inclusive at an end
    After,
}

/// One end of a format range, anchored to a character id.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Boundary {
    pub kind: BoundaryKind,
    pub char_op_id: OpId,
}

impl Boundary {
    pub fn before(char_op_id: OpId) -> Self {
        Boundary {
            kind: BoundaryKind::Before,
            char_op_id,
        }
    }

    pub fn after(char_op_id: OpId) -> Self {
        Boundary {
            kind: BoundaryKind::After,
            char_op_id,
        }
    }
}

/// An immutable mark operation over a range of characters.
///
/// Format ops are only ever appended; a mark is cleared by appending a
/// `RemoveMark`, never by editing or dropping an earlier op.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FormatOp {
    pub op_id: OpId,
    pub action: MarkAction,
    pub mark_type: String,
    pub start: Boundary,
    pub end: Boundary,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub attrs: Option<MarkAttrs>,
    pub timestamp: i64,
}

impl FormatOp {
    pub fn is_add(&self) -> bool {
        self.action == MarkAction::AddMark
    }
}
