//! Maps editor transactions onto the document's mutation surface.
//!
//! The editing surface speaks visible coordinates: positions that count only
//! characters still shown. Each step is resolved to character ids against the
//! state left by the previous step, then applied through [`Document`].
//!
//! Not re-entrant: remote updates must not be applied while a transaction is
//! being translated.

use serde::{Deserialize, Serialize};
use tracing::warn;
use unicode_segmentation::UnicodeSegmentation;

use crate::crdt::format::{BoundaryKind, MarkAttrs};
use crate::crdt::types::OpId;
use crate::document::Document;

/// One edit expressed in visible coordinates.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum EditorStep {
    /// Insert `text` so that its first grapheme ends up at visible `pos`
    InsertText { pos: usize, text: String },
    /// Delete the visible range `[from, to)`
    Delete { from: usize, to: usize },
    /// Apply a mark over the visible range `[from, to)`
    #[serde(rename_all = "camelCase")]
    AddMark {
        from: usize,
        to: usize,
        mark_type: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        attrs: Option<MarkAttrs>,
    },
    /// Clear a mark over the visible range `[from, to)`
    #[serde(rename_all = "camelCase")]
    RemoveMark {
        from: usize,
        to: usize,
        mark_type: String,
    },
}

/// An ordered batch of editor steps.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Transaction {
    pub steps: Vec<EditorStep>,
}

impl Transaction {
    pub fn new(steps: Vec<EditorStep>) -> Self {
        Transaction { steps }
    }
}

/// A visible range resolved to format boundaries.
struct MarkRange {
    start: OpId,
    end: OpId,
    end_kind: BoundaryKind,
}

impl Document {
    /// Applies every step of `transaction` in order.
    pub fn apply_transaction(&mut self, transaction: &Transaction) {
        for step in &transaction.steps {
            self.apply_step(step);
        }
    }

    /// Applies a single editor step.
    pub fn apply_step(&mut self, step: &EditorStep) {
        match step {
            EditorStep::InsertText { pos, text } => self.translate_insert(*pos, text),
            EditorStep::Delete { from, to } => {
                self.delete_range(*from, *to);
            }
            EditorStep::AddMark {
                from,
                to,
                mark_type,
                attrs,
            } => {
                if let Some(range) = self.mark_range(*from, *to) {
                    self.add_mark(
                        range.start,
                        range.end,
                        mark_type,
                        range.end_kind,
                        attrs.clone(),
                    );
                }
            }
            EditorStep::RemoveMark {
                from,
                to,
                mark_type,
            } => {
                if let Some(range) = self.mark_range(*from, *to) {
                    self.remove_mark(range.start, range.end, mark_type, range.end_kind);
                }
            }
        }
    }

    fn translate_insert(&mut self, pos: usize, text: &str) {
        let visible = self.visible_len();
        if pos > visible {
            warn!(pos, visible, "insert position past document end, appending");
        }
        let pos = pos.min(visible);

        let anchor = if pos == 0 {
            Some(self.store().head_id())
        } else {
            self.store().visible_index_to_op_id(pos - 1)
        };

        let mut graphemes = text.graphemes(true);
        match (graphemes.next(), graphemes.next()) {
            (None, _) => {}
            (Some(grapheme), None) => {
                self.insert_char(anchor.as_ref(), grapheme);
            }
            _ => {
                self.insert_text(anchor.as_ref(), text);
            }
        }
    }

    /// Resolves `[from, to)` to boundary ids.
    ///
    /// A range ending at the document end closes `After` its last character.
    /// Anywhere else it closes `Before` the character following the range,
    /// which covers the same characters at the time of the edit.
    fn mark_range(&self, from: usize, to: usize) -> Option<MarkRange> {
        let visible = self.visible_len();
        if from >= to || from >= visible {
            warn!(from, to, visible, "mark range is empty or out of bounds");
            return None;
        }
        let to = to.min(visible);

        let (start, last) = self.store().visible_range_to_op_ids(from, to)?;
        if to == visible {
            return Some(MarkRange {
                start,
                end: last,
                end_kind: BoundaryKind::After,
            });
        }

        let next = self.store().visible_index_to_op_id(to)?;
        Some(MarkRange {
            start,
            end: next,
            end_kind: BoundaryKind::Before,
        })
    }
}
