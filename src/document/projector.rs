//! Renders resolved CRDT state as a [`DocumentTree`].

use crate::crdt::format::{FormatLog, MarkSchema, resolve_marks};
use crate::crdt::store::CharacterStore;
use crate::document::tree::{DocumentTree, Paragraph, TextLeaf};

/// Projects every visible character with its resolved marks.
///
/// Adjacent characters with identical mark sets share a leaf. Cost is
/// O(characters x format ops).
pub fn project(store: &CharacterStore, log: &FormatLog, schema: &MarkSchema) -> DocumentTree {
    let marks = resolve_marks(store, log, schema);
    let mut leaves: Vec<TextLeaf> = Vec::new();

    for (entry, marks) in store.visible_entries().zip(marks) {
        match leaves.last_mut() {
            Some(leaf) if leaf.marks == marks => leaf.text.push_str(&entry.value),
            _ => leaves.push(TextLeaf {
                text: entry.value.clone(),
                marks,
            }),
        }
    }

    DocumentTree {
        content: vec![Paragraph { content: leaves }],
    }
}
