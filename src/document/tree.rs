//! The tree shape handed to the rendering surface.
//!
//! `doc > paragraph > text*`, serialized as
//! `{"type":"doc","content":[{"type":"paragraph","content":[{"type":"text","text":..,"marks":[..]}]}]}`.

use serde::Serialize;

use crate::crdt::format::ResolvedMark;

/// Root of a projected document.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(tag = "type", rename = "doc")]
pub struct DocumentTree {
    pub content: Vec<Paragraph>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(tag = "type", rename = "paragraph")]
pub struct Paragraph {
    pub content: Vec<TextLeaf>,
}

/// A run of text sharing one mark set.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename = "text")]
pub struct TextLeaf {
    pub text: String,
    pub marks: Vec<ResolvedMark>,
}

impl DocumentTree {
    /// Concatenated text of every leaf.
    pub fn plain_text(&self) -> String {
        self.leaves().map(|leaf| leaf.text.as_str()).collect()
    }

    /// Iterates every text leaf in document order.
    pub fn leaves(&self) -> impl Iterator<Item = &TextLeaf> {
        self.content
            .iter()
            .flat_map(|paragraph| paragraph.content.iter())
    }
}

impl TextLeaf {
    pub fn has_mark(&self, mark_type: &str) -> bool {
        self.marks.iter().any(|mark| mark.mark_type == mark_type)
    }
}
