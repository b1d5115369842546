//! Character entries stored by the sequence CRDT.
//!
//! This module contains the CharacterEntry struct which represents one grapheme
//! in the replicated sequence, together with the head sentinel that anchors
//! inserts at the very start of a document.

use serde::{Deserialize, Serialize};

use crate::crdt::types::{AuthorId, OpId};

/// Represents a single grapheme within the character store.
///
/// Each entry contains:
/// - A unique identifier, minted once at insert time
/// - The grapheme it carries
/// - The anchor it was inserted after (its place in the anchor tree)
/// - A deletion flag that acts as a tombstone
///
/// # Tombstone Deletion
///
/// Entries are never physically removed. The only mutation ever allowed is
/// `deleted: false -> true`, which is idempotent, so every replica can keep
/// resolving operations that reference a deleted character.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CharacterEntry {
    pub op_id: OpId,
    pub value: String,
    pub deleted: bool,
    pub author_id: AuthorId,
    /// `None` for entries anchored to the document root
    #[serde(default)]
    pub origin: Option<OpId>,
}

impl CharacterEntry {
    /// Creates a live entry.
    pub fn new(op_id: OpId, value: impl Into<String>, origin: Option<OpId>) -> Self {
        let author_id = op_id.author_id.clone();
        CharacterEntry {
            op_id,
            value: value.into(),
            deleted: false,
            author_id,
            origin,
        }
    }

    /// Creates the head sentinel entry.
    ///
    /// It carries the minimum [`OpId`], is anchored to the root, and is never
    /// visible.
    pub fn head() -> Self {
        CharacterEntry {
            op_id: OpId::head(),
            value: String::new(),
            deleted: false,
            author_id: AuthorId::new(),
            origin: None,
        }
    }

    /// Returns true if this entry is the head sentinel.
    pub fn is_head(&self) -> bool {
        self.op_id.is_head()
    }

    /// Returns true if this entry is visible (not deleted and not the sentinel).
    pub fn is_visible(&self) -> bool {
        !self.deleted && !self.is_head()
    }

    /// Marks this entry as deleted.
    ///
    /// Returns `true` if the flag flipped, `false` if it was already a
    /// tombstone or is the head sentinel.
    pub fn tombstone(&mut self) -> bool {
        if self.is_head() || self.deleted {
            false
        } else {
            self.deleted = true;
            true
        }
    }
}
