//! Sequence CRDT over character entries.
//!
//! This module contains the CharacterStore, the replicated character sequence
//! of a document. Placement is a pure function of the anchor tree and the
//! [`OpId`] total order, never of arrival order or local array length, so
//! replicas that have exchanged the same entries hold the same sequence.
//!
//! # Placement
//!
//! Every entry records the anchor it was inserted after. The stored order is
//! the depth-first order of that anchor tree:
//!
//! - entries anchored to the root (`None`) are ordered ascending by OpId
//! - entries anchored to a character are ordered descending, newest first
//!
//! A permanent head sentinel with the minimum OpId sits at index 0. Anchoring
//! to it inserts at the start of the document.
//!
//! # Pending state
//!
//! Remote entries whose anchor is missing, and tombstones whose entry is
//! missing, are held until the referenced entry arrives. Nothing expires them:
//! if it never arrives they stay for the life of the store. Use
//! [`CharacterStore::parked_entries`] and [`CharacterStore::pending_tombstones`]
//! to watch for a transport that drops updates.

use std::collections::{HashMap, HashSet};

use tracing::{debug, warn};
use unicode_segmentation::UnicodeSegmentation;

use crate::crdt::entry::CharacterEntry;
use crate::crdt::types::{OpId, OpIdSession};

/// Result of integrating an entry into the store.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Integration {
    /// The entry (and any entries waiting on it) was placed
    Inserted,
    /// The entry was already known; only a tombstone flag may have merged
    Duplicate,
    /// The anchor has not arrived yet; the entry waits for it
    Parked,
}

/// The replicated character sequence of one document.
#[derive(Debug, Clone)]
pub struct CharacterStore {
    /// Tombstone-inclusive sequence; `entries[0]` is the head sentinel
    entries: Vec<CharacterEntry>,
    /// Remote entries waiting for their anchor, keyed by that anchor.
    /// Unbounded; drained only when the anchor arrives.
    parked: HashMap<OpId, Vec<CharacterEntry>>,
    /// Tombstones that arrived before their entry.
    /// Unbounded; drained only when the entry arrives.
    early_tombstones: HashSet<OpId>,
}

impl Default for CharacterStore {
    fn default() -> Self {
        Self::new()
    }
}

impl CharacterStore {
    /// Creates an empty store holding only the head sentinel.
    pub fn new() -> Self {
        CharacterStore {
            entries: vec![CharacterEntry::head()],
            parked: HashMap::new(),
            early_tombstones: HashSet::new(),
        }
    }

    /// Returns true if the store holds no characters (tombstones count as characters).
    pub fn is_empty(&self) -> bool {
        self.entries.len() == 1 && self.parked.is_empty()
    }

    /// Gets the id of the head sentinel.
    pub fn head_id(&self) -> OpId {
        OpId::head()
    }

    /// Inserts `value` after `anchor` using a freshly minted id.
    ///
    /// `None` anchors to the document root: the entry goes before the first
    /// root-level entry whose OpId compares greater than its own. An anchor that
    /// cannot be found degrades to an insert at the document start.
    pub fn insert_after(
        &mut self,
        session: &mut OpIdSession,
        anchor: Option<&OpId>,
        value: impl Into<String>,
    ) -> CharacterEntry {
        let origin = match anchor {
            Some(id) if self.index_of(id).is_none() => {
                warn!(anchor = %id, "insert anchor not found, inserting at document start");
                Some(OpId::head())
            }
            other => other.cloned(),
        };

        let entry = CharacterEntry::new(session.generate(), value, origin);
        self.place(entry.clone());
        entry
    }

    /// Inserts `text` grapheme by grapheme, each anchored to the previous one.
    ///
    /// Chaining keeps the run contiguous regardless of concurrent remote inserts
    /// at the same anchor.
    pub fn insert_text(
        &mut self,
        session: &mut OpIdSession,
        anchor: Option<&OpId>,
        text: &str,
    ) -> Vec<CharacterEntry> {
        let mut inserted: Vec<CharacterEntry> = Vec::new();

        for grapheme in text.graphemes(true) {
            let previous = inserted.last().map(|entry| entry.op_id.clone());
            let entry = match previous {
                Some(previous) => self.insert_after(session, Some(&previous), grapheme),
                None => self.insert_after(session, anchor, grapheme),
            };
            inserted.push(entry);
        }

        inserted
    }

    /// Tombstones every entry in the half-open visible range `[from, to)`.
    ///
    /// Returns the ids that flipped. Empty or out-of-range requests are no-ops.
    pub fn delete_visible_range(&mut self, from: usize, to: usize) -> Vec<OpId> {
        let visible = self.visible_len();
        if from >= to || from >= visible {
            debug!(from, to, visible, "delete range is empty or out of bounds");
            return Vec::new();
        }
        if to > visible {
            warn!(from, to, visible, "delete range clamped to document end");
        }
        let to = to.min(visible);

        let targets: Vec<usize> = self
            .entries
            .iter()
            .enumerate()
            .filter(|(_, entry)| entry.is_visible())
            .skip(from)
            .take(to - from)
            .map(|(index, _)| index)
            .collect();

        targets
            .into_iter()
            .filter_map(|index| {
                let entry = &mut self.entries[index];
                entry.tombstone().then(|| entry.op_id.clone())
            })
            .collect()
    }

    /// Tombstones a single entry by id.
    ///
    /// Returns `true` if a live entry flipped. A tombstone for an entry that
    /// has not arrived yet is remembered and applied when it does.
    pub fn apply_tombstone(&mut self, op_id: &OpId) -> bool {
        if op_id.is_head() {
            warn!("ignoring tombstone for head sentinel");
            return false;
        }
        if let Some(index) = self.index_of(op_id) {
            return self.entries[index].tombstone();
        }
        if let Some(entry) = self
            .parked
            .values_mut()
            .flatten()
            .find(|entry| &entry.op_id == op_id)
        {
            return entry.tombstone();
        }

        debug!(op_id = %op_id, "tombstone arrived before its entry");
        self.early_tombstones.insert(op_id.clone());
        false
    }

    /// Integrates an entry received from another replica.
    ///
    /// Idempotent: a known entry only merges its tombstone flag.
    pub fn integrate(&mut self, entry: CharacterEntry) -> Integration {
        if entry.is_head() {
            return Integration::Duplicate;
        }
        if self.contains(&entry.op_id) {
            if entry.deleted {
                self.apply_tombstone(&entry.op_id);
            }
            return Integration::Duplicate;
        }

        let missing_anchor = entry
            .origin
            .as_ref()
            .filter(|anchor| self.index_of(anchor).is_none())
            .cloned();

        match missing_anchor {
            Some(anchor) => {
                debug!(op_id = %entry.op_id, anchor = %anchor, "parking entry until its anchor arrives");
                self.parked.entry(anchor).or_default().push(entry);
                Integration::Parked
            }
            None => {
                self.place(entry);
                Integration::Inserted
            }
        }
    }

    /// Places an entry whose anchor is present, then releases anything parked on it.
    fn place(&mut self, entry: CharacterEntry) {
        let mut pending = vec![entry];

        while let Some(mut entry) = pending.pop() {
            if self.early_tombstones.remove(&entry.op_id) {
                entry.deleted = true;
            }
            let index = self.insertion_index(&entry);
            let op_id = entry.op_id.clone();
            self.entries.insert(index, entry);

            if let Some(children) = self.parked.remove(&op_id) {
                pending.extend(children);
            }
        }
    }

    /// Finds where `entry` belongs by scanning its anchor's subtree.
    fn insertion_index(&self, entry: &CharacterEntry) -> usize {
        let anchor = entry.origin.as_ref();
        let mut index = match anchor {
            Some(anchor) => self.index_of(anchor).map_or(1, |i| i + 1),
            None => 0,
        };
        // Ids of the subtree members skipped so far
        let mut skipped: HashSet<&OpId> = HashSet::new();

        while let Some(current) = self.entries.get(index) {
            let parent = current.origin.as_ref();
            if parent == anchor {
                let sibling_first = match anchor {
                    None => current.op_id < entry.op_id,
                    Some(_) => current.op_id > entry.op_id,
                };
                if !sibling_first {
                    break;
                }
            } else if !parent.is_some_and(|p| skipped.contains(p)) {
                break;
            }
            skipped.insert(&current.op_id);
            index += 1;
        }

        index
    }

    /// Returns true if the entry is placed or parked.
    pub fn contains(&self, op_id: &OpId) -> bool {
        self.index_of(op_id).is_some()
            || self
                .parked
                .values()
                .flatten()
                .any(|entry| &entry.op_id == op_id)
    }

    /// Gets the tombstone-inclusive index of an entry (the head sentinel is 0).
    pub fn index_of(&self, op_id: &OpId) -> Option<usize> {
        self.entries.iter().position(|entry| &entry.op_id == op_id)
    }

    /// Maps every placed entry to its tombstone-inclusive index.
    pub fn positions(&self) -> HashMap<&OpId, usize> {
        self.entries
            .iter()
            .enumerate()
            .map(|(index, entry)| (&entry.op_id, index))
            .collect()
    }

    /// Gets a placed entry by id.
    pub fn get(&self, op_id: &OpId) -> Option<&CharacterEntry> {
        self.index_of(op_id).map(|index| &self.entries[index])
    }

    /// Maps a visible index to the id of the character at that position.
    pub fn visible_index_to_op_id(&self, index: usize) -> Option<OpId> {
        self.visible_entries()
            .nth(index)
            .map(|entry| entry.op_id.clone())
    }

    /// Maps a half-open visible range to the ids of its first and last character.
    ///
    /// `to` is exclusive, so the end id is the character at `to - 1`.
    pub fn visible_range_to_op_ids(&self, from: usize, to: usize) -> Option<(OpId, OpId)> {
        if from >= to {
            return None;
        }
        let start = self.visible_index_to_op_id(from)?;
        let end = self.visible_index_to_op_id(to - 1)?;
        Some((start, end))
    }

    /// All placed entries in order, excluding the head sentinel but including tombstones.
    pub fn entries(&self) -> &[CharacterEntry] {
        &self.entries[1..]
    }

    /// Entries still waiting for their anchor.
    pub fn parked_entries(&self) -> impl Iterator<Item = &CharacterEntry> {
        self.parked.values().flatten()
    }

    /// Number of tombstones still waiting for their entry.
    pub fn pending_tombstones(&self) -> usize {
        self.early_tombstones.len()
    }

    /// Iterates visible entries in document order.
    pub fn visible_entries(&self) -> impl Iterator<Item = &CharacterEntry> {
        self.entries.iter().filter(|entry| entry.is_visible())
    }

    /// Gets the number of visible characters.
    pub fn visible_len(&self) -> usize {
        self.visible_entries().count()
    }

    /// Gets the number of placed entries (excluding the head sentinel).
    pub fn total_len(&self) -> usize {
        self.entries.len() - 1
    }

    /// Returns the current visible content as a String.
    pub fn visible_text(&self) -> String {
        self.visible_entries()
            .map(|entry| entry.value.as_str())
            .collect()
    }
}
