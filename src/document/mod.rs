//! A replicated rich-text document.
//!
//! [`Document`] ties one replica's id session, character store and format log
//! to its collaborators: the [`ReplicatedLog`] that carries local updates out,
//! and the [`InitialStateSource`] consulted once when the document starts empty.
//!
//! # Mutation surface
//!
//! State changes only through `insert_char`, `insert_text`, `delete_range`,
//! `add_mark`, `remove_mark` (local edits) and `apply_remote_update`,
//! `load_state`, `run_scheduled_bootstrap`/`complete_bootstrap` (state from
//! collaborators). Each local edit is published as one update per character
//! insertion, tombstone flip or format-op append.

pub mod projector;
pub mod translator;
pub mod tree;

use std::cell::Cell;
use std::sync::Arc;

use tracing::{debug, error, info, warn};
use unicode_segmentation::UnicodeSegmentation;

use crate::config::DocumentConfig;
use crate::crdt::format::{BoundaryKind, FormatLog, FormatOp, MarkAttrs, MarkSchema};
use crate::crdt::store::CharacterStore;
use crate::crdt::types::{Clock, OpId, OpIdSession, SystemClock};
use crate::error::{CodecResult, PersistenceError};
use crate::persistence::{InitialStateSource, NoInitialState};
use crate::replication::{NullLog, ReplicatedLog, StateSnapshot, Update};

pub use translator::{EditorStep, Transaction};
pub use tree::{DocumentTree, Paragraph, TextLeaf};

/// Progress of the one-time bootstrap fetch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Bootstrap {
    /// Waiting for a projection of an empty document
    Armed,
    /// A projection saw an empty document; the fetch should run
    Scheduled,
    /// Already ran (or no longer applicable) for this store
    Done,
}

/// One replica of a rich-text document.
pub struct Document {
    config: DocumentConfig,
    session: OpIdSession,
    store: CharacterStore,
    formats: FormatLog,
    log: Box<dyn ReplicatedLog>,
    source: Arc<dyn InitialStateSource>,
    bootstrap: Cell<Bootstrap>,
}

impl Document {
    /// Creates an empty document using the system clock, no transport and no
    /// stored state.
    pub fn new(config: DocumentConfig) -> Self {
        let session = OpIdSession::with_clock(config.author_id.clone(), Box::new(SystemClock));
        Document {
            config,
            session,
            store: CharacterStore::new(),
            formats: FormatLog::new(),
            log: Box::new(NullLog),
            source: Arc::new(NoInitialState),
            bootstrap: Cell::new(Bootstrap::Armed),
        }
    }

    /// Replaces the clock used to mint ids.
    pub fn with_clock(mut self, clock: impl Clock + 'static) -> Self {
        self.session = OpIdSession::with_clock(self.config.author_id.clone(), Box::new(clock));
        self
    }

    /// Sets the log local updates are appended to.
    pub fn with_log(mut self, log: impl ReplicatedLog + 'static) -> Self {
        self.log = Box::new(log);
        self
    }

    /// Sets the source consulted by the bootstrap fetch.
    pub fn with_source(mut self, source: impl InitialStateSource + 'static) -> Self {
        self.source = Arc::new(source);
        self
    }

    pub fn document_id(&self) -> &str {
        &self.config.document_id
    }

    pub fn author_id(&self) -> &str {
        self.session.author_id()
    }

    pub fn schema(&self) -> &MarkSchema {
        &self.config.schema
    }

    /// Read-only view of the character store.
    pub fn store(&self) -> &CharacterStore {
        &self.store
    }

    /// Read-only view of the format log.
    pub fn formats(&self) -> &FormatLog {
        &self.formats
    }

    /// The visible text.
    pub fn text(&self) -> String {
        self.store.visible_text()
    }

    pub fn visible_len(&self) -> usize {
        self.store.visible_len()
    }

    /// Inserts one grapheme after `anchor` and returns its id.
    ///
    /// Anything other than exactly one grapheme is rejected; use
    /// [`insert_text`](Document::insert_text) for runs.
    pub fn insert_char(&mut self, anchor: Option<&OpId>, value: &str) -> Option<OpId> {
        if value.graphemes(true).count() != 1 {
            warn!(value, "insert_char expects exactly one grapheme, ignoring");
            return None;
        }
        let entry = self.store.insert_after(&mut self.session, anchor, value);
        let op_id = entry.op_id.clone();
        self.publish(Update::Insert { entry });
        Some(op_id)
    }

    /// Inserts a run of text after `anchor` and returns the new ids in order.
    pub fn insert_text(&mut self, anchor: Option<&OpId>, text: &str) -> Vec<OpId> {
        let entries = self.store.insert_text(&mut self.session, anchor, text);
        entries
            .into_iter()
            .map(|entry| {
                let op_id = entry.op_id.clone();
                self.publish(Update::Insert { entry });
                op_id
            })
            .collect()
    }

    /// Tombstones the visible range `[from, to)`; returns how many characters flipped.
    pub fn delete_range(&mut self, from: usize, to: usize) -> usize {
        let deleted = self.store.delete_visible_range(from, to);
        let count = deleted.len();
        for op_id in deleted {
            self.publish(Update::Delete { op_id });
        }
        count
    }

    /// Adds `mark_type` over `[start_id, end_id]`.
    ///
    /// Returns `None` (and records nothing) if either boundary character is unknown.
    pub fn add_mark(
        &mut self,
        start_id: OpId,
        end_id: OpId,
        mark_type: &str,
        end_kind: BoundaryKind,
        attrs: Option<MarkAttrs>,
    ) -> Option<OpId> {
        if !self.boundaries_known(&start_id, &end_id) {
            return None;
        }
        let op = self.formats.add_mark(
            &mut self.session,
            start_id,
            end_id,
            mark_type,
            end_kind,
            attrs,
        );
        Some(self.publish_format(op))
    }

    /// Removes `mark_type` over `[start_id, end_id]`.
    ///
    /// Returns `None` (and records nothing) if either boundary character is unknown.
    pub fn remove_mark(
        &mut self,
        start_id: OpId,
        end_id: OpId,
        mark_type: &str,
        end_kind: BoundaryKind,
    ) -> Option<OpId> {
        if !self.boundaries_known(&start_id, &end_id) {
            return None;
        }
        let op = self
            .formats
            .remove_mark(&mut self.session, start_id, end_id, mark_type, end_kind);
        Some(self.publish_format(op))
    }

    fn boundaries_known(&self, start_id: &OpId, end_id: &OpId) -> bool {
        for id in [start_id, end_id] {
            if id.is_head() || self.store.index_of(id).is_none() {
                warn!(boundary = %id, "format boundary not found, skipping format op");
                return false;
            }
        }
        true
    }

    fn publish_format(&mut self, op: FormatOp) -> OpId {
        let op_id = op.op_id.clone();
        self.publish(Update::Format { op });
        op_id
    }

    fn publish(&mut self, update: Update) {
        match update.encode() {
            Ok(bytes) => self.log.append(&bytes),
            Err(err) => error!("Failed to encode update: {}", err),
        }
    }

    /// Applies one update received from the transport.
    ///
    /// Re-applying an update is a no-op. Only undecodable bytes are an error.
    pub fn apply_remote_update(&mut self, bytes: &[u8]) -> CodecResult<()> {
        let update = Update::decode(bytes)?;
        self.apply_update(update);
        Ok(())
    }

    fn apply_update(&mut self, update: Update) {
        match update {
            Update::Insert { entry } => {
                self.session.observe(&entry.op_id);
                self.store.integrate(entry);
            }
            Update::Delete { op_id } => {
                if !self.store.apply_tombstone(&op_id) {
                    debug!(op_id = %op_id, "tombstone already applied or pending");
                }
            }
            Update::Format { op } => {
                self.session.observe(&op.op_id);
                self.formats.append(op);
            }
            Update::State { snapshot } => self.merge_snapshot(snapshot),
        }
    }

    /// Encodes the full replica state.
    pub fn encode_state(&self) -> CodecResult<Vec<u8>> {
        self.snapshot().encode()
    }

    /// Encodes the full replica state as an [`Update::State`], for transports
    /// that carry state and incremental updates on one channel.
    pub fn encode_state_update(&self) -> CodecResult<Vec<u8>> {
        Update::State {
            snapshot: self.snapshot(),
        }
        .encode()
    }

    /// Full replica state, characters in store order.
    pub fn snapshot(&self) -> StateSnapshot {
        StateSnapshot {
            characters: self
                .store
                .entries()
                .iter()
                .chain(self.store.parked_entries())
                .cloned()
                .collect(),
            format_ops: self.formats.ops().to_vec(),
        }
    }

    /// Merges an encoded state into this replica.
    ///
    /// Merging is commutative and idempotent; nothing local is discarded.
    pub fn load_state(&mut self, bytes: &[u8]) -> CodecResult<()> {
        let snapshot = StateSnapshot::decode(bytes)?;
        self.merge_snapshot(snapshot);
        Ok(())
    }

    fn merge_snapshot(&mut self, snapshot: StateSnapshot) {
        for entry in snapshot.characters {
            self.apply_update(Update::Insert { entry });
        }
        for op in snapshot.format_ops {
            self.apply_update(Update::Format { op });
        }
    }

    /// Renders the current state.
    ///
    /// If both the store and the format log are empty and the bootstrap has not
    /// run yet, this schedules it; call [`run_scheduled_bootstrap`] once the
    /// projection has been handed off.
    ///
    /// [`run_scheduled_bootstrap`]: Document::run_scheduled_bootstrap
    pub fn project(&self) -> DocumentTree {
        if self.bootstrap.get() == Bootstrap::Armed
            && self.store.is_empty()
            && self.formats.is_empty()
        {
            debug!(document = %self.config.document_id, "scheduling bootstrap fetch");
            self.bootstrap.set(Bootstrap::Scheduled);
        }
        projector::project(&self.store, &self.formats, &self.config.schema)
    }

    /// Returns true if a projection scheduled the bootstrap fetch.
    pub fn bootstrap_scheduled(&self) -> bool {
        self.bootstrap.get() == Bootstrap::Scheduled
    }

    /// Runs the bootstrap fetch if a projection scheduled it.
    ///
    /// The stored state is only written if the document is still empty, so
    /// state that arrived from the transport in the meantime is never
    /// clobbered. Returns whether stored state was loaded.
    pub fn run_scheduled_bootstrap(&mut self) -> Result<bool, PersistenceError> {
        let Some(fetch) = self.take_scheduled_bootstrap() else {
            return Ok(false);
        };
        let snapshot = fetch.fetch()?;
        Ok(self.complete_bootstrap(snapshot))
    }

    /// Claims a scheduled bootstrap so it can be fetched off this task.
    ///
    /// Returns `None` unless a projection scheduled one. Hand the result of
    /// [`BootstrapFetch::fetch`] to [`complete_bootstrap`](Document::complete_bootstrap).
    pub fn take_scheduled_bootstrap(&self) -> Option<BootstrapFetch> {
        if self.bootstrap.get() != Bootstrap::Scheduled {
            return None;
        }
        self.bootstrap.set(Bootstrap::Done);
        Some(BootstrapFetch {
            source: Arc::clone(&self.source),
            document_id: self.config.document_id.clone(),
        })
    }

    /// Merges fetched stored state if the document is still empty.
    ///
    /// Loaded state is published as one [`Update::State`] so replicas that
    /// synced before the fetch see it too. Returns whether state was loaded.
    pub fn complete_bootstrap(&mut self, snapshot: Option<StateSnapshot>) -> bool {
        let Some(snapshot) = snapshot else {
            return false;
        };
        if !self.store.is_empty() || !self.formats.is_empty() {
            debug!(document = %self.config.document_id, "state arrived before bootstrap, skipping");
            return false;
        }

        info!(
            document = %self.config.document_id,
            characters = snapshot.characters.len(),
            format_ops = snapshot.format_ops.len(),
            "loaded initial state"
        );
        self.merge_snapshot(snapshot.clone());
        self.publish(Update::State { snapshot });
        true
    }

    /// Drops all state and starts a fresh store and id session.
    pub fn reset(&mut self) {
        self.store = CharacterStore::new();
        self.formats = FormatLog::new();
        self.session.reset();
        self.bootstrap.set(Bootstrap::Armed);
    }
}

/// A claimed bootstrap fetch, detached from the document that scheduled it.
pub struct BootstrapFetch {
    source: Arc<dyn InitialStateSource>,
    document_id: String,
}

impl BootstrapFetch {
    pub fn document_id(&self) -> &str {
        &self.document_id
    }

    /// Reads the stored state. May block on I/O.
    pub fn fetch(&self) -> Result<Option<StateSnapshot>, PersistenceError> {
        self.source.fetch_initial_state(&self.document_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crdt::types::ManualClock;
    use crate::replication::MemoryLog;

    fn document(author: &str) -> (Document, MemoryLog) {
        let log = MemoryLog::new();
        let doc = Document::new(DocumentConfig::new("doc", author))
            .with_clock(ManualClock::new(1_000))
            .with_log(log.clone());
        (doc, log)
    }

    struct FixedSource(StateSnapshot);

    impl InitialStateSource for FixedSource {
        fn fetch_initial_state(
            &self,
            _document_id: &str,
        ) -> Result<Option<StateSnapshot>, PersistenceError> {
            Ok(Some(self.0.clone()))
        }
    }

    #[test]
    fn test_each_mutation_is_published() {
        let (mut doc, log) = document("alice");

        let ids = doc.insert_text(None, "abc");
        assert_eq!(log.pending(), 3);

        doc.delete_range(1, 2);
        doc.add_mark(ids[0].clone(), ids[2].clone(), "bold", BoundaryKind::After, None);
        let updates: Vec<Update> = log
            .drain()
            .iter()
            .map(|bytes| Update::decode(bytes).unwrap())
            .collect();

        assert_eq!(updates.len(), 5);
        assert!(matches!(updates[3], Update::Delete { .. }));
        assert!(matches!(updates[4], Update::Format { .. }));
    }

    #[test]
    fn test_remote_updates_replay_and_dedupe() {
        let (mut alice, alice_log) = document("alice");
        let (mut bob, _) = document("bob");

        alice.insert_text(None, "hi");
        let updates = alice_log.drain();
        for bytes in updates.iter().chain(updates.iter()) {
            bob.apply_remote_update(bytes).unwrap();
        }

        assert_eq!(bob.text(), "hi");
        assert_eq!(bob.store().total_len(), 2);
    }

    #[test]
    fn test_mark_with_unknown_boundary_is_skipped() {
        let (mut doc, log) = document("alice");
        let ids = doc.insert_text(None, "x");
        log.drain();

        let ghost = OpId::new(1, 1, "ghost");
        assert!(doc.add_mark(ids[0].clone(), ghost.clone(), "bold", BoundaryKind::After, None).is_none());
        assert!(doc.remove_mark(ghost, ids[0].clone(), "bold", BoundaryKind::Before).is_none());
        assert!(doc.formats().is_empty());
        assert_eq!(log.pending(), 0);
    }

    #[test]
    fn test_malformed_update_is_an_error() {
        let (mut doc, _) = document("alice");
        assert!(doc.apply_remote_update(b"\x00\x01").is_err());
        assert_eq!(doc.text(), "");
    }

    #[test]
    fn test_state_round_trip_merges() {
        let (mut alice, _) = document("alice");
        let ids = alice.insert_text(None, "hello");
        alice.delete_range(0, 1);
        alice.add_mark(ids[1].clone(), ids[4].clone(), "italic", BoundaryKind::After, None);

        let (mut bob, _) = document("bob");
        bob.load_state(&alice.encode_state().unwrap()).unwrap();
        bob.load_state(&alice.encode_state().unwrap()).unwrap();

        assert_eq!(bob.text(), "ello");
        assert_eq!(bob.project(), alice.project());
        assert_eq!(bob.snapshot(), alice.snapshot());
    }

    #[test]
    fn test_bootstrap_runs_once_after_empty_projection() {
        let (mut seed, _) = document("seed");
        seed.insert_text(None, "stored");

        let (doc, _) = document("alice");
        let mut doc = doc.with_source(FixedSource(seed.snapshot()));

        // Nothing scheduled until a projection sees the empty document
        assert!(!doc.run_scheduled_bootstrap().unwrap());

        let tree = doc.project();
        assert_eq!(tree.plain_text(), "");
        assert!(doc.bootstrap_scheduled());

        assert!(doc.run_scheduled_bootstrap().unwrap());
        assert_eq!(doc.text(), "stored");

        doc.project();
        assert!(!doc.bootstrap_scheduled());
        assert!(!doc.run_scheduled_bootstrap().unwrap());
    }

    #[test]
    fn test_bootstrap_does_not_clobber_concurrent_state() {
        let (mut seed, _) = document("seed");
        seed.insert_text(None, "stale");

        let (mut remote, remote_log) = document("remote");
        remote.insert_text(None, "live");

        let (doc, _) = document("alice");
        let mut doc = doc.with_source(FixedSource(seed.snapshot()));
        doc.project();

        // Transport delivers before the scheduled fetch runs
        for bytes in remote_log.drain() {
            doc.apply_remote_update(&bytes).unwrap();
        }

        assert!(!doc.run_scheduled_bootstrap().unwrap());
        assert_eq!(doc.text(), "live");
    }

    #[test]
    fn test_bootstrap_publishes_loaded_state() {
        let (mut seed, _) = document("seed");
        seed.insert_text(None, "stored");

        let (doc, log) = document("alice");
        let mut doc = doc.with_source(FixedSource(seed.snapshot()));
        let (mut early, _) = document("early");
        early.load_state(&doc.encode_state().unwrap()).unwrap();

        doc.project();
        assert!(doc.run_scheduled_bootstrap().unwrap());

        let published = log.drain();
        assert_eq!(published.len(), 1);
        assert!(matches!(
            Update::decode(&published[0]).unwrap(),
            Update::State { .. }
        ));

        early.apply_remote_update(&published[0]).unwrap();
        assert_eq!(early.text(), "stored");
    }

    #[test]
    fn test_detached_bootstrap_fetch() {
        let (mut seed, _) = document("seed");
        seed.insert_text(None, "stored");

        let (doc, _) = document("alice");
        let mut doc = doc.with_source(FixedSource(seed.snapshot()));
        assert!(doc.take_scheduled_bootstrap().is_none());

        doc.project();
        let fetch = doc.take_scheduled_bootstrap().unwrap();
        assert_eq!(fetch.document_id(), "doc");
        assert!(doc.take_scheduled_bootstrap().is_none());

        let snapshot = fetch.fetch().unwrap();
        assert!(doc.complete_bootstrap(snapshot));
        assert_eq!(doc.text(), "stored");
    }

    #[test]
    fn test_state_update_frame_merges_into_peer() {
        let (mut alice, _) = document("alice");
        let ids = alice.insert_text(None, "frame");
        alice.add_mark(ids[0].clone(), ids[1].clone(), "bold", BoundaryKind::After, None);

        let (mut bob, _) = document("bob");
        let frame = alice.encode_state_update().unwrap();
        bob.apply_remote_update(&frame).unwrap();
        bob.apply_remote_update(&frame).unwrap();

        assert_eq!(bob.project(), alice.project());
    }

    #[test]
    fn test_insert_char_requires_one_grapheme() {
        let (mut doc, log) = document("alice");

        assert!(doc.insert_char(None, "").is_none());
        assert!(doc.insert_char(None, "ab").is_none());
        assert_eq!(log.pending(), 0);

        assert!(doc.insert_char(None, "e\u{301}").is_some());
        assert!(doc.insert_char(None, "👩‍👩‍👧").is_some());
        assert_eq!(doc.visible_len(), 2);
    }

    #[test]
    fn test_reset_rearms_bootstrap() {
        let (mut doc, _) = document("alice");
        doc.insert_text(None, "abc");
        doc.project();
        assert!(!doc.bootstrap_scheduled());

        doc.reset();
        assert_eq!(doc.text(), "");
        assert!(doc.formats().is_empty());

        doc.project();
        assert!(doc.bootstrap_scheduled());
    }
}
