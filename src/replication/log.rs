//! The seam between the CRDT and whatever engine disseminates updates.
//!
//! A document appends the encoded bytes of every local mutation to its
//! [`ReplicatedLog`]; delivery, batching and retry belong to the
//! implementation. Remote bytes come back in through
//! `Document::apply_remote_update`.

use std::sync::Arc;

use parking_lot::Mutex;

/// Sink for locally produced updates.
pub trait ReplicatedLog: Send {
    /// Records one encoded [`Update`](super::Update).
    fn append(&mut self, update: &[u8]);
}

/// A log that drops everything (for single-replica use).
#[derive(Debug, Clone, Copy, Default)]
pub struct NullLog;

impl ReplicatedLog for NullLog {
    fn append(&mut self, _update: &[u8]) {}
}

/// An in-memory outbox.
///
/// Clones share the same buffer: hand one clone to a document and keep another
/// to drain what it produced and deliver it to other replicas.
#[derive(Debug, Clone, Default)]
pub struct MemoryLog {
    outbox: Arc<Mutex<Vec<Vec<u8>>>>,
}

impl MemoryLog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Takes every update appended since the last drain.
    pub fn drain(&self) -> Vec<Vec<u8>> {
        std::mem::take(&mut *self.outbox.lock())
    }

    /// Number of updates waiting to be drained.
    pub fn pending(&self) -> usize {
        self.outbox.lock().len()
    }
}

impl ReplicatedLog for MemoryLog {
    fn append(&mut self, update: &[u8]) {
        self.outbox.lock().push(update.to_vec());
    }
}
