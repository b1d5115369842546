//! Per-author id generation.
//!
//! This module contains the OpIdSession, which mints strictly increasing
//! [`OpId`]s for one author inside one document store. Sessions replace any
//! process-wide counters: every document owns its own session.

use crate::crdt::types::clock::{Clock, SystemClock};
use crate::crdt::types::op_id::OpId;
use crate::crdt::types::replica::AuthorId;

/// Generates operation ids for a single author.
///
/// Timestamps come from the injected clock but never move backwards, and are
/// lifted above every remote id the session has observed. An id minted after
/// seeing another op therefore compares greater than it, which is what lets a
/// local insert land directly after its anchor.
pub struct OpIdSession {
    author_id: AuthorId,
    clock: Box<dyn Clock>,
    /// Lowest timestamp the next id may carry
    floor: i64,
    seq: u64,
}

impl OpIdSession {
    /// Creates a session backed by the system clock.
    pub fn new(author_id: impl Into<AuthorId>) -> Self {
        Self::with_clock(author_id, Box::new(SystemClock))
    }

    /// Creates a session backed by an explicit clock.
    pub fn with_clock(author_id: impl Into<AuthorId>, clock: Box<dyn Clock>) -> Self {
        OpIdSession {
            author_id: author_id.into(),
            clock,
            floor: i64::MIN,
            seq: 0,
        }
    }

    /// Mints the next id for this author.
    pub fn generate(&mut self) -> OpId {
        let timestamp = self.clock.now_millis().max(self.floor);
        let seq = self.seq;
        self.seq += 1;
        self.floor = timestamp;

        OpId::new(timestamp, seq, self.author_id.clone())
    }

    /// Lifts the timestamp floor above a received id (for causal ordering).
    pub fn observe(&mut self, id: &OpId) {
        if id.is_head() {
            return;
        }
        self.floor = self.floor.max(id.timestamp.saturating_add(1));
    }

    /// Restarts the sequence counter for a freshly reset document store.
    ///
    /// The timestamp floor moves past every id minted so far, so a restarted
    /// sequence can never reproduce an earlier id.
    pub fn reset(&mut self) {
        self.seq = 0;
        if self.floor != i64::MIN {
            self.floor = self.floor.saturating_add(1);
        }
    }

    /// Gets the author id
    pub fn author_id(&self) -> &str {
        &self.author_id
    }

    /// Gets the sequence number the next id will carry
    pub fn next_seq(&self) -> u64 {
        self.seq
    }
}
