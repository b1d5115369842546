//! Shared helpers for the integration tests.

#![allow(dead_code)]

use crdt_richtext::{Document, DocumentConfig, ManualClock, MemoryLog};

/// A document plus the outbox and clock driving it.
pub struct Replica {
    pub doc: Document,
    pub outbox: MemoryLog,
    pub clock: ManualClock,
}

impl Replica {
    pub fn new(author: &str) -> Self {
        let outbox = MemoryLog::new();
        let clock = ManualClock::new(1_000);
        let doc = Document::new(DocumentConfig::new("shared", author))
            .with_clock(clock.clone())
            .with_log(outbox.clone());
        Replica { doc, outbox, clock }
    }
}

/// Delivers everything `from` produced since the last drain to each target.
pub fn deliver(from: &Replica, targets: &mut [&mut Replica]) {
    for update in from.outbox.drain() {
        for target in targets.iter_mut() {
            target.doc.apply_remote_update(&update).unwrap();
        }
    }
}

/// Exchanges pending updates between two replicas in both directions.
pub fn sync_pair(a: &mut Replica, b: &mut Replica) {
    let from_a = a.outbox.drain();
    let from_b = b.outbox.drain();
    for update in &from_a {
        b.doc.apply_remote_update(update).unwrap();
    }
    for update in &from_b {
        a.doc.apply_remote_update(update).unwrap();
    }
}

/// Text and rendered marks, for comparing replicas.
pub fn rendered(doc: &Document) -> String {
    serde_json::to_string(&doc.project()).unwrap()
}
