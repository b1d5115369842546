//! Integration tests for the replicated rich-text core.
//!
//! These tests verify convergence, idempotence and mark resolution across
//! replicas exchanging updates through the transport seam.

mod common;

use common::{Replica, deliver, rendered, sync_pair};
use crdt_richtext::{BoundaryKind, EditorStep, Transaction};

fn insert(pos: usize, text: &str) -> EditorStep {
    EditorStep::InsertText {
        pos,
        text: text.to_string(),
    }
}

#[test]
fn test_basic_editing_session() {
    let mut alice = Replica::new("alice");
    alice.doc.apply_transaction(&Transaction::new(vec![
        insert(0, "Hello world"),
        EditorStep::AddMark {
            from: 6,
            to: 11,
            mark_type: "bold".to_string(),
            attrs: None,
        },
        EditorStep::Delete { from: 0, to: 1 },
        insert(0, "J"),
    ]));

    assert_eq!(alice.doc.text(), "Jello world");
    let tree = alice.doc.project();
    let bold: Vec<&str> = tree
        .leaves()
        .filter(|leaf| leaf.has_mark("bold"))
        .map(|leaf| leaf.text.as_str())
        .collect();
    assert_eq!(bold, vec!["world"]);
}

#[test]
fn test_concurrent_replicas_convergence() {
    let mut alice = Replica::new("alice");
    let mut bob = Replica::new("bob");

    alice.doc.apply_step(&insert(0, "shared"));
    deliver(&alice, &mut [&mut bob]);

    alice.doc.apply_step(&insert(0, ">> "));
    bob.doc.apply_step(&insert(6, "!"));
    bob.doc.apply_step(&EditorStep::Delete { from: 0, to: 1 });

    // Before synchronization, different content
    assert_eq!(alice.doc.text(), ">> shared");
    assert_eq!(bob.doc.text(), "hared!");

    sync_pair(&mut alice, &mut bob);
    assert_eq!(alice.doc.text(), bob.doc.text());
    assert_eq!(alice.doc.text(), ">> hared!");
}

#[test]
fn test_reapplying_updates_is_a_no_op() {
    let mut alice = Replica::new("alice");
    let mut bob = Replica::new("bob");

    alice.doc.apply_step(&insert(0, "abc"));
    alice.doc.apply_step(&EditorStep::Delete { from: 1, to: 2 });
    alice.doc.apply_step(&EditorStep::AddMark {
        from: 0,
        to: 2,
        mark_type: "italic".to_string(),
        attrs: None,
    });

    let updates = alice.outbox.drain();
    for update in &updates {
        bob.doc.apply_remote_update(update).unwrap();
    }
    let once = (bob.doc.snapshot(), rendered(&bob.doc));
    for update in updates.iter().rev() {
        bob.doc.apply_remote_update(update).unwrap();
    }

    assert_eq!((bob.doc.snapshot(), rendered(&bob.doc)), once);
    assert_eq!(rendered(&bob.doc), rendered(&alice.doc));
}

#[test]
fn test_null_anchor_runs_interleave_deterministically() {
    let mut alice = Replica::new("alice");
    let mut bob = Replica::new("bob");

    alice.doc.insert_text(None, "abc");
    bob.doc.insert_text(None, "XYZ");
    sync_pair(&mut alice, &mut bob);

    assert_eq!(alice.doc.text(), bob.doc.text());
    assert_eq!(alice.doc.visible_len(), 6);
}

#[test]
fn test_tombstone_stability() {
    let mut alice = Replica::new("alice");
    alice.doc.apply_step(&insert(0, "abcdef"));
    let before: Vec<_> = alice.doc.store().entries().to_vec();

    alice.doc.delete_range(1, 4);
    let after = alice.doc.store().entries();

    // Same ids in the same order, only the flags changed
    let ids = |entries: &[crdt_richtext::CharacterEntry]| {
        entries.iter().map(|e| e.op_id.clone()).collect::<Vec<_>>()
    };
    assert_eq!(ids(&before), ids(after));
    assert_eq!(alice.doc.text(), "aef");

    // Re-inserting at the stale index lands in a fresh slot
    alice.doc.apply_step(&insert(1, "Z"));
    assert_eq!(alice.doc.text(), "aZef");
    assert_eq!(alice.doc.store().total_len(), 7);
    assert!(alice.doc.store().entries()[1].value == "Z");
}

#[test]
fn test_remove_wins_over_concurrent_add() {
    let mut alice = Replica::new("alice");
    let mut bob = Replica::new("bob");

    let ids = alice.doc.insert_text(None, "hi");
    deliver(&alice, &mut [&mut bob]);

    alice.clock.set(2_000);
    bob.clock.set(2_500);
    alice
        .doc
        .add_mark(ids[0].clone(), ids[1].clone(), "bold", BoundaryKind::After, None);
    bob.doc
        .remove_mark(ids[0].clone(), ids[1].clone(), "bold", BoundaryKind::After);

    sync_pair(&mut alice, &mut bob);

    for replica in [&alice, &bob] {
        let tree = replica.doc.project();
        let h = tree.leaves().next().unwrap();
        assert!(h.text.starts_with('h'));
        assert!(!h.has_mark("bold"));
    }
}

#[test]
fn test_later_add_beats_earlier_remove() {
    let mut alice = Replica::new("alice");
    let mut bob = Replica::new("bob");

    let ids = alice.doc.insert_text(None, "hi");
    deliver(&alice, &mut [&mut bob]);

    alice.clock.set(3_000);
    bob.clock.set(2_000);
    alice
        .doc
        .add_mark(ids[0].clone(), ids[1].clone(), "bold", BoundaryKind::After, None);
    bob.doc
        .remove_mark(ids[0].clone(), ids[1].clone(), "bold", BoundaryKind::After);
    sync_pair(&mut alice, &mut bob);

    assert_eq!(rendered(&alice.doc), rendered(&bob.doc));
    assert!(alice.doc.project().leaves().all(|leaf| leaf.has_mark("bold")));
}

#[test]
fn test_delete_hello_world_range() {
    let mut alice = Replica::new("alice");
    let ids = alice.doc.insert_text(None, "hello world");

    assert_eq!(alice.doc.delete_range(4, 9), 5);
    assert_eq!(alice.doc.text(), "hellld");
    for id in &ids[4..9] {
        assert!(alice.doc.store().get(id).unwrap().deleted);
    }

    let (start, end) = alice.doc.store().visible_range_to_op_ids(0, 1).unwrap();
    assert_eq!(start, ids[0]);
    assert_eq!(end, ids[0]);

    // After deleting the first character the first survivor takes its place
    alice.doc.delete_range(0, 1);
    let (start, _) = alice.doc.store().visible_range_to_op_ids(0, 1).unwrap();
    assert_eq!(start, ids[1]);
}

#[test]
fn test_concurrent_disjoint_deletes() {
    let mut c1 = Replica::new("c1");
    let mut c2 = Replica::new("c2");

    c1.doc.apply_step(&insert(0, "abcdef"));
    deliver(&c1, &mut [&mut c2]);

    c1.doc.delete_range(0, 3);
    c2.doc.delete_range(3, 6);
    sync_pair(&mut c1, &mut c2);

    assert_eq!(c1.doc.text(), c2.doc.text());
    assert_eq!(c1.doc.text(), "");
}

#[test]
fn test_three_way_merge() {
    let mut r1 = Replica::new("r1");
    let mut r2 = Replica::new("r2");
    let mut r3 = Replica::new("r3");

    r1.doc.apply_step(&insert(0, "1"));
    r2.doc.apply_step(&insert(0, "2"));
    r3.doc.apply_step(&insert(0, "3"));

    let all: Vec<Vec<u8>> = [&r1, &r2, &r3]
        .iter()
        .flat_map(|replica| replica.outbox.drain())
        .collect();
    for replica in [&mut r1, &mut r2, &mut r3] {
        for update in &all {
            replica.doc.apply_remote_update(update).unwrap();
        }
    }

    assert_eq!(r1.doc.text(), r2.doc.text());
    assert_eq!(r2.doc.text(), r3.doc.text());
    assert_eq!(r1.doc.visible_len(), 3);
}

#[test]
fn test_state_exchange_converges() {
    let mut alice = Replica::new("alice");
    let mut bob = Replica::new("bob");

    alice.doc.apply_step(&insert(0, "left"));
    bob.doc.apply_step(&insert(0, "right"));
    bob.doc.apply_step(&EditorStep::AddMark {
        from: 0,
        to: 5,
        mark_type: "underline".to_string(),
        attrs: None,
    });

    let alice_state = alice.doc.encode_state().unwrap();
    let bob_state = bob.doc.encode_state().unwrap();
    alice.doc.load_state(&bob_state).unwrap();
    bob.doc.load_state(&alice_state).unwrap();

    assert_eq!(rendered(&alice.doc), rendered(&bob.doc));
    assert_eq!(alice.doc.visible_len(), 9);
}

fn bold_runs(replica: &Replica) -> Vec<String> {
    replica
        .doc
        .project()
        .leaves()
        .filter(|leaf| leaf.has_mark("bold"))
        .map(|leaf| leaf.text.clone())
        .collect()
}

fn bold(from: usize, to: usize) -> EditorStep {
    EditorStep::AddMark {
        from,
        to,
        mark_type: "bold".to_string(),
        attrs: None,
    }
}

#[test]
fn test_concurrent_insert_at_mid_document_run_end_joins_run() {
    let mut alice = Replica::new("alice");
    let mut bob = Replica::new("bob");
    alice.doc.apply_step(&insert(0, "abcdef"));
    sync_pair(&mut alice, &mut bob);

    // The run closes before "d", so text landing between "c" and "d" is inside it
    alice.doc.apply_step(&bold(1, 3));
    bob.doc.apply_step(&insert(3, "X"));
    sync_pair(&mut alice, &mut bob);

    assert_eq!(alice.doc.text(), "abcXdef");
    assert_eq!(bold_runs(&alice), vec!["bcX"]);
    assert_eq!(rendered(&alice.doc), rendered(&bob.doc));

    // Same for a later local insert at the run end
    alice.doc.apply_step(&insert(4, "Y"));
    assert_eq!(bold_runs(&alice), vec!["bcXY"]);
}

#[test]
fn test_concurrent_insert_at_document_end_run_stays_outside() {
    let mut alice = Replica::new("alice");
    let mut bob = Replica::new("bob");
    alice.doc.apply_step(&insert(0, "abcdef"));
    sync_pair(&mut alice, &mut bob);

    // The run closes after "f", so text appended after it is outside
    alice.doc.apply_step(&bold(4, 6));
    bob.doc.apply_step(&insert(6, "Z"));
    sync_pair(&mut alice, &mut bob);

    assert_eq!(alice.doc.text(), "abcdefZ");
    assert_eq!(bold_runs(&alice), vec!["ef"]);
    assert_eq!(rendered(&alice.doc), rendered(&bob.doc));
}
