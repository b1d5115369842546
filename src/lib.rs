//! # crdt-richtext - replicated rich-text core
//!
//! The conflict-free core of a multi-user rich-text editor. Replicas apply
//! local edits and formatting independently and merge into an identical
//! result, with no central arbiter.
//!
//! ## Components
//!
//! - **OpIds**: unique, totally ordered identifiers minted per author session
//! - **Character store**: a sequence CRDT with anchor-chained inserts and
//!   tombstone deletion
//! - **Format log**: append-only mark operations referencing character ids,
//!   resolved per character with remove-wins semantics
//! - **Projector**: renders resolved state as a `doc > paragraph > text` tree
//! - **Translator**: turns editor transactions in visible coordinates into
//!   CRDT operations
//!
//! Transport and persistence are collaborators behind the
//! [`ReplicatedLog`] and [`InitialStateSource`] traits.
//!
//! ## Example
//!
//! ```rust
//! use crdt_richtext::{Document, DocumentConfig, EditorStep, MemoryLog};
//!
//! let outbox = MemoryLog::new();
//! let mut alice = Document::new(DocumentConfig::new("notes", "alice")).with_log(outbox.clone());
//! let mut bob = Document::new(DocumentConfig::new("notes", "bob"));
//!
//! alice.apply_step(&EditorStep::InsertText { pos: 0, text: "hello".into() });
//! for update in outbox.drain() {
//!     bob.apply_remote_update(&update).unwrap();
//! }
//! assert_eq!(bob.text(), "hello");
//! ```

pub mod config;
pub mod crdt;
pub mod document;
pub mod error;
pub mod persistence;
pub mod replication;

pub use config::{DocumentConfig, ServerConfig};
pub use crdt::{
    BoundaryKind, CharacterEntry, CharacterStore, FormatLog, FormatOp, ManualClock, MarkSchema,
    OpId, OpIdSession,
};
pub use document::{BootstrapFetch, Document, DocumentTree, EditorStep, Transaction};
pub use error::{CodecError, PersistenceError};
pub use persistence::{InitialStateSource, JsonDirectorySource, NoInitialState};
pub use replication::{MemoryLog, NullLog, ReplicatedLog, StateSnapshot, Update};
