//! CRDT (Conflict-free Replicated Data Type) implementation module.
//!
//! This module contains the character sequence CRDT, the format-operation log
//! and all their supporting identifier types.

pub mod entry;
pub mod format;
pub mod store;
pub mod types;

// Re-export the main public API
pub use entry::CharacterEntry;
pub use format::{
    Boundary, BoundaryKind, FormatLog, FormatOp, MarkAction, MarkAttrs, MarkSchema, ResolvedMark,
};
pub use store::{CharacterStore, Integration};
pub use types::{AuthorId, Clock, ManualClock, OpId, OpIdParseError, OpIdSession, SystemClock};
