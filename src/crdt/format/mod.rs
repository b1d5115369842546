//! Format operation log and mark resolution.
//!
//! Formatting is stored apart from the characters: an append-only log of
//! [`FormatOp`]s whose ranges reference character ids, resolved into
//! per-character marks at read time.

pub mod log;
pub mod op;
pub mod resolver;

pub use log::FormatLog;
pub use op::{Boundary, BoundaryKind, FormatOp, MarkAction, MarkAttrs};
pub use resolver::{MarkSchema, ResolvedMark, is_within_mark, marks_of, resolve_marks};
