//! Type definitions for the rich-text CRDT.
//!
//! This module contains the identifier types shared by the character store and
//! the format log, organized into focused submodules.

pub mod clock;
pub mod op_id;
pub mod replica;
pub mod session;

pub use clock::{Clock, ManualClock, SystemClock};
pub use op_id::{OpId, OpIdParseError};
pub use replica::AuthorId;
pub use session::OpIdSession;
