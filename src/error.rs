//! Error types for the rich-text core.
//!
//! CRDT operations themselves never fail: unresolvable ids degrade and log.
//! Errors only surface at the edges, where bytes or files come in.

use thiserror::Error;

pub use crate::crdt::types::OpIdParseError;

/// Result type for decoding transport payloads
pub type CodecResult<T> = Result<T, CodecError>;

/// Errors raised while decoding updates or state received from a transport.
#[derive(Debug, Error)]
pub enum CodecError {
    /// The payload is not valid JSON for the expected shape
    #[error("Malformed payload: {0}")]
    Malformed(#[from] serde_json::Error),
}

/// Errors raised by an initial-state source.
#[derive(Debug, Error)]
pub enum PersistenceError {
    /// Reading the stored state failed
    #[error("Failed to read stored state: {0}")]
    Io(#[from] std::io::Error),

    /// The stored state could not be decoded
    #[error("Stored state is corrupt: {0}")]
    Corrupt(#[from] CodecError),
}
