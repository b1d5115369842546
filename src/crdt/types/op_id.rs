//! Operation identifiers for characters and format operations.
//!
//! An [`OpId`] is the stable address of everything a replica ever creates.
//! Two textual forms exist on the wire:
//!
//! - `ts_seq@author` — the current form, with a per-session sequence number
//! - `ts@author` — the legacy form, produced by older replicas without a sequence
//!
//! # Ordering
//!
//! The comparator is shared by every replica and must never be replaced by
//! string comparison:
//!
//! - legacy vs legacy: by timestamp, then author
//! - legacy vs new: legacy always orders first
//! - new vs new: by `(timestamp, seq, author)`

use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use thiserror::Error;

use crate::crdt::types::replica::AuthorId;

/// Errors produced when parsing the textual form of an [`OpId`].
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum OpIdParseError {
    #[error("missing '@' separator in op id '{0}'")]
    MissingAuthor(String),

    #[error("invalid timestamp in op id '{0}'")]
    InvalidTimestamp(String),

    #[error("invalid sequence number in op id '{0}'")]
    InvalidSequence(String),
}

/// A unique, totally ordered identifier for a character or format operation.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct OpId {
    /// Milliseconds (or a Lamport-lifted floor) when the op was minted
    pub timestamp: i64,
    /// Per-session sequence; `None` for legacy ids
    pub seq: Option<u64>,
    /// The author that minted this id
    pub author_id: AuthorId,
}

impl OpId {
    /// Creates a current-form id.
    pub fn new(timestamp: i64, seq: u64, author_id: impl Into<AuthorId>) -> Self {
        OpId {
            timestamp,
            seq: Some(seq),
            author_id: author_id.into(),
        }
    }

    /// Creates a legacy-form id (no sequence number).
    pub fn legacy(timestamp: i64, author_id: impl Into<AuthorId>) -> Self {
        OpId {
            timestamp,
            seq: None,
            author_id: author_id.into(),
        }
    }

    /// The reserved id of the head sentinel. Orders before every other id.
    pub fn head() -> Self {
        OpId::legacy(i64::MIN, "")
    }

    /// Returns true for the head sentinel id.
    pub fn is_head(&self) -> bool {
        self.seq.is_none() && self.timestamp == i64::MIN && self.author_id.is_empty()
    }

    /// Returns true if this id uses the legacy `ts@author` form.
    pub fn is_legacy(&self) -> bool {
        self.seq.is_none()
    }
}

impl PartialOrd for OpId {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for OpId {
    fn cmp(&self, other: &Self) -> Ordering {
        match (self.seq, other.seq) {
            (None, None) => self
                .timestamp
                .cmp(&other.timestamp)
                .then_with(|| self.author_id.cmp(&other.author_id)),
            (None, Some(_)) => Ordering::Less,
            (Some(_), None) => Ordering::Greater,
            (Some(a), Some(b)) => self
                .timestamp
                .cmp(&other.timestamp)
                .then(a.cmp(&b))
                .then_with(|| self.author_id.cmp(&other.author_id)),
        }
    }
}

impl fmt::Display for OpId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.seq {
            Some(seq) => write!(f, "{}_{}@{}", self.timestamp, seq, self.author_id),
            None => write!(f, "{}@{}", self.timestamp, self.author_id),
        }
    }
}

impl FromStr for OpId {
    type Err = OpIdParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        // The clock part never contains '@', the author may.
        let (clock, author) = s
            .split_once('@')
            .ok_or_else(|| OpIdParseError::MissingAuthor(s.to_string()))?;

        match clock.split_once('_') {
            Some((ts, seq)) => {
                let timestamp = ts
                    .parse::<i64>()
                    .map_err(|_| OpIdParseError::InvalidTimestamp(s.to_string()))?;
                let seq = seq
                    .parse::<u64>()
                    .map_err(|_| OpIdParseError::InvalidSequence(s.to_string()))?;
                Ok(OpId::new(timestamp, seq, author))
            }
            None => {
                let timestamp = clock
                    .parse::<i64>()
                    .map_err(|_| OpIdParseError::InvalidTimestamp(s.to_string()))?;
                Ok(OpId::legacy(timestamp, author))
            }
        }
    }
}

impl Serialize for OpId {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for OpId {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        raw.parse().map_err(serde::de::Error::custom)
    }
}
