//! Wire values exchanged through a replication transport.
//!
//! A replica emits one [`Update`] per atomic mutation: a character insertion, a
//! tombstone flip, or a format-op append. Full state travels as a
//! [`StateSnapshot`], either on its own (stored state, `GET /state`) or wrapped
//! in [`Update::State`] so a transport can carry it on the same channel as
//! incremental updates. Both encode as JSON.

use serde::{Deserialize, Serialize};

use crate::crdt::entry::CharacterEntry;
use crate::crdt::format::FormatOp;
use crate::crdt::types::OpId;
use crate::error::CodecResult;

/// One atomic, idempotent mutation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum Update {
    Insert { entry: CharacterEntry },
    #[serde(rename_all = "camelCase")]
    Delete { op_id: OpId },
    Format { op: FormatOp },
    /// Full state, merged like any other update
    State { snapshot: StateSnapshot },
}

impl Update {
    pub fn encode(&self) -> CodecResult<Vec<u8>> {
        Ok(serde_json::to_vec(self)?)
    }

    pub fn decode(bytes: &[u8]) -> CodecResult<Self> {
        Ok(serde_json::from_slice(bytes)?)
    }
}

/// Full replica state, characters in store order.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StateSnapshot {
    pub characters: Vec<CharacterEntry>,
    pub format_ops: Vec<FormatOp>,
}

impl StateSnapshot {
    pub fn is_empty(&self) -> bool {
        self.characters.is_empty() && self.format_ops.is_empty()
    }

    pub fn encode(&self) -> CodecResult<Vec<u8>> {
        Ok(serde_json::to_vec(self)?)
    }

    pub fn decode(bytes: &[u8]) -> CodecResult<Self> {
        Ok(serde_json::from_slice(bytes)?)
    }
}
