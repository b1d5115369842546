//! Append-only log of format operations.

use std::collections::HashSet;

use tracing::debug;

use crate::crdt::format::op::{Boundary, BoundaryKind, FormatOp, MarkAction, MarkAttrs};
use crate::crdt::types::{OpId, OpIdSession};

/// The grow-only set of format operations of one document.
///
/// Ops are kept in arrival order. Arrival order never affects resolution, it
/// only keeps encoding stable.
#[derive(Debug, Clone, Default)]
pub struct FormatLog {
    ops: Vec<FormatOp>,
    seen: HashSet<OpId>,
}

impl FormatLog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a mark over `[start, end]`; the start boundary is always `Before`.
    pub fn add_mark(
        &mut self,
        session: &mut OpIdSession,
        start_id: OpId,
        end_id: OpId,
        mark_type: impl Into<String>,
        end_kind: BoundaryKind,
        attrs: Option<MarkAttrs>,
    ) -> FormatOp {
        self.record(
            session,
            MarkAction::AddMark,
            start_id,
            end_id,
            mark_type.into(),
            end_kind,
            attrs,
        )
    }

    /// Appends a removal of `mark_type` over `[start, end]`.
    pub fn remove_mark(
        &mut self,
        session: &mut OpIdSession,
        start_id: OpId,
        end_id: OpId,
        mark_type: impl Into<String>,
        end_kind: BoundaryKind,
    ) -> FormatOp {
        self.record(
            session,
            MarkAction::RemoveMark,
            start_id,
            end_id,
            mark_type.into(),
            end_kind,
            None,
        )
    }

    #[allow(clippy::too_many_arguments)]
    fn record(
        &mut self,
        session: &mut OpIdSession,
        action: MarkAction,
        start_id: OpId,
        end_id: OpId,
        mark_type: String,
        end_kind: BoundaryKind,
        attrs: Option<MarkAttrs>,
    ) -> FormatOp {
        let op_id = session.generate();
        let op = FormatOp {
            timestamp: op_id.timestamp,
            op_id,
            action,
            mark_type,
            start: Boundary::before(start_id),
            end: Boundary {
                kind: end_kind,
                char_op_id: end_id,
            },
            attrs,
        };
        self.append(op.clone());
        op
    }

    /// Appends an op received from another replica.
    ///
    /// Returns `false` if the op was already in the log.
    pub fn append(&mut self, op: FormatOp) -> bool {
        if !self.seen.insert(op.op_id.clone()) {
            debug!(op_id = %op.op_id, "format op already applied");
            return false;
        }
        self.ops.push(op);
        true
    }

    pub fn contains(&self, op_id: &OpId) -> bool {
        self.seen.contains(op_id)
    }

    pub fn ops(&self) -> &[FormatOp] {
        &self.ops
    }

    pub fn len(&self) -> usize {
        self.ops.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ops.is_empty()
    }
}
