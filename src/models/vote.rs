// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@kernel.org>

//! Per-(pin, user) vote model and its state machine.
//!
//! Each user holds at most one vote on a pin. Casting a kind either creates
//! the vote, switches it to the other kind, or (same kind again) retracts it.
//! The transition carries the exact counter deltas the store must apply.

use serde::{Deserialize, Serialize};
#[cfg(feature = "binding-generation")]
use ts_rs::TS;

/// Pin counter field for "confirmed free" votes.
pub const FREE_COUNT_FIELD: &str = "isFreeCount";
/// Pin counter field for "denied free" votes.
pub const NOT_FREE_COUNT_FIELD: &str = "isNotFreeCount";

/// The two mutually exclusive vote kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub enum VoteKind {
    /// The spot is confirmed free
    Confirmed,
    /// The spot is reported as not free
    Denied,
}

/// Vote record stored at `pins/{pin_id}/votes/{uid}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VoteRecord {
    pub vote: VoteKind,
    pub voted_at: String,
}

/// Vote state of one user on one pin.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub enum VoteState {
    #[default]
    NoVote,
    ConfirmedFree,
    DeniedFree,
}

impl VoteState {
    /// State implied by an existing vote record (or its absence).
    pub fn from_record(record: Option<&VoteRecord>) -> Self {
        match record.map(|r| r.vote) {
            None => VoteState::NoVote,
            Some(VoteKind::Confirmed) => VoteState::ConfirmedFree,
            Some(VoteKind::Denied) => VoteState::DeniedFree,
        }
    }

    /// The active vote kind, if any.
    pub fn kind(self) -> Option<VoteKind> {
        match self {
            VoteState::NoVote => None,
            VoteState::ConfirmedFree => Some(VoteKind::Confirmed),
            VoteState::DeniedFree => Some(VoteKind::Denied),
        }
    }

    fn holding(kind: VoteKind) -> Self {
        match kind {
            VoteKind::Confirmed => VoteState::ConfirmedFree,
            VoteKind::Denied => VoteState::DeniedFree,
        }
    }

    /// Apply a `castVote(kind)` action.
    pub fn cast(self, kind: VoteKind) -> VoteTransition {
        let mut deltas = CounterDeltas::default();

        let (next, record) = match self.kind() {
            // Same kind again: retract
            Some(current) if current == kind => {
                deltas.add(current, -1);
                (VoteState::NoVote, RecordChange::Delete)
            }
            // Switch: one decrement and one increment in the same update
            Some(current) => {
                deltas.add(current, -1);
                deltas.add(kind, 1);
                (VoteState::holding(kind), RecordChange::Put(kind))
            }
            None => {
                deltas.add(kind, 1);
                (VoteState::holding(kind), RecordChange::Put(kind))
            }
        };

        VoteTransition {
            from: self,
            to: next,
            record,
            deltas,
        }
    }
}

/// What happens to the vote record in a transition.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecordChange {
    /// Create or replace the record with this kind
    Put(VoteKind),
    /// Delete the record
    Delete,
}

/// Increments to apply to a pin's counters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct CounterDeltas {
    pub is_free: i64,
    pub is_not_free: i64,
}

impl CounterDeltas {
    fn add(&mut self, kind: VoteKind, amount: i64) {
        match kind {
            VoteKind::Confirmed => self.is_free += amount,
            VoteKind::Denied => self.is_not_free += amount,
        }
    }

    /// Non-zero `(field, delta)` pairs, in a stable order.
    pub fn fields(&self) -> Vec<(&'static str, i64)> {
        [
            (FREE_COUNT_FIELD, self.is_free),
            (NOT_FREE_COUNT_FIELD, self.is_not_free),
        ]
        .into_iter()
        .filter(|(_, delta)| *delta != 0)
        .collect()
    }
}

/// Result of [`VoteState::cast`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VoteTransition {
    pub from: VoteState,
    pub to: VoteState,
    pub record: RecordChange,
    pub deltas: CounterDeltas,
}
