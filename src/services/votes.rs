// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Voting on whether a pin is really free.
//!
//! One vote per (pin, user). The transition itself is decided by
//! [`VoteState::cast`]; the store applies the record change and the counter
//! deltas atomically.

use crate::db::PinStore;
use crate::error::Result;
use crate::models::{VoteKind, VoteState};
use crate::services::notices::Notices;
use crate::services::session::Session;
use std::sync::Arc;

#[derive(Clone)]
pub struct VoteService {
    store: Arc<dyn PinStore>,
    session: Session,
    notices: Notices,
}

impl VoteService {
    pub fn new(store: Arc<dyn PinStore>, session: Session, notices: Notices) -> Self {
        Self {
            store,
            session,
            notices,
        }
    }

    /// The signed-in user's vote on a pin; `NoVote` when signed out.
    pub async fn current_vote(&self, pin_id: &str) -> Result<VoteState> {
        let Some(user) = self.session.current() else {
            return Ok(VoteState::NoVote);
        };
        let record = self.store.get_vote(pin_id, user.uid()).await?;
        Ok(VoteState::from_record(record.as_ref()))
    }

    /// Cast a vote and return the committed state.
    ///
    /// Signed-out callers get `Unauthorized` and should be sent to sign in;
    /// nothing is written. Write failures raise a notice.
    pub async fn cast_vote(&self, pin_id: &str, kind: VoteKind) -> Result<VoteState> {
        let user = self.session.require_user()?;

        match self.store.cast_vote(pin_id, user.uid(), kind).await {
            Ok(state) => {
                tracing::debug!(pin_id, uid = %user.uid(), ?kind, ?state, "Vote cast");
                Ok(state)
            }
            Err(e) => {
                tracing::warn!(pin_id, uid = %user.uid(), error = %e, "Vote failed");
                self.notices.report(&e);
                Err(e)
            }
        }
    }
}
