// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Favorite toggling: existence of `users/{uid}/favorites/{pin_id}`.

use crate::db::PinStore;
use crate::error::Result;
use crate::models::Favorite;
use crate::services::notices::Notices;
use crate::services::session::Session;
use crate::time_utils::now_rfc3339;
use std::sync::Arc;

#[derive(Clone)]
pub struct FavoriteService {
    store: Arc<dyn PinStore>,
    session: Session,
    notices: Notices,
}

impl FavoriteService {
    pub fn new(store: Arc<dyn PinStore>, session: Session, notices: Notices) -> Self {
        Self {
            store,
            session,
            notices,
        }
    }

    /// Point lookup of the signed-in user's favorite; `false` when signed out.
    pub async fn is_favorite(&self, pin_id: &str) -> Result<bool> {
        let Some(user) = self.session.current() else {
            return Ok(false);
        };
        Ok(self.store.get_favorite(user.uid(), pin_id).await?.is_some())
    }

    /// Flip membership given the state the caller currently shows.
    ///
    /// Returns the new state once the write succeeded. Signed-out callers get
    /// `Unauthorized`; write failures raise a notice.
    pub async fn toggle(&self, pin_id: &str, is_favorite: bool) -> Result<bool> {
        let user = self.session.require_user()?;

        let result = if is_favorite {
            self.store.delete_favorite(user.uid(), pin_id).await
        } else {
            let favorite = Favorite {
                pin_id: pin_id.to_string(),
                created_at: now_rfc3339(),
            };
            self.store.set_favorite(user.uid(), &favorite).await
        };

        match result {
            Ok(()) => {
                tracing::debug!(pin_id, uid = %user.uid(), favorite = !is_favorite, "Favorite toggled");
                Ok(!is_favorite)
            }
            Err(e) => {
                tracing::warn!(pin_id, uid = %user.uid(), error = %e, "Favorite toggle failed");
                self.notices.report(&e);
                Err(e)
            }
        }
    }
}
