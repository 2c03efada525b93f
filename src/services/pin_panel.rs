// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! View state of an opened pin: the user's vote and favorite flag.

use crate::error::Result;
use crate::models::{VoteKind, VoteState};
use crate::services::favorites::FavoriteService;
use crate::services::votes::VoteService;

/// State only advances after the corresponding write succeeded.
pub struct PinPanel {
    pin_id: String,
    vote: VoteState,
    is_favorite: bool,
    votes: VoteService,
    favorites: FavoriteService,
}

impl PinPanel {
    /// Load the current vote and favorite flag by point lookups.
    pub async fn open(
        pin_id: &str,
        votes: VoteService,
        favorites: FavoriteService,
    ) -> Result<Self> {
        let vote = votes.current_vote(pin_id).await?;
        let is_favorite = favorites.is_favorite(pin_id).await?;
        Ok(Self {
            pin_id: pin_id.to_string(),
            vote,
            is_favorite,
            votes,
            favorites,
        })
    }

    pub fn pin_id(&self) -> &str {
        &self.pin_id
    }

    pub fn vote(&self) -> VoteState {
        self.vote
    }

    pub fn is_favorite(&self) -> bool {
        self.is_favorite
    }

    pub async fn cast_vote(&mut self, kind: VoteKind) -> Result<VoteState> {
        self.vote = self.votes.cast_vote(&self.pin_id, kind).await?;
        Ok(self.vote)
    }

    pub async fn toggle_favorite(&mut self) -> Result<bool> {
        self.is_favorite = self
            .favorites
            .toggle(&self.pin_id, self.is_favorite)
            .await?;
        Ok(self.is_favorite)
    }
}
