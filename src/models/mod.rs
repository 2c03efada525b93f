// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@kernel.org>

//! Data models for the application.

pub mod favorite;
pub mod pin;
pub mod position;
pub mod user;
pub mod vote;

pub use favorite::Favorite;
pub use pin::{NewPin, Pin};
pub use position::{AccuracyBand, LocationMethod, Position};
pub use user::User;
pub use vote::{VoteKind, VoteRecord, VoteState, VoteTransition};
