//! Favorite join record between a user and a pin.

use serde::{Deserialize, Serialize};

/// Favorite stored at `users/{uid}/favorites/{pin_id}`.
///
/// Existence-only: the record being present means the user favorites the pin.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Favorite {
    pub pin_id: String,
    pub created_at: String,
}
