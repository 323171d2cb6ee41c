//! User model for storage and API.

use serde::{Deserialize, Serialize};

/// A player who has linked their Discord account.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    /// Game-side identity chosen by the client (also the map key)
    pub id: String,
    /// Discord user snowflake
    pub discord_id: String,
    /// Discord OAuth access token
    pub access_token: String,
    /// Discord OAuth refresh token
    pub refresh_token: String,
    /// When the access token expires (epoch seconds)
    pub expires_at: i64,
    /// Granted OAuth scopes, space separated
    pub scope: String,
}

impl User {
    /// Whether the access token expires within `margin_secs` of `now`.
    pub fn needs_refresh(&self, now: i64, margin_secs: i64) -> bool {
        self.expires_at <= now + margin_secs
    }
}
