// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Match (game session) model.

use serde::{Deserialize, Serialize};

/// A match and the Discord resource backing it, once provisioned.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Game {
    pub id: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub guild_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub channel_id: Option<String>,
}

impl Game {
    /// A freshly created match with no venue yet.
    pub fn new(id: u64) -> Self {
        Self {
            id,
            ..Default::default()
        }
    }

    /// The provisioned venue, if any.
    pub fn venue(&self) -> Option<Venue> {
        match (&self.guild_id, &self.channel_id) {
            (Some(id), _) => Some(Venue::Guild(id.clone())),
            (None, Some(id)) => Some(Venue::Channel(id.clone())),
            (None, None) => None,
        }
    }

    /// Record the provisioned venue.
    pub fn set_venue(&mut self, venue: &Venue) {
        match venue {
            Venue::Guild(id) => self.guild_id = Some(id.clone()),
            Venue::Channel(id) => self.channel_id = Some(id.clone()),
        }
    }
}

/// Discord resource id, tagged with its kind.
///
/// Serializes as `{"guild_id": ..}` or `{"channel_id": ..}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Venue {
    #[serde(rename = "guild_id")]
    Guild(String),
    #[serde(rename = "channel_id")]
    Channel(String),
}

impl Venue {
    pub fn id(&self) -> &str {
        match self {
            Venue::Guild(id) | Venue::Channel(id) => id,
        }
    }
}
