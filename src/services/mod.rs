// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Services module - business logic layer.

pub mod discord;
pub mod matches;
pub mod tokens;

pub use discord::DiscordClient;
pub use matches::{MatchService, VenueSettings};
pub use tokens::TokenService;
