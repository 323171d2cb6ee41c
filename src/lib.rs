// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@kernel.org>

//! Match-Relay: Discord account linking and match venues for game clients
//!
//! This crate provides the backend a game client talks to for linking
//! players' Discord accounts over OAuth and for creating the guild or
//! group DM each match is played in.

pub mod config;
pub mod db;
pub mod error;
pub mod models;
pub mod routes;
pub mod services;
pub mod time_utils;

use config::Config;
use db::SnapshotStore;
use services::{DiscordClient, MatchService, TokenService, VenueSettings};
use std::sync::Arc;

/// Shared application state.
pub struct AppState {
    pub config: Config,
    pub store: Arc<SnapshotStore>,
    pub tokens: TokenService,
    pub matches: MatchService,
}

impl AppState {
    /// Load the snapshot named in `config` and wire up the services.
    pub async fn from_config(config: Config) -> Self {
        let store = Arc::new(SnapshotStore::open(config.snapshot_path.clone()).await);
        let discord = DiscordClient::new(&config);
        let tokens = TokenService::new(discord.clone(), store.clone());
        let matches = MatchService::new(
            discord,
            tokens.clone(),
            store.clone(),
            VenueSettings::from_config(&config),
        );

        Self {
            config,
            store,
            tokens,
            matches,
        }
    }
}
