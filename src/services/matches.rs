// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Match lifecycle: creation, lookup, joining and teardown.
//!
//! A match starts without a venue. The first join provisions one (a guild
//! or a group DM, depending on configuration) and later joins add players
//! to it. Provisioning happens at most once per match, even when joins race.

use crate::config::{Config, VenueKind};
use crate::db::SnapshotStore;
use crate::error::AppError;
use crate::models::{Game, User, Venue};
use crate::services::discord::{permissions, DiscordClient};
use crate::services::tokens::TokenService;
use dashmap::DashMap;
use futures_util::{stream, StreamExt};
use std::sync::Arc;
use tokio::sync::Mutex;

const MAX_CONCURRENT_DELETES: usize = 8;

/// Per-game provisioning locks.
pub type ProvisionLocks = Arc<DashMap<u64, Arc<Mutex<()>>>>;

/// Settings for newly provisioned venues.
#[derive(Debug, Clone)]
pub struct VenueSettings {
    pub kind: VenueKind,
    pub guild_name: String,
    pub guild_region: String,
}

impl VenueSettings {
    pub fn from_config(config: &Config) -> Self {
        Self {
            kind: config.match_venue,
            guild_name: config.match_guild_name.clone(),
            guild_region: config.match_guild_region.clone(),
        }
    }
}

/// Creates and tears down matches and their Discord venues.
#[derive(Clone)]
pub struct MatchService {
    discord: DiscordClient,
    tokens: TokenService,
    store: Arc<SnapshotStore>,
    venue: VenueSettings,
    provision_locks: ProvisionLocks,
}

impl MatchService {
    pub fn new(
        discord: DiscordClient,
        tokens: TokenService,
        store: Arc<SnapshotStore>,
        venue: VenueSettings,
    ) -> Self {
        Self {
            discord,
            tokens,
            store,
            venue,
            provision_locks: Arc::new(DashMap::new()),
        }
    }

    /// Start a new match with no venue.
    pub async fn create_match(&self) -> Result<Game, AppError> {
        let game = self
            .store
            .update(|s| {
                let game = Game::new(s.next_game_id());
                s.games.push(game.clone());
                Ok(game)
            })
            .await?;

        tracing::info!(game_id = game.id, "Match created");
        Ok(game)
    }

    /// The oldest active match.
    pub async fn find_match(&self) -> Result<Game, AppError> {
        self.store
            .read(|s| s.games.first().cloned())
            .await
            .ok_or(AppError::NoActiveMatch)
    }

    /// Add a user to a match, provisioning its venue on first join.
    ///
    /// `discord_id` overrides the Discord account stored for the user.
    pub async fn join_match(
        &self,
        game_id: u64,
        user_id: &str,
        discord_id: Option<&str>,
    ) -> Result<Venue, AppError> {
        let (game, known_user) = self
            .store
            .read(|s| (s.game(game_id).cloned(), s.user(user_id).is_some()))
            .await;
        let game = game.ok_or_else(|| AppError::InvalidId(format!("unknown game {}", game_id)))?;
        if !known_user {
            return Err(AppError::InvalidId(format!("unknown user {}", user_id)));
        }

        let user = self.tokens.ensure_fresh(user_id).await?;
        let target = discord_id.unwrap_or(user.discord_id.as_str()).to_string();

        if let Some(venue) = game.venue() {
            self.add_player(&venue, &target, &user).await?;
            return Ok(venue);
        }

        let lock = self
            .provision_locks
            .entry(game_id)
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone();
        let _guard = lock.lock().await;

        // Another join may have provisioned while we waited
        let current = self
            .store
            .read(|s| s.game(game_id).map(Game::venue))
            .await
            .ok_or_else(|| AppError::InvalidId(format!("unknown game {}", game_id)))?;
        if let Some(venue) = current {
            self.add_player(&venue, &target, &user).await?;
            return Ok(venue);
        }

        let venue = self.provision(&target, &user).await?;

        let recorded = venue.clone();
        let saved = self
            .store
            .update(move |s| match s.game_mut(game_id) {
                Some(game) => {
                    game.set_venue(&recorded);
                    Ok(())
                }
                None => Err(AppError::InvalidId(format!("unknown game {}", game_id))),
            })
            .await;

        if let Err(e) = saved {
            tracing::warn!(game_id, venue = ?venue, error = %e, "Could not record venue, deleting it");
            if let Err(del) = self.delete_venue(&venue).await {
                tracing::error!(game_id, venue = ?venue, error = %del, "Failed to delete orphaned venue");
            }
            return Err(e);
        }

        tracing::info!(game_id, venue = ?venue, "Match venue provisioned");

        // A new group DM already contains its creator
        if let Venue::Guild(_) = venue {
            self.add_player(&venue, &target, &user).await?;
        }
        Ok(venue)
    }

    /// Remove all matches and delete their venues.
    pub async fn end_match(&self) -> Result<(), AppError> {
        let removed = self.clear_games().await?;
        let venues: Vec<Venue> = removed.iter().filter_map(Game::venue).collect();
        self.delete_venues(venues).await
    }

    /// Remove all matches and delete every guild the bot owns.
    ///
    /// Group DM venues of removed matches are closed as well, even when the
    /// guild listing fails.
    pub async fn delete_all_servers(&self) -> Result<(), AppError> {
        let removed = self.clear_games().await?;

        let mut venues: Vec<Venue> = removed
            .iter()
            .filter_map(Game::venue)
            .filter(|v| matches!(v, Venue::Channel(_)))
            .collect();

        let guilds = match self.discord.list_own_guilds().await {
            Ok(guilds) => guilds,
            Err(e) => {
                tracing::warn!(
                    error = %e,
                    channels = venues.len(),
                    "Could not list guilds, closing channels only"
                );
                if let Err(del) = self.delete_venues(venues).await {
                    tracing::error!(error = %del, "Failed to close match channels");
                }
                return Err(e);
            }
        };
        for guild in guilds.into_iter().filter(|g| g.owner) {
            tracing::info!(guild_id = %guild.id, name = %guild.name, "Deleting owned guild");
            venues.push(Venue::Guild(guild.id));
        }

        self.delete_venues(venues).await
    }

    async fn clear_games(&self) -> Result<Vec<Game>, AppError> {
        let removed = self.store.update(|s| Ok(s.clear_games())).await?;
        for game in &removed {
            self.provision_locks.remove(&game.id);
        }
        tracing::info!(count = removed.len(), "Matches cleared");
        Ok(removed)
    }

    async fn provision(&self, target: &str, user: &User) -> Result<Venue, AppError> {
        match self.venue.kind {
            VenueKind::Guild => {
                let guild = self
                    .discord
                    .create_guild(
                        &self.venue.guild_name,
                        &self.venue.guild_region,
                        permissions::MATCH_EVERYONE,
                    )
                    .await?;
                Ok(Venue::Guild(guild.id))
            }
            VenueKind::Channel => {
                let channel = self
                    .discord
                    .create_group_dm(&user.access_token, target, &user.id)
                    .await?;
                Ok(Venue::Channel(channel.id))
            }
        }
    }

    async fn add_player(&self, venue: &Venue, target: &str, user: &User) -> Result<(), AppError> {
        match venue {
            Venue::Guild(guild_id) => {
                self.discord
                    .add_guild_member(guild_id, target, &user.access_token)
                    .await?
            }
            Venue::Channel(channel_id) => {
                self.discord
                    .add_recipient(channel_id, target, &user.access_token, &user.id)
                    .await?
            }
        }
        tracing::info!(venue = ?venue, user_id = %user.id, "Player added to match");
        Ok(())
    }

    async fn delete_venue(&self, venue: &Venue) -> Result<(), AppError> {
        let result = match venue {
            Venue::Guild(id) => self.discord.delete_guild(id).await,
            Venue::Channel(id) => self.discord.delete_channel(id).await,
        };
        match result {
            Err(e) if e.upstream_status() == Some(404) => {
                tracing::debug!(venue = ?venue, "Venue already gone");
                Ok(())
            }
            other => other,
        }
    }

    /// Delete venues concurrently; reports the first failure after trying all.
    async fn delete_venues(&self, venues: Vec<Venue>) -> Result<(), AppError> {
        let results: Vec<Result<(), AppError>> = stream::iter(venues)
            .map(|venue| async move { self.delete_venue(&venue).await })
            .buffer_unordered(MAX_CONCURRENT_DELETES)
            .collect()
            .await;

        results.into_iter().collect()
    }
}
