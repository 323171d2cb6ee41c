// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Application configuration loaded from a local config file and the environment.
//!
//! The config file uses dotenv syntax. Values already present in the process
//! environment take precedence over the file.

use std::env;
use std::path::PathBuf;
use std::str::FromStr;

/// Default config file, relative to the working directory.
pub const DEFAULT_CONFIG_FILE: &str = "discord.env";

/// Kind of Discord resource created as a match venue.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VenueKind {
    /// A bot-owned guild; players are added as members.
    Guild,
    /// A group DM; players are added as recipients.
    Channel,
}

impl FromStr for VenueKind {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "guild" => Ok(VenueKind::Guild),
            "channel" => Ok(VenueKind::Channel),
            _ => Err(ConfigError::Invalid("MATCH_VENUE", s.to_string())),
        }
    }
}

/// Application configuration, loaded once at startup.
#[derive(Debug, Clone)]
pub struct Config {
    /// Discord application (OAuth client) ID
    pub discord_client_id: String,
    /// Redirect URI registered for the OAuth application
    pub discord_redirect_uri: String,
    /// Discord REST API base URL
    pub discord_api_base: String,
    /// Game client origin allowed by CORS
    pub frontend_url: String,
    /// Server port
    pub port: u16,
    /// Where the store snapshot lives
    pub snapshot_path: PathBuf,
    /// Which resource backs a match
    pub match_venue: VenueKind,
    /// Name given to match guilds
    pub match_guild_name: String,
    /// Voice region for match guilds
    pub match_guild_region: String,

    // --- Secrets ---
    /// Bot token used for guild/channel management
    pub discord_bot_token: String,
    /// Discord OAuth client secret
    pub discord_client_secret: String,
}

impl Config {
    /// Config for testing only.
    pub fn test_default() -> Self {
        Self {
            discord_client_id: "test_client_id".to_string(),
            discord_redirect_uri: "http://localhost:3000".to_string(),
            discord_api_base: "http://127.0.0.1:9/api".to_string(),
            frontend_url: "http://localhost:3000".to_string(),
            port: 5000,
            snapshot_path: PathBuf::from("discord-server.test.json"),
            match_venue: VenueKind::Guild,
            match_guild_name: "Match".to_string(),
            match_guild_region: "us-west".to_string(),
            discord_bot_token: "test_bot_token".to_string(),
            discord_client_secret: "test_secret".to_string(),
        }
    }

    /// Load configuration from the config file (if present) and environment.
    ///
    /// The file path comes from `MATCH_RELAY_CONFIG`, falling back to
    /// [`DEFAULT_CONFIG_FILE`].
    pub fn load() -> Result<Self, ConfigError> {
        let path = env::var("MATCH_RELAY_CONFIG").unwrap_or_else(|_| DEFAULT_CONFIG_FILE.into());
        match dotenvy::from_path(&path) {
            Ok(()) => tracing::info!(path = %path, "Loaded config file"),
            Err(e) if e.not_found() => {
                tracing::debug!(path = %path, "No config file, using environment only")
            }
            Err(e) => return Err(ConfigError::File(e.to_string())),
        }
        Self::from_env()
    }

    /// Load configuration from environment variables only.
    pub fn from_env() -> Result<Self, ConfigError> {
        Ok(Self {
            discord_client_id: required("DISCORD_CLIENT_ID")?,
            discord_redirect_uri: env::var("DISCORD_REDIRECT_URI")
                .unwrap_or_else(|_| "http://localhost:3000".to_string()),
            discord_api_base: env::var("DISCORD_API_BASE")
                .map(|v| v.trim_end_matches('/').to_string())
                .unwrap_or_else(|_| "https://discord.com/api".to_string()),
            frontend_url: env::var("FRONTEND_URL")
                .unwrap_or_else(|_| "http://localhost:3000".to_string()),
            port: env::var("PORT")
                .unwrap_or_else(|_| "5000".to_string())
                .parse()
                .unwrap_or(5000),
            snapshot_path: env::var("SNAPSHOT_PATH")
                .unwrap_or_else(|_| "discord-server.json".to_string())
                .into(),
            match_venue: env::var("MATCH_VENUE")
                .unwrap_or_else(|_| "guild".to_string())
                .parse()?,
            match_guild_name: env::var("MATCH_GUILD_NAME").unwrap_or_else(|_| "Match".to_string()),
            match_guild_region: env::var("MATCH_GUILD_REGION")
                .unwrap_or_else(|_| "us-west".to_string()),

            discord_bot_token: required("DISCORD_BOT_TOKEN")?,
            discord_client_secret: required("DISCORD_CLIENT_SECRET")?,
        })
    }
}

fn required(name: &'static str) -> Result<String, ConfigError> {
    non_empty(name, env::var(name).ok())
}

/// Trimmed `value`, treating blank as missing.
fn non_empty(name: &'static str, value: Option<String>) -> Result<String, ConfigError> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
        .ok_or(ConfigError::Missing(name))
}

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing required setting: {0}")]
    Missing(&'static str),

    #[error("Invalid value for {0}: {1}")]
    Invalid(&'static str, String),

    #[error("Failed to read config file: {0}")]
    File(String),
}
