// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Discord REST API client.
//!
//! Handles:
//! - OAuth code exchange, token refresh and RPC tokens
//! - Profile lookup for linked users
//! - Guild and group DM management with the bot token
//!
//! Non-success responses become [`AppError::DiscordApi`] carrying the
//! upstream status so handlers can pass it through.

use crate::config::Config;
use crate::error::AppError;
use reqwest::{Method, RequestBuilder};
use serde::{de::DeserializeOwned, Deserialize};
use std::collections::HashMap;

const USER_AGENT: &str = concat!("DiscordBot (match-relay, ", env!("CARGO_PKG_VERSION"), ")");

/// Role permission bits used for match guilds.
pub mod permissions {
    pub const READ_MESSAGES: u64 = 0x0000_0400;
    pub const SEND_MESSAGES: u64 = 0x0000_0800;
    pub const READ_MESSAGE_HISTORY: u64 = 0x0001_0000;
    pub const CONNECT: u64 = 0x0010_0000;
    pub const SPEAK: u64 = 0x0020_0000;
    pub const USE_VAD: u64 = 0x0200_0000;

    /// What `@everyone` may do in a match guild.
    pub const MATCH_EVERYONE: u64 =
        READ_MESSAGES | SEND_MESSAGES | READ_MESSAGE_HISTORY | CONNECT | SPEAK | USE_VAD;
}

/// Discord API client.
#[derive(Clone)]
pub struct DiscordClient {
    http: reqwest::Client,
    base_url: String,
    bot_token: String,
    client_id: String,
    client_secret: String,
    redirect_uri: String,
}

impl DiscordClient {
    /// Create a new Discord client from application configuration.
    pub fn new(config: &Config) -> Self {
        Self {
            http: reqwest::Client::new(),
            base_url: config.discord_api_base.clone(),
            bot_token: config.discord_bot_token.clone(),
            client_id: config.discord_client_id.clone(),
            client_secret: config.discord_client_secret.clone(),
            redirect_uri: config.discord_redirect_uri.clone(),
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    /// Request authorized as the bot.
    fn bot(&self, method: Method, path: &str) -> RequestBuilder {
        self.http
            .request(method, self.url(path))
            .header(reqwest::header::AUTHORIZATION, format!("Bot {}", self.bot_token))
            .header(reqwest::header::USER_AGENT, USER_AGENT)
    }

    // ─── OAuth ───────────────────────────────────────────────────

    /// Exchange an authorization code for tokens.
    pub async fn exchange_code(&self, code: &str) -> Result<TokenResponse, AppError> {
        let response = self
            .bot(Method::POST, "/oauth2/token")
            .form(&[
                ("grant_type", "authorization_code"),
                ("code", code),
                ("redirect_uri", self.redirect_uri.as_str()),
                ("client_id", self.client_id.as_str()),
                ("client_secret", self.client_secret.as_str()),
            ])
            .send()
            .await
            .map_err(|e| AppError::discord(format!("Token exchange failed: {}", e)))?;

        check_response_json(response).await
    }

    /// Trade a refresh token for a new token pair.
    pub async fn refresh_token(&self, refresh_token: &str) -> Result<TokenResponse, AppError> {
        let response = self
            .bot(Method::POST, "/oauth2/token")
            .form(&[
                ("grant_type", "refresh_token"),
                ("refresh_token", refresh_token),
                ("client_id", self.client_id.as_str()),
                ("client_secret", self.client_secret.as_str()),
            ])
            .send()
            .await
            .map_err(|e| AppError::discord(format!("Token refresh request failed: {}", e)))?;

        check_response_json(response).await
    }

    /// Get a token the game client uses to authorize over local RPC.
    pub async fn rpc_token(&self) -> Result<String, AppError> {
        let response = self
            .bot(Method::POST, "/oauth2/token/rpc")
            .form(&[
                ("client_id", self.client_id.as_str()),
                ("client_secret", self.client_secret.as_str()),
            ])
            .send()
            .await
            .map_err(|e| AppError::discord(format!("RPC token request failed: {}", e)))?;

        let body: RpcTokenResponse = check_response_json(response).await?;
        Ok(body.rpc_token)
    }

    /// Profile of the user owning `access_token`.
    pub async fn current_user(&self, access_token: &str) -> Result<DiscordUser, AppError> {
        let response = self
            .http
            .get(self.url("/users/@me"))
            .bearer_auth(access_token)
            .header(reqwest::header::USER_AGENT, USER_AGENT)
            .send()
            .await
            .map_err(|e| AppError::discord(e.to_string()))?;

        check_response_json(response).await
    }

    // ─── Guilds ──────────────────────────────────────────────────

    /// Create a bot-owned guild whose `@everyone` role gets `permissions`.
    pub async fn create_guild(
        &self,
        name: &str,
        region: &str,
        permissions: u64,
    ) -> Result<DiscordGuild, AppError> {
        let body = serde_json::json!({
            "name": name,
            "region": region,
            "icon": null,
            "roles": [
                { "id": 0, "permissions": permissions.to_string() }
            ]
        });

        let response = self
            .bot(Method::POST, "/guilds")
            .json(&body)
            .send()
            .await
            .map_err(|e| AppError::discord(e.to_string()))?;

        check_response_json(response).await
    }

    /// Add a user to a guild using their OAuth token (`guilds.join` scope).
    pub async fn add_guild_member(
        &self,
        guild_id: &str,
        user_id: &str,
        access_token: &str,
    ) -> Result<(), AppError> {
        let path = format!("/guilds/{}/members/{}", guild_id, user_id);
        let response = self
            .bot(Method::PUT, &path)
            .json(&serde_json::json!({ "access_token": access_token }))
            .send()
            .await
            .map_err(|e| AppError::discord(e.to_string()))?;

        check_response(response).await
    }

    /// Guilds the bot belongs to.
    pub async fn list_own_guilds(&self) -> Result<Vec<PartialGuild>, AppError> {
        let response = self
            .bot(Method::GET, "/users/@me/guilds")
            .send()
            .await
            .map_err(|e| AppError::discord(e.to_string()))?;

        check_response_json(response).await
    }

    pub async fn delete_guild(&self, guild_id: &str) -> Result<(), AppError> {
        let response = self
            .bot(Method::DELETE, &format!("/guilds/{}", guild_id))
            .send()
            .await
            .map_err(|e| AppError::discord(e.to_string()))?;

        check_response(response).await
    }

    // ─── Group DMs ───────────────────────────────────────────────

    /// Open a group DM containing the owner of `access_token`.
    pub async fn create_group_dm(
        &self,
        access_token: &str,
        user_id: &str,
        nick: &str,
    ) -> Result<DiscordChannel, AppError> {
        let nicks: HashMap<&str, &str> = HashMap::from([(user_id, nick)]);
        let body = serde_json::json!({
            "access_tokens": [access_token],
            "nicks": nicks,
        });

        let response = self
            .bot(Method::POST, "/users/@me/channels")
            .json(&body)
            .send()
            .await
            .map_err(|e| AppError::discord(e.to_string()))?;

        check_response_json(response).await
    }

    /// Add a recipient to a group DM.
    pub async fn add_recipient(
        &self,
        channel_id: &str,
        user_id: &str,
        access_token: &str,
        nick: &str,
    ) -> Result<(), AppError> {
        let path = format!("/channels/{}/recipients/{}", channel_id, user_id);
        let response = self
            .bot(Method::PUT, &path)
            .json(&serde_json::json!({ "access_token": access_token, "nick": nick }))
            .send()
            .await
            .map_err(|e| AppError::discord(e.to_string()))?;

        check_response(response).await
    }

    pub async fn delete_channel(&self, channel_id: &str) -> Result<(), AppError> {
        let response = self
            .bot(Method::DELETE, &format!("/channels/{}", channel_id))
            .send()
            .await
            .map_err(|e| AppError::discord(e.to_string()))?;

        check_response(response).await
    }
}

/// Check response status and return error if not successful.
async fn check_response(response: reqwest::Response) -> Result<(), AppError> {
    if response.status().is_success() {
        return Ok(());
    }
    Err(upstream_error(response).await)
}

/// Check response and parse JSON body.
async fn check_response_json<T: DeserializeOwned>(response: reqwest::Response) -> Result<T, AppError> {
    if !response.status().is_success() {
        return Err(upstream_error(response).await);
    }

    response
        .json()
        .await
        .map_err(|e| AppError::discord(format!("JSON parse error: {}", e)))
}

async fn upstream_error(response: reqwest::Response) -> AppError {
    let status = response.status();
    let url = response.url().path().to_string();
    let body = response.text().await.unwrap_or_default();

    if status.as_u16() == 429 {
        tracing::warn!(path = %url, "Discord rate limit hit (429)");
    } else {
        tracing::warn!(path = %url, status = %status, body = %body, "Discord request failed");
    }

    AppError::DiscordApi {
        status: Some(status.as_u16()),
        message: format!("HTTP {}: {}", status, body),
    }
}

/// Token response from the OAuth token endpoint.
#[derive(Debug, Clone, Deserialize)]
pub struct TokenResponse {
    pub access_token: String,
    /// Lifetime of `access_token` in seconds
    pub expires_in: i64,
    #[serde(default)]
    pub refresh_token: Option<String>,
    #[serde(default)]
    pub scope: Option<String>,
}

#[derive(Debug, Deserialize)]
struct RpcTokenResponse {
    rpc_token: String,
}

/// Subset of the Discord user object.
#[derive(Debug, Clone, Deserialize)]
pub struct DiscordUser {
    pub id: String,
    #[serde(default)]
    pub username: Option<String>,
}

/// Guild returned on creation.
#[derive(Debug, Clone, Deserialize)]
pub struct DiscordGuild {
    pub id: String,
}

/// Guild entry from the current user's guild list.
#[derive(Debug, Clone, Deserialize)]
pub struct PartialGuild {
    pub id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub owner: bool,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DiscordChannel {
    pub id: String,
}
