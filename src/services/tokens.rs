// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! OAuth token lifecycle for linked users.

use crate::db::SnapshotStore;
use crate::error::AppError;
use crate::models::User;
use crate::services::discord::DiscordClient;
use crate::time_utils::now_epoch_secs;
use dashmap::DashMap;
use std::sync::Arc;
use tokio::sync::Mutex;

/// Margin before token expiration when we refresh (1 minute).
pub const TOKEN_REFRESH_MARGIN_SECS: i64 = 60;

/// Per-user refresh locks.
pub type RefreshLocks = Arc<DashMap<String, Arc<Mutex<()>>>>;

/// Exchanges and refreshes Discord OAuth tokens, keeping the store current.
///
/// Refresh is lazy: it happens when a caller asks for a user whose token is
/// expired or about to expire.
#[derive(Clone)]
pub struct TokenService {
    discord: DiscordClient,
    store: Arc<SnapshotStore>,
    /// Per-user mutex to serialize token refresh operations.
    refresh_locks: RefreshLocks,
}

impl TokenService {
    pub fn new(discord: DiscordClient, store: Arc<SnapshotStore>) -> Self {
        Self {
            discord,
            store,
            refresh_locks: Arc::new(DashMap::new()),
        }
    }

    /// Token for the game client's local RPC authorization.
    pub async fn rpc_token(&self) -> Result<String, AppError> {
        self.discord.rpc_token().await
    }

    /// Exchange an authorization code and link the result to `id`.
    ///
    /// Replaces any existing record for `id`. Holds the user's refresh lock,
    /// so an in-flight refresh finishes before the new link is written.
    pub async fn exchange(&self, id: &str, code: &str) -> Result<User, AppError> {
        let lock = self.user_lock(id);
        let _guard = lock.lock().await;

        let tokens = self.discord.exchange_code(code).await?;
        let profile = self.discord.current_user(&tokens.access_token).await?;

        let user = User {
            id: id.to_string(),
            discord_id: profile.id,
            access_token: tokens.access_token,
            refresh_token: tokens.refresh_token.unwrap_or_default(),
            expires_at: now_epoch_secs() + tokens.expires_in,
            scope: tokens.scope.unwrap_or_default(),
        };

        let stored = user.clone();
        self.store
            .update(move |s| {
                s.upsert_user(stored);
                Ok(())
            })
            .await?;

        tracing::info!(
            user_id = %user.id,
            discord_id = %user.discord_id,
            expires_at = user.expires_at,
            "Code exchanged, user linked"
        );
        Ok(user)
    }

    /// Refresh `user`'s tokens unconditionally.
    ///
    /// The new `expires_at` is always later than the old one. If the stored
    /// record no longer carries the refresh token that was spent, it was
    /// replaced meanwhile and is returned unchanged.
    pub async fn refresh(&self, user: &User) -> Result<User, AppError> {
        let tokens = self.discord.refresh_token(&user.refresh_token).await?;

        let expires_at = (now_epoch_secs() + tokens.expires_in).max(user.expires_at + 1);
        let refreshed = User {
            access_token: tokens.access_token,
            refresh_token: tokens
                .refresh_token
                .unwrap_or_else(|| user.refresh_token.clone()),
            expires_at,
            scope: tokens.scope.unwrap_or_else(|| user.scope.clone()),
            ..user.clone()
        };

        let spent = user.refresh_token.clone();
        let (current, applied) = self
            .store
            .update(move |s| {
                let relinked = s
                    .user(&refreshed.id)
                    .filter(|existing| existing.refresh_token != spent)
                    .cloned();
                if let Some(existing) = relinked {
                    return Ok((existing, false));
                }
                s.upsert_user(refreshed.clone());
                Ok((refreshed, true))
            })
            .await?;

        if applied {
            tracing::info!(user_id = %user.id, expires_at, "Token refreshed");
        } else {
            tracing::warn!(
                user_id = %user.id,
                "User relinked during refresh, keeping stored tokens"
            );
        }
        Ok(current)
    }

    /// Look up a user, refreshing their token first if it has expired.
    pub async fn ensure_fresh(&self, id: &str) -> Result<User, AppError> {
        let user = self.lookup(id).await?;
        if !user.needs_refresh(now_epoch_secs(), TOKEN_REFRESH_MARGIN_SECS) {
            return Ok(user);
        }

        let lock = self.user_lock(id);
        let _guard = lock.lock().await;

        // Another request may have refreshed while we waited
        let user = self.lookup(id).await?;
        if !user.needs_refresh(now_epoch_secs(), TOKEN_REFRESH_MARGIN_SECS) {
            return Ok(user);
        }

        tracing::info!(user_id = %id, "Access token expired, refreshing");
        self.refresh(&user).await
    }

    fn user_lock(&self, id: &str) -> Arc<Mutex<()>> {
        self.refresh_locks
            .entry(id.to_string())
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone()
    }

    async fn lookup(&self, id: &str) -> Result<User, AppError> {
        self.store
            .read(|s| s.user(id).cloned())
            .await
            .ok_or_else(|| AppError::InvalidId(format!("unknown user {}", id)))
    }
}
