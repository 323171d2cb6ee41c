// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Discord OAuth routes.

use axum::{
    extract::State,
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use validator::Validate;

use crate::error::{AppError, Result};
use crate::models::User;
use crate::AppState;

pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/discord_auth", get(discord_auth))
        .route("/discord_exchange_code", post(exchange_code))
        .route("/login", post(login))
}

#[derive(Serialize)]
pub struct RpcTokenResponse {
    pub rpc_token: String,
}

/// Linked user as seen by the game client.
#[derive(Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct UserResponse {
    pub access_token: String,
    pub discord_id: String,
    pub id: String,
}

impl From<User> for UserResponse {
    fn from(user: User) -> Self {
        Self {
            access_token: user.access_token,
            discord_id: user.discord_id,
            id: user.id,
        }
    }
}

#[derive(Deserialize, Validate)]
pub struct ExchangeCodeRequest {
    #[validate(length(min = 1, max = 512))]
    code: String,
    #[validate(length(min = 1, max = 64))]
    id: String,
}

#[derive(Deserialize, Validate)]
pub struct LoginRequest {
    #[validate(length(min = 1, max = 64))]
    id: String,
}

/// Fetch an RPC token for the client to start authorization with.
async fn discord_auth(State(state): State<Arc<AppState>>) -> Result<Json<RpcTokenResponse>> {
    let rpc_token = state.tokens.rpc_token().await?;
    Ok(Json(RpcTokenResponse { rpc_token }))
}

/// Exchange the code returned by the client's AUTHORIZE command.
async fn exchange_code(
    State(state): State<Arc<AppState>>,
    Json(body): Json<ExchangeCodeRequest>,
) -> Result<Json<UserResponse>> {
    body.validate()
        .map_err(|e| AppError::BadRequest(e.to_string()))?;

    let user = state.tokens.exchange(&body.id, &body.code).await?;
    Ok(Json(user.into()))
}

/// Return a previously linked user, refreshing their token if needed.
async fn login(
    State(state): State<Arc<AppState>>,
    Json(body): Json<LoginRequest>,
) -> Result<Json<UserResponse>> {
    body.validate()
        .map_err(|e| AppError::BadRequest(e.to_string()))?;

    let user = state.tokens.ensure_fresh(&body.id).await?;
    tracing::info!(user_id = %user.id, "User logged in");
    Ok(Json(user.into()))
}
