// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Match management routes.

use axum::{
    extract::{Path, State},
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use validator::Validate;

use crate::error::{AppError, Result};
use crate::models::Venue;
use crate::AppState;

pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/create_match", post(create_match))
        .route("/find_match", post(find_match))
        .route("/join_match/{game_id}", post(join_match))
        .route("/end_match", post(end_match))
        .route("/delete_all_servers", get(delete_all_servers))
}

#[derive(Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct MatchResponse {
    pub game_id: u64,
}

#[derive(Deserialize, Validate)]
pub struct JoinMatchRequest {
    #[validate(length(min = 1, max = 64))]
    id: String,
    #[serde(default)]
    #[validate(length(min = 1, max = 32))]
    discord_id: Option<String>,
}

async fn create_match(State(state): State<Arc<AppState>>) -> Result<Json<MatchResponse>> {
    let game = state.matches.create_match().await?;
    Ok(Json(MatchResponse { game_id: game.id }))
}

async fn find_match(State(state): State<Arc<AppState>>) -> Result<Json<MatchResponse>> {
    let game = state.matches.find_match().await?;
    Ok(Json(MatchResponse { game_id: game.id }))
}

/// Join a match; responds with `{guild_id}` or `{channel_id}`.
async fn join_match(
    State(state): State<Arc<AppState>>,
    Path(game_id): Path<u64>,
    Json(body): Json<JoinMatchRequest>,
) -> Result<Json<Venue>> {
    body.validate()
        .map_err(|e| AppError::BadRequest(e.to_string()))?;

    let venue = state
        .matches
        .join_match(game_id, &body.id, body.discord_id.as_deref())
        .await?;
    Ok(Json(venue))
}

async fn end_match(State(state): State<Arc<AppState>>) -> Result<()> {
    state.matches.end_match().await
}

async fn delete_all_servers(State(state): State<Arc<AppState>>) -> Result<()> {
    state.matches.delete_all_servers().await
}
