// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Shared test fixtures: a fake Discord API and an app wired to it.

use axum::{
    extract::{Path, State},
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    routing::{delete, get, post, put},
    Form, Json, Router,
};
use match_relay::config::{Config, VenueKind};
use match_relay::models::User;
use match_relay::routes::create_router;
use match_relay::AppState;
use serde_json::json;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tempfile::TempDir;

/// Token lifetime handed out by the fake (one week).
pub const EXPIRES_IN: i64 = 604_800;

/// In-memory stand-in for the Discord REST API.
#[derive(Default)]
pub struct FakeDiscord {
    seq: AtomicU64,
    calls: Mutex<Vec<String>>,
    owned_guilds: Mutex<Vec<String>>,
    guild_list_broken: AtomicBool,
    refresh_delay_ms: AtomicU64,
}

#[allow(dead_code)]
impl FakeDiscord {
    fn record(&self, call: impl Into<String>) {
        self.calls.lock().unwrap().push(call.into());
    }

    fn next(&self) -> u64 {
        self.seq.fetch_add(1, Ordering::SeqCst) + 1
    }

    /// Every call received, as "METHOD path" strings.
    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    /// Number of calls whose description starts with `prefix`.
    pub fn count(&self, prefix: &str) -> usize {
        self.calls().iter().filter(|c| c.starts_with(prefix)).count()
    }

    pub fn owned_guilds(&self) -> Vec<String> {
        self.owned_guilds.lock().unwrap().clone()
    }

    /// Make `GET /users/@me/guilds` answer 500.
    pub fn break_guild_list(&self) {
        self.guild_list_broken.store(true, Ordering::SeqCst);
    }

    /// Delay every refresh-token grant by `ms`.
    pub fn slow_refresh(&self, ms: u64) {
        self.refresh_delay_ms.store(ms, Ordering::SeqCst);
    }
}

fn bearer(headers: &HeaderMap) -> Option<String> {
    headers
        .get("authorization")
        .and_then(|h| h.to_str().ok())
        .and_then(|h| h.strip_prefix("Bearer "))
        .map(str::to_string)
}

async fn token(
    State(fake): State<Arc<FakeDiscord>>,
    Form(form): Form<HashMap<String, String>>,
) -> Response {
    let grant = form.get("grant_type").cloned().unwrap_or_default();
    fake.record(format!("POST /oauth2/token {}", grant));

    match grant.as_str() {
        "authorization_code" => {
            let code = form.get("code").cloned().unwrap_or_default();
            if code == "bad" {
                return (StatusCode::BAD_REQUEST, Json(json!({ "error": "invalid_grant" })))
                    .into_response();
            }
            Json(json!({
                "access_token": format!("access-{}", code),
                "token_type": "Bearer",
                "expires_in": EXPIRES_IN,
                "refresh_token": format!("refresh-{}", code),
                "scope": "identify guilds.join rpc",
            }))
            .into_response()
        }
        "refresh_token" => {
            let delay = fake.refresh_delay_ms.load(Ordering::SeqCst);
            if delay > 0 {
                tokio::time::sleep(Duration::from_millis(delay)).await;
            }
            let n = fake.next();
            Json(json!({
                "access_token": format!("access-r{}", n),
                "token_type": "Bearer",
                "expires_in": EXPIRES_IN,
                "refresh_token": format!("refresh-r{}", n),
                "scope": "identify guilds.join rpc",
            }))
            .into_response()
        }
        _ => StatusCode::BAD_REQUEST.into_response(),
    }
}

async fn rpc_token(State(fake): State<Arc<FakeDiscord>>) -> Json<serde_json::Value> {
    fake.record("POST /oauth2/token/rpc");
    Json(json!({ "rpc_token": "rpc-token" }))
}

/// Discord id is derived from the access token: `access-abc` -> `discord-abc`.
async fn current_user(State(fake): State<Arc<FakeDiscord>>, headers: HeaderMap) -> Response {
    fake.record("GET /users/@me");
    match bearer(&headers) {
        Some(token) => {
            let id = token.trim_start_matches("access-");
            Json(json!({ "id": format!("discord-{}", id), "username": id })).into_response()
        }
        None => StatusCode::UNAUTHORIZED.into_response(),
    }
}

async fn create_guild(State(fake): State<Arc<FakeDiscord>>) -> Json<serde_json::Value> {
    let id = format!("guild-{}", fake.next());
    fake.record(format!("POST /guilds {}", id));
    // Widen the window for racing joins
    tokio::time::sleep(Duration::from_millis(50)).await;
    fake.owned_guilds.lock().unwrap().push(id.clone());
    Json(json!({ "id": id, "name": "Match" }))
}

async fn add_member(
    State(fake): State<Arc<FakeDiscord>>,
    Path((guild_id, user_id)): Path<(String, String)>,
) -> StatusCode {
    fake.record(format!("PUT /guilds/{}/members/{}", guild_id, user_id));
    StatusCode::CREATED
}

async fn list_guilds(State(fake): State<Arc<FakeDiscord>>) -> Response {
    fake.record("GET /users/@me/guilds");
    if fake.guild_list_broken.load(Ordering::SeqCst) {
        return StatusCode::INTERNAL_SERVER_ERROR.into_response();
    }
    let mut guilds: Vec<serde_json::Value> = fake
        .owned_guilds()
        .into_iter()
        .map(|id| json!({ "id": id, "name": "Match", "owner": true }))
        .collect();
    guilds.push(json!({ "id": "foreign", "name": "Someone else's", "owner": false }));
    Json(json!(guilds)).into_response()
}

async fn delete_guild(
    State(fake): State<Arc<FakeDiscord>>,
    Path(guild_id): Path<String>,
) -> StatusCode {
    fake.record(format!("DELETE /guilds/{}", guild_id));
    let mut owned = fake.owned_guilds.lock().unwrap();
    match owned.iter().position(|g| *g == guild_id) {
        Some(i) => {
            owned.remove(i);
            StatusCode::NO_CONTENT
        }
        None => StatusCode::NOT_FOUND,
    }
}

async fn create_group_dm(
    State(fake): State<Arc<FakeDiscord>>,
    Json(body): Json<serde_json::Value>,
) -> Response {
    if body["access_tokens"].as_array().map_or(true, |a| a.is_empty()) {
        return StatusCode::BAD_REQUEST.into_response();
    }
    let id = format!("channel-{}", fake.next());
    fake.record(format!("POST /users/@me/channels {}", id));
    tokio::time::sleep(Duration::from_millis(50)).await;
    Json(json!({ "id": id, "type": 3 })).into_response()
}

async fn add_recipient(
    State(fake): State<Arc<FakeDiscord>>,
    Path((channel_id, user_id)): Path<(String, String)>,
) -> StatusCode {
    fake.record(format!("PUT /channels/{}/recipients/{}", channel_id, user_id));
    StatusCode::NO_CONTENT
}

async fn delete_channel(
    State(fake): State<Arc<FakeDiscord>>,
    Path(channel_id): Path<String>,
) -> StatusCode {
    fake.record(format!("DELETE /channels/{}", channel_id));
    StatusCode::OK
}

/// Serve a fake Discord API on an ephemeral port; returns its API base URL.
pub async fn spawn_fake_discord() -> (String, Arc<FakeDiscord>) {
    let fake = Arc::new(FakeDiscord::default());

    let app = Router::new()
        .route("/api/oauth2/token", post(token))
        .route("/api/oauth2/token/rpc", post(rpc_token))
        .route("/api/users/@me", get(current_user))
        .route("/api/users/@me/guilds", get(list_guilds))
        .route("/api/users/@me/channels", post(create_group_dm))
        .route("/api/guilds", post(create_guild))
        .route("/api/guilds/{guild_id}", delete(delete_guild))
        .route("/api/guilds/{guild_id}/members/{user_id}", put(add_member))
        .route("/api/channels/{channel_id}", delete(delete_channel))
        .route(
            "/api/channels/{channel_id}/recipients/{user_id}",
            put(add_recipient),
        )
        .with_state(fake.clone());

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    (format!("http://{}/api", addr), fake)
}

/// App under test, backed by a fake Discord and a temporary snapshot.
#[allow(dead_code)]
pub struct TestApp {
    pub router: axum::Router,
    pub state: Arc<AppState>,
    pub fake: Arc<FakeDiscord>,
    pub dir: TempDir,
}

/// Create a test app using `venue` for new matches.
#[allow(dead_code)]
pub async fn create_test_app(venue: VenueKind) -> TestApp {
    let (base_url, fake) = spawn_fake_discord().await;
    let dir = tempfile::tempdir().unwrap();

    let mut config = Config::test_default();
    config.discord_api_base = base_url;
    config.snapshot_path = dir.path().join("discord-server.json");
    config.match_venue = venue;

    let state = Arc::new(AppState::from_config(config).await);

    TestApp {
        router: create_router(state.clone()),
        state,
        fake,
        dir,
    }
}

/// Store a user directly, bypassing the OAuth exchange.
#[allow(dead_code)]
pub async fn seed_user(state: &AppState, id: &str, expires_at: i64) -> User {
    let user = User {
        id: id.to_string(),
        discord_id: format!("discord-{}", id),
        access_token: format!("access-{}", id),
        refresh_token: format!("refresh-{}", id),
        expires_at,
        scope: "identify guilds.join rpc".to_string(),
    };
    let stored = user.clone();
    state
        .store
        .update(move |s| {
            s.upsert_user(stored);
            Ok(())
        })
        .await
        .unwrap();
    user
}

/// An expiry comfortably in the future.
#[allow(dead_code)]
pub fn fresh_expiry() -> i64 {
    match_relay::time_utils::now_epoch_secs() + EXPIRES_IN
}
