// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Match-Relay API Server
//!
//! Links game players' Discord accounts and provisions a guild or group DM
//! for each match.

use anyhow::Context;
use match_relay::{config::Config, AppState};
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_logging();

    // Load configuration from the config file and environment
    let config = Config::load().context("Failed to load configuration")?;
    tracing::info!(
        port = config.port,
        venue = ?config.match_venue,
        snapshot = %config.snapshot_path.display(),
        "Starting Match-Relay API"
    );

    let state = Arc::new(AppState::from_config(config.clone()).await);

    let app = match_relay::routes::create_router(state);

    let addr = format!("0.0.0.0:{}", config.port);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind {}", addr))?;
    tracing::info!(address = %addr, "Server listening");

    axum::serve(listener, app).await.context("Server error")?;
    Ok(())
}

/// Initialize structured JSON logging.
fn init_logging() {
    let format = tracing_subscriber::fmt::layer()
        .json()
        .with_target(false)
        .with_current_span(true)
        .flatten_event(true);

    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("match_relay=debug,info"));

    tracing_subscriber::registry().with(filter).with(format).init();
}
