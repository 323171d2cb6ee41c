// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Application error types with consistent API responses.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;

/// Application error type that converts to HTTP responses.
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    /// Unknown user or game id.
    #[error("Invalid id: {0}")]
    InvalidId(String),

    #[error("No active match")]
    NoActiveMatch,

    #[error("Invalid request: {0}")]
    BadRequest(String),

    /// Discord rejected a call or could not be reached.
    ///
    /// `status` carries the upstream HTTP status when there was one.
    #[error("Discord API error: {message}")]
    DiscordApi {
        status: Option<u16>,
        message: String,
    },

    #[error("Storage error: {0}")]
    Storage(String),

    #[error("Internal server error: {0}")]
    Internal(#[from] anyhow::Error),
}

impl AppError {
    /// Transport or decode failure talking to Discord (no upstream status).
    pub fn discord(message: impl Into<String>) -> Self {
        AppError::DiscordApi {
            status: None,
            message: message.into(),
        }
    }

    /// Upstream status, if this error came from a Discord response.
    pub fn upstream_status(&self) -> Option<u16> {
        match self {
            AppError::DiscordApi { status, .. } => *status,
            _ => None,
        }
    }
}

/// JSON error response body
#[derive(Serialize)]
struct ErrorResponse {
    error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    details: Option<String>,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, error, details) = match &self {
            AppError::InvalidId(msg) => (StatusCode::BAD_REQUEST, "invalid_id", Some(msg.clone())),
            AppError::NoActiveMatch => (StatusCode::BAD_REQUEST, "no_match", None),
            AppError::BadRequest(msg) => {
                (StatusCode::BAD_REQUEST, "bad_request", Some(msg.clone()))
            }
            AppError::DiscordApi { status, message } => {
                let status = status
                    .and_then(|s| StatusCode::from_u16(s).ok())
                    .unwrap_or(StatusCode::BAD_GATEWAY);
                (status, "discord_error", Some(message.clone()))
            }
            AppError::Storage(msg) => {
                tracing::error!(error = %msg, "Storage error");
                (StatusCode::INTERNAL_SERVER_ERROR, "storage_error", None)
            }
            AppError::Internal(err) => {
                tracing::error!(error = format!("{:#}", err), "Internal server error");
                (StatusCode::INTERNAL_SERVER_ERROR, "internal_error", None)
            }
        };

        let body = ErrorResponse {
            error: error.to_string(),
            details,
        };

        (status, Json(body)).into_response()
    }
}

/// Result type alias for handlers
pub type Result<T> = std::result::Result<T, AppError>;
