// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Snapshot-backed store for users and matches.
//!
//! The whole state lives in memory behind one mutex and is written to a
//! single JSON snapshot after every mutation:
//! - Mutations run against a copy, which replaces the live state only once
//!   the snapshot has been written
//! - Writes go to `<path>.tmp` and are renamed over the snapshot
//! - A missing or unreadable snapshot loads as an empty store

use anyhow::Context;
use crate::error::AppError;
use crate::models::{Game, User};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use tokio::sync::Mutex;

/// Current snapshot schema version.
pub const SNAPSHOT_VERSION: u32 = 1;

/// Everything the relay remembers between restarts.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoreState {
    /// Last issued game id
    pub counter: u64,
    pub users: BTreeMap<String, User>,
    /// Active games, oldest first
    pub games: Vec<Game>,
}

impl StoreState {
    /// Issue the next game id. Ids are never reused.
    pub fn next_game_id(&mut self) -> u64 {
        self.counter += 1;
        self.counter
    }

    pub fn user(&self, id: &str) -> Option<&User> {
        self.users.get(id)
    }

    pub fn upsert_user(&mut self, user: User) {
        self.users.insert(user.id.clone(), user);
    }

    pub fn game(&self, id: u64) -> Option<&Game> {
        self.games.iter().find(|g| g.id == id)
    }

    pub fn game_mut(&mut self, id: u64) -> Option<&mut Game> {
        self.games.iter_mut().find(|g| g.id == id)
    }

    /// Remove every game, returning what was removed.
    pub fn clear_games(&mut self) -> Vec<Game> {
        std::mem::take(&mut self.games)
    }
}

#[derive(Serialize)]
struct SnapshotOut<'a> {
    version: u32,
    #[serde(flatten)]
    state: &'a StoreState,
}

#[derive(Deserialize)]
struct SnapshotIn {
    version: u32,
    #[serde(flatten)]
    state: StoreState,
}

/// Why a snapshot could not be used.
#[derive(Debug, thiserror::Error)]
pub enum SnapshotError {
    #[error("snapshot not found")]
    Missing,
    #[error("failed to read snapshot: {0}")]
    Io(#[from] std::io::Error),
    #[error("corrupt snapshot: {0}")]
    Corrupt(#[from] serde_json::Error),
    #[error("unsupported snapshot version {0}")]
    Version(u32),
}

/// Read and decode a snapshot file.
pub async fn read_snapshot(path: &Path) -> Result<StoreState, SnapshotError> {
    let bytes = match tokio::fs::read(path).await {
        Ok(b) => b,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Err(SnapshotError::Missing),
        Err(e) => return Err(e.into()),
    };
    let snapshot: SnapshotIn = serde_json::from_slice(&bytes)?;
    if snapshot.version != SNAPSHOT_VERSION {
        return Err(SnapshotError::Version(snapshot.version));
    }
    Ok(snapshot.state)
}

/// Encode and atomically write a snapshot file.
pub async fn write_snapshot(path: &Path, state: &StoreState) -> Result<(), AppError> {
    let json = serde_json::to_vec_pretty(&SnapshotOut {
        version: SNAPSHOT_VERSION,
        state,
    })
    .context("Failed to encode snapshot")?;

    let mut tmp = path.as_os_str().to_owned();
    tmp.push(".tmp");
    let tmp = PathBuf::from(tmp);

    tokio::fs::write(&tmp, &json)
        .await
        .map_err(|e| AppError::Storage(format!("Failed to write {}: {}", tmp.display(), e)))?;
    tokio::fs::rename(&tmp, path)
        .await
        .map_err(|e| AppError::Storage(format!("Failed to replace {}: {}", path.display(), e)))?;
    Ok(())
}

/// In-memory store persisted to a snapshot file.
pub struct SnapshotStore {
    path: PathBuf,
    state: Mutex<StoreState>,
}

impl SnapshotStore {
    /// Load the store from `path`, falling back to an empty store.
    ///
    /// Load failures are logged, never returned. A corrupt file is left
    /// in place until the next save replaces it.
    pub async fn open(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let state = match read_snapshot(&path).await {
            Ok(state) => {
                tracing::info!(
                    path = %path.display(),
                    users = state.users.len(),
                    games = state.games.len(),
                    "Loaded snapshot"
                );
                state
            }
            Err(SnapshotError::Missing) => {
                tracing::info!(path = %path.display(), "No snapshot, starting empty");
                StoreState::default()
            }
            Err(e) => {
                tracing::warn!(path = %path.display(), error = %e, "Ignoring unusable snapshot, starting empty");
                StoreState::default()
            }
        };

        Self {
            path,
            state: Mutex::new(state),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Run a read-only closure against the current state.
    pub async fn read<R>(&self, f: impl FnOnce(&StoreState) -> R) -> R {
        let state = self.state.lock().await;
        f(&state)
    }

    /// Apply a mutation and persist it.
    ///
    /// If `f` fails or the snapshot cannot be written, the live state is
    /// left untouched.
    pub async fn update<R>(
        &self,
        f: impl FnOnce(&mut StoreState) -> Result<R, AppError>,
    ) -> Result<R, AppError> {
        let mut state = self.state.lock().await;
        let mut next = state.clone();
        let result = f(&mut next)?;
        write_snapshot(&self.path, &next).await?;
        *state = next;
        Ok(result)
    }

    /// Copy of the full state.
    pub async fn snapshot(&self) -> StoreState {
        self.state.lock().await.clone()
    }
}
