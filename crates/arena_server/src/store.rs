//! Completed-game store.
//!
//! Finished games are appended here. The engine never reads them back and
//! never lets a failure here affect a session.

use arena_board::{Board, WinLine, Winner};
use async_trait::async_trait;
use chrono::NaiveDateTime;
use derive_getters::Getters;
use derive_more::{Display, Error};
use derive_new::new;
use serde::{Deserialize, Serialize};
use std::sync::{Arc, Mutex};
use tracing::{debug, instrument};

/// Most games returned by a listing.
pub const MAX_LISTED_GAMES: usize = 100;

/// A finished game ready to be recorded.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Getters, new)]
#[serde(rename_all = "camelCase")]
pub struct NewCompletedGame {
    winner: Winner,
    grid_size: usize,
    final_board: Board,
    winning_line: Option<WinLine>,
}

/// A recorded game.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Getters, new)]
#[serde(rename_all = "camelCase")]
pub struct CompletedGame {
    id: i64,
    winner: Winner,
    grid_size: usize,
    final_board: Board,
    #[serde(skip_serializing_if = "Option::is_none")]
    winning_line: Option<WinLine>,
    created_at: NaiveDateTime,
}

/// Append-only storage for finished games.
#[async_trait]
pub trait CompletedGameStore: Send + Sync {
    /// Records a finished game.
    async fn record(&self, game: NewCompletedGame) -> Result<CompletedGame, StoreError>;

    /// Returns up to `limit` games, most recent first.
    async fn recent(&self, limit: usize) -> Result<Vec<CompletedGame>, StoreError>;
}

/// In-memory store, used when no database is configured.
#[derive(Debug, Clone, Default)]
pub struct MemoryGameStore {
    games: Arc<Mutex<Vec<CompletedGame>>>,
}

impl MemoryGameStore {
    /// Creates an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of recorded games.
    pub fn len(&self) -> usize {
        self.lock().len()
    }

    /// True if nothing has been recorded.
    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    /// Copies of all recorded games, oldest first.
    pub fn games(&self) -> Vec<CompletedGame> {
        self.lock().clone()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Vec<CompletedGame>> {
        self.games
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

#[async_trait]
impl CompletedGameStore for MemoryGameStore {
    #[instrument(skip(self, game), fields(winner = %game.winner, grid_size = game.grid_size))]
    async fn record(&self, game: NewCompletedGame) -> Result<CompletedGame, StoreError> {
        let mut games = self.lock();
        let recorded = CompletedGame::new(
            games.len() as i64 + 1,
            game.winner,
            game.grid_size,
            game.final_board,
            game.winning_line,
            chrono::Utc::now().naive_utc(),
        );
        games.push(recorded.clone());
        debug!(id = recorded.id, "Game recorded in memory");
        Ok(recorded)
    }

    #[instrument(skip(self))]
    async fn recent(&self, limit: usize) -> Result<Vec<CompletedGame>, StoreError> {
        Ok(self.lock().iter().rev().take(limit).cloned().collect())
    }
}

/// Completed-game store error.
#[derive(Debug, Clone, Display, Error)]
#[display("Store error: {} at {}:{}", message, file, line)]
pub struct StoreError {
    /// Error message.
    pub message: String,
    /// Line number where error occurred.
    pub line: u32,
    /// Source file where error occurred.
    pub file: &'static str,
}

impl StoreError {
    /// Creates a new store error with caller location tracking.
    #[track_caller]
    pub fn new(message: impl Into<String>) -> Self {
        let loc = std::panic::Location::caller();
        Self {
            message: message.into(),
            line: loc.line(),
            file: loc.file(),
        }
    }
}

impl From<crate::db::DbError> for StoreError {
    #[track_caller]
    fn from(err: crate::db::DbError) -> Self {
        Self::new(err.to_string())
    }
}
