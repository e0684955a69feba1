//! Database models and their mapping to domain types.

use arena_board::{Board, WinLine, Winner};
use chrono::NaiveDateTime;
use derive_getters::Getters;
use derive_new::new;
use diesel::prelude::*;
use tracing::instrument;

use crate::db::{DbError, DbErrorKind, schema};
use crate::store::{CompletedGame, NewCompletedGame};

/// Completed game database model.
#[derive(Debug, Clone, Queryable, Identifiable, Selectable, Getters)]
#[diesel(table_name = schema::completed_games)]
pub struct CompletedGameRecord {
    id: i32,
    winner: String,
    grid_size: i32,
    final_board: String,
    winning_line: Option<String>,
    created_at: NaiveDateTime,
}

impl CompletedGameRecord {
    /// Decodes the stored row into a [`CompletedGame`].
    ///
    /// # Errors
    ///
    /// Returns [`DbError`] if the winner or the JSON columns are malformed.
    #[instrument(skip(self), fields(id = self.id))]
    pub fn into_domain(self) -> Result<CompletedGame, DbError> {
        let winner = winner_from_db(&self.winner)?;
        let final_board: Board = serde_json::from_str(&self.final_board)?;
        let winning_line: Option<WinLine> = self
            .winning_line
            .as_deref()
            .map(serde_json::from_str)
            .transpose()?;
        let grid_size = usize::try_from(self.grid_size).map_err(|_| {
            DbError::new(DbErrorKind::Row, format!("invalid grid size {}", self.grid_size))
        })?;

        Ok(CompletedGame::new(
            i64::from(self.id),
            winner,
            grid_size,
            final_board,
            winning_line,
            self.created_at,
        ))
    }
}

/// Insertable completed game.
#[derive(Debug, Clone, Insertable, new, Getters)]
#[diesel(table_name = schema::completed_games)]
pub struct NewCompletedGameRecord {
    winner: String,
    grid_size: i32,
    final_board: String,
    winning_line: Option<String>,
}

impl NewCompletedGameRecord {
    /// Encodes a domain game for insertion.
    ///
    /// # Errors
    ///
    /// Returns [`DbError`] if the board cannot be encoded.
    #[instrument(skip(game), fields(winner = %game.winner()))]
    pub fn from_domain(game: &NewCompletedGame) -> Result<Self, DbError> {
        let grid_size = i32::try_from(*game.grid_size()).map_err(|_| {
            DbError::new(DbErrorKind::Row, format!("invalid grid size {}", game.grid_size()))
        })?;
        let winning_line = game
            .winning_line()
            .as_ref()
            .map(serde_json::to_string)
            .transpose()?;
        Ok(Self::new(
            game.winner().to_string(),
            grid_size,
            serde_json::to_string(game.final_board())?,
            winning_line,
        ))
    }
}

/// Parses a winner from the string stored in the database.
fn winner_from_db(s: &str) -> Result<Winner, DbError> {
    match s {
        "X" => Ok(Winner::X),
        "O" => Ok(Winner::O),
        "draw" => Ok(Winner::Draw),
        _ => Err(DbError::new(DbErrorKind::Row, format!("unknown winner '{}'", s))),
    }
}
