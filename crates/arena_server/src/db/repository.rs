//! Database repository for completed games.

use async_trait::async_trait;
use diesel::prelude::*;
use diesel_migrations::{EmbeddedMigrations, MigrationHarness, embed_migrations};
use tracing::{debug, info, instrument};

use crate::db::{CompletedGameRecord, DbError, DbErrorKind, NewCompletedGameRecord, schema};
use crate::store::{CompletedGame, CompletedGameStore, NewCompletedGame, StoreError};

const MIGRATIONS: EmbeddedMigrations = embed_migrations!("migrations");

/// Database repository for completed games.
#[derive(Debug, Clone)]
pub struct GameRepository {
    db_path: String,
}

impl GameRepository {
    /// Opens the database at the given path and applies pending migrations.
    ///
    /// The file is created if it does not exist.
    ///
    /// # Errors
    ///
    /// Returns [`DbError`] if the database cannot be opened or migrated.
    #[instrument(skip(db_path), fields(db_path = %db_path))]
    pub fn open(db_path: String) -> Result<Self, DbError> {
        info!(path = %db_path, "Opening GameRepository");
        let repo = Self { db_path };
        let mut conn = repo.connection()?;
        let applied = conn
            .run_pending_migrations(MIGRATIONS)
            .map_err(|e| DbError::new(DbErrorKind::Migration, e.to_string()))?;
        info!(applied = applied.len(), "Migrations applied");
        Ok(repo)
    }

    /// Establishes a database connection.
    #[instrument(skip(self))]
    fn connection(&self) -> Result<SqliteConnection, DbError> {
        debug!(path = %self.db_path, "Establishing connection");
        SqliteConnection::establish(&self.db_path).map_err(|e| {
            DbError::new(DbErrorKind::Connection, format!("'{}': {}", self.db_path, e))
        })
    }

    /// Records a completed game.
    ///
    /// # Errors
    ///
    /// Returns [`DbError`] if a database error occurs.
    #[instrument(skip(self, game), fields(winner = %game.winner(), grid_size = game.grid_size()))]
    pub fn record_game(&self, game: &NewCompletedGame) -> Result<CompletedGame, DbError> {
        debug!("Recording completed game");
        let row = NewCompletedGameRecord::from_domain(game)?;
        let mut conn = self.connection()?;

        let stored = diesel::insert_into(schema::completed_games::table)
            .values(&row)
            .returning(CompletedGameRecord::as_returning())
            .get_result(&mut conn)?;

        info!(game_id = stored.id(), winner = %stored.winner(), "Completed game recorded");
        stored.into_domain()
    }

    /// Gets up to `limit` completed games, most recent first.
    ///
    /// # Errors
    ///
    /// Returns [`DbError`] if a database error occurs or a row is malformed.
    #[instrument(skip(self))]
    pub fn recent_games(&self, limit: usize) -> Result<Vec<CompletedGame>, DbError> {
        debug!(limit, "Loading completed games");
        let mut conn = self.connection()?;

        let rows = schema::completed_games::table
            .order((
                schema::completed_games::created_at.desc(),
                schema::completed_games::id.desc(),
            ))
            .limit(i64::try_from(limit).unwrap_or(i64::MAX))
            .select(CompletedGameRecord::as_select())
            .load::<CompletedGameRecord>(&mut conn)?;

        info!(count = rows.len(), "Completed games loaded");
        rows.into_iter().map(CompletedGameRecord::into_domain).collect()
    }
}

#[async_trait]
impl CompletedGameStore for GameRepository {
    async fn record(&self, game: NewCompletedGame) -> Result<CompletedGame, StoreError> {
        let repo = self.clone();
        tokio::task::spawn_blocking(move || repo.record_game(&game))
            .await
            .map_err(|e| StoreError::new(format!("Store task failed: {}", e)))?
            .map_err(StoreError::from)
    }

    async fn recent(&self, limit: usize) -> Result<Vec<CompletedGame>, StoreError> {
        let repo = self.clone();
        tokio::task::spawn_blocking(move || repo.recent_games(limit))
            .await
            .map_err(|e| StoreError::new(format!("Store task failed: {}", e)))?
            .map_err(StoreError::from)
    }
}
