//! Errors raised by the SQLite completed-game store.

use derive_more::{Display, Error};
use tracing::instrument;

/// Stage of a store operation that failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
pub enum DbErrorKind {
    /// Opening the database file.
    #[display("connection")]
    Connection,
    /// Applying embedded migrations.
    #[display("migration")]
    Migration,
    /// Running an insert or select.
    #[display("query")]
    Query,
    /// Converting between a row and a completed game.
    #[display("row")]
    Row,
}

/// Completed-game store failure with the location that raised it.
#[derive(Debug, Clone, Display, Error)]
#[display("Completed-game store {} failed: {} at {}:{}", kind, message, file, line)]
pub struct DbError {
    /// Failed stage.
    pub kind: DbErrorKind,
    /// What went wrong.
    pub message: String,
    /// Line number where error occurred.
    pub line: u32,
    /// Source file where error occurred.
    pub file: &'static str,
}

impl DbError {
    /// Creates an error at the caller's location.
    #[track_caller]
    #[instrument(skip(message))]
    pub fn new(kind: DbErrorKind, message: impl Into<String>) -> Self {
        let loc = std::panic::Location::caller();
        Self {
            kind,
            message: message.into(),
            line: loc.line(),
            file: loc.file(),
        }
    }
}

impl From<diesel::result::Error> for DbError {
    #[track_caller]
    fn from(err: diesel::result::Error) -> Self {
        Self::new(DbErrorKind::Query, err.to_string())
    }
}

impl From<diesel::ConnectionError> for DbError {
    #[track_caller]
    fn from(err: diesel::ConnectionError) -> Self {
        Self::new(DbErrorKind::Connection, err.to_string())
    }
}

impl From<serde_json::Error> for DbError {
    #[track_caller]
    fn from(err: serde_json::Error) -> Self {
        Self::new(DbErrorKind::Row, format!("board JSON is malformed: {}", err))
    }
}
