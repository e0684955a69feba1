//! SQLite persistence for completed games.

mod error;
mod models;
mod repository;
mod schema; // Diesel generated schema - internal use only

pub use error::{DbError, DbErrorKind};
pub use models::{CompletedGameRecord, NewCompletedGameRecord};
pub use repository::GameRepository;
