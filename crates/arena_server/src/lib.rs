//! Tic-tac-toe arena server.
//!
//! Human-vs-oracle NxN tic-tac-toe sessions over HTTP.
//!
//! # Architecture
//!
//! - **Oracle**: asks an LLM for the opponent's move and falls back to a
//!   random empty square whenever the answer is unusable
//! - **Engine**: applies human moves and opponent replies per session
//! - **Store**: records finished games in SQLite (or memory)
//! - **HTTP**: REST API under `/api/game`
//!
//! # Example
//!
//! ```no_run
//! use arena_server::{
//!     InMemorySessionStore, MemoryGameStore, MoveOracle, OfflineSource, SessionEngine,
//! };
//! use std::sync::Arc;
//! use std::time::Duration;
//!
//! # async fn example() -> anyhow::Result<()> {
//! let engine = SessionEngine::new(
//!     Arc::new(InMemorySessionStore::new()),
//!     Arc::new(MoveOracle::new(OfflineSource, Duration::from_secs(5))),
//!     Arc::new(MemoryGameStore::new()),
//! );
//! let view = engine.create(None, 3)?;
//! let view = engine.apply_human_move(&view.game_id, arena_board::Position::new(1, 1)).await?;
//! println!("{}", view.board.display());
//! # Ok(())
//! # }
//! ```

#![warn(missing_docs)]
#![forbid(unsafe_code)]

// Private module declarations
mod config;
mod engine;
mod llm_client;
mod oracle;
mod server;
mod session;
mod store;

pub mod db;
pub mod http;

// Crate-level exports - Configuration
pub use config::{ConfigError, OracleBackend, OracleConfig, ServerConfig};

// Crate-level exports - Engine
pub use engine::{ALREADY_OVER_MESSAGE, EngineError, Evaluation, MoveSuggestionView, SessionEngine};

// Crate-level exports - LLM client
pub use llm_client::{LlmClient, LlmConfig, LlmError, LlmProvider};

// Crate-level exports - Oracle
pub use oracle::{
    LlmMoveSource, MoveOracle, MoveSource, NoLegalMove, OfflineSource, SourceError, Suggestion,
    build_prompt, parse_suggestion,
};

// Crate-level exports - Wiring
pub use server::{build_engine, build_oracle, build_store, serve};

// Crate-level exports - Sessions
pub use session::{
    InMemorySessionStore, Session, SessionHandle, SessionId, SessionStatus, SessionStore,
    SessionView,
};

// Crate-level exports - Completed games
pub use store::{
    CompletedGame, CompletedGameStore, MAX_LISTED_GAMES, MemoryGameStore, NewCompletedGame,
    StoreError,
};
