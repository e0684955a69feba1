//! Wiring: builds the oracle, stores and engine from configuration and
//! runs the HTTP server.

use crate::config::{OracleConfig, ServerConfig};
use crate::db::{DbError, GameRepository};
use crate::engine::SessionEngine;
use crate::http;
use crate::llm_client::LlmClient;
use crate::oracle::{LlmMoveSource, MoveOracle, OfflineSource};
use crate::session::InMemorySessionStore;
use crate::store::{CompletedGameStore, MemoryGameStore};
use anyhow::Result;
use std::sync::Arc;
use tracing::{info, instrument, warn};

/// Builds the move oracle for the configured backend.
///
/// Missing credentials or a client that cannot be built leave the oracle
/// on random moves so the game stays playable.
#[instrument(skip(config), fields(provider = %config.provider()))]
pub fn build_oracle(config: &OracleConfig) -> MoveOracle {
    let timeout = config.timeout();
    let llm_config = match config.create_llm_config() {
        Ok(Some(llm_config)) => llm_config,
        Ok(None) => {
            info!("Using random move oracle");
            return MoveOracle::new(OfflineSource, timeout);
        }
        Err(e) => {
            warn!(error = %e, "LLM oracle unavailable, falling back to random moves");
            return MoveOracle::new(OfflineSource, timeout);
        }
    };

    match LlmClient::new(llm_config) {
        Ok(client) => {
            info!(model = %config.model(), "Using LLM move oracle");
            MoveOracle::new(LlmMoveSource::new(client), timeout)
        }
        Err(e) => {
            warn!(error = %e, "Failed to build LLM client, falling back to random moves");
            MoveOracle::new(OfflineSource, timeout)
        }
    }
}

/// Opens the completed-game store: SQLite if a path is given, else memory.
///
/// # Errors
///
/// Returns [`DbError`] if the database cannot be opened or migrated.
#[instrument]
pub fn build_store(db_path: Option<&str>) -> Result<Arc<dyn CompletedGameStore>, DbError> {
    match db_path {
        Some(path) => Ok(Arc::new(GameRepository::open(path.to_string())?)),
        None => {
            info!("No database configured, completed games are kept in memory");
            Ok(Arc::new(MemoryGameStore::new()))
        }
    }
}

/// Builds a session engine from configuration.
///
/// # Errors
///
/// Returns [`DbError`] if the completed-game store cannot be opened.
pub fn build_engine(config: &ServerConfig) -> Result<SessionEngine, DbError> {
    let store = build_store(config.db_path().as_deref())?;
    let oracle = Arc::new(build_oracle(config.oracle()));
    Ok(SessionEngine::new(
        Arc::new(InMemorySessionStore::new()),
        oracle,
        store,
    ))
}

/// Serves the HTTP API until the process is stopped.
#[instrument(skip(config), fields(address = %config.bind_address()))]
pub async fn serve(config: ServerConfig) -> Result<()> {
    let engine = build_engine(&config)?;
    let app = http::router(engine);

    let listener = tokio::net::TcpListener::bind(config.bind_address()).await?;
    info!(address = %config.bind_address(), "Server ready");

    axum::serve(listener, app).await?;
    info!("Server stopped");
    Ok(())
}
