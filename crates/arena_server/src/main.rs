//! Tic-tac-toe arena - unified CLI

mod cli;

use anyhow::Result;
use arena_board::{RawSnapshot, evaluate, validate};
use arena_server::ServerConfig;
use arena_server::db::GameRepository;
use clap::Parser;
use cli::{Cli, Command};
use std::path::PathBuf;
use tracing::{info, instrument};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();

    match cli.command {
        Command::Serve {
            config,
            host,
            port,
            db_path,
        } => run_server(config, host, port, db_path).await,
        Command::Evaluate { file } => run_evaluate(file),
        Command::Completed { db_path, limit } => run_completed(db_path, limit),
    }
}

/// Run the HTTP game server
#[instrument]
async fn run_server(
    config: Option<PathBuf>,
    host: Option<String>,
    port: Option<u16>,
    db_path: Option<String>,
) -> Result<()> {
    let mut server_config = match config {
        Some(path) => ServerConfig::from_file(path)?,
        None => ServerConfig::default(),
    }
    .with_env_overrides();

    // Command-line flags win over file and environment
    if let Some(host) = host {
        server_config = server_config.with_host(host);
    }
    if let Some(port) = port {
        server_config = server_config.with_port(port);
    }
    if let Some(db_path) = db_path {
        server_config = server_config.with_db_path(db_path);
    }

    info!(address = %server_config.bind_address(), "Starting tic-tac-toe arena");
    arena_server::serve(server_config).await
}

/// Evaluate a snapshot file and print the result
#[instrument]
fn run_evaluate(file: PathBuf) -> Result<()> {
    let content = std::fs::read_to_string(&file)?;
    let raw: RawSnapshot = serde_json::from_str(&content)?;
    let snapshot = validate(&raw)?;
    let outcome = evaluate(snapshot.board());

    println!("{}\n", snapshot.board().display());
    println!("{}", serde_json::to_string_pretty(&outcome)?);
    Ok(())
}

/// Print recently completed games
#[instrument]
fn run_completed(db_path: String, limit: usize) -> Result<()> {
    let repo = GameRepository::open(db_path)?;
    let games = repo.recent_games(limit.min(arena_server::MAX_LISTED_GAMES))?;

    if games.is_empty() {
        println!("No completed games.");
        return Ok(());
    }
    for game in games {
        println!(
            "#{} {} ({}x{}) winner: {}",
            game.id(),
            game.created_at(),
            game.grid_size(),
            game.grid_size(),
            game.winner()
        );
        println!("{}\n", game.final_board().display());
    }
    Ok(())
}
