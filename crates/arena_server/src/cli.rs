//! Command-line interface for arena_server.

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Tic-tac-toe arena: human-vs-oracle sessions over HTTP
#[derive(Parser, Debug)]
#[command(name = "arena_server")]
#[command(about = "NxN tic-tac-toe sessions against an LLM opponent", long_about = None)]
#[command(version)]
pub struct Cli {
    /// Subcommand to run
    #[command(subcommand)]
    pub command: Command,
}

/// Available commands
#[derive(Subcommand, Debug)]
pub enum Command {
    /// Run the HTTP game server
    Serve {
        /// Path to a TOML configuration file
        #[arg(short, long)]
        config: Option<PathBuf>,

        /// Host to bind to
        #[arg(long)]
        host: Option<String>,

        /// Port to bind to
        #[arg(short, long)]
        port: Option<u16>,

        /// SQLite file for completed games (created if it doesn't exist)
        #[arg(long)]
        db_path: Option<String>,
    },

    /// Evaluate a board snapshot stored as JSON
    Evaluate {
        /// File holding `{board, currentPlayer, gridSize}`
        file: PathBuf,
    },

    /// Print recently completed games
    Completed {
        /// Path to the database file
        #[arg(long, default_value = "tictactoe_arena.db")]
        db_path: String,

        /// Maximum number of games to print
        #[arg(short, long, default_value = "100")]
        limit: usize,
    },
}
