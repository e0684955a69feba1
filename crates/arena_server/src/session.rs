//! Game sessions and the live-session table.

use arena_board::{Board, Mark, Position, WinLine, Winner};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use tracing::{debug, info, instrument};

/// Unique identifier for a game session.
pub type SessionId = String;

/// Status of a session from the human's point of view.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, strum::Display)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum SessionStatus {
    /// Moves are still accepted.
    Ongoing,
    /// The human completed a line.
    HumanWin,
    /// The opponent completed a line.
    OpponentWin,
    /// The board filled with no line.
    Draw,
}

impl SessionStatus {
    /// True once no further moves are accepted.
    pub fn is_terminal(self) -> bool {
        self != SessionStatus::Ongoing
    }
}

/// One human-vs-oracle match.
#[derive(Debug, Clone)]
pub struct Session {
    /// Session ID.
    pub id: SessionId,
    /// Current board.
    pub board: Board,
    /// Whose turn it is.
    pub active_mark: Mark,
    /// The human's mark.
    pub human_mark: Mark,
    /// The oracle's mark.
    pub opponent_mark: Mark,
    /// Current status.
    pub status: SessionStatus,
    /// Winner once terminal.
    pub winner: Option<Winner>,
    /// Completed line once won.
    pub winning_line: Option<WinLine>,
}

impl Session {
    /// Creates a session with an empty board and the human to move.
    #[instrument(skip(board), fields(size = board.size()))]
    pub fn new(id: SessionId, board: Board, human_mark: Mark) -> Self {
        info!(session_id = %id, human_mark = %human_mark, "Creating new game session");
        Self {
            id,
            board,
            active_mark: human_mark,
            human_mark,
            opponent_mark: human_mark.opponent(),
            status: SessionStatus::Ongoing,
            winner: None,
            winning_line: None,
        }
    }

    /// Builds the externally visible snapshot.
    pub fn view(&self) -> SessionView {
        SessionView {
            game_id: self.id.clone(),
            board: self.board.clone(),
            active_mark: self.active_mark,
            status: self.status,
            human_mark: self.human_mark,
            opponent_mark: self.opponent_mark,
            grid_size: self.board.size(),
            winner: self.winner,
            winning_line: self.winning_line.clone(),
            last_opponent_move: None,
            message: None,
        }
    }
}

/// Snapshot of a session returned to callers after every operation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionView {
    /// Session ID.
    pub game_id: SessionId,
    /// Current board.
    pub board: Board,
    /// Whose turn it is.
    pub active_mark: Mark,
    /// Current status.
    pub status: SessionStatus,
    /// The human's mark.
    pub human_mark: Mark,
    /// The oracle's mark.
    pub opponent_mark: Mark,
    /// Board side length.
    pub grid_size: usize,
    /// Winner once terminal.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub winner: Option<Winner>,
    /// Completed line once won.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub winning_line: Option<WinLine>,
    /// Square the opponent played this turn, if it moved.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_opponent_move: Option<Position>,
    /// Informational note, e.g. when the game is already over.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

/// Shared handle to a single session. Holding the lock serializes moves.
pub type SessionHandle = Arc<tokio::sync::Mutex<Session>>;

/// Storage for live sessions.
///
/// The engine only needs get/put/remove, so the backing can be swapped
/// for an external cache without touching it.
pub trait SessionStore: Send + Sync {
    /// Looks up a session.
    fn get(&self, id: &str) -> Option<SessionHandle>;

    /// Inserts or replaces a session, returning its handle.
    fn put(&self, session: Session) -> SessionHandle;

    /// Removes a session.
    fn remove(&self, id: &str) -> Option<SessionHandle>;
}

/// In-memory session table.
#[derive(Debug, Clone, Default)]
pub struct InMemorySessionStore {
    sessions: Arc<Mutex<HashMap<SessionId, SessionHandle>>>,
}

impl InMemorySessionStore {
    /// Creates an empty table.
    #[instrument]
    pub fn new() -> Self {
        info!("Creating in-memory session store");
        Self::default()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, HashMap<SessionId, SessionHandle>> {
        self.sessions
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl SessionStore for InMemorySessionStore {
    #[instrument(skip(self))]
    fn get(&self, id: &str) -> Option<SessionHandle> {
        let session = self.lock().get(id).cloned();
        if session.is_none() {
            debug!(session_id = id, "Session not found");
        }
        session
    }

    #[instrument(skip(self, session), fields(session_id = %session.id))]
    fn put(&self, session: Session) -> SessionHandle {
        let id = session.id.clone();
        let handle = Arc::new(tokio::sync::Mutex::new(session));
        self.lock().insert(id, Arc::clone(&handle));
        debug!("Session stored");
        handle
    }

    #[instrument(skip(self))]
    fn remove(&self, id: &str) -> Option<SessionHandle> {
        let removed = self.lock().remove(id);
        debug!(session_id = id, removed = removed.is_some(), "Session removed");
        removed
    }
}
