//! Session engine.
//!
//! Owns every live session. A human move is applied, evaluated, and, if
//! the game continues, answered by the oracle before the updated view is
//! returned. Finished games are handed to the completed-game store once,
//! in a background task.

use crate::oracle::MoveOracle;
use crate::session::{Session, SessionId, SessionStatus, SessionStore, SessionView};
use crate::store::{CompletedGame, CompletedGameStore, MAX_LISTED_GAMES, NewCompletedGame};
use arena_board::{
    Board, MAX_GRID_SIZE, MIN_GRID_SIZE, Mark, Outcome, Position, RawSnapshot, Square,
    ValidationError, WinLine, Winner, evaluate, validate,
};
use serde::Serialize;
use std::sync::Arc;
use tracing::{Instrument, debug, info, instrument, warn};

/// Note attached to views of sessions that no longer accept moves.
pub const ALREADY_OVER_MESSAGE: &str = "Game is already over.";

/// Errors surfaced by the engine.
#[derive(Debug, Clone, PartialEq, Eq, derive_more::Display)]
pub enum EngineError {
    /// Bad session-creation parameters.
    #[display("Invalid grid size: {} (must be between 3 and 10)", _0)]
    InvalidConfiguration(i64),
    /// A caller-supplied snapshot failed validation.
    #[display("Invalid game state: {}", _0)]
    Validation(ValidationError),
    /// No session with this ID.
    #[display("Game not found")]
    NotFound(SessionId),
    /// Move attempted while it is not the human's turn.
    #[display("Not player's turn.")]
    TurnViolation,
    /// Move targets an occupied or off-board square.
    #[display("Invalid move.")]
    IllegalMove(Position),
    /// A suggestion was requested for a finished board.
    #[display("Cannot get AI move: game is already over. Winner: {}", _0)]
    GameAlreadyOver(Winner),
    /// Unexpected failure behind the engine.
    #[display("{}", _0)]
    Internal(String),
}

impl std::error::Error for EngineError {}

impl From<ValidationError> for EngineError {
    fn from(err: ValidationError) -> Self {
        EngineError::Validation(err)
    }
}

/// Result of a stateless evaluation.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Evaluation {
    /// True for a win or a draw.
    pub is_game_over: bool,
    /// Winner, if the board is finished.
    pub winner: Option<Winner>,
    /// Completed line, if won.
    pub winning_line: Option<WinLine>,
    /// Human-readable summary.
    pub message: String,
}

impl Evaluation {
    fn from_outcome(outcome: &Outcome) -> Self {
        let winner = outcome.winner();
        let message = match winner {
            Some(Winner::Draw) => "The game is a draw!".to_string(),
            Some(w) => format!("Player {} wins!", w),
            None => "Game is still in progress".to_string(),
        };
        Self {
            is_game_over: outcome.is_terminal(),
            winner,
            winning_line: outcome.winning_line().cloned(),
            message,
        }
    }
}

/// Suggested move for a caller-supplied snapshot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct MoveSuggestionView {
    /// The square to play.
    #[serde(rename = "move")]
    pub position: Position,
}

/// Runs human-vs-oracle sessions.
#[derive(Clone)]
pub struct SessionEngine {
    sessions: Arc<dyn SessionStore>,
    oracle: Arc<MoveOracle>,
    store: Arc<dyn CompletedGameStore>,
}

impl std::fmt::Debug for SessionEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionEngine")
            .field("oracle", &self.oracle)
            .finish_non_exhaustive()
    }
}

impl SessionEngine {
    /// Creates an engine over the given collaborators.
    pub fn new(
        sessions: Arc<dyn SessionStore>,
        oracle: Arc<MoveOracle>,
        store: Arc<dyn CompletedGameStore>,
    ) -> Self {
        Self {
            sessions,
            oracle,
            store,
        }
    }

    /// Starts a session with an empty board and the human to move.
    ///
    /// The human plays `X` unless another mark is requested.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::InvalidConfiguration`] for an unsupported size.
    #[instrument(skip(self))]
    pub fn create(
        &self,
        human_mark: Option<Mark>,
        grid_size: i64,
    ) -> Result<SessionView, EngineError> {
        let size = usize::try_from(grid_size)
            .ok()
            .filter(|n| (MIN_GRID_SIZE..=MAX_GRID_SIZE).contains(n))
            .ok_or(EngineError::InvalidConfiguration(grid_size))?;
        let board = Board::new(size).map_err(|_| EngineError::InvalidConfiguration(grid_size))?;

        let id = uuid::Uuid::new_v4().to_string();
        let session = Session::new(id, board, human_mark.unwrap_or(Mark::X));
        let view = session.view();
        self.sessions.put(session);

        info!(session_id = %view.game_id, grid_size = size, "Session started");
        Ok(view)
    }

    /// Current view of a session.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::NotFound`] if the session does not exist.
    #[instrument(skip(self))]
    pub async fn get_session(&self, id: &str) -> Result<SessionView, EngineError> {
        let handle = self
            .sessions
            .get(id)
            .ok_or_else(|| EngineError::NotFound(id.to_string()))?;
        let session = handle.lock().await;
        Ok(session.view())
    }

    /// Applies a human move and, if the game continues, the opponent's reply.
    ///
    /// Moves on a finished session return its view unchanged with a note.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::NotFound`], [`EngineError::TurnViolation`] or
    /// [`EngineError::IllegalMove`]; the session is untouched in each case.
    #[instrument(skip(self), fields(row = position.row, col = position.col))]
    pub async fn apply_human_move(
        &self,
        id: &str,
        position: Position,
    ) -> Result<SessionView, EngineError> {
        let handle = self
            .sessions
            .get(id)
            .ok_or_else(|| EngineError::NotFound(id.to_string()))?;
        let mut session = handle.lock().await;

        if session.status.is_terminal() {
            debug!(session_id = id, status = %session.status, "Move on finished session");
            let mut view = session.view();
            view.message = Some(ALREADY_OVER_MESSAGE.to_string());
            return Ok(view);
        }

        if session.active_mark != session.human_mark {
            warn!(session_id = id, active = %session.active_mark, "Move out of turn");
            return Err(EngineError::TurnViolation);
        }

        if !session.board.is_empty(position) {
            debug!(session_id = id, "Rejected illegal move");
            return Err(EngineError::IllegalMove(position));
        }

        // Built on a copy; the session changes only once the whole turn is known.
        let human = session.human_mark;
        let mut board = session.board.clone();
        place(&mut board, position, human)?;
        info!(session_id = id, mark = %human, "Human move applied");

        let outcome = evaluate(&board);
        if outcome.is_terminal() {
            session.board = board;
            let record = finish(&mut session, &outcome);
            let view = session.view();
            drop(session);
            self.persist(record);
            return Ok(view);
        }

        let opponent = session.opponent_mark;
        let reply = self
            .oracle
            .suggest_move(&board, opponent)
            .await
            .map_err(|e| EngineError::Internal(e.to_string()))?;
        place(&mut board, reply, opponent)?;
        info!(
            session_id = id,
            mark = %opponent,
            row = reply.row,
            col = reply.col,
            "Opponent move applied"
        );

        let outcome = evaluate(&board);
        session.board = board;
        if outcome.is_terminal() {
            let record = finish(&mut session, &outcome);
            let mut view = session.view();
            view.last_opponent_move = Some(reply);
            drop(session);
            self.persist(record);
            return Ok(view);
        }

        let mut view = session.view();
        view.last_opponent_move = Some(reply);
        Ok(view)
    }

    /// Evaluates a caller-supplied board outside any session.
    ///
    /// A finished board is recorded in the completed-game store.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::Validation`] if the snapshot is malformed.
    #[instrument(skip(self, raw), fields(grid_size = %raw.grid_size))]
    pub async fn evaluate_snapshot(&self, raw: &RawSnapshot) -> Result<Evaluation, EngineError> {
        let snapshot = validate(raw)?;
        let outcome = evaluate(snapshot.board());
        let evaluation = Evaluation::from_outcome(&outcome);

        if let Some(winner) = outcome.winner() {
            self.persist(NewCompletedGame::new(
                winner,
                snapshot.grid_size(),
                snapshot.board().clone(),
                outcome.winning_line().cloned(),
            ));
        }

        debug!(game_over = evaluation.is_game_over, "Snapshot evaluated");
        Ok(evaluation)
    }

    /// Suggests a move for a caller-supplied board.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::Validation`] for a malformed snapshot and
    /// [`EngineError::GameAlreadyOver`] for a finished one.
    #[instrument(skip(self, raw), fields(grid_size = %raw.grid_size))]
    pub async fn suggest_for_snapshot(
        &self,
        raw: &RawSnapshot,
    ) -> Result<MoveSuggestionView, EngineError> {
        let snapshot = validate(raw)?;
        if let Some(winner) = evaluate(snapshot.board()).winner() {
            return Err(EngineError::GameAlreadyOver(winner));
        }
        let position = self
            .oracle
            .suggest_move(snapshot.board(), snapshot.active_mark())
            .await
            .map_err(|e| EngineError::Internal(e.to_string()))?;
        Ok(MoveSuggestionView { position })
    }

    /// Most recent completed games, newest first, at most 100.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::Internal`] if the store cannot be read.
    #[instrument(skip(self))]
    pub async fn list_completed(
        &self,
        limit: Option<usize>,
    ) -> Result<Vec<CompletedGame>, EngineError> {
        let limit = limit.unwrap_or(MAX_LISTED_GAMES).min(MAX_LISTED_GAMES);
        self.store
            .recent(limit)
            .await
            .map_err(|e| EngineError::Internal(e.to_string()))
    }

    /// Hands a finished game to the store in the background.
    ///
    /// The caller's result never waits on the write; failures are only logged.
    fn persist(&self, game: NewCompletedGame) {
        let store = Arc::clone(&self.store);
        tokio::spawn(
            async move {
                match store.record(game).await {
                    Ok(stored) => debug!(game_id = stored.id(), "Completed game persisted"),
                    Err(e) => warn!(error = %e, "Failed to persist completed game"),
                }
            }
            .in_current_span(),
        );
    }
}

fn place(board: &mut Board, position: Position, mark: Mark) -> Result<(), EngineError> {
    board
        .set(position, Square::Occupied(mark))
        .map_err(|e| EngineError::Internal(e.to_string()))
}

/// Moves a session into its terminal status and builds the record to store.
fn finish(session: &mut Session, outcome: &Outcome) -> NewCompletedGame {
    let winner = outcome.winner().unwrap_or(Winner::Draw);
    session.status = match outcome {
        Outcome::Win { mark, .. } if *mark == session.human_mark => SessionStatus::HumanWin,
        Outcome::Win { .. } => SessionStatus::OpponentWin,
        _ => SessionStatus::Draw,
    };
    session.winner = Some(winner);
    session.winning_line = outcome.winning_line().cloned();
    info!(session_id = %session.id, status = %session.status, winner = %winner, "Session finished");

    NewCompletedGame::new(
        winner,
        session.board.size(),
        session.board.clone(),
        session.winning_line.clone(),
    )
}
