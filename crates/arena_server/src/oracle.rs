//! Move oracle adapter.
//!
//! Opponent moves come from an external suggestion source that may be
//! slow, wrong, or unavailable. [`MoveOracle`] asks the source with a
//! bounded wait, parses the untyped reply at the boundary, checks it
//! against the board, and substitutes a uniformly random empty square
//! whenever the suggestion cannot be used.

use crate::llm_client::{LlmClient, LlmError};
use arena_board::{Board, Mark, Position, Square};
use async_trait::async_trait;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::Deserialize;
use std::sync::Mutex;
use std::time::Duration;
use tracing::{debug, info, instrument, warn};

const SYSTEM_PROMPT: &str = concat!(
    "You are a Tic Tac Toe AI player. Analyze the game board and suggest the best move. ",
    "Respond ONLY with a JSON object containing 'row' and 'col' properties (0-indexed). ",
    "No additional text."
);

/// Error from a suggestion source. Its contents are only ever logged.
#[derive(Debug, Clone, PartialEq, Eq, derive_more::Display)]
pub enum SourceError {
    /// The source is not configured.
    #[display("No suggestion source configured")]
    Unavailable,
    /// Transport or provider failure.
    #[display("Suggestion source failed: {}", _0)]
    Failed(String),
}

impl std::error::Error for SourceError {}

impl From<LlmError> for SourceError {
    fn from(err: LlmError) -> Self {
        SourceError::Failed(err.message)
    }
}

/// An external source of move suggestions.
///
/// Implementations return the raw reply text; interpretation happens in
/// [`parse_suggestion`].
#[async_trait]
pub trait MoveSource: Send + Sync {
    /// Asks for a move for `mark` on `board`.
    async fn suggest(&self, board: &Board, mark: Mark) -> Result<String, SourceError>;
}

/// Suggestion source backed by an LLM chat API.
#[derive(Debug, Clone)]
pub struct LlmMoveSource {
    client: LlmClient,
}

impl LlmMoveSource {
    /// Creates a source using the given client.
    pub fn new(client: LlmClient) -> Self {
        Self { client }
    }
}

#[async_trait]
impl MoveSource for LlmMoveSource {
    #[instrument(skip(self, board), fields(size = board.size(), mark = %mark))]
    async fn suggest(&self, board: &Board, mark: Mark) -> Result<String, SourceError> {
        let prompt = build_prompt(board, mark);
        debug!(prompt_length = prompt.len(), "Requesting suggestion from LLM");
        Ok(self.client.generate(SYSTEM_PROMPT, &prompt).await?)
    }
}

/// Source that never answers; every move falls back to random.
#[derive(Debug, Clone, Copy, Default)]
pub struct OfflineSource;

#[async_trait]
impl MoveSource for OfflineSource {
    async fn suggest(&self, _board: &Board, _mark: Mark) -> Result<String, SourceError> {
        Err(SourceError::Unavailable)
    }
}

/// Renders the board for the LLM: marks as-is, empty cells as `(r,c)`.
pub fn build_prompt(board: &Board, mark: Mark) -> String {
    let n = board.size();
    let grid = board
        .rows()
        .enumerate()
        .map(|(r, row)| {
            row.iter()
                .enumerate()
                .map(|(c, sq)| match sq {
                    Square::Empty => format!("({},{})", r, c),
                    Square::Occupied(m) => m.to_string(),
                })
                .collect::<Vec<_>>()
                .join(" | ")
        })
        .collect::<Vec<_>>()
        .join("\n");

    format!(
        "Current Tic Tac Toe board ({n}x{n}):\n{grid}\n\n\
         You are playing as {mark}. Empty cells are shown as (row,col).\n\
         What is your next move? Respond with JSON only: {{\"row\": number, \"col\": number}}"
    )
}

/// A suggestion after parsing, before it is checked against the board.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Suggestion {
    /// A well-formed coordinate pair.
    Valid(Position),
    /// Anything that is not a single coordinate pair.
    Invalid,
}

#[derive(Deserialize)]
struct WireMove {
    row: usize,
    col: usize,
}

/// Parses a reply into a [`Suggestion`].
///
/// Accepts a JSON object with non-negative integer `row` and `col`,
/// optionally wrapped in a Markdown code fence or surrounding prose.
pub fn parse_suggestion(reply: &str) -> Suggestion {
    let trimmed = reply.trim();
    let object = match (trimmed.find('{'), trimmed.rfind('}')) {
        (Some(start), Some(end)) if start < end => &trimmed[start..=end],
        _ => return Suggestion::Invalid,
    };
    match serde_json::from_str::<WireMove>(object) {
        Ok(mv) => Suggestion::Valid(Position::new(mv.row, mv.col)),
        Err(_) => Suggestion::Invalid,
    }
}

/// Error when no legal move exists.
#[derive(Debug, Clone, PartialEq, Eq, derive_more::Display)]
#[display("No empty square left on the {}x{} board", _0, _0)]
pub struct NoLegalMove(pub usize);

impl std::error::Error for NoLegalMove {}

/// Adapter that always produces a legal move for a non-full board.
pub struct MoveOracle {
    source: Box<dyn MoveSource>,
    timeout: Duration,
    rng: Mutex<StdRng>,
}

impl std::fmt::Debug for MoveOracle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MoveOracle")
            .field("timeout", &self.timeout)
            .finish_non_exhaustive()
    }
}

impl MoveOracle {
    /// Creates an oracle with an entropy-seeded fallback generator.
    #[instrument(skip(source))]
    pub fn new(source: impl MoveSource + 'static, timeout: Duration) -> Self {
        Self::with_rng(source, timeout, StdRng::from_entropy())
    }

    /// Creates an oracle with an explicit fallback generator.
    pub fn with_rng(source: impl MoveSource + 'static, timeout: Duration, rng: StdRng) -> Self {
        info!(timeout_ms = timeout.as_millis() as u64, "Creating move oracle");
        Self {
            source: Box::new(source),
            timeout,
            rng: Mutex::new(rng),
        }
    }

    /// Upper bound on waiting for the source.
    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Returns a legal move for `mark`.
    ///
    /// The source's suggestion is used when it is in bounds and targets an
    /// empty square. Timeouts, source errors, unparseable replies and
    /// illegal suggestions all fall back to a random empty square.
    ///
    /// # Errors
    ///
    /// Returns [`NoLegalMove`] only if the board has no empty square.
    #[instrument(skip(self, board), fields(size = board.size(), mark = %mark))]
    pub async fn suggest_move(&self, board: &Board, mark: Mark) -> Result<Position, NoLegalMove> {
        let reply = match tokio::time::timeout(self.timeout, self.source.suggest(board, mark)).await
        {
            Ok(Ok(reply)) => Some(reply),
            Ok(Err(e)) => {
                warn!(error = %e, "Suggestion source failed");
                None
            }
            Err(_) => {
                warn!(timeout_ms = self.timeout.as_millis() as u64, "Suggestion source timed out");
                None
            }
        };

        let suggestion = reply
            .as_deref()
            .map_or(Suggestion::Invalid, parse_suggestion);

        match suggestion {
            Suggestion::Valid(pos) if board.is_empty(pos) => {
                debug!(row = pos.row, col = pos.col, "Using suggested move");
                Ok(pos)
            }
            Suggestion::Valid(pos) => {
                warn!(row = pos.row, col = pos.col, "Suggested square is not playable");
                self.random_move(board)
            }
            Suggestion::Invalid => {
                if reply.is_some() {
                    warn!("Suggestion could not be parsed");
                }
                self.random_move(board)
            }
        }
    }

    /// Picks a uniformly random empty square.
    fn random_move(&self, board: &Board) -> Result<Position, NoLegalMove> {
        let empty = board.empty_positions();
        if empty.is_empty() {
            return Err(NoLegalMove(board.size()));
        }
        let idx = {
            let mut rng = self.rng.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
            rng.gen_range(0..empty.len())
        };
        let pos = empty[idx];
        info!(row = pos.row, col = pos.col, candidates = empty.len(), "Using fallback move");
        Ok(pos)
    }
}
