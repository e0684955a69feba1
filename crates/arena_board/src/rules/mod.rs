//! Game rules for NxN tic-tac-toe.
//!
//! This module contains pure functions for evaluating a board. Rules are
//! separated from board storage so the session engine and the stateless
//! evaluation endpoint share one definition of "won" and "drawn".

mod draw;
mod win;

pub use draw::is_full;
pub use win::find_winning_line;

use crate::{Board, Mark, WinLine, Winner};
use serde::Serialize;
use tracing::{instrument, trace};

/// Result of evaluating a board.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Outcome {
    /// No line completed and at least one empty square remains.
    Ongoing,
    /// A mark completed the given line.
    Win {
        /// The winning mark.
        mark: Mark,
        /// The completed line.
        line: WinLine,
    },
    /// Every square is occupied and no line was completed.
    Draw,
}

impl Outcome {
    /// True for `Win` and `Draw`.
    pub fn is_terminal(&self) -> bool {
        !matches!(self, Outcome::Ongoing)
    }

    /// The winner for a terminal outcome.
    pub fn winner(&self) -> Option<Winner> {
        match self {
            Outcome::Ongoing => None,
            Outcome::Win { mark, .. } => Some(Winner::from(*mark)),
            Outcome::Draw => Some(Winner::Draw),
        }
    }

    /// The completed line, if this is a win.
    pub fn winning_line(&self) -> Option<&WinLine> {
        match self {
            Outcome::Win { line, .. } => Some(line),
            _ => None,
        }
    }
}

/// Evaluates a board: win, draw, or still in progress.
///
/// Lines are checked rows first, then columns, then the main diagonal,
/// then the anti-diagonal; the first completed line wins. Only then is a
/// full board reported as a draw.
#[instrument(skip(board), fields(size = board.size()))]
pub fn evaluate(board: &Board) -> Outcome {
    let outcome = match find_winning_line(board) {
        Some((mark, line)) => Outcome::Win { mark, line },
        None if is_full(board) => Outcome::Draw,
        None => Outcome::Ongoing,
    };
    trace!(?outcome, "Board evaluated");
    outcome
}
