//! Win detection for square boards of any supported size.

use crate::{Board, Mark, Position, Square, WinLine};
use tracing::instrument;

/// Finds the first completed line on the board.
///
/// Checks rows top to bottom, columns left to right, the main diagonal,
/// then the anti-diagonal. Returns the owning mark and the line in
/// canonical order, or `None` if no line is complete.
#[instrument(skip(board), fields(size = board.size()))]
pub fn find_winning_line(board: &Board) -> Option<(Mark, WinLine)> {
    let n = board.size();

    let rows = (0..n).map(|r| (0..n).map(|c| Position::new(r, c)).collect::<Vec<_>>());
    let cols = (0..n).map(|c| (0..n).map(|r| Position::new(r, c)).collect::<Vec<_>>());
    let main_diagonal = std::iter::once((0..n).map(|i| Position::new(i, i)).collect::<Vec<_>>());
    let anti_diagonal =
        std::iter::once((0..n).map(|i| Position::new(i, n - 1 - i)).collect::<Vec<_>>());

    rows.chain(cols)
        .chain(main_diagonal)
        .chain(anti_diagonal)
        .find_map(|line| line_owner(board, &line).map(|mark| (mark, WinLine::new(line))))
}

/// Returns the mark occupying every position of the line, if any.
fn line_owner(board: &Board, line: &[Position]) -> Option<Mark> {
    let first = board.get(*line.first()?)?.mark()?;
    line.iter()
        .all(|pos| board.get(*pos) == Some(Square::Occupied(first)))
        .then_some(first)
}
