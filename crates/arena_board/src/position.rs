//! Board coordinates and winning lines.

use serde::{Deserialize, Serialize};

/// A cell coordinate, zero-indexed from the top-left corner.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Position {
    /// Row index, top to bottom.
    pub row: usize,
    /// Column index, left to right.
    pub col: usize,
}

impl Position {
    /// Creates a new position.
    pub const fn new(row: usize, col: usize) -> Self {
        Self { row, col }
    }

    /// Returns true if the position lies on a `size`x`size` board.
    pub fn in_bounds(self, size: usize) -> bool {
        self.row < size && self.col < size
    }

    /// Row-major index on a `size`x`size` board.
    pub(crate) fn index(self, size: usize) -> usize {
        self.row * size + self.col
    }
}

impl std::fmt::Display for Position {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "({},{})", self.row, self.col)
    }
}

/// The N positions forming a completed row, column, or diagonal.
///
/// Rows run left to right, columns top to bottom, and both diagonals by
/// increasing row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct WinLine(Vec<Position>);

impl WinLine {
    pub(crate) fn new(positions: Vec<Position>) -> Self {
        Self(positions)
    }

    /// Positions in line order.
    pub fn positions(&self) -> &[Position] {
        &self.0
    }

    /// Number of positions in the line.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// True for a line with no positions.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl From<WinLine> for Vec<Position> {
    fn from(line: WinLine) -> Self {
        line.0
    }
}
