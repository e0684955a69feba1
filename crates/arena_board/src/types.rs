//! Core domain types for NxN tic-tac-toe.

use crate::{BoardError, Position};
use serde::{Deserialize, Serialize};

/// Smallest supported board side length.
pub const MIN_GRID_SIZE: usize = 3;

/// Largest supported board side length.
pub const MAX_GRID_SIZE: usize = 10;

/// One of the two marks a player occupies cells with.
///
/// The marks are symmetric: neither has any meaning beyond identity, and
/// either side may be played by the human.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    Serialize,
    Deserialize,
    strum::Display,
    strum::EnumString,
)]
pub enum Mark {
    /// Mark X.
    X,
    /// Mark O.
    O,
}

impl Mark {
    /// Returns the other mark.
    pub fn opponent(self) -> Self {
        match self {
            Mark::X => Mark::O,
            Mark::O => Mark::X,
        }
    }
}

/// A single cell on the board.
///
/// Serialized as `null` when empty and as the mark otherwise.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "Option<Mark>", into = "Option<Mark>")]
pub enum Square {
    /// Empty square.
    Empty,
    /// Square occupied by a mark.
    Occupied(Mark),
}

impl Square {
    /// Returns the occupying mark, if any.
    pub fn mark(self) -> Option<Mark> {
        match self {
            Square::Empty => None,
            Square::Occupied(mark) => Some(mark),
        }
    }
}

impl From<Option<Mark>> for Square {
    fn from(mark: Option<Mark>) -> Self {
        mark.map_or(Square::Empty, Square::Occupied)
    }
}

impl From<Square> for Option<Mark> {
    fn from(square: Square) -> Self {
        square.mark()
    }
}

/// Who finished on top, as recorded for completed games.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, derive_more::Display)]
pub enum Winner {
    /// X completed a line.
    #[display("X")]
    X,
    /// O completed a line.
    #[display("O")]
    O,
    /// Board filled with no line.
    #[serde(rename = "draw")]
    #[display("draw")]
    Draw,
}

impl From<Mark> for Winner {
    fn from(mark: Mark) -> Self {
        match mark {
            Mark::X => Winner::X,
            Mark::O => Winner::O,
        }
    }
}

/// Square NxN board with `MIN_GRID_SIZE <= N <= MAX_GRID_SIZE`.
///
/// Serialized as an array of rows, each an array of squares.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(into = "Vec<Vec<Square>>", try_from = "Vec<Vec<Square>>")]
pub struct Board {
    size: usize,
    /// Squares in row-major order.
    squares: Vec<Square>,
}

impl Board {
    /// Creates an empty `size`x`size` board.
    ///
    /// # Errors
    ///
    /// Returns [`BoardError::GridSize`] if `size` is outside the supported range.
    pub fn new(size: usize) -> Result<Self, BoardError> {
        if !(MIN_GRID_SIZE..=MAX_GRID_SIZE).contains(&size) {
            return Err(BoardError::GridSize(size));
        }
        Ok(Self {
            size,
            squares: vec![Square::Empty; size * size],
        })
    }

    /// Builds a board from rows of squares.
    ///
    /// # Errors
    ///
    /// Returns [`BoardError`] if the grid size is unsupported or any row has
    /// the wrong length.
    pub fn from_rows(rows: Vec<Vec<Square>>) -> Result<Self, BoardError> {
        let size = rows.len();
        let mut board = Self::new(size)?;
        for (row_idx, row) in rows.into_iter().enumerate() {
            if row.len() != size {
                return Err(BoardError::Shape {
                    size,
                    detail: format!("row {} has {} cells", row_idx, row.len()),
                });
            }
            let start = row_idx * size;
            board.squares[start..start + size].copy_from_slice(&row);
        }
        Ok(board)
    }

    /// Side length of the board.
    pub fn size(&self) -> usize {
        self.size
    }

    /// Gets the square at the given position, or `None` if out of bounds.
    pub fn get(&self, pos: Position) -> Option<Square> {
        if pos.in_bounds(self.size) {
            self.squares.get(pos.index(self.size)).copied()
        } else {
            None
        }
    }

    /// Sets the square at the given position.
    ///
    /// # Errors
    ///
    /// Returns [`BoardError::OutOfBounds`] if the position is off the board.
    pub fn set(&mut self, pos: Position, square: Square) -> Result<(), BoardError> {
        if !pos.in_bounds(self.size) {
            return Err(BoardError::OutOfBounds {
                position: pos,
                size: self.size,
            });
        }
        let idx = pos.index(self.size);
        self.squares[idx] = square;
        Ok(())
    }

    /// Checks if a square is in bounds and empty.
    pub fn is_empty(&self, pos: Position) -> bool {
        matches!(self.get(pos), Some(Square::Empty))
    }

    /// Iterates over rows, top to bottom.
    pub fn rows(&self) -> impl Iterator<Item = &[Square]> {
        self.squares.chunks(self.size)
    }

    /// All empty positions in row-major order.
    pub fn empty_positions(&self) -> Vec<Position> {
        self.squares
            .iter()
            .enumerate()
            .filter(|(_, sq)| **sq == Square::Empty)
            .map(|(idx, _)| Position::new(idx / self.size, idx % self.size))
            .collect()
    }

    /// Number of non-empty squares.
    pub fn occupied_count(&self) -> usize {
        self.squares.iter().filter(|sq| **sq != Square::Empty).count()
    }

    /// Returns all squares in row-major order.
    pub fn squares(&self) -> &[Square] {
        &self.squares
    }

    /// Formats the board as a human-readable grid (`X`, `O`, `.`).
    pub fn display(&self) -> String {
        self.rows()
            .map(|row| {
                row.iter()
                    .map(|sq| match sq {
                        Square::Empty => ".".to_string(),
                        Square::Occupied(mark) => mark.to_string(),
                    })
                    .collect::<Vec<_>>()
                    .join(" ")
            })
            .collect::<Vec<_>>()
            .join("\n")
    }
}

impl From<Board> for Vec<Vec<Square>> {
    fn from(board: Board) -> Self {
        board.rows().map(<[Square]>::to_vec).collect()
    }
}

impl TryFrom<Vec<Vec<Square>>> for Board {
    type Error = BoardError;

    fn try_from(rows: Vec<Vec<Square>>) -> Result<Self, Self::Error> {
        Board::from_rows(rows)
    }
}
