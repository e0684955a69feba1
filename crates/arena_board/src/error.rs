//! Board construction and mutation errors.

use crate::Position;

/// Error raised when a board would be built or mutated into an invalid shape.
#[derive(Debug, Clone, PartialEq, Eq, derive_more::Display)]
pub enum BoardError {
    /// Grid size outside the supported range.
    #[display("Grid size {} is out of range (must be between 3 and 10)", _0)]
    GridSize(usize),

    /// Row count or row length does not match the grid size.
    #[display("Board is not {}x{}: {}", size, size, detail)]
    Shape {
        /// Expected side length.
        size: usize,
        /// What was wrong.
        detail: String,
    },

    /// Position falls outside the board.
    #[display("Position {} is outside a {}x{} board", position, size, size)]
    OutOfBounds {
        /// The offending position.
        position: Position,
        /// Side length of the board.
        size: usize,
    },
}

impl std::error::Error for BoardError {}
