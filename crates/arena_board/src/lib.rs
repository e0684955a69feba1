//! Arena board - pure NxN tic-tac-toe logic
//!
//! Everything in this crate is free of I/O. It provides the board model,
//! the win/draw evaluator for square boards of any supported size, and the
//! validator that turns an untrusted caller-supplied snapshot into a typed
//! [`Snapshot`].
//!
//! # Example
//!
//! ```
//! use arena_board::{evaluate, Board, Mark, Outcome, Position, Square};
//!
//! # fn example() -> Result<(), arena_board::BoardError> {
//! let mut board = Board::new(3)?;
//! for col in 0..3 {
//!     board.set(Position::new(0, col), Square::Occupied(Mark::X))?;
//! }
//! assert!(matches!(evaluate(&board), Outcome::Win { mark: Mark::X, .. }));
//! # Ok(())
//! # }
//! # example().unwrap();
//! ```

#![warn(missing_docs)]
#![forbid(unsafe_code)]

// Private module declarations
mod error;
mod position;
mod rules;
mod types;
mod validation;

// Crate-level exports - Errors
pub use error::BoardError;

// Crate-level exports - Board model
pub use position::{Position, WinLine};
pub use types::{Board, MAX_GRID_SIZE, MIN_GRID_SIZE, Mark, Square, Winner};

// Crate-level exports - Rules
pub use rules::{Outcome, evaluate, find_winning_line, is_full};

// Crate-level exports - Snapshot validation
pub use validation::{RawSnapshot, Snapshot, ValidationError, validate};
