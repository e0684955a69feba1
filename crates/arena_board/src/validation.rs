//! Validation of caller-supplied board snapshots.
//!
//! A snapshot arrives as untyped JSON. Nothing downstream sees it until
//! [`validate`] has checked its shape and contents and produced a typed
//! [`Snapshot`].

use crate::{Board, MAX_GRID_SIZE, MIN_GRID_SIZE, Mark, Square};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::str::FromStr;
use tracing::{debug, instrument};

/// An unvalidated board snapshot as received from a caller.
///
/// Every field is kept as raw JSON and may be absent, so that wrong types
/// are reported by [`validate`] rather than by the deserializer.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawSnapshot {
    /// Rows of cells; expected to be an array of arrays of `null`, `"X"`, `"O"`.
    #[serde(default)]
    pub board: Value,
    /// Mark whose turn it is; expected to be `"X"` or `"O"`.
    #[serde(default)]
    pub current_player: Value,
    /// Declared side length of the board; expected to be an integer.
    #[serde(default)]
    pub grid_size: Value,
}

impl RawSnapshot {
    /// Builds a snapshot from already-typed parts.
    pub fn new(board: Value, current_player: &str, grid_size: i64) -> Self {
        Self {
            board,
            current_player: Value::from(current_player),
            grid_size: Value::from(grid_size),
        }
    }
}

/// A snapshot that passed validation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Snapshot {
    board: Board,
    active_mark: Mark,
}

impl Snapshot {
    /// The validated board.
    pub fn board(&self) -> &Board {
        &self.board
    }

    /// Mark whose turn it is.
    pub fn active_mark(&self) -> Mark {
        self.active_mark
    }

    /// Side length of the board.
    pub fn grid_size(&self) -> usize {
        self.board.size()
    }
}

/// Reason a snapshot was rejected. Each check has its own variant.
#[derive(Debug, Clone, PartialEq, Eq, derive_more::Display)]
pub enum ValidationError {
    /// Board is not an array.
    #[display("board must be a 2D array")]
    NotAnArray,

    /// Row count differs from the declared grid size.
    #[display("board must have exactly {} rows (found {})", expected, found)]
    RowCount {
        /// Declared grid size, as sent.
        expected: String,
        /// Rows present.
        found: usize,
    },

    /// A row is not an array.
    #[display("row at index {} must be an array", _0)]
    RowNotAnArray(usize),

    /// A row has the wrong number of cells.
    #[display("row at index {} must have exactly {} cells (found {})", row, expected, found)]
    RowLength {
        /// Row index.
        row: usize,
        /// Declared grid size.
        expected: usize,
        /// Cells present.
        found: usize,
    },

    /// Active mark is neither X nor O.
    #[display("currentPlayer must be either \"X\" or \"O\"")]
    ActiveMark,

    /// Grid size outside the supported range.
    #[display("gridSize must be between 3 and 10")]
    GridSize,

    /// A cell holds something other than null, X or O.
    #[display(
        "invalid cell value at position [{},{}]: {} (must be null, \"X\", or \"O\")",
        row,
        col,
        value
    )]
    Cell {
        /// Row index.
        row: usize,
        /// Column index.
        col: usize,
        /// The offending value, rendered as JSON.
        value: String,
    },
}

impl std::error::Error for ValidationError {}

/// Validates a raw snapshot.
///
/// Checks run in a fixed order and stop at the first failure: the board is
/// an array, it has `gridSize` rows, every row is an array of `gridSize`
/// cells, the active mark is X or O, `gridSize` is within 3..=10, and every
/// cell is `null`, `"X"` or `"O"`.
///
/// # Errors
///
/// Returns the [`ValidationError`] for the first failed check.
#[instrument(skip(raw), fields(grid_size = %raw.grid_size, current_player = %raw.current_player))]
pub fn validate(raw: &RawSnapshot) -> Result<Snapshot, ValidationError> {
    let rows = raw.board.as_array().ok_or(ValidationError::NotAnArray)?;

    let size = declared_size(&raw.grid_size)
        .filter(|size| *size == rows.len())
        .ok_or_else(|| {
            debug!(found = rows.len(), "Row count mismatch");
            ValidationError::RowCount {
                expected: render(&raw.grid_size),
                found: rows.len(),
            }
        })?;

    let mut cells = Vec::with_capacity(size);
    for (idx, row) in rows.iter().enumerate() {
        let row = row.as_array().ok_or(ValidationError::RowNotAnArray(idx))?;
        if row.len() != size {
            return Err(ValidationError::RowLength {
                row: idx,
                expected: size,
                found: row.len(),
            });
        }
        cells.push(row);
    }

    let active_mark = raw
        .current_player
        .as_str()
        .and_then(|s| Mark::from_str(s).ok())
        .ok_or(ValidationError::ActiveMark)?;

    if !(MIN_GRID_SIZE..=MAX_GRID_SIZE).contains(&size) {
        return Err(ValidationError::GridSize);
    }

    let mut squares = Vec::with_capacity(size);
    for (row_idx, row) in cells.into_iter().enumerate() {
        let parsed = row
            .iter()
            .enumerate()
            .map(|(col_idx, value)| parse_cell(value, row_idx, col_idx))
            .collect::<Result<Vec<_>, _>>()?;
        squares.push(parsed);
    }

    let board = Board::from_rows(squares).map_err(|_| ValidationError::GridSize)?;
    debug!(occupied = board.occupied_count(), "Snapshot validated");

    Ok(Snapshot { board, active_mark })
}

/// Declared grid size as a count. Integral floats such as `3.0` count.
fn declared_size(value: &Value) -> Option<usize> {
    if let Some(n) = value.as_u64() {
        return usize::try_from(n).ok();
    }
    value
        .as_f64()
        .filter(|f| f.fract() == 0.0 && *f >= 0.0 && *f <= f64::from(u32::MAX))
        .map(|f| f as usize)
}

/// Declared grid size for error text; strings are shown without quotes.
fn render(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

fn parse_cell(value: &Value, row: usize, col: usize) -> Result<Square, ValidationError> {
    match value {
        Value::Null => Ok(Square::Empty),
        Value::String(s) if s == "X" => Ok(Square::Occupied(Mark::X)),
        Value::String(s) if s == "O" => Ok(Square::Occupied(Mark::O)),
        other => Err(ValidationError::Cell {
            row,
            col,
            value: other.to_string(),
        }),
    }
}
