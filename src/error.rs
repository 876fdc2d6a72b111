//! Errors raised by the board engine.

use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum BoardError {
    /// A board needs at least one column and one row.
    #[error("invalid board dimension: {cols}x{rows} (both must be > 0)")]
    InvalidDimension { cols: usize, rows: usize },

    /// Coordinate outside the board's current `cols` x `rows`.
    #[error("cell ({x}, {y}) is outside the {cols}x{rows} board")]
    IndexOutOfBounds {
        x: usize,
        y: usize,
        cols: usize,
        rows: usize,
    },

    #[error("palette must contain at least one colour")]
    EmptyPalette,
}
