use crate::board::Direction;
use std::io;
use thiserror::Error;

/// Errors raised by the puzzle core.
///
/// An unsolvable start position is not an error; it is reported as
/// [`SolveResult::Unsolvable`](crate::solver::SolveResult::Unsolvable).
#[derive(Debug, Error)]
pub enum PuzzleError {
    /// Board dimensions or labels violate the N×N permutation invariant.
    #[error("invalid board: {0}")]
    InvalidBoard(String),

    /// An internal invariant did not hold (e.g. a board without a blank).
    #[error("invariant violated: {0}")]
    InvariantViolation(String),

    /// The blank cannot move in this direction without leaving the grid.
    #[error("illegal move {direction}: blank at ({row}, {col}) would leave the board")]
    IllegalMove {
        direction: Direction,
        row: usize,
        col: usize,
    },

    #[error("unknown heuristic: {0}")]
    UnknownHeuristic(String),

    #[error("pattern database heuristic requested without a pattern database")]
    MissingPatternDatabase,

    #[error("pattern database mismatch: {0}")]
    PatternDatabaseMismatch(String),

    #[error("invalid puzzle file: {0}")]
    InvalidPuzzleFile(String),

    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    #[error("pattern database codec error: {0}")]
    Codec(#[from] serde_json::Error),
}
