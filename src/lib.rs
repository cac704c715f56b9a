//! Optimal solver for the N×N sliding puzzle.
//!
//! Boards are checked for solvability by inversion parity and then solved by
//! IDA* under one of several admissible heuristics, optionally backed by a
//! pattern database.

pub mod board;
pub mod error;
pub mod heuristic;
pub mod pattern_db;
pub mod puzzles;
pub mod scramble;
pub mod solution;
pub mod solver;

pub use board::{ALL_DIRECTIONS, Board, Direction, TargetTable};
pub use error::PuzzleError;
pub use heuristic::{Evaluator, HeuristicKind};
pub use pattern_db::{
    BlobStore, DirStore, MemoryStore, Origin, PatternDatabase, PdbConfig,
    build_or_load as build_or_load_pattern_database,
};
pub use puzzles::PuzzleSet;
pub use solution::{Solution, replay};
pub use solver::{NullTracer, SolveResult, Solver, SolverConfig, Tracer, check_solvable, solve};
