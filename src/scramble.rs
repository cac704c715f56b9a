use crate::board::{Board, Direction};
use crate::error::PuzzleError;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;

/// Reproducible generator for demo boards.
pub fn seeded_rng(seed: u64) -> ChaCha8Rng {
    ChaCha8Rng::seed_from_u64(seed)
}

/// Random walk of `steps` blank moves from the goal.
///
/// A step never undoes the one before it. The result is always solvable and
/// at most `steps` moves from the goal.
pub fn scramble<R: Rng + ?Sized>(
    size: usize,
    steps: usize,
    rng: &mut R,
) -> Result<Board, PuzzleError> {
    let mut board = Board::goal(size)?;
    let mut previous: Option<Direction> = None;

    for _ in 0..steps {
        let moves: Vec<Direction> = board
            .legal_moves()?
            .into_iter()
            .filter(|dir| previous != Some(dir.opposite()))
            .collect();
        // Every cell has at least two neighbors, so one move always remains.
        let Some(&direction) = moves.choose(rng) else {
            break;
        };
        board = board.apply_move(direction)?;
        previous = Some(direction);
    }

    Ok(board)
}
