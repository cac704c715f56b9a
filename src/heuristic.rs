use crate::board::{BLANK, Board, MAX_SIZE, TargetTable};
use crate::error::PuzzleError;
use crate::pattern_db::PatternDatabase;
use arrayvec::ArrayVec;
use std::fmt;
use std::str::FromStr;

/// Cost-to-goal estimators. Every kind is admissible, so IDA* stays optimal
/// with any of them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HeuristicKind {
    Manhattan,
    LinearConflict,
    Misplaced,
    /// Straight-line distance per tile, rounded down.
    Euclidean,
    PatternDatabase,
}

impl HeuristicKind {
    pub const ALL: [HeuristicKind; 5] = [
        HeuristicKind::Manhattan,
        HeuristicKind::Misplaced,
        HeuristicKind::LinearConflict,
        HeuristicKind::Euclidean,
        HeuristicKind::PatternDatabase,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            HeuristicKind::Manhattan => "manhattan",
            HeuristicKind::LinearConflict => "linear_conflict",
            HeuristicKind::Misplaced => "misplaced",
            HeuristicKind::Euclidean => "euclidean",
            HeuristicKind::PatternDatabase => "pdb",
        }
    }
}

impl FromStr for HeuristicKind {
    type Err = PuzzleError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "manhattan" => Ok(HeuristicKind::Manhattan),
            "linear_conflict" | "linear-conflict" => Ok(HeuristicKind::LinearConflict),
            "misplaced" => Ok(HeuristicKind::Misplaced),
            "euclidean" => Ok(HeuristicKind::Euclidean),
            "pdb" | "pattern_database" => Ok(HeuristicKind::PatternDatabase),
            _ => Err(PuzzleError::UnknownHeuristic(s.to_string())),
        }
    }
}

impl fmt::Display for HeuristicKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.name())
    }
}

/// Sum over tiles of row distance plus column distance to the goal cell.
pub fn manhattan(board: &Board, targets: &TargetTable) -> u32 {
    tile_offsets(board, targets)
        .map(|(dr, dc)| (dr + dc) as u32)
        .sum()
}

/// Number of tiles (excluding the blank) that are not on their goal cell.
pub fn misplaced(board: &Board, targets: &TargetTable) -> u32 {
    tile_offsets(board, targets)
        .filter(|&(dr, dc)| dr != 0 || dc != 0)
        .count() as u32
}

/// Sum over tiles of the straight-line distance to the goal cell, rounded
/// down. Never exceeds [`manhattan`].
pub fn euclidean(board: &Board, targets: &TargetTable) -> u32 {
    tile_offsets(board, targets)
        .map(|(dr, dc)| ((dr * dr + dc * dc) as f64).sqrt() as u32)
        .sum()
}

/// Manhattan distance plus two moves for every tile that has to step out of
/// its goal row (or column) to let a reversed neighbor pass.
///
/// Within one line the tiles already in their goal line form a sequence of
/// goal positions; the tiles outside its longest increasing subsequence are
/// the fewest that must leave the line. For an isolated reversed pair this is
/// exactly one tile, i.e. +2 per pair.
pub fn linear_conflict(board: &Board, targets: &TargetTable) -> u32 {
    let size = board.size();
    let mut conflicts = 0;
    let mut line: ArrayVec<usize, MAX_SIZE> = ArrayVec::new();

    for row in 0..size {
        line.clear();
        for col in 0..size {
            let label = board.get(row, col);
            if label == BLANK {
                continue;
            }
            let (goal_row, goal_col) = targets.position(label);
            if goal_row == row {
                line.push(goal_col);
            }
        }
        conflicts += line.len() - longest_increasing(&line);
    }

    for col in 0..size {
        line.clear();
        for row in 0..size {
            let label = board.get(row, col);
            if label == BLANK {
                continue;
            }
            let (goal_row, goal_col) = targets.position(label);
            if goal_col == col {
                line.push(goal_row);
            }
        }
        conflicts += line.len() - longest_increasing(&line);
    }

    manhattan(board, targets) + 2 * conflicts as u32
}

fn longest_increasing(values: &[usize]) -> usize {
    // tails[k] = smallest tail of an increasing run of length k + 1
    let mut tails: ArrayVec<usize, MAX_SIZE> = ArrayVec::new();
    for &v in values {
        let pos = tails.partition_point(|&t| t < v);
        if pos == tails.len() {
            tails.push(v);
        } else {
            tails[pos] = v;
        }
    }
    tails.len()
}

/// (row distance, column distance) to the goal cell for every non-blank tile.
fn tile_offsets<'a>(
    board: &'a Board,
    targets: &'a TargetTable,
) -> impl Iterator<Item = (usize, usize)> + 'a {
    let size = board.size();
    board
        .cells()
        .iter()
        .enumerate()
        .filter(|&(_, &label)| label != BLANK)
        .map(move |(idx, &label)| {
            let (goal_row, goal_col) = targets.position(label);
            ((idx / size).abs_diff(goal_row), (idx % size).abs_diff(goal_col))
        })
}

/// A heuristic bound to one board size, plus the pattern database it reads.
#[derive(Debug, Clone)]
pub struct Evaluator<'a> {
    kind: HeuristicKind,
    targets: TargetTable,
    pdb: Option<&'a PatternDatabase>,
}

impl<'a> Evaluator<'a> {
    /// Fails on an unsupported board size, or if `kind` needs a pattern
    /// database and none (or one for another board size) is given.
    pub fn new(
        kind: HeuristicKind,
        size: usize,
        pdb: Option<&'a PatternDatabase>,
    ) -> Result<Self, PuzzleError> {
        let targets = TargetTable::new(size)?;
        match (kind, pdb) {
            (HeuristicKind::PatternDatabase, None) => {
                return Err(PuzzleError::MissingPatternDatabase);
            }
            (_, Some(pdb)) if pdb.size() != size => {
                return Err(PuzzleError::PatternDatabaseMismatch(format!(
                    "database built for {}x{} boards, board is {}x{}",
                    pdb.size(),
                    pdb.size(),
                    size,
                    size
                )));
            }
            _ => {}
        }

        Ok(Evaluator { kind, targets, pdb })
    }

    pub fn kind(&self) -> HeuristicKind {
        self.kind
    }

    /// Estimated number of moves from `board` to the goal.
    pub fn estimate(&self, board: &Board) -> u32 {
        match self.kind {
            HeuristicKind::Manhattan => manhattan(board, &self.targets),
            HeuristicKind::LinearConflict => linear_conflict(board, &self.targets),
            HeuristicKind::Misplaced => misplaced(board, &self.targets),
            HeuristicKind::Euclidean => euclidean(board, &self.targets),
            HeuristicKind::PatternDatabase => {
                self.pdb.map_or(0, |pdb| pdb.lookup(board) as u32)
            }
        }
    }

    /// [`estimate`](Self::estimate), counting the call in `nodes_visited`.
    pub fn evaluate(&self, board: &Board, nodes_visited: &mut u64) -> u32 {
        *nodes_visited += 1;
        self.estimate(board)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::board::Direction;
    use rustc_hash::FxHashMap;
    use std::collections::VecDeque;

    fn exact_distances(size: usize) -> FxHashMap<Board, u32> {
        let goal = Board::goal(size).unwrap();
        let mut dist = FxHashMap::default();
        let mut queue = VecDeque::new();
        dist.insert(goal.clone(), 0);
        queue.push_back(goal);
        while let Some(board) = queue.pop_front() {
            let d = dist[&board];
            for dir in board.legal_moves().unwrap() {
                let next = board.apply_move(dir).unwrap();
                if !dist.contains_key(&next) {
                    dist.insert(next.clone(), d + 1);
                    queue.push_back(next);
                }
            }
        }
        dist
    }

    fn text(board: &str) -> Board {
        Board::from_text(board).unwrap()
    }

    #[test]
    fn test_zero_at_goal() {
        for size in 2..=7 {
            let goal = Board::goal(size).unwrap();
            let targets = TargetTable::new(size).unwrap();
            assert_eq!(manhattan(&goal, &targets), 0);
            assert_eq!(linear_conflict(&goal, &targets), 0);
            assert_eq!(misplaced(&goal, &targets), 0);
            assert_eq!(euclidean(&goal, &targets), 0);
        }

        let pdb = PatternDatabase::build(4, &[1, 2, 3, 4], 1000).unwrap();
        let evaluator = Evaluator::new(HeuristicKind::PatternDatabase, 4, Some(&pdb)).unwrap();
        assert_eq!(evaluator.estimate(&Board::goal(4).unwrap()), 0);
    }

    #[test]
    fn test_two_moves_from_goal() {
        let board = text("1 2 3\n4 0 6\n7 5 8");
        let targets = TargetTable::new(3).unwrap();
        assert_eq!(manhattan(&board, &targets), 2);
        assert_eq!(linear_conflict(&board, &targets), 2);
        assert_eq!(misplaced(&board, &targets), 2);
        assert_eq!(euclidean(&board, &targets), 2);
    }

    #[test]
    fn test_row_conflict() {
        let targets = TargetTable::new(3).unwrap();
        let board = text("2 1 3\n4 5 6\n7 8 0");
        assert_eq!(manhattan(&board, &targets), 2);
        assert_eq!(linear_conflict(&board, &targets), 4);
    }

    #[test]
    fn test_column_conflict() {
        let targets = TargetTable::new(3).unwrap();
        let board = text("4 2 3\n1 5 6\n7 8 0");
        assert_eq!(manhattan(&board, &targets), 2);
        assert_eq!(linear_conflict(&board, &targets), 4);
    }

    #[test]
    fn test_reversed_row_counts_removed_tiles() {
        // 3 2 1: two of the three tiles must leave the row, not three pairs.
        let targets = TargetTable::new(3).unwrap();
        let board = text("3 2 1\n4 5 6\n7 8 0");
        assert_eq!(manhattan(&board, &targets), 4);
        assert_eq!(linear_conflict(&board, &targets), 8);
    }

    #[test]
    fn test_tiles_outside_goal_line_do_not_conflict() {
        let targets = TargetTable::new(3).unwrap();
        // 4 sits in row 0 but belongs to row 1.
        let board = text("4 1 3\n0 2 6\n7 5 8");
        assert_eq!(
            linear_conflict(&board, &targets),
            manhattan(&board, &targets)
        );
    }

    #[test]
    fn test_euclidean_rounds_down() {
        let targets = TargetTable::new(3).unwrap();
        // Tile 1 is two rows and two columns away: sqrt(8) = 2.83.
        let board = text("0 2 3\n4 5 6\n7 8 1");
        assert_eq!(euclidean(&board, &targets), 2);
        assert_eq!(manhattan(&board, &targets), 4);
    }

    #[test]
    fn test_longest_increasing() {
        assert_eq!(longest_increasing(&[]), 0);
        assert_eq!(longest_increasing(&[0, 1, 2, 3]), 4);
        assert_eq!(longest_increasing(&[3, 2, 1, 0]), 1);
        assert_eq!(longest_increasing(&[1, 0, 3, 2]), 2);
        assert_eq!(longest_increasing(&[2, 0, 1, 3]), 3);
    }

    #[test]
    fn test_parse_kind() {
        for kind in HeuristicKind::ALL {
            assert_eq!(kind.name().parse::<HeuristicKind>().unwrap(), kind);
        }
        assert!(matches!(
            "hamming".parse::<HeuristicKind>(),
            Err(PuzzleError::UnknownHeuristic(name)) if name == "hamming"
        ));
    }

    #[test]
    fn test_evaluator_requires_matching_pdb() {
        assert!(matches!(
            Evaluator::new(HeuristicKind::PatternDatabase, 3, None),
            Err(PuzzleError::MissingPatternDatabase)
        ));

        let pdb = PatternDatabase::build(4, &[1, 2], 100).unwrap();
        assert!(matches!(
            Evaluator::new(HeuristicKind::PatternDatabase, 3, Some(&pdb)),
            Err(PuzzleError::PatternDatabaseMismatch(_))
        ));
        assert!(Evaluator::new(HeuristicKind::Manhattan, 3, None).is_ok());
    }

    #[test]
    fn test_evaluate_counts_calls() {
        let evaluator = Evaluator::new(HeuristicKind::Manhattan, 3, None).unwrap();
        let board = Board::goal(3).unwrap().apply_move(Direction::Up).unwrap();
        let mut nodes = 0;
        assert_eq!(evaluator.evaluate(&board, &mut nodes), 1);
        assert_eq!(evaluator.evaluate(&board, &mut nodes), 1);
        assert_eq!(nodes, 2);
        assert_eq!(evaluator.estimate(&board), 1);
        assert_eq!(nodes, 2);
    }

    #[test]
    fn test_admissible_2x2() {
        let targets = TargetTable::new(2).unwrap();
        for (board, d) in exact_distances(2) {
            assert!(linear_conflict(&board, &targets) <= d, "board:\n{}", board);
            assert!(manhattan(&board, &targets) <= d);
            assert!(misplaced(&board, &targets) <= d);
            assert!(euclidean(&board, &targets) <= d);
        }
    }

    #[test]
    fn test_admissible_3x3() {
        let pdb = PatternDatabase::build(3, &[1, 2, 3, 4], 1_000_000).unwrap();
        let evaluators: Vec<Evaluator> = HeuristicKind::ALL
            .iter()
            .map(|&kind| Evaluator::new(kind, 3, Some(&pdb)).unwrap())
            .collect();

        let exact = exact_distances(3);
        assert_eq!(exact.len(), 181_440);
        for (board, d) in &exact {
            for evaluator in &evaluators {
                let h = evaluator.estimate(board);
                assert!(h <= *d, "{} = {} > {} on\n{}", evaluator.kind(), h, d, board);
            }
        }
    }
}
