use crate::board::{Board, Direction};
use crate::error::PuzzleError;
use crate::heuristic::{Evaluator, HeuristicKind};
use crate::pattern_db::PatternDatabase;
use crate::solution::{NodeId, SearchTree, Solution};
use arrayvec::ArrayVec;

/// Hook called on every heuristic evaluation during the search.
pub trait Tracer {
    fn trace(
        &self,
        board: &Board,
        nodes_visited: u64,
        threshold: u32,
        f_cost: u32,
        g_cost: u32,
        direction: Option<Direction>,
    );
}

pub struct NullTracer;

impl Tracer for NullTracer {
    fn trace(&self, _: &Board, _: u64, _: u32, _: u32, _: u32, _: Option<Direction>) {}
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SolverConfig {
    pub heuristic: HeuristicKind,
    /// Give up with [`SolveResult::Cutoff`] after this many evaluations. The
    /// limit is checked before expanding a child, so a start board that is
    /// already solved is always reported as such.
    pub max_nodes: Option<u64>,
}

impl Default for SolverConfig {
    fn default() -> Self {
        SolverConfig {
            heuristic: HeuristicKind::Manhattan,
            max_nodes: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SolveResult {
    /// An optimal solution.
    Solved(Solution),
    /// The parity check failed; nothing was searched.
    Unsolvable,
    /// An iteration found nothing above the threshold to escalate to.
    Exhausted,
    /// The node limit was reached first.
    Cutoff,
}

impl SolveResult {
    pub fn solution(&self) -> Option<&Solution> {
        match self {
            SolveResult::Solved(solution) => Some(solution),
            _ => None,
        }
    }

    pub fn into_solution(self) -> Option<Solution> {
        match self {
            SolveResult::Solved(solution) => Some(solution),
            _ => None,
        }
    }

    /// Number of moves, or -1 without a solution.
    pub fn cost(&self) -> i64 {
        self.solution().map_or(-1, |solution| solution.cost() as i64)
    }
}

enum Search {
    Found(NodeId),
    /// Smallest f above the threshold seen below this node, if any.
    Pruned(Option<u32>),
    Cutoff,
}

/// Iterative-deepening A* over one board size.
pub struct Solver<'a, T: Tracer = NullTracer> {
    evaluator: Evaluator<'a>,
    size: usize,
    max_nodes: Option<u64>,
    tracer: T,
    tree: SearchTree,
    nodes_visited: u64,
    iterations: u32,
}

impl<'a> Solver<'a, NullTracer> {
    pub fn new(
        config: SolverConfig,
        size: usize,
        pdb: Option<&'a PatternDatabase>,
    ) -> Result<Self, PuzzleError> {
        Self::with_tracer(config, size, pdb, NullTracer)
    }
}

impl<'a, T: Tracer> Solver<'a, T> {
    pub fn with_tracer(
        config: SolverConfig,
        size: usize,
        pdb: Option<&'a PatternDatabase>,
        tracer: T,
    ) -> Result<Self, PuzzleError> {
        Ok(Solver {
            evaluator: Evaluator::new(config.heuristic, size, pdb)?,
            size,
            max_nodes: config.max_nodes,
            tracer,
            tree: SearchTree::new(),
            nodes_visited: 0,
            iterations: 0,
        })
    }

    /// Heuristic evaluations made by the last call to [`solve`](Self::solve).
    pub fn nodes_visited(&self) -> u64 {
        self.nodes_visited
    }

    /// Depth-first passes made by the last call to [`solve`](Self::solve).
    pub fn iterations(&self) -> u32 {
        self.iterations
    }

    /// Find a shortest move sequence from `start` to the goal.
    ///
    /// Each pass is a depth-first search that prunes nodes whose f = g + h
    /// exceeds the threshold. The next threshold is the smallest pruned f.
    pub fn solve(&mut self, start: &Board) -> Result<SolveResult, PuzzleError> {
        self.nodes_visited = 0;
        self.iterations = 0;

        if start.size() != self.size {
            return Err(PuzzleError::InvalidBoard(format!(
                "solver configured for {}x{} boards, got {}x{}",
                self.size,
                self.size,
                start.size(),
                start.size()
            )));
        }

        if !start.is_solvable()? {
            return Ok(SolveResult::Unsolvable);
        }

        let root = self.tree.reset(start.clone());
        let mut threshold = self.evaluator.evaluate(start, &mut self.nodes_visited);

        loop {
            self.iterations += 1;
            match self.search(root, threshold)? {
                Search::Found(goal) => {
                    let solution = Solution::reconstruct(&self.tree, goal);
                    self.tree.truncate(root);
                    return Ok(SolveResult::Solved(solution));
                }
                Search::Cutoff => {
                    self.tree.truncate(root);
                    return Ok(SolveResult::Cutoff);
                }
                Search::Pruned(None) => {
                    self.tree.truncate(root);
                    return Ok(SolveResult::Exhausted);
                }
                Search::Pruned(Some(next)) => threshold = next,
            }
        }
    }

    fn search(&mut self, id: NodeId, threshold: u32) -> Result<Search, PuzzleError> {
        let node = self.tree.get(id);
        let g = node.g;
        let incoming = node.direction;
        let h = self.evaluator.evaluate(&node.board, &mut self.nodes_visited);
        let f = g + h;
        self.tracer
            .trace(&node.board, self.nodes_visited, threshold, f, g, incoming);

        if f > threshold {
            return Ok(Search::Pruned(Some(f)));
        }
        if node.board.is_goal() {
            return Ok(Search::Found(id));
        }

        // Never undo the incoming move.
        let mut children: ArrayVec<(Direction, Board), 4> = ArrayVec::new();
        for direction in node.board.legal_moves()? {
            if incoming == Some(direction.opposite()) {
                continue;
            }
            children.push((direction, node.board.apply_move(direction)?));
        }

        let mut min: Option<u32> = None;
        for (direction, board) in children {
            if self.limit_reached() {
                return Ok(Search::Cutoff);
            }
            let child = self.tree.push_child(id, direction, board);
            match self.search(child, threshold)? {
                Search::Found(goal) => return Ok(Search::Found(goal)),
                Search::Cutoff => return Ok(Search::Cutoff),
                Search::Pruned(bound) => {
                    min = match (min, bound) {
                        (Some(a), Some(b)) => Some(a.min(b)),
                        (a, b) => a.or(b),
                    };
                }
            }
            self.tree.truncate(child);
        }

        Ok(Search::Pruned(min))
    }

    fn limit_reached(&self) -> bool {
        self.max_nodes.is_some_and(|max| self.nodes_visited >= max)
    }
}

/// Solve `board` with a fresh solver, adding its evaluations to `nodes_visited`.
///
/// Returns the solution and its cost, or `(None, -1)` when the board cannot
/// reach the goal.
pub fn solve(
    board: &Board,
    heuristic: HeuristicKind,
    pdb: Option<&PatternDatabase>,
    nodes_visited: &mut u64,
) -> Result<(Option<Solution>, i64), PuzzleError> {
    let config = SolverConfig {
        heuristic,
        max_nodes: None,
    };
    let mut solver = Solver::new(config, board.size(), pdb)?;
    let result = solver.solve(board);
    *nodes_visited += solver.nodes_visited();
    let result = result?;
    let cost = result.cost();
    Ok((result.into_solution(), cost))
}

/// Parity check only; see [`Board::is_solvable`].
pub fn check_solvable(board: &Board) -> Result<bool, PuzzleError> {
    board.is_solvable()
}
