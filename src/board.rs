use crate::error::PuzzleError;
use arrayvec::ArrayVec;
use std::fmt;

/// Largest supported side length. Labels must fit in a `u8` with one value
/// left over for the pattern database wildcard.
pub const MAX_SIZE: usize = 15;

/// Label of the blank cell.
pub const BLANK: u8 = 0;

/// Direction in which the blank moves.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Direction {
    Up,
    Down,
    Left,
    Right,
}

/// Fixed expansion order. Among equally short solutions, the search returns the
/// first one found in this order.
pub const ALL_DIRECTIONS: [Direction; 4] = [
    Direction::Up,
    Direction::Down,
    Direction::Left,
    Direction::Right,
];

impl Direction {
    /// (row, column) offset of the blank.
    pub fn delta(&self) -> (isize, isize) {
        match self {
            Direction::Up => (-1, 0),
            Direction::Down => (1, 0),
            Direction::Left => (0, -1),
            Direction::Right => (0, 1),
        }
    }

    pub fn opposite(&self) -> Direction {
        match self {
            Direction::Up => Direction::Down,
            Direction::Down => Direction::Up,
            Direction::Left => Direction::Right,
            Direction::Right => Direction::Left,
        }
    }
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Direction::Up => write!(f, "Up"),
            Direction::Down => write!(f, "Down"),
            Direction::Left => write!(f, "Left"),
            Direction::Right => write!(f, "Right"),
        }
    }
}

/// An N×N sliding puzzle position stored row-major.
///
/// Every constructor validates that the cells are a permutation of
/// `0..N*N`, so a `Board` always holds exactly one blank.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Board {
    size: usize,
    cells: Vec<u8>,
}

impl Board {
    /// The canonical goal: labels `1..N*N` in row-major order, blank bottom-right.
    pub fn goal(size: usize) -> Result<Self, PuzzleError> {
        check_size(size)?;
        let count = size * size;
        let mut cells: Vec<u8> = (1..count as u8).collect();
        cells.push(BLANK);
        Ok(Board { size, cells })
    }

    /// Build a board from row-major cells, validating the label set.
    pub fn from_cells(size: usize, cells: Vec<u8>) -> Result<Self, PuzzleError> {
        check_size(size)?;
        let count = size * size;
        if cells.len() != count {
            return Err(PuzzleError::InvalidBoard(format!(
                "expected {} cells for a {}x{} board, found {}",
                count,
                size,
                size,
                cells.len()
            )));
        }

        let mut seen = vec![false; count];
        for &label in &cells {
            let idx = label as usize;
            if idx >= count {
                return Err(PuzzleError::InvalidBoard(format!(
                    "label {} out of range 0..{}",
                    label, count
                )));
            }
            if seen[idx] {
                return Err(PuzzleError::InvalidBoard(format!(
                    "label {} appears more than once",
                    label
                )));
            }
            seen[idx] = true;
        }

        Ok(Board { size, cells })
    }

    /// Build a board from a square matrix of labels.
    pub fn from_rows(rows: &[Vec<u8>]) -> Result<Self, PuzzleError> {
        let size = rows.len();
        if let Some((idx, row)) = rows.iter().enumerate().find(|(_, row)| row.len() != size) {
            return Err(PuzzleError::InvalidBoard(format!(
                "row {} has {} cells, expected {}",
                idx,
                row.len(),
                size
            )));
        }
        Self::from_cells(size, rows.iter().flatten().copied().collect())
    }

    /// Parse a board from text.
    ///
    /// One row per line, labels separated by whitespace. The blank may be
    /// written as `0` or `_`. Blank lines are ignored.
    pub fn from_text(text: &str) -> Result<Self, PuzzleError> {
        let mut rows = Vec::new();
        for line in text.lines().filter(|line| !line.trim().is_empty()) {
            let row = line
                .split_whitespace()
                .map(|token| match token {
                    "_" => Ok(BLANK),
                    _ => token.parse::<u8>().map_err(|_| {
                        PuzzleError::InvalidBoard(format!("invalid tile label '{}'", token))
                    }),
                })
                .collect::<Result<Vec<u8>, _>>()?;
            rows.push(row);
        }

        if rows.is_empty() {
            return Err(PuzzleError::InvalidBoard("empty board".to_string()));
        }

        Self::from_rows(&rows)
    }

    pub fn size(&self) -> usize {
        self.size
    }

    /// Row-major labels.
    pub fn cells(&self) -> &[u8] {
        &self.cells
    }

    pub fn get(&self, row: usize, col: usize) -> u8 {
        self.cells[row * self.size + col]
    }

    pub fn rows(&self) -> impl Iterator<Item = &[u8]> {
        self.cells.chunks(self.size)
    }

    /// Row and column of the blank.
    pub fn blank_position(&self) -> Result<(usize, usize), PuzzleError> {
        self.cells
            .iter()
            .position(|&label| label == BLANK)
            .map(|idx| (idx / self.size, idx % self.size))
            .ok_or_else(|| PuzzleError::InvariantViolation("board has no blank".to_string()))
    }

    /// Directions the blank can move without leaving the grid, in expansion order.
    pub fn legal_moves(&self) -> Result<ArrayVec<Direction, 4>, PuzzleError> {
        let (row, col) = self.blank_position()?;
        Ok(ALL_DIRECTIONS
            .iter()
            .copied()
            .filter(|dir| self.step(row, col, *dir).is_some())
            .collect())
    }

    /// Return a new board with the blank swapped one cell in `direction`.
    pub fn apply_move(&self, direction: Direction) -> Result<Board, PuzzleError> {
        let (row, col) = self.blank_position()?;
        let (new_row, new_col) = self
            .step(row, col, direction)
            .ok_or(PuzzleError::IllegalMove {
                direction,
                row,
                col,
            })?;

        let mut cells = self.cells.clone();
        cells.swap(row * self.size + col, new_row * self.size + new_col);
        Ok(Board {
            size: self.size,
            cells,
        })
    }

    pub fn is_goal(&self) -> bool {
        let last = self.cells.len() - 1;
        self.cells[last] == BLANK
            && self.cells[..last]
                .iter()
                .enumerate()
                .all(|(idx, &label)| label as usize == idx + 1)
    }

    /// Number of pairs of non-blank tiles that appear in the opposite order to
    /// the goal in the flattened board.
    pub fn inversions(&self) -> usize {
        let tiles: Vec<u8> = self
            .cells
            .iter()
            .copied()
            .filter(|&label| label != BLANK)
            .collect();

        tiles
            .iter()
            .enumerate()
            .map(|(i, &val)| tiles[i + 1..].iter().filter(|&&next| next < val).count())
            .sum()
    }

    /// Parity test for reachability of the goal.
    ///
    /// Odd N: solvable iff the inversion count is even. Even N: solvable iff
    /// inversions plus the blank's row distance from the last row is even.
    pub fn is_solvable(&self) -> Result<bool, PuzzleError> {
        let inversions = self.inversions();
        if self.size % 2 == 1 {
            Ok(inversions % 2 == 0)
        } else {
            let (blank_row, _) = self.blank_position()?;
            let rows_from_bottom = self.size - 1 - blank_row;
            Ok((inversions + rows_from_bottom) % 2 == 0)
        }
    }

    fn step(&self, row: usize, col: usize, direction: Direction) -> Option<(usize, usize)> {
        neighbor_cell(self.size, row, col, direction)
    }
}

/// Cell reached from (row, col) in `direction`, or None if it is off the grid.
pub(crate) fn neighbor_cell(
    size: usize,
    row: usize,
    col: usize,
    direction: Direction,
) -> Option<(usize, usize)> {
    let (dr, dc) = direction.delta();
    let new_row = row.checked_add_signed(dr)?;
    let new_col = col.checked_add_signed(dc)?;
    if new_row < size && new_col < size {
        Some((new_row, new_col))
    } else {
        None
    }
}

fn check_size(size: usize) -> Result<(), PuzzleError> {
    if !(2..=MAX_SIZE).contains(&size) {
        return Err(PuzzleError::InvalidBoard(format!(
            "board size {} outside supported range 2..={}",
            size, MAX_SIZE
        )));
    }
    Ok(())
}

impl fmt::Display for Board {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let width = (self.cells.len() - 1).to_string().len();
        for row in self.rows() {
            let line = row
                .iter()
                .map(|&label| match label {
                    BLANK => format!("{:>width$}", "_"),
                    _ => format!("{:>width$}", label),
                })
                .collect::<Vec<_>>()
                .join(" ");
            writeln!(f, "{}", line)?;
        }
        Ok(())
    }
}

/// Goal row and column of every label (including the blank) for one board size.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TargetTable {
    positions: Vec<(usize, usize)>,
}

impl TargetTable {
    pub fn new(size: usize) -> Result<Self, PuzzleError> {
        check_size(size)?;
        let count = size * size;
        let mut positions = vec![(0, 0); count];
        positions[BLANK as usize] = (size - 1, size - 1);
        for label in 1..count {
            positions[label] = ((label - 1) / size, (label - 1) % size);
        }
        Ok(TargetTable { positions })
    }

    pub fn position(&self, label: u8) -> (usize, usize) {
        self.positions[label as usize]
    }
}
