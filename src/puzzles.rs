use crate::board::Board;
use crate::error::PuzzleError;
use std::fs;
use std::path::Path;

/// A collection of boards read from a text file.
///
/// Boards are written one row per line (see [`Board::from_text`]) and are
/// separated by empty lines or by lines starting with `;`, which also serve
/// as comments.
#[derive(Debug)]
pub struct PuzzleSet {
    boards: Vec<Board>,
}

impl PuzzleSet {
    pub fn from_text(contents: &str) -> Result<Self, PuzzleError> {
        let mut boards = Vec::new();
        let mut current = String::new();

        for line in contents.lines() {
            if line.trim_start().starts_with(';') || line.trim().is_empty() {
                if !current.is_empty() {
                    boards.push(parse_board(&current, boards.len())?);
                    current.clear();
                }
                continue;
            }

            current.push_str(line);
            current.push('\n');
        }

        if !current.is_empty() {
            boards.push(parse_board(&current, boards.len())?);
        }

        Ok(PuzzleSet { boards })
    }

    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, PuzzleError> {
        let contents = fs::read_to_string(path)?;
        Self::from_text(&contents)
    }

    /// Get the nth board (0-indexed).
    pub fn get(&self, index: usize) -> Option<&Board> {
        self.boards.get(index)
    }

    pub fn len(&self) -> usize {
        self.boards.len()
    }

    pub fn is_empty(&self) -> bool {
        self.boards.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Board> {
        self.boards.iter()
    }
}

fn parse_board(text: &str, index: usize) -> Result<Board, PuzzleError> {
    Board::from_text(text)
        .map_err(|err| PuzzleError::InvalidPuzzleFile(format!("puzzle {}: {}", index + 1, err)))
}
