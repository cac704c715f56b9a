use crate::board::{Board, Direction};
use crate::error::PuzzleError;

/// Handle to a node in a [`SearchTree`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct NodeId(usize);

/// One search state: a board, its path cost, and how it was reached.
#[derive(Debug, Clone)]
pub struct Node {
    pub board: Board,
    pub g: u32,
    pub parent: Option<NodeId>,
    /// Move that produced this node from its parent; `None` at the root.
    pub direction: Option<Direction>,
}

/// Arena holding the current depth-first branch.
///
/// Nodes are only appended below the most recent node and are discarded with
/// [`truncate`](Self::truncate) when their branch is abandoned, so the arena
/// never holds more than one root-to-leaf path.
#[derive(Debug, Default)]
pub struct SearchTree {
    nodes: Vec<Node>,
}

impl SearchTree {
    pub fn new() -> Self {
        Self::default()
    }

    /// Clear the tree and insert `board` as the root.
    pub fn reset(&mut self, board: Board) -> NodeId {
        self.nodes.clear();
        self.nodes.push(Node {
            board,
            g: 0,
            parent: None,
            direction: None,
        });
        NodeId(0)
    }

    pub fn push_child(&mut self, parent: NodeId, direction: Direction, board: Board) -> NodeId {
        let g = self.nodes[parent.0].g + 1;
        self.nodes.push(Node {
            board,
            g,
            parent: Some(parent),
            direction: Some(direction),
        });
        NodeId(self.nodes.len() - 1)
    }

    pub fn get(&self, id: NodeId) -> &Node {
        &self.nodes[id.0]
    }

    /// Drop `id` and every node created after it.
    pub fn truncate(&mut self, id: NodeId) {
        self.nodes.truncate(id.0);
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Nodes from `id` back to the root.
    pub fn ancestry(&self, id: NodeId) -> Ancestry<'_> {
        Ancestry {
            tree: self,
            next: Some(id),
        }
    }
}

pub struct Ancestry<'a> {
    tree: &'a SearchTree,
    next: Option<NodeId>,
}

impl<'a> Iterator for Ancestry<'a> {
    type Item = &'a Node;

    fn next(&mut self) -> Option<Self::Item> {
        let node = self.tree.get(self.next?);
        self.next = node.parent;
        Some(node)
    }
}

/// An ordered move list from a start board to the goal, with every
/// intermediate board.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Solution {
    moves: Vec<Direction>,
    boards: Vec<Board>,
}

impl Solution {
    /// Walk parent links from `goal` to the root and reverse.
    pub fn reconstruct(tree: &SearchTree, goal: NodeId) -> Self {
        let mut moves = Vec::new();
        let mut boards = Vec::new();
        for node in tree.ancestry(goal) {
            boards.push(node.board.clone());
            if let Some(direction) = node.direction {
                moves.push(direction);
            }
        }
        moves.reverse();
        boards.reverse();
        Solution { moves, boards }
    }

    pub fn moves(&self) -> &[Direction] {
        &self.moves
    }

    /// Boards from start to goal; one more than the number of moves.
    pub fn boards(&self) -> &[Board] {
        &self.boards
    }

    pub fn start(&self) -> &Board {
        &self.boards[0]
    }

    pub fn cost(&self) -> usize {
        self.moves.len()
    }

    /// Moves paired with the board each one produces.
    pub fn steps(&self) -> impl Iterator<Item = (Direction, &Board)> {
        self.moves.iter().copied().zip(self.boards.iter().skip(1))
    }
}

/// Apply `moves` to `start` in order.
pub fn replay(start: &Board, moves: &[Direction]) -> Result<Board, PuzzleError> {
    moves
        .iter()
        .try_fold(start.clone(), |board, &direction| board.apply_move(direction))
}
