//! Evaluation collaborator.
//!
//! The searcher never scores a position itself; it asks a `dyn Evaluator`
//! for a centipawn score from the side-to-move's perspective. Production
//! evaluators (NNUE, hand-crafted term tables) are outside this crate and
//! plug in at this boundary.

use super::state::Board;
use super::types::{Color, Piece};

/// A centipawn score beyond which values are reserved for mate distances.
/// Evaluators must keep their output strictly inside `(-MATE_THRESHOLD, MATE_THRESHOLD)`.
pub const MATE_THRESHOLD: i32 = 30000;

/// Scores a position from the side-to-move's perspective.
///
/// Implementations must be deterministic for a fixed board and side to move,
/// and must not mutate `board`.
pub trait Evaluator: Send + Sync {
    /// Static evaluation in centipawns, from the side to move's perspective.
    fn evaluate(&self, board: &Board) -> i32;

    /// Optional hook called with the position at the parent node just before
    /// a child is evaluated, so an evaluator can warm an incremental cache.
    /// The default implementation does nothing.
    fn hint_parent(&self, _board: &Board) {}
}

/// A minimal material-only evaluator.
///
/// Sums piece values for the side to move minus the opponent. Useful as a
/// test fixture and as a cheap fallback; not a production evaluator.
#[derive(Clone, Copy, Debug, Default)]
pub struct MaterialEvaluator;

impl MaterialEvaluator {
    #[must_use]
    pub fn new() -> Self {
        MaterialEvaluator
    }

    fn material_for(board: &Board, color: Color) -> i32 {
        [
            Piece::Pawn,
            Piece::Knight,
            Piece::Bishop,
            Piece::Rook,
            Piece::Queen,
        ]
        .iter()
        .map(|&piece| board.pieces_of(color, piece).popcount() as i32 * piece.value())
        .sum()
    }
}

impl Evaluator for MaterialEvaluator {
    fn evaluate(&self, board: &Board) -> i32 {
        let stm = board.side_to_move();
        let us = Self::material_for(board, stm);
        let them = Self::material_for(board, stm.opponent());
        us - them
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::board::Board as PublicBoard;

    #[test]
    fn starting_position_is_balanced() {
        let board = PublicBoard::new();
        let eval = MaterialEvaluator::new();
        assert_eq!(eval.evaluate(&board), 0);
    }

    #[test]
    fn missing_queen_is_material_down() {
        use super::super::types::Square;

        let mut board = PublicBoard::new();
        let queen_sq = (0..64)
            .map(Square::from_index)
            .find(|&sq| board.piece_at(sq) == Some((Color::Black, Piece::Queen)))
            .unwrap();
        board.remove_piece(queen_sq, Color::Black, Piece::Queen);
        let eval = MaterialEvaluator::new();
        assert!(eval.evaluate(&board) > 0);
    }
}
