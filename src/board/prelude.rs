//! Prelude module for convenient imports.
//!
//! This module re-exports the most commonly used types and functions.
//!
//! # Example
//! ```
//! use search_core::board::prelude::*;
//! ```

pub use super::{
    find_best_move, find_best_move_with_time, Board, BoardBuilder, CastlingRights, Color,
    Evaluator, FenError, MaterialEvaluator, Move, MoveList, MoveParseError, Piece, SearchState,
    Square, SquareError,
};
