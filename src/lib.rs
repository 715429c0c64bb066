//! Position representation, move make/unmake, and a parallel
//! iterative-deepening alpha-beta searcher with quiescence, a lock-free
//! transposition table, and move ordering.
//!
//! The neural-network evaluator, tablebase probes, text-protocol dispatcher,
//! opening book, SAN parsing, and any hand-crafted evaluator are collaborator
//! concerns outside this crate; see [`board::evaluator::Evaluator`].
pub mod board;
pub mod tt;
pub mod zobrist;
