//! A strong solver for the board game 'Connect 4'
//!
//! Given any legal 7x6 position, [`solver::Solver`] proves the game-theoretic
//! outcome under perfect play — win-in-k, loss-in-k, or draw — and returns the
//! best move. It never approximates: every returned score is exact.
//!
//! # Basic Usage
//!
//! ```
//! use connect4_solver::{solver::Solver, bitboard::BitBoard};
//!
//!# use std::error::Error;
//!# fn main() -> Result<(), Box<dyn Error>> {
//! let mut solver = Solver::new(BitBoard::from_moves("112233")?);
//! let (score, best_move) = solver.solve();
//!
//! assert!((score, best_move) == (18, 3));
//!# Ok(())
//!# }
//! ```
//!
//! An opening book consulted at a fixed ply depth speeds up early-game solves
//! considerably; without one, the search still completes, just slower. See
//! [`opening_book::OpeningBook`].

use static_assertions::*;

pub mod bitboard;
pub mod error;
pub mod opening_book;
pub mod solver;
pub mod transposition_table;


/// The width of the game board in tiles
pub const WIDTH: usize = 7;

/// The height of the game board in tiles
pub const HEIGHT: usize = 6;

// ensure that the given dimensions fit in a u64 for the bitboard representation
const_assert!(WIDTH * (HEIGHT + 1) < 64);
