//! Typed errors for board parsing and opening book loading
//!
//! Search itself never fails: every reachable position yields an in-bounds
//! score. These variants only cover the two external boundaries of the
//! core — move-sequence parsing and opening book I/O.

use std::path::PathBuf;

use thiserror::Error;

/// An error produced while parsing a move sequence or loading the opening book
#[derive(Debug, Error)]
pub enum SolverError {
    /// A character outside `'1'..='7'` appeared in a move sequence
    #[error("invalid move character '{char}' at position {index}")]
    InvalidMoveChar { char: char, index: usize },

    /// A move was played in a column that already holds `HEIGHT` tiles
    #[error("column {column} is full (move {index})")]
    ColumnFull { column: usize, index: usize },

    /// A move would complete a four-in-a-row; the parser refuses to build
    /// terminal positions, since the corpus of move sequences this core
    /// consumes stores only non-terminal prefixes
    #[error("move {index} in column {column} wins the game; refusing to parse a terminal position")]
    AlreadyWon { column: usize, index: usize },

    /// The opening book file does not exist
    #[error("opening book not found at {path:?}")]
    BookMissing { path: PathBuf },

    /// The opening book file exists but is the wrong length (truncated,
    /// corrupted, or not a book file at all)
    #[error("opening book at {path:?} is corrupt: expected {expected_len} bytes, found {actual_len}")]
    BookCorrupt {
        path: PathBuf,
        expected_len: u64,
        actual_len: u64,
    },

    /// Any other I/O failure while opening or reading the book (permissions, etc.)
    #[error("I/O error reading opening book: {0}")]
    BookIo(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, SolverError>;
