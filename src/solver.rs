//! An agent to solve the game of Connect 4

use crate::{bitboard::*, opening_book::*, transposition_table::*, HEIGHT, WIDTH};

use std::cmp::Ordering;
use std::time::Instant;

use log::{debug, trace};

/// The minimum possible score of a position
pub const MIN_SCORE: i32 = -((WIDTH * HEIGHT) as i32) / 2 + 3;
/// The maximum possible score of a postion
pub const MAX_SCORE: i32 = ((WIDTH * HEIGHT) as i32 + 1) / 2 - 3;

struct MoveSorter {
    size: usize,
    // move bitmap, column and score
    moves: [(u64, usize, i32); WIDTH],
}

impl MoveSorter {
    pub fn new() -> Self {
        Self {
            size: 0,
            moves: [(0, 0, 0); WIDTH],
        }
    }
    /// Inserts a candidate move, keeping the buffer sorted by score ascending.
    /// Ties keep the relative order moves were pushed in, so pushing in
    /// static-order gives static order as the tiebreak
    pub fn push(&mut self, new_move: u64, column: usize, score: i32) {
        let mut pos = self.size;
        self.size += 1;
        while pos != 0 && self.moves[pos - 1].2 > score {
            self.moves[pos] = self.moves[pos - 1];
            pos -= 1;
        }
        self.moves[pos] = (new_move, column, score);
    }
}
impl Iterator for MoveSorter {
    type Item = (u64, usize);

    /// Yields moves highest-score-first: best-scoring candidates are searched
    /// first, since they are most likely to cause a beta cutoff
    fn next(&mut self) -> Option<Self::Item> {
        match self.size {
            0 => None,
            _ => {
                self.size -= 1;
                Some((self.moves[self.size].0, self.moves[self.size].1))
            }
        }
    }
}

/// Returns the column order visited at each node: centre first, then
/// alternating outward, since central columns participate in more winning
/// lines and are more likely to produce strong moves and early cutoffs
pub const fn move_order() -> [usize; WIDTH] {
    let mut move_order = [0; WIDTH];
    let mut i = 0;
    while i < WIDTH {
        move_order[i] = (WIDTH / 2) + (i % 2) * (i / 2 + 1) - (1 - i % 2) * (i / 2);
        i += 1;
    }
    move_order
}

/// An agent to solve Connect 4 positions
///
/// # Notes
/// This agent uses a classical game tree search with various optimisations to
/// find the mathematically best move(s) in any position, thus 'solving' the game
///
/// # Position Scoring
/// A position is scored by how far a forced win is from the start of the game for either player.
/// If the first player wins with their final placed tile (their 21st tile in a 7x6 board)
/// the score is 1, or -1 if the the second player wins with their final tile. Earlier wins
/// have scores further from 0, up to 18/-18, where a player wins with their 4th tile. A drawn position
/// has a score of 0
#[derive(Clone)]
pub struct Solver {
    board: BitBoard,

    /// The number of nodes searched by this `Solver` so far (for diagnostics only)
    pub node_count: usize,
    transposition_table: TranspositionTable,
    opening_book: Option<OpeningBook>,
}

impl Solver {
    /// Creates a new `Solver` from a bitboard
    pub fn new(board: BitBoard) -> Self {
        Self {
            board,
            node_count: 0,
            transposition_table: TranspositionTable::new(),
            opening_book: None,
        }
    }

    /// Creates a new `Solver` from a bitboard with a given transposition table
    ///
    /// Reusing a table across related solves (e.g. successive moves of one game)
    /// is safe: stored bounds describe absolute positions, not search contexts
    pub fn new_with_transposition_table(
        board: BitBoard,
        transposition_table: TranspositionTable,
    ) -> Self {
        Self {
            board,
            node_count: 0,
            transposition_table,
            opening_book: None,
        }
    }

    /// Attaches an opening book to an existing `Solver`
    pub fn with_opening_book(mut self, opening_book: OpeningBook) -> Self {
        self.opening_book = Some(opening_book);
        self
    }

    /// Performs game tree search
    ///
    /// Returns the score of the position (see [Position Scoring])
    ///
    /// [Position Scoring]: #position-scoring
    fn negamax(&mut self, mut alpha: i32, mut beta: i32) -> i32 {
        self.node_count += 1;
        debug_assert!(alpha < beta);

        // check for next-move win for current player
        for column in 0..WIDTH {
            if self.board.playable(column) && self.board.check_winning_move(column) {
                return ((WIDTH * HEIGHT + 1 - self.board.num_moves()) / 2) as i32;
            }
        }

        // look for moves that don't give the opponent a next turn win
        let non_losing_moves = self.board.non_losing_moves();
        if non_losing_moves == 0 {
            return -((WIDTH * HEIGHT) as i32 - self.board.num_moves() as i32) / 2;
        }

        // check for draw
        if self.board.num_moves() == WIDTH * HEIGHT {
            return 0;
        }

        // check opening book at its fixed probe depth
        if self.board.num_moves() == DATABASE_DEPTH {
            if let Some(book) = &self.opening_book {
                if let Some(score) = book.get(self.board.canonical_code()) {
                    return score;
                }
            }
        }

        // upper bound of score, from the move count alone
        let mut max = (((WIDTH * HEIGHT) - 1 - self.board.num_moves()) / 2) as i32;

        // try to fetch the upper/lower bound of the score from the transposition table
        let key = self.board.key();
        let value = self.transposition_table.get(key) as i32;
        if value != 0 {
            // lower bound
            if value > MAX_SCORE - MIN_SCORE + 1 {
                let min = value + 2 * MIN_SCORE - MAX_SCORE - 2;
                if alpha < min {
                    alpha = min;
                    if alpha >= beta {
                        // prune the exploration
                        return alpha;
                    }
                }
            // upper bound
            } else {
                let ub = value + MIN_SCORE - 1;
                if beta > ub {
                    beta = ub;
                    if alpha >= beta {
                        // prune the exploration
                        return beta;
                    }
                }
            }
            max = value + MIN_SCORE - 1;
        }
        if beta > max {
            // clamp beta to calculated upper bound
            beta = max;
            // if the upper bound is lower than alpha, we can prune the exploration
            if alpha >= beta {
                return beta;
            };
        }

        let mut moves = MoveSorter::new();
        // reversing move order to put edges first reduces the amount of sorting
        // as these moves are worse on average
        for i in (0..WIDTH).rev() {
            let column = move_order()[i];
            let candidate = non_losing_moves & BitBoard::column_mask(column);
            if candidate != 0 && self.board.playable(column) {
                moves.push(candidate, column, self.board.move_score(candidate))
            }
        }

        // search the next level of the tree
        for (move_bitmap, _column) in moves {
            let mut next = self.clone();
            next.node_count = 0;

            next.board.play(move_bitmap);
            // the search window is flipped for the other player
            let score = -next.negamax(-beta, -alpha);
            self.node_count += next.node_count;
            // if a child node's score is better than beta, we can prune the tree
            // here because a perfect opponent will not pick this branch
            if score >= beta {
                // save a lower bound of the score
                self.transposition_table
                    .put(key, (score + MAX_SCORE - 2 * MIN_SCORE + 2) as u8);
                return score;
            }
            if score > alpha {
                alpha = score;
            }
        }

        // offset of one to prevent storing a 0, which represents an empty entry
        self.transposition_table
            .put(self.board.key(), (alpha - MIN_SCORE + 1) as u8);
        alpha
    }

    /// Performs a top-level search, bypassing the transposition table and opening book
    /// so that the returned score is always paired with the move that produced it
    ///
    /// Returns the score of the position and the calculated best move
    fn top_level_search(&mut self, mut alpha: i32, beta: i32) -> (i32, usize) {
        self.node_count += 1;

        // check for win for current player on this move
        for column in 0..WIDTH {
            if self.board.playable(column) && self.board.check_winning_move(column) {
                return (
                    ((WIDTH * HEIGHT + 1 - self.board.num_moves()) / 2) as i32,
                    column,
                );
            }
        }

        // look for moves that don't give the opponent a next turn win
        let non_losing_moves = self.board.non_losing_moves();
        if non_losing_moves == 0 {
            // all moves lose, return the first legal move found
            let first = (0..WIDTH).find(|&i| self.board.playable(i)).unwrap();
            return (
                -((WIDTH * HEIGHT) as i32 - self.board.num_moves() as i32) / 2,
                first,
            );
        }

        // check for draw (no valid moves)
        if self.board.num_moves() == WIDTH * HEIGHT {
            return (0, WIDTH);
        }

        let mut moves = MoveSorter::new();
        for i in (0..WIDTH).rev() {
            let column = move_order()[i];
            let candidate = non_losing_moves & BitBoard::column_mask(column);
            if candidate != 0 && self.board.playable(column) {
                moves.push(candidate, column, self.board.move_score(candidate))
            }
        }

        // search the next level of the tree and keep track of the best move
        let mut best_score = MIN_SCORE;
        let mut best_move = WIDTH;
        for (move_bitmap, column) in moves {
            let mut next = self.clone();
            next.node_count = 0;

            next.board.play(move_bitmap);
            // the search window is flipped for the other player
            let score = -next.negamax(-beta, -alpha);
            self.node_count += next.node_count;
            // if the actual score is better than beta, we can prune the tree
            // because the other player will not pick this branch; the cutoff
            // move is the column returning
            if score >= beta {
                return (score, column);
            }
            if score > alpha {
                alpha = score;
            }
            if score > best_score {
                best_score = score;
                best_move = column;
            }
        }

        (alpha, best_move)
    }

    /// Calculates the score and best move of the current position by iterated
    /// null-window search, narrowing the score interval from both ends
    pub fn solve(&mut self) -> (i32, usize) {
        let started = Instant::now();
        debug!(
            "solve() starting at move {} of {}",
            self.board.num_moves(),
            WIDTH * HEIGHT
        );

        let mut min = -(((WIDTH * HEIGHT) as i32) - self.board.num_moves() as i32) / 2;
        let mut max = (WIDTH * HEIGHT + 1 - self.board.num_moves()) as i32 / 2;

        let mut next_move = WIDTH;
        // iteratively narrow the search window
        while min < max {
            let mut mid = min + (max - min) / 2;
            // bias the probe toward zero so draw-ish positions narrow faster
            if mid <= 0 && min / 2 < mid {
                mid = min / 2
            } else if mid >= 0 && max / 2 > mid {
                mid = max / 2
            }

            trace!("null-window probe [{}, {}], window [{}, {}]", mid, mid + 1, min, max);

            // a null-window search only tells us whether the true score is
            // above or below `mid`, not its exact value
            let (r, best_move) = self.top_level_search(mid, mid + 1);
            next_move = best_move;

            if r <= mid {
                max = r
            } else {
                min = r;
            }
        }

        debug!(
            "solve() finished: score={} best_move={} nodes={} elapsed={:?}",
            min, next_move, self.node_count, started.elapsed()
        );
        // min and max are equal here
        (min, next_move)
    }

    /// Converts a position score to a win distance in plies-to-end
    pub fn score_to_win_distance(&self, score: i32) -> usize {
        match score.cmp(&0) {
            Ordering::Equal => WIDTH * HEIGHT - self.board.num_moves(),
            Ordering::Greater => {
                (WIDTH * HEIGHT / 2 + 1 - score as usize) - self.board.num_moves() / 2
            }
            Ordering::Less => {
                (WIDTH * HEIGHT / 2 + 1) - (-score as usize) - self.board.num_moves() / 2
            }
        }
    }
}

impl std::ops::Deref for Solver {
    type Target = BitBoard;

    fn deref(&self) -> &Self::Target {
        &self.board
    }
}
