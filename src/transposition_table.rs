//! A transposition table to cache the results of Connect 4 game tree searches.

use std::cell::RefCell;
use std::rc::Rc;

#[derive(Copy, Clone)]
struct Entry {
    key: u32,
    value: u8,
}
impl Entry {
    pub fn new() -> Self {
        Self { key: 0, value: 0 }
    }
}

/// The default capacity of the transposition table in entries. A prime value
/// slightly larger than `2^23` minimises hash collisions from the modulo index
pub const TABLE_MAX_SIZE: usize = (1 << 23) + 9; // 8_388_617

#[derive(Clone)]
struct TranspositionTableStorage {
    entries: Vec<Entry>,
}

impl TranspositionTableStorage {
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            entries: vec![Entry::new(); capacity],
        }
    }
    pub fn put(&mut self, key: u64, value: u8) {
        let len = self.entries.len();
        self.entries[key as usize % len] = Entry {
            key: key as u32,
            value,
        };
    }
    pub fn get(&self, key: u64) -> u8 {
        let entry = self.entries[key as usize % self.entries.len()];
        if entry.key == key as u32 {
            entry.value
        } else {
            0
        }
    }
    pub fn clear(&mut self) {
        for entry in self.entries.iter_mut() {
            *entry = Entry::new();
        }
    }
}

/// A shared, non-thread-safe, fixed-capacity, always-replace cache of
/// position key to bounded score
///
/// # Notes
///
/// This table uses `Rc<RefCell<...>>` internally to allow cheap cloning
/// and sharing between [`Solver`] instances on a single thread, so that a
/// table can be reused across related solves in a single-threaded caller
///
/// Collisions are resolved by always replacing the stored entry: only the
/// lower 32 bits of the 49-bit key are kept, so an unrelated position that
/// hashes to the same slot silently evicts the previous entry. This is sound
/// because a probe only ever returns a value when the stored partial key
/// still matches, and full-key collisions between distinct legal positions
/// are impossible (see [`BitBoard::key`])
///
/// See [`BitBoard`] for a description of the key values and [`Solver`] for a description of the values
///
/// [`BitBoard`]: ../bitboard/struct.BitBoard.html#board-keys
/// [`BitBoard::key`]: ../bitboard/struct.BitBoard.html#method.key
/// [`Solver`]: ../solver/struct.Solver.html#position-scoring
#[derive(Clone)]
pub struct TranspositionTable(Rc<RefCell<TranspositionTableStorage>>);

impl TranspositionTable {
    /// Creates an empty transposition table at the reference capacity (8_388_617 entries, ~8 MiB)
    pub fn new() -> Self {
        Self::with_capacity(TABLE_MAX_SIZE)
    }

    /// Creates an empty transposition table with a caller-chosen capacity
    ///
    /// Mainly useful for tests that want to force collisions with a small table;
    /// production solves should use [`TranspositionTable::new`]
    pub fn with_capacity(capacity: usize) -> Self {
        Self(Rc::new(RefCell::new(
            TranspositionTableStorage::with_capacity(capacity),
        )))
    }

    /// Stores a bounded score for a position key, unconditionally replacing any
    /// existing entry at the same slot
    pub fn put(&self, key: u64, value: u8) {
        self.0.borrow_mut().put(key, value);
    }

    /// Retrieves the bounded score stored for a position key, or 0 on a miss
    /// (empty slot or a partial-key mismatch from a different position)
    pub fn get(&self, key: u64) -> u8 {
        self.0.borrow().get(key)
    }

    /// Zeroes every slot in the table
    pub fn clear(&self) {
        self.0.borrow_mut().clear();
    }
}

impl Default for TranspositionTable {
    fn default() -> Self {
        Self::new()
    }
}
