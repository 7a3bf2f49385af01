//! Reads the fixed-depth opening book consulted by [`Solver`](crate::solver::Solver)
//!
//! The book is a sorted flat array of `(canonical_code, score)` pairs for every
//! position reached after exactly [`DATABASE_DEPTH`] plies, keyed by
//! [`BitBoard::canonical_code`](crate::bitboard::BitBoard::canonical_code). It is
//! generated offline; this module only consumes it.

use std::fs::File;
use std::io::{BufReader, Read};
use std::path::{Path, PathBuf};
use std::rc::Rc;

use log::{info, warn};

use crate::error::{Result, SolverError};

/// Default filename the book is read from in the working directory
pub const DATABASE_PATH: &str = "opening_database.bin";
/// Number of plies at which the search probes the book
pub const DATABASE_DEPTH: usize = 12;
/// Number of entries in the reference book
pub const DATABASE_NUM_POSITIONS: usize = 4_200_899;
/// On-disk size of one entry: a big-endian `u32` code followed by a signed `i8` score
const ENTRY_SIZE: u64 = 5;

/// A read-only, reference-counted handle to a loaded opening book
///
/// Cheap to clone; loading happens once and the backing storage is shared
#[derive(Clone)]
pub struct OpeningBook(Rc<OpeningBookStorage>);

impl OpeningBook {
    /// Loads the book from the default path (`opening_database.bin` in the working directory)
    pub fn load_default() -> Result<Self> {
        Self::load(DATABASE_PATH)
    }

    /// Loads the book from an explicit path
    ///
    /// Returns [`SolverError::BookMissing`] if the file does not exist,
    /// [`SolverError::BookCorrupt`] if it exists but is not exactly
    /// `DATABASE_NUM_POSITIONS * 5` bytes long, or [`SolverError::BookIo`] for
    /// any other I/O failure
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        Ok(Self(Rc::new(OpeningBookStorage::load(path.as_ref())?)))
    }

    /// Looks up the exact score for a position at [`DATABASE_DEPTH`] plies by its
    /// canonical code. Returns `None` if the position is not present in the book
    /// (unreachable or pruned during generation)
    pub fn get(&self, canonical_code: u32) -> Option<i32> {
        self.0.get(canonical_code)
    }
}

struct OpeningBookStorage {
    positions: Vec<u32>,
    values: Vec<i8>,
}

impl OpeningBookStorage {
    fn load(path: &Path) -> Result<Self> {
        let expected_len = DATABASE_NUM_POSITIONS as u64 * ENTRY_SIZE;

        let file = File::open(path).map_err(|err| {
            if err.kind() == std::io::ErrorKind::NotFound {
                SolverError::BookMissing {
                    path: PathBuf::from(path),
                }
            } else {
                SolverError::BookIo(err)
            }
        })?;

        let actual_len = file.metadata()?.len();
        if actual_len != expected_len {
            warn!(
                "opening book {:?} has length {}, expected {}",
                path, actual_len, expected_len
            );
            return Err(SolverError::BookCorrupt {
                path: PathBuf::from(path),
                expected_len,
                actual_len,
            });
        }

        let mut reader = BufReader::new(file);
        let mut positions = vec![0u32; DATABASE_NUM_POSITIONS];
        let mut values = vec![0i8; DATABASE_NUM_POSITIONS];

        for i in 0..DATABASE_NUM_POSITIONS {
            let mut code_bytes = [0; 4];
            reader.read_exact(&mut code_bytes)?;
            positions[i] = u32::from_be_bytes(code_bytes);

            let mut score_byte = [0; 1];
            reader.read_exact(&mut score_byte)?;
            values[i] = i8::from_be_bytes(score_byte);
        }

        info!(
            "loaded opening book from {:?}: {} positions",
            path, DATABASE_NUM_POSITIONS
        );

        Ok(Self { positions, values })
    }

    /// Step-halving descent: starts at the last index and halves the step
    /// (rounding up) each iteration, terminating when the step reaches 0.
    /// Touches O(log N) entries without needing N to be a power of two
    fn get(&self, canonical_code: u32) -> Option<i32> {
        if self.positions.is_empty() {
            return None;
        }

        let mut step = self.positions.len() - 1;
        let mut pos = step;

        while step > 0 {
            step = if step != 1 { (step + (step & 1)) >> 1 } else { 0 };

            // an out-of-range pos (possible from the wrapping add/sub below) reads
            // as code 0, which always compares less than any real canonical code
            let code = *self.positions.get(pos).unwrap_or(&0);

            if canonical_code < code {
                pos = pos.wrapping_sub(step);
            } else if canonical_code > code {
                pos = pos.wrapping_add(step);
            } else {
                // equality against the code-0 sentinel only means a real hit if
                // `pos` actually landed in range
                return self.values.get(pos).map(|&v| v as i32);
            }
        }
        None
    }
}

#[cfg(test)]
mod tests {
    use super::OpeningBookStorage;

    // codes must be sorted ascending, as they would be in a real book file
    fn sample_storage() -> OpeningBookStorage {
        OpeningBookStorage {
            positions: vec![4, 20, 55, 200, 1_000, 50_000, 1_000_000],
            values: vec![1, -2, 0, 18, -18, 3, -1],
        }
    }

    #[test]
    fn descent_finds_every_stored_code() {
        let storage = sample_storage();
        for (code, &value) in storage.positions.clone().iter().zip(storage.values.iter()) {
            assert_eq!(storage.get(*code), Some(value as i32));
        }
    }

    #[test]
    fn descent_misses_absent_codes() {
        let storage = sample_storage();
        for missing in [0u32, 1, 19, 56, 999, 999_999, 2_000_000] {
            assert_eq!(storage.get(missing), None);
        }
    }

    #[test]
    fn descent_handles_empty_storage() {
        let storage = OpeningBookStorage {
            positions: vec![],
            values: vec![],
        };
        assert_eq!(storage.get(0), None);
        assert_eq!(storage.get(12345), None);
    }

    #[test]
    fn descent_does_not_panic_on_wrapping_excursion() {
        // a code above every stored entry pushes `pos` past the end of the
        // array via repeated wrapping_add; each out-of-range read must fall
        // back to the code-0 sentinel and keep searching instead of panicking
        // or indexing out of bounds
        let storage = sample_storage();
        assert_eq!(storage.get(1_000_000), Some(-1));
        assert_eq!(storage.get(u32::MAX), None);
        assert_eq!(storage.get(2_000_000), None);
    }
}
