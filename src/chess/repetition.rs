//! Threefold repetition tracking on top of Zobrist hashes.

use std::collections::HashMap;

use shakmaty::zobrist::Zobrist64;
use shakmaty::{Chess, EnPassantMode, Position};

/// Zobrist keys are 64-bit unsigned integers. En passant squares are part of
/// the key only when the capture is legal, as the repetition rule requires.
pub type Key = u64;

/// Computes the repetition key of the position.
#[must_use]
pub fn key(position: &Chess) -> Key {
    position
        .zobrist_hash::<Zobrist64>(EnPassantMode::Legal)
        .into()
}

/// Counts occurrences of positions since the last irreversible move.
#[derive(Clone, Debug, Default)]
pub struct RepetitionTable {
    table: HashMap<Key, u8>,
}

impl RepetitionTable {
    /// Creates an empty repetition table.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Removes all entries from the repetition history.
    ///
    /// Called after captures and pawn moves: no position before them can ever
    /// occur again.
    pub fn clear(&mut self) {
        self.table.clear();
    }

    /// Checks whether the repetition table has no entries.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.table.is_empty()
    }

    /// Number of times the position with `key` has occurred.
    #[must_use]
    pub fn count(&self, key: Key) -> u8 {
        self.table.get(&key).copied().unwrap_or(0)
    }

    /// Records the position and returns true if it has now occurred at least
    /// 3 times.
    ///
    /// In the tournament setting 3-fold repetition is a draw.
    #[must_use]
    pub fn record(&mut self, key: Key) -> bool {
        let count = self.table.entry(key).or_insert(0);
        *count = count.saturating_add(1);
        *count >= 3
    }
}
