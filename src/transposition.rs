use std::sync::atomic::{AtomicU16, AtomicU64, Ordering};

use crate::moves::moves::Move;
use crate::search::MATE_BOUND;

/// Bound classification for a stored score
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub enum Bound {
    /// Slot has never been written
    #[default]
    None,
    /// Score is an upper bound (search failed low)
    Upper,
    /// Score is a lower bound (search failed high)
    Lower,
    /// Score is exact within the searched horizon
    Exact,
}

/// Decoded view of one table slot
#[derive(Clone, Copy, Debug)]
pub struct TtEntry {
    pub best_move: Move,
    pub score: i32,
    pub static_eval: i32,
    pub depth: i32,
    pub bound: Bound,
}

/// One slot, packed into two relaxed atomics:
///
///   data: key(16) | move(16) | score(16) | static_eval(16)
///   meta: depth(8) | bound(2) + age(6)
///
/// Reads and writes are lock-free and may tear between the two words under
/// contention. The table is advisory: a torn entry at worst produces a
/// useless hint, and the 16-bit key check filters almost all of them.
#[derive(Default)]
struct Slot {
    data: AtomicU64,
    meta: AtomicU16,
}

pub struct TranspositionTable {
    slots: Box<[Slot]>,
    age: AtomicU16,
}

const BYTES_PER_MB: usize = 1024 * 1024;
const MAX_AGE: u16 = (1 << 6) - 1;

impl TranspositionTable {
    pub fn new(mb: usize) -> TranspositionTable {
        let len = (mb * BYTES_PER_MB / std::mem::size_of::<Slot>()).max(1);
        let mut slots = Vec::new();
        slots.resize_with(len, Slot::default);
        TranspositionTable { slots: slots.into_boxed_slice(), age: AtomicU16::new(0) }
    }

    pub fn clear(&self) {
        for slot in self.slots.iter() {
            slot.data.store(0, Ordering::Relaxed);
            slot.meta.store(0, Ordering::Relaxed);
        }
        self.age.store(0, Ordering::Relaxed);
    }

    fn age(&self) -> u16 {
        self.age.load(Ordering::Relaxed)
    }

    /// Bumped once per root search so stale entries lose replacement fights
    pub fn age_up(&self) {
        self.age.store((self.age() + 1) & MAX_AGE, Ordering::Relaxed);
    }

    fn slot_index(&self, hash: u64) -> usize {
        ((u128::from(hash) * self.slots.len() as u128) >> 64) as usize
    }

    /// Looks up a position. Mate scores come back adjusted to be relative to
    /// `ply` so distance-to-mate survives the round trip.
    pub fn probe(&self, hash: u64, ply: usize) -> Option<TtEntry> {
        let slot = &self.slots[self.slot_index(hash)];
        let data = slot.data.load(Ordering::Relaxed);
        let meta = slot.meta.load(Ordering::Relaxed);

        if data as u16 != hash as u16 {
            return None;
        }
        let bound = match meta >> 8 & 0b11 {
            0 => return None,
            1 => Bound::Upper,
            2 => Bound::Lower,
            _ => Bound::Exact,
        };
        Some(TtEntry {
            best_move: Move::from_u16((data >> 16) as u16),
            score: score_from_tt((data >> 32) as u16 as i16 as i32, ply),
            static_eval: (data >> 48) as u16 as i16 as i32,
            depth: (meta & 0xFF) as i32,
            bound,
        })
    }

    pub fn store(
        &self,
        hash: u64,
        best_move: Move,
        depth: i32,
        bound: Bound,
        score: i32,
        ply: usize,
        static_eval: i32,
    ) {
        let slot = &self.slots[self.slot_index(hash)];
        let old_data = slot.data.load(Ordering::Relaxed);
        let old_meta = slot.meta.load(Ordering::Relaxed);
        let key = hash as u16;

        let same_position = old_data as u16 == key;
        let old_age = old_meta >> 10;
        let old_depth = (old_meta & 0xFF) as i32;

        // Keep deep results from the current search for the same position
        // unless the new entry is exact or nearly as deep
        if same_position && old_age == self.age() && bound != Bound::Exact && depth + 4 < old_depth {
            return;
        }

        // A best move is worth keeping even when the new search had none
        let stored_move = if best_move == Move::NONE && same_position {
            (old_data >> 16) as u16
        } else {
            best_move.as_u16()
        };

        let score = score_to_tt(score, ply) as i16 as u16 as u64;
        let eval = static_eval as i16 as u16 as u64;
        let data = key as u64 | (stored_move as u64) << 16 | score << 32 | eval << 48;
        let bound_bits = match bound {
            Bound::None => 0u16,
            Bound::Upper => 1,
            Bound::Lower => 2,
            Bound::Exact => 3,
        };
        let meta = (depth as u16 & 0xFF) | bound_bits << 8 | self.age() << 10;

        slot.data.store(data, Ordering::Relaxed);
        slot.meta.store(meta, Ordering::Relaxed);
    }

}

/// Mate scores are stored relative to the node they were found at, not the
/// root: a score of `CHECKMATE - n` means "mate in n plies from here"
pub fn score_to_tt(score: i32, ply: usize) -> i32 {
    if score > MATE_BOUND {
        score + ply as i32
    } else if score < -MATE_BOUND {
        score - ply as i32
    } else {
        score
    }
}

pub fn score_from_tt(score: i32, ply: usize) -> i32 {
    if score > MATE_BOUND {
        score - ply as i32
    } else if score < -MATE_BOUND {
        score + ply as i32
    } else {
        score
    }
}

#[cfg(test)]
mod tt_tests {
    use super::*;
    use crate::moves::moves::MoveFlag;
    use crate::search::{CHECKMATE, INFINITY};
    use crate::types::square::Square;

    #[test]
    fn store_then_probe() {
        let tt = TranspositionTable::new(1);
        let m = Move::new(Square(12), Square(28), MoveFlag::DoublePush);
        assert!(tt.probe(0xDEAD_BEEF, 0).is_none());

        tt.store(0xDEAD_BEEF, m, 7, Bound::Exact, 42, 3, 17);
        let entry = tt.probe(0xDEAD_BEEF, 3).unwrap();
        assert_eq!(entry.best_move, m);
        assert_eq!(entry.score, 42);
        assert_eq!(entry.static_eval, 17);
        assert_eq!(entry.depth, 7);
        assert_eq!(entry.bound, Bound::Exact);

        tt.clear();
        assert!(tt.probe(0xDEAD_BEEF, 0).is_none());
    }

    #[test]
    fn mate_scores_round_trip() {
        for ply in [0usize, 1, 5, 40, 120] {
            for score in [
                0,
                250,
                -250,
                CHECKMATE - 2,
                -CHECKMATE + 2,
                MATE_BOUND + 1,
                -MATE_BOUND - 1,
                INFINITY - 1,
            ] {
                assert_eq!(score_from_tt(score_to_tt(score, ply), ply), score);
            }
        }
    }

    #[test]
    fn mate_distance_is_node_relative() {
        let tt = TranspositionTable::new(1);
        // Mate in 3 plies discovered at ply 10
        tt.store(99, Move::NONE, 5, Bound::Exact, CHECKMATE - 13, 10, 0);
        // Probed from ply 4 the same line is mate in 9 plies from the root
        let entry = tt.probe(99, 4).unwrap();
        assert_eq!(entry.score, CHECKMATE - 7);
    }

    #[test]
    fn deep_entries_resist_shallow_overwrites() {
        let tt = TranspositionTable::new(1);
        let deep = Move::new(Square(0), Square(1), MoveFlag::Quiet);
        let shallow = Move::new(Square(2), Square(3), MoveFlag::Quiet);
        tt.store(7, deep, 20, Bound::Lower, 50, 0, 0);
        tt.store(7, shallow, 2, Bound::Lower, 10, 0, 0);
        assert_eq!(tt.probe(7, 0).unwrap().best_move, deep);

        // A new search generation may replace anything
        tt.age_up();
        tt.store(7, shallow, 2, Bound::Lower, 10, 0, 0);
        assert_eq!(tt.probe(7, 0).unwrap().best_move, shallow);
    }
}
