use lazy_static::lazy_static;

use crate::types::bitboard::Bitboard;
use crate::types::square::Square;

use super::moves::Direction;

/// Xorshift generator with a fixed seed so magic discovery and Zobrist key
/// generation are reproducible across runs
pub struct Rng(u64);

impl Default for Rng {
    fn default() -> Self {
        Rng(0x9E37_79B9_7F4A_7C15)
    }
}

impl Rng {
    pub fn next_u64(&mut self) -> u64 {
        self.0 ^= self.0 << 13;
        self.0 ^= self.0 >> 7;
        self.0 ^= self.0 << 17;
        self.0
    }

    /// Sparse candidates (roughly 8 bits set) make good magic numbers
    fn next_magic(&mut self) -> u64 {
        self.next_u64() & self.next_u64() & self.next_u64()
    }
}

const ROOK_DELTAS: [Direction; 4] = [
    Direction::North,
    Direction::South,
    Direction::East,
    Direction::West,
];
const BISHOP_DELTAS: [Direction; 4] = [
    Direction::NorthEast,
    Direction::NorthWest,
    Direction::SouthEast,
    Direction::SouthWest,
];

/// Total slots across all squares when every square gets a table of
/// `2^popcount(mask)` entries
const ROOK_TABLE_SIZE: usize = 102_400;
const BISHOP_TABLE_SIZE: usize = 5_248;

#[derive(Clone, Copy, Default)]
struct MagicEntry {
    mask: Bitboard,
    magic: u64,
    shift: u8,
    offset: usize,
}

impl MagicEntry {
    fn index(&self, occupied: Bitboard) -> usize {
        let blockers = occupied & self.mask;
        self.offset + (blockers.0.wrapping_mul(self.magic) >> self.shift) as usize
    }
}

struct SliderAttacks {
    rook_magics: [MagicEntry; 64],
    bishop_magics: [MagicEntry; 64],
    rook_table: Vec<Bitboard>,
    bishop_table: Vec<Bitboard>,
}

lazy_static! {
    static ref SLIDERS: SliderAttacks = SliderAttacks::build();
}

pub fn rook_attacks(sq: Square, occupied: Bitboard) -> Bitboard {
    SLIDERS.rook_table[SLIDERS.rook_magics[sq].index(occupied)]
}

pub fn bishop_attacks(sq: Square, occupied: Bitboard) -> Bitboard {
    SLIDERS.bishop_table[SLIDERS.bishop_magics[sq].index(occupied)]
}

pub fn queen_attacks(sq: Square, occupied: Bitboard) -> Bitboard {
    rook_attacks(sq, occupied) | bishop_attacks(sq, occupied)
}

impl SliderAttacks {
    fn build() -> SliderAttacks {
        let mut rng = Rng::default();
        let mut rook_magics = [MagicEntry::default(); 64];
        let mut bishop_magics = [MagicEntry::default(); 64];
        let mut rook_table = Vec::with_capacity(ROOK_TABLE_SIZE);
        let mut bishop_table = Vec::with_capacity(BISHOP_TABLE_SIZE);

        for sq in Square::iter() {
            let (entry, mut attacks) = find_magic(sq, ROOK_DELTAS, rook_table.len(), &mut rng);
            rook_magics[sq.idx()] = entry;
            rook_table.append(&mut attacks);

            let (entry, mut attacks) = find_magic(sq, BISHOP_DELTAS, bishop_table.len(), &mut rng);
            bishop_magics[sq.idx()] = entry;
            bishop_table.append(&mut attacks);
        }

        assert_eq!(rook_table.len(), ROOK_TABLE_SIZE);
        assert_eq!(bishop_table.len(), BISHOP_TABLE_SIZE);

        SliderAttacks { rook_magics, bishop_magics, rook_table, bishop_table }
    }
}

/// Searches random sparse multipliers until one perfectly hashes every
/// blocker subset of the square's relevance mask
fn find_magic(
    sq: Square,
    deltas: [Direction; 4],
    offset: usize,
    rng: &mut Rng,
) -> (MagicEntry, Vec<Bitboard>) {
    let mask = relevance_mask(sq, deltas);
    let bits = mask.count_bits();
    let shift = (64 - bits) as u8;
    loop {
        let entry = MagicEntry { mask, magic: rng.next_magic(), shift, offset };
        if let Some(table) = try_fill(sq, deltas, &entry) {
            return (entry, table);
        }
    }
}

fn try_fill(sq: Square, deltas: [Direction; 4], entry: &MagicEntry) -> Option<Vec<Bitboard>> {
    let mut table = vec![Bitboard::EMPTY; 1 << (64 - entry.shift)];
    let mut filled = vec![false; table.len()];

    // Carry-Rippler enumeration of every subset of the mask
    let mut blockers = Bitboard::EMPTY;
    loop {
        let attacks = sliding_attacks(sq, deltas, blockers);
        let idx = entry.index(blockers) - entry.offset;
        if !filled[idx] {
            filled[idx] = true;
            table[idx] = attacks;
        } else if table[idx] != attacks {
            return None;
        }
        blockers.0 = blockers.0.wrapping_sub(entry.mask.0) & entry.mask.0;
        if blockers == Bitboard::EMPTY {
            break;
        }
    }
    Some(table)
}

/// Squares whose occupancy can change the attack set: each ray excluding
/// the square itself and the board-edge terminus
fn relevance_mask(sq: Square, deltas: [Direction; 4]) -> Bitboard {
    let mut mask = Bitboard::EMPTY;
    for dir in deltas {
        let mut s = sq;
        while let Some(next) = s.checked_shift(dir) {
            if next.checked_shift(dir).is_some() {
                mask |= next.bitboard();
            }
            s = next;
        }
    }
    mask
}

/// Attack set for a slider on `sq`: every ray square up to and including
/// the first blocker, excluding the origin
pub fn sliding_attacks(sq: Square, deltas: [Direction; 4], occupied: Bitboard) -> Bitboard {
    let mut attacks = Bitboard::EMPTY;
    for dir in deltas {
        let mut s = sq;
        while let Some(next) = s.checked_shift(dir) {
            attacks |= next.bitboard();
            if occupied.contains(next) {
                break;
            }
            s = next;
        }
    }
    attacks
}
