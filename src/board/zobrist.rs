use lazy_static::lazy_static;
use strum::IntoEnumIterator;

use crate::moves::magics::Rng;
use crate::types::pieces::{Color, PieceKind};

use super::board::Board;

/// Random keys for incremental position hashing. One key per
/// (color, piece, square), one per en-passant square, one per castling-right
/// combination, and one for the side to move.
pub struct Zobrist {
    pub piece_square: [[[u64; 64]; 6]; 2],
    pub en_passant: [u64; 64],
    pub castling: [u64; 16],
    pub side: u64,
}

lazy_static! {
    pub static ref ZOBRIST: Zobrist = Zobrist::new();
}

impl Zobrist {
    fn new() -> Zobrist {
        let mut rng = Rng::default();
        let mut piece_square = [[[0; 64]; 6]; 2];
        piece_square.iter_mut().flatten().flatten().for_each(|k| *k = rng.next_u64());
        let mut en_passant = [0; 64];
        en_passant.iter_mut().for_each(|k| *k = rng.next_u64());
        let mut castling = [0; 16];
        castling.iter_mut().for_each(|k| *k = rng.next_u64());
        Zobrist { piece_square, en_passant, castling, side: rng.next_u64() }
    }
}

impl Board {
    /// Hashes the position from scratch. The board keeps its hash up to date
    /// incrementally; this is the reference the increments must agree with.
    pub fn generate_hash(&self) -> u64 {
        let mut hash = 0;
        for color in Color::iter() {
            for kind in PieceKind::iter() {
                for sq in self.bitboard(kind, color) {
                    hash ^= ZOBRIST.piece_square[color][kind][sq];
                }
            }
        }
        if let Some(sq) = self.en_passant {
            hash ^= ZOBRIST.en_passant[sq];
        }
        hash ^= ZOBRIST.castling[self.castling_rights as usize];
        if self.stm == Color::Black {
            hash ^= ZOBRIST.side;
        }
        hash
    }
}

#[cfg(test)]
mod zobrist_tests {
    use crate::board::board::Board;
    use crate::board::fen::STARTING_FEN;

    #[test]
    fn equal_positions_hash_equal() {
        let a = Board::from_fen(STARTING_FEN);
        let b = Board::from_fen("rnbqkbnr/pppppppp/8/8/8/8/PPPPPPPP/RNBQKBNR w KQkq - 0 1");
        let c = Board::from_fen("4k3/4Q3/4K3/8/8/8/8/8 w - - 0 1");
        assert_eq!(a.generate_hash(), b.generate_hash());
        assert_ne!(a.generate_hash(), c.generate_hash());
    }
}
