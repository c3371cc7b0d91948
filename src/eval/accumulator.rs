use crate::board::board::Board;
use crate::moves::moves::{Direction, Move};
use crate::types::pieces::{Color, Piece, PieceKind};
use crate::types::square::Square;

use super::psqt;

/// Incrementally maintained evaluation state: per-side material plus
/// piece-square sums. One accumulator lives on the search stack per ply and
/// is copied parent to child, so updates never have to be undone.
///
/// The two-method surface (`apply` to step to a child position, `evaluate`
/// to read a score) is all the search sees; a network-backed accumulator
/// could replace this one without touching the search.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct Accumulator {
    scores: [i32; 2],
}

impl Accumulator {
    pub fn from_board(board: &Board) -> Accumulator {
        let mut acc = Accumulator { scores: [0; 2] };
        for sq in Square::iter() {
            let piece = board.piece_at(sq);
            if piece != Piece::None {
                acc.add(piece, sq);
            }
        }
        acc
    }

    fn add(&mut self, piece: Piece, sq: Square) {
        self.scores[piece.color()] += piece.value() + psqt(piece.kind(), piece.color(), sq);
    }

    fn remove(&mut self, piece: Piece, sq: Square) {
        self.scores[piece.color()] -= piece.value() + psqt(piece.kind(), piece.color(), sq);
    }

    /// Returns the accumulator for the position after `m`, where `board` is
    /// the position `m` is played in
    pub fn apply(mut self, m: Move, board: &Board) -> Accumulator {
        let us = board.stm;
        let piece = board.piece_at(m.from());

        self.remove(piece, m.from());
        if m.is_en_passant() {
            let target = match us {
                Color::White => m.to().shift(Direction::South),
                Color::Black => m.to().shift(Direction::North),
            };
            self.remove(Piece::new(PieceKind::Pawn, !us), target);
        } else {
            let captured = board.piece_at(m.to());
            if captured != Piece::None {
                self.remove(captured, m.to());
            }
        }
        match m.promotion() {
            Some(kind) => self.add(Piece::new(kind, us), m.to()),
            None => self.add(piece, m.to()),
        }
        if m.is_castle() {
            let rook = Piece::new(PieceKind::Rook, us);
            let (rook_from, rook_to) = m.castle_rook_squares(us);
            self.remove(rook, rook_from);
            self.add(rook, rook_to);
        }
        self
    }

    /// Static evaluation in centipawns from the side to move's perspective
    pub fn evaluate(&self, stm: Color) -> i32 {
        self.scores[stm] - self.scores[!stm]
    }
}

#[cfg(test)]
mod accumulator_tests {
    use super::*;

    #[test]
    fn startpos_is_balanced() {
        let board = Board::startpos();
        let acc = Accumulator::from_board(&board);
        assert_eq!(acc.evaluate(Color::White), 0);
        assert_eq!(acc.evaluate(Color::Black), 0);
    }

    #[test]
    fn incremental_matches_rebuild() {
        let mut board = Board::startpos();
        let mut acc = Accumulator::from_board(&board);
        // A line with a capture, an en passant, a promotion and both castles
        for uci in [
            "e2e4", "e7e6", "e4e5", "d7d5", "e5d6", "b8c6", "d6c7", "a8b8", "c7b8q", "g8f6",
            "g1f3", "f8c5", "f1c4", "e8g8", "e1g1",
        ] {
            let m = Move::from_uci(uci, &board).unwrap();
            acc = acc.apply(m, &board);
            assert!(board.make_move(m), "{uci} should be legal");
            assert_eq!(acc, Accumulator::from_board(&board), "diverged after {uci}");
        }
    }

    #[test]
    fn evaluation_is_antisymmetric() {
        let board = Board::from_fen(crate::board::fen::KIWIPETE_FEN);
        let acc = Accumulator::from_board(&board);
        assert_eq!(acc.evaluate(Color::White), -acc.evaluate(Color::Black));
    }

    #[test]
    fn extra_material_shows_up() {
        let board = Board::from_fen("4k3/8/8/8/8/8/8/R3K3 w - - 0 1");
        let acc = Accumulator::from_board(&board);
        assert!(acc.evaluate(Color::White) > 400);
        assert!(acc.evaluate(Color::Black) < -400);
    }
}
