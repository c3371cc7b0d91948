use crate::board::board::Board;
use crate::types::bitboard::Bitboard;
use crate::types::pieces::{Color, PieceKind};
use crate::types::square::Square;

use super::attack_boards::{king_attacks, knight_attacks, pawn_attacks, RANK_2, RANK_3, RANK_6, RANK_7};
use super::magics::{bishop_attacks, queen_attacks, rook_attacks};
use super::movelist::MoveList;
use super::moves::{Direction, Move, MoveFlag};

/// Which subset of pseudo-legal moves to generate. Promotions count as
/// captures so quiescence sees them.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum GenKind {
    Captures,
    Quiets,
    All,
}

impl Board {
    /// Generates pseudo-legal moves; legality is established when the move
    /// is actually made
    pub fn generate_moves(&self, kind: GenKind) -> MoveList {
        let mut moves = MoveList::default();
        self.pawn_moves(kind, &mut moves);
        for piece in [
            PieceKind::Knight,
            PieceKind::Bishop,
            PieceKind::Rook,
            PieceKind::Queen,
            PieceKind::King,
        ] {
            self.piece_moves(piece, kind, &mut moves);
        }
        if kind != GenKind::Captures {
            self.castling_moves(&mut moves);
        }
        moves
    }

    fn piece_moves(&self, kind: PieceKind, gen: GenKind, moves: &mut MoveList) {
        let targets = match gen {
            GenKind::Captures => self.color_bb(!self.stm),
            GenKind::Quiets => !self.occupancies(),
            GenKind::All => !self.color_bb(self.stm),
        };
        for from in self.bitboard(kind, self.stm) {
            let attacks = match kind {
                PieceKind::Knight => knight_attacks(from),
                PieceKind::Bishop => bishop_attacks(from, self.occupancies()),
                PieceKind::Rook => rook_attacks(from, self.occupancies()),
                PieceKind::Queen => queen_attacks(from, self.occupancies()),
                PieceKind::King => king_attacks(from),
                PieceKind::Pawn => unreachable!(),
            };
            for to in attacks & targets {
                moves.push(Move::new(from, to, MoveFlag::Quiet));
            }
        }
    }

    fn pawn_moves(&self, gen: GenKind, moves: &mut MoveList) {
        let us = self.stm;
        let pawns = self.bitboard(PieceKind::Pawn, us);
        let vacancies = !self.occupancies();
        let enemies = self.color_bb(!us);

        let (up, promo_rank, double_push_rank) = match us {
            Color::White => (Direction::North, RANK_7, RANK_3),
            Color::Black => (Direction::South, RANK_2, RANK_6),
        };
        let (up_west, up_east) = match us {
            Color::White => (Direction::NorthWest, Direction::NorthEast),
            Color::Black => (Direction::SouthEast, Direction::SouthWest),
        };
        let down = up.opp();
        let promoting = pawns & promo_rank;
        let not_promoting = pawns & !promo_rank;

        if gen != GenKind::Captures {
            let push_one = not_promoting.shift(up) & vacancies;
            let push_two = (push_one & double_push_rank).shift(up) & vacancies;
            for to in push_one {
                moves.push(Move::new(to.shift(down), to, MoveFlag::Quiet));
            }
            for to in push_two {
                moves.push(Move::new(to.shift(down).shift(down), to, MoveFlag::DoublePush));
            }
        }

        if gen != GenKind::Quiets {
            // Every promotion is noisy, pushes included
            if promoting != Bitboard::EMPTY {
                for to in promoting.shift(up) & vacancies {
                    push_promotions(to.shift(down), to, moves);
                }
                for to in promoting.shift(up_west) & enemies {
                    push_promotions(to.shift(up_west.opp()), to, moves);
                }
                for to in promoting.shift(up_east) & enemies {
                    push_promotions(to.shift(up_east.opp()), to, moves);
                }
            }

            for to in not_promoting.shift(up_west) & enemies {
                moves.push(Move::new(to.shift(up_west.opp()), to, MoveFlag::Quiet));
            }
            for to in not_promoting.shift(up_east) & enemies {
                moves.push(Move::new(to.shift(up_east.opp()), to, MoveFlag::Quiet));
            }

            if let Some(ep) = self.en_passant {
                // Our pawns attacking the en passant square can capture on it
                for from in pawn_attacks(ep, !us) & pawns {
                    moves.push(Move::new(from, ep, MoveFlag::EnPassant));
                }
            }
        }
    }

    fn castling_moves(&self, moves: &mut MoveList) {
        let (king_side, queen_side) = match self.stm {
            Color::White => (
                Move::new(Square::E1, Square::G1, MoveFlag::KingCastle),
                Move::new(Square::E1, Square::C1, MoveFlag::QueenCastle),
            ),
            Color::Black => (
                Move::new(Square::E8, Square::G8, MoveFlag::KingCastle),
                Move::new(Square::E8, Square::C8, MoveFlag::QueenCastle),
            ),
        };
        for castle in [king_side, queen_side] {
            if self.bitboard(PieceKind::King, self.stm).contains(castle.from())
                && self.is_pseudo_legal(castle)
            {
                moves.push(castle);
            }
        }
    }
}

fn push_promotions(from: Square, to: Square, moves: &mut MoveList) {
    for flag in [
        MoveFlag::PromoQueen,
        MoveFlag::PromoKnight,
        MoveFlag::PromoRook,
        MoveFlag::PromoBishop,
    ] {
        moves.push(Move::new(from, to, flag));
    }
}

#[cfg(test)]
mod movegen_tests {
    use super::*;
    use crate::board::fen::KIWIPETE_FEN;

    fn legal_count(board: &Board, kind: GenKind) -> usize {
        board
            .generate_moves(kind)
            .moves()
            .filter(|&m| {
                let mut copy = *board;
                copy.make_move(m)
            })
            .count()
    }

    #[test]
    fn startpos_move_counts() {
        let board = Board::startpos();
        assert_eq!(legal_count(&board, GenKind::All), 20);
        assert_eq!(legal_count(&board, GenKind::Captures), 0);
        assert_eq!(legal_count(&board, GenKind::Quiets), 20);
    }

    #[test]
    fn staged_generation_partitions_all() {
        for fen in [
            KIWIPETE_FEN,
            "r3k2r/Pppp1ppp/1b3nbN/nP6/BBP1P3/q4N2/Pp1P2PP/R2Q1RK1 w kq - 0 1",
            "rnbqkbnr/ppp1pppp/8/8/3pP3/8/PPPP1PPP/RNBQKBNR b KQkq e3 0 1",
        ] {
            let board = Board::from_fen(fen);
            let all = board.generate_moves(GenKind::All).len();
            let captures = board.generate_moves(GenKind::Captures).len();
            let quiets = board.generate_moves(GenKind::Quiets).len();
            assert_eq!(all, captures + quiets, "partition failed for {fen}");
        }
    }

    #[test]
    fn captures_are_noisy() {
        let board = Board::from_fen(KIWIPETE_FEN);
        for entry in board.generate_moves(GenKind::Captures).iter() {
            assert!(entry.mv.is_noisy(&board), "{} is not noisy", entry.mv);
        }
        for entry in board.generate_moves(GenKind::Quiets).iter() {
            assert!(!entry.mv.is_noisy(&board), "{} is noisy", entry.mv);
        }
    }

    #[test]
    fn en_passant_is_generated() {
        let board = Board::from_fen("rnbqkbnr/ppp1pppp/8/8/3pP3/8/PPPP1PPP/RNBQKBNR b KQkq e3 0 1");
        let found = board
            .generate_moves(GenKind::Captures)
            .moves()
            .any(|m| m.is_en_passant() && m.to() == Square(20));
        assert!(found);
    }

    #[test]
    fn stalemate_has_no_legal_moves() {
        let board = Board::from_fen("7k/5Q2/6K1/8/8/8/8/8 b - - 0 1");
        assert_eq!(legal_count(&board, GenKind::All), 0);
        assert!(!board.in_check());
    }
}
