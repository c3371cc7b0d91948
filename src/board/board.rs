use core::fmt;

use crate::moves::attack_boards::{king_attacks, knight_attacks, pawn_attacks, RANK_1, RANK_8};
use crate::moves::magics::{bishop_attacks, queen_attacks, rook_attacks};
use crate::moves::moves::{
    Direction, Move, MoveFlag, BLACK_KING_SIDE, BLACK_QUEEN_SIDE, CASTLING_RIGHTS,
    WHITE_KING_SIDE, WHITE_QUEEN_SIDE,
};
use crate::types::bitboard::Bitboard;
use crate::types::pieces::{Color, Piece, PieceKind, NUM_PIECE_KINDS};
use crate::types::square::Square;

use super::fen::STARTING_FEN;
use super::zobrist::ZOBRIST;

/// Copy-make board state: piece-kind bitboards plus a mailbox for O(1)
/// square lookups, with the Zobrist hash maintained incrementally.
///
/// The search never unmakes a move; it copies the board, tries the move on
/// the copy, and drops the copy when the subtree returns. A move that leaves
/// its own king attacked is reported illegal by `make_move` and the copy is
/// simply discarded.
#[derive(Clone, Copy, Eq, PartialEq)]
pub struct Board {
    piece_bbs: [Bitboard; NUM_PIECE_KINDS],
    color_bbs: [Bitboard; 2],
    mailbox: [Piece; 64],
    pub stm: Color,
    pub castling_rights: u8,
    pub en_passant: Option<Square>,
    pub half_moves: u16,
    pub full_moves: u16,
    pub hash: u64,
    in_check: bool,
}

impl Default for Board {
    fn default() -> Self {
        Board::startpos()
    }
}

impl Board {
    pub fn empty() -> Board {
        Board {
            piece_bbs: [Bitboard::EMPTY; NUM_PIECE_KINDS],
            color_bbs: [Bitboard::EMPTY; 2],
            mailbox: [Piece::None; 64],
            stm: Color::White,
            castling_rights: 0,
            en_passant: None,
            half_moves: 0,
            full_moves: 1,
            hash: 0,
            in_check: false,
        }
    }

    pub fn startpos() -> Board {
        Board::from_fen(STARTING_FEN)
    }

    pub fn piece_bb(&self, kind: PieceKind) -> Bitboard {
        self.piece_bbs[kind]
    }

    pub fn color_bb(&self, color: Color) -> Bitboard {
        self.color_bbs[color]
    }

    pub fn bitboard(&self, kind: PieceKind, color: Color) -> Bitboard {
        self.piece_bbs[kind] & self.color_bbs[color]
    }

    pub fn occupancies(&self) -> Bitboard {
        self.color_bbs[Color::White] | self.color_bbs[Color::Black]
    }

    pub fn piece_at(&self, sq: Square) -> Piece {
        self.mailbox[sq]
    }

    pub fn king_square(&self, color: Color) -> Square {
        self.bitboard(PieceKind::King, color).lsb()
    }

    pub const fn in_check(&self) -> bool {
        self.in_check
    }

    pub(crate) fn place_piece(&mut self, piece: Piece, sq: Square) {
        self.mailbox[sq] = piece;
        self.piece_bbs[piece.kind()] |= sq.bitboard();
        self.color_bbs[piece.color()] |= sq.bitboard();
        self.hash ^= ZOBRIST.piece_square[piece.color()][piece.kind()][sq];
    }

    pub(crate) fn remove_piece(&mut self, sq: Square) {
        let piece = self.mailbox[sq];
        if piece != Piece::None {
            self.mailbox[sq] = Piece::None;
            self.piece_bbs[piece.kind()] ^= sq.bitboard();
            self.color_bbs[piece.color()] ^= sq.bitboard();
            self.hash ^= ZOBRIST.piece_square[piece.color()][piece.kind()][sq];
        }
    }

    pub(crate) fn refresh_check(&mut self) {
        self.in_check = self.square_under_attack(!self.stm, self.king_square(self.stm));
    }

    /// Pieces of `attacker` that attack `sq` through the given occupancy
    pub fn attackers_for_side(&self, attacker: Color, sq: Square, occupied: Bitboard) -> Bitboard {
        let diags = self.piece_bb(PieceKind::Bishop) | self.piece_bb(PieceKind::Queen);
        let orthos = self.piece_bb(PieceKind::Rook) | self.piece_bb(PieceKind::Queen);
        let attacks = pawn_attacks(sq, !attacker) & self.piece_bb(PieceKind::Pawn)
            | knight_attacks(sq) & self.piece_bb(PieceKind::Knight)
            | bishop_attacks(sq, occupied) & diags
            | rook_attacks(sq, occupied) & orthos
            | king_attacks(sq) & self.piece_bb(PieceKind::King);
        attacks & self.color_bb(attacker)
    }

    pub fn square_under_attack(&self, attacker: Color, sq: Square) -> bool {
        self.attackers_for_side(attacker, sq, self.occupancies()) != Bitboard::EMPTY
    }

    pub fn has_non_pawns(&self, side: Color) -> bool {
        self.color_bb(side)
            ^ self.bitboard(PieceKind::King, side)
            ^ self.bitboard(PieceKind::Pawn, side)
            != Bitboard::EMPTY
    }

    /// Neither side retains enough material to deliver mate
    pub fn insufficient_material(&self) -> bool {
        if self.piece_bb(PieceKind::Pawn) != Bitboard::EMPTY
            || self.piece_bb(PieceKind::Queen) != Bitboard::EMPTY
            || self.piece_bb(PieceKind::Rook) != Bitboard::EMPTY
        {
            return false;
        }
        let piece_count = self.occupancies().count_bits();
        if piece_count == 2 {
            return true;
        }
        if piece_count == 3 {
            return self.piece_bb(PieceKind::Knight).count_bits() == 1
                || self.piece_bb(PieceKind::Bishop).count_bits() == 1;
        }
        if piece_count == 4 {
            if self.piece_bb(PieceKind::Knight).count_bits() == 2 {
                return true;
            }
            if self.piece_bb(PieceKind::Bishop).count_bits() == 2
                && self.color_bb(Color::White).count_bits() == 2
            {
                return true;
            }
        }
        false
    }

    /// Rule-based draws detectable from the board alone; repetition needs
    /// the search's hash history and is checked by the caller
    pub fn is_draw(&self) -> bool {
        self.half_moves >= 100 || self.insufficient_material()
    }

    /// Applies a pseudo-legal move. Returns `false` (leaving the copy in an
    /// undefined state) when the move exposes its own king to capture.
    #[must_use]
    pub fn make_move(&mut self, m: Move) -> bool {
        let from = m.from();
        let to = m.to();
        let us = self.stm;
        let piece = self.piece_at(from);
        debug_assert!(piece != Piece::None && piece.color() == us);
        let captured = if m.is_en_passant() {
            Piece::new(PieceKind::Pawn, !us)
        } else {
            self.piece_at(to)
        };

        if m.is_en_passant() {
            let target = match us {
                Color::White => to.shift(Direction::South),
                Color::Black => to.shift(Direction::North),
            };
            self.remove_piece(target);
        } else if captured != Piece::None {
            self.remove_piece(to);
        }
        self.remove_piece(from);
        match m.promotion() {
            Some(promo) => self.place_piece(Piece::new(promo, us), to),
            None => self.place_piece(piece, to),
        }
        if m.is_castle() {
            let (rook_from, rook_to) = m.castle_rook_squares(us);
            self.remove_piece(rook_from);
            self.place_piece(Piece::new(PieceKind::Rook, us), rook_to);
        }

        if self.square_under_attack(!us, self.king_square(us)) {
            return false;
        }

        if let Some(sq) = self.en_passant {
            self.hash ^= ZOBRIST.en_passant[sq];
        }
        self.en_passant = None;
        if m.flag() == MoveFlag::DoublePush {
            let sq = match us {
                Color::White => to.shift(Direction::South),
                Color::Black => to.shift(Direction::North),
            };
            self.en_passant = Some(sq);
            self.hash ^= ZOBRIST.en_passant[sq];
        }

        if captured == Piece::None && piece.kind() != PieceKind::Pawn {
            self.half_moves += 1;
        } else {
            self.half_moves = 0;
        }

        self.hash ^= ZOBRIST.castling[self.castling_rights as usize];
        self.castling_rights &= CASTLING_RIGHTS[from] & CASTLING_RIGHTS[to];
        self.hash ^= ZOBRIST.castling[self.castling_rights as usize];

        if us == Color::Black {
            self.full_moves += 1;
        }
        self.stm = !us;
        self.hash ^= ZOBRIST.side;

        self.refresh_check();
        true
    }

    /// Passes the turn without moving, used by null-move pruning. Must only
    /// be called when the side to move is not in check.
    pub fn make_null_move(&mut self) {
        debug_assert!(!self.in_check);
        self.stm = !self.stm;
        self.hash ^= ZOBRIST.side;
        if let Some(sq) = self.en_passant {
            self.hash ^= ZOBRIST.en_passant[sq];
            self.en_passant = None;
        }
        self.half_moves += 1;
        self.refresh_check();
    }

    /// Checks that a move (typically one pulled from the transposition
    /// table, where key collisions can hand back a move from a different
    /// position) could have been generated in this position
    pub fn is_pseudo_legal(&self, m: Move) -> bool {
        if m == Move::NONE {
            return false;
        }
        let from = m.from();
        let to = m.to();
        let piece = self.piece_at(from);
        if piece == Piece::None || piece.color() != self.stm {
            return false;
        }
        let captured = self.piece_at(to);
        if captured != Piece::None && captured.color() == self.stm {
            return false;
        }

        let up = match self.stm {
            Color::White => Direction::North,
            Color::Black => Direction::South,
        };

        match m.flag() {
            MoveFlag::KingCastle | MoveFlag::QueenCastle => {
                piece.kind() == PieceKind::King && self.castle_is_pseudo_legal(m)
            }
            MoveFlag::EnPassant => {
                piece.kind() == PieceKind::Pawn
                    && self.en_passant == Some(to)
                    && pawn_attacks(from, self.stm).contains(to)
            }
            MoveFlag::DoublePush => {
                let start_rank = match self.stm {
                    Color::White => 1,
                    Color::Black => 6,
                };
                piece.kind() == PieceKind::Pawn
                    && from.rank() == start_rank
                    && captured == Piece::None
                    && self.piece_at(from.shift(up)) == Piece::None
                    && from.shift(up).shift(up) == to
            }
            flag => {
                let promo_rank = (RANK_1 | RANK_8).contains(to);
                if piece.kind() == PieceKind::Pawn {
                    // Promotion flag and promotion rank must agree
                    if promo_rank != matches!(
                        flag,
                        MoveFlag::PromoKnight
                            | MoveFlag::PromoBishop
                            | MoveFlag::PromoRook
                            | MoveFlag::PromoQueen
                    ) {
                        return false;
                    }
                    if captured != Piece::None {
                        pawn_attacks(from, self.stm).contains(to)
                    } else {
                        from.checked_shift(up) == Some(to)
                    }
                } else {
                    if flag != MoveFlag::Quiet {
                        return false;
                    }
                    let attacks = match piece.kind() {
                        PieceKind::Knight => knight_attacks(from),
                        PieceKind::Bishop => bishop_attacks(from, self.occupancies()),
                        PieceKind::Rook => rook_attacks(from, self.occupancies()),
                        PieceKind::Queen => queen_attacks(from, self.occupancies()),
                        PieceKind::King => king_attacks(from),
                        PieceKind::Pawn => unreachable!(),
                    };
                    attacks.contains(to)
                }
            }
        }
    }

    fn castle_is_pseudo_legal(&self, m: Move) -> bool {
        let (right, king_path, empty_path) = match (m.flag(), self.stm) {
            (MoveFlag::KingCastle, Color::White) => {
                (WHITE_KING_SIDE, [Square(4), Square(5), Square(6)], Bitboard(0x60))
            }
            (MoveFlag::QueenCastle, Color::White) => {
                (WHITE_QUEEN_SIDE, [Square(4), Square(3), Square(2)], Bitboard(0x0E))
            }
            (MoveFlag::KingCastle, Color::Black) => (
                BLACK_KING_SIDE,
                [Square(60), Square(61), Square(62)],
                Bitboard(0x60 << 56),
            ),
            (MoveFlag::QueenCastle, Color::Black) => (
                BLACK_QUEEN_SIDE,
                [Square(60), Square(59), Square(58)],
                Bitboard(0x0E << 56),
            ),
            _ => unreachable!(),
        };
        let rook_home = match (m.flag(), self.stm) {
            (MoveFlag::KingCastle, Color::White) => Square::H1,
            (MoveFlag::QueenCastle, Color::White) => Square::A1,
            (MoveFlag::KingCastle, Color::Black) => Square::H8,
            (MoveFlag::QueenCastle, Color::Black) => Square::A8,
            _ => unreachable!(),
        };
        m.from() == king_path[0]
            && m.to() == king_path[2]
            && self.castling_rights & right != 0
            && self.occupancies() & empty_path == Bitboard::EMPTY
            && self.bitboard(PieceKind::Rook, self.stm).contains(rook_home)
            && !king_path.iter().any(|&sq| self.square_under_attack(!self.stm, sq))
    }
}

impl fmt::Display for Board {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for rank in (0..8).rev() {
            write!(f, "{} |", rank + 1)?;
            for file in 0..8 {
                let piece = self.piece_at(Square(rank * 8 + file));
                let c = if piece == Piece::None { '.' } else { piece.to_char() };
                write!(f, " {c}")?;
            }
            writeln!(f)?;
        }
        writeln!(f, "   a b c d e f g h")?;
        writeln!(f, "{}", self.to_fen())
    }
}

impl fmt::Debug for Board {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{self}")
    }
}

#[cfg(test)]
mod board_tests {
    use super::*;
    use crate::board::fen::KIWIPETE_FEN;

    #[test]
    fn startpos_basics() {
        let board = Board::startpos();
        assert_eq!(board.occupancies().count_bits(), 32);
        assert_eq!(board.king_square(Color::White), Square::E1);
        assert_eq!(board.king_square(Color::Black), Square::E8);
        assert!(!board.in_check());
        assert!(board.has_non_pawns(Color::White));
    }

    #[test]
    fn incremental_hash_tracks_reference() {
        let mut board = Board::startpos();
        for uci in ["e2e4", "e7e5", "g1f3", "b8c6", "f1c4", "g8f6", "e1g1", "f6e4"] {
            let m = Move::from_uci(uci, &board).unwrap();
            assert!(board.make_move(m), "{uci} should be legal");
            assert_eq!(board.hash, board.generate_hash(), "hash diverged after {uci}");
        }
    }

    #[test]
    fn en_passant_and_promotion_hashes() {
        let mut board = Board::from_fen("8/2p3P1/8/3p4/4P3/8/8/K1k5 w - - 0 1");
        for uci in ["e4e5", "d5d4", "g7g8q", "d4d3", "e5e6", "c7c5"] {
            let m = Move::from_uci(uci, &board).unwrap();
            assert!(board.make_move(m), "{uci} should be legal");
            assert_eq!(board.hash, board.generate_hash(), "hash diverged after {uci}");
        }
        // c7c5 just created an en passant square on c6
        assert_eq!(board.en_passant, Some(Square(42)));
    }

    #[test]
    fn illegal_moves_are_rejected() {
        // The knight on d2 is pinned against the king by the rook on d8
        let board = Board::from_fen("3r3k/8/8/8/8/8/3N4/3K4 w - - 0 1");
        let mut copy = board;
        let pinned = Move::from_uci("d2f3", &board).unwrap();
        assert!(!copy.make_move(pinned));

        let mut copy = board;
        let fine = Move::from_uci("d1e1", &board).unwrap();
        assert!(copy.make_move(fine));
    }

    #[test]
    fn check_detection() {
        let mut board = Board::from_fen("4k3/8/8/8/8/8/4R3/4K3 w - - 0 1");
        let m = Move::from_uci("e2e5", &board).unwrap();
        assert!(board.make_move(m));
        assert!(board.in_check());
    }

    #[test]
    fn material_draws() {
        assert!(Board::from_fen("4k3/8/8/8/8/8/8/4K3 w - - 0 1").insufficient_material());
        assert!(Board::from_fen("4k3/8/8/8/8/8/8/2B1K3 w - - 0 1").insufficient_material());
        assert!(!Board::from_fen("4k3/8/8/8/8/8/4P3/4K3 w - - 0 1").insufficient_material());
        assert!(!Board::from_fen(KIWIPETE_FEN).insufficient_material());
    }

    #[test]
    fn tt_move_sanity_check() {
        let board = Board::startpos();
        assert!(board.is_pseudo_legal(Move::from_uci("e2e4", &board).unwrap()));
        assert!(board.is_pseudo_legal(Move::from_uci("b1c3", &board).unwrap()));
        // Moving an empty square, an enemy piece, or through a blocker
        assert!(!board.is_pseudo_legal(Move::new(Square(16), Square(24), MoveFlag::Quiet)));
        assert!(!board.is_pseudo_legal(Move::from_uci("e7e5", &board).unwrap()));
        assert!(!board.is_pseudo_legal(Move::new(Square(0), Square(16), MoveFlag::Quiet)));
        assert!(!board.is_pseudo_legal(Move::NONE));
    }
}
