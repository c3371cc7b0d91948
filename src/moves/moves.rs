use core::fmt;

use crate::board::board::Board;
use crate::types::pieces::{Color, Piece, PieceKind};
use crate::types::square::Square;

/// Cardinal and diagonal directions from White's point of view, encoded as
/// square-index deltas
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
#[repr(i8)]
pub enum Direction {
    North = 8,
    South = -8,
    East = 1,
    West = -1,
    NorthEast = 9,
    NorthWest = 7,
    SouthEast = -7,
    SouthWest = -9,
}

impl Direction {
    /// (file delta, rank delta) pair for bounds-checked stepping
    pub const fn deltas(self) -> (i8, i8) {
        match self {
            Direction::North => (0, 1),
            Direction::South => (0, -1),
            Direction::East => (1, 0),
            Direction::West => (-1, 0),
            Direction::NorthEast => (1, 1),
            Direction::NorthWest => (-1, 1),
            Direction::SouthEast => (1, -1),
            Direction::SouthWest => (-1, -1),
        }
    }

    pub const fn opp(self) -> Direction {
        match self {
            Direction::North => Direction::South,
            Direction::South => Direction::North,
            Direction::East => Direction::West,
            Direction::West => Direction::East,
            Direction::NorthEast => Direction::SouthWest,
            Direction::NorthWest => Direction::SouthEast,
            Direction::SouthEast => Direction::NorthWest,
            Direction::SouthWest => Direction::NorthEast,
        }
    }
}

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
#[repr(u16)]
pub enum MoveFlag {
    Quiet = 0,
    DoublePush = 1,
    KingCastle = 2,
    QueenCastle = 3,
    EnPassant = 4,
    PromoKnight = 8,
    PromoBishop = 9,
    PromoRook = 10,
    PromoQueen = 11,
}

/// A move packed into 16 bits:
///
/// bits  0-5:  origin square
/// bits  6-11: destination square
/// bits 12-15: move flag
///
/// `Move::NONE` (all zero) is reserved as the falsy "no move" sentinel; a
/// quiet a1-a1 move can never be legal.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub struct Move(u16);

impl Move {
    pub const NONE: Move = Move(0);

    pub const fn new(from: Square, to: Square, flag: MoveFlag) -> Move {
        Move(from.0 as u16 | (to.0 as u16) << 6 | (flag as u16) << 12)
    }

    pub const fn from(self) -> Square {
        Square((self.0 & 0x3F) as u8)
    }

    pub const fn to(self) -> Square {
        Square((self.0 >> 6 & 0x3F) as u8)
    }

    pub fn flag(self) -> MoveFlag {
        match self.0 >> 12 {
            0 => MoveFlag::Quiet,
            1 => MoveFlag::DoublePush,
            2 => MoveFlag::KingCastle,
            3 => MoveFlag::QueenCastle,
            4 => MoveFlag::EnPassant,
            8 => MoveFlag::PromoKnight,
            9 => MoveFlag::PromoBishop,
            10 => MoveFlag::PromoRook,
            11 => MoveFlag::PromoQueen,
            _ => unreachable!(),
        }
    }

    pub const fn as_u16(self) -> u16 {
        self.0
    }

    pub const fn from_u16(raw: u16) -> Move {
        Move(raw)
    }

    pub fn is_castle(self) -> bool {
        matches!(self.flag(), MoveFlag::KingCastle | MoveFlag::QueenCastle)
    }

    pub fn is_en_passant(self) -> bool {
        self.flag() == MoveFlag::EnPassant
    }

    pub fn promotion(self) -> Option<PieceKind> {
        match self.flag() {
            MoveFlag::PromoKnight => Some(PieceKind::Knight),
            MoveFlag::PromoBishop => Some(PieceKind::Bishop),
            MoveFlag::PromoRook => Some(PieceKind::Rook),
            MoveFlag::PromoQueen => Some(PieceKind::Queen),
            _ => None,
        }
    }

    pub fn is_capture(self, board: &Board) -> bool {
        self.is_en_passant() || board.piece_at(self.to()) != Piece::None
    }

    /// Noisy moves are searched by quiescence: captures, en passant and
    /// promotions
    pub fn is_noisy(self, board: &Board) -> bool {
        self.is_capture(board) || self.promotion().is_some()
    }

    /// Moves exempt from futility pruning: captures, en passant and queen
    /// promotions
    pub fn is_interesting(self, board: &Board) -> bool {
        self.is_capture(board) || self.promotion() == Some(PieceKind::Queen)
    }

    /// Long algebraic notation as used by UCI, e.g. `e2e4` or `e7e8q`
    pub fn to_uci(self) -> String {
        let mut s = format!("{}{}", self.from(), self.to());
        if let Some(promo) = self.promotion() {
            s.push(match promo {
                PieceKind::Knight => 'n',
                PieceKind::Bishop => 'b',
                PieceKind::Rook => 'r',
                _ => 'q',
            });
        }
        s
    }

    /// Reconstructs a move from long algebraic notation, consulting the
    /// board to recover the flag. Returns `None` when the string is not
    /// even shaped like a move.
    pub fn from_uci(s: &str, board: &Board) -> Option<Move> {
        let bytes = s.as_bytes();
        if bytes.len() < 4 {
            return None;
        }
        let parse_sq = |file: u8, rank: u8| -> Option<Square> {
            if (b'a'..=b'h').contains(&file) && (b'1'..=b'8').contains(&rank) {
                Some(Square((rank - b'1') * 8 + (file - b'a')))
            } else {
                None
            }
        };
        let from = parse_sq(bytes[0], bytes[1])?;
        let to = parse_sq(bytes[2], bytes[3])?;
        let piece = board.piece_at(from);
        if piece == Piece::None {
            return None;
        }

        let flag = if let Some(&p) = bytes.get(4) {
            match p {
                b'n' => MoveFlag::PromoKnight,
                b'b' => MoveFlag::PromoBishop,
                b'r' => MoveFlag::PromoRook,
                b'q' => MoveFlag::PromoQueen,
                _ => return None,
            }
        } else if piece.kind() == PieceKind::King && from.file().abs_diff(to.file()) == 2 {
            if to.file() > from.file() {
                MoveFlag::KingCastle
            } else {
                MoveFlag::QueenCastle
            }
        } else if piece.kind() == PieceKind::Pawn {
            if from.rank().abs_diff(to.rank()) == 2 {
                MoveFlag::DoublePush
            } else if from.file() != to.file() && board.piece_at(to) == Piece::None {
                MoveFlag::EnPassant
            } else {
                MoveFlag::Quiet
            }
        } else {
            MoveFlag::Quiet
        };
        Some(Move::new(from, to, flag))
    }

    /// Rook displacement for a castling move, given the side castling
    pub fn castle_rook_squares(self, color: Color) -> (Square, Square) {
        match (self.flag(), color) {
            (MoveFlag::KingCastle, Color::White) => (Square::H1, Square(5)),
            (MoveFlag::QueenCastle, Color::White) => (Square::A1, Square(3)),
            (MoveFlag::KingCastle, Color::Black) => (Square::H8, Square(61)),
            (MoveFlag::QueenCastle, Color::Black) => (Square::A8, Square(59)),
            _ => panic!("not a castling move"),
        }
    }
}

impl fmt::Display for Move {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_uci())
    }
}

pub const WHITE_KING_SIDE: u8 = 1;
pub const WHITE_QUEEN_SIDE: u8 = 2;
pub const BLACK_KING_SIDE: u8 = 4;
pub const BLACK_QUEEN_SIDE: u8 = 8;

/// Per-square castling-right masks: moving to or from a square ANDs the
/// rights with its entry, which strips rights exactly when a king or rook
/// leaves its home square or a rook is captured on one
#[rustfmt::skip]
pub const CASTLING_RIGHTS: [u8; 64] = [
    13, 15, 15, 15, 12, 15, 15, 14,
    15, 15, 15, 15, 15, 15, 15, 15,
    15, 15, 15, 15, 15, 15, 15, 15,
    15, 15, 15, 15, 15, 15, 15, 15,
    15, 15, 15, 15, 15, 15, 15, 15,
    15, 15, 15, 15, 15, 15, 15, 15,
    15, 15, 15, 15, 15, 15, 15, 15,
     7, 15, 15, 15,  3, 15, 15, 11,
];
