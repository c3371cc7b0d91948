use crate::moves::moves::{
    BLACK_KING_SIDE, BLACK_QUEEN_SIDE, WHITE_KING_SIDE, WHITE_QUEEN_SIDE,
};
use crate::types::pieces::{Color, Piece};
use crate::types::square::Square;

use super::board::Board;

pub const STARTING_FEN: &str = "rnbqkbnr/pppppppp/8/8/8/8/PPPPPPPP/RNBQKBNR w KQkq - 0 1";
pub const KIWIPETE_FEN: &str =
    "r3k2r/p1ppqpb1/bn2pnp1/3PN3/1p2P3/2N2Q1p/PPPBBPPP/R3K2R w KQkq - 0 1";

impl Board {
    /// Builds a board from a FEN string. The input is trusted engine-internal
    /// data (UCI `position` commands, recorded training FENs); malformed
    /// strings panic.
    pub fn from_fen(fen: &str) -> Board {
        let mut board = Board::empty();
        let mut fields = fen.split_whitespace();

        let placement = fields.next().expect("FEN missing piece placement");
        let mut rank: i32 = 7;
        let mut file: i32 = 0;
        for c in placement.chars() {
            match c {
                '/' => {
                    rank -= 1;
                    file = 0;
                }
                '1'..='8' => file += c.to_digit(10).unwrap() as i32,
                _ => {
                    let piece = Piece::from_char(c)
                        .unwrap_or_else(|| panic!("unrecognized FEN piece '{c}'"));
                    board.place_piece(piece, Square((rank * 8 + file) as u8));
                    file += 1;
                }
            }
        }

        board.stm = match fields.next().expect("FEN missing side to move") {
            "w" => Color::White,
            "b" => Color::Black,
            s => panic!("invalid side to move '{s}'"),
        };

        let castling = fields.next().unwrap_or("-");
        board.castling_rights = castling.chars().fold(0, |rights, c| {
            rights
                | match c {
                    'K' => WHITE_KING_SIDE,
                    'Q' => WHITE_QUEEN_SIDE,
                    'k' => BLACK_KING_SIDE,
                    'q' => BLACK_QUEEN_SIDE,
                    _ => 0,
                }
        });

        let en_passant = fields.next().unwrap_or("-");
        if en_passant != "-" {
            let bytes = en_passant.as_bytes();
            let file = bytes[0] - b'a';
            let rank = bytes[1] - b'1';
            board.en_passant = Some(Square(rank * 8 + file));
        }

        board.half_moves = fields.next().and_then(|s| s.parse().ok()).unwrap_or(0);
        board.full_moves = fields.next().and_then(|s| s.parse().ok()).unwrap_or(1);

        board.hash = board.generate_hash();
        board.refresh_check();
        board
    }

    pub fn to_fen(&self) -> String {
        let mut fen = String::new();
        for rank in (0..8).rev() {
            let mut empty = 0;
            for file in 0..8 {
                let piece = self.piece_at(Square(rank * 8 + file));
                if piece == Piece::None {
                    empty += 1;
                } else {
                    if empty > 0 {
                        fen.push(char::from_digit(empty, 10).unwrap());
                        empty = 0;
                    }
                    fen.push(piece.to_char());
                }
            }
            if empty > 0 {
                fen.push(char::from_digit(empty, 10).unwrap());
            }
            if rank > 0 {
                fen.push('/');
            }
        }

        fen.push(' ');
        fen.push(match self.stm {
            Color::White => 'w',
            Color::Black => 'b',
        });

        fen.push(' ');
        if self.castling_rights == 0 {
            fen.push('-');
        } else {
            for (right, c) in [
                (WHITE_KING_SIDE, 'K'),
                (WHITE_QUEEN_SIDE, 'Q'),
                (BLACK_KING_SIDE, 'k'),
                (BLACK_QUEEN_SIDE, 'q'),
            ] {
                if self.castling_rights & right != 0 {
                    fen.push(c);
                }
            }
        }

        fen.push(' ');
        match self.en_passant {
            Some(sq) => fen.push_str(&sq.to_string()),
            None => fen.push('-'),
        }

        fen.push_str(&format!(" {} {}", self.half_moves, self.full_moves));
        fen
    }
}

#[cfg(test)]
mod fen_tests {
    use super::*;
    use crate::types::pieces::PieceKind;

    #[test]
    fn round_trips() {
        for fen in [
            STARTING_FEN,
            KIWIPETE_FEN,
            "8/2p5/3p4/KP5r/1R3p1k/8/4P1P1/8 w - - 0 1",
            "rnbq1k1r/pp1Pbppp/2p5/8/2B5/8/PPP1NnPP/RNBQK2R w KQ - 1 8",
            "4k3/4Q3/4K3/8/8/8/8/8 w - - 0 1",
            "rnbqkbnr/pppppppp/8/8/4P3/8/PPPP1PPP/RNBQKBNR b KQkq e3 0 1",
        ] {
            assert_eq!(Board::from_fen(fen).to_fen(), fen);
        }
    }

    #[test]
    fn fields_are_parsed() {
        let board = Board::from_fen(KIWIPETE_FEN);
        assert_eq!(board.stm, Color::White);
        assert_eq!(board.castling_rights, 0b1111);
        assert_eq!(board.en_passant, None);
        assert_eq!(board.bitboard(PieceKind::Queen, Color::White).count_bits(), 1);
        assert_eq!(board.piece_bb(PieceKind::Pawn).count_bits(), 16);
    }

    #[test]
    fn check_state_restored() {
        let board = Board::from_fen("4k3/4R3/8/8/8/8/8/4K3 b - - 0 1");
        assert!(board.in_check());
    }
}
