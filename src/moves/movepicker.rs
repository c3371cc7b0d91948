use crate::board::board::Board;
use crate::eval::psqt;
use crate::types::pieces::{Piece, PieceKind};

use super::movegenerator::GenKind;
use super::movelist::{MoveEntry, MoveList};
use super::moves::Move;

const TT_MOVE_SCORE: i32 = i32::MAX - 1;
const QUEEN_PROMO: i32 = 2_000_000;
const CAPTURE: i32 = 1_000_000;
const UNDER_PROMO: i32 = -2_000_000;

#[derive(Debug, Eq, PartialEq)]
enum Stage {
    TtMove,
    GenNoisy,
    Noisy,
    GenQuiets,
    Quiets,
    Done,
}

/// Staged move generator: the transposition-table move is emitted before
/// anything is generated, then scored captures/promotions, then scored
/// quiet moves. Deferring quiet generation pays off whenever the early
/// stages produce a beta cutoff.
pub struct MovePicker {
    stage: Stage,
    tt_move: Move,
    gen_quiets: bool,
    moves: MoveList,
    idx: usize,
}

impl MovePicker {
    pub fn new(tt_move: Move, gen_quiets: bool) -> MovePicker {
        MovePicker {
            stage: Stage::TtMove,
            tt_move,
            gen_quiets,
            moves: MoveList::default(),
            idx: 0,
        }
    }

    /// Picker for quiescence outside of check: noisy moves only, no TT seed
    pub fn noisy_only() -> MovePicker {
        MovePicker {
            stage: Stage::GenNoisy,
            tt_move: Move::NONE,
            gen_quiets: false,
            moves: MoveList::default(),
            idx: 0,
        }
    }

    pub fn next(&mut self, board: &Board) -> Option<MoveEntry> {
        if self.stage == Stage::TtMove {
            self.stage = Stage::GenNoisy;
            if board.is_pseudo_legal(self.tt_move) {
                return Some(MoveEntry { mv: self.tt_move, score: TT_MOVE_SCORE });
            }
        }

        if self.stage == Stage::GenNoisy {
            self.stage = Stage::Noisy;
            self.moves = board.generate_moves(GenKind::Captures);
            score_noisy(board, self.moves.scored_slice_mut(0));
        }

        if self.stage == Stage::Noisy {
            while self.idx < self.moves.len() {
                let entry = self.moves.pick_move(self.idx);
                self.idx += 1;
                if entry.mv != self.tt_move {
                    return Some(entry);
                }
            }
            self.stage = if self.gen_quiets { Stage::GenQuiets } else { Stage::Done };
        }

        if self.stage == Stage::GenQuiets {
            self.stage = Stage::Quiets;
            let quiets = board.generate_moves(GenKind::Quiets);
            let start = self.moves.len();
            self.moves.append(&quiets);
            score_quiets(board, self.moves.scored_slice_mut(start));
        }

        if self.stage == Stage::Quiets {
            while self.idx < self.moves.len() {
                let entry = self.moves.pick_move(self.idx);
                self.idx += 1;
                if entry.mv != self.tt_move {
                    return Some(entry);
                }
            }
            self.stage = Stage::Done;
        }

        None
    }
}

fn score_noisy(board: &Board, entries: &mut [MoveEntry]) {
    for MoveEntry { mv, score } in entries {
        let victim = if mv.is_en_passant() {
            PieceKind::Pawn.value()
        } else {
            board.piece_at(mv.to()).value()
        };
        *score = match mv.promotion() {
            Some(PieceKind::Queen) => QUEEN_PROMO + victim,
            Some(_) => UNDER_PROMO,
            // MVV-LVA: prefer the biggest victim, break ties with the
            // cheapest attacker
            None => CAPTURE + 16 * victim - board.piece_at(mv.from()).value(),
        };
    }
}

fn score_quiets(board: &Board, entries: &mut [MoveEntry]) {
    for MoveEntry { mv, score } in entries {
        let piece = board.piece_at(mv.from());
        *score = psqt(piece.kind(), piece.color(), mv.to()) - psqt(piece.kind(), piece.color(), mv.from());
    }
}
