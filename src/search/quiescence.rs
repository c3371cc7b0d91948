use crate::board::board::Board;
use crate::moves::movegenerator::GenKind;
use crate::moves::movepicker::MovePicker;
use crate::moves::moves::Move;

use super::context::SearchContext;
use super::{Pv, CHECKMATE, DRAW, MAX_STACK};

/// Searches only tactically unstable continuations below the nominal
/// horizon: captures, promotions and en passant, plus every evasion while
/// in check. The side to move may always "stand pat" on the static
/// evaluation instead of continuing a losing exchange.
///
/// Quiescence never writes to the transposition table; while in check it
/// reads it for a move hint only.
pub(crate) fn quiescence(
    mut alpha: i32,
    beta: i32,
    pv: &mut Pv,
    ctx: &mut SearchContext,
    board: &Board,
) -> i32 {
    pv.clear();
    ctx.nodes += 1;

    if ctx.is_draw(board) {
        return DRAW;
    }
    if ctx.out_of_time() {
        return DRAW;
    }
    let in_check = board.in_check();
    if ctx.ply >= MAX_STACK - 1 {
        return if in_check { DRAW } else { ctx.accumulators.top().evaluate(board.stm) };
    }

    let stand_pat = if in_check {
        // There is no meaningful static score inside check; assume the
        // worst until an evasion proves otherwise
        -CHECKMATE + ctx.ply as i32
    } else {
        ctx.accumulators.top().evaluate(board.stm)
    };
    if stand_pat >= beta {
        return stand_pat;
    }
    alpha = alpha.max(stand_pat);

    let mut picker = if in_check {
        let tt_move = ctx.tt.probe(board.hash, ctx.ply).map_or(Move::NONE, |e| e.best_move);
        MovePicker::new(tt_move, true)
    } else {
        MovePicker::noisy_only()
    };

    let mut best_score = stand_pat;
    let mut legal_moves = 0;
    let mut child_pv = Pv::default();

    while let Some(entry) = picker.next(board) {
        let mut child = *board;
        if !child.make_move(entry.mv) {
            continue;
        }
        legal_moves += 1;
        ctx.push_move(entry.mv, board, child.hash);
        let score = -quiescence(-beta, -alpha, &mut child_pv, ctx, &child);
        ctx.pop();

        if score > best_score {
            best_score = score;
            if score > alpha {
                alpha = score;
            }
            if best_score >= beta {
                break;
            }
        }
    }

    // Standing pat in a position with no legal move at all would report a
    // false score for a stalemate; only this tail path needs the guard, the
    // in-check case already scores mates through the evasion loop
    if !in_check && legal_moves == 0 && best_score == stand_pat && !has_legal_quiet(board) {
        return DRAW;
    }

    best_score
}

fn has_legal_quiet(board: &Board) -> bool {
    board.generate_moves(GenKind::Quiets).moves().any(|m| {
        let mut child = *board;
        child.make_move(m)
    })
}

#[cfg(test)]
mod quiescence_tests {
    use std::time::Duration;

    use super::*;
    use crate::search::INFINITY;
    use crate::transposition::TranspositionTable;

    fn quiesce(fen: &str, alpha: i32, beta: i32) -> (i32, u64, i32) {
        let tt = TranspositionTable::new(1);
        let board = Board::from_fen(fen);
        let mut ctx = SearchContext::new(board, &tt, Duration::from_secs(600), false);
        let static_eval = ctx.accumulators.top().evaluate(board.stm);
        let mut pv = Pv::default();
        let score = quiescence(alpha, beta, &mut pv, &mut ctx, &board);
        (score, ctx.nodes, static_eval)
    }

    #[test]
    fn stand_pat_cuts_without_searching() {
        // Quiet position, large positive static eval for White
        let fen = "4k3/8/8/8/8/8/8/QQQ1K3 w - - 0 1";
        let (_, _, static_eval) = quiesce(fen, -INFINITY, INFINITY);
        assert!(static_eval > 2000);

        // With beta just below the static eval, the node must return the
        // stand-pat score after visiting exactly one node
        let (score, nodes, _) = quiesce(fen, static_eval - 100, static_eval - 1);
        assert_eq!(score, static_eval);
        assert_eq!(nodes, 1);
    }

    #[test]
    fn resolves_a_free_capture() {
        // White to move wins the undefended rook on d5
        let (score, _, static_eval) = quiesce("4k3/8/8/3r4/4P3/8/8/4K3 w - - 0 1", -INFINITY, INFINITY);
        assert!(static_eval < 0);
        assert!(score > 0);
        assert!(score - static_eval > 400);
    }

    #[test]
    fn checked_side_must_evade() {
        // Black is in check; the only legal replies are king moves
        let (score, _, _) = quiesce("4k3/4R3/4K3/8/8/8/8/8 b - - 0 1", -INFINITY, INFINITY);
        // Down a rook after the evasion, but not mated
        assert!(score < -300);
        assert!(score > -CHECKMATE + 100);
    }

    #[test]
    fn mate_is_detected_from_check() {
        let (score, _, _) = quiesce("4k3/4Q3/4K3/8/8/8/8/8 b - - 0 1", -INFINITY, INFINITY);
        assert_eq!(score, -CHECKMATE);
    }

    #[test]
    fn stalemate_guard_returns_draw() {
        let (score, _, _) = quiesce("7k/5Q2/6K1/8/8/8/8/8 b - - 0 1", -INFINITY, INFINITY);
        assert_eq!(score, DRAW);
    }

    #[test]
    fn ply_restored_after_quiescence() {
        let tt = TranspositionTable::new(1);
        let board = Board::from_fen(crate::board::fen::KIWIPETE_FEN);
        let mut ctx = SearchContext::new(board, &tt, Duration::from_secs(600), false);
        let mut pv = Pv::default();
        quiescence(-INFINITY, INFINITY, &mut pv, &mut ctx, &board);
        assert_eq!(ctx.ply, 0);
        assert_eq!(ctx.accumulators.len(), 1);
    }
}
