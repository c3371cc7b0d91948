use crate::board::board::Board;
use crate::moves::movepicker::MovePicker;
use crate::moves::moves::Move;
use crate::transposition::Bound;

use super::context::{RootMove, SearchContext};
use super::quiescence::quiescence;
use super::{
    reduction, NodeKind, Pv, ASPIRATION_WINDOW, CHECKMATE, DRAW, INFINITY, MAX_DEPTH, MAX_STACK,
};

/// Reverse futility: a static eval this far above beta at low depth is
/// assumed to hold up
const RFP_MARGIN: i32 = 150;
/// Futility: quiet moves can't recover a static eval this far below alpha
const FUTILITY_MARGIN: i32 = 150;
const FUTILITY_MAX_DEPTH: i32 = 4;
const NULL_MOVE_REDUCTION: i32 = 4;
const NULL_MOVE_MIN_DEPTH: i32 = 4;

/// Iterative deepening with aspiration windows. Runs depth 1 upwards until
/// the time budget is spent, re-searching a depth with a relaxed bound
/// whenever the score lands outside the window. Publishes the last fully
/// accepted iteration's move and score in `ctx.best` and returns the move.
pub fn search_to_time(ctx: &mut SearchContext) -> Move {
    ctx.tt.age_up();
    let board = ctx.board;
    let mut alpha = -INFINITY;
    let mut beta = INFINITY;
    let mut depth = 1;
    let mut best_pv = Pv::default();

    while depth <= MAX_DEPTH {
        if depth > 1 && ctx.out_of_time() {
            break;
        }
        let mut pv = Pv::default();
        let score = alpha_beta(alpha, beta, depth, NodeKind::Root, &mut pv, ctx, &board);
        debug_assert_eq!(ctx.ply, 0);
        debug_assert_eq!(ctx.accumulators.len(), 1);

        // An interrupted iteration is discarded, except depth 1: a depth-1
        // root sweep degrades to picking any legal move, which is still
        // better than reporting none at all
        if ctx.stop && depth > 1 {
            break;
        }

        // Aspiration: on a fail, redo the same depth with only the failed
        // bound relaxed to infinity
        if score <= alpha {
            alpha = -INFINITY;
            continue;
        }
        if score >= beta {
            beta = INFINITY;
            continue;
        }

        ctx.best = RootMove { mv: pv.first(), score };
        best_pv = pv;
        if ctx.print {
            ctx.print_info(depth, score, &best_pv);
        }
        // No legal move at the root: mate or stalemate, nothing deeper to find
        if ctx.best.mv == Move::NONE || ctx.stop {
            break;
        }

        alpha = score - ASPIRATION_WINDOW;
        beta = score + ASPIRATION_WINDOW;
        depth += 1;
    }

    if ctx.print {
        let best = ctx.best.mv;
        if best == Move::NONE {
            println!("bestmove 0000");
        } else if let Some(&ponder) = best_pv.line.get(1) {
            println!("bestmove {best} ponder {ponder}");
        } else {
            println!("bestmove {best}");
        }
    }
    ctx.best.mv
}

/// Fail-soft negamax. The returned score may fall outside `[alpha, beta]`;
/// callers and the transposition table rely on that precision.
#[allow(clippy::too_many_arguments)]
pub(crate) fn alpha_beta(
    mut alpha: i32,
    beta: i32,
    depth: i32,
    node: NodeKind,
    pv: &mut Pv,
    ctx: &mut SearchContext,
    board: &Board,
) -> i32 {
    // Cleared first so PV reconstruction stays sound across early returns
    pv.clear();

    if depth == 0 {
        return quiescence(alpha, beta, pv, ctx, board);
    }

    ctx.nodes += 1;

    let is_root = node == NodeKind::Root;
    if !is_root && ctx.is_draw(board) {
        return DRAW;
    }
    // Past this point the search is winding down and the table must not be
    // poisoned with truncated results
    if ctx.out_of_time() {
        return DRAW;
    }
    let in_check = board.in_check();
    if ctx.ply >= MAX_STACK - 1 {
        return if in_check { DRAW } else { ctx.accumulators.top().evaluate(board.stm) };
    }

    let entry = ctx.tt.probe(board.hash, ctx.ply);
    let mut tt_move = Move::NONE;
    if let Some(entry) = entry {
        tt_move = entry.best_move;
        if !node.is_pv() && entry.depth >= depth {
            match entry.bound {
                Bound::Exact => return entry.score,
                Bound::Lower if entry.score >= beta => return entry.score,
                Bound::Upper if entry.score <= alpha => return entry.score,
                _ => {}
            }
        }
    }

    // Evaluating a position while in check is meaningless; the sentinel
    // also disables the eval-based prunings below
    let static_eval = if in_check {
        -INFINITY
    } else if let Some(entry) = entry.filter(|e| e.static_eval != -INFINITY) {
        entry.static_eval
    } else {
        ctx.accumulators.top().evaluate(board.stm)
    };

    // Null-move pruning: hand the opponent a free move at reduced depth; if
    // they still can't reach beta, a real move won't let them either. Only
    // with non-pawn material on the board, where zugzwang is rare.
    if !node.is_pv()
        && !in_check
        && depth >= NULL_MOVE_MIN_DEPTH
        && static_eval >= beta
        && board.has_non_pawns(board.stm)
    {
        let mut child = *board;
        child.make_null_move();
        ctx.push_null(child.hash);
        let mut child_pv = Pv::default();
        let score = -alpha_beta(
            -beta,
            -beta + 1,
            depth - NULL_MOVE_REDUCTION,
            NodeKind::NonPv,
            &mut child_pv,
            ctx,
            &child,
        );
        ctx.pop();
        if score >= beta {
            return score;
        }
    }

    // Reverse futility pruning
    if !node.is_pv() && !in_check && static_eval - RFP_MARGIN * depth >= beta {
        return static_eval;
    }

    let old_alpha = alpha;
    let mut best_score = -INFINITY;
    let mut best_move = Move::NONE;
    let mut legal_moves = 0;
    let mut picker = MovePicker::new(tt_move, true);
    let mut child_pv = Pv::default();

    while let Some(entry) = picker.next(board) {
        let m = entry.mv;
        let mut child = *board;
        // Pseudo-legal moves that expose the king are skipped silently
        if !child.make_move(m) {
            continue;
        }
        legal_moves += 1;

        // Everything except the first move of a PV node is expected to fail
        // low and gets the cheap treatment
        let expected_non_pv = !node.is_pv() || legal_moves > 1;

        // Futility pruning: at low depth, quiet-ish moves from a hopeless
        // static eval are skipped (still counted as legal)
        if expected_non_pv
            && depth < FUTILITY_MAX_DEPTH
            && !in_check
            && !m.is_interesting(board)
            && static_eval + FUTILITY_MARGIN * depth <= alpha
        {
            continue;
        }

        let reductions = reduction(depth, legal_moves);
        ctx.push_move(m, board, child.hash);

        let mut score = -INFINITY;
        if expected_non_pv {
            score = -alpha_beta(
                -alpha - 1,
                -alpha,
                depth - reductions,
                NodeKind::NonPv,
                &mut child_pv,
                ctx,
                &child,
            );
        }
        // First PV move gets the full window outright; later PV moves only
        // after their null-window search suggests they beat alpha
        if node.is_pv() && (legal_moves == 1 || score > alpha) {
            score = -alpha_beta(
                -beta,
                -alpha,
                depth - 1,
                NodeKind::Pv,
                &mut child_pv,
                ctx,
                &child,
            );
        }
        ctx.pop();

        if score >= beta {
            if !ctx.stop {
                ctx.tt.store(board.hash, m, depth, Bound::Lower, score, ctx.ply, static_eval);
            }
            return score;
        }
        if score > alpha {
            alpha = score;
            pv.update(m, &child_pv);
        }
        if score > best_score {
            best_score = score;
            best_move = m;
        }
    }

    if legal_moves == 0 {
        best_score = if in_check { -CHECKMATE + ctx.ply as i32 } else { DRAW };
    }

    if !ctx.stop {
        let bound = if best_score > old_alpha { Bound::Exact } else { Bound::Upper };
        // If every legal move was pruned, fall back to the static eval
        let stored = if best_score == -INFINITY { static_eval } else { best_score };
        ctx.tt.store(board.hash, best_move, depth, bound, stored, ctx.ply, static_eval);
    }

    best_score
}

#[cfg(test)]
mod search_tests {
    use std::time::Duration;

    use super::*;
    use crate::search::MATE_BOUND;
    use crate::transposition::TranspositionTable;

    fn search(fen: &str, millis: u64) -> (Move, i32, u64) {
        let tt = TranspositionTable::new(16);
        let board = Board::from_fen(fen);
        let mut ctx = SearchContext::new(board, &tt, Duration::from_millis(millis), false);
        let best = search_to_time(&mut ctx);
        (best, ctx.best.score, ctx.nodes)
    }

    #[test]
    fn finds_mate_in_one() {
        let (best, score, _) = search("4k3/8/4K3/8/8/8/8/3Q4 w - - 0 1", 200);
        assert_eq!(best.to_uci(), "d1d8");
        assert_eq!(score, CHECKMATE - 1);
    }

    #[test]
    fn finds_mate_in_one_for_black() {
        let (best, score, _) = search("3q4/8/8/8/8/4k3/8/4K3 b - - 0 1", 200);
        assert_eq!(best.to_uci(), "d8d1");
        assert_eq!(score, CHECKMATE - 1);
    }

    #[test]
    fn finds_the_back_rank_mate() {
        let (best, score, _) = search("6k1/5ppp/8/8/8/8/8/4R2K w - - 0 1", 200);
        assert_eq!(best.to_uci(), "e1e8");
        assert_eq!(score, CHECKMATE - 1);
    }

    #[test]
    fn stalemate_returns_draw_and_no_move() {
        let (best, score, _) = search("7k/5Q2/6K1/8/8/8/8/8 b - - 0 1", 100);
        assert_eq!(best, Move::NONE);
        assert_eq!(score, DRAW);
    }

    #[test]
    fn checkmated_root_returns_mate_score() {
        // Black is already mated; searching from the mated side
        let (best, score, _) = search("4k3/4Q3/4K3/8/8/8/8/8 b - - 0 1", 100);
        assert_eq!(best, Move::NONE);
        assert_eq!(score, -CHECKMATE);
    }

    #[test]
    fn takes_the_hanging_queen() {
        // Black queen hangs on d5 with nothing defending it
        let (best, score, _) = search("4k3/8/8/3q4/8/4N3/8/4K3 w - - 0 1", 300);
        assert_eq!(best.to_uci(), "e3d5");
        assert!(score > 400);
    }

    #[test]
    fn draw_by_repetition_scores_zero() {
        let tt = TranspositionTable::new(1);
        let mut board = Board::startpos();
        let mut history = vec![board.hash];
        for uci in ["g1f3", "g8f6", "f3g1", "f6g8"] {
            let m = Move::from_uci(uci, &board).unwrap();
            assert!(board.make_move(m));
            history.push(board.hash);
        }
        let mut ctx = SearchContext::new(board, &tt, Duration::from_millis(50), false);
        ctx.hash_history = history;
        ctx.ply = 1;
        let mut pv = Pv::default();
        // Any non-root node in a repeated position is an immediate draw
        let score = alpha_beta(-INFINITY, INFINITY, 4, NodeKind::Pv, &mut pv, &mut ctx, &board);
        assert_eq!(score, DRAW);
        assert_eq!(ctx.ply, 1);
    }

    #[test]
    fn ply_is_restored_and_scores_are_bounded() {
        let tt = TranspositionTable::new(8);
        let board = Board::from_fen(crate::board::fen::KIWIPETE_FEN);
        let mut ctx = SearchContext::new(board, &tt, Duration::from_millis(200), false);
        let mut pv = Pv::default();
        let score = alpha_beta(-INFINITY, INFINITY, 4, NodeKind::Root, &mut pv, &mut ctx, &board);
        assert_eq!(ctx.ply, 0);
        assert_eq!(ctx.accumulators.len(), 1);
        assert!(score.abs() <= CHECKMATE);
        assert!(score.abs() < MATE_BOUND, "kiwipete is not a forced mate at depth 4");
    }

    #[test]
    fn reports_a_mate_in_two() {
        // Several first moves deliver mate in two; the distance is what matters
        let (_, score, _) = search("6k1/8/6K1/8/8/8/8/5R2 w - - 0 1", 400);
        assert_eq!(score, CHECKMATE - 3);
    }

    /// With all speculative pruning stripped away, plain full-window negamax
    /// over the same quiescence horizon must agree with the real search on
    /// the minimax value of small positions.
    fn plain_negamax(ctx: &mut SearchContext, board: &Board, depth: i32) -> i32 {
        if depth == 0 {
            let mut pv = Pv::default();
            return quiescence(-INFINITY, INFINITY, &mut pv, ctx, board);
        }
        let mut best = -INFINITY;
        let mut legal_moves = 0;
        let mut picker = MovePicker::new(Move::NONE, true);
        while let Some(entry) = picker.next(board) {
            let mut child = *board;
            if !child.make_move(entry.mv) {
                continue;
            }
            legal_moves += 1;
            ctx.push_move(entry.mv, board, child.hash);
            let score = -plain_negamax(ctx, &child, depth - 1);
            ctx.pop();
            best = best.max(score);
        }
        if legal_moves == 0 {
            return if board.in_check() { -CHECKMATE + ctx.ply as i32 } else { DRAW };
        }
        best
    }

    #[test]
    fn pruning_preserves_the_minimax_value() {
        for fen in [
            "4k3/8/8/8/8/8/8/R3K3 w - - 0 1",
            "8/2k5/8/8/8/8/2K2R2/8 b - - 0 1",
            "4k3/8/8/3q4/8/4N3/8/4K3 w - - 0 1",
        ] {
            let board = Board::from_fen(fen);

            let tt = TranspositionTable::new(4);
            let mut ctx =
                SearchContext::new(board, &tt, Duration::from_secs(600), false);
            let mut pv = Pv::default();
            let pruned =
                alpha_beta(-INFINITY, INFINITY, 3, NodeKind::Root, &mut pv, &mut ctx, &board);

            let tt2 = TranspositionTable::new(4);
            let mut ref_ctx =
                SearchContext::new(board, &tt2, Duration::from_secs(600), false);
            let reference = plain_negamax(&mut ref_ctx, &board, 3);

            assert_eq!(pruned, reference, "value diverged on {fen}");
        }
    }
}
