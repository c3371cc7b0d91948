use std::time::{Duration, Instant};

use crate::board::board::Board;
use crate::eval::Accumulator;
use crate::moves::moves::Move;
use crate::transposition::TranspositionTable;

use super::{AccumulatorStack, Pv, CHECKMATE, INFINITY, MATE_BOUND};

/// Best root move found so far, published by iterative deepening after each
/// accepted iteration
#[derive(Clone, Copy, Debug)]
pub struct RootMove {
    pub mv: Move,
    pub score: i32,
}

impl Default for RootMove {
    fn default() -> Self {
        RootMove { mv: Move::NONE, score: -INFINITY }
    }
}

/// Mutable state for one iterative-deepening search: the root board, the
/// ply-indexed accumulator stack, the repetition history, time bookkeeping
/// and the cooperative stop flag. Lives for exactly one `search_to_time`
/// call.
pub struct SearchContext<'a> {
    pub board: Board,
    pub accumulators: AccumulatorStack,
    pub tt: &'a TranspositionTable,
    /// Hashes of every position from game start through the current node,
    /// the current node's hash last
    pub hash_history: Vec<u64>,
    pub start: Instant,
    pub budget: Duration,
    pub nodes: u64,
    pub best: RootMove,
    pub ply: usize,
    pub print: bool,
    pub stop: bool,
}

impl<'a> SearchContext<'a> {
    pub fn new(
        board: Board,
        tt: &'a TranspositionTable,
        budget: Duration,
        print: bool,
    ) -> SearchContext<'a> {
        SearchContext {
            accumulators: AccumulatorStack::new(Accumulator::from_board(&board)),
            hash_history: vec![board.hash],
            board,
            tt,
            start: Instant::now(),
            budget,
            nodes: 0,
            best: RootMove::default(),
            ply: 0,
            print,
            stop: false,
        }
    }

    /// Polled at every node. The clock itself is only read every 1024 nodes;
    /// once the budget is exceeded the transition to `stop` is committed and
    /// every later poll is a cheap flag read.
    pub fn out_of_time(&mut self) -> bool {
        if !self.stop && self.nodes & 1023 == 0 && self.start.elapsed() >= self.budget {
            self.stop = true;
        }
        self.stop
    }

    /// Draw by rule or by repetition against the game/search history
    pub fn is_draw(&self, board: &Board) -> bool {
        board.is_draw() || self.is_repetition(board)
    }

    /// One prior occurrence within the irreversibility window counts: a
    /// position the search has already seen gains nothing by being searched
    /// again
    fn is_repetition(&self, board: &Board) -> bool {
        self.hash_history
            .iter()
            .rev()
            .skip(1)
            .take(board.half_moves as usize)
            .any(|&hash| hash == board.hash)
    }

    /// Descends one ply: derives the child accumulator from the parent
    /// position and move, and records the child position in the history
    pub fn push_move(&mut self, m: Move, parent: &Board, child_hash: u64) {
        let child = self.accumulators.top().apply(m, parent);
        self.accumulators.push(child);
        self.hash_history.push(child_hash);
        self.ply += 1;
    }

    /// Descends one ply across a null move; the accumulator is unchanged
    pub fn push_null(&mut self, child_hash: u64) {
        let top = *self.accumulators.top();
        self.accumulators.push(top);
        self.hash_history.push(child_hash);
        self.ply += 1;
    }

    pub fn pop(&mut self) {
        self.accumulators.pop();
        self.hash_history.pop();
        self.ply -= 1;
    }

    pub fn print_info(&self, depth: i32, score: i32, pv: &Pv) {
        let elapsed = self.start.elapsed();
        let nps = self.nodes * 1_000_000_000 / elapsed.as_nanos().max(1) as u64;

        print!("info depth {depth} score ");
        if score.abs() >= MATE_BOUND {
            if score > 0 {
                print!("mate {}", (CHECKMATE - score + 1) / 2);
            } else {
                print!("mate {}", -((CHECKMATE + score) / 2));
            }
        } else {
            print!("cp {score}");
        }
        print!(" nodes {} nps {} time {} pv", self.nodes, nps, elapsed.as_millis());
        for m in pv.line.iter() {
            print!(" {m}");
        }
        println!();
    }
}

#[cfg(test)]
mod context_tests {
    use super::*;

    #[test]
    fn repetition_is_detected() {
        let tt = TranspositionTable::new(1);
        let mut board = Board::startpos();
        let mut history = vec![board.hash];
        for uci in ["g1f3", "g8f6", "f3g1", "f6g8"] {
            let m = Move::from_uci(uci, &board).unwrap();
            assert!(board.make_move(m));
            history.push(board.hash);
        }
        let mut ctx = SearchContext::new(board, &tt, Duration::from_millis(10), false);
        ctx.hash_history = history;
        // Back to the starting position: one prior occurrence in history
        assert!(ctx.is_draw(&board));
    }

    #[test]
    fn budget_exhaustion_sets_stop() {
        let tt = TranspositionTable::new(1);
        let mut ctx =
            SearchContext::new(Board::startpos(), &tt, Duration::from_millis(0), false);
        assert!(ctx.out_of_time());
        assert!(ctx.stop);
    }
}
