use arrayvec::ArrayVec;

use crate::eval::Accumulator;
use crate::moves::moves::Move;

pub mod alpha_beta;
pub mod context;
pub mod quiescence;

pub use context::SearchContext;

/// Window sentinel; never returned by a completed search
pub const INFINITY: i32 = 30_000;
/// Mate at the current node; `CHECKMATE - k` is mate in `k` plies from here
pub const CHECKMATE: i32 = 25_000;
/// Scores beyond this bound are forced mates rather than centipawns
pub const MATE_BOUND: i32 = CHECKMATE - 1_000;
pub const DRAW: i32 = 0;

pub const MAX_DEPTH: i32 = 255;
/// Accumulator stack entries; quiescence depth is capped so `ply` can never
/// reach this
pub const MAX_STACK: usize = 512;

pub const ASPIRATION_WINDOW: i32 = 25;

/// How a node relates to the principal variation, controlling pruning
/// aggressiveness and PV collection
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum NodeKind {
    Root,
    Pv,
    NonPv,
}

impl NodeKind {
    pub fn is_pv(self) -> bool {
        self != NodeKind::NonPv
    }
}

/// Late-move reduction schedule: moves after the first are searched two
/// plies shallower once there is depth to spare. A single call site so a
/// log-based table can replace the constants without touching the search.
pub fn reduction(depth: i32, moves_tried: i32) -> i32 {
    if moves_tried > 1 && depth > 1 {
        2
    } else {
        1
    }
}

/// Best line from the current node downwards, rebuilt bottom-up whenever a
/// move raises alpha at a PV node
#[derive(Clone, Debug, Default)]
pub struct Pv {
    pub line: ArrayVec<Move, { MAX_DEPTH as usize + 1 }>,
}

impl Pv {
    pub fn clear(&mut self) {
        self.line.clear();
    }

    /// Prepends `m` to a child's line
    pub fn update(&mut self, m: Move, child: &Pv) {
        self.line.clear();
        self.line.push(m);
        self.line.extend(child.line.iter().copied());
    }

    pub fn first(&self) -> Move {
        self.line.first().copied().unwrap_or(Move::NONE)
    }
}

/// Per-ply evaluation accumulators. `stack[ply]` always matches the board
/// at that ply; the child accumulator is pushed before descending and
/// popped on the way back up.
pub struct AccumulatorStack {
    stack: Vec<Accumulator>,
}

impl AccumulatorStack {
    pub fn new(root: Accumulator) -> AccumulatorStack {
        let mut stack = Vec::with_capacity(MAX_STACK);
        stack.push(root);
        AccumulatorStack { stack }
    }

    pub fn top(&self) -> &Accumulator {
        self.stack.last().expect("accumulator stack is never empty")
    }

    pub fn push(&mut self, acc: Accumulator) {
        self.stack.push(acc);
    }

    pub fn pop(&mut self) {
        self.stack.pop();
    }

    pub fn len(&self) -> usize {
        self.stack.len()
    }
}

#[cfg(test)]
mod pv_tests {
    use super::*;
    use crate::moves::moves::MoveFlag;
    use crate::types::square::Square;

    #[test]
    fn update_prepends() {
        let m1 = Move::new(Square(0), Square(1), MoveFlag::Quiet);
        let m2 = Move::new(Square(2), Square(3), MoveFlag::Quiet);
        let mut child = Pv::default();
        child.line.push(m2);
        let mut pv = Pv::default();
        pv.update(m1, &child);
        assert_eq!(pv.line.as_slice(), &[m1, m2]);
        assert_eq!(pv.first(), m1);

        pv.clear();
        assert_eq!(pv.first(), Move::NONE);
    }

    #[test]
    fn crude_reduction_schedule() {
        assert_eq!(reduction(1, 1), 1);
        assert_eq!(reduction(5, 1), 1);
        assert_eq!(reduction(1, 3), 1);
        assert_eq!(reduction(5, 3), 2);
    }
}
