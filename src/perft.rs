use crate::board::board::Board;
use crate::moves::movegenerator::GenKind;

/// Counts leaf nodes of the legal move tree, the standard acceptance test
/// for move generation and make/unmake bookkeeping
pub fn perft(board: &Board, depth: u32) -> u64 {
    if depth == 0 {
        return 1;
    }
    let mut nodes = 0;
    for m in board.generate_moves(GenKind::All).moves() {
        let mut child = *board;
        if !child.make_move(m) {
            continue;
        }
        nodes += if depth == 1 { 1 } else { perft(&child, depth - 1) };
    }
    nodes
}

/// Perft with per-root-move subtotals, for hunting down generator bugs
pub fn divide(board: &Board, depth: u32) -> u64 {
    let mut total = 0;
    for m in board.generate_moves(GenKind::All).moves() {
        let mut child = *board;
        if !child.make_move(m) {
            continue;
        }
        let nodes = if depth <= 1 { 1 } else { perft(&child, depth - 1) };
        println!("{m}: {nodes}");
        total += nodes;
    }
    println!("\nNodes searched: {total}");
    total
}

#[cfg(test)]
mod perft_tests {
    use rayon::prelude::*;

    use super::*;
    use crate::board::fen::{KIWIPETE_FEN, STARTING_FEN};

    /// Reference node counts from the chessprogramming wiki perft suite
    const SUITE: &[(&str, &[u64])] = &[
        (STARTING_FEN, &[20, 400, 8_902, 197_281, 4_865_609]),
        (KIWIPETE_FEN, &[48, 2_039, 97_862, 4_085_603]),
        ("8/2p5/3p4/KP5r/1R3p1k/8/4P1P1/8 w - - 0 1", &[14, 191, 2_812, 43_238, 674_624]),
        (
            "r3k2r/Pppp1ppp/1b3nbN/nP6/BBP1P3/q4N2/Pp1P2PP/R2Q1RK1 w kq - 0 1",
            &[6, 264, 9_467, 422_333],
        ),
        (
            "rnbq1k1r/pp1Pbppp/2p5/8/2B5/8/PPP1NnPP/RNBQK2R w KQ - 1 8",
            &[44, 1_486, 62_379, 2_103_487],
        ),
        (
            "r4rk1/1pp1qppp/p1np1n2/2b1p1B1/2B1P1b1/P1NP1N2/1PP1QPPP/R4RK1 w - - 0 10",
            &[46, 2_079, 89_890, 3_894_594],
        ),
    ];

    #[test]
    fn perft_suite() {
        SUITE.par_iter().for_each(|(fen, expected)| {
            let board = Board::from_fen(fen);
            for (depth, &nodes) in expected.iter().enumerate() {
                assert_eq!(
                    perft(&board, depth as u32 + 1),
                    nodes,
                    "{fen} at depth {}",
                    depth + 1
                );
            }
        });
    }
}
