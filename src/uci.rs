use std::io;
use std::time::Duration;

use itertools::Itertools;

use crate::board::board::Board;
use crate::moves::moves::Move;
use crate::perft::divide;
use crate::search::alpha_beta::search_to_time;
use crate::search::SearchContext;
use crate::transposition::TranspositionTable;
use crate::types::pieces::Color;

const DEFAULT_HASH_MB: usize = 16;
const DEFAULT_MOVETIME: Duration = Duration::from_secs(5);

/// Blocking UCI loop. Searches run synchronously with a wall-clock budget;
/// cancellation is the budget itself rather than an out-of-band `stop`.
pub fn main_loop() -> ! {
    let tt = TranspositionTable::new(DEFAULT_HASH_MB);
    let mut board = Board::startpos();
    let mut history = vec![board.hash];
    let mut buffer = String::new();

    loop {
        buffer.clear();
        if io::stdin().read_line(&mut buffer).unwrap_or(0) == 0 {
            // stdin closed
            std::process::exit(0);
        }
        let line = buffer.trim();

        if line == "uci" {
            println!("id name Sable");
            println!("id author the sable developers");
            println!("uciok");
        } else if line == "isready" {
            println!("readyok");
        } else if line == "ucinewgame" {
            tt.clear();
            board = Board::startpos();
            history = vec![board.hash];
        } else if line.starts_with("position") {
            parse_position(line, &mut board, &mut history);
        } else if let Some(rest) = line.strip_prefix("go perft ") {
            if let Ok(depth) = rest.trim().parse() {
                divide(&board, depth);
            }
        } else if line.starts_with("go") {
            let budget = parse_go(line, board.stm);
            let mut ctx = SearchContext::new(board, &tt, budget, true);
            ctx.hash_history = history.clone();
            search_to_time(&mut ctx);
        } else if line == "d" {
            print!("{board}");
        } else if line == "quit" {
            std::process::exit(0);
        } else if !line.is_empty() && line != "stop" {
            println!("info string unhandled command: {line}");
        }
    }
}

fn parse_position(line: &str, board: &mut Board, history: &mut Vec<u64>) {
    let tokens: Vec<&str> = line.split_whitespace().collect();
    let mut idx = 1;
    match tokens.get(idx) {
        Some(&"startpos") => {
            *board = Board::startpos();
            idx += 1;
        }
        Some(&"fen") => {
            let end = (idx + 7).min(tokens.len());
            let fen = tokens[idx + 1..end].join(" ");
            *board = Board::from_fen(&fen);
            idx = end;
        }
        _ => return,
    }
    *history = vec![board.hash];

    if tokens.get(idx) == Some(&"moves") {
        for token in &tokens[idx + 1..] {
            let Some(m) = Move::from_uci(token, board) else { break };
            if !board.make_move(m) {
                break;
            }
            history.push(board.hash);
        }
    }
}

/// Derives a wall-clock budget from the `go` arguments: an explicit
/// movetime wins, otherwise a slice of the remaining clock plus half the
/// increment
fn parse_go(line: &str, stm: Color) -> Duration {
    let mut movetime = None;
    let mut time = None;
    let mut increment = 0;

    for (key, value) in line.split_whitespace().skip(1).tuples() {
        let value: u64 = value.parse().unwrap_or(0);
        match (key, stm) {
            ("movetime", _) => movetime = Some(value),
            ("wtime", Color::White) | ("btime", Color::Black) => time = Some(value),
            ("winc", Color::White) | ("binc", Color::Black) => increment = value,
            _ => {}
        }
    }

    match (movetime, time) {
        (Some(ms), _) => Duration::from_millis(ms),
        (None, Some(clock)) => Duration::from_millis(clock / 20 + increment / 2),
        (None, None) => DEFAULT_MOVETIME,
    }
}

#[cfg(test)]
mod uci_tests {
    use super::*;

    #[test]
    fn go_parsing() {
        assert_eq!(parse_go("go movetime 350", Color::White), Duration::from_millis(350));
        assert_eq!(
            parse_go("go wtime 60000 btime 30000 winc 1000 binc 500", Color::White),
            Duration::from_millis(60000 / 20 + 500)
        );
        assert_eq!(
            parse_go("go wtime 60000 btime 30000 winc 1000 binc 500", Color::Black),
            Duration::from_millis(30000 / 20 + 250)
        );
        assert_eq!(parse_go("go infinite", Color::White), DEFAULT_MOVETIME);
    }

    #[test]
    fn position_with_moves() {
        let mut board = Board::startpos();
        let mut history = vec![board.hash];
        parse_position("position startpos moves e2e4 e7e5 g1f3", &mut board, &mut history);
        assert_eq!(history.len(), 4);
        assert_eq!(board.stm, Color::Black);
        assert_eq!(board.full_moves, 2);

        parse_position(
            "position fen 4k3/8/4K3/8/8/8/8/3Q4 w - - 0 1 moves d1d8",
            &mut board,
            &mut history,
        );
        assert!(board.in_check());
        assert_eq!(history.len(), 2);
    }
}
