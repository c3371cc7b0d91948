use std::env;
use std::io;

use crate::datagen::{TrainingConfig, TrainingSession};

mod board;
mod datagen;
mod eval;
mod moves;
mod perft;
mod search;
mod transposition;
mod types;
mod uci;

fn main() {
    simple_logger::SimpleLogger::new()
        .with_level(log::LevelFilter::Info)
        .init()
        .ok();

    let args: Vec<String> = env::args().collect();
    if args.get(1).map(String::as_str) == Some("datagen") {
        let threads = args.get(2).and_then(|s| s.parse().ok()).unwrap_or(1);
        let hash_mb = args.get(3).and_then(|s| s.parse().ok()).unwrap_or(16);
        let session = TrainingSession::start(TrainingConfig { threads, hash_mb });

        println!("generating training data with {threads} workers; press enter to stop");
        let mut line = String::new();
        let _ = io::stdin().read_line(&mut line);

        if let Err(e) = session.stop() {
            eprintln!("failed to merge training data: {e}");
            std::process::exit(1);
        }
    } else {
        uci::main_loop();
    }
}
