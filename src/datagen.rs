use std::fs::{self, File, OpenOptions};
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::JoinHandle;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use log::{info, warn};

use crate::board::board::Board;
use crate::moves::movegenerator::GenKind;
use crate::moves::moves::Move;
use crate::search::alpha_beta::search_to_time;
use crate::search::{SearchContext, MATE_BOUND};
use crate::transposition::TranspositionTable;
use crate::types::pieces::Color;

/// Fixed thinking time per self-play move
const MOVE_TIME: Duration = Duration::from_nanos(1_000_000_000 / 8);
const OPENING_PLIES_MIN: u64 = 5;
const OPENING_PLIES_MAX: u64 = 10;

#[derive(Clone, Copy, Debug)]
pub struct TrainingConfig {
    pub threads: usize,
    pub hash_mb: usize,
}

impl Default for TrainingConfig {
    fn default() -> Self {
        TrainingConfig { threads: 1, hash_mb: 16 }
    }
}

/// A running set of self-play workers. Each worker owns its transposition
/// table, RNG and output file; the only shared state is the stop flag.
/// Dropping the stop signal through `stop` joins the workers and merges
/// their output files into `training_data.txt`.
pub struct TrainingSession {
    stop: Arc<AtomicBool>,
    threads: usize,
    workers: Vec<JoinHandle<io::Result<()>>>,
}

impl TrainingSession {
    pub fn start(config: TrainingConfig) -> TrainingSession {
        let stop = Arc::new(AtomicBool::new(false));
        let workers = (0..config.threads)
            .map(|idx| {
                let stop = Arc::clone(&stop);
                let hash_mb = config.hash_mb;
                std::thread::Builder::new()
                    .name(format!("datagen-{idx}"))
                    .stack_size(8 * 1024 * 1024)
                    .spawn(move || worker_loop(idx, hash_mb, &stop))
                    .expect("failed to spawn training worker")
            })
            .collect();
        info!(
            "started {} training workers, {} MB hash each",
            config.threads, config.hash_mb
        );
        TrainingSession { stop, threads: config.threads, workers }
    }

    /// Signals the workers, waits for them to finish their current games,
    /// and merges the per-worker files. Stop observation may lag by one
    /// game per worker.
    pub fn stop(self) -> io::Result<()> {
        self.stop.store(true, Ordering::Relaxed);
        for (idx, worker) in self.workers.into_iter().enumerate() {
            match worker.join() {
                Ok(Ok(())) => {}
                Ok(Err(e)) => warn!("training worker {idx} failed: {e}"),
                Err(_) => warn!("training worker {idx} panicked"),
            }
        }
        merge_outputs(Path::new("."), self.threads)
    }
}

fn worker_loop(idx: usize, hash_mb: usize, stop: &AtomicBool) -> io::Result<()> {
    let tt = TranspositionTable::new(hash_mb);
    let mut rng = SplitMix64::from_time(idx);
    let file = OpenOptions::new()
        .append(true)
        .create(true)
        .open(worker_file(Path::new("."), idx))?;
    let mut out = BufWriter::new(file);

    let mut games = 0u64;
    while !stop.load(Ordering::Relaxed) {
        let record = play_out(random_opening(&mut rng), &tt);
        write_game(&mut out, &record)?;
        games += 1;
        tt.clear();
    }
    out.flush()?;
    info!("worker {idx} finished after {games} games");
    Ok(())
}

/// One recorded position: FEN before the move was played and the search
/// score from White's point of view
struct Sample {
    fen: String,
    score: i32,
}

struct GameRecord {
    samples: Vec<Sample>,
    /// Game result from White's point of view: 1.0, 0.5 or 0.0
    outcome: f64,
}

/// Plays random legal moves from the starting position to scatter openings.
/// If a randomly chosen move turns out to be illegal it is swapped out and
/// the pick repeats among the remainder.
fn random_opening(rng: &mut SplitMix64) -> Board {
    let mut board = Board::startpos();
    let plies = OPENING_PLIES_MIN + rng.below(OPENING_PLIES_MAX - OPENING_PLIES_MIN + 1);
    for _ in 0..plies {
        let mut candidates: Vec<Move> =
            board.generate_moves(GenKind::Captures).moves().collect();
        candidates.extend(board.generate_moves(GenKind::Quiets).moves());
        loop {
            if candidates.is_empty() {
                // The random walk reached a terminal position; self-play
                // will rediscover that immediately
                return board;
            }
            let pick = rng.below(candidates.len() as u64) as usize;
            let mut child = board;
            if child.make_move(candidates[pick]) {
                board = child;
                break;
            }
            candidates.swap_remove(pick);
        }
    }
    board
}

/// Plays the position to completion with fixed-time searches, recording
/// labelled positions along the way
fn play_out(mut board: Board, tt: &TranspositionTable) -> GameRecord {
    let mut samples = Vec::new();
    let mut history = vec![board.hash];

    let outcome = loop {
        if board.is_draw() || threefold(&history, &board) {
            break 0.5;
        }

        let mut ctx = SearchContext::new(board, tt, MOVE_TIME, false);
        ctx.hash_history = history.clone();
        let best = search_to_time(&mut ctx);

        if best == Move::NONE {
            // No legal move: mate against the side to move, or stalemate
            break if board.in_check() {
                match board.stm {
                    Color::White => 0.0,
                    Color::Black => 1.0,
                }
            } else {
                0.5
            };
        }

        record_position(&mut samples, &board, ctx.best.score);

        assert!(board.make_move(best), "search returned an illegal move");
        history.push(board.hash);
    };

    GameRecord { samples, outcome }
}

/// The observed recording filter: skip positions in check, positions whose
/// search score is a forced mate, and positions without mating material.
/// Other draw kinds (fifty-move, repetition) are intentionally not
/// filtered here.
fn record_position(samples: &mut Vec<Sample>, board: &Board, score: i32) {
    if board.in_check() || score.abs() >= MATE_BOUND || board.insufficient_material() {
        return;
    }
    let white_score = match board.stm {
        Color::White => score,
        Color::Black => -score,
    };
    samples.push(Sample { fen: board.to_fen(), score: white_score });
}

/// Game-termination repetition: the current position has occurred three
/// times in total
fn threefold(history: &[u64], board: &Board) -> bool {
    history.iter().filter(|&&hash| hash == board.hash).count() >= 3
}

fn write_game(out: &mut impl Write, record: &GameRecord) -> io::Result<()> {
    for sample in &record.samples {
        writeln!(out, "{} | {} | {:.1}", sample.fen, sample.score, record.outcome)?;
    }
    Ok(())
}

fn worker_file(dir: &Path, idx: usize) -> PathBuf {
    dir.join(format!("training_data{idx:02}.txt"))
}

/// Concatenates per-worker files into `training_data.txt` and removes them.
/// A worker that died without producing a file is skipped.
fn merge_outputs(dir: &Path, threads: usize) -> io::Result<()> {
    let mut out = File::create(dir.join("training_data.txt"))?;
    for idx in 0..threads {
        let path = worker_file(dir, idx);
        match File::open(&path) {
            Ok(mut file) => {
                io::copy(&mut file, &mut out)?;
            }
            Err(_) => warn!("skipping missing worker file {}", path.display()),
        }
        let _ = fs::remove_file(&path);
    }
    Ok(())
}

/// SplitMix64, seeded from the clock so parallel workers diverge
struct SplitMix64(u64);

impl SplitMix64 {
    fn new(seed: u64) -> SplitMix64 {
        SplitMix64(seed)
    }

    fn from_time(worker: usize) -> SplitMix64 {
        let nanos = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap_or_default()
            .as_nanos() as u64;
        SplitMix64::new(nanos ^ (worker as u64).wrapping_mul(0x9E37_79B9_7F4A_7C15))
    }

    fn next_u64(&mut self) -> u64 {
        self.0 = self.0.wrapping_add(0x9E37_79B9_7F4A_7C15);
        let mut z = self.0;
        z = (z ^ (z >> 30)).wrapping_mul(0xBF58_476D_1CE4_E5B9);
        z = (z ^ (z >> 27)).wrapping_mul(0x94D0_49BB_1331_11EB);
        z ^ (z >> 31)
    }

    fn below(&mut self, n: u64) -> u64 {
        self.next_u64() % n
    }
}
