//! Implementing [`bench`] command is a [requirement for OpenBench], which is an
//! incredibly important tool for measuring the performance and strength of the
//! engine.
//!
//! [requirement for OpenBench]: https://github.com/AndyGrant/OpenBench/wiki/Requirements-For-Public-Engines#basic-requirements

use std::io::Write;
use std::time::Instant;

use tracing::debug;

use crate::chess::Game;
use crate::mcts::{self, Config};

/// Opening, middlegame and endgame positions with different branching
/// factors.
const BENCH_POSITIONS: [&str; 6] = [
    "rnbqkbnr/pppppppp/8/8/8/8/PPPPPPPP/RNBQKBNR w KQkq - 0 1",
    "r3k2r/p1ppqpb1/bn2pnp1/3PN3/1p2P3/2N2Q1p/PPPBBPPP/R3K2R w KQkq - 0 1",
    "r1bq1rk1/pp2bppp/2n1pn2/3p4/2PP4/2N1PN2/PP3PPP/R2QKB1R w KQ - 0 8",
    "8/2p5/3p4/KP5r/1R3p1k/8/4P1P1/8 w - - 0 1",
    "6k1/5ppp/8/8/8/8/5PPP/3R2K1 w - - 0 1",
    "7k/8/6K1/8/8/8/8/4Q3 w - - 0 1",
];

/// Number of cycles per position.
const BENCH_CYCLES: u32 = 200;

/// Runs search on a small set of positions to provide an estimate of engine's
/// performance and prints `<nodes> nodes <nps> nps`.
///
/// The searches are seeded, so the node count is stable between runs of the
/// same build.
///
/// NOTE: This function **has to run less than 60 seconds**.
///
/// See <https://github.com/AndyGrant/OpenBench/blob/master/Client/bench.py> for more details.
///
/// # Errors
///
/// Returns an error if writing to `out` fails or a search can not be primed.
pub fn bench(out: &mut dyn Write) -> anyhow::Result<()> {
    let config = Config::default()
        .with_cycles(BENCH_CYCLES)
        .with_seed(Some(0));
    let start = Instant::now();
    let mut nodes = 0;
    for fen in BENCH_POSITIONS {
        let game = Game::from_fen(fen)?;
        let result = mcts::find_best_move(game, &config)?;
        debug!(fen, nodes = result.nodes, rollouts = result.rollouts, "bench position");
        nodes += result.nodes;
    }
    let elapsed = start.elapsed();
    let nps = nodes as u128 * 1_000_000_000 / elapsed.as_nanos().max(1);
    writeln!(out, "{nodes} nodes {nps} nps")?;
    Ok(())
}
