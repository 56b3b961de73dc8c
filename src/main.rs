use std::io::{self, BufRead, Write};

use anyhow::{bail, Context};
use clap::{Parser, Subcommand};
use playout::chess::{move_to_uci, Game};
use playout::environment::{Environment, GameResult, Player};
use playout::mcts::{self, Config};
use serde::Serialize;
use tracing::info;

/// Chess move picker driven by Monte Carlo Tree Search with random playouts.
#[derive(Parser, Debug)]
#[command(version, about)]
struct Cli {
    #[command(subcommand)]
    mode: Option<Mode>,
    /// Number of search cycles per move.
    #[arg(long, global = true, default_value_t = Config::default().cycles)]
    cycles: u32,
    /// Maximum number of nodes in the search tree.
    #[arg(long, global = true, default_value_t = Config::default().capacity)]
    capacity: usize,
    /// Seed for the random playouts, makes the searches reproducible.
    #[arg(long, global = true)]
    seed: Option<u64>,
    /// Log filter for stderr, `RUST_LOG` takes precedence.
    #[arg(long, global = true, default_value = "warn")]
    log_level: String,
}

#[derive(Subcommand, Debug, Clone)]
enum Mode {
    /// Speak the Universal Chess Interface on stdin and stdout (default).
    Uci,
    /// Read a FEN line from stdin and print the chosen move.
    Move,
    /// Read a FEN line and then UCI moves from stdin, print the state after
    /// every move as JSON.
    Validate,
    /// Let the engine play against itself and print the moves.
    Selfplay {
        /// Starting position, the standard one by default.
        #[arg(long)]
        fen: Option<String>,
        /// Stop the game after this many moves.
        #[arg(long, default_value_t = 300)]
        max_plies: u32,
    },
    /// Search a fixed set of positions and report speed.
    Bench,
}

/// Logs go to stderr: stdout is reserved for the protocol.
fn init_tracing(level: &str) {
    use tracing_subscriber::prelude::*;
    use tracing_subscriber::{fmt, EnvFilter};

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(io::stderr))
        .with(filter)
        .init();
}

fn read_line(input: &mut impl BufRead) -> anyhow::Result<Option<String>> {
    let mut line = String::new();
    if input.read_line(&mut line).context("reading stdin")? == 0 {
        return Ok(None);
    }
    Ok(Some(line.trim().to_string()))
}

fn pick_move(input: &mut impl BufRead, output: &mut impl Write, config: &Config) -> anyhow::Result<()> {
    let Some(fen) = read_line(input)? else {
        bail!("expected a FEN line on stdin");
    };
    let game = Game::from_fen(&fen)?;
    let result = mcts::find_best_move(game, config)?;
    info!(
        cycles = result.cycles_completed,
        nodes = result.nodes,
        exhausted = result.exhausted,
        "search finished"
    );
    let best_move = result
        .best_move
        .map_or_else(|| playout::NULL_MOVE.to_string(), |m| move_to_uci(&m));
    writeln!(output, "{best_move}")?;
    Ok(())
}

/// State of the board after a move, as reported by `validate`.
#[derive(Serialize, Debug)]
#[serde(rename_all = "camelCase")]
struct MoveReport {
    fen: String,
    is_capture: bool,
    in_check: bool,
    side_to_move: String,
    half_move_clock: u32,
    full_move_number: u32,
    /// Threefold repetition of the current position.
    is_repetition: bool,
    is_half_move_draw: bool,
    board_rendered: String,
    /// Result for the side to move, `NONE` while the game goes on.
    game_result: String,
    game_result_reason: String,
}

impl MoveReport {
    fn new(game: &Game, is_capture: bool) -> Self {
        use shakmaty::Position;

        let position = game.position();
        let termination = game.termination();
        Self {
            fen: game.fen(),
            is_capture,
            in_check: position.is_check(),
            side_to_move: game.to_move().to_string(),
            half_move_clock: position.halfmoves(),
            full_move_number: position.fullmoves().get(),
            is_repetition: game.is_repetition(),
            is_half_move_draw: game.is_half_move_draw(),
            board_rendered: game.render(),
            game_result: game
                .result(game.to_move())
                .map_or_else(|| "NONE".to_string(), |result| result.to_string()),
            game_result_reason: termination
                .map_or_else(|| "NONE".to_string(), |termination| termination.to_string()),
        }
    }
}

fn validate(input: &mut impl BufRead, output: &mut impl Write) -> anyhow::Result<()> {
    let Some(fen) = read_line(input)? else {
        bail!("expected a FEN line on stdin");
    };
    let mut game = Game::from_fen(&fen)?;
    while game.termination().is_none() {
        let Some(uci) = read_line(input)? else {
            break;
        };
        if uci.is_empty() {
            continue;
        }
        let next_move = game.parse_move(&uci)?;
        let is_capture = next_move.is_capture();
        game.apply(&next_move);
        serde_json::to_writer(&mut *output, &MoveReport::new(&game, is_capture))?;
        writeln!(output)?;
    }
    Ok(())
}

fn selfplay(
    fen: Option<&str>,
    max_plies: u32,
    output: &mut impl Write,
    config: &Config,
) -> anyhow::Result<()> {
    let mut game = fen.map_or_else(|| Ok(Game::starting()), Game::from_fen)?;
    let mut plies = 0;
    while game.termination().is_none() && plies < max_plies {
        let result = mcts::find_best_move(game.clone(), config)?;
        let Some(next_move) = result.best_move else {
            break;
        };
        writeln!(output, "{}", move_to_uci(&next_move))?;
        game.apply(&next_move);
        plies += 1;
    }
    match game.termination() {
        Some(termination) => {
            let score = match game.result(Player::White) {
                Some(GameResult::Win) => "1-0",
                Some(GameResult::Loss) => "0-1",
                _ => "1/2-1/2",
            };
            writeln!(output, "{score} {termination}")?;
        },
        None => writeln!(output, "* {}", game.fen())?,
    }
    Ok(())
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_tracing(&cli.log_level);

    let config = Config::default()
        .with_cycles(cli.cycles)
        .with_capacity(cli.capacity)
        .with_seed(cli.seed);
    config.validate()?;

    let mut input = io::stdin().lock();
    let mut output = io::stdout().lock();
    match cli.mode.unwrap_or(Mode::Uci) {
        Mode::Uci => {
            playout::print_engine_info();
            playout::print_binary_info();
            playout::Engine::new(config).uci_loop(&mut input, &mut output)
        },
        Mode::Move => pick_move(&mut input, &mut output, &config),
        Mode::Validate => validate(&mut input, &mut output),
        Mode::Selfplay { fen, max_plies } => selfplay(fen.as_deref(), max_plies, &mut output, &config),
        Mode::Bench => playout::bench(&mut output),
    }
}
