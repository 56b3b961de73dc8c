//! The engine puts all pieces together. It implements the [Universal Chess
//! Interface] (UCI) for communication with the client (e.g. tournament runner
//! with other engines or GUI).
//!
//! [`Engine::uci_loop`] is the "main loop" of the engine which communicates
//! with the environment and executes commands from the input stream.
//!
//! [Universal Chess Interface]: https://www.chessprogramming.org/UCI

use std::io::{BufRead, Write};

use anyhow::Context;
use tracing::{debug, info, warn};

use crate::chess::{move_to_uci, Game};
use crate::engine::uci::{Command, EngineOption, OptionValue};
use crate::mcts::{self, Config};

mod openbench;
mod uci;

pub use openbench::bench;

/// UCI null move, sent when the position has no legal moves.
pub const NULL_MOVE: &str = "0000";

/// The Engine connects everything together and handles commands sent by the
/// UCI server, including I/O.
///
/// Searches are synchronous: every `go` blocks the loop until `bestmove` is
/// written, so `stop` has nothing to interrupt.
#[derive(Debug)]
pub struct Engine {
    game: Game,
    config: Config,
    debug: bool,
}

impl Default for Engine {
    fn default() -> Self {
        Self::new(Config::default())
    }
}

impl Engine {
    /// Creates a new instance of the engine with starting position and search
    /// parameters that can be changed later with `setoption`.
    #[must_use]
    pub fn new(config: Config) -> Self {
        Self {
            game: Game::starting(),
            config,
            debug: false,
        }
    }

    /// Continuously reads the input stream and executes sent UCI commands until
    /// "quit" is sent or the input is closed.
    ///
    /// The implementation here does not aim to be complete and exhaustive: the
    /// engine has no clock management and `nodes` is the only supported search
    /// limit. Malformed commands are reported with `info string` and skipped.
    ///
    /// # Errors
    ///
    /// Returns an error if reading the input or writing the output fails.
    pub fn uci_loop(
        &mut self,
        input: &mut impl BufRead,
        output: &mut impl Write,
    ) -> anyhow::Result<()> {
        loop {
            let mut line = String::new();
            if input
                .read_line(&mut line)
                .context("reading UCI command")?
                == 0
            {
                // EOF reached.
                break;
            }
            debug!(command = line.trim(), "received");

            match Command::parse(&line) {
                Command::Uci => self.handle_uci(output)?,
                Command::Debug { on } => self.debug = on,
                Command::IsReady => writeln!(output, "readyok")?,
                Command::SetOption { option, value } => {
                    self.handle_setoption(option, value, output)?;
                },
                Command::SetPosition { fen, moves } => {
                    self.handle_position(fen.as_deref(), &moves, output)?;
                },
                Command::NewGame => self.game = Game::starting(),
                Command::Go { nodes } => self.handle_go(nodes, output)?,
                Command::Stop => {},
                Command::Quit => break,
                Command::Display => writeln!(output, "{}", self.game.fen())?,
                Command::Unknown(command) => {
                    if !command.is_empty() {
                        writeln!(output, "info string Unsupported command: {command}")?;
                    }
                },
            }
            output.flush()?;
        }
        Ok(())
    }

    /// Responds to the `uci` handshake command by identifying the engine and
    /// listing the options.
    fn handle_uci(&self, output: &mut impl Write) -> anyhow::Result<()> {
        writeln!(
            output,
            "id name {} {}",
            env!("CARGO_PKG_NAME"),
            crate::engine_version()
        )?;
        writeln!(output, "id author {}", env!("CARGO_PKG_AUTHORS"))?;
        writeln!(
            output,
            "option name Cycles type spin default {} min 0 max {}",
            self.config.cycles,
            u32::MAX
        )?;
        writeln!(
            output,
            "option name Capacity type spin default {} min 1 max {}",
            self.config.capacity,
            usize::MAX
        )?;
        writeln!(output, "option name Seed type string default random")?;
        writeln!(output, "uciok")?;
        Ok(())
    }

    fn handle_setoption(
        &mut self,
        option: EngineOption,
        value: OptionValue,
        output: &mut impl Write,
    ) -> anyhow::Result<()> {
        let config = match (option, value) {
            (EngineOption::Cycles, OptionValue::Integer(cycles)) => match u32::try_from(cycles) {
                Ok(cycles) => self.config.with_cycles(cycles),
                Err(_) => {
                    writeln!(output, "info string Cycles value {cycles} is too large")?;
                    return Ok(());
                },
            },
            (EngineOption::Capacity, OptionValue::Integer(capacity)) => {
                match usize::try_from(capacity) {
                    Ok(capacity) => self.config.with_capacity(capacity),
                    Err(_) => {
                        writeln!(output, "info string Capacity value {capacity} is too large")?;
                        return Ok(());
                    },
                }
            },
            (EngineOption::Seed, OptionValue::Integer(seed)) => self.config.with_seed(Some(seed)),
            (EngineOption::Seed, OptionValue::String(value)) if value == "random" => {
                self.config.with_seed(None)
            },
            (option, value) => {
                writeln!(output, "info string Invalid value for {option:?}: {value:?}")?;
                return Ok(());
            },
        };
        if let Err(e) = config.validate() {
            writeln!(output, "info string {e}")?;
            return Ok(());
        }
        info!(?config, "search parameters changed");
        self.config = config;
        Ok(())
    }

    /// Changes the position of the board to the one specified in the command.
    ///
    /// An invalid position keeps the previous one. Moves are applied until the
    /// first illegal one.
    fn handle_position(
        &mut self,
        fen: Option<&str>,
        moves: &[String],
        output: &mut impl Write,
    ) -> anyhow::Result<()> {
        self.game = match fen {
            None => Game::starting(),
            Some(fen) => match Game::from_fen(fen) {
                Ok(game) => game,
                Err(e) => {
                    writeln!(output, "info string {e:#}")?;
                    return Ok(());
                },
            },
        };
        for next_move in moves {
            if let Err(e) = self.game.play_uci(next_move) {
                writeln!(output, "info string Unexpected UCI move: {e:#}")?;
                break;
            }
        }
        Ok(())
    }

    /// Searches the current position and answers with `bestmove`.
    fn handle_go(&self, nodes: Option<u32>, output: &mut impl Write) -> anyhow::Result<()> {
        let config = nodes.map_or(self.config, |cycles| self.config.with_cycles(cycles));
        let best_move = match mcts::find_best_move(self.game.clone(), &config) {
            Ok(result) => {
                if self.debug {
                    writeln!(
                        output,
                        "info nodes {} string cycles {} rollouts {}",
                        result.nodes, result.cycles_completed, result.rollouts
                    )?;
                }
                if result.exhausted {
                    writeln!(
                        output,
                        "info string node pool exhausted after {} cycles",
                        result.cycles_completed
                    )?;
                }
                result.best_move
            },
            Err(e) => {
                warn!(%e, fen = %self.game.fen(), "search failed");
                writeln!(output, "info string {e}")?;
                None
            },
        };
        let best_move = best_move.map_or_else(|| NULL_MOVE.to_string(), |m| move_to_uci(&m));
        writeln!(output, "bestmove {best_move}")?;
        Ok(())
    }
}
