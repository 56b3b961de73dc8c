use std::fmt;

use anyhow::Context;
use shakmaty::fen::Fen;
use shakmaty::uci::UciMove;
use shakmaty::{CastlingMode, Chess, EnPassantMode, Move, MoveList, Position};

use crate::chess::repetition::{self, RepetitionTable};
use crate::environment::{Environment, GameResult, Player};

/// The fifty-move rule expires after 100 consecutive half-moves without a
/// capture or a pawn move.
const HALFMOVE_CLOCK_LIMIT: u32 = 100;

/// Reason the game is over.
#[allow(missing_docs)]
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Termination {
    Checkmate,
    Stalemate,
    InsufficientMaterial,
    FiftyMoveRule,
    ThreefoldRepetition,
}

impl Termination {
    /// Checkmate is the only decisive termination, everything else is a draw.
    #[must_use]
    pub const fn is_decisive(self) -> bool {
        matches!(self, Self::Checkmate)
    }
}

impl fmt::Display for Termination {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}",
            match &self {
                Self::Checkmate => "CHECKMATE",
                Self::Stalemate => "STALEMATE",
                Self::InsufficientMaterial => "INSUFFICIENT_MATERIAL",
                Self::FiftyMoveRule => "FIFTY_MOVE_RULE",
                Self::ThreefoldRepetition => "THREEFOLD_REPETITION",
            }
        )
    }
}

/// Chess position together with the history needed to adjudicate draws.
///
/// `shakmaty` knows about checkmate, stalemate and insufficient material; the
/// fifty-move rule and threefold repetition depend on the game history and are
/// tracked here. Legal moves are generated once per applied move and cached.
#[derive(Clone, Debug)]
pub struct Game {
    position: Chess,
    repetitions: RepetitionTable,
    moves: MoveList,
    threefold_repetition: bool,
}

impl Game {
    /// Starts tracking the game from `position`.
    #[must_use]
    pub fn new(position: Chess) -> Self {
        let mut repetitions = RepetitionTable::new();
        let _ = repetitions.record(repetition::key(&position));
        let moves = position.legal_moves();

        Self {
            position,
            repetitions,
            moves,
            threefold_repetition: false,
        }
    }

    /// Standard starting position.
    #[must_use]
    pub fn starting() -> Self {
        Self::new(Chess::default())
    }

    /// Parses a position in [Forsyth-Edwards Notation] and checks that it is
    /// legal.
    ///
    /// [Forsyth-Edwards Notation]: https://www.chessprogramming.org/Forsyth-Edwards_Notation
    ///
    /// # Errors
    ///
    /// Returns an error if the input is not a valid FEN or the position is
    /// not reachable under the standard rules (e.g. missing kings, side not to
    /// move is in check).
    pub fn from_fen(input: &str) -> anyhow::Result<Self> {
        let input = input.trim();
        let fen: Fen = input
            .parse()
            .with_context(|| format!("malformed FEN: '{input}'"))?;
        let position: Chess = fen
            .into_position(CastlingMode::Standard)
            .with_context(|| format!("illegal position: '{input}'"))?;
        Ok(Self::new(position))
    }

    /// Underlying board state.
    #[must_use]
    pub const fn position(&self) -> &Chess {
        &self.position
    }

    /// Serializes the position to FEN.
    #[must_use]
    pub fn fen(&self) -> String {
        Fen::from_position(&self.position, EnPassantMode::Legal).to_string()
    }

    /// Resolves a move in UCI notation against the current position.
    ///
    /// # Errors
    ///
    /// Returns an error if the move is malformed or illegal.
    pub fn parse_move(&self, uci: &str) -> anyhow::Result<Move> {
        let parsed: UciMove = uci
            .trim()
            .parse()
            .with_context(|| format!("malformed UCI move: '{uci}'"))?;
        parsed
            .to_move(&self.position)
            .with_context(|| format!("illegal move '{uci}' in {}", self.fen()))
    }

    /// Parses and applies a move in UCI notation.
    ///
    /// # Errors
    ///
    /// Returns an error if the move is malformed or illegal, the game is left
    /// unchanged in that case.
    pub fn play_uci(&mut self, uci: &str) -> anyhow::Result<Move> {
        let m = self.parse_move(uci)?;
        self.apply(&m);
        Ok(m)
    }

    /// Returns true if the current position has occurred at least three
    /// times since the last irreversible move.
    #[must_use]
    pub fn is_repetition(&self) -> bool {
        self.repetitions.count(repetition::key(&self.position)) >= 3
    }

    /// Returns true once the halfmove clock reached the fifty-move limit.
    #[must_use]
    pub fn is_half_move_draw(&self) -> bool {
        self.position.halfmoves() >= HALFMOVE_CLOCK_LIMIT
    }

    /// Draws the board as eight rows of pieces, white at the bottom. Empty
    /// squares are dots.
    #[must_use]
    pub fn render(&self) -> String {
        format!("{:?}", self.position.board())
    }

    /// Classifies the position, `None` if the game goes on.
    #[must_use]
    pub fn termination(&self) -> Option<Termination> {
        if self.is_half_move_draw() {
            // Checkmate delivered on the last move before the clock expires
            // still counts.
            if self.moves.is_empty() && self.position.is_check() {
                return Some(Termination::Checkmate);
            }
            return Some(Termination::FiftyMoveRule);
        }
        if self.position.is_insufficient_material() {
            return Some(Termination::InsufficientMaterial);
        }
        if self.threefold_repetition {
            return Some(Termination::ThreefoldRepetition);
        }
        if self.moves.is_empty() {
            if self.position.is_check() {
                return Some(Termination::Checkmate);
            }
            return Some(Termination::Stalemate);
        }
        None
    }
}

impl Default for Game {
    fn default() -> Self {
        Self::starting()
    }
}

impl Environment for Game {
    type Action = Move;

    fn actions(&self) -> &[Move] {
        &self.moves
    }

    fn apply(&mut self, action: &Move) {
        self.position.play_unchecked(*action);
        // Positions before a capture or a pawn move can not be repeated.
        if self.position.halfmoves() == 0 {
            self.repetitions.clear();
        }
        self.threefold_repetition = self
            .repetitions
            .record(repetition::key(&self.position));
        self.moves = self.position.legal_moves();
    }

    fn result(&self, perspective: Player) -> Option<GameResult> {
        self.termination().map(|termination| {
            if termination.is_decisive() {
                // Player to move is in checkmate.
                GameResult::lost_by(self.to_move(), perspective)
            } else {
                GameResult::Draw
            }
        })
    }

    fn to_move(&self) -> Player {
        self.position.turn().into()
    }
}

/// Serializes the move in [UCI format].
///
/// [UCI format]: https://www.chessprogramming.org/UCI
#[must_use]
pub fn move_to_uci(m: &Move) -> String {
    m.to_uci(CastlingMode::Standard).to_string()
}

#[cfg(test)]
mod tests {
    use itertools::Itertools;
    use pretty_assertions::assert_eq;

    use super::*;

    #[test]
    fn starting_position() {
        let game = Game::starting();
        assert_eq!(game.actions().len(), 20);
        assert_eq!(game.to_move(), Player::White);
        assert!(game.termination().is_none());
        assert_eq!(
            game.fen(),
            "rnbqkbnr/pppppppp/8/8/8/8/PPPPPPPP/RNBQKBNR w KQkq - 0 1"
        );
        assert_eq!(
            game.render(),
            "r n b q k b n r\n\
             p p p p p p p p\n\
             . . . . . . . .\n\
             . . . . . . . .\n\
             . . . . . . . .\n\
             . . . . . . . .\n\
             P P P P P P P P\n\
             R N B Q K B N R\n"
        );
    }

    #[test]
    fn malformed_input() {
        assert!(Game::from_fen("").is_err());
        assert!(Game::from_fen("not a position").is_err());
        // No white king.
        assert!(Game::from_fen("3k4/8/8/8/8/8/8/8 w - - 0 1").is_err());
        // Side not to move is in check.
        assert!(Game::from_fen("4k3/8/8/8/8/8/4R3/4K3 b - - 0 1").is_ok());
        assert!(Game::from_fen("4k3/8/8/8/8/8/4R3/4K3 w - - 0 1").is_err());
    }

    #[test]
    fn uci_moves() {
        let mut game = Game::starting();
        assert!(game.parse_move("e2e5").is_err());
        assert!(game.parse_move("garbage").is_err());
        let m = game.play_uci("e2e4").expect("legal move");
        assert_eq!(move_to_uci(&m), "e2e4");
        assert_eq!(game.to_move(), Player::Black);
        assert_eq!(
            game.actions().iter().map(move_to_uci).sorted().collect_vec(),
            Game::from_fen("rnbqkbnr/pppppppp/8/8/4P3/8/PPPP1PPP/RNBQKBNR b KQkq - 0 1")
                .expect("valid position")
                .actions()
                .iter()
                .map(move_to_uci)
                .sorted()
                .collect_vec()
        );
    }

    #[test]
    fn castling_notation() {
        let game = Game::from_fen("r3k2r/8/8/8/8/8/8/R3K2R w KQkq - 0 1").expect("valid position");
        let moves = game.actions().iter().map(move_to_uci).collect_vec();
        assert!(moves.contains(&"e1g1".to_string()));
        assert!(moves.contains(&"e1c1".to_string()));
    }

    #[test]
    fn detect_repetition() {
        let mut game = Game::starting();
        assert!(game.result(Player::White).is_none());
        for _ in 0..2 {
            for m in ["g1f3", "g8f6", "f3g1"] {
                let _ = game.play_uci(m).expect("legal move");
                assert!(game.result(Player::White).is_none());
            }
            let _ = game.play_uci("f6g8").expect("legal move");
        }
        // Third occurrence of the starting position.
        assert!(game.is_repetition());
        assert_eq!(
            game.termination(),
            Some(Termination::ThreefoldRepetition)
        );
        assert_eq!(game.result(Player::White), Some(GameResult::Draw));
    }

    #[test]
    fn irreversible_move_resets_repetitions() {
        let mut game = Game::starting();
        for m in ["g1f3", "g8f6", "f3g1", "f6g8"] {
            let _ = game.play_uci(m).expect("legal move");
        }
        // Second occurrence is not a repetition yet.
        assert!(!game.is_repetition());
        for m in ["g1f3", "g8f6", "f3g1", "f6g8"] {
            let _ = game.play_uci(m).expect("legal move");
        }
        assert!(game.is_repetition());
        let _ = game.play_uci("e2e4").expect("legal move");
        assert!(!game.is_repetition());
    }

    #[test]
    fn stalemate() {
        let mut game = Game::from_fen("7k/4Q3/6K1/8/8/8/8/8 w - - 0 1").expect("valid position");
        assert!(game.result(Player::White).is_none());

        // Black has no moves and is not in check.
        let _ = game.play_uci("e7f7").expect("legal move");
        assert!(game.actions().is_empty());
        assert_eq!(game.termination(), Some(Termination::Stalemate));
        assert_eq!(game.result(Player::White), Some(GameResult::Draw));
    }

    #[test]
    fn checkmate() {
        let mut game = Game::from_fen("7k/8/6K1/8/8/8/8/4Q3 w - - 0 1").expect("valid position");
        assert!(game.result(Player::White).is_none());

        let _ = game.play_uci("e1e8").expect("legal move");
        assert!(game.actions().is_empty());
        assert_eq!(game.termination(), Some(Termination::Checkmate));
        // Black is to move, but the result is relative to the given side.
        assert_eq!(game.to_move(), Player::Black);
        assert_eq!(game.result(Player::White), Some(GameResult::Win));
        assert_eq!(game.result(Player::Black), Some(GameResult::Loss));
    }

    #[test]
    fn insufficient_material() {
        let mut game = Game::from_fen("8/8/4k3/8/3q4/4K3/8/8 w - - 0 1").expect("valid position");
        assert!(game.termination().is_none());
        let _ = game.play_uci("e3d4").expect("legal move");
        assert_eq!(game.termination(), Some(Termination::InsufficientMaterial));
    }

    #[test]
    fn fifty_move_rule() {
        // All legal moves are just moving the kings back and forth, the
        // halfmove clock expires on the next turn.
        let mut game = Game::from_fen("8/5k2/3p4/1p1Pp2p/pP2Pp1P/P4P1K/8/8 b - - 99 50")
            .expect("valid position");
        assert!(game.result(Player::Black).is_none());
        assert!(!game.is_half_move_draw());

        let _ = game.play_uci("f7f6").expect("legal move");
        assert!(game.is_half_move_draw());
        assert_eq!(game.termination(), Some(Termination::FiftyMoveRule));
        assert_eq!(game.result(Player::Black), Some(GameResult::Draw));
    }
}
