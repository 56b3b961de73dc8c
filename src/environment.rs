//! Interface for the game environment that abstracts the rules implementation
//! away from the search.
//!
//! The search only ever talks to the rules through [`Environment`]: it needs
//! the legal actions, a way to apply one of them, a terminal-state check and
//! the side to move. Everything else (parsing, notation, rendering) lives with
//! the concrete environment, e.g. [`crate::chess::Game`].

use std::fmt;
use std::ops::Not;

use shakmaty::Color;

/// A standard game of chess is played between two players: White (having the
/// advantage of the first turn) and Black.
#[allow(missing_docs)]
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Player {
    White,
    Black,
}

impl Not for Player {
    type Output = Self;

    fn not(self) -> Self::Output {
        match self {
            Self::White => Self::Black,
            Self::Black => Self::White,
        }
    }
}

impl From<Color> for Player {
    fn from(color: Color) -> Self {
        match color {
            Color::White => Self::White,
            Color::Black => Self::Black,
        }
    }
}

impl fmt::Display for Player {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}",
            match &self {
                Self::White => "WHITE",
                Self::Black => "BLACK",
            }
        )
    }
}

/// Result of the game from the perspective of the player to move at root.
#[allow(missing_docs)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GameResult {
    Win,
    Draw,
    Loss,
}

impl GameResult {
    /// Scalar value credited to the tree when a simulation ends with this
    /// result.
    #[must_use]
    pub const fn reward(self) -> f32 {
        match self {
            Self::Win => 1.0,
            Self::Draw => 0.0,
            Self::Loss => -1.0,
        }
    }

    /// Result of the game lost by `loser`, seen by `perspective`.
    #[must_use]
    pub fn lost_by(loser: Player, perspective: Player) -> Self {
        if loser == perspective {
            Self::Loss
        } else {
            Self::Win
        }
    }
}

impl fmt::Display for GameResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}",
            match &self {
                Self::Win => "WIN",
                Self::Draw => "DRAW",
                Self::Loss => "LOSE",
            }
        )
    }
}

/// Game rules as seen by the search.
///
/// Implementations must report a result whenever there are no legal actions
/// left: [`Environment::actions`] being empty while [`Environment::result`] is
/// `None` is a contract violation and the search will panic on it.
pub trait Environment: Clone {
    /// A move in the game.
    type Action: Clone + fmt::Debug;

    /// Legal actions in the current state, in a deterministic order.
    fn actions(&self) -> &[Self::Action];

    /// Advances the state by applying a legal action.
    fn apply(&mut self, action: &Self::Action);

    /// Returns the result if the game is over, relative to `perspective`.
    fn result(&self, perspective: Player) -> Option<GameResult>;

    /// The player whose turn it is.
    fn to_move(&self) -> Player;
}
