//! Implementation of chess environment, its rules and specifics.
//!
//! Move generation and notation are provided by [`shakmaty`]; this module
//! adds the draw rules that depend on the game history and exposes the game
//! through [`crate::environment::Environment`].

mod game;
pub mod repetition;

pub use game::{move_to_uci, Game, Termination};
