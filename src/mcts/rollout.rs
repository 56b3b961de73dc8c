//! Default policy: uniformly random play until the game is over.

use rand::seq::SliceRandom;
use rand::Rng;

use crate::environment::{Environment, GameResult, Player};

/// Outcome of a single random game.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Playout {
    /// Result relative to the player to move at the search root.
    pub result: GameResult,
    /// Number of moves played before the game ended.
    pub plies: u32,
}

/// Plays random legal moves from `env` until it reports a result.
///
/// Termination relies on the environment: chess draws by the fifty-move rule
/// and threefold repetition are terminal, so every random game is finite.
///
/// # Panics
///
/// Panics if the environment has no legal actions but does not report a
/// result.
pub fn rollout<E, R>(mut env: E, perspective: Player, rng: &mut R) -> Playout
where
    E: Environment,
    R: Rng + ?Sized,
{
    let mut plies = 0;
    loop {
        if let Some(result) = env.result(perspective) {
            return Playout { result, plies };
        }
        let action = env
            .actions()
            .choose(rng)
            .expect("non-terminal position must have legal actions")
            .clone();
        env.apply(&action);
        plies += 1;
    }
}
