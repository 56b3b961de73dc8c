//! Tiny environment with a known solution for exercising the search without
//! chess rules.

use crate::environment::{Environment, GameResult, Player};

/// Single-heap Nim: players alternate taking one or two stones, the player
/// who takes the last stone wins. Positions with a multiple of three stones
/// are lost for the player to move.
#[derive(Clone, Debug)]
pub(crate) struct Nim {
    stones: u8,
    to_move: Player,
}

impl Nim {
    pub(crate) const fn new(stones: u8) -> Self {
        Self {
            stones,
            to_move: Player::White,
        }
    }

    pub(crate) const fn stones(&self) -> u8 {
        self.stones
    }
}

impl Environment for Nim {
    type Action = u8;

    fn actions(&self) -> &[u8] {
        match self.stones {
            0 => &[],
            1 => &[1],
            _ => &[1, 2],
        }
    }

    fn apply(&mut self, action: &u8) {
        self.stones -= action;
        self.to_move = !self.to_move;
    }

    fn result(&self, perspective: Player) -> Option<GameResult> {
        (self.stones == 0).then(|| GameResult::lost_by(self.to_move, perspective))
    }

    fn to_move(&self) -> Player {
        self.to_move
    }
}
