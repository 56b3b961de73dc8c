//! Implements [Monte Carlo Tree Search] (MCTS) with random playouts.
//!
//! [Monte Carlo Tree Search]: https://en.wikipedia.org/wiki/Monte_Carlo_tree_search
//!
//! Every search builds a fresh tree in a fixed-capacity arena ([`Tree`]) and
//! repeats the same cycle:
//!
//! 1. Selection: Start from root node and descend through the child with the
//!    highest [UCT] score until a leaf is reached.
//! 2. Expansion: Add a child node for every legal move of the leaf.
//! 3. Simulation: Play uniformly random moves from each new child until the
//!    game ends ([`rollout()`]).
//! 4. Backpropagation: Credit the result to the nodes on the path from the
//!    child to the root.
//!
//! Nothing is evaluated statically: the only signal is the result of random
//! games, always measured from the perspective of the player to move at the
//! root.
//!
//! [UCT]: https://www.chessprogramming.org/UCT

use anyhow::ensure;

mod policy;
mod rollout;
mod search;
mod tree;

#[cfg(test)]
pub(crate) mod testing;

pub use policy::{most_rewarding_child, select_best_child, uct_score, EPSILON};
pub use rollout::{rollout, Playout};
pub use search::{Phase, Search, SearchError, SearchResult};
pub use tree::{Node, NodeIndex, PoolExhausted, Tree, ROOT};

use crate::environment::Environment;

/// Parameters of a single search, fixed for the lifetime of [`Search`].
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Config {
    /// Number of selection-expansion-simulation-backpropagation cycles to run
    /// after the root children were sampled once.
    pub cycles: u32,
    /// Maximum number of nodes in the tree, including the root.
    pub capacity: usize,
    /// Exploration constant ($C$ in the UCT formula).
    pub exploration: f32,
    /// Seed of the random number generator used by the rollouts. Searches
    /// with the same seed, position and parameters pick the same move.
    pub seed: Option<u64>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            cycles: 100,
            capacity: 10_000,
            exploration: std::f32::consts::SQRT_2,
            seed: None,
        }
    }
}

impl Config {
    /// Builder pattern: set number of cycles.
    #[must_use]
    pub const fn with_cycles(mut self, cycles: u32) -> Self {
        self.cycles = cycles;
        self
    }

    /// Builder pattern: set node pool capacity.
    #[must_use]
    pub const fn with_capacity(mut self, capacity: usize) -> Self {
        self.capacity = capacity;
        self
    }

    /// Builder pattern: set exploration constant.
    #[must_use]
    pub const fn with_exploration(mut self, exploration: f32) -> Self {
        self.exploration = exploration;
        self
    }

    /// Builder pattern: set rollout seed.
    #[must_use]
    pub const fn with_seed(mut self, seed: Option<u64>) -> Self {
        self.seed = seed;
        self
    }

    /// Checks that the search can be constructed with these parameters.
    ///
    /// # Errors
    ///
    /// Returns an error if the pool can not hold the root or the exploration
    /// constant is negative or not finite.
    pub fn validate(&self) -> anyhow::Result<()> {
        ensure!(self.capacity > 0, "node pool capacity must be positive");
        ensure!(
            self.exploration.is_finite() && self.exploration >= 0.0,
            "exploration constant must be a non-negative number, got {}",
            self.exploration
        );
        Ok(())
    }
}

/// Runs the search algorithm to find the best move in the `root` position.
///
/// # Errors
///
/// Fails only if the root's children do not fit into the node pool.
pub fn find_best_move<E: Environment>(
    root: E,
    config: &Config,
) -> Result<SearchResult<E::Action>, SearchError> {
    Search::new(root, config).run()
}
