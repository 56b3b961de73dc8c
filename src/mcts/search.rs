use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use thiserror::Error;
use tracing::{debug, trace, warn};

use crate::environment::{Environment, Player};
use crate::mcts::policy::{most_rewarding_child, select_best_child};
use crate::mcts::rollout::rollout;
use crate::mcts::tree::{NodeIndex, PoolExhausted, Tree, ROOT};
use crate::mcts::Config;

/// Errors that abort the whole search.
#[derive(Clone, Copy, Debug, Error, PartialEq, Eq)]
pub enum SearchError {
    /// Not even the moves of the root position fit into the node pool.
    #[error("can not expand the root: {0}")]
    PoolExhausted(#[from] PoolExhausted),
}

/// Lifecycle of a [`Search`]. Transitions only go forward.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Phase {
    /// Nothing is allocated yet.
    Uninitialized,
    /// The root is expanded and each of its children has one sample.
    RootReady,
    /// At least one cycle has completed.
    Cycling,
    /// The move was picked, the tree can only be inspected.
    Decided,
}

/// Outcome of [`Search::run`].
#[derive(Clone, Debug, PartialEq)]
pub struct SearchResult<A> {
    /// Root action with the highest accumulated reward, `None` if the root
    /// has no legal actions.
    pub best_move: Option<A>,
    /// Number of cycles that ran after priming.
    pub cycles_completed: u32,
    /// Number of allocated tree nodes, including the root.
    pub nodes: usize,
    /// Number of random games played, including the priming ones.
    pub rollouts: u64,
    /// True if the node pool ran out and cycling stopped early.
    pub exhausted: bool,
}

/// Monte Carlo Tree Search over a single root position.
///
/// The tree is built from scratch and dropped together with the search: no
/// statistics survive between move decisions.
#[derive(Debug)]
pub struct Search<E: Environment> {
    root: E,
    /// Every reward in the tree is relative to this player.
    perspective: Player,
    tree: Tree<E::Action>,
    config: Config,
    rng: ChaCha8Rng,
    phase: Phase,
    cycles_completed: u32,
    rollouts: u64,
    plies: u64,
}

impl<E: Environment> Search<E> {
    /// Prepares the search without allocating any nodes.
    #[must_use]
    pub fn new(root: E, config: &Config) -> Self {
        let rng = match config.seed {
            Some(seed) => ChaCha8Rng::seed_from_u64(seed),
            None => ChaCha8Rng::from_entropy(),
        };
        Self {
            perspective: root.to_move(),
            root,
            tree: Tree::new(config.capacity),
            config: *config,
            rng,
            phase: Phase::Uninitialized,
            cycles_completed: 0,
            rollouts: 0,
            plies: 0,
        }
    }

    /// Current lifecycle stage.
    #[must_use]
    pub const fn phase(&self) -> Phase {
        self.phase
    }

    /// Search tree built so far.
    #[must_use]
    pub const fn tree(&self) -> &Tree<E::Action> {
        &self.tree
    }

    /// Number of cycles that ran after priming.
    #[must_use]
    pub const fn cycles_completed(&self) -> u32 {
        self.cycles_completed
    }

    /// Number of random games played so far, including priming.
    #[must_use]
    pub const fn rollouts(&self) -> u64 {
        self.rollouts
    }

    /// Allocates and expands the root, then samples every root move once.
    ///
    /// The root is expanded even if the position is already drawn by rule
    /// while having legal moves: the caller asked for a move.
    ///
    /// # Errors
    ///
    /// Fails if the root and its children do not fit into the pool. Nothing
    /// beyond the root is allocated in that case.
    ///
    /// # Panics
    ///
    /// Panics if the search was already primed.
    pub fn prime(&mut self) -> Result<(), SearchError> {
        assert_eq!(self.phase, Phase::Uninitialized, "search is already primed");
        let _ = self.tree.allocate_root()?;
        let root = self.root.clone();
        self.expand_and_simulate(ROOT, &root)?;
        self.phase = Phase::RootReady;
        trace!(
            children = self.tree.root().children().len(),
            "primed root"
        );
        Ok(())
    }

    /// Runs a single selection-expansion-simulation-backpropagation cycle.
    ///
    /// # Errors
    ///
    /// Fails if the selected leaf's children do not fit into the pool. The
    /// tree is unchanged in that case and the cycle is not counted.
    ///
    /// # Panics
    ///
    /// Panics if the search is not primed yet or the move was already picked.
    pub fn cycle(&mut self) -> Result<(), PoolExhausted> {
        assert!(
            matches!(self.phase, Phase::RootReady | Phase::Cycling),
            "can not run a cycle in {:?} phase",
            self.phase
        );
        let mut scratch = self.root.clone();
        let mut leaf = ROOT;
        let mut depth = 0;
        while !self.tree.get(leaf).is_leaf() {
            leaf = select_best_child(&self.tree, leaf, self.config.exploration);
            let action = self
                .tree
                .get(leaf)
                .action()
                .expect("every node except the root is reached by an action");
            scratch.apply(action);
            depth += 1;
        }
        match scratch.result(self.perspective) {
            // Terminal leaves are never expanded: the result is known exactly.
            Some(result) => self.tree.backpropagate(leaf, result.reward()),
            None => self.expand_and_simulate(leaf, &scratch)?,
        }
        self.cycles_completed += 1;
        self.phase = Phase::Cycling;
        trace!(
            cycle = self.cycles_completed,
            leaf,
            depth,
            nodes = self.tree.len(),
            "cycle completed"
        );
        Ok(())
    }

    /// Picks the root action with the highest accumulated reward.
    ///
    /// # Panics
    ///
    /// Panics if the search is not primed yet.
    pub fn decide(&mut self) -> Option<E::Action> {
        assert_ne!(self.phase, Phase::Uninitialized, "search is not primed");
        self.phase = Phase::Decided;
        most_rewarding_child(&self.tree, ROOT).and_then(|best| self.tree.get(best).action().cloned())
    }

    /// Primes the tree, runs the configured number of cycles and picks the
    /// move.
    ///
    /// Running out of nodes during cycling does not fail the search: it stops
    /// early and decides on the statistics gathered so far, which is reported
    /// through [`SearchResult::exhausted`].
    ///
    /// # Errors
    ///
    /// Fails only if priming fails.
    pub fn run(mut self) -> Result<SearchResult<E::Action>, SearchError> {
        self.prime()?;
        let mut exhausted = false;
        // Nothing to choose from: cycling would only revisit the root.
        if !self.tree.root().is_leaf() {
            for _ in 0..self.config.cycles {
                if let Err(error) = self.cycle() {
                    warn!(
                        %error,
                        cycles = self.cycles_completed,
                        requested = self.config.cycles,
                        "stopping the search early"
                    );
                    exhausted = true;
                    break;
                }
            }
        }
        let best_move = self.decide();
        debug!(
            cycles = self.cycles_completed,
            nodes = self.tree.len(),
            rollouts = self.rollouts,
            plies = self.plies,
            root_visits = self.tree.root().visits(),
            best_move = ?best_move,
            "search finished"
        );
        Ok(SearchResult {
            best_move,
            cycles_completed: self.cycles_completed,
            nodes: self.tree.len(),
            rollouts: self.rollouts,
            exhausted,
        })
    }

    /// Expands `leaf` and plays one random game from each new child.
    ///
    /// `scratch` is the state at `leaf`.
    fn expand_and_simulate(&mut self, leaf: NodeIndex, scratch: &E) -> Result<(), PoolExhausted> {
        self.tree.expand(leaf, scratch.actions())?;
        for (i, action) in scratch.actions().iter().enumerate() {
            let child = self.tree.get(leaf).children()[i];
            let mut env = scratch.clone();
            env.apply(action);
            let playout = rollout(env, self.perspective, &mut self.rng);
            self.rollouts += 1;
            self.plies += u64::from(playout.plies);
            self.tree.backpropagate(child, playout.result.reward());
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashSet;

    use pretty_assertions::assert_eq;

    use super::*;
    use crate::chess::{move_to_uci, Game};
    use crate::environment::GameResult;
    use crate::mcts::testing::Nim;

    fn root_children_visits<E: Environment>(search: &Search<E>) -> u32 {
        let tree = search.tree();
        tree.root()
            .children()
            .iter()
            .map(|&child| tree.get(child).visits())
            .sum()
    }

    #[test]
    fn phases() {
        let config = Config::default().with_seed(Some(1));
        let mut search = Search::new(Nim::new(5), &config);
        assert_eq!(search.phase(), Phase::Uninitialized);
        assert!(search.tree().is_empty());

        search.prime().expect("enough capacity");
        assert_eq!(search.phase(), Phase::RootReady);

        search.cycle().expect("enough capacity");
        assert_eq!(search.phase(), Phase::Cycling);
        assert_eq!(search.cycles_completed(), 1);

        assert!(search.decide().is_some());
        assert_eq!(search.phase(), Phase::Decided);
    }

    #[test]
    #[should_panic(expected = "Decided")]
    fn no_cycles_after_decision() {
        let config = Config::default().with_seed(Some(1));
        let mut search = Search::new(Nim::new(5), &config);
        search.prime().expect("enough capacity");
        let _ = search.decide();
        let _ = search.cycle();
    }

    #[test]
    fn priming_samples_each_root_move_once() {
        let config = Config::default().with_seed(Some(3));
        let mut search = Search::new(Game::starting(), &config);
        search.prime().expect("enough capacity");

        let tree = search.tree();
        let root = tree.root();
        assert_eq!(root.children().len(), 20);
        assert_eq!(tree.len(), 21);
        assert_eq!(search.rollouts(), 20);
        // Each child's walk increments the root once, never the child itself.
        assert_eq!(root.visits(), 20);
        let mut total = 0.0;
        for &child in root.children() {
            let node = tree.get(child);
            assert_eq!(node.visits(), 0);
            assert!(node.is_leaf());
            assert!([-1.0_f32, 0.0, 1.0]
                .iter()
                .any(|reward| (node.reward() - reward).abs() < 1e-6));
            total += node.reward();
        }
        assert!((root.reward() - total).abs() < 1e-6);
    }

    #[test]
    fn root_visits_track_cycles() {
        let config = Config::default().with_seed(Some(11));
        let mut search = Search::new(Nim::new(12), &config);
        search.prime().expect("enough capacity");
        let children = search.tree().root().children().len();
        assert_eq!(root_children_visits(&search), 0);

        let mut previous = 0;
        for _ in 0..40 {
            search.cycle().expect("enough capacity");
            let visits = root_children_visits(&search);
            assert!(visits >= previous);
            assert_eq!(
                visits as usize,
                search.tree().root().visits() as usize - children
            );
            previous = visits;
        }
        assert!(previous > 0);
    }

    #[test]
    fn exact_number_of_cycles() {
        let config = Config::default().with_cycles(25).with_seed(Some(5));
        let result = find(Nim::new(30), &config);
        assert_eq!(result.cycles_completed, 25);
        assert!(!result.exhausted);
        // 2 priming rollouts and at most 2 per cycle.
        assert!(result.rollouts >= 2);
        assert!(result.rollouts <= 2 + 2 * 25);

        let config = config.with_cycles(0);
        let result = find(Nim::new(30), &config);
        assert_eq!(result.cycles_completed, 0);
        assert_eq!(result.nodes, 3);
        assert_eq!(result.rollouts, 2);
    }

    fn find<E: Environment>(root: E, config: &Config) -> SearchResult<E::Action> {
        Search::new(root, config).run().expect("enough capacity")
    }

    #[test]
    fn no_legal_moves() {
        let result = find(Nim::new(0), &Config::default());
        assert_eq!(
            result,
            SearchResult {
                best_move: None,
                cycles_completed: 0,
                nodes: 1,
                rollouts: 0,
                exhausted: false,
            }
        );

        let mut mated = Game::from_fen("7k/8/6K1/8/8/8/8/4Q3 w - - 0 1").expect("valid position");
        let _ = mated.play_uci("e1e8").expect("legal move");
        assert!(find(mated, &Config::default()).best_move.is_none());
    }

    #[test]
    fn immediate_win() {
        // Taking both stones wins, taking one loses.
        for seed in 0..8 {
            let config = Config::default().with_cycles(30).with_seed(Some(seed));
            assert_eq!(find(Nim::new(2), &config).best_move, Some(2));
        }
        assert_eq!(find(Nim::new(1), &Config::default()).best_move, Some(1));
    }

    #[test]
    fn terminal_leaf_backpropagates_its_result() {
        let config = Config::default().with_seed(Some(4));
        let mut search = Search::new(Nim::new(2), &config);
        search.prime().expect("enough capacity");
        let take_two = search.tree().root().children()[1];
        assert_eq!(search.tree().get(take_two).action(), Some(&2));
        assert_eq!(search.tree().len(), 3);
        assert_eq!(search.rollouts(), 2);

        for cycle in 1..=10_u16 {
            search.cycle().expect("nothing to allocate");
            let tree = search.tree();
            // The winning move is selected every time and is neither expanded
            // nor simulated.
            assert_eq!(tree.len(), 3);
            assert_eq!(search.rollouts(), 2);
            assert!(tree.get(take_two).is_leaf());
            assert_eq!(tree.root().visits(), 2 + u32::from(cycle));
            let expected = GameResult::Win.reward() * f32::from(1 + cycle);
            assert!((tree.get(take_two).reward() - expected).abs() < 1e-6);
        }
    }

    #[test]
    fn exhausted_cycle_leaves_tree_untouched() {
        // Room for the root, its two children and one more node: expanding
        // any child needs two.
        let config = Config::default().with_capacity(4).with_seed(Some(6));
        let mut search = Search::new(Nim::new(40), &config);
        search.prime().expect("enough capacity");
        let nodes = search.tree().len();
        let root_visits = search.tree().root().visits();
        let root_reward = search.tree().root().reward();
        assert_eq!(nodes, 3);

        assert_eq!(search.cycle(), Err(PoolExhausted { capacity: 4 }));
        assert_eq!(search.tree().len(), nodes);
        assert_eq!(search.cycles_completed(), 0);
        assert_eq!(search.rollouts(), 2);
        assert_eq!(search.phase(), Phase::RootReady);
        assert_eq!(search.tree().root().visits(), root_visits);
        assert!((search.tree().root().reward() - root_reward).abs() < 1e-6);
        for &child in search.tree().root().children() {
            assert!(search.tree().get(child).is_leaf());
        }
    }

    #[test]
    fn pool_exhaustion_stops_cycling() {
        let config = Config::default()
            .with_cycles(1_000)
            .with_capacity(20)
            .with_seed(Some(9));
        let result = find(Nim::new(40), &config);
        assert!(result.exhausted);
        assert!(result.cycles_completed < 1_000);
        assert!(result.nodes <= 20);
        assert!(result.best_move.is_some());
    }

    #[test]
    fn pool_exhaustion_during_priming() {
        let config = Config::default().with_capacity(2).with_seed(Some(0));
        let mut search = Search::new(Nim::new(10), &config);
        assert_eq!(
            search.prime(),
            Err(SearchError::PoolExhausted(PoolExhausted { capacity: 2 }))
        );
        // Only the root was allocated.
        assert_eq!(search.tree().len(), 1);
        assert!(search.tree().root().is_leaf());

        let config = config.with_capacity(20);
        assert!(Search::new(Game::starting(), &config).run().is_err());
    }

    #[test]
    fn deterministic_with_seed() {
        let config = Config::default().with_cycles(60).with_seed(Some(2024));
        let first = find(Nim::new(17), &config);
        let second = find(Nim::new(17), &config);
        assert_eq!(first, second);
    }

    #[test]
    fn mate_in_one_dominates_selection() {
        let game = Game::from_fen("7k/8/6K1/8/8/8/8/4Q3 w - - 0 1").expect("valid position");
        let legal: HashSet<String> = game.actions().iter().map(move_to_uci).collect();
        let config = Config::default().with_cycles(50).with_seed(Some(17));
        let mut search = Search::new(game, &config);
        search.prime().expect("enough capacity");
        // The mating move is sampled with a win right away.
        let tree = search.tree();
        let mate = tree
            .root()
            .children()
            .iter()
            .copied()
            .find(|&child| tree.get(child).action().map(move_to_uci).as_deref() == Some("e1e8"))
            .expect("mating move is legal");
        assert!((tree.get(mate).reward() - GameResult::Win.reward()).abs() < 1e-6);

        for _ in 0..50 {
            search.cycle().expect("enough capacity");
        }
        let best = search.decide().expect("root has moves");
        assert!(legal.contains(&move_to_uci(&best)));
        assert_eq!(move_to_uci(&best), "e1e8");
    }
}
