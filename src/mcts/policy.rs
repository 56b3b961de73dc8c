//! Tree policy: which child to descend into and which move to play in the end.

use crate::mcts::tree::{Node, NodeIndex, Tree};

/// Smoothing term added to visit counts so that unvisited nodes get a finite
/// (and very large) score instead of a division by zero.
pub const EPSILON: f64 = 1e-4;

/// Upper Confidence bound applied to Trees:
///
/// $$\frac{R}{N + \varepsilon} + C \sqrt{\frac{\ln(N_p + \varepsilon)}{N + \varepsilon}}$$
///
/// where $R$ is the accumulated reward, $N$ and $N_p$ are the visit counts of
/// the node and its parent.
///
/// The logarithm is clamped at zero: for $N_p = 0$ it would be negative and
/// the square root would return NaN, which loses every comparison.
#[must_use]
pub fn uct_score<A>(node: &Node<A>, parent_visits: u32, exploration: f32) -> f64 {
    let visits = f64::from(node.visits()) + EPSILON;
    let exploitation = f64::from(node.reward()) / visits;
    let log_parent = (f64::from(parent_visits) + EPSILON).ln().max(0.0);
    let exploration_term = (log_parent / visits).sqrt();
    f64::from(exploration).mul_add(exploration_term, exploitation)
}

/// Returns the child of `index` with the highest [`uct_score`]. Ties go to
/// the child expanded first.
///
/// # Panics
///
/// Panics if the node has no children: selection must stop at leaves.
#[must_use]
pub fn select_best_child<A>(tree: &Tree<A>, index: NodeIndex, exploration: f32) -> NodeIndex {
    let node = tree.get(index);
    assert!(
        !node.is_leaf(),
        "selecting a child of leaf node {index} is not possible"
    );
    let parent_visits = node.visits();
    let mut best = node.children()[0];
    let mut best_score = f64::NEG_INFINITY;
    for &child in node.children() {
        let score = uct_score(tree.get(child), parent_visits, exploration);
        if score > best_score {
            best = child;
            best_score = score;
        }
    }
    best
}

/// Picks the final move: the child of `index` with the highest accumulated
/// reward (not the most visited one). Ties go to the child expanded first.
///
/// Returns `None` for leaves.
#[must_use]
pub fn most_rewarding_child<A>(tree: &Tree<A>, index: NodeIndex) -> Option<NodeIndex> {
    let mut best: Option<(NodeIndex, f32)> = None;
    for &child in tree.get(index).children() {
        let reward = tree.get(child).reward();
        match best {
            Some((_, best_reward)) if reward <= best_reward => {},
            _ => best = Some((child, reward)),
        }
    }
    best.map(|(child, _)| child)
}
