//! Search tree stored in a fixed-capacity arena.
//!
//! Nodes never point at each other: the parent and children are indices into
//! the arena. Nodes are only ever appended, so indices stay valid for the
//! whole search and every parent index is smaller than the index of its
//! children.

use thiserror::Error;

/// Position of the node in the arena.
pub type NodeIndex = usize;

/// The root is always the first allocated node.
pub const ROOT: NodeIndex = 0;

// This is a special value that is used to indicate that the node has no parent.
const TOMBSTONE_PARENT: NodeIndex = NodeIndex::MAX;

/// Upper bound on the slots reserved up front. Larger pools grow on demand,
/// so the capacity is only a limit and never an allocation request.
const MAX_RESERVED_NODES: usize = 1 << 16;

/// The arena has no free slots left for the requested allocation.
#[derive(Clone, Copy, Debug, Error, PartialEq, Eq)]
#[error("node pool is exhausted: all {capacity} slots are allocated")]
pub struct PoolExhausted {
    /// Maximum number of nodes in the arena.
    pub capacity: usize,
}

/// Statistics of a single position in the tree.
#[derive(Clone, Debug)]
pub struct Node<A> {
    /// Move leading from the parent to this node, `None` only for the root.
    action: Option<A>,
    parent: NodeIndex,
    /// Populated at once by expansion, empty for leaves.
    children: Vec<NodeIndex>,
    /// Number of backpropagation passes that reached this node through one of
    /// its children.
    visits: u32,
    /// Sum of rewards backpropagated through this node, from the perspective
    /// of the player to move at the root.
    reward: f32,
}

impl<A> Node<A> {
    const fn new(parent: NodeIndex, action: Option<A>) -> Self {
        Self {
            action,
            parent,
            children: Vec::new(),
            visits: 0,
            reward: 0.0,
        }
    }

    /// Move that leads to this node, `None` for the root.
    #[must_use]
    pub const fn action(&self) -> Option<&A> {
        self.action.as_ref()
    }

    /// Index of the parent node, `None` for the root.
    #[must_use]
    pub const fn parent(&self) -> Option<NodeIndex> {
        if self.parent == TOMBSTONE_PARENT {
            None
        } else {
            Some(self.parent)
        }
    }

    /// Indices of the children, empty until the node is expanded.
    #[must_use]
    pub fn children(&self) -> &[NodeIndex] {
        &self.children
    }

    /// Number of backpropagation passes that came through a child.
    #[must_use]
    pub const fn visits(&self) -> u32 {
        self.visits
    }

    /// Accumulated reward from the root player's perspective.
    #[must_use]
    pub const fn reward(&self) -> f32 {
        self.reward
    }

    /// True once a backpropagation pass came through a child.
    #[must_use]
    pub const fn visited(&self) -> bool {
        self.visits > 0
    }

    /// Never expanded or expanded into a terminal position.
    #[must_use]
    pub fn is_leaf(&self) -> bool {
        self.children.is_empty()
    }
}

/// Arena of [`Node`]s with a hard capacity.
#[derive(Clone, Debug)]
pub struct Tree<A> {
    nodes: Vec<Node<A>>,
    capacity: usize,
}

impl<A> Tree<A> {
    /// Creates an empty tree that will never hold more than `capacity` nodes.
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        Self {
            nodes: Vec::with_capacity(capacity.min(MAX_RESERVED_NODES)),
            capacity,
        }
    }

    /// Allocates the root node at [`ROOT`].
    ///
    /// # Errors
    ///
    /// Fails if the capacity is zero.
    ///
    /// # Panics
    ///
    /// Panics if the tree already has a root.
    pub fn allocate_root(&mut self) -> Result<NodeIndex, PoolExhausted> {
        assert!(self.nodes.is_empty(), "the root must be allocated first");
        self.push(Node::new(TOMBSTONE_PARENT, None))
    }

    /// Allocates a fresh node reached from `parent` by playing `action`.
    ///
    /// The node is not attached to the parent's children: that is done by
    /// [`Tree::expand`] for the whole batch at once.
    ///
    /// # Errors
    ///
    /// Fails if the capacity is reached.
    pub fn allocate(&mut self, parent: NodeIndex, action: A) -> Result<NodeIndex, PoolExhausted> {
        debug_assert!(parent < self.nodes.len());
        self.push(Node::new(parent, Some(action)))
    }

    fn push(&mut self, node: Node<A>) -> Result<NodeIndex, PoolExhausted> {
        if self.nodes.len() >= self.capacity {
            return Err(PoolExhausted {
                capacity: self.capacity,
            });
        }
        self.nodes.push(node);
        Ok(self.nodes.len() - 1)
    }

    /// # Panics
    ///
    /// Panics if the node was not allocated.
    #[must_use]
    pub fn get(&self, index: NodeIndex) -> &Node<A> {
        &self.nodes[index]
    }

    /// # Panics
    ///
    /// Panics if the root was not allocated yet.
    #[must_use]
    pub fn root(&self) -> &Node<A> {
        self.get(ROOT)
    }

    /// Number of allocated nodes.
    #[must_use]
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// True until the root is allocated.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Maximum number of nodes.
    #[must_use]
    pub const fn capacity(&self) -> usize {
        self.capacity
    }

    /// Number of nodes that can still be allocated.
    #[must_use]
    pub fn remaining(&self) -> usize {
        self.capacity - self.nodes.len()
    }

    /// Creates a child of `leaf` for each action.
    ///
    /// Either all children are allocated or none: if the pool does not have
    /// room for every action, the tree is left untouched. Expanding into an
    /// empty action list keeps the node a leaf.
    ///
    /// # Errors
    ///
    /// Fails if the remaining capacity is smaller than the number of actions.
    pub fn expand(&mut self, leaf: NodeIndex, actions: &[A]) -> Result<(), PoolExhausted>
    where
        A: Clone,
    {
        debug_assert!(self.get(leaf).is_leaf(), "node {leaf} is already expanded");
        if actions.len() > self.remaining() {
            return Err(PoolExhausted {
                capacity: self.capacity,
            });
        }
        let mut children = Vec::with_capacity(actions.len());
        for action in actions {
            children.push(self.allocate(leaf, action.clone())?);
        }
        self.nodes[leaf].children = children;
        Ok(())
    }

    /// Credits `reward` to the node and all of its ancestors.
    ///
    /// The reward is added to every node on the path, including `index` and
    /// the root. Visits are counted at the parent: each step up increments
    /// the parent's visits, so `index` itself is not counted as visited by
    /// its own backpropagation.
    pub fn backpropagate(&mut self, index: NodeIndex, reward: f32) {
        let mut current = index;
        loop {
            let node = &mut self.nodes[current];
            node.reward += reward;
            match node.parent() {
                Some(parent) => {
                    self.nodes[parent].visits += 1;
                    current = parent;
                },
                None => break,
            }
        }
    }
}
