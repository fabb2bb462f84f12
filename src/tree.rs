//! Tree data structures for the search
//!
//! Every node owns its children outright. There are no parent pointers: the
//! route from the root to a leaf is recorded as a [`NodePath`] during selection
//! and replayed for backpropagation. Dropping a node drops its whole subtree.

use std::fmt;

/// One position reached from the root by a sequence of moves
#[derive(Debug, Clone, Default)]
pub struct SearchNode {
    /// Flat index of the move that produced this node (`None` for the root)
    pub incoming_move: Option<usize>,

    /// Number of backpropagation passes that touched this node
    pub visit_count: u64,

    /// Sum of backpropagated values
    pub value_sum: f64,

    /// Predictor priors for moves from this position, one per cell
    ///
    /// Empty until the node is expanded or seeded as a root.
    pub priors: Vec<f32>,

    /// Children, sorted by ascending `incoming_move`
    pub children: Vec<SearchNode>,
}

impl SearchNode {
    /// Creates an unexpanded root
    pub fn root() -> Self {
        SearchNode::default()
    }

    /// Creates an unvisited node reached by `mv`
    pub fn new(mv: usize) -> Self {
        SearchNode {
            incoming_move: Some(mv),
            ..SearchNode::default()
        }
    }

    /// Returns true if this node has no children
    pub fn is_leaf(&self) -> bool {
        self.children.is_empty()
    }

    /// Average backpropagated value, 0 for an unvisited node
    pub fn mean_value(&self) -> f64 {
        crate::utils::mean_value(self.value_sum, self.visit_count)
    }

    /// Prior this node assigns to `mv`, 0 if no priors are stored
    pub fn prior(&self, mv: usize) -> f32 {
        self.priors.get(mv).copied().unwrap_or(0.0)
    }

    /// Records one backpropagation pass
    pub fn record(&mut self, value: f64) {
        self.visit_count += 1;
        self.value_sum += value;
    }

    /// Slot of the child reached by `mv`
    pub fn child_slot(&self, mv: usize) -> Option<usize> {
        self.children
            .binary_search_by_key(&Some(mv), |c| c.incoming_move)
            .ok()
    }

    /// The child reached by `mv`
    pub fn child(&self, mv: usize) -> Option<&SearchNode> {
        self.child_slot(mv).map(|slot| &self.children[slot])
    }

    /// Stores priors and adds a child for every move not already present
    ///
    /// Returns the number of children created.
    pub fn expand(&mut self, priors: Vec<f32>, moves: &[usize]) -> usize {
        self.priors = priors;
        let mut created = 0;
        for &mv in moves {
            if let Err(slot) = self
                .children
                .binary_search_by_key(&Some(mv), |c| c.incoming_move)
            {
                self.children.insert(slot, SearchNode::new(mv));
                created += 1;
            }
        }
        created
    }

    /// Detaches the child reached by `mv`, leaving its siblings in place
    pub fn take_child(&mut self, mv: usize) -> Option<SearchNode> {
        self.child_slot(mv).map(|slot| self.children.remove(slot))
    }

    /// Drops every child whose move fails `keep`, returning how many went
    pub fn retain_children(&mut self, mut keep: impl FnMut(usize) -> bool) -> usize {
        let before = self.children.len();
        self.children
            .retain(|c| c.incoming_move.map_or(false, &mut keep));
        before - self.children.len()
    }

    /// Follows `path` from this node
    pub fn descendant(&self, path: &NodePath) -> &SearchNode {
        path.indices
            .iter()
            .fold(self, |node, &slot| &node.children[slot])
    }

    /// Mutable version of [`descendant`](Self::descendant)
    pub fn descendant_mut(&mut self, path: &NodePath) -> &mut SearchNode {
        let mut node = self;
        for &slot in &path.indices {
            node = &mut node.children[slot];
        }
        node
    }

    /// Number of nodes in the subtree rooted here, including this one
    pub fn subtree_size(&self) -> usize {
        1 + self
            .children
            .iter()
            .map(SearchNode::subtree_size)
            .sum::<usize>()
    }
}

/// Represents a path through the search tree
///
/// A path is a sequence of child slots that leads from the root to a node.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NodePath {
    /// Child slots to follow from the root
    pub indices: Vec<usize>,
}

impl NodePath {
    /// Creates a new empty path (pointing to the root)
    pub fn new() -> Self {
        NodePath {
            indices: Vec::new(),
        }
    }

    /// Extends the path with a new slot
    pub fn push(&mut self, slot: usize) {
        self.indices.push(slot);
    }

    /// Returns the length of the path
    pub fn len(&self) -> usize {
        self.indices.len()
    }

    /// Returns true if the path is empty
    pub fn is_empty(&self) -> bool {
        self.indices.is_empty()
    }

    /// The moves played along this path, starting at `root`
    pub fn moves(&self, root: &SearchNode) -> Vec<usize> {
        let mut node = root;
        let mut moves = Vec::with_capacity(self.indices.len());
        for &slot in &self.indices {
            node = &node.children[slot];
            moves.extend(node.incoming_move);
        }
        moves
    }
}

impl Default for NodePath {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for NodePath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Path[")?;
        for (i, idx) in self.indices.iter().enumerate() {
            if i > 0 {
                write!(f, " -> ")?;
            }
            write!(f, "{}", idx)?;
        }
        write!(f, "]")
    }
}
