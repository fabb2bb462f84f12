//! Backpropagation policies for the search
//!
//! Backpropagation policies determine how a leaf evaluation updates the
//! statistics of every node between the leaf and the root.

use crate::tree::SearchNode;

/// Trait for policies that backpropagate leaf values
pub trait BackpropagationPolicy: Send + Sync {
    /// Updates one node on the path
    ///
    /// `plies_from_leaf` is 0 for the expanded node, 1 for its parent and so
    /// on up to the root.
    fn update_stats(&self, node: &mut SearchNode, value: f64, plies_from_leaf: usize);

    /// Create a boxed clone of this policy
    fn clone_box(&self) -> Box<dyn BackpropagationPolicy>;
}

/// Standard backpropagation policy
///
/// Adds the leaf value unchanged to every node on the path and increments
/// each visit count. The engine's default under
/// [`LeafEvaluation::RootPosition`](crate::config::LeafEvaluation::RootPosition).
#[derive(Debug, Clone)]
pub struct StandardPolicy;

impl StandardPolicy {
    /// Creates a new standard policy
    pub fn new() -> Self {
        StandardPolicy
    }
}

impl Default for StandardPolicy {
    fn default() -> Self {
        Self::new()
    }
}

impl BackpropagationPolicy for StandardPolicy {
    fn update_stats(&self, node: &mut SearchNode, value: f64, _plies_from_leaf: usize) {
        node.record(value);
    }

    fn clone_box(&self) -> Box<dyn BackpropagationPolicy> {
        Box::new(self.clone())
    }
}

/// Sign-alternating backpropagation
///
/// The predictor's value is for the player to move at the leaf. A node's
/// statistics are read by its parent's mover, who is the leaf's opponent at
/// even distances, so the value is negated at the leaf and flipped once per
/// ply above it. The engine's default under
/// [`LeafEvaluation::ReplayedPath`](crate::config::LeafEvaluation::ReplayedPath),
/// where leaves are evaluated at their real position.
#[derive(Debug, Clone)]
pub struct NegamaxPolicy;

impl NegamaxPolicy {
    /// Creates a new negamax policy
    pub fn new() -> Self {
        NegamaxPolicy
    }
}

impl Default for NegamaxPolicy {
    fn default() -> Self {
        Self::new()
    }
}

impl BackpropagationPolicy for NegamaxPolicy {
    fn update_stats(&self, node: &mut SearchNode, value: f64, plies_from_leaf: usize) {
        let signed = if plies_from_leaf % 2 == 0 { -value } else { value };
        node.record(signed);
    }

    fn clone_box(&self) -> Box<dyn BackpropagationPolicy> {
        Box::new(self.clone())
    }
}

impl BackpropagationPolicy for Box<dyn BackpropagationPolicy> {
    fn update_stats(&self, node: &mut SearchNode, value: f64, plies_from_leaf: usize) {
        (**self).update_stats(node, value, plies_from_leaf)
    }

    fn clone_box(&self) -> Box<dyn BackpropagationPolicy> {
        (**self).clone_box()
    }
}
