//! Selection policies for the search
//!
//! Selection policies decide which child to descend into during the
//! selection phase, balancing the predictor's priors against visit statistics.

use crate::tree::SearchNode;
use crate::utils;

/// Trait for policies that select nodes to explore
pub trait SelectionPolicy: Send + Sync {
    /// Returns the slot of the child to descend into, or `None` for a leaf
    fn select_child(&self, node: &SearchNode) -> Option<usize>;

    /// Create a boxed clone of this policy
    fn clone_box(&self) -> Box<dyn SelectionPolicy>;
}

/// Polynomial Upper Confidence Trees (PUCT) selection policy
///
/// The AlphaZero rule, with the prior read from the parent's prior vector:
///
/// ```text
/// PUCT = Q(child) + c_puct * P(parent, move) * sqrt(N(parent)) / (1 + N(child))
/// ```
///
/// Unvisited children score `+inf`. Ties, including between several unvisited
/// children, go to the lowest move index because children are scanned in
/// ascending move order and only a strictly greater score replaces the best.
#[derive(Debug, Clone)]
pub struct PUCTPolicy {
    /// Exploration constant
    pub c_puct: f64,
}

impl PUCTPolicy {
    /// Creates a new PUCT policy
    pub fn new(c_puct: f64) -> Self {
        PUCTPolicy { c_puct }
    }

    /// Score of one child under `parent`
    pub fn score(&self, parent: &SearchNode, child: &SearchNode) -> f64 {
        let prior = child
            .incoming_move
            .map_or(0.0, |mv| parent.prior(mv) as f64);
        utils::puct_value(
            child.value_sum,
            child.visit_count,
            prior,
            parent.visit_count,
            self.c_puct,
        )
    }
}

impl Default for PUCTPolicy {
    fn default() -> Self {
        Self::new(5.0)
    }
}

impl SelectionPolicy for PUCTPolicy {
    fn select_child(&self, node: &SearchNode) -> Option<usize> {
        let mut best: Option<(usize, f64)> = None;

        for (slot, child) in node.children.iter().enumerate() {
            let score = self.score(node, child);
            match best {
                Some((_, best_score)) if score <= best_score => {}
                _ => best = Some((slot, score)),
            }
        }

        best.map(|(slot, _)| slot)
    }

    fn clone_box(&self) -> Box<dyn SelectionPolicy> {
        Box::new(self.clone())
    }
}

impl SelectionPolicy for Box<dyn SelectionPolicy> {
    fn select_child(&self, node: &SearchNode) -> Option<usize> {
        (**self).select_child(node)
    }

    fn clone_box(&self) -> Box<dyn SelectionPolicy> {
        (**self).clone_box()
    }
}
