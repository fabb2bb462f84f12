//! The search engine
//!
//! This module drives the playout loop (selection, expansion through the
//! predictor, backpropagation), turns root visit counts into a move, and
//! carries the tree over from one move to the next.

use std::time::Instant;

use rand::{rngs::StdRng, Rng, SeedableRng};

use crate::{
    board::{BoardState, BoardTensor},
    config::{LeafEvaluation, SearchConfig},
    policy::{
        backpropagation::{BackpropagationPolicy, NegamaxPolicy, StandardPolicy},
        selection::{PUCTPolicy, SelectionPolicy},
    },
    predictor::{Prediction, Predictor},
    rules::GameRules,
    stats::SearchStatistics,
    tree::{NodePath, SearchNode},
    utils, EngineError, Result,
};

/// Whether a `select_move` call is in flight
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SearchPhase {
    /// Holding the current root, ready to search
    Idle,
    /// A `select_move` call started and has not returned
    ///
    /// Seen from outside only when a `select_move` future was dropped before
    /// completing. The engine then refuses to search until [`MctsEngine::reset`].
    Searching,
}

/// AlphaZero-style search engine
///
/// The engine owns the tree and the predictor. Each [`select_move`] call runs
/// exactly `n_playout` playouts, one predictor call each, strictly one after
/// the other.
///
/// [`select_move`]: MctsEngine::select_move
pub struct MctsEngine<P: Predictor> {
    /// Root node of the search tree
    root: SearchNode,

    /// Configuration for the search
    config: SearchConfig,

    /// Policy/value evaluator
    predictor: P,

    /// Statistics gathered during the last search
    statistics: SearchStatistics,

    /// Policy for selecting nodes during the selection phase
    selection_policy: Box<dyn SelectionPolicy>,

    /// Policy for backpropagating leaf values
    backpropagation_policy: Box<dyn BackpropagationPolicy>,

    /// Exact scoring of finished positions, used with replayed leaves
    rules: Option<GameRules>,

    /// Source of randomness for temperature sampling
    rng: StdRng,

    phase: SearchPhase,
}

impl<P: Predictor> MctsEngine<P> {
    /// Creates an engine with an empty tree
    ///
    /// The backup follows the leaf evaluation mode. Under
    /// [`LeafEvaluation::RootPosition`] every leaf shares the root's value,
    /// which is added unchanged ([`StandardPolicy`]). Under
    /// [`LeafEvaluation::ReplayedPath`] a leaf's value belongs to whoever moves
    /// there, so it is negated once per ply on the way up ([`NegamaxPolicy`]).
    /// [`with_backpropagation_policy`](Self::with_backpropagation_policy)
    /// overrides either choice.
    pub fn new(config: SearchConfig, predictor: P) -> Result<Self> {
        config.validate()?;

        let selection_policy: Box<dyn SelectionPolicy> = Box::new(PUCTPolicy::new(config.c_puct));
        let backpropagation_policy: Box<dyn BackpropagationPolicy> = match config.leaf_evaluation
        {
            LeafEvaluation::RootPosition => Box::new(StandardPolicy::new()),
            LeafEvaluation::ReplayedPath => Box::new(NegamaxPolicy::new()),
        };

        let rng = match config.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };

        Ok(MctsEngine {
            root: SearchNode::root(),
            config,
            predictor,
            statistics: SearchStatistics::new(),
            selection_policy,
            backpropagation_policy,
            rules: None,
            rng,
            phase: SearchPhase::Idle,
        })
    }

    /// Sets the selection policy to use
    pub fn with_selection_policy<S: SelectionPolicy + 'static>(mut self, policy: S) -> Self {
        self.selection_policy = Box::new(policy);
        self
    }

    /// Sets the backpropagation policy to use
    pub fn with_backpropagation_policy<B: BackpropagationPolicy + 'static>(
        mut self,
        policy: B,
    ) -> Self {
        self.backpropagation_policy = Box::new(policy);
        self
    }

    /// Scores replayed leaves that are already decided with `rules`
    ///
    /// Such leaves are not sent to the predictor and never expanded: a win for
    /// the player who just moved is worth -1 to the player to move, a full
    /// board 0. A root that is already decided therefore gets no children and
    /// `select_move` reports [`EngineError::NoLegalMoves`].
    ///
    /// Only consulted under [`LeafEvaluation::ReplayedPath`]. The rules are
    /// checked against the board size when a search starts.
    pub fn with_rules(mut self, rules: GameRules) -> Self {
        self.rules = Some(rules);
        self
    }

    /// Searches from `tensor` and returns the chosen flat move index
    ///
    /// With `temperature == 0` the most visited root child wins, ties going to
    /// the lowest move index. Otherwise a move is sampled with probability
    /// proportional to `visits^(1/temperature)`.
    ///
    /// The board is not touched; apply the move yourself and then call
    /// [`advance_root`](Self::advance_root).
    ///
    /// A predictor error aborts the search and is returned unchanged. Visit
    /// counts from the playouts that did finish are kept.
    pub async fn select_move(&mut self, tensor: &BoardTensor, temperature: f64) -> Result<usize> {
        if self.phase == SearchPhase::Searching {
            log::warn!("select_move called while an earlier search never finished");
            return Err(EngineError::EngineBusy);
        }
        if !temperature.is_finite() || temperature < 0.0 {
            return Err(EngineError::InvalidTemperature(temperature));
        }
        if tensor.size() != self.config.board_size {
            return Err(EngineError::BoardSizeMismatch {
                expected: self.config.board_size,
                actual: tensor.size(),
            });
        }

        self.phase = SearchPhase::Searching;
        self.statistics = SearchStatistics::new();
        let start_time = Instant::now();

        let result = self.search(tensor).await;

        self.statistics.total_time = start_time.elapsed();
        self.phase = SearchPhase::Idle;

        if let Err(e) = result {
            log::warn!(
                "Search aborted after {} of {} playouts: {}",
                self.statistics.playouts,
                self.config.n_playout,
                e
            );
            return Err(e);
        }

        let chosen = self.choose_move(temperature)?;
        log::debug!(
            "Chose move {} after {} playouts ({} root visits, {} nodes created, depth {}) in {:?}",
            chosen,
            self.statistics.playouts,
            self.root.visit_count,
            self.statistics.nodes_created,
            self.statistics.max_depth,
            self.statistics.total_time
        );
        Ok(chosen)
    }

    /// Seeds the root and runs the playout loop
    async fn search(&mut self, tensor: &BoardTensor) -> Result<()> {
        if let Some(rules) = &self.rules {
            rules.validate_for(self.config.board_size)?;
        }
        let root_board = match self.config.leaf_evaluation {
            LeafEvaluation::RootPosition => None,
            LeafEvaluation::ReplayedPath => Some(BoardState::from_tensor(tensor)?),
        };
        let root_moves = tensor.empty_cells();

        // A reused root can carry children for cells that are taken in this
        // position; they must never be returned.
        let pruned = self
            .root
            .retain_children(|mv| root_moves.binary_search(&mv).is_ok());
        self.statistics.pruned_root_children = pruned;
        if pruned > 0 {
            log::debug!("Pruned {} root children for occupied cells", pruned);
        }

        let prediction = self.evaluate(tensor).await?;
        if self.root.is_leaf() {
            self.root.priors = prediction.priors;
        }

        for i in 0..self.config.n_playout {
            self.execute_playout(tensor, root_board.as_ref(), &root_moves)
                .await?;
            self.statistics.playouts = i + 1;
        }

        Ok(())
    }

    /// One selection, expansion and backpropagation pass
    async fn execute_playout(
        &mut self,
        tensor: &BoardTensor,
        root_board: Option<&BoardState>,
        root_moves: &[usize],
    ) -> Result<()> {
        // 1. Selection phase
        let path = self.selection();

        // 2. Evaluation of the reached leaf, 3. expansion
        let (value, created) = match root_board {
            None => {
                let prediction = self.evaluate(tensor).await?;
                let leaf = self.root.descendant_mut(&path);
                let created = leaf.expand(prediction.priors, root_moves);
                (prediction.value as f64, created)
            }
            Some(board) => {
                let mut board = board.clone();
                for mv in path.moves(&self.root) {
                    board.apply_index(mv)?;
                }

                let outcome = self.rules.as_ref().and_then(|rules| rules.outcome(&board));
                match outcome {
                    Some(outcome) => {
                        self.statistics.terminal_leaves += 1;
                        (outcome.score_for(board.to_move()) as f64, 0)
                    }
                    None => {
                        let prediction = self.evaluate(&board.tensor()).await?;
                        let leaf = self.root.descendant_mut(&path);
                        let created = leaf.expand(prediction.priors, &board.available_moves());
                        (prediction.value as f64, created)
                    }
                }
            }
        };
        self.statistics.nodes_created += created;

        log::trace!(
            "Playout reached {} (depth {}), value {:.3}, {} new children",
            path,
            path.len(),
            value,
            created
        );

        // 4. Backpropagation phase
        self.backpropagation(&path, value);

        Ok(())
    }

    /// Selection phase: descend from the root until a leaf
    fn selection(&mut self) -> NodePath {
        let mut path = NodePath::new();
        let mut current = &self.root;

        while let Some(slot) = self.selection_policy.select_child(current) {
            path.push(slot);
            current = &current.children[slot];
        }

        self.statistics.max_depth = self.statistics.max_depth.max(path.len());
        path
    }

    /// Backpropagation phase: update every node from the leaf up to the root
    fn backpropagation(&mut self, path: &NodePath, value: f64) {
        let depth = path.len();
        let mut node = &mut self.root;
        self.backpropagation_policy.update_stats(node, value, depth);

        for (i, &slot) in path.indices.iter().enumerate() {
            node = &mut node.children[slot];
            self.backpropagation_policy
                .update_stats(node, value, depth - i - 1);
        }
    }

    /// One predictor call with shape checking
    async fn evaluate(&mut self, tensor: &BoardTensor) -> Result<Prediction> {
        self.statistics.predictor_calls += 1;
        let started = Instant::now();
        let prediction = self.predictor.predict(tensor).await;
        self.statistics.predictor_time += started.elapsed();
        let prediction = prediction?;
        prediction.check_shape(self.config.cell_count())?;
        Ok(prediction)
    }

    /// Picks a root child from the visit counts
    fn choose_move(&mut self, temperature: f64) -> Result<usize> {
        let distribution = self.visit_distribution();
        let (&(first_move, first_visits), rest) = distribution
            .split_first()
            .ok_or(EngineError::NoLegalMoves)?;

        if temperature == 0.0 {
            let mut best_move = first_move;
            let mut best_visits = first_visits;
            for &(mv, visits) in rest {
                if visits > best_visits {
                    best_move = mv;
                    best_visits = visits;
                }
            }
            return Ok(best_move);
        }

        let visits: Vec<u64> = distribution.iter().map(|&(_, v)| v).collect();
        let probabilities = utils::visits_to_probabilities(&visits, temperature);

        let draw: f64 = self.rng.gen();
        let mut cumulative = 0.0;
        for (&(mv, _), p) in distribution.iter().zip(&probabilities) {
            cumulative += p;
            if draw < cumulative {
                return Ok(mv);
            }
        }

        // Rounding left the cumulative sum short of the draw
        Ok(distribution[distribution.len() - 1].0)
    }

    /// `(move, visit_count)` for every root child, in ascending move order
    pub fn visit_distribution(&self) -> Vec<(usize, u64)> {
        self.root
            .children
            .iter()
            .filter_map(|child| child.incoming_move.map(|mv| (mv, child.visit_count)))
            .collect()
    }

    /// Search probabilities for every cell, as used for training targets
    ///
    /// Cells without a root child get 0. A temperature of 0 puts all mass on
    /// the move `select_move` would pick at that temperature.
    pub fn move_probabilities(&self, temperature: f64) -> Result<Vec<f32>> {
        if !temperature.is_finite() || temperature < 0.0 {
            return Err(EngineError::InvalidTemperature(temperature));
        }

        let mut probabilities = vec![0.0f32; self.config.cell_count()];
        let distribution = self.visit_distribution();
        if distribution.is_empty() {
            return Ok(probabilities);
        }

        if temperature == 0.0 {
            let mut best = distribution[0];
            for &entry in &distribution[1..] {
                if entry.1 > best.1 {
                    best = entry;
                }
            }
            probabilities[best.0] = 1.0;
            return Ok(probabilities);
        }

        let visits: Vec<u64> = distribution.iter().map(|&(_, v)| v).collect();
        for (&(mv, _), p) in distribution
            .iter()
            .zip(utils::visits_to_probabilities(&visits, temperature))
        {
            probabilities[mv] = p as f32;
        }
        Ok(probabilities)
    }

    /// Moves the root to the child reached by `mv`
    ///
    /// The child's subtree and statistics survive; its siblings are dropped. If
    /// `mv` was never expanded the engine starts over from a fresh root.
    pub fn advance_root(&mut self, mv: usize) {
        match self.root.take_child(mv) {
            Some(mut child) => {
                child.incoming_move = None;
                log::debug!(
                    "Reusing subtree for move {} ({} visits)",
                    mv,
                    child.visit_count
                );
                self.root = child;
            }
            None => {
                log::debug!("Move {} not in tree, starting from a fresh root", mv);
                self.root = SearchNode::root();
            }
        }
    }

    /// Discards the tree and clears an abandoned search
    pub fn reset(&mut self) {
        self.root = SearchNode::root();
        self.statistics = SearchStatistics::new();
        self.phase = SearchPhase::Idle;
    }

    /// The current root
    pub fn root(&self) -> &SearchNode {
        &self.root
    }

    /// Returns the configuration
    pub fn config(&self) -> &SearchConfig {
        &self.config
    }

    /// Returns the predictor
    pub fn predictor(&self) -> &P {
        &self.predictor
    }

    /// Whether a search is in flight
    pub fn phase(&self) -> SearchPhase {
        self.phase
    }

    /// Returns the statistics of the last search
    pub fn get_statistics(&self) -> &SearchStatistics {
        &self.statistics
    }

    /// Number of nodes currently in the tree
    pub fn tree_size(&self) -> usize {
        self.root.subtree_size()
    }

    /// Returns a visualization of the visited part of the tree
    ///
    /// Only visited nodes down to `max_depth` plies are listed; a fully
    /// expanded 4×4×4 tree is far too wide to print.
    pub fn visualize_tree(&self, max_depth: usize) -> String {
        let mut result = String::new();
        Self::visualize_node(&self.root, None, 0, max_depth, &mut result);
        result
    }

    /// Helper method to visualize a node and its children
    fn visualize_node(
        node: &SearchNode,
        parent: Option<&SearchNode>,
        depth: usize,
        max_depth: usize,
        output: &mut String,
    ) {
        let indent = "  ".repeat(depth);
        let label = match node.incoming_move {
            Some(mv) => format!("{}", mv),
            None => "Root".to_string(),
        };
        let prior = match (parent, node.incoming_move) {
            (Some(parent), Some(mv)) => parent.prior(mv),
            _ => 1.0,
        };

        output.push_str(&format!(
            "{}{} (visits: {}, value: {:.3}, prior: {:.3})\n",
            indent,
            label,
            node.visit_count,
            node.mean_value(),
            prior
        ));

        if depth >= max_depth {
            return;
        }
        for child in node.children.iter().filter(|c| c.visit_count > 0) {
            Self::visualize_node(child, Some(node), depth + 1, max_depth, output);
        }
    }
}
