//! Configuration options for the search engine
//!
//! This module defines the parameters fixed when an engine is built.

use crate::{EngineError, Result};

/// Sampling temperature used by the interactive player when none is given
///
/// Small enough that the most visited move is almost always chosen.
pub const DEFAULT_TEMPERATURE: f64 = 1e-3;

/// Which position an expansion is evaluated against
///
/// During one `select_move` call the engine only receives the root tensor.
/// This setting decides what the predictor sees for deeper leaves.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LeafEvaluation {
    /// Every expansion evaluates the root tensor and enumerates the root's
    /// empty cells
    ///
    /// Branches deeper than the first ply are not evaluated at their real
    /// position: all leaves share the root's priors, value and move list. This
    /// matches the behaviour the shipped networks were tuned against.
    RootPosition,

    /// The root board is rebuilt from the tensor and the moves along the
    /// selection path are replayed before each expansion
    ///
    /// Leaves are evaluated at their true position and only get children for
    /// cells that are still empty there. Costs one board copy per playout.
    ///
    /// The value then belongs to the leaf's player to move, so the engine
    /// backs it up with alternating signs by default. Finished positions can
    /// be scored exactly with `MctsEngine::with_rules`.
    ReplayedPath,
}

/// Configuration for the search engine
///
/// # Example
///
/// ```
/// use gomoku3d_mcts::{SearchConfig, config::LeafEvaluation};
///
/// let config = SearchConfig::default()
///     .with_board_size(4)
///     .with_c_puct(5.0)
///     .with_n_playout(400)
///     .with_leaf_evaluation(LeafEvaluation::ReplayedPath)
///     .with_seed(7);
/// assert!(config.validate().is_ok());
/// ```
#[derive(Debug, Clone)]
pub struct SearchConfig {
    /// Side length of the cubic board
    pub board_size: usize,

    /// Exploration constant of the PUCT formula
    ///
    /// Higher values lean harder on the predictor's priors and on rarely
    /// visited moves.
    pub c_puct: f64,

    /// Number of playouts per `select_move` call
    pub n_playout: usize,

    /// Position used to evaluate expansions
    pub leaf_evaluation: LeafEvaluation,

    /// Seed for move sampling
    ///
    /// `None` seeds from system entropy.
    pub seed: Option<u64>,
}

impl Default for SearchConfig {
    fn default() -> Self {
        SearchConfig {
            board_size: 4,
            c_puct: 5.0,
            n_playout: 400,
            leaf_evaluation: LeafEvaluation::RootPosition,
            seed: None,
        }
    }
}

impl SearchConfig {
    /// Sets the board side length
    pub fn with_board_size(mut self, size: usize) -> Self {
        self.board_size = size;
        self
    }

    /// Sets the exploration constant
    pub fn with_c_puct(mut self, c_puct: f64) -> Self {
        self.c_puct = c_puct;
        self
    }

    /// Sets the number of playouts per move
    pub fn with_n_playout(mut self, n_playout: usize) -> Self {
        self.n_playout = n_playout;
        self
    }

    /// Sets the leaf evaluation mode
    pub fn with_leaf_evaluation(mut self, mode: LeafEvaluation) -> Self {
        self.leaf_evaluation = mode;
        self
    }

    /// Seeds move sampling for reproducible games
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    /// Number of cells (and prior entries) on the configured board
    pub fn cell_count(&self) -> usize {
        crate::coord::cell_count(self.board_size)
    }

    /// Rejects configurations the engine cannot run with
    pub fn validate(&self) -> Result<()> {
        if self.board_size == 0 {
            return Err(EngineError::InvalidConfiguration(
                "board_size must be at least 1".to_string(),
            ));
        }
        if self.n_playout == 0 {
            return Err(EngineError::InvalidConfiguration(
                "n_playout must be at least 1".to_string(),
            ));
        }
        if !self.c_puct.is_finite() || self.c_puct < 0.0 {
            return Err(EngineError::InvalidConfiguration(format!(
                "c_puct must be a finite non-negative number, got {}",
                self.c_puct
            )));
        }
        Ok(())
    }
}
