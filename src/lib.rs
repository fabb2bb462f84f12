//! # gomoku3d-mcts
//!
//! AlphaZero-style Monte Carlo Tree Search for Gomoku on a cubic board.
//!
//! The crate has two halves:
//!
//! - a perspective-relative [`BoardState`] whose tensor always shows the
//!   pieces of the player to move first, and
//! - an [`MctsEngine`] that runs a fixed number of playouts against a
//!   [`Predictor`] (policy priors plus a value estimate), picks a move from the
//!   root visit counts, and keeps the explored subtree when the game moves on.
//!
//! The predictor is an external capability. [`UniformPredictor`] is a
//! stand-in with flat priors; a trained network plugs in by implementing the
//! trait.
//!
//! ## Basic Usage
//!
//! ```
//! use gomoku3d_mcts::{coord, BoardState, MctsEngine, SearchConfig, UniformPredictor};
//!
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() -> gomoku3d_mcts::Result<()> {
//! let config = SearchConfig::default()
//!     .with_board_size(3)
//!     .with_n_playout(50)
//!     .with_seed(1);
//! let mut engine = MctsEngine::new(config, UniformPredictor::new())?;
//! let mut board = BoardState::new(3);
//!
//! // Search, play the chosen move, then let the engine keep its subtree
//! let mv = engine.select_move(&board.tensor(), 0.0).await?;
//! board.apply_move(coord::index_to_coord(mv, 3))?;
//! engine.advance_root(mv);
//!
//! assert_eq!(board.stone_count(), 1);
//! # Ok(())
//! # }
//! ```
//!
//! ## How It Works
//!
//! Each playout has three phases:
//!
//! 1. **Selection**: starting at the root, descend into the child with the
//!    highest PUCT score until reaching a node without children. Unvisited
//!    children are always tried first.
//!
//! 2. **Expansion**: ask the predictor for priors and a value, store the
//!    priors on the leaf and give it one child per empty cell.
//!
//! 3. **Backpropagation**: add the value to every node from the leaf up to
//!    the root and bump their visit counts.
//!
//! After `n_playout` playouts the root children's visit counts are turned
//! into a move, either greedily (temperature 0) or by sampling with
//! probabilities proportional to `visits^(1/temperature)`.
//!
//! Which position a leaf is evaluated at is configurable, see
//! [`config::LeafEvaluation`].

pub mod board;
pub mod config;
pub mod coord;
pub mod mcts;
pub mod policy;
pub mod predictor;
pub mod rules;
pub mod selfplay;
pub mod stats;
pub mod tree;
pub mod utils;

pub use board::{BoardState, BoardTensor, Channel, Color};
pub use config::{LeafEvaluation, SearchConfig, DEFAULT_TEMPERATURE};
pub use coord::{coord_to_index, index_to_coord, Coord};
pub use mcts::{MctsEngine, SearchPhase};
pub use policy::{BackpropagationPolicy, SelectionPolicy};
pub use predictor::{Prediction, Predictor, PredictorError, TimeLimitedPredictor, UniformPredictor};
pub use rules::{GameRules, Outcome};
pub use selfplay::{play_self_game, SelfPlayGame, SelfPlaySample};
pub use stats::SearchStatistics;
pub use tree::{NodePath, SearchNode};

/// Error types for the board and the search engine
#[derive(thiserror::Error, Debug)]
pub enum EngineError {
    /// The target cell already holds a piece
    #[error("Cell {index} is already occupied")]
    OccupiedCell { index: usize },

    /// A coordinate or flat index lies outside the board
    #[error("{what} is outside a board of side {size}")]
    OutOfRange { what: String, size: usize },

    /// The predictor failed or timed out; the search was aborted
    #[error("Predictor failure: {0}")]
    Predictor(#[from] PredictorError),

    /// A search was started while another one had not finished
    #[error("Engine is busy with a search that never completed")]
    EngineBusy,

    /// The root has no child to choose from
    #[error("No legal moves available from current position")]
    NoLegalMoves,

    /// Temperature must be a finite non-negative number
    #[error("Invalid temperature: {0}")]
    InvalidTemperature(f64),

    /// The tensor does not match the configured board
    #[error("Board side {actual} does not match the configured side {expected}")]
    BoardSizeMismatch { expected: usize, actual: usize },

    /// The tensor does not describe a valid position
    #[error("Malformed board tensor: {0}")]
    MalformedTensor(String),

    /// Invalid configuration
    #[error("Invalid configuration: {0}")]
    InvalidConfiguration(String),
}

/// Result type for board and search operations
pub type Result<T> = std::result::Result<T, EngineError>;
