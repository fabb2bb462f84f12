//! Self-play game generation
//!
//! Plays the engine against itself from an empty board and records one
//! training sample per move: the position, the search probabilities and the
//! final result from the point of view of the player who moved.

use crate::board::{BoardState, BoardTensor, Color};
use crate::mcts::MctsEngine;
use crate::predictor::Predictor;
use crate::rules::{GameRules, Outcome};
use crate::Result;

/// One recorded position
#[derive(Debug, Clone)]
pub struct SelfPlaySample {
    /// Position before the move, in predictor layout
    pub tensor: BoardTensor,
    /// Search probabilities over every cell
    pub move_probabilities: Vec<f32>,
    /// Colour that moved from this position
    pub player: Color,
    /// Final result for `player`: 1 win, -1 loss, 0 draw
    pub z: f32,
}

/// A finished self-play game
#[derive(Debug, Clone)]
pub struct SelfPlayGame {
    pub samples: Vec<SelfPlaySample>,
    pub outcome: Outcome,
    /// Flat move indices in the order they were played
    pub moves: Vec<usize>,
}

/// Plays one game of the engine against itself
///
/// The tree is reused between moves and discarded when the game ends, so the
/// engine is ready for the next game.
pub async fn play_self_game<P: Predictor>(
    engine: &mut MctsEngine<P>,
    rules: &GameRules,
    temperature: f64,
) -> Result<SelfPlayGame> {
    let size = engine.config().board_size;
    rules.validate_for(size)?;

    engine.reset();
    let mut board = BoardState::new(size);
    let mut history: Vec<(BoardTensor, Vec<f32>, Color)> = Vec::new();
    let mut moves = Vec::new();

    let outcome = loop {
        let tensor = board.tensor();
        let mv = engine.select_move(&tensor, temperature).await?;
        let probabilities = engine.move_probabilities(temperature)?;
        history.push((tensor, probabilities, board.to_move()));

        board.apply_index(mv)?;
        engine.advance_root(mv);
        moves.push(mv);

        if let Some(outcome) = rules.outcome(&board) {
            break outcome;
        }
    };
    engine.reset();

    log::info!("Self-play game finished after {} moves: {:?}", moves.len(), outcome);

    let samples = history
        .into_iter()
        .map(|(tensor, move_probabilities, player)| SelfPlaySample {
            tensor,
            move_probabilities,
            player,
            z: outcome.score_for(player),
        })
        .collect();

    Ok(SelfPlayGame {
        samples,
        outcome,
        moves,
    })
}
