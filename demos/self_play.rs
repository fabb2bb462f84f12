//! Self-play example
//!
//! Runs a few games of the engine against itself and prints what a training
//! pipeline would receive. Set `RUST_LOG=debug` to follow the search.

use gomoku3d_mcts::{
    coord::index_to_coord, play_self_game, GameRules, MctsEngine, Outcome, SearchConfig,
    UniformPredictor, DEFAULT_TEMPERATURE,
};

const BOARD_SIZE: usize = 3;
const GAMES: usize = 3;

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::init();

    println!("MCTS Self-Play Example");
    println!("======================");
    println!();

    let rules = GameRules::default().with_n_in_row(3);
    let config = SearchConfig::default()
        .with_board_size(BOARD_SIZE)
        .with_n_playout(400)
        .with_seed(2024);
    let mut engine = MctsEngine::new(config, UniformPredictor::new())?;

    // Exploratory play for the first games, then near-greedy
    let temperatures = [1.0, 1.0, DEFAULT_TEMPERATURE];

    for (game_number, &temperature) in temperatures.iter().enumerate().take(GAMES) {
        let game = play_self_game(&mut engine, &rules, temperature).await?;

        println!("Game {} (temperature {}):", game_number + 1, temperature);
        let moves: Vec<String> = game
            .moves
            .iter()
            .map(|&mv| index_to_coord(mv, BOARD_SIZE).to_string())
            .collect();
        println!("  Moves: {}", moves.join(" "));

        match game.outcome {
            Outcome::Win(color) => println!("  Result: {:?} wins", color),
            Outcome::Draw => println!("  Result: draw"),
        }

        if let Some(first) = game.samples.first() {
            let peak = first
                .move_probabilities
                .iter()
                .cloned()
                .fold(0.0f32, f32::max);
            println!(
                "  {} samples, opening peak probability {:.3}, z for opener {}",
                game.samples.len(),
                peak,
                first.z
            );
        }
        println!();
    }

    Ok(())
}
