//! Play 3D Gomoku against the engine
//!
//! The human plays first. Moves are entered as `depth,height,width`.
//!
//! There is no trained model here: the engine pairs a uniform predictor with
//! replayed leaves scored exactly by the game rules. It takes wins and blocks
//! threats its playouts reach, but has no positional judgement beyond that.

use std::io::{self, BufRead, Write};

use gomoku3d_mcts::coord::{checked_index, index_to_coord};
use gomoku3d_mcts::{
    BoardState, Color, Coord, GameRules, LeafEvaluation, MctsEngine, Outcome, SearchConfig,
    UniformPredictor,
};

const BOARD_SIZE: usize = 4;

fn parse_move(line: &str) -> Option<Coord> {
    let parts: Vec<usize> = line
        .trim()
        .split(',')
        .map(|s| s.trim().parse::<usize>())
        .collect::<Result<_, _>>()
        .ok()?;
    match parts[..] {
        [depth, height, width] => Some(Coord::new(depth, height, width)),
        _ => None,
    }
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::init();

    let rules = GameRules::default();
    println!(
        "3D Gomoku: {} in a row on a {}x{}x{} board",
        rules.n_in_row, BOARD_SIZE, BOARD_SIZE, BOARD_SIZE
    );
    println!("======================================");
    println!();

    let config = SearchConfig::default()
        .with_board_size(BOARD_SIZE)
        .with_n_playout(2000)
        .with_leaf_evaluation(LeafEvaluation::ReplayedPath);
    let mut engine = MctsEngine::new(config, UniformPredictor::new())?.with_rules(rules.clone());
    let mut board = BoardState::new(BOARD_SIZE);
    let stdin = io::stdin();

    let outcome = loop {
        println!("{}", board);

        if board.to_move() == Color::First {
            print!("Your move (depth,height,width): ");
            io::stdout().flush()?;

            let mut input = String::new();
            if stdin.lock().read_line(&mut input)? == 0 {
                println!("Bye!");
                return Ok(());
            }

            let Some(coord) = parse_move(&input) else {
                println!("Invalid input! Enter three numbers such as 1,2,0.");
                continue;
            };
            let index = match checked_index(coord, BOARD_SIZE) {
                Ok(index) => index,
                Err(e) => {
                    println!("{}", e);
                    continue;
                }
            };
            if let Err(e) = board.apply_index(index) {
                println!("{}", e);
                continue;
            }
            engine.advance_root(index);
        } else {
            println!("Engine is thinking...");
            let index = engine.select_move(&board.tensor(), 0.0).await?;
            let coord = index_to_coord(index, BOARD_SIZE);
            println!("Engine plays {}", coord);
            println!("{}", engine.get_statistics().summary());

            board.apply_index(index)?;
            engine.advance_root(index);
        }

        if let Some(outcome) = rules.outcome(&board) {
            break outcome;
        }
    };

    println!("{}", board);
    match outcome {
        Outcome::Win(Color::First) => println!("You win!"),
        Outcome::Win(Color::Second) => println!("The engine wins!"),
        Outcome::Draw => println!("It's a draw!"),
    }
    Ok(())
}
