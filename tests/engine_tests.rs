use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;

use gomoku3d_mcts::{
    coord,
    policy::{NegamaxPolicy, StandardPolicy},
    BoardState, BoardTensor, Channel, EngineError, GameRules, LeafEvaluation, MctsEngine,
    Prediction, Predictor, PredictorError, SearchConfig, SearchNode, SearchPhase,
    SelectionPolicy, UniformPredictor,
};

/// Fixed priors and value; remembers every tensor it was shown
struct RecordingPredictor {
    priors: Vec<f32>,
    value: f32,
    seen: Mutex<Vec<BoardTensor>>,
}

impl RecordingPredictor {
    fn uniform(cells: usize, value: f32) -> Self {
        RecordingPredictor {
            priors: vec![1.0 / cells as f32; cells],
            value,
            seen: Mutex::new(Vec::new()),
        }
    }

    fn seen(&self) -> Vec<BoardTensor> {
        self.seen.lock().unwrap().clone()
    }
}

impl Predictor for RecordingPredictor {
    async fn predict(&self, tensor: &BoardTensor) -> Result<Prediction, PredictorError> {
        self.seen.lock().unwrap().push(tensor.clone());
        Ok(Prediction {
            priors: self.priors.clone(),
            value: self.value,
        })
    }
}

/// Uniform predictor that fails on exactly one call
struct FlakyPredictor {
    fail_on: usize,
    calls: AtomicUsize,
}

impl Predictor for FlakyPredictor {
    async fn predict(&self, tensor: &BoardTensor) -> Result<Prediction, PredictorError> {
        let call = self.calls.fetch_add(1, Ordering::SeqCst);
        if call == self.fail_on {
            return Err(PredictorError::Failed("model server unavailable".to_string()));
        }
        let cells = tensor.cell_count();
        Ok(Prediction {
            priors: vec![1.0 / cells as f32; cells],
            value: 0.0,
        })
    }
}

/// Never answers its first call
struct HangOncePredictor {
    hung: AtomicBool,
}

impl Predictor for HangOncePredictor {
    async fn predict(&self, tensor: &BoardTensor) -> Result<Prediction, PredictorError> {
        if !self.hung.swap(true, Ordering::SeqCst) {
            std::future::pending::<()>().await;
        }
        let cells = tensor.cell_count();
        Ok(Prediction {
            priors: vec![1.0 / cells as f32; cells],
            value: 0.0,
        })
    }
}

/// Returns a prior vector of the wrong length
struct ShortPredictor;

impl Predictor for ShortPredictor {
    async fn predict(&self, _tensor: &BoardTensor) -> Result<Prediction, PredictorError> {
        Ok(Prediction {
            priors: vec![0.5, 0.5],
            value: 0.0,
        })
    }
}

/// Uniform priors; the player to move has lost whenever the last move was `losing_cell`
struct LastMoveLoses {
    losing_cell: usize,
}

impl Predictor for LastMoveLoses {
    async fn predict(&self, tensor: &BoardTensor) -> Result<Prediction, PredictorError> {
        let cells = tensor.cell_count();
        let value = if tensor.get(Channel::LastMove, self.losing_cell) > 0.5 {
            -1.0
        } else {
            0.0
        };
        Ok(Prediction {
            priors: vec![1.0 / cells as f32; cells],
            value,
        })
    }
}

/// Always descends into the highest move
#[derive(Clone)]
struct HighestMovePolicy;

impl SelectionPolicy for HighestMovePolicy {
    fn select_child(&self, node: &SearchNode) -> Option<usize> {
        node.children.len().checked_sub(1)
    }

    fn clone_box(&self) -> Box<dyn SelectionPolicy> {
        Box::new(self.clone())
    }
}

fn small_config(n_playout: usize) -> SearchConfig {
    SearchConfig::default()
        .with_board_size(2)
        .with_n_playout(n_playout)
        .with_seed(7)
}

#[tokio::test]
async fn test_root_visits_equal_playouts() {
    let predictor = RecordingPredictor::uniform(8, 0.0);
    let mut engine = MctsEngine::new(small_config(50), &predictor).unwrap();
    let board = BoardState::new(2);

    engine.select_move(&board.tensor(), 0.0).await.unwrap();

    assert_eq!(engine.root().visit_count, 50);
    let stats = engine.get_statistics();
    assert_eq!(stats.playouts, 50);
    // One root query plus one call per playout
    assert_eq!(stats.predictor_calls, 51);
    assert_eq!(predictor.seen().len(), 51);
    assert_eq!(engine.phase(), SearchPhase::Idle);
}

#[tokio::test]
async fn test_greedy_choice_and_tie_break() {
    let mut engine = MctsEngine::new(small_config(50), UniformPredictor::new()).unwrap();
    let board = BoardState::new(2);

    let mv = engine.select_move(&board.tensor(), 0.0).await.unwrap();

    // Playout 1 expands the root; the other 49 visit the 8 children round
    // robin in ascending move order, leaving move 0 one visit ahead
    let distribution = engine.visit_distribution();
    assert_eq!(
        distribution,
        vec![(0, 7), (1, 6), (2, 6), (3, 6), (4, 6), (5, 6), (6, 6), (7, 6)]
    );
    assert_eq!(mv, 0);
}

#[tokio::test]
async fn test_greedy_choice_is_deterministic() {
    let board = {
        let mut board = BoardState::new(3);
        board.apply_index(13).unwrap();
        board
    };
    let config = SearchConfig::default().with_board_size(3).with_n_playout(120);

    let mut first = MctsEngine::new(config.clone(), RecordingPredictor::uniform(27, 0.1)).unwrap();
    let mut second = MctsEngine::new(config, RecordingPredictor::uniform(27, 0.1)).unwrap();

    let a = first.select_move(&board.tensor(), 0.0).await.unwrap();
    let b = second.select_move(&board.tensor(), 0.0).await.unwrap();
    assert_eq!(a, b);
    assert_ne!(a, 13);
    assert_eq!(first.visit_distribution(), second.visit_distribution());
}

#[tokio::test]
async fn test_seeded_sampling_is_reproducible() {
    let board = BoardState::new(2);
    let mut first = MctsEngine::new(small_config(40), UniformPredictor::new()).unwrap();
    let mut second = MctsEngine::new(small_config(40), UniformPredictor::new()).unwrap();

    for _ in 0..5 {
        let a = first.select_move(&board.tensor(), 1.0).await.unwrap();
        let b = second.select_move(&board.tensor(), 1.0).await.unwrap();
        assert_eq!(a, b);
        assert!(first.root().child(a).is_some());
    }
}

#[tokio::test]
async fn test_tree_reuse_keeps_statistics() {
    let mut engine = MctsEngine::new(small_config(60), UniformPredictor::new()).unwrap();
    let mut board = BoardState::new(2);

    let mv = engine.select_move(&board.tensor(), 0.0).await.unwrap();
    let child = engine.root().child(mv).unwrap();
    let child_visits = child.visit_count;
    let child_size = child.subtree_size();
    assert!(child_visits > 0);

    board.apply_index(mv).unwrap();
    engine.advance_root(mv);

    assert_eq!(engine.root().visit_count, child_visits);
    assert_eq!(engine.root().incoming_move, None);
    assert_eq!(engine.tree_size(), child_size);

    // The next search builds on top of the reused visits
    engine.select_move(&board.tensor(), 0.0).await.unwrap();
    assert_eq!(engine.root().visit_count, child_visits + 60);
}

#[tokio::test]
async fn test_advance_to_unexplored_move_starts_fresh() {
    let mut engine = MctsEngine::new(small_config(1), UniformPredictor::new()).unwrap();
    let board = BoardState::new(2);
    engine.select_move(&board.tensor(), 0.0).await.unwrap();

    engine.advance_root(99);
    assert_eq!(engine.root().visit_count, 0);
    assert!(engine.root().is_leaf());
    assert_eq!(engine.tree_size(), 1);
}

#[tokio::test]
async fn test_reused_root_never_returns_occupied_cell() {
    // Under root-position evaluation the reused child carries children for
    // the cell that was just played
    let mut engine = MctsEngine::new(small_config(40), UniformPredictor::new()).unwrap();
    let mut board = BoardState::new(2);

    let mut played = Vec::new();

    for _ in 0..8 {
        let mv = engine.select_move(&board.tensor(), 0.0).await.unwrap();
        for &taken in &played {
            assert!(engine.root().child(taken).is_none());
        }
        board.apply_index(mv).unwrap();
        engine.advance_root(mv);
        played.push(mv);
    }
    assert!(board.is_full());
}

#[tokio::test]
async fn test_root_position_evaluation_reuses_root_tensor() {
    let predictor = RecordingPredictor::uniform(8, 0.0);
    let config = small_config(20).with_leaf_evaluation(LeafEvaluation::RootPosition);
    let mut engine = MctsEngine::new(config, &predictor).unwrap();
    let mut board = BoardState::new(2);
    board.apply_index(3).unwrap();
    let root_tensor = board.tensor();

    engine.select_move(&root_tensor, 0.0).await.unwrap();

    let seen = predictor.seen();
    assert_eq!(seen.len(), 21);
    assert!(seen.iter().all(|t| *t == root_tensor));

    // Deeper nodes get children for every cell empty at the root, including
    // the move that led to them
    let child = engine.root().child(0).unwrap();
    assert_eq!(child.children.len(), 7);
    assert!(child.child(0).is_some());
}

#[tokio::test]
async fn test_replayed_path_evaluation_sees_leaf_positions() {
    let predictor = RecordingPredictor::uniform(8, 0.0);
    let config = small_config(20).with_leaf_evaluation(LeafEvaluation::ReplayedPath);
    let mut engine = MctsEngine::new(config, &predictor).unwrap();
    let board = BoardState::new(2);
    let root_tensor = board.tensor();

    engine.select_move(&root_tensor, 0.0).await.unwrap();

    let seen = predictor.seen();
    assert_eq!(seen.len(), 21);
    // Seed query and the root expansion see the root itself
    assert_eq!(seen[0], root_tensor);
    assert_eq!(seen[1], root_tensor);
    // The next playouts descend into move 0, then move 1
    assert_eq!(seen[2].get(Channel::Opponent, 0), 1.0);
    assert_eq!(seen[2].get(Channel::LastMove, 0), 1.0);
    assert_eq!(seen[3].get(Channel::Opponent, 1), 1.0);
    assert!(seen.iter().skip(2).all(|t| *t != root_tensor));

    // Children only exist for cells still empty at that node
    let child = engine.root().child(0).unwrap();
    assert_eq!(child.children.len(), 7);
    assert!(child.child(0).is_none());
}

#[tokio::test]
async fn test_predictor_failure_aborts_and_keeps_partial_tree() {
    // Call 0 seeds the root, calls 1..=5 are playouts, call 6 fails
    let predictor = FlakyPredictor {
        fail_on: 6,
        calls: AtomicUsize::new(0),
    };
    let mut engine = MctsEngine::new(small_config(30), predictor).unwrap();
    let board = BoardState::new(2);

    let result = engine.select_move(&board.tensor(), 0.0).await;
    assert!(matches!(
        result,
        Err(EngineError::Predictor(PredictorError::Failed(_)))
    ));
    assert_eq!(engine.phase(), SearchPhase::Idle);
    assert_eq!(engine.root().visit_count, 5);
    assert_eq!(engine.get_statistics().playouts, 5);

    // The partial tree is valid and the next search continues from it
    let mv = engine.select_move(&board.tensor(), 0.0).await.unwrap();
    assert_eq!(engine.root().visit_count, 35);
    assert!(mv < 8);
}

#[tokio::test]
async fn test_wrong_prior_length_is_reported() {
    let mut engine = MctsEngine::new(small_config(5), ShortPredictor).unwrap();
    let result = engine.select_move(&BoardState::new(2).tensor(), 0.0).await;
    assert!(matches!(
        result,
        Err(EngineError::Predictor(PredictorError::ShapeMismatch {
            expected: 8,
            actual: 2
        }))
    ));
}

#[tokio::test]
async fn test_abandoned_search_leaves_engine_busy_until_reset() {
    let predictor = HangOncePredictor {
        hung: AtomicBool::new(false),
    };
    let mut engine = MctsEngine::new(small_config(10), predictor).unwrap();
    let tensor = BoardState::new(2).tensor();

    let abandoned =
        tokio::time::timeout(Duration::from_millis(20), engine.select_move(&tensor, 0.0)).await;
    assert!(abandoned.is_err());
    assert_eq!(engine.phase(), SearchPhase::Searching);

    assert!(matches!(
        engine.select_move(&tensor, 0.0).await,
        Err(EngineError::EngineBusy)
    ));

    engine.reset();
    assert_eq!(engine.phase(), SearchPhase::Idle);
    assert!(engine.select_move(&tensor, 0.0).await.is_ok());
    assert_eq!(engine.root().visit_count, 10);
}

#[tokio::test]
async fn test_invalid_arguments() {
    let mut engine = MctsEngine::new(small_config(5), UniformPredictor::new()).unwrap();

    let tensor = BoardState::new(2).tensor();
    for temperature in [-1.0, f64::NAN, f64::INFINITY] {
        assert!(matches!(
            engine.select_move(&tensor, temperature).await,
            Err(EngineError::InvalidTemperature(_))
        ));
    }

    let wrong_size = BoardState::new(3).tensor();
    assert!(matches!(
        engine.select_move(&wrong_size, 0.0).await,
        Err(EngineError::BoardSizeMismatch {
            expected: 2,
            actual: 3
        })
    ));
    assert_eq!(engine.root().visit_count, 0);
}

#[tokio::test]
async fn test_full_board_has_no_legal_moves() {
    let mut engine = MctsEngine::new(small_config(10), UniformPredictor::new()).unwrap();
    let mut board = BoardState::new(2);
    for index in 0..8 {
        board.apply_index(index).unwrap();
    }

    let result = engine.select_move(&board.tensor(), 0.0).await;
    assert!(matches!(result, Err(EngineError::NoLegalMoves)));
    assert_eq!(engine.root().visit_count, 10);
}

#[tokio::test]
async fn test_move_probabilities() {
    let mut engine = MctsEngine::new(small_config(50), UniformPredictor::new()).unwrap();
    let mut board = BoardState::new(2);
    board.apply_index(5).unwrap();

    engine.select_move(&board.tensor(), 0.0).await.unwrap();

    let probs = engine.move_probabilities(1.0).unwrap();
    assert_eq!(probs.len(), 8);
    assert_eq!(probs[5], 0.0);
    let total: f32 = probs.iter().sum();
    assert!((total - 1.0).abs() < 1e-5);

    let greedy = engine.move_probabilities(0.0).unwrap();
    let chosen = greedy.iter().position(|&p| p == 1.0).unwrap();
    assert_eq!(greedy.iter().filter(|&&p| p > 0.0).count(), 1);
    assert_eq!(chosen, engine.visit_distribution()[0].0);

    assert!(engine.move_probabilities(-0.5).is_err());
}

#[tokio::test]
async fn test_decoded_move_applies_to_board() {
    let mut engine = MctsEngine::new(
        SearchConfig::default().with_board_size(4).with_n_playout(64),
        UniformPredictor::new(),
    )
    .unwrap();
    let mut board = BoardState::new(4);

    let mv = engine
        .select_move(&board.tensor(), gomoku3d_mcts::DEFAULT_TEMPERATURE)
        .await
        .unwrap();
    let c = coord::checked_coord(mv, 4).unwrap();
    board.apply_move(c).unwrap();
    assert_eq!(board.last_move(), Some(mv));
}

#[tokio::test]
async fn test_replayed_path_prefers_winning_move() {
    // Playing cell 7 leaves the opponent lost
    let config = SearchConfig::default()
        .with_board_size(2)
        .with_n_playout(200)
        .with_leaf_evaluation(LeafEvaluation::ReplayedPath);
    let mut engine = MctsEngine::new(config, LastMoveLoses { losing_cell: 7 }).unwrap();

    let mv = engine
        .select_move(&BoardState::new(2).tensor(), 0.0)
        .await
        .unwrap();
    assert_eq!(mv, 7);

    let best = engine.root().child(7).unwrap();
    assert!(best.mean_value() > 0.0);
    for (other, visits) in engine.visit_distribution() {
        if other != 7 {
            assert!(visits < best.visit_count);
        }
    }
}

#[tokio::test]
async fn test_explicit_negamax_matches_replayed_default() {
    let config = SearchConfig::default()
        .with_board_size(2)
        .with_n_playout(200)
        .with_leaf_evaluation(LeafEvaluation::ReplayedPath);
    let tensor = BoardState::new(2).tensor();

    let mut default = MctsEngine::new(config.clone(), LastMoveLoses { losing_cell: 7 }).unwrap();
    let mut explicit = MctsEngine::new(config, LastMoveLoses { losing_cell: 7 })
        .unwrap()
        .with_backpropagation_policy(NegamaxPolicy::new());

    assert_eq!(
        default.select_move(&tensor, 0.0).await.unwrap(),
        explicit.select_move(&tensor, 0.0).await.unwrap()
    );
    assert_eq!(default.visit_distribution(), explicit.visit_distribution());
}

#[tokio::test]
async fn test_unsigned_backup_misreads_replayed_values() {
    // Adding the leaf value unchanged scores the winning move from the loser's side
    let config = SearchConfig::default()
        .with_board_size(2)
        .with_n_playout(200)
        .with_leaf_evaluation(LeafEvaluation::ReplayedPath);
    let mut engine = MctsEngine::new(config, LastMoveLoses { losing_cell: 7 })
        .unwrap()
        .with_backpropagation_policy(StandardPolicy::new());

    let mv = engine
        .select_move(&BoardState::new(2).tensor(), 0.0)
        .await
        .unwrap();
    assert_ne!(mv, 7);
    assert!(engine.root().child(7).unwrap().mean_value() < 0.0);
}

#[tokio::test]
async fn test_custom_selection_policy_drives_search() {
    let mut engine = MctsEngine::new(small_config(20), UniformPredictor::new())
        .unwrap()
        .with_selection_policy(HighestMovePolicy);

    let mv = engine
        .select_move(&BoardState::new(2).tensor(), 0.0)
        .await
        .unwrap();
    assert_eq!(mv, 7);

    // Every playout after the root expansion goes through move 7
    assert_eq!(engine.root().child(7).unwrap().visit_count, 19);
    assert!(engine
        .visit_distribution()
        .iter()
        .all(|&(m, visits)| m == 7 || visits == 0));
}

#[tokio::test]
async fn test_rules_score_finished_leaves() {
    let rules = GameRules::default().with_n_in_row(3);
    let config = SearchConfig::default()
        .with_board_size(3)
        .with_n_playout(300)
        .with_leaf_evaluation(LeafEvaluation::ReplayedPath);
    let mut engine = MctsEngine::new(config, UniformPredictor::new())
        .unwrap()
        .with_rules(rules);

    // First to move completes (0,0,0)-(0,0,1)-(0,0,2)
    let mut board = BoardState::new(3);
    for mv in [0, 26, 1, 25] {
        board.apply_index(mv).unwrap();
    }

    let mv = engine.select_move(&board.tensor(), 0.0).await.unwrap();
    assert_eq!(mv, 2);

    let win = engine.root().child(2).unwrap();
    assert!(win.is_leaf());
    assert_eq!(win.mean_value(), 1.0);

    let stats = engine.get_statistics();
    assert!(stats.terminal_leaves > 0);
    assert_eq!(stats.predictor_calls + stats.terminal_leaves, 301);
}

#[tokio::test]
async fn test_decided_root_has_no_moves_under_rules() {
    let rules = GameRules::default().with_n_in_row(2);
    let config = small_config(10).with_leaf_evaluation(LeafEvaluation::ReplayedPath);
    let mut engine = MctsEngine::new(config, UniformPredictor::new())
        .unwrap()
        .with_rules(rules);

    // First already has two in a row
    let mut board = BoardState::new(2);
    for mv in [0, 7, 1] {
        board.apply_index(mv).unwrap();
    }

    let result = engine.select_move(&board.tensor(), 0.0).await;
    assert!(matches!(result, Err(EngineError::NoLegalMoves)));
    assert_eq!(engine.get_statistics().terminal_leaves, 10);
}

#[tokio::test]
async fn test_rules_longer_than_board_are_rejected() {
    let config = small_config(10).with_leaf_evaluation(LeafEvaluation::ReplayedPath);
    let mut engine = MctsEngine::new(config, UniformPredictor::new())
        .unwrap()
        .with_rules(GameRules::default());

    let result = engine.select_move(&BoardState::new(2).tensor(), 0.0).await;
    assert!(matches!(result, Err(EngineError::InvalidConfiguration(_))));
    assert_eq!(engine.phase(), SearchPhase::Idle);
}
