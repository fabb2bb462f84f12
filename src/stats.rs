//! Per-call search statistics
//!
//! Counters are reset at the start of every `select_move` call. Time spent
//! waiting on the predictor is tracked apart from the total so a slow model
//! is easy to tell from a slow tree.

use std::time::Duration;

/// What one `select_move` call did
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SearchStatistics {
    /// Playouts completed
    pub playouts: usize,

    /// Predictor calls issued, including the root query
    pub predictor_calls: usize,

    /// Leaves scored by the game rules instead of the predictor
    pub terminal_leaves: usize,

    /// Nodes created by expansions
    pub nodes_created: usize,

    /// Children of a reused root dropped because their cell was taken
    pub pruned_root_children: usize,

    /// Deepest leaf reached by selection, in plies below the root
    pub max_depth: usize,

    /// Time spent awaiting the predictor
    pub predictor_time: Duration,

    /// Wall time of the whole call
    pub total_time: Duration,
}

impl SearchStatistics {
    pub fn new() -> Self {
        Self::default()
    }

    /// Playouts per second of wall time, 0 before any time was recorded
    pub fn playouts_per_second(&self) -> f64 {
        let secs = self.total_time.as_secs_f64();
        if secs <= 0.0 {
            return 0.0;
        }
        self.playouts as f64 / secs
    }

    /// Average time of one predictor call
    pub fn mean_predictor_latency(&self) -> Duration {
        match u32::try_from(self.predictor_calls) {
            Ok(calls) if calls > 0 => self.predictor_time / calls,
            _ => Duration::ZERO,
        }
    }

    /// Fraction of the call spent waiting on the predictor, in `[0, 1]`
    pub fn predictor_share(&self) -> f64 {
        let total = self.total_time.as_secs_f64();
        if total <= 0.0 {
            return 0.0;
        }
        (self.predictor_time.as_secs_f64() / total).min(1.0)
    }

    /// Multi-line report for logs and the console demos
    pub fn summary(&self) -> String {
        format!(
            "Search Statistics:\n\
             - Playouts: {} ({:.1}/s)\n\
             - Predictor calls: {} (mean {:?}, {:.0}% of search time)\n\
             - Terminal leaves: {}\n\
             - Nodes created: {}, root children pruned: {}\n\
             - Max depth: {}\n\
             - Total time: {:.3} seconds",
            self.playouts,
            self.playouts_per_second(),
            self.predictor_calls,
            self.mean_predictor_latency(),
            self.predictor_share() * 100.0,
            self.terminal_leaves,
            self.nodes_created,
            self.pruned_root_children,
            self.max_depth,
            self.total_time.as_secs_f64(),
        )
    }
}
