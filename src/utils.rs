//! Numeric helpers shared by the selection policy and move sampling

/// Average value of a node, 0 if it was never visited
pub fn mean_value(value_sum: f64, visits: u64) -> f64 {
    if visits == 0 {
        return 0.0;
    }
    value_sum / visits as f64
}

/// PUCT exploration bonus: `c_puct · P · sqrt(N_parent) / (1 + N_child)`
pub fn puct_exploration(prior: f64, parent_visits: u64, child_visits: u64, c_puct: f64) -> f64 {
    c_puct * prior * (parent_visits as f64).sqrt() / (1.0 + child_visits as f64)
}

/// PUCT score of a child
///
/// Unvisited children score `+inf` so they are tried before any visited
/// sibling.
pub fn puct_value(
    value_sum: f64,
    visits: u64,
    prior: f64,
    parent_visits: u64,
    c_puct: f64,
) -> f64 {
    if visits == 0 {
        return f64::INFINITY;
    }
    mean_value(value_sum, visits) + puct_exploration(prior, parent_visits, visits, c_puct)
}

/// Turns visit counts into probabilities proportional to `visits^(1/temperature)`
///
/// Computed as a softmax over `ln(visits) / temperature`, which stays finite
/// for temperatures far below 1. Zero-visit entries get (almost) no mass; if
/// every count is zero the result is uniform.
pub fn visits_to_probabilities(visits: &[u64], temperature: f64) -> Vec<f64> {
    if visits.is_empty() {
        return Vec::new();
    }
    let logits: Vec<f64> = visits
        .iter()
        .map(|&v| (v as f64 + 1e-10).ln() / temperature)
        .collect();
    let max = logits.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    let weights: Vec<f64> = logits.iter().map(|l| (l - max).exp()).collect();
    let total: f64 = weights.iter().sum();
    weights.iter().map(|w| w / total).collect()
}
