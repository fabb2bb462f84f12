//! Policies for the phases of a playout
//!
//! - Selection policies: which child to descend into
//! - Backpropagation policies: how a leaf value updates the nodes above it
//!
//! Expansion and evaluation are not pluggable here; they are the job of the
//! [`Predictor`](crate::predictor::Predictor).

pub mod backpropagation;
pub mod selection;

pub use backpropagation::{BackpropagationPolicy, NegamaxPolicy, StandardPolicy};
pub use selection::{PUCTPolicy, SelectionPolicy};
