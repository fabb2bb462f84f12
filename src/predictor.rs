//! The policy/value predictor consumed by the search
//!
//! A predictor maps a [`BoardTensor`] to a prior over every cell and a scalar
//! value estimate in `[-1, 1]` for the player to move. Network internals live
//! outside this crate; the search only awaits one prediction per playout.

use std::future::Future;
use std::time::Duration;

use crate::board::BoardTensor;

/// Errors reported by a predictor
#[derive(thiserror::Error, Debug, Clone, PartialEq)]
pub enum PredictorError {
    /// The backing model or transport rejected the request
    #[error("Prediction failed: {0}")]
    Failed(String),

    /// The prediction did not finish in time
    #[error("Prediction timed out after {0:?}")]
    TimedOut(Duration),

    /// The prior vector does not cover every cell
    #[error("Prediction has {actual} priors, expected {expected}")]
    ShapeMismatch { expected: usize, actual: usize },
}

/// Output of one predictor call
#[derive(Debug, Clone, PartialEq)]
pub struct Prediction {
    /// Prior probability for every flat move index
    pub priors: Vec<f32>,
    /// Value estimate for the player to move, in `[-1, 1]`
    pub value: f32,
}

impl Prediction {
    /// Checks that the priors cover exactly `cells` moves
    pub fn check_shape(&self, cells: usize) -> Result<(), PredictorError> {
        if self.priors.len() != cells {
            return Err(PredictorError::ShapeMismatch {
                expected: cells,
                actual: self.priors.len(),
            });
        }
        Ok(())
    }
}

/// Trait for policy/value evaluators
///
/// Calls may suspend. The engine never issues two calls at once, so an
/// implementation does not need to be safe for concurrent use.
pub trait Predictor {
    /// Evaluates a position
    fn predict(
        &self,
        tensor: &BoardTensor,
    ) -> impl Future<Output = Result<Prediction, PredictorError>> + Send;
}

impl<P: Predictor> Predictor for &P {
    fn predict(
        &self,
        tensor: &BoardTensor,
    ) -> impl Future<Output = Result<Prediction, PredictorError>> + Send {
        (**self).predict(tensor)
    }
}

/// Uniform priors and a neutral value
///
/// Useful as a baseline opponent and for exercising the search without a
/// trained model.
#[derive(Debug, Clone, Copy, Default)]
pub struct UniformPredictor;

impl UniformPredictor {
    /// Creates a new uniform predictor
    pub fn new() -> Self {
        UniformPredictor
    }
}

impl Predictor for UniformPredictor {
    fn predict(
        &self,
        tensor: &BoardTensor,
    ) -> impl Future<Output = Result<Prediction, PredictorError>> + Send {
        let cells = tensor.cell_count();
        async move {
            Ok(Prediction {
                priors: vec![1.0 / cells as f32; cells],
                value: 0.0,
            })
        }
    }
}

/// Races every call of the wrapped predictor against a timer
///
/// A call that exceeds `limit` fails with [`PredictorError::TimedOut`], which
/// aborts the running search the same way any other predictor failure does.
/// Must be polled inside a tokio runtime.
#[derive(Debug, Clone)]
pub struct TimeLimitedPredictor<P> {
    inner: P,
    limit: Duration,
}

impl<P: Predictor> TimeLimitedPredictor<P> {
    /// Wraps `inner` with a per-call time limit
    pub fn new(inner: P, limit: Duration) -> Self {
        TimeLimitedPredictor { inner, limit }
    }

    /// The per-call time limit
    pub fn limit(&self) -> Duration {
        self.limit
    }

    /// The wrapped predictor
    pub fn inner(&self) -> &P {
        &self.inner
    }
}

impl<P: Predictor> Predictor for TimeLimitedPredictor<P> {
    fn predict(
        &self,
        tensor: &BoardTensor,
    ) -> impl Future<Output = Result<Prediction, PredictorError>> + Send {
        let limit = self.limit;
        let call = self.inner.predict(tensor);
        async move {
            match tokio::time::timeout(limit, call).await {
                Ok(result) => result,
                Err(_) => {
                    log::warn!("Predictor call exceeded {:?}", limit);
                    Err(PredictorError::TimedOut(limit))
                }
            }
        }
    }
}
