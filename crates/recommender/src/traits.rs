//! Core trait shared by every rating predictor.
//!
//! User-based CF, item-based CF, matrix factorization and the global-mean
//! baseline all implement [`Predictor`], so the evaluator, the comparison
//! harness and the recommendation service work with any of them.

use crate::error::Result;
use crate::store::{MAX_RATING, MIN_RATING, RatingMatrix};
use data_loader::{MovieId, UserId};

/// A rating predictor trained on a train matrix.
///
/// ## Design Note
/// - `Send + Sync` lets independent predictors be fit concurrently and lets
///   one fitted predictor answer `predict` calls from many threads
/// - `fit` replaces any previous state; fitting twice on the same input
///   yields identical predictions
pub trait Predictor: Send + Sync {
    /// Short name used in logs and comparison tables
    fn name(&self) -> &str;

    /// Train on `train`, discarding any previously fitted state.
    fn fit(&mut self, train: &RatingMatrix) -> Result<()>;

    /// Predicted rating in `[1, 5]` for `(user_id, movie_id)`.
    ///
    /// # Errors
    /// * `NotFitted` before the first successful `fit`
    /// * `UnknownEntity` when no prediction or fallback mean exists
    fn predict(&self, user_id: UserId, movie_id: MovieId) -> Result<f64>;
}

/// Clamp a raw estimate onto the rating scale
pub fn clamp_rating(value: f64) -> f64 {
    value.clamp(MIN_RATING, MAX_RATING)
}
