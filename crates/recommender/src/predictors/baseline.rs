//! Global-mean baseline: every prediction is the training mean.

use crate::error::{RecommenderError, Result};
use crate::store::RatingMatrix;
use crate::traits::{Predictor, clamp_rating};
use data_loader::{MovieId, UserId};
use tracing::debug;

#[derive(Debug, Clone, Default)]
pub struct GlobalMean {
    /// `Some(None)` once fitted on a matrix without ratings
    mean: Option<Option<f64>>,
}

impl GlobalMean {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Predictor for GlobalMean {
    fn name(&self) -> &str {
        "global-mean"
    }

    fn fit(&mut self, train: &RatingMatrix) -> Result<()> {
        let mean = train.global_mean();
        debug!(?mean, "Fitted global mean");
        self.mean = Some(mean);
        Ok(())
    }

    fn predict(&self, user_id: UserId, _movie_id: MovieId) -> Result<f64> {
        match self.mean {
            None => Err(RecommenderError::NotFitted {
                predictor: self.name().to_string(),
            }),
            Some(None) => Err(RecommenderError::unknown_user(user_id)),
            Some(Some(mean)) => Ok(clamp_rating(mean)),
        }
    }
}
