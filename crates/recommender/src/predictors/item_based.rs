//! Item-based collaborative filtering: the transpose of user-based CF.
//!
//! A user's rating for a movie is the similarity-weighted average of that
//! user's own ratings of the K movies most similar to it.

use crate::error::{RecommenderError, Result};
use crate::predictors::neighborhood::{DEFAULT_NEIGHBORS, NeighborhoodModel, check_neighbors};
use crate::similarity::{Axis, SimilarityMatrix};
use crate::store::RatingMatrix;
use crate::traits::Predictor;
use data_loader::{MovieId, UserId};
use tracing::instrument;

#[derive(Debug, Clone)]
pub struct ItemBasedCF {
    neighbors: usize,
    model: Option<NeighborhoodModel>,
}

impl ItemBasedCF {
    pub fn new() -> Self {
        Self {
            neighbors: DEFAULT_NEIGHBORS,
            model: None,
        }
    }

    pub fn with_neighbors(mut self, neighbors: usize) -> Self {
        self.neighbors = neighbors;
        self
    }

    pub fn neighbors(&self) -> usize {
        self.neighbors
    }

    /// Movie × movie similarities of the last fit
    pub fn similarity(&self) -> Option<&SimilarityMatrix> {
        self.model.as_ref().map(NeighborhoodModel::similarity)
    }
}

impl Default for ItemBasedCF {
    fn default() -> Self {
        Self::new()
    }
}

impl Predictor for ItemBasedCF {
    fn name(&self) -> &str {
        "item-based"
    }

    #[instrument(skip(self, train), fields(neighbors = self.neighbors))]
    fn fit(&mut self, train: &RatingMatrix) -> Result<()> {
        check_neighbors(self.neighbors)?;
        self.model = Some(NeighborhoodModel::fit(self.name(), train, Axis::Cols));
        Ok(())
    }

    fn predict(&self, user_id: UserId, movie_id: MovieId) -> Result<f64> {
        let model = self.model.as_ref().ok_or_else(|| RecommenderError::NotFitted {
            predictor: self.name().to_string(),
        })?;
        model.predict(user_id, movie_id, self.neighbors)
    }
}
