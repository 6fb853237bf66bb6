//! User-based collaborative filtering.
//!
//! A user's rating for a movie is the similarity-weighted average of the
//! ratings given to that movie by the K most similar users (cosine over
//! co-rated movies, positive similarity only).

use crate::error::{RecommenderError, Result};
use crate::predictors::neighborhood::{DEFAULT_NEIGHBORS, NeighborhoodModel, check_neighbors};
use crate::similarity::{Axis, SimilarityMatrix};
use crate::store::RatingMatrix;
use crate::traits::Predictor;
use data_loader::{MovieId, UserId};
use tracing::instrument;

#[derive(Debug, Clone)]
pub struct UserBasedCF {
    neighbors: usize,
    model: Option<NeighborhoodModel>,
}

impl UserBasedCF {
    pub fn new() -> Self {
        Self {
            neighbors: DEFAULT_NEIGHBORS,
            model: None,
        }
    }

    /// Set the neighborhood size K (must be positive; checked by `fit`)
    pub fn with_neighbors(mut self, neighbors: usize) -> Self {
        self.neighbors = neighbors;
        self
    }

    pub fn neighbors(&self) -> usize {
        self.neighbors
    }

    /// User × user similarities of the last fit
    pub fn similarity(&self) -> Option<&SimilarityMatrix> {
        self.model.as_ref().map(NeighborhoodModel::similarity)
    }
}

impl Default for UserBasedCF {
    fn default() -> Self {
        Self::new()
    }
}

impl Predictor for UserBasedCF {
    fn name(&self) -> &str {
        "user-based"
    }

    #[instrument(skip(self, train), fields(neighbors = self.neighbors))]
    fn fit(&mut self, train: &RatingMatrix) -> Result<()> {
        check_neighbors(self.neighbors)?;
        self.model = Some(NeighborhoodModel::fit(self.name(), train, Axis::Rows));
        Ok(())
    }

    fn predict(&self, user_id: UserId, movie_id: MovieId) -> Result<f64> {
        let model = self.model.as_ref().ok_or_else(|| RecommenderError::NotFitted {
            predictor: self.name().to_string(),
        })?;
        model.predict(user_id, movie_id, self.neighbors)
    }
}
