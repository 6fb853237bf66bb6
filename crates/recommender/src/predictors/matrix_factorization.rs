//! Low-rank matrix factorization via truncated SVD.
//!
//! ## Algorithm
//! 1. Subtract the global mean from every observed rating
//! 2. Fill unobserved cells with 0 (the mean after centering) to get a dense
//!    residual matrix
//! 3. Keep the top `n_factors` singular triplets of the residual
//! 4. Predict `Σ_f U[u,f]·σ_f·V[i,f] + mean`, clamped to `[1, 5]`

use crate::error::{RecommenderError, Result};
use crate::linalg::{DenseMatrix, SvdOptions, truncated_svd};
use crate::store::{IdIndex, RatingMatrix};
use crate::traits::{Predictor, clamp_rating};
use data_loader::{MovieId, UserId};
use std::sync::Arc;
use std::time::Instant;
use tracing::{info, instrument};

/// Fitted factors of one decomposition
#[derive(Debug, Clone)]
pub struct FactorModel {
    users: Arc<IdIndex<UserId>>,
    movies: Arc<IdIndex<MovieId>>,
    /// M × k
    user_factors: DenseMatrix,
    /// N × k
    item_factors: DenseMatrix,
    singular_values: Vec<f64>,
    global_mean: f64,
}

impl FactorModel {
    pub fn user_factors(&self) -> &DenseMatrix {
        &self.user_factors
    }

    pub fn item_factors(&self) -> &DenseMatrix {
        &self.item_factors
    }

    /// Descending, non-negative
    pub fn singular_values(&self) -> &[f64] {
        &self.singular_values
    }

    pub fn global_mean(&self) -> f64 {
        self.global_mean
    }

    pub fn rank(&self) -> usize {
        self.singular_values.len()
    }

    /// Unclamped reconstructed value at `(u, i)`
    pub fn cell(&self, u: usize, i: usize) -> f64 {
        let user = self.user_factors.row(u);
        let item = self.item_factors.row(i);
        let residual: f64 = self
            .singular_values
            .iter()
            .zip(user.iter().zip(item))
            .map(|(sigma, (p, q))| p * sigma * q)
            .sum();
        residual + self.global_mean
    }

    /// The full M × N matrix `U_k Σ_k V_kᵀ + mean`, unclamped
    pub fn reconstruct(&self) -> DenseMatrix {
        DenseMatrix::from_fn(self.user_factors.rows(), self.item_factors.rows(), |u, i| {
            self.cell(u, i)
        })
    }

    fn predict(&self, user_id: UserId, movie_id: MovieId) -> f64 {
        match (self.users.index_of(user_id), self.movies.index_of(movie_id)) {
            (Some(u), Some(i)) => clamp_rating(self.cell(u, i)),
            _ => clamp_rating(self.global_mean),
        }
    }
}

#[derive(Debug, Clone)]
pub struct MatrixFactorization {
    n_factors: usize,
    options: SvdOptions,
    model: Option<FactorModel>,
}

impl MatrixFactorization {
    pub fn new(n_factors: usize) -> Self {
        Self {
            n_factors,
            options: SvdOptions::default(),
            model: None,
        }
    }

    /// Seed for the randomized SVD path
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.options.seed = seed;
        self
    }

    pub fn with_oversampling(mut self, oversampling: usize) -> Self {
        self.options.oversampling = oversampling;
        self
    }

    pub fn with_power_iterations(mut self, power_iterations: usize) -> Self {
        self.options.power_iterations = power_iterations;
        self
    }

    pub fn n_factors(&self) -> usize {
        self.n_factors
    }

    pub fn model(&self) -> Option<&FactorModel> {
        self.model.as_ref()
    }
}

impl Predictor for MatrixFactorization {
    fn name(&self) -> &str {
        "matrix-factorization"
    }

    #[instrument(skip(self, train), fields(n_factors = self.n_factors, seed = self.options.seed))]
    fn fit(&mut self, train: &RatingMatrix) -> Result<()> {
        let start = Instant::now();
        let (m, n) = (train.n_users(), train.n_items());
        let max = m.min(n);
        if self.n_factors == 0 || self.n_factors > max {
            return Err(RecommenderError::InvalidRank {
                requested: self.n_factors,
                max,
            });
        }
        let global_mean = train.global_mean().ok_or_else(|| {
            RecommenderError::InsufficientData("cannot factorize a matrix with no ratings".to_string())
        })?;

        let mut residual = DenseMatrix::zeros(m, n);
        for (u, i, value) in train.cells() {
            residual.set(u, i, value - global_mean);
        }
        let svd = truncated_svd(&residual, self.n_factors, &self.options);

        let (users, movies) = train.id_tables();
        let model = FactorModel {
            users,
            movies,
            user_factors: svd.u,
            item_factors: svd.v,
            singular_values: svd.singular_values,
            global_mean,
        };
        info!(
            predictor = self.name(),
            rank = model.rank(),
            top_singular_value = model.singular_values.first().copied().unwrap_or(0.0),
            "Fitted in {:.2?}",
            start.elapsed()
        );
        self.model = Some(model);
        Ok(())
    }

    fn predict(&self, user_id: UserId, movie_id: MovieId) -> Result<f64> {
        let model = self.model.as_ref().ok_or_else(|| RecommenderError::NotFitted {
            predictor: self.name().to_string(),
        })?;
        Ok(model.predict(user_id, movie_id))
    }
}
