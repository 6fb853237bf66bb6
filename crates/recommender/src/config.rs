//! Engine configuration and predictor selection.

use crate::error::{RecommenderError, Result};
use crate::evaluate::{DEFAULT_RANKING_K, DEFAULT_RELEVANCE_THRESHOLD, Evaluator};
use crate::predictors::{
    DEFAULT_NEIGHBORS, GlobalMean, ItemBasedCF, MatrixFactorization, UserBasedCF,
};
use crate::split::Splitter;
use crate::traits::Predictor;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Every tunable of the engine.
///
/// Missing fields in a config file take their default.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Neighborhood size K for user/item CF
    pub neighbors: usize,
    /// Rank of the matrix factorization
    pub n_factors: usize,
    pub seed: u64,
    pub test_fraction: f64,
    pub relevance_threshold: f64,
    pub ranking_k: usize,
    pub oversampling: usize,
    pub power_iterations: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            neighbors: DEFAULT_NEIGHBORS,
            n_factors: 10,
            seed: 42,
            test_fraction: 0.2,
            relevance_threshold: DEFAULT_RELEVANCE_THRESHOLD,
            ranking_k: DEFAULT_RANKING_K,
            oversampling: 10,
            power_iterations: 2,
        }
    }
}

impl EngineConfig {
    /// Reject values no component accepts.
    ///
    /// `n_factors` is only checked for zero here; its upper bound depends on
    /// the matrix and is checked at fit time.
    pub fn validate(&self) -> Result<()> {
        let invalid = |name: &'static str, value: String| RecommenderError::InvalidParameter { name, value };
        if self.neighbors == 0 {
            return Err(invalid("neighbors", self.neighbors.to_string()));
        }
        if self.n_factors == 0 {
            return Err(RecommenderError::InvalidRank {
                requested: 0,
                max: 0,
            });
        }
        if !(self.test_fraction > 0.0 && self.test_fraction < 1.0) {
            return Err(invalid("test_fraction", self.test_fraction.to_string()));
        }
        if !self.relevance_threshold.is_finite() {
            return Err(invalid("relevance_threshold", self.relevance_threshold.to_string()));
        }
        if self.ranking_k == 0 {
            return Err(invalid("ranking_k", self.ranking_k.to_string()));
        }
        Ok(())
    }

    pub fn splitter(&self) -> Result<Splitter> {
        Ok(Splitter::new(self.test_fraction)?.with_seed(self.seed))
    }

    pub fn evaluator(&self) -> Evaluator {
        Evaluator::new()
            .with_relevance_threshold(self.relevance_threshold)
            .with_k(self.ranking_k)
    }

    /// Unfitted predictor for `algorithm`, configured from `self`
    pub fn build_predictor(&self, algorithm: Algorithm) -> Box<dyn Predictor> {
        match algorithm {
            Algorithm::UserBased => Box::new(UserBasedCF::new().with_neighbors(self.neighbors)),
            Algorithm::ItemBased => Box::new(ItemBasedCF::new().with_neighbors(self.neighbors)),
            Algorithm::MatrixFactorization => Box::new(
                MatrixFactorization::new(self.n_factors)
                    .with_seed(self.seed)
                    .with_oversampling(self.oversampling)
                    .with_power_iterations(self.power_iterations),
            ),
            Algorithm::GlobalMean => Box::new(GlobalMean::new()),
        }
    }

    /// One predictor per algorithm, in `Algorithm::ALL` order
    pub fn build_all(&self) -> Vec<Box<dyn Predictor>> {
        Algorithm::ALL
            .iter()
            .map(|&algorithm| self.build_predictor(algorithm))
            .collect()
    }
}

/// Available prediction strategies
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Algorithm {
    UserBased,
    ItemBased,
    MatrixFactorization,
    GlobalMean,
}

impl Algorithm {
    pub const ALL: [Algorithm; 4] = [
        Algorithm::UserBased,
        Algorithm::ItemBased,
        Algorithm::MatrixFactorization,
        Algorithm::GlobalMean,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Algorithm::UserBased => "user-based",
            Algorithm::ItemBased => "item-based",
            Algorithm::MatrixFactorization => "matrix-factorization",
            Algorithm::GlobalMean => "global-mean",
        }
    }
}

impl fmt::Display for Algorithm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Algorithm {
    type Err = RecommenderError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "user-based" | "user" => Ok(Algorithm::UserBased),
            "item-based" | "item" => Ok(Algorithm::ItemBased),
            "matrix-factorization" | "mf" | "svd" => Ok(Algorithm::MatrixFactorization),
            "global-mean" | "mean" => Ok(Algorithm::GlobalMean),
            other => Err(RecommenderError::InvalidParameter {
                name: "algorithm",
                value: other.to_string(),
            }),
        }
    }
}
