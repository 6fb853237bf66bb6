//! Error types for the recommendation engine.
//!
//! Dataset setup errors (`InvalidData`, `InsufficientData`) abort before any
//! training happens. Cold-start cases are not errors: predictors fall back to
//! mean ratings and only report `UnknownEntity` when no mean exists.

use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum RecommenderError {
    /// Malformed or out-of-range rating at ingestion
    #[error("Invalid rating data: {0}")]
    InvalidData(String),

    /// The train/test split cannot keep every test entity covered by train
    #[error("Insufficient data: {0}")]
    InsufficientData(String),

    /// Factorization rank outside `1..=min(M, N)`
    #[error("Invalid rank {requested}: must be between 1 and {max}")]
    InvalidRank { requested: usize, max: usize },

    /// Query references an id with no usable fallback
    #[error("Unknown {entity} with id {id}")]
    UnknownEntity { entity: &'static str, id: u32 },

    /// Every evaluation pair was unscorable
    #[error("No predictions could be scored ({skipped} pairs skipped)")]
    NoPredictions { skipped: usize },

    /// `predict` called before `fit`
    #[error("Predictor {predictor} has not been fitted")]
    NotFitted { predictor: String },

    /// Out-of-domain configuration value
    #[error("Invalid value for {name}: {value}")]
    InvalidParameter { name: &'static str, value: String },
}

impl RecommenderError {
    pub(crate) fn unknown_user(id: u32) -> Self {
        Self::UnknownEntity { entity: "user", id }
    }

    pub(crate) fn unknown_movie(id: u32) -> Self {
        Self::UnknownEntity { entity: "movie", id }
    }
}

/// Convenience type alias for Results in this crate
pub type Result<T> = std::result::Result<T, RecommenderError>;
