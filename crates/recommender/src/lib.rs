//! Collaborative-filtering recommendation engine.
//!
//! This crate provides:
//! - RatingStore: the sparse user × movie rating matrix with id lookups
//! - Splitter: seeded train/test partitioning that keeps matrix shape
//! - SimilarityEngine: cosine similarity over co-rated entries
//! - Predictors: user-based CF, item-based CF, matrix factorization (SVD)
//!   and a global-mean baseline, all behind the `Predictor` trait
//! - Evaluator: RMSE/MAE, ranking metrics and side-by-side comparison
//! - RecommendationService: top-N recommendations and similar movies
//!
//! ## Data Flow
//! 1. Ratings are validated into a `RatingStore`
//! 2. `Splitter` divides them into train and test ratings
//! 3. Predictors are fit on the train matrix
//! 4. `Evaluator` scores them on the test ratings
//! 5. `RecommendationService` serves recommendations from any fitted predictor
//!
//! ## Example Usage
//! ```ignore
//! use recommender::{EngineConfig, RatingStore, Algorithm, RecommendationService, MovieCatalog};
//!
//! let config = EngineConfig::default();
//! let store = RatingStore::build(&dataset.ratings)?;
//! let split = config.splitter()?.split(store.ratings())?;
//! let train = store.matrix_from(&split.train)?;
//!
//! let mut predictors = config.build_all();
//! let table = config.evaluator().compare(&mut predictors, &train, &split.test)?;
//!
//! let mut predictor = config.build_predictor(Algorithm::ItemBased);
//! predictor.fit(store.matrix())?;
//! let service = RecommendationService::new(store, MovieCatalog::new(&dataset.movies));
//! let top = service.recommend(42, predictor.as_ref(), 10)?;
//! ```

pub mod config;
pub mod error;
pub mod evaluate;
pub mod linalg;
pub mod metrics;
pub mod predictors;
pub mod recommend;
pub mod similarity;
pub mod split;
pub mod store;
pub mod traits;

// Re-export main types
pub use config::{Algorithm, EngineConfig};
pub use error::{RecommenderError, Result};
pub use evaluate::{ComparisonRow, Evaluation, Evaluator, RankingReport};
pub use predictors::{FactorModel, GlobalMean, ItemBasedCF, MatrixFactorization, UserBasedCF};
pub use recommend::{MovieCatalog, Recommendation, RecommendationService, SimilarMovie};
pub use similarity::{Axis, SimilarityMatrix, pairwise_cosine};
pub use split::{Splitter, TrainTestSplit};
pub use store::{DatasetSummary, RatingMatrix, RatingStore};
pub use traits::Predictor;
