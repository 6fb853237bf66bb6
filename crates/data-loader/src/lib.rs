//! # Data Loader Crate
//!
//! Supplies the recommendation engine with parsed records: ratings
//! `(user_id, movie_id, rating, timestamp)` and movies `(movie_id, title, genres)`.
//!
//! ## Main Components
//!
//! - **types**: Record types (Rating, Movie, Dataset) and id aliases
//! - **parser**: MovieLens `.dat` and `.csv` parsing
//! - **loader**: Locate and load a MovieLens directory
//! - **sample**: Seeded synthetic dataset generator
//! - **error**: Error types for data loading
//!
//! ## Example Usage
//!
//! ```ignore
//! use data_loader::Dataset;
//! use std::path::Path;
//!
//! let dataset = Dataset::load_from_dir(Path::new("data/ml-1m"))?;
//! let (movies, ratings) = dataset.counts();
//! println!("{} ratings over {} movies", ratings, movies);
//! ```

pub mod error;
pub mod loader;
pub mod parser;
pub mod sample;
pub mod types;

// Re-export commonly used types for convenience
pub use error::{DataLoadError, Result};
pub use sample::SampleConfig;
pub use types::{Dataset, GENRES, Movie, MovieId, Rating, UserId};
