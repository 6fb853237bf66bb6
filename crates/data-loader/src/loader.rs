//! Loading a MovieLens directory into a `Dataset`.

use crate::error::{DataLoadError, Result};
use crate::parser;
use crate::types::Dataset;
use std::path::{Path, PathBuf};
use std::time::Instant;
use tracing::info;

/// The two supported on-disk layouts, probed in this order
const LAYOUTS: [(&str, &str); 2] = [
    ("ratings.dat", "movies.dat"),
    ("ratings.csv", "movies.csv"),
];

impl Dataset {
    /// Load a MovieLens dataset from a directory.
    ///
    /// Accepts either the ML-1M `.dat` layout or the ml-latest `.csv` layout.
    /// The ratings and movies files are parsed in parallel.
    pub fn load_from_dir(data_dir: &Path) -> Result<Self> {
        let (ratings_path, movies_path) = locate_files(data_dir)?;
        info!("Loading MovieLens dataset from {:?}", data_dir);
        let start = Instant::now();

        let (ratings, movies) = rayon::join(
            || parser::parse_ratings(&ratings_path),
            || parser::parse_movies(&movies_path),
        );
        let ratings = ratings?;
        let movies = movies?;

        info!(
            ratings = ratings.len(),
            movies = movies.len(),
            "Dataset loaded in {:.2?}",
            start.elapsed()
        );
        Ok(Dataset::new(ratings, movies))
    }
}

fn locate_files(data_dir: &Path) -> Result<(PathBuf, PathBuf)> {
    LAYOUTS
        .iter()
        .map(|(ratings, movies)| (data_dir.join(ratings), data_dir.join(movies)))
        .find(|(ratings, movies)| ratings.is_file() && movies.is_file())
        .ok_or_else(|| DataLoadError::DatasetNotFound {
            path: data_dir.display().to_string(),
        })
}
