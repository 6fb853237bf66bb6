//! Top-N recommendations and similar-movie lookups.
//!
//! Recommendations are ranked over the full (pre-split) matrix: every movie
//! the user has not rated is scored by the supplied predictor. Similar
//! movies come from item-item cosine over the same matrix, computed on first
//! use and cached.

use crate::error::{RecommenderError, Result};
use crate::similarity::{Axis, SimilarityMatrix, pairwise_cosine};
use crate::store::RatingStore;
use crate::traits::Predictor;
use data_loader::{Movie, MovieId, UserId};
use rayon::prelude::*;
use serde::Serialize;
use std::collections::HashMap;
use std::sync::OnceLock;
use tracing::{debug, instrument};

/// Title used for movies missing from the catalog
pub const UNKNOWN_TITLE: &str = "<unknown>";

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Recommendation {
    pub movie_id: MovieId,
    pub title: String,
    pub genres: Vec<String>,
    pub predicted_rating: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SimilarMovie {
    pub movie_id: MovieId,
    pub title: String,
    pub similarity: f64,
}

/// Movie metadata keyed by id
#[derive(Debug, Clone, Default)]
pub struct MovieCatalog {
    movies: HashMap<MovieId, Movie>,
}

impl MovieCatalog {
    pub fn new(movies: &[Movie]) -> Self {
        Self {
            movies: movies.iter().map(|m| (m.id, m.clone())).collect(),
        }
    }

    pub fn get(&self, movie_id: MovieId) -> Option<&Movie> {
        self.movies.get(&movie_id)
    }

    pub fn len(&self) -> usize {
        self.movies.len()
    }

    pub fn is_empty(&self) -> bool {
        self.movies.is_empty()
    }

    fn title(&self, movie_id: MovieId) -> String {
        self.get(movie_id)
            .map(|m| m.title.clone())
            .unwrap_or_else(|| UNKNOWN_TITLE.to_string())
    }

    fn genres(&self, movie_id: MovieId) -> Vec<String> {
        self.get(movie_id)
            .map(|m| m.genres.iter().cloned().collect())
            .unwrap_or_default()
    }
}

pub struct RecommendationService {
    store: RatingStore,
    catalog: MovieCatalog,
    item_similarity: OnceLock<SimilarityMatrix>,
}

impl RecommendationService {
    pub fn new(store: RatingStore, catalog: MovieCatalog) -> Self {
        Self {
            store,
            catalog,
            item_similarity: OnceLock::new(),
        }
    }

    pub fn store(&self) -> &RatingStore {
        &self.store
    }

    pub fn catalog(&self) -> &MovieCatalog {
        &self.catalog
    }

    /// Up to `n` movies the user has not rated, best predicted first.
    ///
    /// Ties go to the lower movie id. Candidates the predictor cannot score
    /// are left out.
    ///
    /// # Errors
    /// * `UnknownEntity` if the user has no row in the full matrix
    #[instrument(skip(self, predictor), fields(predictor = predictor.name()))]
    pub fn recommend(
        &self,
        user_id: UserId,
        predictor: &dyn Predictor,
        n: usize,
    ) -> Result<Vec<Recommendation>> {
        let matrix = self.store.matrix();
        let u = matrix
            .user_index(user_id)
            .ok_or_else(|| RecommenderError::unknown_user(user_id))?;
        let rated = matrix.row(u);

        let candidates: Vec<MovieId> = matrix
            .movies()
            .ids()
            .iter()
            .enumerate()
            .filter(|(i, _)| rated.binary_search_by_key(i, |&(item, _)| item).is_err())
            .map(|(_, &movie_id)| movie_id)
            .collect();

        let scored: Vec<Option<(MovieId, f64)>> = candidates
            .par_iter()
            .map(|&movie_id| match predictor.predict(user_id, movie_id) {
                Ok(score) => Ok(Some((movie_id, score))),
                Err(RecommenderError::UnknownEntity { .. }) => Ok(None),
                Err(e) => Err(e),
            })
            .collect::<Result<_>>()?;
        let mut scored: Vec<(MovieId, f64)> = scored.into_iter().flatten().collect();
        scored.sort_by(|a, b| b.1.total_cmp(&a.1).then(a.0.cmp(&b.0)));
        scored.truncate(n);

        debug!(
            candidates = candidates.len(),
            returned = scored.len(),
            "Ranked candidates"
        );
        Ok(scored
            .into_iter()
            .map(|(movie_id, predicted_rating)| Recommendation {
                movie_id,
                title: self.catalog.title(movie_id),
                genres: self.catalog.genres(movie_id),
                predicted_rating,
            })
            .collect())
    }

    /// Up to `n` movies most similar to `movie_id` by item cosine, excluding
    /// the movie itself. Ties go to the lower movie id.
    ///
    /// # Errors
    /// * `UnknownEntity` if the movie has no column in the full matrix
    #[instrument(skip(self))]
    pub fn similar_items(&self, movie_id: MovieId, n: usize) -> Result<Vec<SimilarMovie>> {
        let matrix = self.store.matrix();
        let i = matrix
            .movie_index(movie_id)
            .ok_or_else(|| RecommenderError::unknown_movie(movie_id))?;
        let similarity = self
            .item_similarity
            .get_or_init(|| pairwise_cosine(matrix, Axis::Cols));

        let movies = matrix.movies();
        let mut neighbors: Vec<(MovieId, f64)> = similarity
            .neighbors(i)
            .iter()
            .filter_map(|&(j, sim)| movies.id_at(j).map(|id| (id, sim)))
            .collect();
        neighbors.sort_by(|a, b| b.1.total_cmp(&a.1).then(a.0.cmp(&b.0)));
        neighbors.truncate(n);

        Ok(neighbors
            .into_iter()
            .map(|(id, similarity)| SimilarMovie {
                movie_id: id,
                title: self.catalog.title(id),
                similarity,
            })
            .collect())
    }
}
