//! RatingStore: the sparse user × movie rating matrix.
//!
//! Users and movies are mapped to dense indices in first-seen order, so the
//! same input always produces the same matrix. Unrated cells are simply
//! absent; a missing rating is never stored as 0.

use crate::error::{RecommenderError, Result};
use data_loader::{MovieId, Rating, UserId};
use serde::Serialize;
use std::collections::HashMap;
use std::hash::Hash;
use std::sync::Arc;
use tracing::{info, instrument};

/// Lowest valid rating
pub const MIN_RATING: f64 = 1.0;
/// Highest valid rating
pub const MAX_RATING: f64 = 5.0;

/// One stored cell seen from a row or column: `(index on the other axis, rating)`
pub type Entry = (usize, f64);

// =============================================================================
// IdIndex
// =============================================================================

/// Bidirectional id <-> index table.
#[derive(Debug, Clone)]
pub struct IdIndex<T> {
    ids: Vec<T>,
    positions: HashMap<T, usize>,
}

impl<T: Copy + Eq + Hash> IdIndex<T> {
    pub fn new() -> Self {
        Self {
            ids: Vec::new(),
            positions: HashMap::new(),
        }
    }

    /// Index for `id`, assigning the next free one on first sight
    fn insert(&mut self, id: T) -> usize {
        if let Some(&index) = self.positions.get(&id) {
            return index;
        }
        let index = self.ids.len();
        self.ids.push(id);
        self.positions.insert(id, index);
        index
    }

    pub fn index_of(&self, id: T) -> Option<usize> {
        self.positions.get(&id).copied()
    }

    pub fn id_at(&self, index: usize) -> Option<T> {
        self.ids.get(index).copied()
    }

    /// All ids, ordered by index
    pub fn ids(&self) -> &[T] {
        &self.ids
    }

    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }
}

impl<T: Copy + Eq + Hash> Default for IdIndex<T> {
    fn default() -> Self {
        Self::new()
    }
}

// =============================================================================
// RatingMatrix
// =============================================================================

/// Sparse M × N rating matrix with row (user) and column (movie) views.
///
/// Rows and columns are each sorted by the index on the other axis. The id
/// tables are shared (`Arc`) between every matrix derived from one store, so
/// a train matrix has exactly the same shape as the full one.
#[derive(Debug, Clone)]
pub struct RatingMatrix {
    users: Arc<IdIndex<UserId>>,
    movies: Arc<IdIndex<MovieId>>,
    rows: Vec<Vec<Entry>>,
    cols: Vec<Vec<Entry>>,
    stored: usize,
    sum: f64,
}

impl RatingMatrix {
    fn from_cells(
        users: Arc<IdIndex<UserId>>,
        movies: Arc<IdIndex<MovieId>>,
        cells: Vec<(usize, usize, f64)>,
    ) -> Result<Self> {
        let mut rows: Vec<Vec<Entry>> = vec![Vec::new(); users.len()];
        for (u, i, value) in cells {
            rows[u].push((i, value));
        }

        for (u, row) in rows.iter_mut().enumerate() {
            row.sort_by_key(|&(i, _)| i);
            if let Some(pair) = row.windows(2).find(|pair| pair[0].0 == pair[1].0) {
                return Err(RecommenderError::InvalidData(format!(
                    "duplicate rating for user {} and movie {}",
                    users.ids()[u],
                    movies.ids()[pair[0].0]
                )));
            }
        }

        // Walking rows in index order leaves every column sorted by user index
        let mut cols: Vec<Vec<Entry>> = vec![Vec::new(); movies.len()];
        for (u, row) in rows.iter().enumerate() {
            for &(i, value) in row {
                cols[i].push((u, value));
            }
        }

        let stored = rows.iter().map(Vec::len).sum();
        let sum = rows.iter().flatten().map(|&(_, value)| value).sum();
        Ok(Self {
            users,
            movies,
            rows,
            cols,
            stored,
            sum,
        })
    }

    /// M
    pub fn n_users(&self) -> usize {
        self.users.len()
    }

    /// N
    pub fn n_items(&self) -> usize {
        self.movies.len()
    }

    pub fn stored_cells(&self) -> usize {
        self.stored
    }

    /// True when no cell is stored (the shape may still be non-zero)
    pub fn is_empty(&self) -> bool {
        self.stored == 0
    }

    pub fn users(&self) -> &IdIndex<UserId> {
        &self.users
    }

    pub fn movies(&self) -> &IdIndex<MovieId> {
        &self.movies
    }

    pub fn user_index(&self, user_id: UserId) -> Option<usize> {
        self.users.index_of(user_id)
    }

    pub fn movie_index(&self, movie_id: MovieId) -> Option<usize> {
        self.movies.index_of(movie_id)
    }

    /// Ratings given by user index `u`, as `(item_index, rating)`
    pub fn row(&self, u: usize) -> &[Entry] {
        self.rows.get(u).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Ratings received by item index `i`, as `(user_index, rating)`
    pub fn col(&self, i: usize) -> &[Entry] {
        self.cols.get(i).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Shared id tables, for models that outlive the matrix
    pub(crate) fn id_tables(&self) -> (Arc<IdIndex<UserId>>, Arc<IdIndex<MovieId>>) {
        (Arc::clone(&self.users), Arc::clone(&self.movies))
    }

    pub(crate) fn rows(&self) -> &[Vec<Entry>] {
        &self.rows
    }

    pub(crate) fn cols(&self) -> &[Vec<Entry>] {
        &self.cols
    }

    /// Row view for a user id; empty when the user is unknown
    pub fn rows_for_user(&self, user_id: UserId) -> &[Entry] {
        self.user_index(user_id)
            .map(|u| self.row(u))
            .unwrap_or(&[])
    }

    /// Column view for a movie id; empty when the movie is unknown
    pub fn cols_for_item(&self, movie_id: MovieId) -> &[Entry] {
        self.movie_index(movie_id)
            .map(|i| self.col(i))
            .unwrap_or(&[])
    }

    /// Stored rating at `(u, i)`
    pub fn get(&self, u: usize, i: usize) -> Option<f64> {
        let row = self.row(u);
        row.binary_search_by_key(&i, |&(item, _)| item)
            .ok()
            .map(|pos| row[pos].1)
    }

    /// Stored rating for a `(user_id, movie_id)` pair
    pub fn rating(&self, user_id: UserId, movie_id: MovieId) -> Option<f64> {
        self.get(self.user_index(user_id)?, self.movie_index(movie_id)?)
    }

    /// Mean over every stored rating
    pub fn global_mean(&self) -> Option<f64> {
        (self.stored > 0).then(|| self.sum / self.stored as f64)
    }

    /// Mean rating of item index `i`
    pub fn item_mean(&self, i: usize) -> Option<f64> {
        let col = self.col(i);
        if col.is_empty() {
            return None;
        }
        Some(col.iter().map(|&(_, value)| value).sum::<f64>() / col.len() as f64)
    }

    /// Fraction of user × movie cells without a rating
    pub fn sparsity(&self) -> f64 {
        let cells = self.n_users() * self.n_items();
        if cells == 0 {
            return 1.0;
        }
        1.0 - self.stored as f64 / cells as f64
    }

    /// Every stored cell as `(user_index, item_index, rating)`, row by row
    pub fn cells(&self) -> impl Iterator<Item = (usize, usize, f64)> + '_ {
        self.rows
            .iter()
            .enumerate()
            .flat_map(|(u, row)| row.iter().map(move |&(i, value)| (u, i, value)))
    }
}

// =============================================================================
// RatingStore
// =============================================================================

/// Summary statistics exposed to the CLI
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct DatasetSummary {
    pub users: usize,
    pub movies: usize,
    pub ratings: usize,
    pub sparsity: f64,
}

/// Validated ratings plus the full rating matrix built from them.
///
/// Built once per dataset and immutable afterwards.
#[derive(Debug, Clone)]
pub struct RatingStore {
    ratings: Vec<Rating>,
    matrix: RatingMatrix,
}

impl RatingStore {
    /// Validate `ratings` and build the full matrix.
    ///
    /// Fails with `InvalidData` on empty input, a rating outside `[1, 5]`,
    /// or a repeated `(user_id, movie_id)` pair.
    #[instrument(skip(ratings), fields(ratings = ratings.len()))]
    pub fn build(ratings: &[Rating]) -> Result<Self> {
        if ratings.is_empty() {
            return Err(RecommenderError::InvalidData(
                "no ratings supplied".to_string(),
            ));
        }

        let mut users = IdIndex::new();
        let mut movies = IdIndex::new();
        let mut cells = Vec::with_capacity(ratings.len());
        for rating in ratings {
            let value = validate_rating(rating)?;
            cells.push((users.insert(rating.user_id), movies.insert(rating.movie_id), value));
        }

        let matrix = RatingMatrix::from_cells(Arc::new(users), Arc::new(movies), cells)?;
        info!(
            users = matrix.n_users(),
            movies = matrix.n_items(),
            ratings = matrix.stored_cells(),
            sparsity = matrix.sparsity(),
            "Built rating matrix"
        );
        Ok(Self {
            ratings: ratings.to_vec(),
            matrix,
        })
    }

    /// Build a matrix over a subset of ratings with the store's full shape.
    ///
    /// Used for train matrices: indices are identical to `matrix()`.
    pub fn matrix_from(&self, ratings: &[Rating]) -> Result<RatingMatrix> {
        let mut cells = Vec::with_capacity(ratings.len());
        for rating in ratings {
            let value = validate_rating(rating)?;
            let u = self
                .matrix
                .user_index(rating.user_id)
                .ok_or_else(|| RecommenderError::unknown_user(rating.user_id))?;
            let i = self
                .matrix
                .movie_index(rating.movie_id)
                .ok_or_else(|| RecommenderError::unknown_movie(rating.movie_id))?;
            cells.push((u, i, value));
        }
        RatingMatrix::from_cells(
            Arc::clone(&self.matrix.users),
            Arc::clone(&self.matrix.movies),
            cells,
        )
    }

    /// The full matrix
    pub fn matrix(&self) -> &RatingMatrix {
        &self.matrix
    }

    /// The validated input ratings, in input order
    pub fn ratings(&self) -> &[Rating] {
        &self.ratings
    }

    /// `1 - stored_cells / (M * N)`
    pub fn sparsity(&self) -> f64 {
        self.matrix.sparsity()
    }

    pub fn rows_for_user(&self, user_id: UserId) -> &[Entry] {
        self.matrix.rows_for_user(user_id)
    }

    pub fn cols_for_item(&self, movie_id: MovieId) -> &[Entry] {
        self.matrix.cols_for_item(movie_id)
    }

    pub fn summary(&self) -> DatasetSummary {
        DatasetSummary {
            users: self.matrix.n_users(),
            movies: self.matrix.n_items(),
            ratings: self.matrix.stored_cells(),
            sparsity: self.sparsity(),
        }
    }
}

fn validate_rating(rating: &Rating) -> Result<f64> {
    let value = f64::from(rating.rating);
    if !(MIN_RATING..=MAX_RATING).contains(&value) {
        return Err(RecommenderError::InvalidData(format!(
            "rating {} by user {} for movie {} is outside [{}, {}]",
            rating.rating, rating.user_id, rating.movie_id, MIN_RATING, MAX_RATING
        )));
    }
    Ok(value)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ratings() -> Vec<Rating> {
        vec![
            Rating::new(10, 100, 5.0, 1),
            Rating::new(10, 200, 4.0, 2),
            Rating::new(20, 100, 5.0, 3),
            Rating::new(20, 200, 1.0, 4),
            Rating::new(30, 200, 5.0, 5),
            Rating::new(30, 300, 4.0, 6),
        ]
    }

    #[test]
    fn test_first_seen_indices() {
        let store = RatingStore::build(&ratings()).unwrap();
        let matrix = store.matrix();

        assert_eq!(matrix.users().ids(), &[10, 20, 30]);
        assert_eq!(matrix.movies().ids(), &[100, 200, 300]);
        assert_eq!(matrix.user_index(30), Some(2));
        assert_eq!(matrix.movies().id_at(1), Some(200));
        assert_eq!(matrix.user_index(99), None);
    }

    #[test]
    fn test_build_is_deterministic() {
        let a = RatingStore::build(&ratings()).unwrap();
        let b = RatingStore::build(&ratings()).unwrap();

        assert_eq!(a.matrix().users().ids(), b.matrix().users().ids());
        assert_eq!(a.matrix().movies().ids(), b.matrix().movies().ids());
        assert_eq!(a.sparsity(), b.sparsity());
    }

    #[test]
    fn test_sparsity() {
        let store = RatingStore::build(&ratings()).unwrap();
        // 6 of 9 cells rated
        assert_eq!(store.sparsity(), 1.0 - 6.0 / 9.0);

        let summary = store.summary();
        assert_eq!((summary.users, summary.movies, summary.ratings), (3, 3, 6));
    }

    #[test]
    fn test_row_and_column_views() {
        let store = RatingStore::build(&ratings()).unwrap();

        assert_eq!(store.rows_for_user(10), &[(0, 5.0), (1, 4.0)]);
        assert_eq!(store.cols_for_item(200), &[(0, 4.0), (1, 1.0), (2, 5.0)]);
        assert!(store.rows_for_user(99).is_empty());
        assert_eq!(store.matrix().rating(30, 300), Some(4.0));
        assert_eq!(store.matrix().rating(10, 300), None);
    }

    #[test]
    fn test_means() {
        let store = RatingStore::build(&ratings()).unwrap();
        let matrix = store.matrix();

        assert!((matrix.global_mean().unwrap() - 24.0 / 6.0).abs() < 1e-12);
        assert_eq!(matrix.item_mean(0), Some(5.0));
        assert!((matrix.item_mean(1).unwrap() - 10.0 / 3.0).abs() < 1e-12);
    }

    #[test]
    fn test_rejects_empty_input() {
        let err = RatingStore::build(&[]).unwrap_err();
        assert!(matches!(err, RecommenderError::InvalidData(_)));
    }

    #[test]
    fn test_rejects_out_of_range() {
        for bad in [0.5, 5.5, f32::NAN] {
            let err = RatingStore::build(&[Rating::new(1, 1, bad, 0)]).unwrap_err();
            assert!(matches!(err, RecommenderError::InvalidData(_)));
        }
    }

    #[test]
    fn test_rejects_duplicate_pair() {
        let input = vec![Rating::new(1, 1, 3.0, 0), Rating::new(1, 1, 4.0, 1)];
        let err = RatingStore::build(&input).unwrap_err();
        assert!(matches!(err, RecommenderError::InvalidData(_)));
    }

    #[test]
    fn test_matrix_from_keeps_shape() {
        let store = RatingStore::build(&ratings()).unwrap();
        let subset = store.matrix_from(&ratings()[..2]).unwrap();

        assert_eq!(subset.n_users(), 3);
        assert_eq!(subset.n_items(), 3);
        assert_eq!(subset.stored_cells(), 2);
        assert!(subset.rows_for_user(30).is_empty());
        assert_eq!(subset.user_index(30), store.matrix().user_index(30));

        let empty = store.matrix_from(&[]).unwrap();
        assert!(empty.is_empty());
        assert_eq!(empty.global_mean(), None);
    }

    #[test]
    fn test_matrix_from_unknown_id() {
        let store = RatingStore::build(&ratings()).unwrap();
        let err = store.matrix_from(&[Rating::new(99, 100, 3.0, 0)]).unwrap_err();
        assert_eq!(err, RecommenderError::UnknownEntity { entity: "user", id: 99 });
    }
}
