//! Neighborhood estimate shared by user-based and item-based CF.
//!
//! Item-based CF is user-based CF on the transposed matrix, so both keep the
//! same fitted state and differ only in which axis the similarities and the
//! candidate raters come from.

use crate::error::{RecommenderError, Result};
use crate::similarity::{Axis, SimilarityMatrix, pairwise_cosine};
use crate::store::{Entry, RatingMatrix};
use crate::traits::clamp_rating;
use data_loader::{MovieId, UserId};
use std::time::Instant;
use tracing::info;

/// Default neighborhood size K
pub const DEFAULT_NEIGHBORS: usize = 20;

pub(crate) fn check_neighbors(neighbors: usize) -> Result<()> {
    if neighbors == 0 {
        return Err(RecommenderError::InvalidParameter {
            name: "neighbors",
            value: neighbors.to_string(),
        });
    }
    Ok(())
}

/// Train matrix plus the similarities over one of its axes
#[derive(Debug, Clone)]
pub(crate) struct NeighborhoodModel {
    train: RatingMatrix,
    similarity: SimilarityMatrix,
}

impl NeighborhoodModel {
    pub(crate) fn fit(name: &str, train: &RatingMatrix, axis: Axis) -> Self {
        let start = Instant::now();
        let similarity = pairwise_cosine(train, axis);
        info!(
            predictor = name,
            entities = similarity.len(),
            pairs = similarity.stored_pairs(),
            "Fitted in {:.2?}",
            start.elapsed()
        );
        Self {
            train: train.clone(),
            similarity,
        }
    }

    pub(crate) fn similarity(&self) -> &SimilarityMatrix {
        &self.similarity
    }

    /// Neighborhood prediction, falling back to the movie's mean rating and
    /// then to the global mean.
    pub(crate) fn predict(&self, user_id: UserId, movie_id: MovieId, k: usize) -> Result<f64> {
        let u = self.train.user_index(user_id);
        let i = self.train.movie_index(movie_id);

        if let (Some(u), Some(i)) = (u, i) {
            let estimate = match self.similarity.axis() {
                Axis::Rows => weighted_average(&self.similarity, u, self.train.col(i), k),
                Axis::Cols => weighted_average(&self.similarity, i, self.train.row(u), k),
            };
            if let Some(value) = estimate {
                return Ok(clamp_rating(value));
            }
        }

        i.and_then(|i| self.train.item_mean(i))
            .or_else(|| self.train.global_mean())
            .map(clamp_rating)
            .ok_or_else(|| {
                if u.is_none() {
                    RecommenderError::unknown_user(user_id)
                } else {
                    RecommenderError::unknown_movie(movie_id)
                }
            })
    }
}

/// `Σ sim·r / Σ |sim|` over the `k` most similar raters with positive
/// similarity to `target`; ties go to the lower index.
///
/// `raters` are `(entity, rating)` pairs on the similarity axis. `None` when
/// no rater qualifies.
pub(crate) fn weighted_average(
    similarity: &SimilarityMatrix,
    target: usize,
    raters: &[Entry],
    k: usize,
) -> Option<f64> {
    let mut scored: Vec<(usize, f64, f64)> = raters
        .iter()
        .filter(|&&(n, _)| n != target)
        .map(|&(n, rating)| (n, similarity.get(target, n), rating))
        .filter(|&(_, sim, _)| sim > 0.0)
        .collect();
    scored.sort_by(|a, b| b.1.total_cmp(&a.1).then(a.0.cmp(&b.0)));
    scored.truncate(k);

    let weight: f64 = scored.iter().map(|&(_, sim, _)| sim.abs()).sum();
    if weight == 0.0 {
        return None;
    }
    let total: f64 = scored.iter().map(|&(_, sim, rating)| sim * rating).sum();
    Some(total / weight)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::RatingStore;
    use data_loader::Rating;

    fn store() -> RatingStore {
        RatingStore::build(&[
            Rating::new(1, 1, 5.0, 0),
            Rating::new(1, 2, 4.0, 0),
            Rating::new(2, 1, 2.0, 0),
            Rating::new(2, 2, 1.0, 0),
            Rating::new(3, 1, 4.0, 0),
            Rating::new(3, 2, 5.0, 0),
            Rating::new(3, 3, 3.0, 0),
        ])
        .unwrap()
    }

    #[test]
    fn test_weighted_average_top_k() {
        let store = store();
        let sims = pairwise_cosine(store.matrix(), Axis::Rows);
        let raters = store.matrix().col(0);

        // Target user 3 (index 2) excludes itself from the raters of movie 1
        let all = weighted_average(&sims, 2, raters, 20).unwrap();
        let s0 = sims.get(2, 0);
        let s1 = sims.get(2, 1);
        let expected = (s0 * 5.0 + s1 * 2.0) / (s0 + s1);
        assert!((all - expected).abs() < 1e-12);

        // With K = 1 only the most similar neighbor remains
        assert!(s0 > s1);
        let best = weighted_average(&sims, 2, raters, 1).unwrap();
        assert!((best - 5.0).abs() < 1e-12);
    }

    #[test]
    fn test_weighted_average_without_neighbors() {
        let store = store();
        let sims = pairwise_cosine(store.matrix(), Axis::Rows);
        assert_eq!(weighted_average(&sims, 0, &[(0, 5.0)], 20), None);
        assert_eq!(weighted_average(&sims, 0, &[], 20), None);
    }

    #[test]
    fn test_check_neighbors() {
        assert!(check_neighbors(1).is_ok());
        assert!(matches!(
            check_neighbors(0),
            Err(RecommenderError::InvalidParameter { name: "neighbors", .. })
        ));
    }
}
