//! Seeded per-rating train/test partitioning.
//!
//! Ratings are visited in a seeded random order and moved to the test side
//! only while their user and their movie each keep at least one rating in
//! train. An entity with a single rating therefore always stays in train.

use crate::error::{RecommenderError, Result};
use data_loader::{MovieId, Rating, UserId};
use rand::SeedableRng;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use std::collections::HashMap;
use tracing::{debug, instrument, warn};

/// Disjoint train and test ratings whose union is the input.
///
/// Both sides keep the input order.
#[derive(Debug, Clone, PartialEq)]
pub struct TrainTestSplit {
    pub train: Vec<Rating>,
    pub test: Vec<Rating>,
}

#[derive(Debug, Clone, Copy)]
pub struct Splitter {
    test_fraction: f64,
    seed: u64,
}

impl Splitter {
    /// `test_fraction` must lie strictly between 0 and 1
    pub fn new(test_fraction: f64) -> Result<Self> {
        if !(test_fraction > 0.0 && test_fraction < 1.0) {
            return Err(RecommenderError::InvalidParameter {
                name: "test_fraction",
                value: test_fraction.to_string(),
            });
        }
        Ok(Self {
            test_fraction,
            seed: 42,
        })
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    pub fn test_fraction(&self) -> f64 {
        self.test_fraction
    }

    #[instrument(skip(self, ratings), fields(ratings = ratings.len(), seed = self.seed))]
    pub fn split(&self, ratings: &[Rating]) -> Result<TrainTestSplit> {
        let n = ratings.len();
        if n < 2 {
            return Err(RecommenderError::InsufficientData(format!(
                "need at least 2 ratings to split, got {}",
                n
            )));
        }
        let target = ((n as f64 * self.test_fraction).round() as usize).clamp(1, n - 1);

        let mut user_counts: HashMap<UserId, usize> = HashMap::new();
        let mut movie_counts: HashMap<MovieId, usize> = HashMap::new();
        for rating in ratings {
            *user_counts.entry(rating.user_id).or_default() += 1;
            *movie_counts.entry(rating.movie_id).or_default() += 1;
        }

        let mut order: Vec<usize> = (0..n).collect();
        order.shuffle(&mut StdRng::seed_from_u64(self.seed));

        let mut in_test = vec![false; n];
        let mut test_size = 0;
        for idx in order {
            if test_size == target {
                break;
            }
            let rating = &ratings[idx];
            let user_left = user_counts.get(&rating.user_id).copied().unwrap_or(0);
            let movie_left = movie_counts.get(&rating.movie_id).copied().unwrap_or(0);
            if user_left > 1 && movie_left > 1 {
                in_test[idx] = true;
                test_size += 1;
                user_counts.insert(rating.user_id, user_left - 1);
                movie_counts.insert(rating.movie_id, movie_left - 1);
            }
        }

        if test_size == 0 {
            return Err(RecommenderError::InsufficientData(
                "every rating is the last one for its user or movie".to_string(),
            ));
        }
        if test_size < target {
            warn!(
                requested = target,
                actual = test_size,
                "Test partition smaller than requested to keep entities in train"
            );
        }

        let (test, train): (Vec<_>, Vec<_>) = ratings
            .iter()
            .zip(&in_test)
            .partition(|&(_, &is_test)| is_test);
        let split = TrainTestSplit {
            train: train.into_iter().map(|(r, _)| *r).collect(),
            test: test.into_iter().map(|(r, _)| *r).collect(),
        };
        debug!(
            train = split.train.len(),
            test = split.test.len(),
            "Split ratings"
        );
        Ok(split)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    /// 20 users × 5 movies, every user rates every movie
    fn hundred_ratings() -> Vec<Rating> {
        (1..=20)
            .flat_map(|u| (1..=5).map(move |m| Rating::new(u, m, ((u + m) % 5 + 1) as f32, 0)))
            .collect()
    }

    #[test]
    fn test_rejects_fraction_outside_unit_interval() {
        for fraction in [0.0, 1.0, -0.5, f64::NAN] {
            assert!(matches!(
                Splitter::new(fraction),
                Err(RecommenderError::InvalidParameter { .. })
            ));
        }
    }

    #[test]
    fn test_split_sizes_and_disjoint_union() {
        let ratings = hundred_ratings();
        let split = Splitter::new(0.2).unwrap().split(&ratings).unwrap();

        assert_eq!(split.test.len(), 20);
        assert_eq!(split.train.len() + split.test.len(), ratings.len());

        let key = |r: &Rating| (r.user_id, r.movie_id);
        let train: HashSet<_> = split.train.iter().map(key).collect();
        let test: HashSet<_> = split.test.iter().map(key).collect();
        assert!(train.is_disjoint(&test));
        assert_eq!(train.len() + test.len(), ratings.len());
    }

    #[test]
    fn test_every_user_keeps_train_ratings() {
        let split = Splitter::new(0.2)
            .unwrap()
            .with_seed(9)
            .split(&hundred_ratings())
            .unwrap();

        let train_users: HashSet<_> = split.train.iter().map(|r| r.user_id).collect();
        let train_movies: HashSet<_> = split.train.iter().map(|r| r.movie_id).collect();
        for rating in &split.test {
            assert!(train_users.contains(&rating.user_id));
            assert!(train_movies.contains(&rating.movie_id));
        }
        assert_eq!(train_users.len(), 20);
    }

    #[test]
    fn test_split_is_reproducible() {
        let ratings = hundred_ratings();
        let splitter = Splitter::new(0.3).unwrap().with_seed(5);
        assert_eq!(
            splitter.split(&ratings).unwrap(),
            splitter.split(&ratings).unwrap()
        );
    }

    #[test]
    fn test_singletons_stay_in_train() {
        let ratings = vec![
            Rating::new(1, 1, 4.0, 0),
            Rating::new(1, 2, 3.0, 0),
            Rating::new(2, 1, 5.0, 0),
            Rating::new(2, 2, 2.0, 0),
            Rating::new(3, 9, 1.0, 0),
        ];
        let split = Splitter::new(0.5).unwrap().split(&ratings).unwrap();

        assert!(split.train.contains(&Rating::new(3, 9, 1.0, 0)));
        assert!(!split.test.is_empty());
    }

    #[test]
    fn test_insufficient_data() {
        let one = [Rating::new(1, 1, 4.0, 0)];
        assert!(matches!(
            Splitter::new(0.2).unwrap().split(&one),
            Err(RecommenderError::InsufficientData(_))
        ));

        // Two users, two different movies: nothing can leave train
        let disjoint = [Rating::new(1, 1, 4.0, 0), Rating::new(2, 2, 3.0, 0)];
        assert!(matches!(
            Splitter::new(0.5).unwrap().split(&disjoint),
            Err(RecommenderError::InsufficientData(_))
        ));
    }
}
