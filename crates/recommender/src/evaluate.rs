//! Scoring predictors against held-out ratings.
//!
//! `evaluate` gives RMSE/MAE over every scorable test rating, `ranking`
//! gives per-user precision/recall/NDCG at K, and `compare` fits a set of
//! predictors concurrently and tabulates their accuracy.

use crate::error::{RecommenderError, Result};
use crate::metrics;
use crate::store::RatingMatrix;
use crate::traits::Predictor;
use data_loader::{MovieId, Rating, UserId};
use rayon::prelude::*;
use serde::Serialize;
use std::collections::BTreeMap;
use std::time::Instant;
use tracing::{debug, info, instrument, warn};

/// Default relevance threshold for ranking metrics
pub const DEFAULT_RELEVANCE_THRESHOLD: f64 = 4.0;
/// Default list length for ranking metrics
pub const DEFAULT_RANKING_K: usize = 10;

/// Accuracy of one predictor on one test set
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Evaluation {
    pub rmse: f64,
    pub mae: f64,
    /// Scored predictions, in test-set order
    pub predictions: Vec<f64>,
    /// Actual ratings matching `predictions`
    pub actuals: Vec<f64>,
    /// Test ratings the predictor could not score
    pub skipped: usize,
}

impl Evaluation {
    pub fn evaluated(&self) -> usize {
        self.predictions.len()
    }
}

/// Ranking quality averaged over users
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RankingReport {
    pub k: usize,
    pub precision_at_k: f64,
    /// Averaged over users with at least one relevant test item
    pub recall_at_k: f64,
    /// Averaged over users with at least one relevant test item
    pub ndcg_at_k: f64,
    /// Users with at least one scored test item
    pub users: usize,
}

/// One line of the comparison table
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ComparisonRow {
    pub algorithm: String,
    pub rmse: f64,
    pub mae: f64,
    pub evaluated: usize,
    pub skipped: usize,
    pub fit_millis: u64,
}

/// Per-user ranking scores; recall and NDCG only exist with relevant items
struct UserRanking {
    precision: f64,
    relevant: Option<(f64, f64)>,
}

#[derive(Debug, Clone, Copy)]
pub struct Evaluator {
    relevance_threshold: f64,
    k: usize,
}

impl Default for Evaluator {
    fn default() -> Self {
        Self::new()
    }
}

impl Evaluator {
    pub fn new() -> Self {
        Self {
            relevance_threshold: DEFAULT_RELEVANCE_THRESHOLD,
            k: DEFAULT_RANKING_K,
        }
    }

    /// Test ratings at or above `threshold` count as relevant
    pub fn with_relevance_threshold(mut self, threshold: f64) -> Self {
        self.relevance_threshold = threshold;
        self
    }

    pub fn with_k(mut self, k: usize) -> Self {
        self.k = k;
        self
    }

    /// RMSE and MAE of `predictor` over `test`.
    ///
    /// Ratings whose user or movie the predictor cannot score are skipped
    /// and counted. Any other prediction error aborts the evaluation.
    ///
    /// # Errors
    /// * `NoPredictions` if every rating was skipped
    #[instrument(skip(self, predictor, test), fields(predictor = predictor.name(), test = test.len()))]
    pub fn evaluate(&self, predictor: &dyn Predictor, test: &[Rating]) -> Result<Evaluation> {
        let outcomes: Vec<Result<f64>> = test
            .par_iter()
            .map(|r| predictor.predict(r.user_id, r.movie_id))
            .collect();

        let mut predictions = Vec::with_capacity(test.len());
        let mut actuals = Vec::with_capacity(test.len());
        let mut skipped = 0;
        for (rating, outcome) in test.iter().zip(outcomes) {
            match outcome {
                Ok(predicted) => {
                    predictions.push(predicted);
                    actuals.push(f64::from(rating.rating));
                }
                Err(RecommenderError::UnknownEntity { .. }) => skipped += 1,
                Err(e) => return Err(e),
            }
        }

        if predictions.is_empty() {
            return Err(RecommenderError::NoPredictions { skipped });
        }
        if skipped > 0 {
            warn!(skipped, "Skipped unscorable test ratings");
        }

        let evaluation = Evaluation {
            rmse: metrics::rmse(&predictions, &actuals),
            mae: metrics::mae(&predictions, &actuals),
            predictions,
            actuals,
            skipped,
        };
        debug!(
            rmse = evaluation.rmse,
            mae = evaluation.mae,
            evaluated = evaluation.evaluated(),
            "Evaluated"
        );
        Ok(evaluation)
    }

    /// Precision, recall and NDCG at K, averaged over users.
    ///
    /// Each user's test movies are ranked by predicted rating (descending,
    /// ties by lower movie id) and the top K are compared with the movies the
    /// user actually rated at or above the relevance threshold.
    #[instrument(skip(self, predictor, test), fields(predictor = predictor.name(), k = self.k))]
    pub fn ranking(&self, predictor: &dyn Predictor, test: &[Rating]) -> Result<RankingReport> {
        let mut by_user: BTreeMap<UserId, Vec<(MovieId, f64)>> = BTreeMap::new();
        for rating in test {
            by_user
                .entry(rating.user_id)
                .or_default()
                .push((rating.movie_id, f64::from(rating.rating)));
        }
        let groups: Vec<(UserId, Vec<(MovieId, f64)>)> = by_user.into_iter().collect();

        let per_user: Vec<Option<UserRanking>> = groups
            .par_iter()
            .map(|(user_id, items)| self.rank_user(predictor, *user_id, items))
            .collect::<Result<_>>()?;
        let scored: Vec<UserRanking> = per_user.into_iter().flatten().collect();

        if scored.is_empty() {
            return Err(RecommenderError::NoPredictions {
                skipped: test.len(),
            });
        }
        let with_relevant: Vec<(f64, f64)> = scored.iter().filter_map(|r| r.relevant).collect();

        let report = RankingReport {
            k: self.k,
            precision_at_k: average(scored.iter().map(|r| r.precision)),
            recall_at_k: average(with_relevant.iter().map(|r| r.0)),
            ndcg_at_k: average(with_relevant.iter().map(|r| r.1)),
            users: scored.len(),
        };
        debug!(?report, "Ranking metrics");
        Ok(report)
    }

    fn rank_user(
        &self,
        predictor: &dyn Predictor,
        user_id: UserId,
        items: &[(MovieId, f64)],
    ) -> Result<Option<UserRanking>> {
        let mut predicted = Vec::with_capacity(items.len());
        for &(movie_id, _) in items {
            match predictor.predict(user_id, movie_id) {
                Ok(score) => predicted.push((movie_id, score)),
                Err(RecommenderError::UnknownEntity { .. }) => {}
                Err(e) => return Err(e),
            }
        }
        if predicted.is_empty() {
            return Ok(None);
        }
        predicted.sort_by(|a, b| b.1.total_cmp(&a.1).then(a.0.cmp(&b.0)));

        let ranked: Vec<MovieId> = predicted.iter().map(|&(movie_id, _)| movie_id).collect();
        let relevant: Vec<MovieId> = items
            .iter()
            .filter(|&&(_, actual)| actual >= self.relevance_threshold)
            .map(|&(movie_id, _)| movie_id)
            .collect();

        Ok(Some(UserRanking {
            precision: metrics::precision_at_k(&ranked, &relevant, self.k),
            relevant: (!relevant.is_empty()).then(|| {
                (
                    metrics::recall_at_k(&ranked, &relevant, self.k),
                    metrics::ndcg_at_k(&ranked, &relevant, self.k),
                )
            }),
        }))
    }

    /// Fit every predictor on `train` (concurrently), then evaluate each on
    /// `test`. Rows come back in input order.
    #[instrument(skip_all, fields(predictors = predictors.len(), test = test.len()))]
    pub fn compare(
        &self,
        predictors: &mut [Box<dyn Predictor>],
        train: &RatingMatrix,
        test: &[Rating],
    ) -> Result<Vec<ComparisonRow>> {
        let fit_times: Vec<u64> = predictors
            .par_iter_mut()
            .map(|predictor| -> Result<u64> {
                let start = Instant::now();
                predictor.fit(train)?;
                Ok(start.elapsed().as_millis() as u64)
            })
            .collect::<Result<_>>()?;

        let mut rows = Vec::with_capacity(predictors.len());
        for (predictor, fit_millis) in predictors.iter().zip(fit_times) {
            let evaluation = self.evaluate(predictor.as_ref(), test)?;
            rows.push(ComparisonRow {
                algorithm: predictor.name().to_string(),
                rmse: evaluation.rmse,
                mae: evaluation.mae,
                evaluated: evaluation.evaluated(),
                skipped: evaluation.skipped,
                fit_millis,
            });
        }
        info!(predictors = rows.len(), "Comparison finished");
        Ok(rows)
    }
}

fn average(values: impl Iterator<Item = f64>) -> f64 {
    let (sum, count) = values.fold((0.0, 0usize), |(sum, count), v| (sum + v, count + 1));
    if count == 0 { 0.0 } else { sum / count as f64 }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::predictors::{GlobalMean, UserBasedCF};
    use crate::store::RatingStore;

    /// Predicts a fixed score per movie; unknown movies are unscorable
    struct Fixed(Vec<(MovieId, f64)>);

    impl Predictor for Fixed {
        fn name(&self) -> &str {
            "fixed"
        }

        fn fit(&mut self, _train: &RatingMatrix) -> Result<()> {
            Ok(())
        }

        fn predict(&self, _user_id: UserId, movie_id: MovieId) -> Result<f64> {
            self.0
                .iter()
                .find(|&&(m, _)| m == movie_id)
                .map(|&(_, score)| score)
                .ok_or(RecommenderError::UnknownEntity {
                    entity: "movie",
                    id: movie_id,
                })
        }
    }

    #[test]
    fn test_evaluate_skips_unknown() {
        let predictor = Fixed(vec![(1, 4.0), (2, 2.0)]);
        let test = [
            Rating::new(1, 1, 5.0, 0),
            Rating::new(1, 2, 2.0, 0),
            Rating::new(2, 9, 3.0, 0),
        ];
        let evaluation = Evaluator::new().evaluate(&predictor, &test).unwrap();

        assert_eq!(evaluation.predictions, vec![4.0, 2.0]);
        assert_eq!(evaluation.actuals, vec![5.0, 2.0]);
        assert_eq!(evaluation.skipped, 1);
        assert!((evaluation.rmse - 0.5f64.sqrt()).abs() < 1e-12);
        assert_eq!(evaluation.mae, 0.5);
    }

    #[test]
    fn test_evaluate_all_skipped() {
        let predictor = Fixed(vec![]);
        let test = [Rating::new(1, 1, 5.0, 0), Rating::new(1, 2, 3.0, 0)];
        assert_eq!(
            Evaluator::new().evaluate(&predictor, &test),
            Err(RecommenderError::NoPredictions { skipped: 2 })
        );
    }

    #[test]
    fn test_evaluate_unfitted_propagates() {
        let predictor = UserBasedCF::new();
        let test = [Rating::new(1, 1, 5.0, 0)];
        assert!(matches!(
            Evaluator::new().evaluate(&predictor, &test),
            Err(RecommenderError::NotFitted { .. })
        ));
    }

    #[test]
    fn test_ranking_metrics() {
        // User 1: ranked 1, 2, 3; only movie 2 relevant
        // User 2: ranked 1, 3; nothing relevant
        let predictor = Fixed(vec![(1, 5.0), (2, 4.0), (3, 3.0)]);
        let test = [
            Rating::new(1, 1, 2.0, 0),
            Rating::new(1, 2, 4.0, 0),
            Rating::new(1, 3, 3.0, 0),
            Rating::new(2, 1, 1.0, 0),
            Rating::new(2, 3, 2.0, 0),
        ];
        let report = Evaluator::new()
            .with_k(2)
            .ranking(&predictor, &test)
            .unwrap();

        assert_eq!(report.users, 2);
        assert_eq!(report.k, 2);
        assert!((report.precision_at_k - 0.25).abs() < 1e-12);
        assert_eq!(report.recall_at_k, 1.0);
        assert!((report.ndcg_at_k - 1.0 / 3.0f64.log2()).abs() < 1e-12);
    }

    #[test]
    fn test_ranking_tie_breaks_on_movie_id() {
        let predictor = Fixed(vec![(7, 4.0), (3, 4.0)]);
        let test = [Rating::new(1, 7, 5.0, 0), Rating::new(1, 3, 1.0, 0)];
        let report = Evaluator::new()
            .with_k(1)
            .ranking(&predictor, &test)
            .unwrap();

        // Movie 3 wins the tie and is not relevant
        assert_eq!(report.precision_at_k, 0.0);
        assert_eq!(report.recall_at_k, 0.0);
    }

    #[test]
    fn test_compare_rows_in_order() {
        let ratings: Vec<Rating> = (1..=4)
            .flat_map(|u| (1..=4).map(move |m| Rating::new(u, m, ((u * m) % 5 + 1) as f32, 0)))
            .collect();
        let store = RatingStore::build(&ratings).unwrap();
        let train = store.matrix_from(&ratings[..12]).unwrap();

        let mut predictors: Vec<Box<dyn Predictor>> =
            vec![Box::new(UserBasedCF::new()), Box::new(GlobalMean::new())];
        let rows = Evaluator::new()
            .compare(&mut predictors, &train, &ratings[12..])
            .unwrap();

        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].algorithm, "user-based");
        assert_eq!(rows[1].algorithm, "global-mean");
        for row in &rows {
            assert_eq!(row.evaluated + row.skipped, 4);
            assert!(row.rmse >= row.mae && row.mae >= 0.0);
        }
    }
}
