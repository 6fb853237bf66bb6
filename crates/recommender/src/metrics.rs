//! Accuracy and ranking metrics.
//!
//! Accuracy metrics compare predicted and actual ratings pairwise; ranking
//! metrics compare one ranked list of items against the set of items the
//! user actually found relevant.

/// Root-mean-square error; 0.0 for empty input.
#[must_use]
pub fn rmse(predictions: &[f64], actuals: &[f64]) -> f64 {
    if predictions.is_empty() || predictions.len() != actuals.len() {
        return 0.0;
    }
    let squared: f64 = predictions
        .iter()
        .zip(actuals)
        .map(|(p, a)| (p - a).powi(2))
        .sum();
    (squared / predictions.len() as f64).sqrt()
}

/// Mean absolute error; 0.0 for empty input.
#[must_use]
pub fn mae(predictions: &[f64], actuals: &[f64]) -> f64 {
    if predictions.is_empty() || predictions.len() != actuals.len() {
        return 0.0;
    }
    let absolute: f64 = predictions
        .iter()
        .zip(actuals)
        .map(|(p, a)| (p - a).abs())
        .sum();
    absolute / predictions.len() as f64
}

fn hits_at_k<T: PartialEq>(ranked: &[T], relevant: &[T], k: usize) -> usize {
    ranked
        .iter()
        .take(k)
        .filter(|item| relevant.contains(item))
        .count()
}

/// Fraction of the top-K list that is relevant.
///
/// The denominator is the length of the top-K list, which is shorter than
/// `k` when fewer items were ranked.
#[must_use]
pub fn precision_at_k<T: PartialEq>(ranked: &[T], relevant: &[T], k: usize) -> f64 {
    let shown = ranked.len().min(k);
    if shown == 0 {
        return 0.0;
    }
    hits_at_k(ranked, relevant, k) as f64 / shown as f64
}

/// Fraction of the relevant items found in the top-K list.
#[must_use]
pub fn recall_at_k<T: PartialEq>(ranked: &[T], relevant: &[T], k: usize) -> f64 {
    if relevant.is_empty() {
        return 0.0;
    }
    hits_at_k(ranked, relevant, k) as f64 / relevant.len() as f64
}

/// Normalized DCG at K with binary gains.
///
/// Position `i` (0-based) contributes `1 / log2(i + 2)` when relevant; the
/// result is divided by the DCG of an ideal list that puts every relevant
/// item first.
#[must_use]
pub fn ndcg_at_k<T: PartialEq>(ranked: &[T], relevant: &[T], k: usize) -> f64 {
    let discount = |i: usize| 1.0 / ((i + 2) as f64).log2();
    let dcg: f64 = ranked
        .iter()
        .take(k)
        .enumerate()
        .filter(|(_, item)| relevant.contains(item))
        .map(|(i, _)| discount(i))
        .sum();
    let ideal: f64 = (0..relevant.len().min(k)).map(discount).sum();
    if ideal == 0.0 { 0.0 } else { dcg / ideal }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rmse_and_mae() {
        let predictions = [3.0, 4.0, 2.0];
        let actuals = [4.0, 4.0, 5.0];

        assert!((rmse(&predictions, &actuals) - (10.0f64 / 3.0).sqrt()).abs() < 1e-12);
        assert!((mae(&predictions, &actuals) - 4.0 / 3.0).abs() < 1e-12);
        assert_eq!(rmse(&[], &[]), 0.0);
        assert_eq!(mae(&[1.0], &[]), 0.0);
    }

    #[test]
    fn test_rmse_at_least_mae() {
        let predictions = [1.0, 2.5, 4.0, 5.0];
        let actuals = [2.0, 2.0, 5.0, 1.0];
        assert!(rmse(&predictions, &actuals) >= mae(&predictions, &actuals));
    }

    #[test]
    fn test_precision_and_recall() {
        let ranked = [10, 20, 30, 40];
        let relevant = [20, 40, 50];

        assert_eq!(precision_at_k(&ranked, &relevant, 2), 0.5);
        assert_eq!(precision_at_k(&ranked, &relevant, 10), 0.5);
        assert!((recall_at_k(&ranked, &relevant, 2) - 1.0 / 3.0).abs() < 1e-12);
        assert!((recall_at_k(&ranked, &relevant, 4) - 2.0 / 3.0).abs() < 1e-12);

        assert_eq!(precision_at_k::<u32>(&[], &[1], 5), 0.0);
        assert_eq!(recall_at_k(&ranked, &[], 5), 0.0);
    }

    #[test]
    fn test_ndcg() {
        let relevant = [1, 2];
        assert!((ndcg_at_k(&[1, 2, 3], &relevant, 3) - 1.0).abs() < 1e-12);

        // Relevant items at positions 2 and 3 instead of 1 and 2
        let dcg = 1.0 / 3.0f64.log2() + 1.0 / 4.0f64.log2();
        let ideal = 1.0 + 1.0 / 3.0f64.log2();
        assert!((ndcg_at_k(&[3, 1, 2], &relevant, 3) - dcg / ideal).abs() < 1e-12);

        assert_eq!(ndcg_at_k(&[3, 4], &relevant, 2), 0.0);
        assert_eq!(ndcg_at_k(&[3, 4], &[], 2), 0.0);
    }
}
