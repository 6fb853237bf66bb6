//! Pairwise cosine similarity over the rows or columns of a rating matrix.
//!
//! For two entities `a` and `b` only the positions both have rated count:
//! the dot product *and* both norms are taken over that co-rated set.
//! Entities with no overlap have similarity 0. Zero-filling missing ratings
//! instead would bias every score toward coincidental overlap.
//!
//! Rows are computed independently in parallel by walking the inverted view
//! (`a`'s ratings → everyone who rated the same positions), so cost scales
//! with co-occurrences rather than with `n²`.

use crate::store::{Entry, RatingMatrix};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::time::Instant;
use tracing::{debug, instrument};

/// Which entities are compared
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Axis {
    /// Users (matrix rows)
    Rows,
    /// Movies (matrix columns)
    Cols,
}

/// Symmetric similarity scores between entities of one axis.
///
/// Only non-zero off-diagonal scores are stored, per entity, sorted by
/// neighbor index. The diagonal is implicit: 1.0 for any entity with at
/// least one rating.
#[derive(Debug, Clone)]
pub struct SimilarityMatrix {
    axis: Axis,
    neighbors: Vec<Vec<Entry>>,
    observed: Vec<bool>,
}

impl SimilarityMatrix {
    pub fn axis(&self) -> Axis {
        self.axis
    }

    /// Number of entities
    pub fn len(&self) -> usize {
        self.neighbors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.neighbors.is_empty()
    }

    /// Similarity between entities `a` and `b`, in `[-1, 1]`
    pub fn get(&self, a: usize, b: usize) -> f64 {
        if a == b {
            return if self.observed.get(a).copied().unwrap_or(false) {
                1.0
            } else {
                0.0
            };
        }
        let Some(row) = self.neighbors.get(a) else {
            return 0.0;
        };
        row.binary_search_by_key(&b, |&(n, _)| n)
            .map(|pos| row[pos].1)
            .unwrap_or(0.0)
    }

    /// Non-zero similarities of `a` to every other entity, sorted by index
    pub fn neighbors(&self, a: usize) -> &[Entry] {
        self.neighbors.get(a).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Count of stored (non-zero, off-diagonal) scores
    pub fn stored_pairs(&self) -> usize {
        self.neighbors.iter().map(Vec::len).sum()
    }
}

/// Per-thread scratch space for one row of similarities
struct RowAccumulator {
    dot: Vec<f64>,
    norm_a: Vec<f64>,
    norm_b: Vec<f64>,
    seen: Vec<bool>,
    touched: Vec<usize>,
}

impl RowAccumulator {
    fn new(n: usize) -> Self {
        Self {
            dot: vec![0.0; n],
            norm_a: vec![0.0; n],
            norm_b: vec![0.0; n],
            seen: vec![false; n],
            touched: Vec::new(),
        }
    }

    fn row(&mut self, a: usize, vectors: &[Vec<Entry>], inverted: &[Vec<Entry>]) -> Vec<Entry> {
        for &(position, ra) in &vectors[a] {
            for &(b, rb) in &inverted[position] {
                if b == a {
                    continue;
                }
                if !self.seen[b] {
                    self.seen[b] = true;
                    self.touched.push(b);
                }
                self.dot[b] += ra * rb;
                self.norm_a[b] += ra * ra;
                self.norm_b[b] += rb * rb;
            }
        }

        self.touched.sort_unstable();
        let mut row = Vec::with_capacity(self.touched.len());
        for &b in &self.touched {
            let denom = self.norm_a[b].sqrt() * self.norm_b[b].sqrt();
            if denom > 0.0 {
                let sim = (self.dot[b] / denom).clamp(-1.0, 1.0);
                if sim != 0.0 {
                    row.push((b, sim));
                }
            }
            self.dot[b] = 0.0;
            self.norm_a[b] = 0.0;
            self.norm_b[b] = 0.0;
            self.seen[b] = false;
        }
        self.touched.clear();
        row
    }
}

/// Cosine similarity between every pair of users (`Axis::Rows`) or movies
/// (`Axis::Cols`) of `matrix`, ignoring missing ratings.
#[instrument(skip(matrix), fields(users = matrix.n_users(), movies = matrix.n_items()))]
pub fn pairwise_cosine(matrix: &RatingMatrix, axis: Axis) -> SimilarityMatrix {
    let start = Instant::now();
    let (vectors, inverted) = match axis {
        Axis::Rows => (matrix.rows(), matrix.cols()),
        Axis::Cols => (matrix.cols(), matrix.rows()),
    };
    let n = vectors.len();

    let neighbors: Vec<Vec<Entry>> = (0..n)
        .into_par_iter()
        .map_init(
            || RowAccumulator::new(n),
            |acc, a| acc.row(a, vectors, inverted),
        )
        .collect();
    let observed = vectors.iter().map(|v| !v.is_empty()).collect();

    let similarity = SimilarityMatrix {
        axis,
        neighbors,
        observed,
    };
    debug!(
        ?axis,
        entities = n,
        pairs = similarity.stored_pairs(),
        "Computed cosine similarities in {:.2?}",
        start.elapsed()
    );
    similarity
}
