//! Small dense linear algebra kit backing matrix factorization.
//!
//! Row-major `f64` matrices, a cyclic Jacobi eigensolver for symmetric
//! matrices, Gram-Schmidt orthonormalization, and a truncated SVD built on
//! top of them.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rayon::prelude::*;
use tracing::debug;

/// Jacobi stops once the off-diagonal mass falls below this fraction of the
/// matrix norm
const JACOBI_TOLERANCE: f64 = 1e-13;
const MAX_SWEEPS: usize = 64;
/// Columns shorter than this fraction of their original norm are treated as
/// linearly dependent
const DEPENDENT_COLUMN: f64 = 1e-10;

// =============================================================================
// DenseMatrix
// =============================================================================

#[derive(Debug, Clone, PartialEq)]
pub struct DenseMatrix {
    rows: usize,
    cols: usize,
    data: Vec<f64>,
}

impl DenseMatrix {
    pub fn zeros(rows: usize, cols: usize) -> Self {
        Self {
            rows,
            cols,
            data: vec![0.0; rows * cols],
        }
    }

    pub fn identity(n: usize) -> Self {
        let mut m = Self::zeros(n, n);
        for i in 0..n {
            m.set(i, i, 1.0);
        }
        m
    }

    /// Build from row-major values; `data.len()` must equal `rows * cols`
    pub fn from_vec(rows: usize, cols: usize, data: Vec<f64>) -> Self {
        debug_assert_eq!(data.len(), rows * cols);
        Self { rows, cols, data }
    }

    pub fn from_fn(rows: usize, cols: usize, mut f: impl FnMut(usize, usize) -> f64) -> Self {
        let mut data = Vec::with_capacity(rows * cols);
        for r in 0..rows {
            for c in 0..cols {
                data.push(f(r, c));
            }
        }
        Self { rows, cols, data }
    }

    pub fn rows(&self) -> usize {
        self.rows
    }

    pub fn cols(&self) -> usize {
        self.cols
    }

    #[inline]
    pub fn get(&self, r: usize, c: usize) -> f64 {
        self.data[r * self.cols + c]
    }

    #[inline]
    pub fn set(&mut self, r: usize, c: usize, value: f64) {
        self.data[r * self.cols + c] = value;
    }

    pub fn row(&self, r: usize) -> &[f64] {
        &self.data[r * self.cols..(r + 1) * self.cols]
    }

    pub fn transpose(&self) -> Self {
        let mut t = Self::zeros(self.cols, self.rows);
        for r in 0..self.rows {
            for c in 0..self.cols {
                t.set(c, r, self.get(r, c));
            }
        }
        t
    }

    /// `self · other`, parallel over output rows
    pub fn matmul(&self, other: &Self) -> Self {
        debug_assert_eq!(self.cols, other.rows);
        let mut out = Self::zeros(self.rows, other.cols);
        if other.cols == 0 {
            return out;
        }
        out.data
            .par_chunks_mut(other.cols)
            .enumerate()
            .for_each(|(r, out_row)| {
                for (k, &a) in self.row(r).iter().enumerate() {
                    if a == 0.0 {
                        continue;
                    }
                    for (o, &b) in out_row.iter_mut().zip(other.row(k)) {
                        *o += a * b;
                    }
                }
            });
        out
    }

    /// `self · selfᵀ`, exactly symmetric
    pub fn gram(&self) -> Self {
        let n = self.rows;
        let mut out = Self::zeros(n, n);
        if n == 0 {
            return out;
        }
        out.data.par_chunks_mut(n).enumerate().for_each(|(r, out_row)| {
            let a = self.row(r);
            for (s, o) in out_row.iter_mut().enumerate() {
                *o = dot(a, self.row(s));
            }
        });
        out
    }

    /// New matrix made of the listed columns, in that order
    pub fn select_columns(&self, columns: &[usize]) -> Self {
        Self::from_fn(self.rows, columns.len(), |r, c| self.get(r, columns[c]))
    }

    fn column_norm(&self, c: usize) -> f64 {
        (0..self.rows)
            .map(|r| self.get(r, c).powi(2))
            .sum::<f64>()
            .sqrt()
    }

    fn scale_column(&mut self, c: usize, factor: f64) {
        for r in 0..self.rows {
            let value = self.get(r, c) * factor;
            self.set(r, c, value);
        }
    }

    /// Largest absolute element-wise difference
    pub fn max_abs_diff(&self, other: &Self) -> f64 {
        self.data
            .iter()
            .zip(&other.data)
            .map(|(a, b)| (a - b).abs())
            .fold(0.0, f64::max)
    }
}

fn dot(a: &[f64], b: &[f64]) -> f64 {
    a.iter().zip(b).map(|(x, y)| x * y).sum()
}

// =============================================================================
// Eigen / orthonormalization
// =============================================================================

/// Eigen-decomposition of a symmetric matrix by cyclic Jacobi rotations.
///
/// Returns eigenvalues in descending order and the matching eigenvectors as
/// the columns of the second matrix.
pub fn symmetric_eigen(matrix: &DenseMatrix) -> (Vec<f64>, DenseMatrix) {
    let n = matrix.rows;
    let mut a = matrix.clone();
    let mut v = DenseMatrix::identity(n);
    let scale = a.data.iter().map(|x| x * x).sum::<f64>().sqrt();

    let mut sweeps = 0;
    while scale > 0.0 && sweeps < MAX_SWEEPS && off_diagonal_norm(&a) > JACOBI_TOLERANCE * scale {
        for p in 0..n {
            for q in p + 1..n {
                rotate(&mut a, &mut v, p, q);
            }
        }
        sweeps += 1;
    }
    debug!(n, sweeps, "Jacobi eigen-decomposition finished");

    let mut order: Vec<usize> = (0..n).collect();
    order.sort_by(|&x, &y| a.get(y, y).total_cmp(&a.get(x, x)).then(x.cmp(&y)));
    let values = order.iter().map(|&i| a.get(i, i)).collect();
    (values, v.select_columns(&order))
}

/// Zero `a[p][q]` with one Jacobi rotation, accumulating it into `v`
fn rotate(a: &mut DenseMatrix, v: &mut DenseMatrix, p: usize, q: usize) {
    let apq = a.get(p, q);
    if apq == 0.0 {
        return;
    }
    let app = a.get(p, p);
    let aqq = a.get(q, q);
    let theta = (aqq - app) / (2.0 * apq);
    let t = if theta.abs() > 1e150 {
        0.5 / theta
    } else {
        theta.signum() / (theta.abs() + (theta * theta + 1.0).sqrt())
    };
    let c = 1.0 / (t * t + 1.0).sqrt();
    let s = t * c;

    for r in 0..a.rows {
        if r == p || r == q {
            continue;
        }
        let arp = a.get(r, p);
        let arq = a.get(r, q);
        let new_rp = c * arp - s * arq;
        let new_rq = s * arp + c * arq;
        a.set(r, p, new_rp);
        a.set(p, r, new_rp);
        a.set(r, q, new_rq);
        a.set(q, r, new_rq);
    }
    a.set(p, p, app - t * apq);
    a.set(q, q, aqq + t * apq);
    a.set(p, q, 0.0);
    a.set(q, p, 0.0);

    for r in 0..v.rows {
        let vrp = v.get(r, p);
        let vrq = v.get(r, q);
        v.set(r, p, c * vrp - s * vrq);
        v.set(r, q, s * vrp + c * vrq);
    }
}

fn off_diagonal_norm(a: &DenseMatrix) -> f64 {
    let mut sum = 0.0;
    for r in 0..a.rows {
        for c in 0..a.cols {
            if r != c {
                sum += a.get(r, c).powi(2);
            }
        }
    }
    sum.sqrt()
}

/// Orthonormalize columns in place (Gram-Schmidt, two passes).
///
/// Columns that turn out linearly dependent on earlier ones become zero.
pub fn orthonormalize_columns(m: &mut DenseMatrix) {
    for j in 0..m.cols {
        let original = m.column_norm(j);
        for _ in 0..2 {
            for k in 0..j {
                let projection: f64 = (0..m.rows).map(|r| m.get(r, k) * m.get(r, j)).sum();
                if projection != 0.0 {
                    for r in 0..m.rows {
                        let value = m.get(r, j) - projection * m.get(r, k);
                        m.set(r, j, value);
                    }
                }
            }
        }
        let norm = m.column_norm(j);
        if original > 0.0 && norm > DEPENDENT_COLUMN * original {
            m.scale_column(j, 1.0 / norm);
        } else {
            m.scale_column(j, 0.0);
        }
    }
}

// =============================================================================
// Truncated SVD
// =============================================================================

/// Tuning for the randomized path of `truncated_svd`
#[derive(Debug, Clone, Copy)]
pub struct SvdOptions {
    pub seed: u64,
    /// Extra random directions sampled beyond the requested rank
    pub oversampling: usize,
    /// Subspace iterations sharpening the sampled range
    pub power_iterations: usize,
}

impl Default for SvdOptions {
    fn default() -> Self {
        Self {
            seed: 42,
            oversampling: 10,
            power_iterations: 2,
        }
    }
}

/// `A ≈ U · diag(σ) · Vᵀ` with `k` components, `σ` descending
#[derive(Debug, Clone)]
pub struct TruncatedSvd {
    pub u: DenseMatrix,
    pub singular_values: Vec<f64>,
    pub v: DenseMatrix,
}

impl TruncatedSvd {
    /// `U · diag(σ) · Vᵀ`
    pub fn reconstruct(&self) -> DenseMatrix {
        let mut scaled = self.u.clone();
        for (f, &sigma) in self.singular_values.iter().enumerate() {
            scaled.scale_column(f, sigma);
        }
        scaled.matmul(&self.v.transpose())
    }
}

/// Rank-`k` singular value decomposition of `a` (`k` is capped at `min(M, N)`).
///
/// Works on the shorter side of `a`. When `k + oversampling` covers that side
/// the Gram matrix is decomposed directly; otherwise a seeded randomized range
/// finder shrinks the problem first. Output is deterministic for a given seed.
pub fn truncated_svd(a: &DenseMatrix, k: usize, options: &SvdOptions) -> TruncatedSvd {
    let at = a.transpose();
    if a.rows <= a.cols {
        short_side_svd(a, &at, k, options)
    } else {
        let svd = short_side_svd(&at, a, k, options);
        TruncatedSvd {
            u: svd.v,
            singular_values: svd.singular_values,
            v: svd.u,
        }
    }
}

/// SVD of `a` (m × n, m ≤ n) given its transpose
fn short_side_svd(a: &DenseMatrix, at: &DenseMatrix, k: usize, options: &SvdOptions) -> TruncatedSvd {
    let m = a.rows;
    let k = k.min(m);
    let columns: Vec<usize> = (0..k).collect();

    let u = if k + options.oversampling >= m {
        debug!(m, k, "Exact SVD via Gram eigen-decomposition");
        let (_, vectors) = symmetric_eigen(&a.gram());
        vectors.select_columns(&columns)
    } else {
        let l = k + options.oversampling;
        debug!(m, k, l, "Randomized SVD");
        let mut rng = StdRng::seed_from_u64(options.seed);
        let omega = DenseMatrix::from_fn(a.cols, l, |_, _| rng.random_range(-1.0..1.0));

        let mut q = a.matmul(&omega);
        orthonormalize_columns(&mut q);
        for _ in 0..options.power_iterations {
            let mut z = at.matmul(&q);
            orthonormalize_columns(&mut z);
            q = a.matmul(&z);
            orthonormalize_columns(&mut q);
        }

        // Project onto the sampled range and decompose the small l × l problem
        let b = q.transpose().matmul(a);
        let (_, vectors) = symmetric_eigen(&b.gram());
        q.matmul(&vectors.select_columns(&columns))
    };

    finish_svd(at, u)
}

/// Given orthonormal left vectors `U`, set `σ_f = ‖Aᵀ u_f‖` and
/// `v_f = Aᵀ u_f / σ_f`, so `u_f σ_f v_fᵀ = u_f u_fᵀ A` holds exactly.
fn finish_svd(at: &DenseMatrix, u: DenseMatrix) -> TruncatedSvd {
    let mut v = at.matmul(&u);
    let k = u.cols;
    let mut sigma = vec![0.0; k];
    for (f, s) in sigma.iter_mut().enumerate() {
        *s = v.column_norm(f);
        if *s > 0.0 {
            v.scale_column(f, 1.0 / *s);
        }
    }

    // Stable sort keeps eigen order between equal values
    let mut order: Vec<usize> = (0..k).collect();
    order.sort_by(|&x, &y| sigma[y].total_cmp(&sigma[x]));
    TruncatedSvd {
        u: u.select_columns(&order),
        singular_values: order.iter().map(|&f| sigma[f]).collect(),
        v: v.select_columns(&order),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_matrix(rows: usize, cols: usize) -> DenseMatrix {
        DenseMatrix::from_fn(rows, cols, |r, c| ((r * 7 + c * 3) % 11) as f64 - 5.0 + 0.1 * r as f64)
    }

    fn assert_orthonormal_columns(m: &DenseMatrix) {
        let gram = m.transpose().matmul(m);
        for i in 0..gram.rows() {
            for j in 0..gram.cols() {
                let expected = if i == j { 1.0 } else { 0.0 };
                assert!((gram.get(i, j) - expected).abs() < 1e-9, "({i}, {j}) = {}", gram.get(i, j));
            }
        }
    }

    #[test]
    fn test_matmul_and_gram() {
        let a = DenseMatrix::from_vec(2, 3, vec![1.0, 2.0, 3.0, 4.0, 5.0, 6.0]);
        let product = a.matmul(&a.transpose());

        assert_eq!(product, DenseMatrix::from_vec(2, 2, vec![14.0, 32.0, 32.0, 77.0]));
        assert_eq!(a.gram(), product);
    }

    #[test]
    fn test_symmetric_eigen_2x2() {
        let m = DenseMatrix::from_vec(2, 2, vec![2.0, 1.0, 1.0, 2.0]);
        let (values, vectors) = symmetric_eigen(&m);

        assert!((values[0] - 3.0).abs() < 1e-12);
        assert!((values[1] - 1.0).abs() < 1e-12);
        // Leading eigenvector is ±(1, 1)/√2
        assert!((vectors.get(0, 0).abs() - 0.5f64.sqrt()).abs() < 1e-12);
        assert!((vectors.get(0, 0) - vectors.get(1, 0)).abs() < 1e-12);
    }

    #[test]
    fn test_symmetric_eigen_reconstructs() {
        let m = sample_matrix(5, 7).gram();
        let (values, vectors) = symmetric_eigen(&m);

        assert!(values.windows(2).all(|w| w[0] >= w[1]));
        assert_orthonormal_columns(&vectors);

        let mut scaled = vectors.clone();
        for (f, &value) in values.iter().enumerate() {
            scaled.scale_column(f, value);
        }
        let rebuilt = scaled.matmul(&vectors.transpose());
        assert!(rebuilt.max_abs_diff(&m) < 1e-8);
    }

    #[test]
    fn test_orthonormalize_drops_dependent_columns() {
        let mut m = DenseMatrix::from_vec(3, 3, vec![1.0, 2.0, 0.0, 0.0, 0.0, 1.0, 1.0, 2.0, 0.0]);
        orthonormalize_columns(&mut m);

        // Column 1 is twice column 0
        assert_eq!(m.column_norm(1), 0.0);
        assert!((m.column_norm(0) - 1.0).abs() < 1e-12);
        assert!((m.column_norm(2) - 1.0).abs() < 1e-12);
    }

    #[test]
    fn test_full_rank_svd_is_lossless() {
        for (rows, cols) in [(4, 6), (6, 4)] {
            let a = sample_matrix(rows, cols);
            let svd = truncated_svd(&a, rows.min(cols), &SvdOptions::default());

            assert_eq!(svd.u.rows(), rows);
            assert_eq!(svd.v.rows(), cols);
            assert!(svd.singular_values.windows(2).all(|w| w[0] >= w[1]));
            assert!(svd.singular_values.iter().all(|&s| s >= 0.0));
            assert!(svd.reconstruct().max_abs_diff(&a) < 1e-9);
        }
    }

    #[test]
    fn test_randomized_svd_recovers_low_rank() {
        // Rank-2 matrix, 12 × 20
        let left = DenseMatrix::from_fn(12, 2, |r, c| {
            let slope = if c == 0 { 1.0 } else { -0.5 };
            (r as f64 + 1.0) * slope + c as f64
        });
        let right = DenseMatrix::from_fn(2, 20, |r, c| ((c + r) % 5) as f64 - 2.0);
        let a = left.matmul(&right);
        let options = SvdOptions {
            seed: 9,
            oversampling: 2,
            power_iterations: 1,
        };

        let svd = truncated_svd(&a, 2, &options);
        assert!(svd.reconstruct().max_abs_diff(&a) < 1e-8);
        assert_orthonormal_columns(&svd.u);

        let again = truncated_svd(&a, 2, &options);
        assert_eq!(svd.singular_values, again.singular_values);
    }

    #[test]
    fn test_truncation_keeps_largest_components() {
        let a = DenseMatrix::from_vec(3, 3, vec![5.0, 0.0, 0.0, 0.0, 3.0, 0.0, 0.0, 0.0, 1.0]);
        let svd = truncated_svd(&a, 2, &SvdOptions::default());

        assert_eq!(svd.singular_values.len(), 2);
        assert!((svd.singular_values[0] - 5.0).abs() < 1e-12);
        assert!((svd.singular_values[1] - 3.0).abs() < 1e-12);
        let rebuilt = svd.reconstruct();
        assert!(rebuilt.get(2, 2).abs() < 1e-12);
        assert!((rebuilt.get(1, 1) - 3.0).abs() < 1e-12);
    }
}
