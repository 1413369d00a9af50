//! Dense linear solver for the equation of motion.
//!
//! The inertia matrix of a chain is symmetric positive definite, so plain
//! Gaussian elimination without row exchanges is sufficient. Pivots are
//! still checked so that a degenerate (massless) chain surfaces as an
//! error instead of a silent division by zero.

use crate::error::{Error, Result, check_len};
use std::ops::{Index, IndexMut};

/// Row-major square matrix.
#[derive(Debug, Clone, PartialEq)]
pub struct SquareMatrix {
    dim: usize,
    data: Vec<f64>,
}

impl SquareMatrix {
    pub fn zeros(dim: usize) -> Self {
        Self {
            dim,
            data: vec![0.0; dim * dim],
        }
    }

    pub fn identity(dim: usize) -> Self {
        let mut m = Self::zeros(dim);
        for i in 0..dim {
            m[(i, i)] = 1.0;
        }
        m
    }

    /// Build from rows. Fails if the rows do not form a square matrix.
    pub fn from_rows(rows: &[Vec<f64>]) -> Result<Self> {
        let dim = rows.len();
        let mut data = Vec::with_capacity(dim * dim);
        for row in rows {
            check_len("matrix row", dim, row.len())?;
            data.extend_from_slice(row);
        }
        Ok(Self { dim, data })
    }

    pub fn dim(&self) -> usize {
        self.dim
    }

    pub fn row(&self, i: usize) -> &[f64] {
        &self.data[i * self.dim..(i + 1) * self.dim]
    }

    pub fn to_rows(&self) -> Vec<Vec<f64>> {
        (0..self.dim).map(|i| self.row(i).to_vec()).collect()
    }

    /// Maximum absolute row sum.
    pub fn norm_inf(&self) -> f64 {
        (0..self.dim)
            .map(|i| self.row(i).iter().map(|v| v.abs()).sum::<f64>())
            .fold(0.0, f64::max)
    }

    pub fn is_symmetric(&self, tolerance: f64) -> bool {
        (0..self.dim).all(|i| {
            (0..i).all(|j| (self[(i, j)] - self[(j, i)]).abs() <= tolerance)
        })
    }

    pub fn mul_vec(&self, x: &[f64]) -> Result<Vec<f64>> {
        check_len("vector", self.dim, x.len())?;
        Ok((0..self.dim)
            .map(|i| self.row(i).iter().zip(x).map(|(a, b)| a * b).sum())
            .collect())
    }
}

impl Index<(usize, usize)> for SquareMatrix {
    type Output = f64;

    fn index(&self, (row, col): (usize, usize)) -> &f64 {
        &self.data[row * self.dim + col]
    }
}

impl IndexMut<(usize, usize)> for SquareMatrix {
    fn index_mut(&mut self, (row, col): (usize, usize)) -> &mut f64 {
        &mut self.data[row * self.dim + col]
    }
}

/// Gaussian elimination with back substitution.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LinearSolver {
    pivot_tolerance: f64,
}

impl Default for LinearSolver {
    fn default() -> Self {
        Self::new(Self::DEFAULT_PIVOT_TOLERANCE)
    }
}

impl LinearSolver {
    pub const DEFAULT_PIVOT_TOLERANCE: f64 = 1e-10;

    /// `pivot_tolerance` is relative to the infinity norm of the matrix.
    pub const fn new(pivot_tolerance: f64) -> Self {
        Self { pivot_tolerance }
    }

    pub fn pivot_tolerance(&self) -> f64 {
        self.pivot_tolerance
    }

    /// Solve `a·x = b` on a working copy; `a` and `b` are left untouched.
    pub fn solve(&self, a: &SquareMatrix, b: &[f64]) -> Result<Vec<f64>> {
        let mut work = a.clone();
        let mut x = b.to_vec();
        self.solve_in_place(&mut work, &mut x)?;
        Ok(x)
    }

    /// Destructive variant of [`solve`](Self::solve).
    ///
    /// On success `b` holds the solution and `a` holds the upper triangular
    /// factor. On failure both are left in an unspecified, partially
    /// eliminated state.
    pub fn solve_in_place(&self, a: &mut SquareMatrix, b: &mut [f64]) -> Result<()> {
        let n = a.dim();
        check_len("right-hand side", n, b.len())?;

        let threshold = self.pivot_tolerance * a.norm_inf();

        for k in 0..n {
            let pivot = a[(k, k)];
            if !pivot.is_finite() || pivot.abs() <= threshold {
                return Err(Error::SingularMatrix {
                    row: k,
                    pivot,
                    tolerance: threshold,
                });
            }
            for i in (k + 1)..n {
                let factor = a[(i, k)] / pivot;
                if factor == 0.0 {
                    continue;
                }
                for j in k..n {
                    a[(i, j)] -= factor * a[(k, j)];
                }
                b[i] -= factor * b[k];
            }
        }

        for i in (0..n).rev() {
            let mut sum = b[i];
            for j in (i + 1)..n {
                sum -= a[(i, j)] * b[j];
            }
            b[i] = sum / a[(i, i)];
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    fn spd3() -> SquareMatrix {
        SquareMatrix::from_rows(&[
            vec![4.0, 1.0, 2.0],
            vec![1.0, 5.0, 3.0],
            vec![2.0, 3.0, 6.0],
        ])
        .unwrap()
    }

    #[test]
    fn solves_known_spd_system() {
        // x = [1, -2, 3]
        let a = spd3();
        let x = LinearSolver::default().solve(&a, &[8.0, 0.0, 14.0]).unwrap();
        assert_abs_diff_eq!(x[0], 1.0, epsilon = 1e-10);
        assert_abs_diff_eq!(x[1], -2.0, epsilon = 1e-10);
        assert_abs_diff_eq!(x[2], 3.0, epsilon = 1e-10);
    }

    #[test]
    fn solve_does_not_mutate_inputs() {
        let a = spd3();
        let b = vec![8.0, 0.0, 14.0];
        let before = a.clone();
        LinearSolver::default().solve(&a, &b).unwrap();
        assert_eq!(a, before);
        assert_eq!(b, vec![8.0, 0.0, 14.0]);
    }

    #[test]
    fn zero_matrix_is_singular() {
        let a = SquareMatrix::zeros(2);
        let err = LinearSolver::default().solve(&a, &[1.0, 1.0]).unwrap_err();
        assert!(matches!(err, Error::SingularMatrix { row: 0, .. }));
    }

    #[test]
    fn rank_deficient_matrix_fails_on_last_pivot() {
        let a = SquareMatrix::from_rows(&[vec![1.0, 2.0], vec![2.0, 4.0]]).unwrap();
        let err = LinearSolver::default().solve(&a, &[1.0, 2.0]).unwrap_err();
        assert!(matches!(err, Error::SingularMatrix { row: 1, .. }));
    }

    #[test]
    fn tolerance_scales_with_matrix_norm() {
        let mut a = SquareMatrix::identity(2);
        a[(0, 0)] = 1e-12;
        a[(1, 1)] = 1e-12;
        // Tiny but perfectly conditioned.
        let x = LinearSolver::default().solve(&a, &[1e-12, 2e-12]).unwrap();
        assert_abs_diff_eq!(x[0], 1.0, epsilon = 1e-9);
        assert_abs_diff_eq!(x[1], 2.0, epsilon = 1e-9);
    }

    #[test]
    fn rejects_mismatched_rhs() {
        let err = LinearSolver::default()
            .solve(&SquareMatrix::identity(3), &[1.0])
            .unwrap_err();
        assert_eq!(
            err,
            Error::DimensionMismatch {
                what: "right-hand side",
                expected: 3,
                actual: 1
            }
        );
    }

    #[test]
    fn from_rows_rejects_ragged_input() {
        assert!(SquareMatrix::from_rows(&[vec![1.0, 2.0], vec![3.0]]).is_err());
    }
}
