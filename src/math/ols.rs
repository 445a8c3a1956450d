//! Ordinary least squares solver.
//!
//! We solve small linear regression problems of the form:
//!
//! ```text
//! minimize Σ (y_i - x_i^T β)^2
//! ```
//!
//! Implementation choices:
//! - SVD of the design matrix rather than the normal equations, so the
//!   conditioning of `X` (not `X^T X`) governs accuracy.
//!   (Nalgebra's `QR::solve` is intended for square systems and will panic for
//!   non-square matrices.)
//! - Columns are scaled to unit Euclidean norm first, so the rank decision
//!   does not depend on units (an intercept of ones next to returns of order
//!   1e-2, or a factor quoted in basis points).
//! - Rank is decided up front from the singular values. A rank-deficient
//!   design is an error, never a minimum-norm solution with huge weights.

use nalgebra::{DMatrix, DVector};

/// The design matrix does not have full column rank.
#[derive(Debug, Clone, PartialEq)]
pub struct RankDeficiency {
    pub rank: usize,
    pub columns: usize,
    /// Smallest / largest singular value.
    pub ratio: f64,
}

/// Scale every column of `x` to unit norm. Returns the scaled matrix and the
/// norms; all-zero columns are left as they are (norm reported as 1).
fn equilibrate(x: &DMatrix<f64>) -> (DMatrix<f64>, Vec<f64>) {
    let mut scaled = x.clone();
    let mut norms = Vec::with_capacity(x.ncols());
    for mut col in scaled.column_iter_mut() {
        let norm = col.norm();
        let norm = if norm > 0.0 && norm.is_finite() { norm } else { 1.0 };
        col /= norm;
        norms.push(norm);
    }
    (scaled, norms)
}

/// Numerical rank of `x` (after column scaling) relative to `rel_tol`, plus
/// the singular value ratio.
pub fn numerical_rank(x: &DMatrix<f64>, rel_tol: f64) -> (usize, f64) {
    rank_of_scaled(&equilibrate(x).0, rel_tol)
}

fn rank_of_scaled(x: &DMatrix<f64>, rel_tol: f64) -> (usize, f64) {
    let sv = x.clone().singular_values();
    let max = sv.iter().copied().fold(0.0_f64, f64::max);
    let min = sv.iter().copied().fold(f64::INFINITY, f64::min);
    if !(max.is_finite() && max > 0.0) {
        return (0, 0.0);
    }
    let rank = sv.iter().filter(|&&s| s > rel_tol * max).count();
    (rank, min / max)
}

/// Solve a least squares problem using SVD.
///
/// Fails when `x` has fewer rows than columns or when its singular value ratio
/// is at or below `rel_tol`.
pub fn solve_least_squares(
    x: &DMatrix<f64>,
    y: &DVector<f64>,
    rel_tol: f64,
) -> Result<DVector<f64>, RankDeficiency> {
    let columns = x.ncols();
    let (scaled, norms) = equilibrate(x);
    let (rank, ratio) = rank_of_scaled(&scaled, rel_tol);
    if x.nrows() < columns || rank < columns {
        return Err(RankDeficiency {
            rank,
            columns,
            ratio,
        });
    }

    let svd = scaled.svd(true, true);
    let max = svd.singular_values.max();
    let scaled_beta = svd
        .solve(y, rel_tol * max)
        .map_err(|_| RankDeficiency {
            rank,
            columns,
            ratio,
        })?;
    let beta = DVector::from_iterator(
        columns,
        scaled_beta.iter().zip(&norms).map(|(b, n)| b / n),
    );

    if beta.iter().all(|v| v.is_finite()) {
        Ok(beta)
    } else {
        Err(RankDeficiency {
            rank,
            columns,
            ratio,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::{assert_abs_diff_eq, assert_relative_eq};

    #[test]
    fn least_squares_solves_simple_system() {
        // Fit y = 2 + 3x on x = [0,1,2]
        let x = DMatrix::from_row_slice(3, 2, &[1.0, 0.0, 1.0, 1.0, 1.0, 2.0]);
        let y = DVector::from_row_slice(&[2.0, 5.0, 8.0]);

        let beta = solve_least_squares(&x, &y, 1e-10).unwrap();
        assert_abs_diff_eq!(beta[0], 2.0, epsilon = 1e-10);
        assert_abs_diff_eq!(beta[1], 3.0, epsilon = 1e-10);
    }

    #[test]
    fn collinear_columns_are_rank_deficient() {
        // Third column = 2 × second column.
        let x = DMatrix::from_row_slice(
            4,
            3,
            &[1.0, 0.1, 0.2, 1.0, -0.3, -0.6, 1.0, 0.5, 1.0, 1.0, 0.2, 0.4],
        );
        let y = DVector::from_row_slice(&[0.1, 0.2, 0.3, 0.4]);

        let err = solve_least_squares(&x, &y, 1e-10).unwrap_err();
        assert_eq!(err.columns, 3);
        assert_eq!(err.rank, 2);
        assert!(err.ratio < 1e-10);
    }

    #[test]
    fn tiny_but_independent_factor_is_full_rank() {
        // Second column is of order 1e-12: raw singular values differ by far
        // more than the tolerance, but the columns are not collinear.
        let x = DMatrix::from_row_slice(
            4,
            2,
            &[1.0, 0.0, 1.0, 1e-12, 1.0, 2e-12, 1.0, 3e-12],
        );
        let y = DVector::from_row_slice(&[2.0, 2.5, 3.0, 3.5]);

        let (rank, _) = numerical_rank(&x, 1e-10);
        assert_eq!(rank, 2);
        let beta = solve_least_squares(&x, &y, 1e-10).unwrap();
        assert_abs_diff_eq!(beta[0], 2.0, epsilon = 1e-9);
        assert_relative_eq!(beta[1], 5e11, max_relative = 1e-9);
    }

    #[test]
    fn underdetermined_system_is_rejected() {
        let x = DMatrix::from_row_slice(1, 2, &[1.0, 0.5]);
        let y = DVector::from_row_slice(&[1.0]);
        assert!(solve_least_squares(&x, &y, 1e-10).is_err());
    }
}
