//! Ordinary least squares.
//!
//! The predictor solves one small regression problem:
//!
//! ```text
//! minimize Σ (y_i - x_i^T β)^2
//! ```
//!
//! where `x_i` is a selected-feature row with a leading `1.0` for the intercept.
//!
//! Implementation choices:
//! - SVD handles tall design matrices (more rows than columns) directly.
//!   (Nalgebra's `QR::solve` is intended for square systems.)
//! - Rank is checked before solving so that constant or collinear columns are
//!   reported instead of silently producing a minimum-norm solution.

use nalgebra::{DMatrix, DVector};

/// Relative singular-value cutoff used for rank detection.
pub const RANK_RTOL: f64 = 1e-10;

/// Numerical rank of `x`: singular values above `RANK_RTOL * σ_max`.
pub fn numerical_rank(x: &DMatrix<f64>) -> usize {
    if x.is_empty() {
        return 0;
    }
    let sv = x.singular_values();
    let sigma_max = sv.max();
    if !(sigma_max.is_finite() && sigma_max > 0.0) {
        return 0;
    }
    sv.iter().filter(|&&s| s > RANK_RTOL * sigma_max).count()
}

/// Solve a least squares problem using SVD.
///
/// Returns `None` if the system cannot be solved to a finite solution.
pub fn solve_least_squares(x: &DMatrix<f64>, y: &DVector<f64>) -> Option<DVector<f64>> {
    let svd = x.clone().svd(true, true);

    // Try progressively looser tolerances if strict solve fails.
    for &tol in &[1e-12, 1e-10, 1e-8] {
        if let Ok(beta) = svd.solve(y, tol) {
            if beta.iter().all(|v| v.is_finite()) {
                return Some(beta);
            }
        }
    }

    None
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn least_squares_solves_simple_system() {
        // Fit y = 2 + 3x on x = [0,1,2]
        let x = DMatrix::from_row_slice(3, 2, &[1.0, 0.0, 1.0, 1.0, 1.0, 2.0]);
        let y = DVector::from_row_slice(&[2.0, 5.0, 8.0]);

        let beta = solve_least_squares(&x, &y).unwrap();
        assert!((beta[0] - 2.0).abs() < 1e-10);
        assert!((beta[1] - 3.0).abs() < 1e-10);
    }

    #[test]
    fn rank_detects_collinear_columns() {
        let full = DMatrix::from_row_slice(3, 2, &[1.0, 0.0, 1.0, 1.0, 1.0, 2.0]);
        assert_eq!(numerical_rank(&full), 2);

        // Second column is a multiple of the intercept column.
        let collinear = DMatrix::from_row_slice(3, 2, &[1.0, 0.5, 1.0, 0.5, 1.0, 0.5]);
        assert_eq!(numerical_rank(&collinear), 1);

        assert_eq!(numerical_rank(&DMatrix::<f64>::zeros(0, 0)), 0);
    }
}
