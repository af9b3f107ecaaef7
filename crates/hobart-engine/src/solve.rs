//! Dense symmetric positive definite solves.
//!
//! The normal-equation systems here have one row and column per
//! regressor, so the crate factors them directly with plain loops rather
//! than binding a LAPACK backend. `cholesky` reports the first column
//! whose pivot collapses, which is how exact collinearity among
//! regressors surfaces.

use ndarray::{Array1, Array2};

use crate::EngineError;

/// Threshold for declaring a pivot non-positive, relative to the largest
/// diagonal entry of the input.
const PIVOT_TOLERANCE: f64 = 1e-10;

/// Lower-triangular Cholesky factor of a symmetric positive definite
/// matrix.
///
/// # Errors
///
/// Returns [`EngineError::Collinear`] naming the first column whose
/// pivot falls below tolerance.
pub(crate) fn cholesky(a: &Array2<f64>) -> Result<Array2<f64>, EngineError> {
    let n = a.nrows();
    let scale = (0..n)
        .map(|i| a[[i, i]].abs())
        .fold(0.0f64, f64::max)
        .max(1.0);
    let mut l = Array2::<f64>::zeros((n, n));
    for j in 0..n {
        let mut diag = a[[j, j]];
        for k in 0..j {
            diag -= l[[j, k]] * l[[j, k]];
        }
        if diag <= PIVOT_TOLERANCE * scale {
            return Err(EngineError::Collinear { column: j });
        }
        l[[j, j]] = diag.sqrt();
        for i in (j + 1)..n {
            let mut v = a[[i, j]];
            for k in 0..j {
                v -= l[[i, k]] * l[[j, k]];
            }
            l[[i, j]] = v / l[[j, j]];
        }
    }
    Ok(l)
}

/// Solves `A x = b` given the lower Cholesky factor of `A`.
pub(crate) fn solve_with_factor(l: &Array2<f64>, b: &Array1<f64>) -> Array1<f64> {
    let n = l.nrows();
    // Forward substitution: L z = b.
    let mut z = Array1::<f64>::zeros(n);
    for i in 0..n {
        let mut v = b[i];
        for k in 0..i {
            v -= l[[i, k]] * z[k];
        }
        z[i] = v / l[[i, i]];
    }
    // Back substitution: L' x = z.
    let mut x = Array1::<f64>::zeros(n);
    for i in (0..n).rev() {
        let mut v = z[i];
        for k in (i + 1)..n {
            v -= l[[k, i]] * x[k];
        }
        x[i] = v / l[[i, i]];
    }
    x
}

/// Inverse of a symmetric positive definite matrix from its Cholesky
/// factor, by solving against unit vectors.
pub(crate) fn inverse_from_factor(l: &Array2<f64>) -> Array2<f64> {
    let n = l.nrows();
    let mut inv = Array2::<f64>::zeros((n, n));
    for j in 0..n {
        let mut e = Array1::<f64>::zeros(n);
        e[j] = 1.0;
        inv.column_mut(j).assign(&solve_with_factor(l, &e));
    }
    // Force exact symmetry.
    for i in 0..n {
        for j in (i + 1)..n {
            let v = 0.5 * (inv[[i, j]] + inv[[j, i]]);
            inv[[i, j]] = v;
            inv[[j, i]] = v;
        }
    }
    inv
}
