//! Cluster-robust covariance for the within estimator.
//!
//! One-way clustering with the finite-sample correction used by panel
//! fixed-effects implementations:
//!
//! ```text
//! V = c * (X'X)^-1 [ sum_g (X_g' e_g)(X_g' e_g)' ] (X'X)^-1
//! c = G/(G-1) * (N-1)/(N-K)
//! ```
//!
//! where `G` is the number of clusters and `K` counts the regressors
//! plus the absorbed fixed effect parameters.
//!
//! # References
//! - Liang, K. Y., & Zeger, S. L. (1986). "Longitudinal data analysis
//!   using generalized linear models." Biometrika, 73(1), 13-22.
//! - Cameron, A. C., & Miller, D. L. (2015). "A Practitioner's Guide to
//!   Cluster-Robust Inference." Journal of Human Resources, 50(2).

use ndarray::{Array1, Array2};

/// Sandwich covariance clustered by dense cluster codes.
///
/// `k_absorbed` is the parameter count consumed by absorbed fixed
/// effects; it enters only the small-sample correction. Returns the
/// covariance matrix and the number of clusters.
pub(crate) fn cluster_covariance(
    x: &Array2<f64>,
    residuals: &Array1<f64>,
    xtx_inv: &Array2<f64>,
    cluster_codes: &[usize],
    k_absorbed: usize,
) -> (Array2<f64>, usize) {
    let n = x.nrows();
    let p = x.ncols();
    let n_clusters = cluster_codes.iter().copied().max().map_or(0, |m| m + 1);

    // Score sums s_g = X_g' e_g.
    let mut scores = Array2::<f64>::zeros((n_clusters, p));
    for row in 0..n {
        let g = cluster_codes[row];
        let e = residuals[row];
        for j in 0..p {
            scores[[g, j]] += x[[row, j]] * e;
        }
    }

    let mut meat = Array2::<f64>::zeros((p, p));
    for g in 0..n_clusters {
        for a in 0..p {
            let sa = scores[[g, a]];
            for b in 0..p {
                meat[[a, b]] += sa * scores[[g, b]];
            }
        }
    }

    let mut vcov = xtx_inv.dot(&meat).dot(xtx_inv);

    let k_total = p + k_absorbed;
    let correction = if n_clusters > 1 && n > k_total {
        let g = n_clusters as f64;
        let nn = n as f64;
        (g / (g - 1.0)) * ((nn - 1.0) / (nn - k_total as f64))
    } else {
        1.0
    };
    vcov *= correction;
    (vcov, n_clusters)
}
