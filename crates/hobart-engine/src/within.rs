//! Within (fixed effects) regression engine.
//!
//! The bundled implementation of [`RegressionEngine`]: absorbs the fixed
//! effect dimensions by alternating projections, solves the demeaned
//! normal equations by Cholesky, and reports a cluster-robust
//! covariance. Exactly collinear regressors are dropped and omitted from
//! the reported labels, the way production fixed-effects solvers behave,
//! so callers can detect a reduced model.

use std::collections::HashMap;

use ndarray::{Array1, Array2};
use polars::prelude::*;
use serde::{Deserialize, Serialize};

use crate::absorb::Absorber;
use crate::cluster::cluster_covariance;
use crate::solve::{cholesky, inverse_from_factor, solve_with_factor};
use crate::{EngineError, RegressionEngine, RegressionFit, RegressionPlan};

/// Configuration for [`WithinEngine`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WithinConfig {
    /// Convergence tolerance for the alternating projections: the largest
    /// absolute group mean left after a full sweep.
    pub tolerance: f64,

    /// Sweep cap for the alternating projections.
    pub max_iterations: usize,
}

impl Default for WithinConfig {
    fn default() -> Self {
        Self {
            tolerance: 1e-10,
            max_iterations: 10_000,
        }
    }
}

/// Fixed effects regression by iterated demeaning.
#[derive(Debug, Clone, Default)]
pub struct WithinEngine {
    config: WithinConfig,
}

impl WithinEngine {
    /// Creates an engine with the given configuration.
    #[must_use]
    pub const fn new(config: WithinConfig) -> Self {
        Self { config }
    }
}

impl RegressionEngine for WithinEngine {
    fn name(&self) -> &'static str {
        "within"
    }

    fn fit(&self, data: &DataFrame, plan: &RegressionPlan) -> Result<RegressionFit, EngineError> {
        if plan.regressors.is_empty() {
            return Err(EngineError::InvalidPlan("no regressors requested".to_string()));
        }
        let n = data.height();
        if n == 0 {
            return Err(EngineError::EmptySample);
        }

        let mut response = numeric_column(data, &plan.response)?;
        let mut columns: Vec<(String, Vec<f64>)> = Vec::with_capacity(plan.regressors.len());
        for name in &plan.regressors {
            columns.push((name.clone(), numeric_column(data, name)?));
        }
        let absorber = build_absorber(data, &plan.absorb, n, &self.config)?;
        let (cluster_codes, _) = integer_codes(data, &plan.cluster)?;

        absorber.demean(&mut response)?;
        for (_, values) in &mut columns {
            absorber.demean(values)?;
        }
        let y = Array1::from_vec(response);

        let (beta, xtx_inv, x, labels) = loop {
            if columns.is_empty() {
                return Err(EngineError::Underdetermined {
                    observations: n,
                    regressors: plan.regressors.len(),
                });
            }
            let x = assemble(&columns, n);
            let xtx = x.t().dot(&x);
            match cholesky(&xtx) {
                Ok(l) => {
                    let xty = x.t().dot(&y);
                    let beta = solve_with_factor(&l, &xty);
                    let xtx_inv = inverse_from_factor(&l);
                    let labels: Vec<String> =
                        columns.iter().map(|(name, _)| name.clone()).collect();
                    break (beta, xtx_inv, x, labels);
                }
                Err(EngineError::Collinear { column }) => {
                    let (name, _) = columns.remove(column);
                    log::debug!("dropping exactly collinear regressor '{name}'");
                }
                Err(e) => return Err(e),
            }
        };

        let residuals = &y - &x.dot(&beta);
        let (covariance, n_clusters) = cluster_covariance(
            &x,
            &residuals,
            &xtx_inv,
            &cluster_codes,
            absorber.absorbed_dof(),
        );

        log::debug!(
            "within fit: {} observations, {} clusters, kept {} of {} regressors",
            n,
            n_clusters,
            labels.len(),
            plan.regressors.len()
        );

        Ok(RegressionFit {
            coefficients: beta,
            covariance,
            regressors: labels,
            n_obs: n,
            n_clusters,
        })
    }
}

/// Extracts a null-free column as `f64` values.
fn numeric_column(data: &DataFrame, name: &str) -> Result<Vec<f64>, EngineError> {
    let column = data
        .column(name)
        .map_err(|_| EngineError::MissingColumn(name.to_string()))?;
    if column.null_count() > 0 {
        return Err(EngineError::MissingValues {
            column: name.to_string(),
        });
    }
    let unsupported = || EngineError::UnsupportedColumn {
        column: name.to_string(),
        dtype: column.dtype().to_string(),
        target: "a numeric column",
    };
    let cast = column
        .cast(&DataType::Float64)
        .map_err(|_| unsupported())?;
    let values = cast.f64()?;
    if values.null_count() > 0 {
        return Err(unsupported());
    }
    Ok(values.into_no_null_iter().collect())
}

/// Extracts a null-free column as dense level codes in first-appearance
/// order, returning the codes and the level count.
fn integer_codes(data: &DataFrame, name: &str) -> Result<(Vec<usize>, usize), EngineError> {
    let column = data
        .column(name)
        .map_err(|_| EngineError::MissingColumn(name.to_string()))?;
    if column.null_count() > 0 {
        return Err(EngineError::MissingValues {
            column: name.to_string(),
        });
    }
    let unsupported = || EngineError::UnsupportedColumn {
        column: name.to_string(),
        dtype: column.dtype().to_string(),
        target: "an integer group code",
    };
    let cast = column.cast(&DataType::Int64).map_err(|_| unsupported())?;
    let values = cast.i64()?;
    if values.null_count() > 0 {
        return Err(unsupported());
    }
    let mut codes = Vec::with_capacity(values.len());
    let mut seen: HashMap<i64, usize> = HashMap::new();
    for v in values.into_no_null_iter() {
        let next = seen.len();
        codes.push(*seen.entry(v).or_insert(next));
    }
    let levels = seen.len();
    Ok((codes, levels))
}

fn build_absorber(
    data: &DataFrame,
    absorb: &[String],
    n: usize,
    config: &WithinConfig,
) -> Result<Absorber, EngineError> {
    let mut dimensions = Vec::with_capacity(absorb.len());
    for name in absorb {
        dimensions.push(integer_codes(data, name)?);
    }
    Absorber::new(dimensions, n, config.tolerance, config.max_iterations)
}

fn assemble(columns: &[(String, Vec<f64>)], n: usize) -> Array2<f64> {
    let mut x = Array2::<f64>::zeros((n, columns.len()));
    for (j, (_, values)) in columns.iter().enumerate() {
        for (i, &v) in values.iter().enumerate() {
            x[[i, j]] = v;
        }
    }
    x
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;
    use polars::df;

    fn plan(regressors: &[&str], absorb: &[&str]) -> RegressionPlan {
        RegressionPlan {
            response: "y".to_string(),
            regressors: regressors.iter().map(|s| (*s).to_string()).collect(),
            absorb: absorb.iter().map(|s| (*s).to_string()).collect(),
            cluster: "unit".to_string(),
        }
    }

    #[test]
    fn test_exact_fit_without_absorption() {
        let frame = df!(
            "unit" => [1i64, 2, 3, 4],
            "x" => [1.0, 2.0, 3.0, 4.0],
            "y" => [2.0, 4.0, 6.0, 8.0],
        )
        .unwrap();
        let fit = WithinEngine::default()
            .fit(&frame, &plan(&["x"], &[]))
            .unwrap();
        assert_eq!(fit.regressors, vec!["x"]);
        assert_eq!(fit.n_obs, 4);
        assert_eq!(fit.n_clusters, 4);
        assert_abs_diff_eq!(fit.coefficients[0], 2.0, epsilon = 1e-12);
        assert_abs_diff_eq!(fit.covariance[[0, 0]], 0.0, epsilon = 1e-12);
    }

    #[test]
    fn test_unit_effects_absorbed() {
        // y = alpha_unit + 1.5 x, alpha in {10, -5}.
        let frame = df!(
            "unit" => [1i64, 1, 1, 2, 2, 2],
            "x" => [1.0, 2.0, 3.0, 1.0, 2.0, 4.0],
            "y" => [11.5, 13.0, 14.5, -3.5, -2.0, 1.0],
        )
        .unwrap();
        let fit = WithinEngine::default()
            .fit(&frame, &plan(&["x"], &["unit"]))
            .unwrap();
        assert_abs_diff_eq!(fit.coefficients[0], 1.5, epsilon = 1e-10);
    }

    #[test]
    fn test_two_way_effects_absorbed() {
        // y = alpha_unit + delta_time + 2 x on a balanced 3 x 3 panel.
        let alphas = [4.0, -1.0, 0.5];
        let deltas = [0.0, 2.0, -3.0];
        let mut unit = Vec::new();
        let mut time = Vec::new();
        let mut x = Vec::new();
        let mut y = Vec::new();
        for (u, alpha) in alphas.iter().enumerate() {
            for (t, delta) in deltas.iter().enumerate() {
                let v = (u as f64) - (t as f64) * 0.5 + ((u + 2 * t) % 3) as f64;
                unit.push(u as i64);
                time.push(t as i64);
                x.push(v);
                y.push(alpha + delta + 2.0 * v);
            }
        }
        let frame = df!(
            "unit" => unit,
            "time" => time,
            "x" => x,
            "y" => y,
        )
        .unwrap();
        let fit = WithinEngine::default()
            .fit(&frame, &plan(&["x"], &["unit", "time"]))
            .unwrap();
        assert_abs_diff_eq!(fit.coefficients[0], 2.0, epsilon = 1e-8);
    }

    #[test]
    fn test_duplicate_regressor_dropped() {
        let frame = df!(
            "unit" => [1i64, 1, 2, 2, 3, 3],
            "x" => [1.0, 2.0, 3.0, 5.0, 4.0, 7.0],
            "x_copy" => [1.0, 2.0, 3.0, 5.0, 4.0, 7.0],
            "y" => [2.0, 4.0, 6.0, 10.0, 8.0, 14.0],
        )
        .unwrap();
        let fit = WithinEngine::default()
            .fit(&frame, &plan(&["x", "x_copy"], &[]))
            .unwrap();
        assert_eq!(fit.regressors, vec!["x"]);
        assert_eq!(fit.coefficients.len(), 1);
        assert_eq!(fit.covariance.shape(), &[1, 1]);
        assert_abs_diff_eq!(fit.coefficients[0], 2.0, epsilon = 1e-10);
    }

    #[test]
    fn test_constant_regressor_under_absorption_is_underdetermined() {
        // A constant column is swallowed whole by the unit means.
        let frame = df!(
            "unit" => [1i64, 1, 2, 2],
            "x" => [1.0, 1.0, 1.0, 1.0],
            "y" => [1.0, 2.0, 3.0, 4.0],
        )
        .unwrap();
        let err = WithinEngine::default()
            .fit(&frame, &plan(&["x"], &["unit"]))
            .unwrap_err();
        assert!(matches!(err, EngineError::Underdetermined { .. }));
    }

    #[test]
    fn test_missing_column_reported() {
        let frame = df!(
            "unit" => [1i64, 2],
            "x" => [1.0, 2.0],
            "y" => [1.0, 2.0],
        )
        .unwrap();
        let err = WithinEngine::default()
            .fit(&frame, &plan(&["absent"], &[]))
            .unwrap_err();
        assert!(matches!(err, EngineError::MissingColumn(c) if c == "absent"));
    }

    #[test]
    fn test_null_values_rejected() {
        let frame = df!(
            "unit" => [1i64, 1, 2, 2],
            "x" => [Some(1.0), None, Some(3.0), Some(4.0)],
            "y" => [1.0, 2.0, 3.0, 4.0],
        )
        .unwrap();
        let err = WithinEngine::default()
            .fit(&frame, &plan(&["x"], &[]))
            .unwrap_err();
        assert!(matches!(err, EngineError::MissingValues { column } if column == "x"));
    }

    #[test]
    fn test_empty_frame_rejected() {
        let frame = df!(
            "unit" => Vec::<i64>::new(),
            "x" => Vec::<f64>::new(),
            "y" => Vec::<f64>::new(),
        )
        .unwrap();
        let err = WithinEngine::default()
            .fit(&frame, &plan(&["x"], &[]))
            .unwrap_err();
        assert!(matches!(err, EngineError::EmptySample));
    }

    #[test]
    fn test_empty_regressor_list_rejected() {
        let frame = df!(
            "unit" => [1i64, 2],
            "y" => [1.0, 2.0],
        )
        .unwrap();
        let err = WithinEngine::default()
            .fit(&frame, &plan(&[], &[]))
            .unwrap_err();
        assert!(matches!(err, EngineError::InvalidPlan(_)));
    }
}
