#![doc = include_str!("../README.md")]
#![doc(issue_tracker_base_url = "https://github.com/factordynamics/hobart/issues/")]
#![cfg_attr(docsrs, feature(doc_cfg, doc_auto_cfg))]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

mod absorb;
mod cluster;
mod solve;
pub mod within;

pub use within::{WithinConfig, WithinEngine};

use ndarray::{Array1, Array2};
use polars::prelude::DataFrame;
use thiserror::Error;

/// Errors that can occur inside a regression engine.
#[derive(Debug, Error)]
pub enum EngineError {
    /// The plan referenced a column the estimation frame does not have.
    #[error("column '{0}' not found in the estimation frame")]
    MissingColumn(String),

    /// A used column contains missing values.
    #[error("column '{column}' contains missing values")]
    MissingValues {
        /// Offending column name.
        column: String,
    },

    /// A column cannot be converted to the required type.
    #[error("column '{column}' of dtype {dtype} is not usable as {target}")]
    UnsupportedColumn {
        /// Offending column name.
        column: String,
        /// Observed dtype.
        dtype: String,
        /// What the column was needed as.
        target: &'static str,
    },

    /// The plan itself is unusable.
    #[error("invalid regression plan: {0}")]
    InvalidPlan(String),

    /// The estimation frame has no rows.
    #[error("estimation sample is empty")]
    EmptySample,

    /// Alternating projections failed to converge.
    #[error("fixed effect absorption did not converge within {iterations} iterations")]
    NoConvergence {
        /// Iteration cap that was hit.
        iterations: usize,
    },

    /// A normal-equation pivot collapsed at the given column.
    #[error("regressor column {column} is exactly collinear with earlier columns")]
    Collinear {
        /// Zero-based index of the offending column.
        column: usize,
    },

    /// No identifiable regressors remain after dropping collinear ones.
    #[error("model is underdetermined: {observations} observations cannot identify {regressors} regressors")]
    Underdetermined {
        /// Rows in the estimation sample.
        observations: usize,
        /// Regressors originally requested.
        regressors: usize,
    },

    /// Polars DataFrame operation failed.
    #[error("DataFrame error: {0}")]
    DataFrame(#[from] polars::error::PolarsError),
}

/// What to regress: a response, ordered regressors, fixed effect
/// dimensions to absorb and a cluster dimension.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RegressionPlan {
    /// Response column.
    pub response: String,
    /// Regressor columns. The fit reports coefficients in this order,
    /// minus any column the engine had to drop.
    pub regressors: Vec<String>,
    /// Fixed effect dimensions to absorb (may be empty).
    pub absorb: Vec<String>,
    /// Cluster dimension for the covariance.
    pub cluster: String,
}

/// A fitted regression.
#[derive(Debug, Clone)]
pub struct RegressionFit {
    /// Point estimates, aligned with `regressors`.
    pub coefficients: Array1<f64>,
    /// Cluster-robust covariance of the coefficients.
    pub covariance: Array2<f64>,
    /// Labels of the surviving regressors, in plan order.
    pub regressors: Vec<String>,
    /// Rows in the estimation sample.
    pub n_obs: usize,
    /// Distinct clusters in the estimation sample.
    pub n_clusters: usize,
}

/// A regression backend that can absorb fixed effects and cluster
/// standard errors.
///
/// Implementations must keep `coefficients`, `covariance` and
/// `regressors` aligned, and must drop (never reorder) regressors they
/// cannot identify so callers can detect a reduced model from the
/// labels.
pub trait RegressionEngine: Send + Sync {
    /// Engine name as used by [`engine_by_name`].
    fn name(&self) -> &'static str;

    /// Fits the plan on the given estimation frame.
    ///
    /// # Errors
    ///
    /// Implementation specific; see [`EngineError`].
    fn fit(&self, data: &DataFrame, plan: &RegressionPlan) -> Result<RegressionFit, EngineError>;
}

/// Looks up a bundled engine by name.
///
/// `"within"` resolves to [`WithinEngine`] with default configuration.
/// Unknown names return `None` so callers can surface their own
/// missing-backend error.
#[must_use]
pub fn engine_by_name(name: &str) -> Option<Box<dyn RegressionEngine>> {
    match name {
        "within" => Some(Box::new(WithinEngine::default())),
        _ => None,
    }
}
