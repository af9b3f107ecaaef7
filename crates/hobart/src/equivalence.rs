//! Numerical cross-check between the two estimator bases.
//!
//! The distributed-lag and binned parameterisations are algebraically
//! equivalent on identical samples, so fitting both and comparing the
//! resulting tables is a strong end-to-end check of the whole pipeline:
//! panel construction, absorption, clustering and the cumulative
//! transformation all have to agree for the deviations to vanish.

use hobart_engine::{engine_by_name, RegressionEngine};
use polars::prelude::DataFrame;

use crate::binned::{estimate_binned, BinnedEstimate};
use crate::config::DistributedLagConfig;
use crate::error::{DlmError, Result};
use crate::model::DistributedLagModel;
use crate::result::EventStudyEstimate;

/// Outcome of running both estimators on the same panel.
#[derive(Debug, Clone)]
pub struct EquivalenceReport {
    /// The distributed-lag estimate.
    pub distributed_lag: EventStudyEstimate,
    /// The binned event-study estimate.
    pub binned: BinnedEstimate,
    /// Largest absolute coefficient difference across event times.
    pub max_coef_deviation: f64,
    /// Largest absolute standard error difference across event times.
    pub max_se_deviation: f64,
}

impl EquivalenceReport {
    /// Whether both deviations stay within `tolerance`.
    #[must_use]
    pub fn within(&self, tolerance: f64) -> bool {
        self.max_coef_deviation <= tolerance && self.max_se_deviation <= tolerance
    }
}

/// Runs the distributed-lag and binned estimators on the same panel and
/// reports how far apart they land.
///
/// # Errors
///
/// Returns [`DlmError::SampleMismatch`] when the two designs end up on
/// different estimation samples, which gapped unit series can cause,
/// plus anything either estimator raises.
pub fn check_equivalence(
    panel: &DataFrame,
    config: &DistributedLagConfig,
) -> Result<EquivalenceReport> {
    let engine = engine_by_name(&config.engine).ok_or_else(|| DlmError::MissingDependency {
        engine: config.engine.clone(),
    })?;
    check_equivalence_with_engine(panel, config, engine.as_ref())
}

/// [`check_equivalence`] with a caller-supplied engine.
///
/// # Errors
///
/// Same conditions as [`check_equivalence`], minus engine resolution.
pub fn check_equivalence_with_engine(
    panel: &DataFrame,
    config: &DistributedLagConfig,
    engine: &dyn RegressionEngine,
) -> Result<EquivalenceReport> {
    let model = DistributedLagModel::new(config.clone())?;
    let distributed_lag = model.estimate_with_engine(panel, engine)?;
    let binned = estimate_binned(panel, config, engine)?;

    if distributed_lag.n_obs != binned.n_obs {
        return Err(DlmError::SampleMismatch {
            dlm: distributed_lag.n_obs,
            binned: binned.n_obs,
        });
    }

    let mut max_coef = 0.0f64;
    let mut max_se = 0.0f64;
    for (a, b) in distributed_lag.table.iter().zip(&binned.table) {
        max_coef = max_coef.max((a.coef - b.coef).abs());
        max_se = max_se.max((a.se - b.se).abs());
    }

    log::debug!(
        "equivalence check: max coefficient deviation {max_coef:.3e}, max se deviation {max_se:.3e}"
    );

    Ok(EquivalenceReport {
        distributed_lag,
        binned,
        max_coef_deviation: max_coef,
        max_se_deviation: max_se,
    })
}
