//! Distributed-lag estimation driver.
//!
//! The pipeline is a single pass: validate the window, materialise the
//! lead/lag columns, restrict the estimation sample (caller filter,
//! then rows with missing outcome or covariate values), run one
//! absorbed regression clustered on units, pull the lead/lag block out
//! of the fit and fold it into the cumulative event-study table. The
//! caller's frame is never mutated.

use hobart_engine::{engine_by_name, RegressionEngine, RegressionPlan};
use hobart_panel::{EventWindow, LeadLagBuilder};
use polars::prelude::*;

use crate::config::DistributedLagConfig;
use crate::error::{DlmError, Result};
use crate::extract::extract_gammas;
use crate::result::EventStudyEstimate;
use crate::transform::gamma_to_beta;

/// A configured distributed-lag event-study estimator.
#[derive(Debug, Clone)]
pub struct DistributedLagModel {
    config: DistributedLagConfig,
    window: EventWindow,
}

impl DistributedLagModel {
    /// Validates the configured window and builds the model.
    ///
    /// # Errors
    ///
    /// Returns [`DlmError::Panel`] wrapping
    /// [`PanelError::InvalidWindow`](hobart_panel::PanelError::InvalidWindow)
    /// for an inconsistent window.
    pub fn new(config: DistributedLagConfig) -> Result<Self> {
        let window = EventWindow::new(config.from, config.to, config.reference)?;
        Ok(Self { config, window })
    }

    /// The validated event window.
    #[must_use]
    pub const fn window(&self) -> &EventWindow {
        &self.window
    }

    /// The configuration the model was built from.
    #[must_use]
    pub const fn config(&self) -> &DistributedLagConfig {
        &self.config
    }

    /// Estimates with the configured engine.
    ///
    /// # Errors
    ///
    /// Returns [`DlmError::MissingDependency`] when the configured
    /// engine name resolves to nothing, plus anything
    /// [`estimate_with_engine`](Self::estimate_with_engine) raises.
    pub fn estimate(&self, panel: &DataFrame) -> Result<EventStudyEstimate> {
        self.run(panel, self.resolve_engine()?.as_ref(), None)
    }

    /// Estimates on the subset of rows selected by a polars expression.
    ///
    /// Lead and lag values still resolve against the full panel, so a
    /// kept row keeps its neighbours even when the filter excludes
    /// those neighbour rows from the estimation sample.
    ///
    /// # Errors
    ///
    /// As [`estimate`](Self::estimate), plus [`DlmError::DataFrame`]
    /// when the expression does not evaluate against the panel.
    pub fn estimate_filtered(&self, panel: &DataFrame, keep: Expr) -> Result<EventStudyEstimate> {
        self.run(panel, self.resolve_engine()?.as_ref(), Some(keep))
    }

    /// Estimates with a caller-supplied engine.
    ///
    /// # Errors
    ///
    /// Propagates panel construction and engine failures; returns
    /// [`DlmError::UnderdeterminedModel`] when the engine cannot
    /// identify every lead/lag term.
    pub fn estimate_with_engine(
        &self,
        panel: &DataFrame,
        engine: &dyn RegressionEngine,
    ) -> Result<EventStudyEstimate> {
        self.run(panel, engine, None)
    }

    fn resolve_engine(&self) -> Result<Box<dyn RegressionEngine>> {
        engine_by_name(&self.config.engine).ok_or_else(|| DlmError::MissingDependency {
            engine: self.config.engine.clone(),
        })
    }

    fn run(
        &self,
        panel: &DataFrame,
        engine: &dyn RegressionEngine,
        keep: Option<Expr>,
    ) -> Result<EventStudyEstimate> {
        let config = &self.config;
        if config.verbose {
            log::info!(
                "estimating effect of '{}' on '{}' over window [{}, {}] with reference {}",
                config.exposure,
                config.outcome,
                self.window.from(),
                self.window.to(),
                self.window.reference()
            );
        }

        let builder =
            LeadLagBuilder::new(&self.window, &config.unit, &config.time, &config.exposure);
        let built = builder.build(panel)?;
        let estimation = match keep {
            Some(expr) => built.estimation.clone().lazy().filter(expr).collect()?,
            None => built.estimation.clone(),
        };
        let estimation = drop_incomplete_rows(&estimation, &config.complete_case_columns())?;

        if config.verbose {
            log::info!(
                "estimation sample: {} of {} rows with engine '{}'",
                estimation.height(),
                panel.height(),
                engine.name()
            );
        }

        let plan = RegressionPlan {
            response: config.outcome.clone(),
            regressors: built
                .columns
                .iter()
                .cloned()
                .chain(config.covariates.iter().cloned())
                .collect(),
            absorb: config.absorb_columns(),
            cluster: config.unit.clone(),
        };
        let fit = engine.fit(&estimation, &plan)?;

        let offsets = self.window.offsets();
        let (gamma, gamma_covariance) = extract_gammas(&fit, &offsets)?;
        let table = gamma_to_beta(&self.window, &gamma, &gamma_covariance)?;

        if config.verbose {
            log::info!(
                "fit complete: {} observations in {} clusters",
                fit.n_obs,
                fit.n_clusters
            );
        }

        Ok(EventStudyEstimate {
            table,
            offsets,
            gamma,
            gamma_covariance,
            n_obs: fit.n_obs,
            n_clusters: fit.n_clusters,
            window: self.window,
            outcome: config.outcome.clone(),
            exposure: config.exposure.clone(),
            unit: config.unit.clone(),
            time: config.time.clone(),
        })
    }
}

/// Drops rows with nulls in any of the named columns.
pub(crate) fn drop_incomplete_rows(frame: &DataFrame, columns: &[String]) -> Result<DataFrame> {
    let mut keep = lit(true);
    for name in columns {
        keep = keep.and(col(name.as_str()).is_not_null());
    }
    Ok(frame.clone().lazy().filter(keep).collect()?)
}
