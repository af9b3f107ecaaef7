//! Estimation configuration.

use serde::{Deserialize, Serialize};

/// Configuration of a distributed-lag event-study estimation.
///
/// The window runs from `from` (a negative lead horizon) to `to` (a
/// positive lag horizon) in event time, with `reference` the omitted
/// period that anchors the reported effects at zero.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DistributedLagConfig {
    /// Outcome column.
    pub outcome: String,
    /// Treatment exposure column. Leads and lags of this column form
    /// the regressor block.
    pub exposure: String,
    /// Unit identifier column. Also the clustering dimension for
    /// standard errors.
    pub unit: String,
    /// Time column. Must hold integer periods.
    pub time: String,
    /// First event period of the window, strictly negative.
    pub from: i64,
    /// Last event period of the window, strictly positive.
    pub to: i64,
    /// The omitted reference period, inside `[from, to]`.
    pub reference: i64,
    /// Control columns entering the regression after the lead/lag block.
    pub covariates: Vec<String>,
    /// Fixed-effect dimensions absorbed in addition to unit and time.
    pub extra_absorb: Vec<String>,
    /// Regression engine name. `"within"` is bundled.
    pub engine: String,
    /// Emit per-stage progress at info level.
    pub verbose: bool,
}

impl DistributedLagConfig {
    /// Creates a configuration with reference period `-1`, no
    /// covariates, no extra absorbed dimensions and the bundled
    /// `"within"` engine.
    #[must_use]
    pub fn new(outcome: &str, exposure: &str, unit: &str, time: &str, from: i64, to: i64) -> Self {
        Self {
            outcome: outcome.to_string(),
            exposure: exposure.to_string(),
            unit: unit.to_string(),
            time: time.to_string(),
            from,
            to,
            reference: -1,
            covariates: Vec::new(),
            extra_absorb: Vec::new(),
            engine: "within".to_string(),
            verbose: false,
        }
    }

    /// Sets the omitted reference period.
    #[must_use]
    pub fn with_reference(mut self, reference: i64) -> Self {
        self.reference = reference;
        self
    }

    /// Sets the control columns.
    #[must_use]
    pub fn with_covariates(mut self, covariates: &[&str]) -> Self {
        self.covariates = covariates.iter().map(|c| (*c).to_string()).collect();
        self
    }

    /// Absorbs additional fixed-effect dimensions beyond unit and time.
    #[must_use]
    pub fn with_extra_absorb(mut self, dimensions: &[&str]) -> Self {
        self.extra_absorb = dimensions.iter().map(|d| (*d).to_string()).collect();
        self
    }

    /// Selects the regression engine by name.
    #[must_use]
    pub fn with_engine(mut self, engine: &str) -> Self {
        self.engine = engine.to_string();
        self
    }

    /// Toggles per-stage progress logging.
    #[must_use]
    pub fn with_verbose(mut self, verbose: bool) -> Self {
        self.verbose = verbose;
        self
    }

    /// The absorbed dimensions: unit and time fixed effects plus any
    /// extras, in that order.
    #[must_use]
    pub fn absorb_columns(&self) -> Vec<String> {
        let mut absorb = vec![self.unit.clone(), self.time.clone()];
        absorb.extend(self.extra_absorb.iter().cloned());
        absorb
    }

    /// Columns whose missing values shrink the estimation sample.
    pub(crate) fn complete_case_columns(&self) -> Vec<String> {
        let mut columns = vec![self.outcome.clone()];
        columns.extend(self.covariates.iter().cloned());
        columns
    }
}
