//! Error types for the estimator.

use hobart_engine::EngineError;
use hobart_panel::PanelError;
use thiserror::Error;

/// Errors surfaced while configuring or running an estimation.
#[derive(Debug, Error)]
pub enum DlmError {
    /// Panel preparation failed: invalid window, missing or malformed
    /// columns, duplicate observations.
    #[error("panel error: {0}")]
    Panel(#[from] PanelError),

    /// The configured regression engine is not registered.
    #[error("regression engine '{engine}' is not available")]
    MissingDependency {
        /// The engine name that failed to resolve.
        engine: String,
    },

    /// The engine could not identify every requested coefficient.
    #[error("underdetermined model ({reason}): expected {expected} terms, got {returned}")]
    UnderdeterminedModel {
        /// What went missing or misaligned.
        reason: &'static str,
        /// How many terms the design asked for.
        expected: usize,
        /// How many usable terms the engine reported.
        returned: usize,
    },

    /// The distributed-lag and binned designs landed on different
    /// estimation samples, so their estimates are not comparable.
    #[error("estimation samples differ: {dlm} distributed-lag rows vs {binned} binned rows")]
    SampleMismatch {
        /// Rows in the distributed-lag sample.
        dlm: usize,
        /// Rows in the binned sample.
        binned: usize,
    },

    /// The regression engine failed.
    #[error("engine error: {0}")]
    Engine(#[from] EngineError),

    /// An underlying DataFrame operation failed.
    #[error("DataFrame error: {0}")]
    DataFrame(#[from] polars::error::PolarsError),
}

/// Convenience alias for estimator results.
pub type Result<T> = std::result::Result<T, DlmError>;
