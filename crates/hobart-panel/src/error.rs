//! Error types for panel preparation.

use thiserror::Error;

/// Errors raised while validating or preparing panel data.
#[derive(Error, Debug)]
pub enum PanelError {
    /// Event window bounds or reference period are inconsistent.
    #[error("invalid event window [{from}, {to}] with reference {reference}: {reason}")]
    InvalidWindow {
        /// First event period requested.
        from: i64,
        /// Last event period requested.
        to: i64,
        /// Requested reference period.
        reference: i64,
        /// What made the window invalid.
        reason: &'static str,
    },

    /// A required column is missing from the input panel.
    #[error("column '{0}' not found in the panel")]
    MissingColumn(String),

    /// A generated lead/lag column name is already present in the panel.
    #[error("column '{0}' already exists in the panel")]
    ColumnCollision(String),

    /// The panel has more than one row for some (unit, time) pair.
    #[error("panel is not unique on ({unit}, {time}): {duplicates} duplicated pairs")]
    DuplicateObservations {
        /// Unit identifier column.
        unit: String,
        /// Time column.
        time: String,
        /// Number of (unit, time) pairs appearing more than once.
        duplicates: usize,
    },

    /// The time column is not an integer period index.
    #[error("column '{column}' has dtype {dtype}, expected an integer period index")]
    NonIntegerTime {
        /// Offending column name.
        column: String,
        /// Observed dtype.
        dtype: String,
    },

    /// Simulation configuration is unusable.
    #[error("invalid simulation config: {0}")]
    InvalidConfig(String),

    /// Polars DataFrame operation failed.
    #[error("DataFrame error: {0}")]
    DataFrame(#[from] polars::error::PolarsError),
}

/// Result type alias for panel operations.
pub type Result<T> = std::result::Result<T, PanelError>;
