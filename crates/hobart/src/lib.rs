#![doc = include_str!("../README.md")]
#![doc(issue_tracker_base_url = "https://github.com/factordynamics/hobart/issues/")]
#![cfg_attr(docsrs, feature(doc_cfg, doc_auto_cfg))]
#![warn(missing_docs)]
#![deny(unsafe_code)]

pub mod binned;
pub mod config;
pub mod equivalence;
pub mod error;
pub mod model;
pub mod result;
pub mod transform;

mod extract;

pub use binned::{estimate_binned, BinnedEstimate};
pub use config::DistributedLagConfig;
pub use equivalence::{check_equivalence, check_equivalence_with_engine, EquivalenceReport};
pub use error::{DlmError, Result};
pub use model::DistributedLagModel;
pub use result::{BetaRow, EventStudyEstimate};
pub use transform::{gamma_to_beta, Z_95};

// Re-export the building blocks so downstream code needs one import.
pub use hobart_engine::{
    engine_by_name, EngineError, RegressionEngine, RegressionFit, RegressionPlan, WithinConfig,
    WithinEngine,
};
pub use hobart_panel::{
    simulate_panel, EventOffset, EventWindow, LeadLagBuilder, LeadLagPanel, PanelError,
    SimulationConfig,
};

/// Version information.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
