#![doc = include_str!("../README.md")]
#![doc(issue_tracker_base_url = "https://github.com/factordynamics/hobart/issues/")]
#![cfg_attr(docsrs, feature(doc_cfg, doc_auto_cfg))]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

pub mod error;
pub mod leadlag;
pub mod offset;
pub mod simulate;
pub mod window;

pub use error::{PanelError, Result};
pub use leadlag::{LeadLagBuilder, LeadLagPanel};
pub use offset::EventOffset;
pub use simulate::{SimulationConfig, simulate_panel};
pub use window::EventWindow;
