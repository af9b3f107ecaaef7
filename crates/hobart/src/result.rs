//! Estimation results.

use hobart_panel::{EventOffset, EventWindow};
use ndarray::{Array1, Array2};
use polars::prelude::*;
use serde::{Deserialize, Serialize};

use crate::error::Result;

/// One reported event-study row.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BetaRow {
    /// Event time relative to treatment onset.
    pub time_to_event: i64,
    /// Cumulative treatment effect at this event time.
    pub coef: f64,
    /// Delta-method standard error. NaN when the propagated variance
    /// came out negative.
    pub se: f64,
    /// Lower bound of the 95% confidence interval.
    pub ci_lower: f64,
    /// Upper bound of the 95% confidence interval.
    pub ci_upper: f64,
}

/// A fitted event study with its underlying lead/lag estimates.
///
/// `table` holds the cumulative effects in ascending event time, with
/// the reference row pinned to zero. `gamma` and `gamma_covariance`
/// keep the raw lead/lag block in canonical offset order for callers
/// that want to re-derive or test the transformation.
#[derive(Debug, Clone)]
pub struct EventStudyEstimate {
    /// Event-study rows in ascending event time, reference included.
    pub table: Vec<BetaRow>,
    /// Canonical offsets labelling `gamma` and `gamma_covariance`.
    pub offsets: Vec<EventOffset>,
    /// Lead/lag point estimates in canonical order.
    pub gamma: Array1<f64>,
    /// Cluster-robust covariance of `gamma`.
    pub gamma_covariance: Array2<f64>,
    /// Rows in the estimation sample.
    pub n_obs: usize,
    /// Clusters in the estimation sample.
    pub n_clusters: usize,
    /// The event window the estimate was computed for.
    pub window: EventWindow,
    /// Outcome column name.
    pub outcome: String,
    /// Exposure column name.
    pub exposure: String,
    /// Unit column name, also the clustering dimension.
    pub unit: String,
    /// Time column name.
    pub time: String,
}

impl EventStudyEstimate {
    /// The row at a given event time, if inside the window.
    #[must_use]
    pub fn row(&self, time_to_event: i64) -> Option<&BetaRow> {
        self.table.iter().find(|r| r.time_to_event == time_to_event)
    }

    /// Lead/lag estimates paired with their offsets, in canonical order.
    pub fn gammas(&self) -> impl Iterator<Item = (EventOffset, f64)> + '_ {
        self.offsets.iter().copied().zip(self.gamma.iter().copied())
    }

    /// The event-study table as a DataFrame, one row per event time.
    ///
    /// # Errors
    ///
    /// Returns [`DlmError::DataFrame`](crate::DlmError::DataFrame) when
    /// frame assembly fails.
    pub fn to_frame(&self) -> Result<DataFrame> {
        let times: Vec<i64> = self.table.iter().map(|r| r.time_to_event).collect();
        let coefs: Vec<f64> = self.table.iter().map(|r| r.coef).collect();
        let ses: Vec<f64> = self.table.iter().map(|r| r.se).collect();
        let lower: Vec<f64> = self.table.iter().map(|r| r.ci_lower).collect();
        let upper: Vec<f64> = self.table.iter().map(|r| r.ci_upper).collect();
        Ok(DataFrame::new(vec![
            Column::new("time_to_event".into(), times),
            Column::new("coef".into(), coefs),
            Column::new("se".into(), ses),
            Column::new("ci_lower".into(), lower),
            Column::new("ci_upper".into(), upper),
        ])?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::arr1;

    fn sample() -> EventStudyEstimate {
        let window = EventWindow::with_default_reference(-2, 1).unwrap();
        EventStudyEstimate {
            table: vec![
                BetaRow { time_to_event: -2, coef: -0.5, se: 0.1, ci_lower: -0.696, ci_upper: -0.304 },
                BetaRow { time_to_event: -1, coef: 0.0, se: 0.0, ci_lower: 0.0, ci_upper: 0.0 },
                BetaRow { time_to_event: 0, coef: 1.5, se: 0.2, ci_lower: 1.108, ci_upper: 1.892 },
                BetaRow { time_to_event: 1, coef: 2.0, se: 0.3, ci_lower: 1.412, ci_upper: 2.588 },
            ],
            offsets: window.offsets(),
            gamma: arr1(&[0.5, 1.5, 0.5]),
            gamma_covariance: ndarray::Array2::eye(3) * 0.01,
            n_obs: 400,
            n_clusters: 40,
            window,
            outcome: "y".to_string(),
            exposure: "d".to_string(),
            unit: "firm".to_string(),
            time: "year".to_string(),
        }
    }

    #[test]
    fn test_row_lookup() {
        let estimate = sample();
        assert_eq!(estimate.row(-1).unwrap().coef, 0.0);
        assert_eq!(estimate.row(1).unwrap().coef, 2.0);
        assert!(estimate.row(5).is_none());
    }

    #[test]
    fn test_gammas_pair_offsets_with_estimates() {
        let estimate = sample();
        let pairs: Vec<_> = estimate.gammas().collect();
        assert_eq!(pairs.len(), 3);
        assert!(pairs[0].0.is_lead());
        assert_eq!(pairs[1].1, 1.5);
    }

    #[test]
    fn test_to_frame_shape() {
        let frame = sample().to_frame().unwrap();
        assert_eq!(frame.height(), 4);
        let names: Vec<&str> = frame.get_column_names().iter().map(|c| c.as_str()).collect();
        assert_eq!(names, vec!["time_to_event", "coef", "se", "ci_lower", "ci_upper"]);
        let coefs = frame.column("coef").unwrap().f64().unwrap();
        assert_eq!(coefs.get(2), Some(1.5));
    }
}
