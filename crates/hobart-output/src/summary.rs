//! Event-study summary rendering.
//!
//! Renders an estimated event-study table for terminal display or
//! Markdown documentation, with per-row significance markers based on
//! the 95% confidence interval.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::export::EventTimeRecord;

/// A renderable summary of an event-study estimate.
///
/// Holds the reported table plus the sample metadata that belongs in a
/// header. Rows are expected in ascending event time.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct EstimateSummary {
    /// Outcome column name.
    pub outcome: String,

    /// Exposure column name.
    pub exposure: String,

    /// First event period of the window.
    pub from: i64,

    /// Last event period of the window.
    pub to: i64,

    /// Omitted reference period.
    pub reference: i64,

    /// Rows in the estimation sample.
    pub n_obs: usize,

    /// Clusters in the estimation sample.
    pub n_clusters: usize,

    /// Event-study rows in ascending event time.
    pub rows: Vec<EventTimeRecord>,
}

impl EstimateSummary {
    /// Create a new summary.
    ///
    /// # Examples
    ///
    /// ```
    /// use hobart_output::{EstimateSummary, EventTimeRecord};
    ///
    /// let rows = vec![
    ///     EventTimeRecord { time_to_event: -1, coef: 0.0, se: 0.0, ci_lower: 0.0, ci_upper: 0.0 },
    ///     EventTimeRecord { time_to_event: 0, coef: -2.9, se: 0.1, ci_lower: -3.096, ci_upper: -2.704 },
    /// ];
    /// let summary = EstimateSummary::new(
    ///     "outcome".to_string(),
    ///     "post".to_string(),
    ///     -1,
    ///     1,
    ///     -1,
    ///     4800,
    ///     400,
    ///     rows,
    /// );
    ///
    /// assert_eq!(summary.n_clusters, 400);
    /// ```
    #[must_use]
    #[allow(clippy::too_many_arguments)]
    pub const fn new(
        outcome: String,
        exposure: String,
        from: i64,
        to: i64,
        reference: i64,
        n_obs: usize,
        n_clusters: usize,
        rows: Vec<EventTimeRecord>,
    ) -> Self {
        Self {
            outcome,
            exposure,
            from,
            to,
            reference,
            n_obs,
            n_clusters,
            rows,
        }
    }

    /// Whether a row's 95% interval excludes zero.
    ///
    /// The reference row has a degenerate zero interval and is never
    /// significant; rows with NaN bounds are not either.
    #[must_use]
    pub fn is_significant(row: &EventTimeRecord) -> bool {
        row.ci_lower > 0.0 || row.ci_upper < 0.0
    }

    /// Count of rows whose interval excludes zero.
    #[must_use]
    pub fn significant_rows(&self) -> usize {
        self.rows.iter().filter(|r| Self::is_significant(r)).count()
    }

    /// Format as a fixed-width table for terminal display.
    #[must_use]
    pub fn to_ascii_table(&self) -> String {
        let mut output = String::new();

        output.push_str(&format!(
            "\nEvent study: {} on leads/lags of {}\n",
            self.outcome, self.exposure
        ));
        output.push_str(&format!(
            "Window [{}, {}] with reference {}; {} observations in {} clusters\n",
            self.from, self.to, self.reference, self.n_obs, self.n_clusters
        ));
        output.push_str(&"=".repeat(64));
        output.push('\n');
        output.push_str(&format!(
            "{:>6} {:>12} {:>10} {:>12} {:>12}\n",
            "t", "coef", "se", "ci_lower", "ci_upper"
        ));
        output.push_str(&"-".repeat(64));
        output.push('\n');

        for row in &self.rows {
            let marker = if row.time_to_event == self.reference {
                "  (ref)"
            } else if Self::is_significant(row) {
                " *"
            } else {
                ""
            };
            output.push_str(&format!(
                "{:>6} {:>12.4} {:>10.4} {:>12.4} {:>12.4}{}\n",
                row.time_to_event, row.coef, row.se, row.ci_lower, row.ci_upper, marker
            ));
        }

        output.push_str(&"=".repeat(64));
        output.push('\n');
        output.push_str("* 95% interval excludes zero\n");

        output
    }

    /// Format as Markdown for documentation.
    #[must_use]
    pub fn to_markdown(&self) -> String {
        let mut output = String::new();

        output.push_str(&format!(
            "# Event study: {} on leads/lags of {}\n\n",
            self.outcome, self.exposure
        ));
        output.push_str(&format!(
            "**Window:** [{}, {}], reference {}\n\n",
            self.from, self.to, self.reference
        ));
        output.push_str(&format!(
            "**Sample:** {} observations in {} clusters\n\n",
            self.n_obs, self.n_clusters
        ));
        output.push_str("| t | coef | se | 95% CI | |\n");
        output.push_str("|---|------|----|--------|--|\n");

        for row in &self.rows {
            let marker = if row.time_to_event == self.reference {
                "ref"
            } else if Self::is_significant(row) {
                "*"
            } else {
                ""
            };
            output.push_str(&format!(
                "| {} | {:.4} | {:.4} | [{:.4}, {:.4}] | {} |\n",
                row.time_to_event, row.coef, row.se, row.ci_lower, row.ci_upper, marker
            ));
        }

        output
    }
}

impl fmt::Display for EstimateSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "Event study: {} on leads/lags of {} over [{}, {}]",
            self.outcome, self.exposure, self.from, self.to
        )?;
        writeln!(
            f,
            "  {} observations, {} clusters, {} of {} rows significant at 95%",
            self.n_obs,
            self.n_clusters,
            self.significant_rows(),
            self.rows.len()
        )?;
        Ok(())
    }
}
