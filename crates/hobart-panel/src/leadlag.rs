//! Lead/lag regressor construction.
//!
//! Appends one exposure column per [`EventOffset`] to a panel by joining
//! the panel to itself on `(unit, time - displacement)`. Join-based
//! construction is period-exact: when a unit's series has a gap, the
//! missing neighbour comes through as a null instead of the value from
//! the next available row, which is what a positional shift within the
//! unit group would produce.

use polars::prelude::*;

use crate::error::{PanelError, Result};
use crate::offset::EventOffset;
use crate::window::EventWindow;

/// Builds lead/lag exposure columns for a panel.
#[derive(Debug, Clone)]
pub struct LeadLagBuilder<'a> {
    window: &'a EventWindow,
    unit: &'a str,
    time: &'a str,
    exposure: &'a str,
}

/// A panel augmented with lead/lag exposure columns.
#[derive(Debug, Clone)]
pub struct LeadLagPanel {
    /// Every input row with the generated columns appended, sorted by
    /// unit and time. Nulls mark offsets whose source period is absent.
    pub augmented: DataFrame,
    /// The rows of `augmented` where every generated column is defined.
    /// This is the estimation sample.
    pub estimation: DataFrame,
    /// Generated column names in canonical order, deepest lead first.
    pub columns: Vec<String>,
}

impl<'a> LeadLagBuilder<'a> {
    /// Creates a builder over the given identifier and exposure columns.
    #[must_use]
    pub const fn new(
        window: &'a EventWindow,
        unit: &'a str,
        time: &'a str,
        exposure: &'a str,
    ) -> Self {
        Self {
            window,
            unit,
            time,
            exposure,
        }
    }

    /// Appends one exposure column per window offset to `panel`.
    ///
    /// The input frame is never modified; all work happens on a logical
    /// copy. Rows that lack any neighbouring period within the window are
    /// kept in `augmented` with nulls and excluded from `estimation`.
    ///
    /// # Errors
    ///
    /// Fails when a required column is missing, the time column is not an
    /// integer period index, the panel is not unique on `(unit, time)`,
    /// or a generated column name collides with an existing column.
    pub fn build(&self, panel: &DataFrame) -> Result<LeadLagPanel> {
        let time_dtype = self.check_schema(panel)?;
        self.check_unique_keys(panel)?;

        let offsets = self.window.offsets();
        let columns: Vec<String> = offsets.iter().map(ToString::to_string).collect();
        for name in &columns {
            if panel.get_column_names().iter().any(|c| c.as_str() == name) {
                return Err(PanelError::ColumnCollision(name.clone()));
            }
        }

        let mut lf = panel.clone().lazy();
        for (offset, name) in offsets.iter().zip(&columns) {
            lf = lf.join(
                self.shifted_exposure(panel, *offset, name, &time_dtype),
                [col(self.unit), col(self.time)],
                [col(self.unit), col(self.time)],
                JoinArgs::new(JoinType::Left),
            );
        }
        let augmented = lf.sort([self.unit, self.time], Default::default()).collect()?;

        let mut complete = lit(true);
        for name in &columns {
            complete = complete.and(col(name.as_str()).is_not_null());
        }
        let estimation = augmented.clone().lazy().filter(complete).collect()?;

        log::debug!(
            "lead/lag construction kept {} of {} rows for estimation",
            estimation.height(),
            augmented.height()
        );

        Ok(LeadLagPanel {
            augmented,
            estimation,
            columns,
        })
    }

    /// Projects `(unit, time - displacement, exposure)` so a left join on
    /// `(unit, time)` lands each source row's exposure on the row it
    /// serves.
    fn shifted_exposure(
        &self,
        panel: &DataFrame,
        offset: EventOffset,
        name: &str,
        time_dtype: &DataType,
    ) -> LazyFrame {
        panel.clone().lazy().select([
            col(self.unit),
            (col(self.time).cast(DataType::Int64) - lit(offset.displacement()))
                .cast(time_dtype.clone())
                .alias(self.time),
            col(self.exposure).alias(name),
        ])
    }

    fn check_schema(&self, panel: &DataFrame) -> Result<DataType> {
        for name in [self.unit, self.time, self.exposure] {
            if !panel.get_column_names().iter().any(|c| c.as_str() == name) {
                return Err(PanelError::MissingColumn(name.to_string()));
            }
        }
        let dtype = panel.column(self.time)?.dtype().clone();
        if !dtype.is_integer() {
            return Err(PanelError::NonIntegerTime {
                column: self.time.to_string(),
                dtype: dtype.to_string(),
            });
        }
        Ok(dtype)
    }

    fn check_unique_keys(&self, panel: &DataFrame) -> Result<()> {
        let duplicates = panel
            .clone()
            .lazy()
            .group_by([col(self.unit), col(self.time)])
            .agg([len().alias("__rows")])
            .filter(col("__rows").gt(lit(1u32)))
            .collect()?
            .height();
        if duplicates > 0 {
            return Err(PanelError::DuplicateObservations {
                unit: self.unit.to_string(),
                time: self.time.to_string(),
                duplicates,
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use polars::df;

    fn window() -> EventWindow {
        EventWindow::with_default_reference(-2, 1).unwrap()
    }

    fn panel() -> DataFrame {
        df!(
            "unit" => [1i64, 1, 1, 1, 1, 2, 2, 2],
            "time" => [1i64, 2, 3, 4, 5, 1, 2, 4],
            "x" => [0.0, 0.0, 1.0, 1.0, 1.0, 0.0, 0.0, 0.0],
        )
        .unwrap()
    }

    #[test]
    fn test_generated_columns_in_canonical_order() {
        let w = window();
        let built = LeadLagBuilder::new(&w, "unit", "time", "x")
            .build(&panel())
            .unwrap();
        assert_eq!(built.columns, vec!["lead1", "lag0", "lag1"]);
        assert_eq!(built.augmented.height(), 8);
    }

    #[test]
    fn test_estimation_sample_drops_incomplete_rows() {
        let w = window();
        let built = LeadLagBuilder::new(&w, "unit", "time", "x")
            .build(&panel())
            .unwrap();
        // Unit 1 keeps t = 2, 3, 4; unit 2 has a gap at t = 3 and loses
        // every row.
        assert_eq!(built.estimation.height(), 3);
        let times: Vec<i64> = built
            .estimation
            .column("time")
            .unwrap()
            .i64()
            .unwrap()
            .into_no_null_iter()
            .collect();
        assert_eq!(times, vec![2, 3, 4]);
    }

    #[test]
    fn test_values_are_period_exact() {
        let w = window();
        let built = LeadLagBuilder::new(&w, "unit", "time", "x")
            .build(&panel())
            .unwrap();
        let lead1 = built.augmented.column("lead1").unwrap().f64().unwrap();
        let lag1 = built.augmented.column("lag1").unwrap().f64().unwrap();
        // Rows are sorted by (unit, time); row 1 is unit 1 at t = 2.
        assert_eq!(lead1.get(1), Some(1.0));
        assert_eq!(lag1.get(1), Some(0.0));
        // Row 6 is unit 2 at t = 2; t = 3 is missing from its series, so
        // the lead must be null even though t = 4 exists.
        assert_eq!(lead1.get(6), None);
    }

    #[test]
    fn test_lag0_mirrors_exposure() {
        let w = window();
        let built = LeadLagBuilder::new(&w, "unit", "time", "x")
            .build(&panel())
            .unwrap();
        let x: Vec<f64> = built
            .augmented
            .column("x")
            .unwrap()
            .f64()
            .unwrap()
            .into_no_null_iter()
            .collect();
        let lag0: Vec<f64> = built
            .augmented
            .column("lag0")
            .unwrap()
            .f64()
            .unwrap()
            .into_no_null_iter()
            .collect();
        assert_eq!(x, lag0);
    }

    #[test]
    fn test_accepts_narrow_integer_time() {
        let w = window();
        let frame = df!(
            "unit" => [1i64, 1, 1, 1],
            "time" => [1i32, 2, 3, 4],
            "x" => [0.0, 1.0, 1.0, 1.0],
        )
        .unwrap();
        let built = LeadLagBuilder::new(&w, "unit", "time", "x")
            .build(&frame)
            .unwrap();
        assert_eq!(built.estimation.height(), 1);
    }

    #[test]
    fn test_rejects_missing_column() {
        let w = window();
        let err = LeadLagBuilder::new(&w, "unit", "time", "absent")
            .build(&panel())
            .unwrap_err();
        assert!(matches!(err, PanelError::MissingColumn(c) if c == "absent"));
    }

    #[test]
    fn test_rejects_column_collision() {
        let w = window();
        let frame = df!(
            "unit" => [1i64, 1],
            "time" => [1i64, 2],
            "x" => [0.0, 1.0],
            "lag0" => [9.0, 9.0],
        )
        .unwrap();
        let err = LeadLagBuilder::new(&w, "unit", "time", "x")
            .build(&frame)
            .unwrap_err();
        assert!(matches!(err, PanelError::ColumnCollision(c) if c == "lag0"));
    }

    #[test]
    fn test_rejects_duplicate_observations() {
        let w = window();
        let frame = df!(
            "unit" => [1i64, 1, 1],
            "time" => [1i64, 1, 2],
            "x" => [0.0, 0.0, 1.0],
        )
        .unwrap();
        let err = LeadLagBuilder::new(&w, "unit", "time", "x")
            .build(&frame)
            .unwrap_err();
        assert!(matches!(err, PanelError::DuplicateObservations { duplicates: 1, .. }));
    }

    #[test]
    fn test_rejects_non_integer_time() {
        let w = window();
        let frame = df!(
            "unit" => [1i64, 1],
            "time" => [1.0, 2.0],
            "x" => [0.0, 1.0],
        )
        .unwrap();
        let err = LeadLagBuilder::new(&w, "unit", "time", "x")
            .build(&frame)
            .unwrap_err();
        assert!(matches!(err, PanelError::NonIntegerTime { .. }));
    }

    #[test]
    fn test_input_frame_untouched() {
        let w = window();
        let frame = panel();
        let before = frame.clone();
        LeadLagBuilder::new(&w, "unit", "time", "x")
            .build(&frame)
            .unwrap();
        assert!(frame.equals_missing(&before));
    }
}
