//! Binned-endpoint event-study companion estimator.
//!
//! Fits the same model as the distributed-lag estimator in its dummy
//! basis. Treatment onset is recovered from the exposure column as the
//! first period with positive exposure per unit, which assumes an
//! absorbing treatment. Event time `e = t - onset` gets one indicator
//! per window period with the endpoints binned (`e <= from` and
//! `e >= to`), the reference indicator is omitted, never-exposed units
//! carry all-zero indicators, and the sample is restricted to the same
//! per-unit window the lead/lag construction implies. On gap-free unit
//! series the two designs span the same column space, so their
//! estimates agree to numerical precision.

use hobart_engine::{RegressionEngine, RegressionPlan};
use hobart_panel::{EventWindow, PanelError};
use polars::prelude::*;

use crate::config::DistributedLagConfig;
use crate::error::{DlmError, Result};
use crate::model::drop_incomplete_rows;
use crate::result::BetaRow;
use crate::transform::Z_95;

const ONSET: &str = "__onset";
const EVENT_TIME: &str = "__event_time";
const UNIT_FIRST: &str = "__first_period";
const UNIT_LAST: &str = "__last_period";

/// A fitted binned event study.
#[derive(Debug, Clone)]
pub struct BinnedEstimate {
    /// Rows in ascending event time, zero reference row included.
    pub table: Vec<BetaRow>,
    /// Rows in the estimation sample.
    pub n_obs: usize,
    /// Clusters in the estimation sample.
    pub n_clusters: usize,
}

/// Fits the binned-endpoint event study implied by `config`.
///
/// # Errors
///
/// Returns [`DlmError::Panel`] for an invalid window or a column
/// collision with a generated name, [`DlmError::UnderdeterminedModel`]
/// when the engine drops an event-time indicator, and propagates engine
/// failures.
pub fn estimate_binned(
    panel: &DataFrame,
    config: &DistributedLagConfig,
    engine: &dyn RegressionEngine,
) -> Result<BinnedEstimate> {
    let window = EventWindow::new(config.from, config.to, config.reference)?;
    let unit = config.unit.as_str();
    let time = config.time.as_str();
    let exposure = config.exposure.as_str();

    let dummies: Vec<String> = window
        .event_times()
        .filter(|t| *t != window.reference())
        .map(dummy_name)
        .collect();
    for name in dummies
        .iter()
        .map(String::as_str)
        .chain([ONSET, EVENT_TIME, UNIT_FIRST, UNIT_LAST])
    {
        if panel.get_column_names().iter().any(|c| c.as_str() == name) {
            return Err(DlmError::Panel(PanelError::ColumnCollision(name.to_string())));
        }
    }

    let mut frame = panel
        .clone()
        .lazy()
        .join(
            onsets(panel, unit, time, exposure),
            [col(unit)],
            [col(unit)],
            JoinArgs::new(JoinType::Left),
        )
        .with_column(
            (col(time).cast(DataType::Int64) - col(ONSET)).alias(EVENT_TIME),
        )
        .with_columns([
            col(time).min().over([col(unit)]).alias(UNIT_FIRST),
            col(time).max().over([col(unit)]).alias(UNIT_LAST),
        ])
        // Trim each unit's series to the rows the lead/lag design keeps:
        // the deepest lag eats the first `to` periods, the leads eat the
        // last `num_leads`.
        .filter(
            col(time)
                .gt_eq(col(UNIT_FIRST) + lit(window.to()))
                .and(col(time).lt_eq(col(UNIT_LAST) - lit(window.num_leads() as i64))),
        );

    for event_time in window.event_times() {
        if event_time == window.reference() {
            continue;
        }
        let hit = if event_time == window.from() {
            col(EVENT_TIME).lt_eq(lit(event_time))
        } else if event_time == window.to() {
            col(EVENT_TIME).gt_eq(lit(event_time))
        } else {
            col(EVENT_TIME).eq(lit(event_time))
        };
        frame = frame.with_column(
            when(col(EVENT_TIME).is_null())
                .then(lit(0.0))
                .otherwise(when(hit).then(lit(1.0)).otherwise(lit(0.0)))
                .alias(dummy_name(event_time).as_str()),
        );
    }

    let estimation = drop_incomplete_rows(&frame.collect()?, &config.complete_case_columns())?;

    let plan = RegressionPlan {
        response: config.outcome.clone(),
        regressors: dummies
            .iter()
            .cloned()
            .chain(config.covariates.iter().cloned())
            .collect(),
        absorb: config.absorb_columns(),
        cluster: config.unit.clone(),
    };
    let fit = engine.fit(&estimation, &plan)?;

    let aligned = fit
        .regressors
        .iter()
        .take(dummies.len())
        .zip(&dummies)
        .filter(|(got, want)| got == want)
        .count();
    if fit.coefficients.len() < dummies.len() || aligned != dummies.len() {
        return Err(DlmError::UnderdeterminedModel {
            reason: "engine dropped event-time indicators",
            expected: dummies.len(),
            returned: aligned,
        });
    }

    let mut table = Vec::with_capacity(dummies.len() + 1);
    let mut index = 0;
    for event_time in window.event_times() {
        if event_time == window.reference() {
            table.push(BetaRow {
                time_to_event: event_time,
                coef: 0.0,
                se: 0.0,
                ci_lower: 0.0,
                ci_upper: 0.0,
            });
            continue;
        }
        let coef = fit.coefficients[index];
        let se = fit.covariance[[index, index]].sqrt();
        table.push(BetaRow {
            time_to_event: event_time,
            coef,
            se,
            ci_lower: coef - Z_95 * se,
            ci_upper: coef + Z_95 * se,
        });
        index += 1;
    }

    log::debug!(
        "binned event study: {} observations in {} clusters",
        fit.n_obs,
        fit.n_clusters
    );

    Ok(BinnedEstimate { table, n_obs: fit.n_obs, n_clusters: fit.n_clusters })
}

/// First period with positive exposure per unit, as an Int64 column.
fn onsets(panel: &DataFrame, unit: &str, time: &str, exposure: &str) -> LazyFrame {
    panel
        .clone()
        .lazy()
        .filter(col(exposure).gt(lit(0.0)))
        .group_by([col(unit)])
        .agg([col(time).cast(DataType::Int64).min().alias(ONSET)])
}

fn dummy_name(event_time: i64) -> String {
    if event_time < 0 {
        format!("evt_m{}", -event_time)
    } else {
        format!("evt_p{event_time}")
    }
}
