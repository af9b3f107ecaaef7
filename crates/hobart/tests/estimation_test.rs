//! End-to-end estimation scenarios on simulated staggered-adoption
//! panels.

use hobart::{
    check_equivalence, simulate_panel, DistributedLagConfig, DistributedLagModel, DlmError,
    EngineError, PanelError, RegressionEngine, RegressionFit, RegressionPlan, SimulationConfig,
};
use ndarray::{Array1, Array2};
use polars::prelude::*;

fn scenario() -> SimulationConfig {
    SimulationConfig {
        noise_sd: 0.5,
        seed: 42,
        ..SimulationConfig::default()
    }
}

fn studied(from: i64, to: i64) -> DistributedLagConfig {
    DistributedLagConfig::new("outcome", "post", "unit", "time", from, to)
}

#[test]
fn test_staggered_adoption_recovers_effect() {
    let panel = simulate_panel(&scenario()).unwrap();
    let model = DistributedLagModel::new(studied(-3, 3)).unwrap();
    let estimate = model.estimate(&panel).unwrap();

    assert_eq!(estimate.table.len(), 7);
    for row in &estimate.table {
        if row.time_to_event < -1 {
            assert!(
                row.coef.abs() < 0.35,
                "pre period {} drifted: {}",
                row.time_to_event,
                row.coef
            );
        }
        if row.time_to_event >= 0 {
            assert!(
                (row.coef + 3.0).abs() < 0.35,
                "post period {} off target: {}",
                row.time_to_event,
                row.coef
            );
        }
    }

    let reference = estimate.row(-1).unwrap();
    assert_eq!(reference.coef, 0.0);
    assert_eq!(reference.se, 0.0);
    for row in &estimate.table {
        if row.time_to_event != -1 {
            assert!(row.se.is_finite() && row.se > 0.0);
            assert!(row.ci_lower < row.coef && row.coef < row.ci_upper);
        }
    }

    assert_eq!(estimate.n_clusters, 676);
    assert_eq!(estimate.gamma.len(), 6);
}

#[test]
fn test_matches_binned_event_study() {
    let panel = simulate_panel(&scenario()).unwrap();
    let report = check_equivalence(&panel, &studied(-3, 3)).unwrap();
    assert!(
        report.within(1e-6),
        "coef deviation {:.3e}, se deviation {:.3e}",
        report.max_coef_deviation,
        report.max_se_deviation
    );
    assert_eq!(report.distributed_lag.n_obs, report.binned.n_obs);
    assert_eq!(report.distributed_lag.table.len(), report.binned.table.len());
}

#[test]
fn test_sample_trimming_matches_window_depths() {
    let config = SimulationConfig {
        n_units: 40,
        n_periods: 20,
        onset_periods: vec![9, 10, 11],
        seed: 5,
        ..SimulationConfig::default()
    };
    let panel = simulate_panel(&config).unwrap();
    let model = DistributedLagModel::new(studied(-3, 3)).unwrap();
    let estimate = model.estimate(&panel).unwrap();
    // Three lags trim the first three periods of each unit, two leads
    // trim the last two: 15 usable periods out of 20.
    assert_eq!(estimate.n_obs, 40 * 15);
    assert_eq!(estimate.n_clusters, 40);
}

#[test]
fn test_unit_filter_matches_prefiltered_panel() {
    let config = SimulationConfig {
        n_units: 40,
        n_periods: 16,
        onset_periods: vec![8, 9],
        seed: 23,
        ..SimulationConfig::default()
    };
    let panel = simulate_panel(&config).unwrap();
    let model = DistributedLagModel::new(studied(-2, 2)).unwrap();

    // A unit-level filter commutes with the lead/lag construction, so
    // filtering the built sample and prefiltering the panel agree
    // exactly.
    let filtered = model
        .estimate_filtered(&panel, col("unit").lt_eq(lit(20i64)))
        .unwrap();
    let subset = panel
        .lazy()
        .filter(col("unit").lt_eq(lit(20i64)))
        .collect()
        .unwrap();
    let direct = model.estimate(&subset).unwrap();

    assert_eq!(filtered.n_obs, direct.n_obs);
    assert_eq!(filtered.n_clusters, 20);
    assert_eq!(filtered.gamma, direct.gamma);
    for (a, b) in filtered.table.iter().zip(&direct.table) {
        assert_eq!(a.coef, b.coef);
        assert_eq!(a.se, b.se);
    }
}

#[test]
fn test_filtered_rows_keep_neighbours_from_full_panel() {
    let config = SimulationConfig {
        n_units: 20,
        n_periods: 12,
        onset_periods: vec![6],
        seed: 11,
        ..SimulationConfig::default()
    };
    let panel = simulate_panel(&config).unwrap();
    let model = DistributedLagModel::new(studied(-2, 2)).unwrap();

    // Window depths keep t in [3, 11]. Excluding t = 4 removes exactly
    // one row per unit and nothing else: the surviving rows still draw
    // their lead and lag values from the full series, including t = 4.
    // Building on a panel with t = 4 already gone would instead cost
    // every row within lead/lag reach of the hole.
    let estimate = model
        .estimate_filtered(&panel, col("time").neq(lit(4i64)))
        .unwrap();
    assert_eq!(estimate.n_obs, 20 * 8);
    assert_eq!(estimate.n_clusters, 20);
}

#[test]
fn test_reference_at_window_start_accumulates_leads() {
    let panel = simulate_panel(&scenario()).unwrap();
    let config = studied(-2, 4).with_reference(-2);
    let model = DistributedLagModel::new(config.clone()).unwrap();
    let estimate = model.estimate(&panel).unwrap();

    assert_eq!(estimate.table.len(), 7);
    assert_eq!(estimate.table[0].time_to_event, -2);
    assert_eq!(estimate.table[0].coef, 0.0);

    // With the reference at the window start every reported row is a
    // forward sum, so the first row equals the single lead coefficient.
    let (offset, lead) = estimate.gammas().next().unwrap();
    assert!(offset.is_lead());
    assert_eq!(estimate.table[1].coef, lead);

    // Adjacent rows still differ by exactly one gamma.
    let gammas: Vec<f64> = estimate.gammas().map(|(_, g)| g).collect();
    for i in 2..estimate.table.len() {
        let diff = estimate.table[i].coef - estimate.table[i - 1].coef;
        assert!((diff - gammas[i - 1]).abs() < 1e-12);
    }

    let report = check_equivalence(&panel, &config).unwrap();
    assert!(
        report.within(1e-6),
        "coef deviation {:.3e}, se deviation {:.3e}",
        report.max_coef_deviation,
        report.max_se_deviation
    );
}

#[test]
fn test_covariates_ride_behind_the_lead_lag_block() {
    let base = SimulationConfig {
        n_units: 30,
        n_periods: 14,
        onset_periods: vec![7],
        seed: 21,
        ..SimulationConfig::default()
    };
    let panel = simulate_panel(&base)
        .unwrap()
        .lazy()
        .with_column(
            ((col("unit") * lit(3i64) + col("time") * lit(5i64)) % lit(11i64))
                .cast(DataType::Float64)
                .alias("ctrl"),
        )
        .collect()
        .unwrap();
    let config = studied(-2, 2).with_covariates(&["ctrl"]);
    let model = DistributedLagModel::new(config.clone()).unwrap();
    let estimate = model.estimate(&panel).unwrap();
    assert_eq!(estimate.gamma.len(), 4);

    let report = check_equivalence(&panel, &config).unwrap();
    assert!(
        report.within(1e-6),
        "coef deviation {:.3e}, se deviation {:.3e}",
        report.max_coef_deviation,
        report.max_se_deviation
    );
}

#[test]
fn test_extra_absorbed_dimension() {
    let base = SimulationConfig {
        n_units: 36,
        n_periods: 14,
        onset_periods: vec![7, 8],
        seed: 33,
        ..SimulationConfig::default()
    };
    let panel = simulate_panel(&base)
        .unwrap()
        .lazy()
        .with_column((col("unit") % lit(5i64)).alias("region"))
        .collect()
        .unwrap();
    let config = studied(-2, 2).with_extra_absorb(&["region"]);
    let report = check_equivalence(&panel, &config).unwrap();
    assert!(
        report.within(1e-6),
        "coef deviation {:.3e}, se deviation {:.3e}",
        report.max_coef_deviation,
        report.max_se_deviation
    );
}

#[test]
fn test_invalid_windows_rejected() {
    for (from, to) in [(0i64, 3i64), (-3, 0), (0, 0)] {
        let err = DistributedLagModel::new(studied(from, to)).unwrap_err();
        assert!(
            matches!(err, DlmError::Panel(PanelError::InvalidWindow { .. })),
            "window [{from}, {to}] produced the wrong error"
        );
    }
    let err = DistributedLagModel::new(studied(-3, 3).with_reference(5)).unwrap_err();
    assert!(matches!(err, DlmError::Panel(PanelError::InvalidWindow { .. })));
}

#[test]
fn test_input_panel_never_mutated() {
    let config = SimulationConfig {
        n_units: 30,
        n_periods: 14,
        onset_periods: vec![6, 7],
        seed: 9,
        ..SimulationConfig::default()
    };
    let panel = simulate_panel(&config).unwrap();
    let pristine = panel.clone();

    let model = DistributedLagModel::new(studied(-2, 2)).unwrap();
    model.estimate(&panel).unwrap();
    assert!(panel.equals_missing(&pristine));

    // A failing run leaves the frame alone too.
    let bad = DistributedLagConfig::new("absent", "post", "unit", "time", -2, 2);
    let model = DistributedLagModel::new(bad).unwrap();
    assert!(model.estimate(&panel).is_err());
    assert!(panel.equals_missing(&pristine));
}

#[test]
fn test_unknown_engine_is_missing_dependency() {
    let config = SimulationConfig {
        n_units: 20,
        n_periods: 12,
        onset_periods: vec![6],
        seed: 3,
        ..SimulationConfig::default()
    };
    let panel = simulate_panel(&config).unwrap();
    let model = DistributedLagModel::new(studied(-2, 2).with_engine("reghdfe")).unwrap();
    let err = model.estimate(&panel).unwrap_err();
    assert!(matches!(err, DlmError::MissingDependency { engine } if engine == "reghdfe"));
}

#[test]
fn test_gapped_series_surface_sample_mismatch() {
    let config = SimulationConfig {
        n_units: 24,
        n_periods: 16,
        onset_periods: vec![8, 9],
        seed: 13,
        ..SimulationConfig::default()
    };
    let panel = simulate_panel(&config).unwrap();
    // Punch a hole in the middle of one unit's series. The lead/lag
    // design loses every row within reach of the hole, the binned
    // design only loses the row itself.
    let gapped = panel
        .lazy()
        .filter(
            col("unit")
                .eq(lit(5i64))
                .and(col("time").eq(lit(8i64)))
                .not(),
        )
        .collect()
        .unwrap();
    let err = check_equivalence(&gapped, &studied(-2, 2)).unwrap_err();
    assert!(matches!(err, DlmError::SampleMismatch { dlm, binned } if dlm < binned));
}

#[test]
fn test_estimation_is_deterministic() {
    let config = SimulationConfig {
        n_units: 25,
        n_periods: 12,
        onset_periods: vec![6, 7],
        seed: 17,
        ..SimulationConfig::default()
    };
    let panel = simulate_panel(&config).unwrap();
    let model = DistributedLagModel::new(studied(-2, 2)).unwrap();
    let first = model.estimate(&panel).unwrap();
    let second = model.estimate(&panel).unwrap();
    for (a, b) in first.table.iter().zip(&second.table) {
        assert_eq!(a.coef, b.coef);
        assert_eq!(a.se, b.se);
    }
}

struct MisalignedEngine;

impl RegressionEngine for MisalignedEngine {
    fn name(&self) -> &'static str {
        "misaligned"
    }

    fn fit(
        &self,
        _frame: &DataFrame,
        plan: &RegressionPlan,
    ) -> Result<RegressionFit, EngineError> {
        let mut labels = plan.regressors.clone();
        labels.reverse();
        let p = labels.len();
        Ok(RegressionFit {
            coefficients: Array1::zeros(p),
            covariance: Array2::zeros((p, p)),
            regressors: labels,
            n_obs: 10,
            n_clusters: 2,
        })
    }
}

#[test]
fn test_misreported_labels_are_underdetermined() {
    let config = SimulationConfig {
        n_units: 20,
        n_periods: 12,
        onset_periods: vec![6],
        seed: 29,
        ..SimulationConfig::default()
    };
    let panel = simulate_panel(&config).unwrap();
    let model = DistributedLagModel::new(studied(-3, 3)).unwrap();
    let err = model
        .estimate_with_engine(&panel, &MisalignedEngine)
        .unwrap_err();
    assert!(matches!(err, DlmError::UnderdeterminedModel { expected: 6, .. }));
}
