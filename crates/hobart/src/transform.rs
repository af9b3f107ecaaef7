//! Cumulative transformation of lead/lag coefficients.
//!
//! A distributed-lag regression on exposure levels and a binned-endpoint
//! event study on onset dummies are the same linear model written in two
//! bases, and the change of basis is triangular: event-study effects are
//! partial sums of the lead/lag coefficients,
//!
//! ```text
//! beta[t] = -(gamma[i] + ... + gamma[nb])   for the i-th row before the
//!                                           reference, nb rows in total
//! beta[t] = gamma[nb+1] + ... + gamma[nb+i] for the i-th row after it
//! ```
//!
//! with the reference row pinned to zero. The split sits at `nb`, the
//! number of periods before the reference, which need not coincide with
//! the lead/lag boundary. Variances follow by the delta method: each
//! sum's variance is the matching block sum of the gamma covariance,
//!
//! ```text
//! var(beta) = 1' V_block 1,   se = sqrt(var)
//! ```
//!
//! A negative block sum can occur once the absorbed-regression
//! covariance is positive semi-definite only up to rounding; the
//! resulting NaN standard error is reported as-is.
//!
//! # References
//!
//! - Schmidheiny, K., & Siegloch, S. (2023). "On Event Studies and
//!   Distributed-Lags in Two-Way Fixed Effects Models: Identification,
//!   Equivalence, and Generalization." Journal of Applied Econometrics
//!   38(5).

use hobart_panel::EventWindow;
use ndarray::{s, Array1, Array2};

use crate::error::{DlmError, Result};
use crate::result::BetaRow;

/// Two-sided 95% normal critical value. Intervals use the normal
/// approximation regardless of cluster count.
pub const Z_95: f64 = 1.96;

/// Maps lead/lag estimates into the cumulative event-study table.
///
/// `gamma` must be in canonical offset order with `covariance` aligned
/// to it. Rows come back in ascending event time with the reference row
/// in place.
///
/// # Errors
///
/// Returns [`DlmError::UnderdeterminedModel`] when `gamma` or its
/// covariance do not match the window's coefficient count.
pub fn gamma_to_beta(
    window: &EventWindow,
    gamma: &Array1<f64>,
    covariance: &Array2<f64>,
) -> Result<Vec<BetaRow>> {
    let k = window.num_coefficients();
    if gamma.len() != k {
        return Err(DlmError::UnderdeterminedModel {
            reason: "gamma length does not match the window",
            expected: k,
            returned: gamma.len(),
        });
    }
    if covariance.shape() != [k, k] {
        return Err(DlmError::UnderdeterminedModel {
            reason: "gamma covariance shape does not match the window",
            expected: k,
            returned: covariance.nrows(),
        });
    }

    let nb = window.num_before();
    let na = window.num_after();
    let mut rows = Vec::with_capacity(window.total_periods());

    // Rows before the reference are negated suffix sums, accumulated
    // from the deepest row up so adjacent rows differ by exactly one
    // gamma.
    let mut before = Vec::with_capacity(nb);
    let mut acc = 0.0;
    for i in (1..=nb).rev() {
        acc += gamma[i - 1];
        let variance = covariance.slice(s![i - 1..nb, i - 1..nb]).sum();
        before.push(beta_row(window.from() + i as i64 - 1, -acc, variance));
    }
    before.reverse();
    rows.extend(before);

    rows.push(BetaRow {
        time_to_event: window.reference(),
        coef: 0.0,
        se: 0.0,
        ci_lower: 0.0,
        ci_upper: 0.0,
    });

    // Rows after the reference are forward cumulative sums.
    let mut acc = 0.0;
    for i in 1..=na {
        acc += gamma[nb + i - 1];
        let variance = covariance.slice(s![nb..nb + i, nb..nb + i]).sum();
        rows.push(beta_row(window.reference() + i as i64, acc, variance));
    }

    Ok(rows)
}

fn beta_row(time_to_event: i64, coef: f64, variance: f64) -> BetaRow {
    let se = variance.sqrt();
    BetaRow {
        time_to_event,
        coef,
        se,
        ci_lower: coef - Z_95 * se,
        ci_upper: coef + Z_95 * se,
    }
}
