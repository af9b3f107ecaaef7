//! Extraction of the lead/lag block from an engine fit.

use hobart_engine::RegressionFit;
use hobart_panel::EventOffset;
use ndarray::{s, Array1, Array2};

use crate::error::{DlmError, Result};

/// Pulls the leading lead/lag block out of a fit, verifying the engine
/// reported every requested term in canonical order.
///
/// Engines drop columns they cannot identify rather than failing, so a
/// short or misaligned label sequence means a lead/lag term went
/// missing. Covariates sit after the block and may be dropped freely.
///
/// # Errors
///
/// Returns [`DlmError::UnderdeterminedModel`] when fewer than
/// `offsets.len()` coefficients came back or the leading labels
/// disagree with the canonical offset names.
pub(crate) fn extract_gammas(
    fit: &RegressionFit,
    offsets: &[EventOffset],
) -> Result<(Array1<f64>, Array2<f64>)> {
    let k = offsets.len();
    if fit.coefficients.len() < k {
        return Err(DlmError::UnderdeterminedModel {
            reason: "engine returned too few coefficients",
            expected: k,
            returned: fit.coefficients.len(),
        });
    }
    let aligned = fit
        .regressors
        .iter()
        .take(k)
        .zip(offsets)
        .filter(|(label, offset)| **label == offset.to_string())
        .count();
    if aligned != k {
        return Err(DlmError::UnderdeterminedModel {
            reason: "engine dropped or reordered lead/lag terms",
            expected: k,
            returned: aligned,
        });
    }
    let gamma = fit.coefficients.slice(s![..k]).to_owned();
    let covariance = fit.covariance.slice(s![..k, ..k]).to_owned();
    Ok((gamma, covariance))
}
