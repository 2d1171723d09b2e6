// =============================================================================
// Augmented Dickey-Fuller Test — unit-root check for a price series
// =============================================================================
//
// Regression:  Δy_t = α + β·y_{t-1} + Σ γ_i·Δy_{t-i} + ε_t
//
// H0: the series has a unit root (non-stationary).  The test statistic is the
// t-ratio of β; large negative values reject H0.  The p-value is interpolated
// over the constant-case Dickey-Fuller critical values, which is accurate
// enough for a coarse stationary / not-stationary classification.
// =============================================================================

use nalgebra::{DMatrix, DVector};
use tracing::trace;

/// Minimum number of observations required for the regression.
const MIN_OBS: usize = 10;

/// Result of one ADF run.
#[derive(Debug, Clone, PartialEq)]
pub struct AdfResult {
    /// t-ratio of the lagged-level coefficient.
    pub statistic: f64,
    /// Approximate p-value for H0 (unit root present).
    pub p_value: f64,
    /// Number of lagged differences included in the regression.
    pub lag: usize,
}

/// Run the ADF test with constant and lagged differences.
///
/// The lag order follows the cube-root rule `2·n^(1/3)`, clamped to
/// `[1, n/4]`.  Returns `None` when the series is too short or the regression
/// is degenerate (e.g. a constant series makes X'X singular).
pub fn adf_test(series: &[f64]) -> Option<AdfResult> {
    let n = series.len();
    if n < MIN_OBS {
        trace!(len = n, min = MIN_OBS, "ADF: insufficient data");
        return None;
    }

    // First differences.
    let diff: Vec<f64> = series.windows(2).map(|w| w[1] - w[0]).collect();

    let lag = ((n as f64).powf(1.0 / 3.0) * 2.0) as usize;
    let lag = lag.min(n / 4).max(1);

    let effective_n = n - 1 - lag;
    if effective_n < lag + 3 {
        trace!(effective_n, lag, "ADF: too few observations after lagging");
        return None;
    }

    // Regressors per observation: [1, y_{t-1}, Δy_{t-1}, ..., Δy_{t-lag}].
    let num_regressors = 2 + lag;
    let mut x_data = Vec::with_capacity(effective_n * num_regressors);

    for t in lag..diff.len() {
        x_data.push(1.0);
        x_data.push(series[t]);
        for i in 1..=lag {
            x_data.push(diff[t - i]);
        }
    }

    let x = DMatrix::from_row_slice(effective_n, num_regressors, &x_data);
    let y = DVector::from_vec(diff[lag..].to_vec());

    // OLS via normal equations: β = (X'X)⁻¹ X'y.
    let xtx = x.transpose() * &x;
    let xty = x.transpose() * &y;
    let xtx_inv = xtx.try_inverse()?;
    let beta = &xtx_inv * xty;

    // Residual variance and the standard error of the level coefficient.
    let residuals = &y - &x * &beta;
    let sse: f64 = residuals.iter().map(|r| r * r).sum();
    let mse = sse / (effective_n - num_regressors) as f64;
    let se_beta = (mse * xtx_inv[(1, 1)]).sqrt();

    if !se_beta.is_finite() || se_beta < f64::EPSILON {
        trace!("ADF: degenerate standard error");
        return None;
    }

    let statistic = beta[1] / se_beta;
    let p_value = approximate_p_value(statistic, n);

    trace!(
        statistic = format!("{:.4}", statistic),
        p_value = format!("{:.5}", p_value),
        lag,
        "ADF computed"
    );

    Some(AdfResult {
        statistic,
        p_value,
        lag,
    })
}

/// Interpolated p-value over the constant-case Dickey-Fuller critical values
/// (−3.43 / −2.86 / −2.57 at 1 % / 5 % / 10 %, with a small-sample
/// adjustment).
fn approximate_p_value(statistic: f64, n: usize) -> f64 {
    let n = n as f64;
    let cv_1 = -3.43 - 6.0 / n;
    let cv_5 = -2.86 - 4.0 / n;
    let cv_10 = -2.57 - 3.0 / n;

    if statistic < cv_1 {
        0.01 * (cv_1 - statistic).exp().recip()
    } else if statistic < cv_5 {
        0.01 + (0.05 - 0.01) * (statistic - cv_1) / (cv_5 - cv_1)
    } else if statistic < cv_10 {
        0.05 + (0.10 - 0.05) * (statistic - cv_5) / (cv_10 - cv_5)
    } else {
        0.10 + 0.90 * (1.0 - (-0.5 * (statistic - cv_10)).exp())
    }
}
