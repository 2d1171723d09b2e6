// =============================================================================
// Hurst Exponent — Simplified Rescaled Range (R/S) Analysis, price mode
// =============================================================================
//
// The Hurst exponent H characterises the long-term memory of a price series:
//
//   H > 0.5  =>  trending / persistent
//   H ~ 0.5  =>  random walk
//   H < 0.5  =>  mean-reverting / anti-persistent
//
// Algorithm:
//   1. Build geometric window sizes: 10^e for e = 1.0, 1.25, 1.5, … while the
//      window fits the series, plus the full series length.
//   2. For each window size n, split the series into non-overlapping chunks
//      of length n and compute the simplified price-mode R/S statistic:
//         R = max(chunk) / min(chunk) − 1
//         S = sample std-dev of the chunk's percentage changes
//      averaging R/S across valid chunks.
//   3. Fit log10(R/S) against log10(n) by ordinary least squares.  The slope
//      is the exponent H and 10^intercept is the scaling constant c, so the
//      fitted law is  R/S ≈ c · n^H.

use tracing::trace;

/// Minimum number of closing prices required for the analysis.
const MIN_SERIES_LEN: usize = 100;

/// Log10 step between successive window sizes.
const WINDOW_STEP: f64 = 0.25;

/// Fitted rescaled-range law plus the points it was fitted through.
#[derive(Debug, Clone, PartialEq)]
pub struct HurstFit {
    /// Exponent H (slope of the log-log fit).
    pub exponent: f64,
    /// Scaling constant c (10^intercept).
    pub constant: f64,
    /// Observed (window size, average R/S) pairs.
    pub points: Vec<(f64, f64)>,
}

impl HurstFit {
    /// Fitted R/S value at window size `n`.
    pub fn curve(&self, n: f64) -> f64 {
        self.constant * n.powf(self.exponent)
    }
}

/// Fit the rescaled-range power law to a price series.
///
/// Returns `None` when:
/// - Fewer than [`MIN_SERIES_LEN`] prices are supplied.
/// - Fewer than two window sizes produce a valid R/S average (degenerate
///   series such as a flat line).
pub fn rescaled_range_fit(closes: &[f64]) -> Option<HurstFit> {
    let len = closes.len();
    if len < MIN_SERIES_LEN {
        trace!(len, min = MIN_SERIES_LEN, "Hurst: insufficient data");
        return None;
    }

    // Geometric window sizes from 10 up to the series length.
    let mut windows: Vec<usize> = Vec::new();
    let mut exp = 1.0_f64;
    while 10.0_f64.powf(exp) < (len - 1) as f64 {
        let w = 10.0_f64.powf(exp) as usize;
        if windows.last() != Some(&w) {
            windows.push(w);
        }
        exp += WINDOW_STEP;
    }
    windows.push(len);

    let mut points: Vec<(f64, f64)> = Vec::with_capacity(windows.len());

    for &window in &windows {
        let mut rs_sum = 0.0_f64;
        let mut valid_chunks = 0_usize;

        let mut start = 0;
        while start + window <= len {
            if let Some(rs) = simplified_rs(&closes[start..start + window]) {
                rs_sum += rs;
                valid_chunks += 1;
            }
            start += window;
        }

        if valid_chunks == 0 {
            continue;
        }

        let avg_rs = rs_sum / valid_chunks as f64;
        if avg_rs > 0.0 {
            points.push((window as f64, avg_rs));
        }
    }

    // Need at least 2 points for a meaningful regression.
    if points.len() < 2 {
        trace!("Hurst: insufficient valid window sizes for regression");
        return None;
    }

    let log_n: Vec<f64> = points.iter().map(|(w, _)| w.log10()).collect();
    let log_rs: Vec<f64> = points.iter().map(|(_, rs)| rs.log10()).collect();

    // Ordinary least-squares: slope = Σ((x-x̄)(y-ȳ)) / Σ((x-x̄)²)
    let n = log_n.len() as f64;
    let x_mean = log_n.iter().sum::<f64>() / n;
    let y_mean = log_rs.iter().sum::<f64>() / n;

    let mut numerator = 0.0_f64;
    let mut denominator = 0.0_f64;

    for i in 0..log_n.len() {
        let dx = log_n[i] - x_mean;
        let dy = log_rs[i] - y_mean;
        numerator += dx * dy;
        denominator += dx * dx;
    }

    if denominator.abs() < f64::EPSILON {
        trace!("Hurst: degenerate regression (zero variance in log_n)");
        return None;
    }

    let exponent = numerator / denominator;
    let intercept = y_mean - exponent * x_mean;
    let constant = 10.0_f64.powf(intercept);

    trace!(
        exponent = format!("{:.4}", exponent),
        constant = format!("{:.4}", constant),
        points = points.len(),
        "Hurst fit computed"
    );

    Some(HurstFit {
        exponent,
        constant,
        points,
    })
}

/// Simplified price-mode R/S for one chunk.
///
/// Returns `None` for chunks whose percentage changes are degenerate (flat
/// chunk, non-positive prices).
fn simplified_rs(chunk: &[f64]) -> Option<f64> {
    if chunk.len() < 3 {
        return None;
    }

    let mut min = f64::INFINITY;
    let mut max = f64::NEG_INFINITY;
    for &price in chunk {
        if price <= 0.0 {
            return None;
        }
        min = min.min(price);
        max = max.max(price);
    }

    // Percentage changes within the chunk.
    let pcts: Vec<f64> = chunk.windows(2).map(|w| w[1] / w[0] - 1.0).collect();
    let n = pcts.len() as f64;
    let mean = pcts.iter().sum::<f64>() / n;
    let variance = pcts.iter().map(|p| (p - mean).powi(2)).sum::<f64>() / (n - 1.0);
    let std_dev = variance.sqrt();

    if std_dev < f64::EPSILON {
        return None;
    }

    let range = max / min - 1.0;
    let rs = range / std_dev;
    rs.is_finite().then_some(rs)
}
