// =============================================================================
// Time-Series Analysis Module
// =============================================================================
//
// Statistical diagnostics over the assembled price panel:
// - Pearson correlation matrix and the uncorrelated-pair screen
// - ADF unit-root test (stationarity classification)
// - Hurst exponent via simplified rescaled-range analysis

pub mod correlation;
pub mod hurst;
pub mod stationarity;

pub use correlation::{uncorrelated_pairs, CorrPair, CorrelationMatrix};
pub use hurst::{rescaled_range_fit, HurstFit};
pub use stationarity::{adf_test, AdfResult};
