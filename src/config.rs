// =============================================================================
// Analysis Configuration — product universe, thresholds, output paths
// =============================================================================
//
// Every tunable of the two flows lives here so that the flows themselves are
// plain functions over a config struct.  All fields carry `#[serde(default)]`
// so that loading an older config file never breaks when fields are added.
// =============================================================================

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use tracing::info;

// =============================================================================
// Default-value helpers (required by serde `default = "..."` attribute)
// =============================================================================

fn default_products() -> Vec<Product> {
    [
        ("sugar", "SB"),
        ("cocoa", "CC"),
        ("coffee", "KC"),
        ("wheat", "KE"),
        ("soybean_oil", "ZL"),
        ("soybean_meal", "ZM"),
        ("corn", "ZC"),
        ("orange_juice", "OJ"),
        ("lumber", "LBR"),
        ("oat", "ZO"),
        ("cotton", "CT"),
        ("rice", "ZR"),
    ]
    .iter()
    .map(|(name, ticker)| Product {
        name: name.to_string(),
        ticker: ticker.to_string(),
    })
    .collect()
}

fn default_lookback_days() -> u64 {
    120
}

fn default_uncorrelated_threshold() -> f64 {
    0.25
}

fn default_stationarity_p_threshold() -> f64 {
    0.10
}

fn default_heatmap_path() -> PathBuf {
    PathBuf::from("plots/correlation_heatmap.png")
}

fn default_rs_plot_path() -> PathBuf {
    PathBuf::from("plots/rescaled_range.png")
}

fn default_demo_symbol() -> String {
    "PF_XBTUSD".to_string()
}

fn default_demo_granularity() -> String {
    "1h".to_string()
}

fn default_demo_spot_pair() -> String {
    "XBTUSD".to_string()
}

fn default_demo_lookback_days() -> u64 {
    30
}

// =============================================================================
// Product
// =============================================================================

/// One instrument in the commodity universe: a display name and the root
/// ticker symbol of its front-month future.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Product {
    pub name: String,
    pub ticker: String,
}

// =============================================================================
// CommodityConfig
// =============================================================================

/// Configuration for the commodity correlation / stationarity flow.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CommodityConfig {
    /// Instruments to fetch, in panel column order.
    #[serde(default = "default_products")]
    pub products: Vec<Product>,

    /// How far back the daily close history reaches, in calendar days.
    #[serde(default = "default_lookback_days")]
    pub lookback_days: u64,

    /// Pairs with |corr| strictly below this are reported as uncorrelated.
    #[serde(default = "default_uncorrelated_threshold")]
    pub uncorrelated_threshold: f64,

    /// ADF p-value below which a series is classified as likely stationary.
    #[serde(default = "default_stationarity_p_threshold")]
    pub stationarity_p_threshold: f64,

    /// Output path for the rendered correlation heatmap.
    #[serde(default = "default_heatmap_path")]
    pub heatmap_path: PathBuf,

    /// Output path for the rendered rescaled-range log-log plot.
    #[serde(default = "default_rs_plot_path")]
    pub rs_plot_path: PathBuf,
}

impl Default for CommodityConfig {
    fn default() -> Self {
        Self {
            products: default_products(),
            lookback_days: default_lookback_days(),
            uncorrelated_threshold: default_uncorrelated_threshold(),
            stationarity_p_threshold: default_stationarity_p_threshold(),
            heatmap_path: default_heatmap_path(),
            rs_plot_path: default_rs_plot_path(),
        }
    }
}

// =============================================================================
// KrakenConfig
// =============================================================================

/// Configuration for the Kraken market-data flow.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct KrakenConfig {
    /// Perpetual-futures symbol fetched by the demo flow.
    #[serde(default = "default_demo_symbol")]
    pub symbol: String,

    /// Candle granularity for the demo fetch (1m, 15m, 30m, 1h, 1d).
    #[serde(default = "default_demo_granularity")]
    pub granularity: String,

    /// Spot pair fetched alongside the futures candles.
    #[serde(default = "default_demo_spot_pair")]
    pub spot_pair: String,

    /// How far back the demo candle fetch reaches, in calendar days.
    #[serde(default = "default_demo_lookback_days")]
    pub lookback_days: u64,
}

impl Default for KrakenConfig {
    fn default() -> Self {
        Self {
            symbol: default_demo_symbol(),
            granularity: default_demo_granularity(),
            spot_pair: default_demo_spot_pair(),
            lookback_days: default_demo_lookback_days(),
        }
    }
}

// =============================================================================
// AppConfig
// =============================================================================

/// Top-level configuration holding both flows.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub commodities: CommodityConfig,

    #[serde(default)]
    pub kraken: KrakenConfig,
}

impl AppConfig {
    /// Load configuration from a JSON file at `path`.
    ///
    /// If the file does not exist, returns an error so the caller can fall
    /// back to defaults with a warning.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();

        let content = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read config from {}", path.display()))?;

        let config: Self = serde_json::from_str(&content)
            .with_context(|| format!("failed to parse config from {}", path.display()))?;

        info!(path = %path.display(), "configuration loaded");
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_universe_has_twelve_products() {
        let cfg = CommodityConfig::default();
        assert_eq!(cfg.products.len(), 12);
        assert_eq!(cfg.products[0].name, "sugar");
        assert_eq!(cfg.products[0].ticker, "SB");
    }

    #[test]
    fn empty_json_yields_defaults() {
        let cfg: AppConfig = serde_json::from_str("{}").expect("should parse");
        assert_eq!(cfg.commodities.lookback_days, 120);
        assert_eq!(cfg.kraken.symbol, "PF_XBTUSD");
        assert!((cfg.commodities.uncorrelated_threshold - 0.25).abs() < f64::EPSILON);
    }

    #[test]
    fn partial_json_keeps_other_defaults() {
        let cfg: AppConfig =
            serde_json::from_str(r#"{"kraken": {"symbol": "PF_ETHUSD"}}"#).expect("should parse");
        assert_eq!(cfg.kraken.symbol, "PF_ETHUSD");
        assert_eq!(cfg.kraken.granularity, "1h");
        assert_eq!(cfg.commodities.products.len(), 12);
    }
}
