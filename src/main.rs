// =============================================================================
// Harvest Lab — Main Entry Point
// =============================================================================
//
// Two flows behind one binary:
//
//   harvest-lab commodities        correlation / stationarity / Hurst study
//                                  over the commodity futures universe
//   harvest-lab kraken [SYMBOL]    Kraken market-data demo: perpetual
//                                  discovery, paginated OHLCV, order-book
//                                  prices
//
// Everything runs sequentially; there are no background tasks.
// =============================================================================

// ── Module declarations ──────────────────────────────────────────────────────
mod analysis;
mod config;
mod kraken;
mod market_data;
mod plot;

use anyhow::{Context, Result};
use chrono::Utc;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use crate::analysis::{adf_test, rescaled_range_fit, uncorrelated_pairs, CorrelationMatrix};
use crate::config::{AppConfig, CommodityConfig, KrakenConfig};
use crate::kraken::KrakenClient;
use crate::market_data::{DailyCloseClient, Panel};

#[tokio::main]
async fn main() -> Result<()> {
    // ── 1. Environment & config ──────────────────────────────────────────
    let _ = dotenv::dotenv();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let config_path =
        std::env::var("HARVEST_CONFIG").unwrap_or_else(|_| "harvest_config.json".into());
    let mut config = AppConfig::load(&config_path).unwrap_or_else(|e| {
        warn!(error = %e, "failed to load config, using defaults");
        AppConfig::default()
    });

    if let Ok(symbol) = std::env::var("HARVEST_SYMBOL") {
        config.kraken.symbol = symbol.trim().to_uppercase();
    }

    // ── 2. Flow dispatch ─────────────────────────────────────────────────
    let flow = std::env::args().nth(1).unwrap_or_else(|| "commodities".to_string());

    match flow.as_str() {
        "commodities" => run_commodity_flow(&config.commodities).await?,
        "kraken" => {
            if let Some(symbol) = std::env::args().nth(2) {
                config.kraken.symbol = symbol.trim().to_uppercase();
            }
            run_kraken_flow(&config.kraken).await?;
        }
        other => anyhow::bail!("unknown flow '{other}'; expected 'commodities' or 'kraken'"),
    }

    info!("all done");
    Ok(())
}

// =============================================================================
// Commodity flow
// =============================================================================

async fn run_commodity_flow(cfg: &CommodityConfig) -> Result<()> {
    info!(
        products = cfg.products.len(),
        lookback_days = cfg.lookback_days,
        "starting commodity correlation study"
    );

    // ── 1. Fetch daily closes per instrument ─────────────────────────────
    let client = DailyCloseClient::new();
    let start = Utc::now().date_naive() - chrono::Days::new(cfg.lookback_days);

    let mut series = Vec::with_capacity(cfg.products.len());
    for product in &cfg.products {
        info!(name = %product.name, ticker = %product.ticker, "fetching daily closes");
        // Root symbol plus the front-month futures suffix.
        let ticker = format!("{}=F", product.ticker);
        series.push(client.daily_closes(&product.name, &ticker, start).await?);
    }

    // ── 2. Assemble the panel ────────────────────────────────────────────
    let panel = Panel::assemble(series);
    if panel.num_columns() == 0 {
        anyhow::bail!("no instrument returned any data");
    }
    info!(
        rows = panel.num_rows(),
        columns = panel.num_columns(),
        "panel assembled"
    );

    // ── 3. Correlation matrix & heatmap ──────────────────────────────────
    let matrix = CorrelationMatrix::from_panel(&panel);
    plot::render_correlation_heatmap(&matrix, &cfg.heatmap_path)?;

    // ── 4. Uncorrelated candidate pairs ──────────────────────────────────
    let candidates = uncorrelated_pairs(&matrix.pairs_sorted(), cfg.uncorrelated_threshold);
    info!(
        count = candidates.len(),
        threshold = cfg.uncorrelated_threshold,
        "uncorrelated candidate pairs (momentum candidates)"
    );
    for pair in &candidates {
        info!(x = %pair.x, y = %pair.y, corr = format!("{:.4}", pair.corr), "candidate pair");
    }

    // ── 5. Stationarity of the first series ──────────────────────────────
    let name = &panel.columns[0];
    let closes = panel.column(0);

    let adf = adf_test(closes).with_context(|| format!("ADF test is degenerate for {name}"))?;
    if adf.p_value < cfg.stationarity_p_threshold {
        info!(
            series = %name,
            p_value = format!("{:.5}", adf.p_value),
            "likely stationary"
        );
    } else {
        info!(
            series = %name,
            p_value = format!("{:.5}", adf.p_value),
            "likely NOT stationary"
        );
    }

    // ── 6. Hurst exponent & rescaled-range plot ──────────────────────────
    let fit = rescaled_range_fit(closes)
        .with_context(|| format!("rescaled-range fit is degenerate for {name}"))?;
    plot::render_rescaled_range(&fit, &cfg.rs_plot_path)?;
    info!(
        series = %name,
        h = format!("{:.4}", fit.exponent),
        c = format!("{:.4}", fit.constant),
        "Hurst fit"
    );

    Ok(())
}

// =============================================================================
// Kraken flow
// =============================================================================

async fn run_kraken_flow(cfg: &KrakenConfig) -> Result<()> {
    info!(
        symbol = %cfg.symbol,
        granularity = %cfg.granularity,
        lookback_days = cfg.lookback_days,
        "starting Kraken market-data demo"
    );

    let client = KrakenClient::new();

    // ── 1. Perpetual discovery ───────────────────────────────────────────
    let perpetuals = client.active_perpetuals().await?;
    info!(count = perpetuals.len(), "active perpetual futures");
    if !perpetuals.iter().any(|s| s == &cfg.symbol) {
        warn!(symbol = %cfg.symbol, "symbol is not in the active perpetual list");
    }

    // ── 2. Paginated OHLCV fetch ─────────────────────────────────────────
    let start = Utc::now().date_naive() - chrono::Days::new(cfg.lookback_days);
    let candles = client
        .futures_ohlcv(&cfg.symbol, &cfg.granularity, start)
        .await?;

    match (candles.first(), candles.last()) {
        (Some(first), Some(last)) => info!(
            rows = candles.len(),
            from = %first.time,
            to = %last.time,
            last_close = last.close,
            "candle series assembled"
        ),
        _ => warn!(symbol = %cfg.symbol, "candle fetch returned no rows"),
    }

    // ── 3. Spot OHLCV (single request) ───────────────────────────────────
    let spot = client
        .spot_ohlcv(&cfg.spot_pair, &cfg.granularity, start)
        .await?;
    if let Some(last) = spot.last() {
        info!(
            pair = %cfg.spot_pair,
            rows = spot.len(),
            last_close = last.close,
            "spot candles fetched"
        );
    }

    // ── 4. Order-book prices (one fresh snapshot per helper) ─────────────
    let avg_bid = client.avg_bid_price(&cfg.symbol).await?;
    let avg_ask = client.avg_ask_price(&cfg.symbol).await?;
    let best_bid = client.best_bid_price(&cfg.symbol).await?;
    let best_ask = client.best_ask_price(&cfg.symbol).await?;
    let mid = client.mid_price(&cfg.symbol).await?;

    info!(
        best_bid,
        best_ask,
        mid,
        avg_bid_top10 = avg_bid,
        avg_ask_top10 = avg_ask,
        "order-book prices"
    );

    Ok(())
}
