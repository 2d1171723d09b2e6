// =============================================================================
// Kraken REST API Client — public market-data endpoints
// =============================================================================
//
// Three public bases are involved: the derivatives API (instrument listing,
// order books), the charts API (futures OHLC pages), and the spot API (spot
// OHLC).  Everything here is unauthenticated; requests carry no credentials.
// =============================================================================

use anyhow::{Context, Result};
use chrono::{NaiveDate, Utc};
use tracing::{debug, info, instrument, warn};

use crate::kraken::book::OrderBookSnapshot;
use crate::kraken::ohlc::{candle_from_chart, candle_from_spot_row, Candle, PageAssembler};

/// Candle feed used by the charts endpoint (trades, not mark or index price).
const TICK_TYPE: &str = "trade";

/// Number of levels a side the top-of-book averages are taken over.
const TOP_OF_BOOK_DEPTH: usize = 10;

/// Futures-market symbol prefix identifying perpetual contracts tradable on
/// the multi-collateral futures venue.
const PERPETUAL_PREFIX: &str = "PF";

/// Kraken REST client for public futures and spot market data.
#[derive(Clone)]
pub struct KrakenClient {
    derivatives_base: String,
    charts_base: String,
    spot_base: String,
    client: reqwest::Client,
}

impl KrakenClient {
    pub fn new() -> Self {
        let client = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(10))
            .build()
            .expect("failed to build reqwest client");

        Self {
            derivatives_base: "https://futures.kraken.com/derivatives/api/v3".to_string(),
            charts_base: "https://futures.kraken.com/api/charts/v1".to_string(),
            spot_base: "https://api.kraken.com/0/public".to_string(),
            client,
        }
    }

    // -------------------------------------------------------------------------
    // Instrument discovery
    // -------------------------------------------------------------------------

    /// List the symbols of all active perpetual futures.
    #[instrument(skip(self), name = "kraken::active_perpetuals")]
    pub async fn active_perpetuals(&self) -> Result<Vec<String>> {
        let url = format!("{}/tickers", self.derivatives_base);
        let body = self.get_json(&url).await?;

        let symbols = perpetual_symbols(&body)?;
        debug!(count = symbols.len(), "active perpetuals listed");
        Ok(symbols)
    }

    // -------------------------------------------------------------------------
    // OHLCV
    // -------------------------------------------------------------------------

    /// Fetch the complete OHLCV series of a futures instrument from
    /// `start_date` to now, stitched together from as many candle pages as
    /// the window requires.
    ///
    /// A bounded request the exchange rejects (window too large) is retried
    /// exactly once with the end bound omitted; a failure of that retry
    /// propagates.
    #[instrument(skip(self), name = "kraken::futures_ohlcv")]
    pub async fn futures_ohlcv(
        &self,
        symbol: &str,
        granularity: &str,
        start_date: NaiveDate,
    ) -> Result<Vec<Candle>> {
        let start_ts = start_date
            .and_hms_opt(0, 0, 0)
            .expect("midnight is a valid time")
            .and_utc()
            .timestamp();
        let end_ts = Utc::now().timestamp();

        let mut assembler = PageAssembler::new(start_ts, end_ts);

        while let Some((from, to)) = assembler.next_window() {
            let page = match self.ohlc_page(symbol, granularity, from, Some(to)).await {
                Ok(page) => page,
                Err(e) => {
                    warn!(
                        symbol,
                        error = %e,
                        "bounded OHLC request failed — retrying without end bound"
                    );
                    self.ohlc_page(symbol, granularity, from, None).await?
                }
            };
            assembler.push_page(page);
        }

        let candles = assembler.finish()?;
        info!(symbol, granularity, rows = candles.len(), "futures OHLCV assembled");
        Ok(candles)
    }

    /// Fetch one page of futures candles starting at `from` (UNIX seconds).
    async fn ohlc_page(
        &self,
        symbol: &str,
        resolution: &str,
        from: i64,
        to: Option<i64>,
    ) -> Result<Vec<Candle>> {
        let mut url = format!(
            "{}/{}/{}/{}?from={}",
            self.charts_base, TICK_TYPE, symbol, resolution, from
        );
        if let Some(to) = to {
            url.push_str(&format!("&to={to}"));
        }

        let body = self.get_json(&url).await?;
        let raw = body["candles"]
            .as_array()
            .context("OHLC response missing 'candles' array")?;

        let mut page = Vec::with_capacity(raw.len());
        for entry in raw {
            page.push(candle_from_chart(entry)?);
        }

        debug!(symbol, resolution, from, count = page.len(), "OHLC page fetched");
        Ok(page)
    }

    /// Fetch the OHLCV series of a spot pair since `start_date` in a single
    /// request.
    #[instrument(skip(self), name = "kraken::spot_ohlcv")]
    pub async fn spot_ohlcv(
        &self,
        pair: &str,
        granularity: &str,
        start_date: NaiveDate,
    ) -> Result<Vec<Candle>> {
        let interval = spot_interval_minutes(granularity)?;
        let since = start_date
            .and_hms_opt(0, 0, 0)
            .expect("midnight is a valid time")
            .and_utc()
            .timestamp();

        let url = format!(
            "{}/OHLC?pair={}&interval={}&since={}",
            self.spot_base, pair, interval, since
        );
        let body = self.get_json(&url).await?;

        // The spot API reports failures in-band.
        if let Some(errors) = body["error"].as_array() {
            if !errors.is_empty() {
                anyhow::bail!("spot OHLC error for {pair}: {errors:?}");
            }
        }

        let result = body["result"]
            .as_object()
            .context("spot OHLC response missing 'result' object")?;

        // The pair's rows sit under its canonical name; "last" is a cursor.
        let (key, rows) = result
            .iter()
            .find(|(k, _)| k.as_str() != "last")
            .context("spot OHLC result carries no pair data")?;
        let rows = rows
            .as_array()
            .with_context(|| format!("spot OHLC entry '{key}' is not an array"))?;

        let mut candles = Vec::with_capacity(rows.len());
        for row in rows {
            candles.push(candle_from_spot_row(row)?);
        }

        debug!(pair, granularity, rows = candles.len(), "spot OHLCV fetched");
        Ok(candles)
    }

    // -------------------------------------------------------------------------
    // Order book
    // -------------------------------------------------------------------------

    /// Fetch a fresh order-book snapshot for a futures instrument.
    #[instrument(skip(self), name = "kraken::order_book")]
    pub async fn order_book(&self, symbol: &str) -> Result<OrderBookSnapshot> {
        let url = format!("{}/orderbook?symbol={}", self.derivatives_base, symbol);
        let body = self.get_json(&url).await?;
        OrderBookSnapshot::from_response(&body)
            .with_context(|| format!("failed to decode order book for {symbol}"))
    }

    /// Average price of the top 10 bid levels.  Fetches a fresh snapshot.
    pub async fn avg_bid_price(&self, symbol: &str) -> Result<f64> {
        self.order_book(symbol).await?.avg_bid_price(TOP_OF_BOOK_DEPTH)
    }

    /// Average price of the top 10 ask levels.  Fetches a fresh snapshot.
    pub async fn avg_ask_price(&self, symbol: &str) -> Result<f64> {
        self.order_book(symbol).await?.avg_ask_price(TOP_OF_BOOK_DEPTH)
    }

    /// Best bid price.  Fetches a fresh snapshot.
    pub async fn best_bid_price(&self, symbol: &str) -> Result<f64> {
        self.order_book(symbol).await?.best_bid()
    }

    /// Best ask price.  Fetches a fresh snapshot.
    pub async fn best_ask_price(&self, symbol: &str) -> Result<f64> {
        self.order_book(symbol).await?.best_ask()
    }

    /// Midpoint of the best bid and ask.  Fetches a fresh snapshot.
    pub async fn mid_price(&self, symbol: &str) -> Result<f64> {
        self.order_book(symbol).await?.mid_price()
    }

    // -------------------------------------------------------------------------
    // Internal helpers
    // -------------------------------------------------------------------------

    /// GET `url` and decode the JSON body, failing on a non-success status.
    async fn get_json(&self, url: &str) -> Result<serde_json::Value> {
        let resp = self
            .client
            .get(url)
            .send()
            .await
            .with_context(|| format!("GET {url} request failed"))?;

        let status = resp.status();
        let body: serde_json::Value = resp
            .json()
            .await
            .with_context(|| format!("failed to parse response from {url}"))?;

        if !status.is_success() {
            anyhow::bail!("{url} returned {status}: {body}");
        }

        Ok(body)
    }
}

impl Default for KrakenClient {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for KrakenClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("KrakenClient")
            .field("derivatives_base", &self.derivatives_base)
            .field("charts_base", &self.charts_base)
            .field("spot_base", &self.spot_base)
            .finish()
    }
}

/// Extract perpetual symbols from a tickers response: entries tagged
/// "perpetual" whose symbol carries the futures-market prefix.
fn perpetual_symbols(body: &serde_json::Value) -> Result<Vec<String>> {
    let tickers = body["tickers"]
        .as_array()
        .context("tickers response missing 'tickers' array")?;

    let mut symbols = Vec::new();
    for ticker in tickers {
        if ticker["tag"].as_str() != Some("perpetual") {
            continue;
        }
        if let Some(symbol) = ticker["symbol"].as_str() {
            if symbol.starts_with(PERPETUAL_PREFIX) {
                symbols.push(symbol.to_string());
            }
        }
    }

    Ok(symbols)
}

/// Translate a granularity name into the spot API's minute-resolution code.
fn spot_interval_minutes(granularity: &str) -> Result<u32> {
    let minutes = match granularity {
        "1d" => 1440,
        "1h" => 60,
        "30m" => 30,
        "15m" => 15,
        "1m" => 1,
        other => anyhow::bail!("unsupported spot granularity: {other}"),
    };
    Ok(minutes)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn perpetual_filter_keeps_prefixed_symbols_only() {
        let body = serde_json::json!({
            "result": "success",
            "tickers": [
                {"tag": "perpetual", "symbol": "PF_XBTUSD"},
                {"tag": "perpetual", "symbol": "PI_XBTUSD"},
                {"tag": "month", "symbol": "PF_ETHUSD"},
                {"tag": "perpetual", "symbol": "PF_SOLUSD"},
                {"tag": "perpetual"}
            ]
        });

        let symbols = perpetual_symbols(&body).expect("should parse");
        assert_eq!(symbols, vec!["PF_XBTUSD".to_string(), "PF_SOLUSD".to_string()]);
    }

    #[test]
    fn missing_tickers_array_is_an_error() {
        let body = serde_json::json!({"result": "success"});
        assert!(perpetual_symbols(&body).is_err());
    }

    #[test]
    fn granularity_map_matches_spot_codes() {
        assert_eq!(spot_interval_minutes("1d").expect("known"), 1440);
        assert_eq!(spot_interval_minutes("1h").expect("known"), 60);
        assert_eq!(spot_interval_minutes("30m").expect("known"), 30);
        assert_eq!(spot_interval_minutes("15m").expect("known"), 15);
        assert_eq!(spot_interval_minutes("1m").expect("known"), 1);
    }

    #[test]
    fn unknown_granularity_is_an_error() {
        assert!(spot_interval_minutes("4h").is_err());
        assert!(spot_interval_minutes("").is_err());
    }
}
