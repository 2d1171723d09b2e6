// =============================================================================
// Daily Close Client — Yahoo Finance chart endpoint
// =============================================================================
//
// Fetches daily close histories for one ticker at a time.  The chart API
// reports failures in-band via `chart.error`, so both the HTTP status and the
// payload-level error are checked before any row is decoded.
// =============================================================================

use anyhow::{Context, Result};
use chrono::{DateTime, NaiveDate, Utc};
use serde::Deserialize;
use tracing::{debug, instrument};

use crate::market_data::panel::PriceSeries;

/// Yahoo Finance chart-API client for daily close series.
#[derive(Clone)]
pub struct DailyCloseClient {
    base_url: String,
    client: reqwest::Client,
}

// -----------------------------------------------------------------------------
// Chart response shape
// -----------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
struct ChartResponse {
    chart: Chart,
}

#[derive(Debug, Deserialize)]
struct Chart {
    result: Option<Vec<ChartResult>>,
    error: Option<ChartError>,
}

#[derive(Debug, Deserialize)]
struct ChartError {
    code: String,
    description: String,
}

#[derive(Debug, Deserialize)]
struct ChartResult {
    timestamp: Option<Vec<i64>>,
    indicators: Indicators,
}

#[derive(Debug, Deserialize)]
struct Indicators {
    quote: Vec<Quote>,
}

#[derive(Debug, Deserialize)]
struct Quote {
    close: Vec<Option<f64>>,
}

impl DailyCloseClient {
    pub fn new() -> Self {
        let client = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(10))
            .build()
            .expect("failed to build reqwest client");

        Self {
            base_url: "https://query1.finance.yahoo.com".to_string(),
            client,
        }
    }

    /// Fetch the daily close series of `ticker` from `start` through today,
    /// named `name` in the resulting series.
    #[instrument(skip(self), name = "daily::daily_closes")]
    pub async fn daily_closes(
        &self,
        name: &str,
        ticker: &str,
        start: NaiveDate,
    ) -> Result<PriceSeries> {
        let period1 = start
            .and_hms_opt(0, 0, 0)
            .expect("midnight is a valid time")
            .and_utc()
            .timestamp();
        let period2 = Utc::now().timestamp();

        let url = format!(
            "{}/v8/finance/chart/{}?period1={}&period2={}&interval=1d",
            self.base_url, ticker, period1, period2
        );

        let resp = self
            .client
            .get(&url)
            .send()
            .await
            .with_context(|| format!("GET daily chart request failed for {ticker}"))?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            anyhow::bail!("chart endpoint returned {status} for {ticker}: {body}");
        }

        let body: ChartResponse = resp
            .json()
            .await
            .with_context(|| format!("failed to parse chart response for {ticker}"))?;

        let series = series_from_chart(name, body)
            .with_context(|| format!("failed to decode chart payload for {ticker}"))?;

        debug!(name, ticker, rows = series.points.len(), "daily closes fetched");
        Ok(series)
    }
}

impl Default for DailyCloseClient {
    fn default() -> Self {
        Self::new()
    }
}

/// Extract the (date, close) rows from a decoded chart payload.  Rows whose
/// close is null (holidays, not-yet-settled sessions) are skipped.
fn series_from_chart(name: &str, body: ChartResponse) -> Result<PriceSeries> {
    if let Some(err) = body.chart.error {
        anyhow::bail!("chart API error: {} — {}", err.code, err.description);
    }

    let result = body
        .chart
        .result
        .and_then(|mut r| if r.is_empty() { None } else { Some(r.remove(0)) })
        .context("chart response carries no result")?;

    let timestamps = result.timestamp.unwrap_or_default();
    let quote = result
        .indicators
        .quote
        .into_iter()
        .next()
        .context("chart response carries no quote block")?;

    let mut points = Vec::with_capacity(timestamps.len());
    for (ts, close) in timestamps.iter().zip(quote.close.iter()) {
        if let Some(c) = close {
            let date = DateTime::from_timestamp(*ts, 0)
                .context("chart timestamp out of range")?
                .date_naive();
            points.push((date, *c));
        }
    }

    Ok(PriceSeries::new(name, points))
}
