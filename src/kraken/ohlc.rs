// =============================================================================
// OHLCV Candles — decoding, normalization, and the pagination assembler
// =============================================================================
//
// The charts endpoint caps how many candles one request may return, so a
// fetch covering [start, now] is stitched together from several pages.  The
// PageAssembler owns that loop's state: it hands out the next request window,
// advances its cursor to the newest timestamp each page delivers, and stops
// as soon as a page makes no forward progress.  The finished series is
// de-duplicated by timestamp and checked for internal consistency.
// =============================================================================

use std::collections::HashSet;

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

/// One OHLCV candle with the timestamp normalized to UTC and every numeric
/// field coerced to `f64` (the exchange mixes strings and numbers).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Candle {
    pub time: DateTime<Utc>,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub volume: f64,
}

/// Failure of the pagination consistency check — the assembled series should
/// hold exactly one row per timestamp, so a violation means the dedup logic
/// is wrong, not that the exchange misbehaved.
#[derive(Debug, Error)]
pub enum PaginationError {
    #[error("pagination integrity violated: {rows} rows span {unique} unique timestamps")]
    Integrity { rows: usize, unique: usize },
}

// -----------------------------------------------------------------------------
// Decoding
// -----------------------------------------------------------------------------

/// Parse a JSON value that may be either a string or a number into `f64`.
pub(crate) fn parse_str_f64(val: &serde_json::Value) -> Result<f64> {
    if let Some(s) = val.as_str() {
        s.parse::<f64>()
            .with_context(|| format!("failed to parse '{s}' as f64"))
    } else if let Some(n) = val.as_f64() {
        Ok(n)
    } else {
        anyhow::bail!("expected string or number, got: {val}")
    }
}

/// Decode one candle object from the futures charts endpoint.
///
/// The `time` field is in milliseconds; prices arrive as strings.
pub fn candle_from_chart(value: &serde_json::Value) -> Result<Candle> {
    let time_ms = value["time"].as_i64().context("candle missing 'time' field")?;
    let time = DateTime::from_timestamp_millis(time_ms).context("candle time out of range")?;

    Ok(Candle {
        time,
        open: parse_str_f64(&value["open"])?,
        high: parse_str_f64(&value["high"])?,
        low: parse_str_f64(&value["low"])?,
        close: parse_str_f64(&value["close"])?,
        volume: parse_str_f64(&value["volume"])?,
    })
}

/// Decode one row array from the spot OHLC endpoint.
///
/// Rows are `[time, open, high, low, close, vwap, volume, count]` with time
/// in seconds; only time, the four prices, and the volume are consumed.
pub fn candle_from_spot_row(row: &serde_json::Value) -> Result<Candle> {
    let arr = row.as_array().context("spot OHLC row is not an array")?;
    if arr.len() < 7 {
        anyhow::bail!("spot OHLC row has {} fields; need at least 7", arr.len());
    }

    let time_s = arr[0].as_i64().context("spot OHLC row missing time")?;
    let time = DateTime::from_timestamp(time_s, 0).context("spot OHLC time out of range")?;

    Ok(Candle {
        time,
        open: parse_str_f64(&arr[1])?,
        high: parse_str_f64(&arr[2])?,
        low: parse_str_f64(&arr[3])?,
        close: parse_str_f64(&arr[4])?,
        volume: parse_str_f64(&arr[6])?,
    })
}

// -----------------------------------------------------------------------------
// PageAssembler
// -----------------------------------------------------------------------------

/// Explicit pager for the futures OHLCV fetch.
///
/// Termination rules, applied when a page is pushed:
/// - an empty page: nothing left to fetch;
/// - a page whose newest timestamp does not advance the cursor: the exchange
///   is re-serving data we already hold, so continuing would loop forever;
/// - a single-record page: the window is exhausted and the lone record (the
///   still-forming current candle) is dropped, not appended;
/// - otherwise the cursor advances to the page's newest timestamp, and
///   [`next_window`](Self::next_window) stops once it reaches the end bound.
#[derive(Debug)]
pub struct PageAssembler {
    candles: Vec<Candle>,
    cursor_ts: i64,
    end_ts: i64,
    done: bool,
}

impl PageAssembler {
    /// Start a fetch over `[start_ts, end_ts]` (UNIX seconds).
    pub fn new(start_ts: i64, end_ts: i64) -> Self {
        Self {
            candles: Vec::new(),
            cursor_ts: start_ts,
            end_ts,
            done: false,
        }
    }

    /// The next `(from, to)` request window, or `None` when the fetch is
    /// complete.
    pub fn next_window(&self) -> Option<(i64, i64)> {
        (!self.done && self.cursor_ts < self.end_ts).then_some((self.cursor_ts, self.end_ts))
    }

    /// Consume one fetched page and update the cursor.
    pub fn push_page(&mut self, page: Vec<Candle>) {
        let Some(max_ms) = page.iter().map(|c| c.time.timestamp_millis()).max() else {
            debug!("empty OHLC page — fetch complete");
            self.done = true;
            return;
        };

        // Milliseconds to seconds: the request window is in seconds.
        let max_ts = max_ms / 1000;

        if max_ts <= self.cursor_ts {
            debug!(max_ts, cursor = self.cursor_ts, "OHLC page made no progress — stopping");
            self.done = true;
            return;
        }
        self.cursor_ts = max_ts;

        if page.len() == 1 {
            // The window is exhausted; the lone still-forming candle is dropped.
            self.done = true;
            return;
        }

        self.candles.extend(page);
    }

    /// De-duplicate by exact timestamp (first occurrence wins) and verify the
    /// series holds one row per timestamp.
    pub fn finish(self) -> Result<Vec<Candle>, PaginationError> {
        let mut seen: HashSet<i64> = HashSet::with_capacity(self.candles.len());
        let mut out = Vec::with_capacity(self.candles.len());

        for candle in self.candles {
            if seen.insert(candle.time.timestamp_millis()) {
                out.push(candle);
            }
        }

        if out.len() != seen.len() {
            return Err(PaginationError::Integrity {
                rows: out.len(),
                unique: seen.len(),
            });
        }

        Ok(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn candle(time_s: i64, close: f64) -> Candle {
        Candle {
            time: DateTime::from_timestamp(time_s, 0).expect("valid timestamp"),
            open: close,
            high: close + 1.0,
            low: close - 1.0,
            close,
            volume: 10.0,
        }
    }

    fn page(times: &[i64]) -> Vec<Candle> {
        times.iter().map(|t| candle(*t, 100.0)).collect()
    }

    #[test]
    fn advancing_pages_cover_range_without_duplicates() {
        let mut asm = PageAssembler::new(0, 10_000);

        // Consecutive pages overlap on their boundary candle.
        asm.push_page(page(&[0, 1_000, 2_000, 3_000]));
        assert_eq!(asm.next_window(), Some((3_000, 10_000)));

        asm.push_page(page(&[3_000, 4_000, 5_000, 6_000]));
        asm.push_page(page(&[6_000, 7_000, 8_000, 9_000, 10_000]));
        assert_eq!(asm.next_window(), None);

        let series = asm.finish().expect("should assemble");
        let times: Vec<i64> = series.iter().map(|c| c.time.timestamp()).collect();
        assert_eq!(
            times,
            vec![0, 1_000, 2_000, 3_000, 4_000, 5_000, 6_000, 7_000, 8_000, 9_000, 10_000]
        );
    }

    #[test]
    fn repeated_max_timestamp_terminates() {
        let mut asm = PageAssembler::new(0, 100_000);

        asm.push_page(page(&[0, 1_000, 2_000]));
        assert!(asm.next_window().is_some());

        // Exchange re-serves the same page: no forward progress.
        asm.push_page(page(&[0, 1_000, 2_000]));
        assert_eq!(asm.next_window(), None);

        let series = asm.finish().expect("should assemble");
        assert_eq!(series.len(), 3);
    }

    #[test]
    fn single_record_page_terminates_and_is_dropped() {
        let mut asm = PageAssembler::new(0, 100_000);

        asm.push_page(page(&[0, 1_000, 2_000]));
        asm.push_page(page(&[5_000]));
        assert_eq!(asm.next_window(), None);

        let series = asm.finish().expect("should assemble");
        assert!(series.iter().all(|c| c.time.timestamp() != 5_000));
        assert_eq!(series.len(), 3);
    }

    #[test]
    fn empty_page_terminates() {
        let mut asm = PageAssembler::new(0, 100_000);
        asm.push_page(Vec::new());
        assert_eq!(asm.next_window(), None);
        assert!(asm.finish().expect("should assemble").is_empty());
    }

    #[test]
    fn exhausted_window_yields_no_request() {
        let asm = PageAssembler::new(5_000, 5_000);
        assert_eq!(asm.next_window(), None);
    }

    #[test]
    fn overlap_keeps_first_occurrence() {
        let mut asm = PageAssembler::new(0, 10_000);

        let mut first = page(&[0, 1_000]);
        first[1].close = 111.0;
        asm.push_page(first);

        let mut second = page(&[1_000, 2_000]);
        second[0].close = 222.0;
        asm.push_page(second);

        let series = asm.finish().expect("should assemble");
        assert_eq!(series.len(), 3);
        // The boundary candle keeps its first-fetched values.
        assert!((series[1].close - 111.0).abs() < f64::EPSILON);
    }

    #[test]
    fn chart_candle_normalization_round_trip() {
        let raw = serde_json::json!({
            "time": 1_700_000_000_000_i64,
            "open": "37000.5",
            "high": "37050.25",
            "low": 36990.0,
            "close": "37020.75",
            "volume": 123.456
        });

        let candle = candle_from_chart(&raw).expect("should decode");
        assert_eq!(candle.time.timestamp_millis(), 1_700_000_000_000);
        assert!((candle.open - 37000.5).abs() < f64::EPSILON);
        assert!((candle.low - 36990.0).abs() < f64::EPSILON);
        assert!((candle.close - 37020.75).abs() < f64::EPSILON);
        assert!((candle.volume - 123.456).abs() < f64::EPSILON);
    }

    #[test]
    fn spot_row_consumes_expected_indices() {
        let raw = serde_json::json!([
            1_700_000_000_i64,
            "43000.1",
            "43100.2",
            "42900.3",
            "43050.4",
            "43010.0",
            "12.5",
            321
        ]);

        let candle = candle_from_spot_row(&raw).expect("should decode");
        assert_eq!(candle.time.timestamp(), 1_700_000_000);
        assert!((candle.open - 43000.1).abs() < f64::EPSILON);
        assert!((candle.high - 43100.2).abs() < f64::EPSILON);
        assert!((candle.low - 42900.3).abs() < f64::EPSILON);
        assert!((candle.close - 43050.4).abs() < f64::EPSILON);
        // Volume is field 6, skipping the vwap at field 5.
        assert!((candle.volume - 12.5).abs() < f64::EPSILON);
    }

    #[test]
    fn short_spot_row_is_rejected() {
        let raw = serde_json::json!([1_700_000_000_i64, "1", "2", "3"]);
        assert!(candle_from_spot_row(&raw).is_err());
    }

    #[test]
    fn malformed_chart_candle_is_rejected() {
        let raw = serde_json::json!({"open": "1.0"});
        assert!(candle_from_chart(&raw).is_err());
    }
}
