// =============================================================================
// Order Book Snapshot — top-of-book price helpers
// =============================================================================
//
// Snapshots are fetched fresh for every price helper call and never cached;
// two helpers invoked back to back therefore see two different books.
// =============================================================================

use anyhow::{Context, Result};

use crate::kraken::ohlc::parse_str_f64;

/// One price level: price and resting size.
#[derive(Debug, Clone, PartialEq)]
pub struct BookLevel {
    pub price: f64,
    pub size: f64,
}

/// Bids and asks ordered best-price-first, as served by the derivatives
/// order-book endpoint.
#[derive(Debug, Clone, PartialEq)]
pub struct OrderBookSnapshot {
    pub bids: Vec<BookLevel>,
    pub asks: Vec<BookLevel>,
}

impl OrderBookSnapshot {
    /// Decode the `orderBook` object of a derivatives order-book response.
    ///
    /// Expected shape:
    /// ```json
    /// { "orderBook": { "bids": [[price, size], ...], "asks": [[price, size], ...] } }
    /// ```
    pub fn from_response(body: &serde_json::Value) -> Result<Self> {
        let book = body
            .get("orderBook")
            .context("response missing 'orderBook' object")?;

        let bids = parse_levels(book.get("bids").context("order book missing 'bids'")?)
            .context("failed to parse bid levels")?;
        let asks = parse_levels(book.get("asks").context("order book missing 'asks'")?)
            .context("failed to parse ask levels")?;

        Ok(Self { bids, asks })
    }

    /// Price of the best (first) bid.
    pub fn best_bid(&self) -> Result<f64> {
        self.bids
            .first()
            .map(|level| level.price)
            .context("order book has no bids")
    }

    /// Price of the best (first) ask.
    pub fn best_ask(&self) -> Result<f64> {
        self.asks
            .first()
            .map(|level| level.price)
            .context("order book has no asks")
    }

    /// Midpoint of the best bid and best ask.
    pub fn mid_price(&self) -> Result<f64> {
        Ok((self.best_bid()? + self.best_ask()?) / 2.0)
    }

    /// Average price of the top `depth` bid levels.
    ///
    /// The book must carry at least `depth` bid levels; a thinner book is an
    /// error rather than a silently smaller average.
    pub fn avg_bid_price(&self, depth: usize) -> Result<f64> {
        avg_price(&self.bids, depth, "bid")
    }

    /// Average price of the top `depth` ask levels.
    pub fn avg_ask_price(&self, depth: usize) -> Result<f64> {
        avg_price(&self.asks, depth, "ask")
    }
}

fn parse_levels(raw: &serde_json::Value) -> Result<Vec<BookLevel>> {
    let entries = raw.as_array().context("levels are not an array")?;
    let mut levels = Vec::with_capacity(entries.len());

    for entry in entries {
        let fields = entry.as_array().context("level is not an array")?;
        if fields.len() < 2 {
            anyhow::bail!("level has {} fields; need price and size", fields.len());
        }
        levels.push(BookLevel {
            price: parse_str_f64(&fields[0])?,
            size: parse_str_f64(&fields[1])?,
        });
    }

    Ok(levels)
}

fn avg_price(levels: &[BookLevel], depth: usize, side: &str) -> Result<f64> {
    if levels.len() < depth {
        anyhow::bail!(
            "order book has only {} {side} levels; need {depth}",
            levels.len()
        );
    }

    let sum: f64 = levels[..depth].iter().map(|level| level.price).sum();
    Ok(sum / depth as f64)
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Bids 100, 99, 98, … and asks 101, 102, 103, … with `n` levels a side.
    fn sample_book(n: usize) -> OrderBookSnapshot {
        OrderBookSnapshot {
            bids: (0..n)
                .map(|i| BookLevel {
                    price: 100.0 - i as f64,
                    size: 1.0,
                })
                .collect(),
            asks: (0..n)
                .map(|i| BookLevel {
                    price: 101.0 + i as f64,
                    size: 1.0,
                })
                .collect(),
        }
    }

    #[test]
    fn best_and_mid_prices() {
        let book = sample_book(12);
        assert!((book.best_bid().expect("has bids") - 100.0).abs() < f64::EPSILON);
        assert!((book.best_ask().expect("has asks") - 101.0).abs() < f64::EPSILON);
        assert!((book.mid_price().expect("has both sides") - 100.5).abs() < f64::EPSILON);
    }

    #[test]
    fn top_ten_averages_use_exactly_ten_levels() {
        let book = sample_book(15);
        // (100 + 99 + … + 91) / 10 and (101 + 102 + … + 110) / 10.
        assert!((book.avg_bid_price(10).expect("deep enough") - 95.5).abs() < f64::EPSILON);
        assert!((book.avg_ask_price(10).expect("deep enough") - 105.5).abs() < f64::EPSILON);
    }

    #[test]
    fn thin_book_is_an_error() {
        let book = sample_book(7);
        assert!(book.avg_bid_price(10).is_err());
        assert!(book.avg_ask_price(10).is_err());
    }

    #[test]
    fn empty_side_is_an_error() {
        let book = OrderBookSnapshot {
            bids: Vec::new(),
            asks: Vec::new(),
        };
        assert!(book.best_bid().is_err());
        assert!(book.best_ask().is_err());
        assert!(book.mid_price().is_err());
    }

    #[test]
    fn decodes_order_book_response() {
        let body = serde_json::json!({
            "result": "success",
            "orderBook": {
                "bids": [[100.0, 2.5], [99.5, 1.0]],
                "asks": [["100.5", "3.0"], [101.0, 0.5]]
            }
        });

        let book = OrderBookSnapshot::from_response(&body).expect("should decode");
        assert_eq!(book.bids.len(), 2);
        assert!((book.bids[0].price - 100.0).abs() < f64::EPSILON);
        assert!((book.asks[0].price - 100.5).abs() < f64::EPSILON);
        assert!((book.asks[0].size - 3.0).abs() < f64::EPSILON);
    }

    #[test]
    fn missing_book_is_an_error() {
        let body = serde_json::json!({"result": "error"});
        assert!(OrderBookSnapshot::from_response(&body).is_err());
    }
}
