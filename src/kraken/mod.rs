pub mod book;
pub mod client;
pub mod ohlc;

// Re-export the client and core types (e.g. `use crate::kraken::KrakenClient`).
pub use book::{BookLevel, OrderBookSnapshot};
pub use client::KrakenClient;
pub use ohlc::{Candle, PageAssembler, PaginationError};
