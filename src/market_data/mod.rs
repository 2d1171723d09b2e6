pub mod daily;
pub mod panel;

// Re-export the panel types for convenient access (e.g. `use crate::market_data::Panel`).
pub use daily::DailyCloseClient;
pub use panel::{Panel, PriceSeries};
