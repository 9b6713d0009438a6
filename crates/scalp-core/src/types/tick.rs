//! Market-data ticks.

use serde::{Deserialize, Serialize};

/// One last-traded-price update from the market-data feed.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Tick {
    /// Exchange instrument token
    pub instrument_token: u32,
    /// Last traded price
    pub last_price: f64,
    /// Unix seconds
    pub timestamp: i64,
}

impl Tick {
    pub fn new(instrument_token: u32, last_price: f64, timestamp: i64) -> Self {
        Self {
            instrument_token,
            last_price,
            timestamp,
        }
    }
}
