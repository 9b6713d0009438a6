//! Historical warm-up source trait.

use crate::error::DataError;
use crate::types::Candle;
use async_trait::async_trait;

/// Query for the last N closed candles of an instrument, used only to
/// pre-seed the indicator engine before live ticks arrive.
#[async_trait]
pub trait HistoricalSource: Send + Sync {
    /// Most recent `limit` closed candles, oldest first, tagged
    /// [`CandleSource::Warmup`](crate::types::CandleSource::Warmup).
    async fn recent_candles(
        &self,
        symbol: &str,
        timeframe_secs: i64,
        limit: usize,
    ) -> Result<Vec<Candle>, DataError>;
}
