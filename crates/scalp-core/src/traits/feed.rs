//! Market-data feed trait.

use crate::error::DataError;
use crate::types::Tick;
use async_trait::async_trait;
use tokio::sync::mpsc;

/// A subscribe/stream market-data source delivering full-quote ticks.
///
/// Delivery is not ordered across instruments; per-instrument ordering is
/// guaranteed by consuming the receiver on a single task.
#[async_trait]
pub trait MarketFeed: Send + Sync {
    /// Connect, subscribe to the given instrument tokens, and start
    /// pushing ticks into the returned channel.
    async fn subscribe(&self, tokens: &[u32]) -> Result<mpsc::Receiver<Tick>, DataError>;

    /// Tear down and re-establish the connection, resubscribing to the
    /// tokens passed to [`subscribe`](Self::subscribe). Ticks keep flowing
    /// into the original channel.
    async fn reconnect(&self) -> Result<(), DataError>;

    fn name(&self) -> &str;
}
