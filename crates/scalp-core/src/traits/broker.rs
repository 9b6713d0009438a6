//! Broker trait definition.

use crate::error::BrokerError;
use crate::types::{BrokerOrder, BrokerPosition, OrderId};
use async_trait::async_trait;
use rust_decimal::Decimal;

/// Order placement and account state against one brokerage.
///
/// Implementations: live REST broker, simulated paper broker, log-only
/// dry-run broker. All calls may fail transiently; callers classify via
/// [`BrokerError::kind`] and apply the documented per-component policy.
#[async_trait]
pub trait Broker: Send + Sync {
    /// Place a market buy. Returns the broker order id; the fill price is
    /// usually not yet known.
    async fn place_market_buy(&self, symbol: &str, qty: i64) -> Result<OrderId, BrokerError>;

    /// Average fill price for an order, if the broker knows it yet.
    async fn fill_price(&self, order_id: &str) -> Result<Option<Decimal>, BrokerError>;

    /// Place a broker-side one-cancels-other conditional exit
    /// (stop + target). Returns the conditional order id.
    async fn place_oco_exit(
        &self,
        symbol: &str,
        qty: i64,
        stop: Decimal,
        target: Decimal,
    ) -> Result<OrderId, BrokerError>;

    /// Immediate market exit of an open long. Emergency path.
    async fn place_market_exit(&self, symbol: &str, qty: i64) -> Result<OrderId, BrokerError>;

    /// All net positions.
    async fn positions(&self) -> Result<Vec<BrokerPosition>, BrokerError>;

    /// Today's order book.
    async fn orders(&self) -> Result<Vec<BrokerOrder>, BrokerError>;

    /// Cancel an order (regular or conditional).
    async fn cancel_order(&self, order_id: &str) -> Result<(), BrokerError>;

    /// Get the broker name.
    fn name(&self) -> &str;
}
