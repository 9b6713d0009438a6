//! Dry-run broker that logs every order instead of placing it.

use async_trait::async_trait;
use rust_decimal::Decimal;
use scalp_core::error::BrokerError;
use scalp_core::traits::Broker;
use scalp_core::types::{BrokerOrder, BrokerPosition, OrderId};
use std::sync::atomic::{AtomicU64, Ordering};
use tracing::info;

/// Answers every call successfully without touching any exchange.
/// Useful for shadowing the live pipeline during rollout.
#[derive(Default)]
pub struct LogBroker {
    seq: AtomicU64,
}

impl LogBroker {
    pub fn new() -> Self {
        Self::default()
    }

    fn next_id(&self, prefix: &str) -> String {
        format!("{prefix}-{:06}", self.seq.fetch_add(1, Ordering::Relaxed) + 1)
    }
}

#[async_trait]
impl Broker for LogBroker {
    async fn place_market_buy(&self, symbol: &str, qty: i64) -> Result<OrderId, BrokerError> {
        let order_id = self.next_id("DRY-BUY");
        info!(symbol, qty, order_id, "dry-run buy");
        Ok(order_id)
    }

    async fn fill_price(&self, _order_id: &str) -> Result<Option<Decimal>, BrokerError> {
        Ok(None)
    }

    async fn place_oco_exit(
        &self,
        symbol: &str,
        qty: i64,
        stop: Decimal,
        target: Decimal,
    ) -> Result<OrderId, BrokerError> {
        let order_id = self.next_id("DRY-GTT");
        info!(symbol, qty, %stop, %target, order_id, "dry-run OCO");
        Ok(order_id)
    }

    async fn place_market_exit(&self, symbol: &str, qty: i64) -> Result<OrderId, BrokerError> {
        let order_id = self.next_id("DRY-EXIT");
        info!(symbol, qty, order_id, "dry-run exit");
        Ok(order_id)
    }

    async fn positions(&self) -> Result<Vec<BrokerPosition>, BrokerError> {
        Ok(Vec::new())
    }

    async fn orders(&self) -> Result<Vec<BrokerOrder>, BrokerError> {
        Ok(Vec::new())
    }

    async fn cancel_order(&self, order_id: &str) -> Result<(), BrokerError> {
        info!(order_id, "dry-run cancel");
        Ok(())
    }

    fn name(&self) -> &str {
        "log-only"
    }
}
