//! Broker-reported order and position views.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Broker-assigned order identifier.
pub type OrderId = String;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OrderStatus {
    Open,
    Complete,
    Cancelled,
    Rejected,
}

impl OrderStatus {
    pub fn is_terminal(&self) -> bool {
        !matches!(self, OrderStatus::Open)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OrderSide {
    Buy,
    Sell,
}

/// One row of the broker's order book, as reported by the broker.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BrokerOrder {
    pub order_id: OrderId,
    pub symbol: String,
    pub side: OrderSide,
    pub status: OrderStatus,
    /// Average fill price, absent until (partially) filled.
    pub avg_price: Option<Decimal>,
    pub qty: i64,
}

/// One net position as reported by the broker.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BrokerPosition {
    pub symbol: String,
    /// Net quantity; zero means flat.
    pub qty: i64,
    pub avg_price: Decimal,
    /// Realized + unrealized P&L for the day.
    pub pnl: Decimal,
}

impl BrokerPosition {
    pub fn is_flat(&self) -> bool {
        self.qty == 0
    }
}
