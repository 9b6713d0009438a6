//! Trade lifecycle types.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Where a trade is in its lifecycle.
///
/// `BuyPlaced -> Protected -> Closed`, with a forced-exit branch from
/// either live state straight to `Closed`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TradeState {
    /// Market buy acknowledged, protective order not yet up.
    BuyPlaced,
    /// Broker-side OCO exit (stop + target) is in place.
    Protected,
    /// Position flat, record about to be cleared.
    Closed,
}

/// Why a trade was closed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ExitReason {
    /// Stop level hit (strategy exit or inferred from broker state).
    StopLoss,
    /// Target level hit.
    TakeProfit,
    /// Emergency market exit after protective-order placement failed.
    ProtectionFailed,
    /// Price had already crossed stop/target before protection went up.
    PreProtectCross,
    /// Reconciliation sweep found the broker position flat.
    BrokerSync,
    /// Closed broker-side for a reason we could not classify.
    BrokerExit,
}

impl ExitReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            ExitReason::StopLoss => "SL",
            ExitReason::TakeProfit => "TP",
            ExitReason::ProtectionFailed => "PROTECTION_FAILED",
            ExitReason::PreProtectCross => "PRE_PROTECT_CROSS",
            ExitReason::BrokerSync => "BROKER_SYNC",
            ExitReason::BrokerExit => "BROKER_EXIT",
        }
    }
}

impl std::fmt::Display for ExitReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One live (or just-closed) trade, owned exclusively by a single slot.
///
/// Persisted on every state transition so a restart can rehydrate it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Trade {
    pub trade_id: Uuid,
    pub symbol: String,
    pub instrument_token: u32,
    pub qty: i64,

    pub buy_order_id: String,
    pub buy_price: f64,

    /// Broker-side OCO conditional order id, set on `Protected`.
    pub protective_order_id: Option<String>,
    pub stop_loss: f64,
    pub take_profit: f64,

    pub entry_time: DateTime<Utc>,
    pub state: TradeState,
    /// Start timestamp of the signal candle (idempotency key component).
    pub signal_candle_ts: i64,

    pub exit_reason: Option<ExitReason>,
    /// Legacy standalone stop order id, kept for recovery classification.
    pub stop_order_id: Option<String>,
}

impl Trade {
    pub fn is_open(&self) -> bool {
        self.state != TradeState::Closed
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_trade() -> Trade {
        Trade {
            trade_id: Uuid::new_v4(),
            symbol: "NIFTY24D1924000CE".into(),
            instrument_token: 12345,
            qty: 75,
            buy_order_id: "OB-1".into(),
            buy_price: 104.5,
            protective_order_id: None,
            stop_loss: 99.0,
            take_profit: 110.0,
            entry_time: Utc::now(),
            state: TradeState::BuyPlaced,
            signal_candle_ts: 1_700_000_060,
            exit_reason: None,
            stop_order_id: None,
        }
    }

    #[test]
    fn open_until_closed() {
        let mut trade = sample_trade();
        assert!(trade.is_open());
        trade.state = TradeState::Protected;
        assert!(trade.is_open());
        trade.state = TradeState::Closed;
        assert!(!trade.is_open());
    }

    #[test]
    fn round_trips_through_json() {
        let trade = sample_trade();
        let json = serde_json::to_string(&trade).unwrap();
        let back: Trade = serde_json::from_str(&json).unwrap();
        assert_eq!(trade, back);
    }
}
