//! Simulated broker for paper trading.

use async_trait::async_trait;
use rust_decimal::Decimal;
use scalp_core::error::BrokerError;
use scalp_core::traits::Broker;
use scalp_core::types::{
    BrokerOrder, BrokerPosition, OrderId, OrderSide, OrderStatus, PriceCache,
};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use tracing::info;

#[derive(Debug, Clone)]
struct SimPosition {
    qty: i64,
    avg_price: Decimal,
    realized: Decimal,
}

#[derive(Debug, Clone)]
struct SimOco {
    symbol: String,
    qty: i64,
    stop: Decimal,
    target: Decimal,
    active: bool,
}

#[derive(Default)]
struct SimState {
    seq: u64,
    orders: Vec<BrokerOrder>,
    positions: HashMap<String, SimPosition>,
    ocos: HashMap<String, SimOco>,
}

/// Fills market orders at the last cached tick price and emulates the
/// broker-side OCO: pending triggers are settled lazily whenever the
/// order book or positions are read.
pub struct PaperBroker {
    prices: Arc<PriceCache>,
    state: Mutex<SimState>,
}

impl PaperBroker {
    pub fn new(prices: Arc<PriceCache>) -> Self {
        Self {
            prices,
            state: Mutex::new(SimState::default()),
        }
    }

    fn ltp(&self, symbol: &str) -> Result<Decimal, BrokerError> {
        let ltp = self
            .prices
            .get(symbol)
            .ok_or_else(|| BrokerError::OrderRejected(format!("no market price for {symbol}")))?;
        Decimal::from_f64_retain(ltp)
            .ok_or_else(|| BrokerError::MalformedResponse(format!("bad price for {symbol}")))
    }

    fn next_id(state: &mut SimState, prefix: &str) -> String {
        state.seq += 1;
        format!("{prefix}-{:06}", state.seq)
    }

    fn record_fill(
        state: &mut SimState,
        symbol: &str,
        side: OrderSide,
        qty: i64,
        price: Decimal,
    ) -> OrderId {
        let order_id = Self::next_id(state, "SIM");
        state.orders.push(BrokerOrder {
            order_id: order_id.clone(),
            symbol: symbol.to_string(),
            side,
            status: OrderStatus::Complete,
            avg_price: Some(price),
            qty,
        });

        let pos = state.positions.entry(symbol.to_string()).or_insert(SimPosition {
            qty: 0,
            avg_price: Decimal::ZERO,
            realized: Decimal::ZERO,
        });
        match side {
            OrderSide::Buy => {
                let cost = pos.avg_price * Decimal::from(pos.qty) + price * Decimal::from(qty);
                pos.qty += qty;
                if pos.qty > 0 {
                    pos.avg_price = cost / Decimal::from(pos.qty);
                }
            }
            OrderSide::Sell => {
                pos.realized += (price - pos.avg_price) * Decimal::from(qty.min(pos.qty));
                pos.qty -= qty;
                if pos.qty <= 0 {
                    pos.qty = 0;
                    pos.avg_price = Decimal::ZERO;
                }
            }
        }
        order_id
    }

    /// Fire any OCO whose trigger the cached price has crossed.
    fn settle(&self, state: &mut SimState) {
        let pending: Vec<(String, SimOco)> = state
            .ocos
            .iter()
            .filter(|(_, o)| o.active)
            .map(|(id, o)| (id.clone(), o.clone()))
            .collect();

        for (id, oco) in pending {
            let Some(ltp_f) = self.prices.get(&oco.symbol) else {
                continue;
            };
            let Some(ltp) = Decimal::from_f64_retain(ltp_f) else {
                continue;
            };
            let exit_price = if ltp <= oco.stop {
                Some(oco.stop)
            } else if ltp >= oco.target {
                Some(oco.target)
            } else {
                None
            };
            if let Some(price) = exit_price {
                let order_id =
                    Self::record_fill(state, &oco.symbol, OrderSide::Sell, oco.qty, price);
                if let Some(o) = state.ocos.get_mut(&id) {
                    o.active = false;
                }
                info!(symbol = oco.symbol, %price, order_id, "simulated OCO fired");
            }
        }
    }
}

#[async_trait]
impl Broker for PaperBroker {
    async fn place_market_buy(&self, symbol: &str, qty: i64) -> Result<OrderId, BrokerError> {
        let price = self.ltp(symbol)?;
        let mut state = self.state.lock().unwrap();
        Ok(Self::record_fill(&mut state, symbol, OrderSide::Buy, qty, price))
    }

    async fn fill_price(&self, order_id: &str) -> Result<Option<Decimal>, BrokerError> {
        let state = self.state.lock().unwrap();
        state
            .orders
            .iter()
            .find(|o| o.order_id == order_id)
            .map(|o| o.avg_price)
            .ok_or_else(|| BrokerError::OrderNotFound(order_id.to_string()))
    }

    async fn place_oco_exit(
        &self,
        symbol: &str,
        qty: i64,
        stop: Decimal,
        target: Decimal,
    ) -> Result<OrderId, BrokerError> {
        let mut state = self.state.lock().unwrap();
        let id = Self::next_id(&mut state, "SIM-GTT");
        state.ocos.insert(
            id.clone(),
            SimOco {
                symbol: symbol.to_string(),
                qty,
                stop,
                target,
                active: true,
            },
        );
        Ok(id)
    }

    async fn place_market_exit(&self, symbol: &str, qty: i64) -> Result<OrderId, BrokerError> {
        let price = self.ltp(symbol)?;
        let mut state = self.state.lock().unwrap();
        for oco in state.ocos.values_mut() {
            if oco.symbol == symbol {
                oco.active = false;
            }
        }
        Ok(Self::record_fill(&mut state, symbol, OrderSide::Sell, qty, price))
    }

    async fn positions(&self) -> Result<Vec<BrokerPosition>, BrokerError> {
        let mut state = self.state.lock().unwrap();
        self.settle(&mut state);
        Ok(state
            .positions
            .iter()
            .map(|(symbol, p)| BrokerPosition {
                symbol: symbol.clone(),
                qty: p.qty,
                avg_price: p.avg_price,
                pnl: p.realized,
            })
            .collect())
    }

    async fn orders(&self) -> Result<Vec<BrokerOrder>, BrokerError> {
        let mut state = self.state.lock().unwrap();
        self.settle(&mut state);
        Ok(state.orders.clone())
    }

    async fn cancel_order(&self, order_id: &str) -> Result<(), BrokerError> {
        let mut state = self.state.lock().unwrap();
        if let Some(oco) = state.ocos.get_mut(order_id) {
            oco.active = false;
            return Ok(());
        }
        match state.orders.iter_mut().find(|o| o.order_id == order_id) {
            Some(o) if !o.status.is_terminal() => {
                o.status = OrderStatus::Cancelled;
                Ok(())
            }
            Some(_) => Ok(()),
            None => Err(BrokerError::OrderNotFound(order_id.to_string())),
        }
    }

    fn name(&self) -> &str {
        "paper"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn broker_with_price(symbol: &str, ltp: f64) -> PaperBroker {
        let prices = Arc::new(PriceCache::new());
        prices.update(symbol, ltp, 0);
        PaperBroker::new(prices)
    }

    #[tokio::test]
    async fn buy_fills_at_cached_ltp() {
        let broker = broker_with_price("NIFTY25SEP24500CE", 100.0);
        let id = broker.place_market_buy("NIFTY25SEP24500CE", 75).await.unwrap();
        assert_eq!(broker.fill_price(&id).await.unwrap(), Some(dec!(100)));

        let positions = broker.positions().await.unwrap();
        assert_eq!(positions[0].qty, 75);
        assert_eq!(positions[0].avg_price, dec!(100));
    }

    #[tokio::test]
    async fn buy_without_price_is_rejected() {
        let broker = PaperBroker::new(Arc::new(PriceCache::new()));
        let err = broker.place_market_buy("NIFTY25SEP24500CE", 75).await;
        assert!(matches!(err, Err(BrokerError::OrderRejected(_))));
    }

    #[tokio::test]
    async fn oco_stop_leg_fires_when_price_crosses() {
        let symbol = "NIFTY25SEP24500CE";
        let broker = broker_with_price(symbol, 100.0);
        broker.place_market_buy(symbol, 75).await.unwrap();
        broker
            .place_oco_exit(symbol, 75, dec!(95), dec!(105))
            .await
            .unwrap();

        broker.prices.update(symbol, 94.0, 1);
        let positions = broker.positions().await.unwrap();
        let pos = positions.iter().find(|p| p.symbol == symbol).unwrap();
        assert_eq!(pos.qty, 0);
        assert_eq!(pos.pnl, dec!(-375)); // (95 - 100) * 75

        // Exit shows up as a completed sell in the order book.
        let orders = broker.orders().await.unwrap();
        let sell = orders.iter().find(|o| o.side == OrderSide::Sell).unwrap();
        assert_eq!(sell.avg_price, Some(dec!(95)));
    }

    #[tokio::test]
    async fn market_exit_disarms_oco() {
        let symbol = "NIFTY25SEP24500CE";
        let broker = broker_with_price(symbol, 100.0);
        broker.place_market_buy(symbol, 75).await.unwrap();
        broker
            .place_oco_exit(symbol, 75, dec!(95), dec!(105))
            .await
            .unwrap();
        broker.place_market_exit(symbol, 75).await.unwrap();

        // Price later crosses the old stop; nothing more should fire.
        broker.prices.update(symbol, 90.0, 1);
        let orders = broker.orders().await.unwrap();
        let sells = orders.iter().filter(|o| o.side == OrderSide::Sell).count();
        assert_eq!(sells, 1);
    }
}
