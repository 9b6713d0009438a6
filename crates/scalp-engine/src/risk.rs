//! Daily max-loss guard.

use crate::session::now_exchange_date;
use chrono::NaiveDate;
use rust_decimal::prelude::ToPrimitive;
use scalp_core::traits::Broker;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::watch;
use tracing::{debug, error, warn};

/// Halts new entries for the rest of the day once broker-reported P&L
/// breaches the configured loss limit.
///
/// The tick path only reads one atomic; P&L polling happens on a
/// background task. A broker failure during polling never flips the
/// halt flag in either direction.
pub struct MaxLossGuard {
    limit: Option<f64>,
    halted: AtomicBool,
    halted_on: Mutex<Option<NaiveDate>>,
}

impl MaxLossGuard {
    pub fn new(limit: Option<f64>) -> Self {
        Self {
            limit,
            halted: AtomicBool::new(false),
            halted_on: Mutex::new(None),
        }
    }

    /// True while entries are halted for `today`. A halt from a previous
    /// session clears itself on the first check of the new day.
    pub fn is_halted_on(&self, today: NaiveDate) -> bool {
        if !self.halted.load(Ordering::Acquire) {
            return false;
        }
        let mut halted_on = self.halted_on.lock().unwrap();
        match *halted_on {
            Some(date) if date == today => true,
            _ => {
                *halted_on = None;
                self.halted.store(false, Ordering::Release);
                false
            }
        }
    }

    fn halt(&self, today: NaiveDate, pnl: f64) {
        let mut halted_on = self.halted_on.lock().unwrap();
        if halted_on.is_none() {
            error!(pnl, "daily loss limit breached, halting new entries");
        }
        *halted_on = Some(today);
        self.halted.store(true, Ordering::Release);
    }

    /// Evaluate one P&L reading against the limit.
    pub fn observe(&self, pnl: f64, today: NaiveDate) {
        let Some(limit) = self.limit else { return };
        if pnl <= -limit {
            self.halt(today, pnl);
        }
    }

    /// One P&L poll against the broker.
    async fn poll_once(&self, broker: &dyn Broker) {
        match broker.positions().await {
            Ok(positions) => {
                let pnl: f64 = positions
                    .iter()
                    .filter_map(|p| p.pnl.to_f64())
                    .sum();
                self.observe(pnl, now_exchange_date());
            }
            Err(e) => {
                // Unknown P&L is not a breach; keep the current state.
                warn!(error = %e, "P&L poll failed");
            }
        }
    }

    /// Background polling loop. Exits when the shutdown flag flips.
    pub async fn run(
        self: Arc<Self>,
        broker: Arc<dyn Broker>,
        interval: Duration,
        mut shutdown: watch::Receiver<bool>,
    ) {
        if self.limit.is_none() {
            debug!("max-loss guard disabled, no limit configured");
            return;
        }
        let mut ticker = tokio::time::interval(interval);
        loop {
            tokio::select! {
                _ = ticker.tick() => {}
                _ = shutdown.changed() => return,
            }
            self.poll_once(broker.as_ref()).await;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use rust_decimal::Decimal;
    use scalp_core::error::BrokerError;
    use scalp_core::types::{BrokerOrder, BrokerPosition, OrderId};

    fn day(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 9, d).unwrap()
    }

    struct DownBroker;

    #[async_trait]
    impl Broker for DownBroker {
        async fn place_market_buy(&self, _s: &str, _q: i64) -> Result<OrderId, BrokerError> {
            Err(BrokerError::NetworkError("down".into()))
        }
        async fn fill_price(&self, _o: &str) -> Result<Option<Decimal>, BrokerError> {
            Err(BrokerError::NetworkError("down".into()))
        }
        async fn place_oco_exit(
            &self,
            _s: &str,
            _q: i64,
            _stop: Decimal,
            _target: Decimal,
        ) -> Result<OrderId, BrokerError> {
            Err(BrokerError::NetworkError("down".into()))
        }
        async fn place_market_exit(&self, _s: &str, _q: i64) -> Result<OrderId, BrokerError> {
            Err(BrokerError::NetworkError("down".into()))
        }
        async fn positions(&self) -> Result<Vec<BrokerPosition>, BrokerError> {
            Err(BrokerError::NetworkError("down".into()))
        }
        async fn orders(&self) -> Result<Vec<BrokerOrder>, BrokerError> {
            Err(BrokerError::NetworkError("down".into()))
        }
        async fn cancel_order(&self, _o: &str) -> Result<(), BrokerError> {
            Err(BrokerError::NetworkError("down".into()))
        }
        fn name(&self) -> &str {
            "down"
        }
    }

    #[test]
    fn halts_at_limit_and_not_before() {
        let guard = MaxLossGuard::new(Some(1000.0));
        guard.observe(-999.0, day(1));
        assert!(!guard.is_halted_on(day(1)));
        guard.observe(-1000.0, day(1));
        assert!(guard.is_halted_on(day(1)));
        // Recovery above the limit does not unhalt within the day.
        guard.observe(500.0, day(1));
        assert!(guard.is_halted_on(day(1)));
    }

    #[test]
    fn halt_resets_on_the_next_day() {
        let guard = MaxLossGuard::new(Some(1000.0));
        guard.observe(-2000.0, day(1));
        assert!(guard.is_halted_on(day(1)));
        assert!(!guard.is_halted_on(day(2)));
        // And stays clear afterwards.
        assert!(!guard.is_halted_on(day(2)));
    }

    #[tokio::test]
    async fn broker_error_never_flips_the_halt_flag() {
        let guard = MaxLossGuard::new(Some(1000.0));
        guard.poll_once(&DownBroker).await;
        assert!(!guard.is_halted_on(day(1)));

        // An existing halt equally survives an unknown P&L reading.
        guard.observe(-2000.0, day(1));
        guard.poll_once(&DownBroker).await;
        assert!(guard.is_halted_on(day(1)));
    }

    #[test]
    fn disabled_guard_never_halts() {
        let guard = MaxLossGuard::new(None);
        guard.observe(-1_000_000.0, day(1));
        assert!(!guard.is_halted_on(day(1)));
    }
}
