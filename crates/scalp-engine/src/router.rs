//! Buy-signal routing.

use crate::paper::PaperTrader;
use crate::registry::SlotRegistry;
use crate::risk::MaxLossGuard;
use crate::session::{now_exchange_date, now_exchange_time, SessionWindow};
use chrono::{NaiveDate, NaiveTime};
use scalp_core::traits::SelectionProvider;
use scalp_core::types::OptionSide;
use std::collections::HashSet;
use std::sync::{Arc, Mutex};
use tracing::{info, warn};

/// One strategy buy signal handed to the router.
#[derive(Debug, Clone)]
pub struct BuySignal {
    pub symbol: String,
    pub token: u32,
    /// Start of the candle that produced the signal, unix seconds.
    pub candle_ts: i64,
    pub entry: f64,
    pub stop: f64,
    pub target: f64,
}

/// What the router did with a signal, mainly for tests and audit logs.
#[derive(Debug, PartialEq, Eq)]
pub enum RouteOutcome {
    Dispatched,
    Dropped(&'static str),
}

/// Gates every buy signal, in a fixed order, before handing it to a
/// slot. Routing is idempotent per (symbol, signal candle): a candle's
/// signal executes at most once per process lifetime. The key is marked
/// at handoff and unmarked if execution fails, so a later candle may
/// retry.
pub struct SignalRouter {
    trading_enabled: bool,
    session: SessionWindow,
    guard: Arc<MaxLossGuard>,
    selection: Arc<dyn SelectionProvider>,
    registry: Arc<SlotRegistry>,
    routed: Arc<Mutex<HashSet<(String, i64)>>>,
}

impl SignalRouter {
    pub fn new(
        trading_enabled: bool,
        session: SessionWindow,
        guard: Arc<MaxLossGuard>,
        selection: Arc<dyn SelectionProvider>,
        registry: Arc<SlotRegistry>,
    ) -> Self {
        Self {
            trading_enabled,
            session,
            guard,
            selection,
            registry,
            routed: Arc::new(Mutex::new(HashSet::new())),
        }
    }

    pub async fn route(&self, signal: BuySignal) -> RouteOutcome {
        self.route_at(signal, now_exchange_time(), now_exchange_date())
            .await
    }

    /// Gates 1-5: master switch, loss guard, session, idempotency,
    /// selection. Shared by live and paper routing.
    fn admit(
        &self,
        signal: &BuySignal,
        now: NaiveTime,
        today: NaiveDate,
    ) -> Result<OptionSide, &'static str> {
        if !self.trading_enabled {
            return Err("TRADE_OFF");
        }
        if self.guard.is_halted_on(today) {
            return Err("MAX_LOSS_HALT");
        }
        if !self.session.contains(now) {
            return Err("OUTSIDE_SESSION");
        }
        let key = (signal.symbol.clone(), signal.candle_ts);
        if self.routed.lock().unwrap().contains(&key) {
            return Err("DUPLICATE");
        }
        let Some(side) = OptionSide::from_symbol(&signal.symbol) else {
            return Err("UNKNOWN_SIDE");
        };
        if !self.selection.selected_symbols(side).contains(&signal.symbol) {
            return Err("NOT_SELECTED");
        }
        Ok(side)
    }

    pub fn route_paper(&self, signal: BuySignal, trader: &PaperTrader) -> RouteOutcome {
        self.route_paper_at(signal, trader, now_exchange_time(), now_exchange_date())
    }

    /// Paper signals pass the same gates 1-5 and terminate at the
    /// recorder instead of a slot.
    pub fn route_paper_at(
        &self,
        signal: BuySignal,
        trader: &PaperTrader,
        now: NaiveTime,
        today: NaiveDate,
    ) -> RouteOutcome {
        if let Err(reason) = self.admit(&signal, now, today) {
            return self.reject(&signal, reason);
        }
        if !trader.open(
            &signal.symbol,
            signal.candle_ts,
            signal.entry,
            signal.stop,
            signal.target,
        ) {
            return self.reject(&signal, "SYMBOL_LIVE");
        }
        self.routed
            .lock()
            .unwrap()
            .insert((signal.symbol.clone(), signal.candle_ts));
        RouteOutcome::Dispatched
    }

    /// Gate order: master switch, loss guard, session, idempotency,
    /// selection, cross-slot symbol guard, then slot availability
    /// (which folds in the side mode).
    pub async fn route_at(
        &self,
        signal: BuySignal,
        now: NaiveTime,
        today: NaiveDate,
    ) -> RouteOutcome {
        let side = match self.admit(&signal, now, today) {
            Ok(side) => side,
            Err(reason) => return self.reject(&signal, reason),
        };
        let key = (signal.symbol.clone(), signal.candle_ts);
        if self.registry.symbol_live(&signal.symbol) {
            return self.reject(&signal, "SYMBOL_LIVE");
        }

        let Some(slot) = self.registry.find_free(side) else {
            return self.reject(&signal, "NO_FREE_SLOT");
        };
        if !slot.try_reserve() {
            // Lost the race against another signal this tick.
            return self.reject(&signal, "NO_FREE_SLOT");
        }
        slot.hold_symbol(&signal.symbol);

        self.routed.lock().unwrap().insert(key.clone());

        info!(
            slot = slot.name(),
            symbol = signal.symbol,
            entry = signal.entry,
            "signal routed"
        );

        // Execution leaves the tick path here; a slow broker round-trip
        // must never stall candle processing for other instruments.
        let routed = Arc::clone(&self.routed);
        tokio::spawn(async move {
            if let Err(e) = slot
                .on_buy_signal(
                    &signal.symbol,
                    signal.token,
                    signal.candle_ts,
                    signal.entry,
                    signal.stop,
                )
                .await
            {
                warn!(symbol = signal.symbol, error = %e, "dispatch failed");
                routed.lock().unwrap().remove(&key);
            }
        });
        RouteOutcome::Dispatched
    }

    fn reject(&self, signal: &BuySignal, reason: &'static str) -> RouteOutcome {
        info!(symbol = signal.symbol, candle_ts = signal.candle_ts, reason, "signal dropped");
        RouteOutcome::Dropped(reason)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::slot::SlotParams;
    use scalp_broker::LogBroker;
    use scalp_core::traits::StaticSelection;
    use scalp_core::types::{PriceCache, SideMode};
    use std::time::Duration;

    const CE: &str = "NIFTY25SEP24500CE";
    const CE2: &str = "NIFTY25SEP24600CE";
    const PE: &str = "NIFTY25SEP24000PE";
    const PE2: &str = "NIFTY25SEP23900PE";
    const PE3: &str = "NIFTY25SEP23800PE";

    fn signal(symbol: &str, candle_ts: i64) -> BuySignal {
        BuySignal {
            symbol: symbol.to_string(),
            token: 1,
            candle_ts,
            entry: 100.0,
            stop: 95.0,
            target: 105.0,
        }
    }

    fn session_now() -> (SessionWindow, NaiveTime, NaiveDate) {
        let window = SessionWindow::new(
            NaiveTime::from_hms_opt(9, 20, 0).unwrap(),
            NaiveTime::from_hms_opt(15, 0, 0).unwrap(),
        );
        (
            window,
            NaiveTime::from_hms_opt(10, 0, 0).unwrap(),
            NaiveDate::from_ymd_opt(2025, 9, 1).unwrap(),
        )
    }

    fn router(trading_enabled: bool, limit: Option<f64>) -> (SignalRouter, tempfile::TempDir) {
        let dir = tempfile::tempdir().unwrap();
        let registry = SlotRegistry::build(
            2,
            SideMode::Both,
            dir.path(),
            Arc::new(LogBroker::new()),
            Arc::new(PriceCache::new()),
            SlotParams {
                qty: 75,
                reward_multiple: 1.0,
                fill_poll_attempts: 1,
                fill_poll_interval: Duration::from_millis(1),
            },
        )
        .unwrap();
        let (window, _, _) = session_now();
        let router = SignalRouter::new(
            trading_enabled,
            window,
            Arc::new(MaxLossGuard::new(limit)),
            Arc::new(StaticSelection::new(
                vec![CE.to_string(), CE2.to_string()],
                vec![PE.to_string(), PE2.to_string(), PE3.to_string()],
            )),
            Arc::new(registry),
        );
        (router, dir)
    }

    #[tokio::test]
    async fn master_switch_blocks_everything() {
        let (router, _dir) = router(false, None);
        let (_, now, today) = session_now();
        assert_eq!(
            router.route_at(signal(CE, 600), now, today).await,
            RouteOutcome::Dropped("TRADE_OFF")
        );
    }

    #[tokio::test]
    async fn outside_session_is_dropped() {
        let (router, _dir) = router(true, None);
        let (_, _, today) = session_now();
        let early = NaiveTime::from_hms_opt(9, 0, 0).unwrap();
        assert_eq!(
            router.route_at(signal(CE, 600), early, today).await,
            RouteOutcome::Dropped("OUTSIDE_SESSION")
        );
    }

    #[tokio::test]
    async fn halted_guard_is_dropped() {
        let (router, _dir) = router(true, Some(1000.0));
        let (_, now, today) = session_now();
        router.guard.observe(-5000.0, today);
        assert_eq!(
            router.route_at(signal(CE, 600), now, today).await,
            RouteOutcome::Dropped("MAX_LOSS_HALT")
        );
    }

    #[tokio::test]
    async fn unselected_symbol_is_dropped() {
        let (router, _dir) = router(true, None);
        let (_, now, today) = session_now();
        assert_eq!(
            router
                .route_at(signal("BANKNIFTY25SEP51000CE", 600), now, today)
                .await,
            RouteOutcome::Dropped("NOT_SELECTED")
        );
    }

    #[tokio::test]
    async fn same_candle_routes_once() {
        let (router, _dir) = router(true, None);
        let (_, now, today) = session_now();
        assert_eq!(
            router.route_at(signal(CE, 600), now, today).await,
            RouteOutcome::Dispatched
        );
        assert_eq!(
            router.route_at(signal(CE, 600), now, today).await,
            RouteOutcome::Dropped("DUPLICATE")
        );
    }

    #[tokio::test]
    async fn live_symbol_blocks_a_second_slot() {
        let (router, _dir) = router(true, None);
        let (_, now, today) = session_now();
        assert_eq!(
            router.route_at(signal(CE, 600), now, today).await,
            RouteOutcome::Dispatched
        );
        // The symbol is held from the moment of reservation, so a later
        // candle cannot open the same symbol in the second call slot.
        assert_eq!(
            router.route_at(signal(CE, 660), now, today).await,
            RouteOutcome::Dropped("SYMBOL_LIVE")
        );
    }

    fn paper_trader() -> (Arc<PaperTrader>, tempfile::TempDir) {
        let dir = tempfile::tempdir().unwrap();
        let trader = Arc::new(PaperTrader::new(
            Arc::new(PriceCache::new()),
            dir.path().join("ledger.csv"),
            75,
        ));
        (trader, dir)
    }

    #[tokio::test]
    async fn paper_routing_respects_the_master_switch() {
        let (router, _dir) = router(false, None);
        let (trader, _ledger) = paper_trader();
        let (_, now, today) = session_now();
        assert_eq!(
            router.route_paper_at(signal(CE, 600), &trader, now, today),
            RouteOutcome::Dropped("TRADE_OFF")
        );
        assert_eq!(trader.open_count(), 0);
    }

    #[tokio::test]
    async fn paper_routing_applies_idempotency_and_selection() {
        let (router, _dir) = router(true, None);
        let (trader, _ledger) = paper_trader();
        let (_, now, today) = session_now();
        assert_eq!(
            router.route_paper_at(signal(CE, 600), &trader, now, today),
            RouteOutcome::Dispatched
        );
        assert_eq!(
            router.route_paper_at(signal(CE, 600), &trader, now, today),
            RouteOutcome::Dropped("DUPLICATE")
        );
        // The recorder refuses a second open for the same symbol.
        assert_eq!(
            router.route_paper_at(signal(CE, 660), &trader, now, today),
            RouteOutcome::Dropped("SYMBOL_LIVE")
        );
        assert_eq!(
            router.route_paper_at(signal("BANKNIFTY25SEP51000CE", 600), &trader, now, today),
            RouteOutcome::Dropped("NOT_SELECTED")
        );
        assert_eq!(trader.open_count(), 1);
    }

    #[tokio::test]
    async fn put_signals_use_put_slots() {
        let (router, _dir) = router(true, None);
        let (_, now, today) = session_now();
        assert_eq!(
            router.route_at(signal(PE, 600), now, today).await,
            RouteOutcome::Dispatched
        );
        assert!(router.registry.find_free(OptionSide::Put).is_some());
        assert_eq!(
            router.route_at(signal(PE2, 600), now, today).await,
            RouteOutcome::Dispatched
        );
        // Both put slots are reserved; call slots are untouched.
        assert_eq!(
            router.route_at(signal(PE3, 600), now, today).await,
            RouteOutcome::Dropped("NO_FREE_SLOT")
        );
        assert!(router.registry.find_free(OptionSide::Call).is_some());
    }
}
