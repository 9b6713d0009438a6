//! Trade slot lifecycle.

use chrono::Utc;
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use scalp_core::error::{EngineError, EngineResult, StateError};
use scalp_core::traits::Broker;
use scalp_core::types::{
    BrokerPosition, ExitReason, OptionSide, OrderSide, OrderStatus, PriceCache, Trade, TradeState,
};
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

/// Per-slot execution knobs.
#[derive(Debug, Clone)]
pub struct SlotParams {
    pub qty: i64,
    pub reward_multiple: f64,
    pub fill_poll_attempts: u32,
    pub fill_poll_interval: Duration,
}

/// One fixed execution slot holding at most one open trade.
///
/// Admission flags are atomics so the router can gate synchronously on
/// the tick path; the trade itself lives behind an async mutex. State
/// transitions are persisted before the next broker call (write then
/// advance), so a crash can only lose forward progress, never invent it.
pub struct TradeSlot {
    name: String,
    side: OptionSide,
    state_file: PathBuf,
    params: SlotParams,
    broker: Arc<dyn Broker>,
    prices: Arc<PriceCache>,
    in_trade: AtomicBool,
    selection_locked: AtomicBool,
    /// Symbol being held or executed, readable without the trade lock.
    held_symbol: std::sync::Mutex<Option<String>>,
    trade: Mutex<Option<Trade>>,
}

impl TradeSlot {
    pub fn new(
        name: impl Into<String>,
        side: OptionSide,
        state_file: PathBuf,
        broker: Arc<dyn Broker>,
        prices: Arc<PriceCache>,
        params: SlotParams,
    ) -> Result<Arc<Self>, EngineError> {
        let mut slot = Self {
            name: name.into(),
            side,
            state_file,
            params,
            broker,
            prices,
            in_trade: AtomicBool::new(false),
            selection_locked: AtomicBool::new(false),
            held_symbol: std::sync::Mutex::new(None),
            trade: Mutex::new(None),
        };
        let restored = slot.load_state()?;
        if let Some(trade) = restored {
            let open = trade.is_open();
            slot.in_trade.store(open, Ordering::Release);
            slot.selection_locked.store(open, Ordering::Release);
            info!(
                slot = slot.name,
                symbol = trade.symbol,
                state = ?trade.state,
                open,
                "slot state restored"
            );
            *slot.held_symbol.get_mut().unwrap() = open.then(|| trade.symbol.clone());
            *slot.trade.get_mut() = open.then_some(trade);
        }
        Ok(Arc::new(slot))
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn side(&self) -> OptionSide {
        self.side
    }

    pub fn is_free(&self) -> bool {
        !self.in_trade.load(Ordering::Acquire) && !self.selection_locked.load(Ordering::Acquire)
    }

    /// Claim the slot for an incoming signal. Only one caller wins.
    pub fn try_reserve(&self) -> bool {
        if self.in_trade.load(Ordering::Acquire) {
            return false;
        }
        self.selection_locked
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_ok()
    }

    /// Undo a reservation that never became a trade.
    pub fn release_reservation(&self) {
        if !self.in_trade.load(Ordering::Acquire) {
            self.selection_locked.store(false, Ordering::Release);
            self.held_symbol.lock().unwrap().take();
        }
    }

    /// Symbol this slot is holding or mid-execution on, if any.
    pub fn held_symbol(&self) -> Option<String> {
        self.held_symbol.lock().unwrap().clone()
    }

    /// Record the symbol a fresh reservation is for, before the
    /// execution worker runs.
    pub fn hold_symbol(&self, symbol: &str) {
        *self.held_symbol.lock().unwrap() = Some(symbol.to_string());
    }

    /// Snapshot of the open trade, if any.
    pub async fn open_trade(&self) -> Option<Trade> {
        self.trade.lock().await.clone()
    }

    // ------------------------------------------------------------------
    // Persistence
    // ------------------------------------------------------------------

    fn path_str(&self) -> String {
        self.state_file.display().to_string()
    }

    fn load_state(&self) -> Result<Option<Trade>, StateError> {
        if !self.state_file.exists() {
            return Ok(None);
        }
        let raw = std::fs::read_to_string(&self.state_file).map_err(|e| StateError::ReadFailed {
            path: self.path_str(),
            source: e,
        })?;
        let raw = raw.trim();
        if raw.is_empty() || raw == "{}" {
            return Ok(None);
        }
        serde_json::from_str(raw)
            .map(Some)
            .map_err(|e| StateError::Corrupt {
                path: self.path_str(),
                reason: e.to_string(),
            })
    }

    fn persist(&self, trade: Option<&Trade>) -> Result<(), StateError> {
        if let Some(parent) = self.state_file.parent() {
            std::fs::create_dir_all(parent).map_err(|e| StateError::WriteFailed {
                path: self.path_str(),
                source: e,
            })?;
        }
        let body = match trade {
            Some(t) => serde_json::to_string_pretty(t).map_err(|e| StateError::Corrupt {
                path: self.path_str(),
                reason: e.to_string(),
            })?,
            None => "{}".to_string(),
        };
        std::fs::write(&self.state_file, body).map_err(|e| StateError::WriteFailed {
            path: self.path_str(),
            source: e,
        })
    }

    // ------------------------------------------------------------------
    // Entry
    // ------------------------------------------------------------------

    /// Execute a routed buy signal. The caller must hold a reservation
    /// from [`try_reserve`](Self::try_reserve); on error the reservation
    /// is released here.
    pub async fn on_buy_signal(
        &self,
        symbol: &str,
        token: u32,
        candle_ts: i64,
        entry: f64,
        stop: f64,
    ) -> EngineResult<()> {
        // Defense in depth: the reservation should make this impossible.
        if self.in_trade.load(Ordering::Acquire) {
            warn!(slot = self.name, symbol, "buy signal for an occupied slot dropped");
            return Err(EngineError::Internal("slot already holds a trade".to_string()));
        }
        *self.held_symbol.lock().unwrap() = Some(symbol.to_string());

        let qty = self.params.qty;
        info!(slot = self.name, symbol, entry, stop, qty, "executing buy signal");

        let buy_id = match self.broker.place_market_buy(symbol, qty).await {
            Ok(id) => id,
            Err(e) => {
                warn!(slot = self.name, symbol, error = %e, "buy failed");
                self.release_reservation();
                return Err(e.into());
            }
        };

        let (avg, degraded) = match self.poll_fill_price(&buy_id).await {
            Some(p) => (p, false),
            None => (entry, true),
        };
        if degraded {
            warn!(
                slot = self.name,
                order_id = buy_id,
                entry,
                "fill price unavailable, falling back to signal entry"
            );
        }

        // Target is always anchored to what we actually paid.
        let take_profit = avg + (avg - stop) * self.params.reward_multiple;

        let (stop_px, tp_px) = match (to_price(stop), to_price(take_profit)) {
            (Ok(s), Ok(t)) => (s, t),
            _ => {
                error!(slot = self.name, symbol, stop, take_profit, "unusable exit prices, flattening");
                if let Err(e) = self.broker.place_market_exit(symbol, qty).await {
                    error!(slot = self.name, symbol, error = %e, "flatten failed");
                }
                self.release_reservation();
                return Err(EngineError::Internal("non-finite exit prices".to_string()));
            }
        };

        let trade = Trade {
            trade_id: Uuid::new_v4(),
            symbol: symbol.to_string(),
            instrument_token: token,
            qty,
            buy_order_id: buy_id,
            buy_price: avg,
            protective_order_id: None,
            stop_loss: stop,
            take_profit,
            entry_time: Utc::now(),
            state: TradeState::BuyPlaced,
            signal_candle_ts: candle_ts,
            exit_reason: None,
            stop_order_id: None,
        };

        if let Err(e) = self.persist(Some(&trade)) {
            // A position we cannot record is a position we will not hold.
            error!(slot = self.name, symbol, error = %e, "state write failed, flattening");
            match self.broker.place_market_exit(symbol, qty).await {
                Ok(_) => self.release_reservation(),
                Err(exit_err) => {
                    // Flat failed too. Keep the slot occupied and the
                    // trade in memory so reconciliation can still see
                    // the live position.
                    error!(
                        slot = self.name,
                        symbol,
                        error = %exit_err,
                        "flatten after state failure also failed"
                    );
                    let mut guard = self.trade.lock().await;
                    self.in_trade.store(true, Ordering::Release);
                    *guard = Some(trade);
                }
            }
            return Err(e.into());
        }

        let mut guard = self.trade.lock().await;
        self.in_trade.store(true, Ordering::Release);
        *guard = Some(trade);

        // Price may have run through the stop or target while the buy
        // was filling; a GTT placed now could fire instantly or never.
        if let Some(ltp) = self.prices.get(symbol) {
            if ltp <= stop || ltp >= take_profit {
                warn!(slot = self.name, symbol, ltp, "price crossed exit band before protection");
                let exit_id = self.broker.place_market_exit(symbol, qty).await.ok();
                if let Some(t) = guard.as_mut() {
                    t.stop_order_id = exit_id;
                }
                self.close_locked(&mut guard, ExitReason::PreProtectCross);
                return Ok(());
            }
        }

        match self.broker.place_oco_exit(symbol, qty, stop_px, tp_px).await {
            Ok(gtt_id) => {
                if let Some(t) = guard.as_mut() {
                    let mut next = t.clone();
                    next.protective_order_id = Some(gtt_id.clone());
                    next.state = TradeState::Protected;
                    match self.persist(Some(&next)) {
                        Ok(()) => *t = next,
                        Err(e) => {
                            // Broker-side protection is live, but memory
                            // must not advance past the durable record;
                            // the trade stays BuyPlaced until a later
                            // write succeeds.
                            error!(slot = self.name, error = %e, "protected state write failed");
                        }
                    }
                }
                info!(slot = self.name, symbol, gtt_id, take_profit, "trade protected");
                Ok(())
            }
            Err(e) => {
                warn!(slot = self.name, symbol, error = %e, "protection failed, flattening");
                match self.broker.place_market_exit(symbol, qty).await {
                    Ok(exit_id) => {
                        if let Some(t) = guard.as_mut() {
                            t.stop_order_id = Some(exit_id);
                        }
                        self.close_locked(&mut guard, ExitReason::ProtectionFailed);
                        Ok(())
                    }
                    Err(exit_err) => {
                        error!(
                            slot = self.name,
                            symbol,
                            error = %exit_err,
                            "UNPROTECTED POSITION: emergency exit failed"
                        );
                        let snapshot = guard.clone();
                        drop(guard);
                        if let Some(t) = snapshot {
                            let _ = self.persist(Some(&t));
                        }
                        Err(exit_err.into())
                    }
                }
            }
        }
    }

    async fn poll_fill_price(&self, order_id: &str) -> Option<f64> {
        for _ in 0..self.params.fill_poll_attempts {
            tokio::time::sleep(self.params.fill_poll_interval).await;
            match self.broker.fill_price(order_id).await {
                Ok(Some(p)) if p > Decimal::ZERO => return p.to_f64(),
                Ok(_) => {}
                Err(e) if e.is_transient() => {
                    debug!(order_id, error = %e, "fill price poll retry")
                }
                Err(e) => {
                    warn!(order_id, error = %e, "fill price poll aborted");
                    return None;
                }
            }
        }
        None
    }

    // ------------------------------------------------------------------
    // Exit / reconciliation
    // ------------------------------------------------------------------

    /// Close the held trade. Persists the closed record, then clears the
    /// slot. Idempotent when the slot is already empty.
    fn close_locked(&self, guard: &mut Option<Trade>, reason: ExitReason) {
        let Some(trade) = guard.as_mut() else { return };
        trade.state = TradeState::Closed;
        trade.exit_reason = Some(reason);
        info!(
            slot = self.name,
            symbol = trade.symbol,
            reason = %reason,
            "trade closed"
        );
        if let Err(e) = self.persist(Some(trade)) {
            error!(slot = self.name, error = %e, "closed state write failed");
        }
        *guard = None;
        self.in_trade.store(false, Ordering::Release);
        self.selection_locked.store(false, Ordering::Release);
        self.held_symbol.lock().unwrap().take();
        if let Err(e) = self.persist(None) {
            error!(slot = self.name, error = %e, "state clear failed");
        }
    }

    /// Compare the held trade against broker positions; close it when
    /// the broker says we are flat (the protective OCO fired). Returns
    /// true when a close happened.
    pub async fn sync_against(&self, positions: &[BrokerPosition]) -> bool {
        let mut guard = self.trade.lock().await;
        let Some(trade) = guard.as_ref() else {
            return false;
        };

        let still_open = positions
            .iter()
            .any(|p| p.symbol == trade.symbol && !p.is_flat());
        if still_open {
            return false;
        }

        // An empty cache means we have seen no market yet; do not infer
        // exits off nothing.
        if !self.prices.has_any() {
            return false;
        }

        let reason = match self.prices.get(&trade.symbol) {
            Some(ltp) if ltp <= trade.stop_loss => ExitReason::StopLoss,
            Some(_) => ExitReason::TakeProfit,
            None => ExitReason::BrokerSync,
        };
        self.close_locked(&mut guard, reason);
        true
    }

    /// Periodic broker check for this slot.
    pub async fn reconcile(&self) {
        if !self.in_trade.load(Ordering::Acquire) || !self.prices.has_any() {
            return;
        }
        match self.broker.positions().await {
            Ok(positions) => {
                self.sync_against(&positions).await;
            }
            Err(e) if e.is_transient() => {
                debug!(slot = self.name, error = %e, "reconcile skipped")
            }
            Err(e) => warn!(slot = self.name, error = %e, "reconcile failed"),
        }
    }

    /// Startup pass: square the restored trade with the broker before
    /// any live tick is processed.
    pub async fn recover(&self) {
        let mut guard = self.trade.lock().await;
        let Some(trade) = guard.as_ref().cloned() else {
            return;
        };

        let positions = match self.broker.positions().await {
            Ok(p) => p,
            Err(e) => {
                warn!(slot = self.name, error = %e, "recovery deferred, broker unavailable");
                return;
            }
        };

        if let Some(pos) = positions
            .iter()
            .find(|p| p.symbol == trade.symbol && !p.is_flat())
        {
            // Broker is the source of truth for size and cost.
            if let Some(t) = guard.as_mut() {
                t.qty = pos.qty;
                if let Some(avg) = pos.avg_price.to_f64() {
                    t.buy_price = avg;
                }
                if let Err(e) = self.persist(Some(t)) {
                    error!(slot = self.name, error = %e, "recovered state write failed");
                }
            }
            info!(slot = self.name, symbol = trade.symbol, "recovered live position");
            return;
        }

        // Flat at the broker: classify the exit from today's order book.
        let reason = match self.broker.orders().await {
            Ok(orders) => classify_exit(&trade, &orders),
            Err(e) => {
                warn!(slot = self.name, error = %e, "order book unavailable during recovery");
                ExitReason::BrokerSync
            }
        };
        self.close_locked(&mut guard, reason);
    }
}

/// Convert a trade price to a 2-decimal exchange price.
fn to_price(x: f64) -> EngineResult<Decimal> {
    Decimal::from_f64_retain(x)
        .map(|d| d.round_dp(2))
        .ok_or_else(|| EngineError::Internal(format!("non-finite price {x}")))
}

/// Explain how a restored trade exited by correlating its recorded
/// order ids against the broker order book. A completed sell that
/// matches neither recorded id is some manual or broker-side close,
/// never re-labelled from its price.
fn classify_exit(trade: &Trade, orders: &[scalp_core::types::BrokerOrder]) -> ExitReason {
    let completed = |id: Option<&str>| {
        id.and_then(|id| orders.iter().find(|o| o.order_id == id))
            .map(|o| o.status == OrderStatus::Complete)
            .unwrap_or(false)
    };
    if completed(trade.stop_order_id.as_deref()) {
        return ExitReason::StopLoss;
    }
    if completed(trade.protective_order_id.as_deref()) {
        return trade.exit_reason.unwrap_or(ExitReason::TakeProfit);
    }
    let sold = orders.iter().any(|o| {
        o.symbol == trade.symbol && o.side == OrderSide::Sell && o.status == OrderStatus::Complete
    });
    if sold {
        ExitReason::BrokerExit
    } else {
        ExitReason::BrokerSync
    }
}
