//! Paper trading recorder.

use chrono::Utc;
use scalp_core::types::{ExitReason, PriceCache};
use serde::Serialize;
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::watch;
use tracing::{error, info};

#[derive(Debug, Clone)]
struct OpenPaperTrade {
    qty: i64,
    entry: f64,
    stop: f64,
    target: f64,
    entry_ts: i64,
    signal_candle_ts: i64,
}

#[derive(Debug, Serialize)]
struct LedgerRow<'a> {
    symbol: &'a str,
    qty: i64,
    entry_price: f64,
    exit_price: f64,
    entry_ts: i64,
    exit_ts: i64,
    signal_candle_ts: i64,
    reason: &'a str,
    pnl: f64,
}

/// Runs strategy signals against the live price cache without touching
/// a broker, and appends every closed trade to a CSV ledger.
pub struct PaperTrader {
    prices: Arc<PriceCache>,
    ledger_path: PathBuf,
    qty: i64,
    open: Mutex<HashMap<String, OpenPaperTrade>>,
}

impl PaperTrader {
    pub fn new(prices: Arc<PriceCache>, ledger_path: PathBuf, qty: i64) -> Self {
        Self {
            prices,
            ledger_path,
            qty,
            open: Mutex::new(HashMap::new()),
        }
    }

    /// Open a simulated long. One open trade per symbol.
    pub fn open(&self, symbol: &str, candle_ts: i64, entry: f64, stop: f64, target: f64) -> bool {
        let mut open = self.open.lock().unwrap();
        if open.contains_key(symbol) {
            return false;
        }
        info!(symbol, entry, stop, target, "paper trade opened");
        open.insert(
            symbol.to_string(),
            OpenPaperTrade {
                qty: self.qty,
                entry,
                stop,
                target,
                entry_ts: Utc::now().timestamp(),
                signal_candle_ts: candle_ts,
            },
        );
        true
    }

    /// Close a simulated trade at the given price. No-op if nothing is
    /// open for the symbol.
    pub fn close(&self, symbol: &str, reason: ExitReason, exit_price: f64) {
        let trade = {
            let mut open = self.open.lock().unwrap();
            match open.remove(symbol) {
                Some(t) => t,
                None => return,
            }
        };
        let pnl = (exit_price - trade.entry) * trade.qty as f64;
        info!(symbol, exit_price, reason = %reason, pnl, "paper trade closed");
        if let Err(e) = self.append_row(symbol, &trade, reason, exit_price) {
            error!(error = %e, "paper ledger write failed");
        }
    }

    /// Check every open trade against the cached LTP. The stop is
    /// evaluated before the target.
    pub fn check_exits(&self) {
        let snapshot: Vec<(String, OpenPaperTrade)> = {
            let open = self.open.lock().unwrap();
            open.iter().map(|(s, t)| (s.clone(), t.clone())).collect()
        };
        for (symbol, trade) in snapshot {
            let Some(ltp) = self.prices.get(&symbol) else {
                continue;
            };
            if ltp <= trade.stop {
                self.close(&symbol, ExitReason::StopLoss, trade.stop);
            } else if ltp >= trade.target {
                self.close(&symbol, ExitReason::TakeProfit, trade.target);
            }
        }
    }

    pub fn has_open(&self, symbol: &str) -> bool {
        self.open.lock().unwrap().contains_key(symbol)
    }

    pub fn open_count(&self) -> usize {
        self.open.lock().unwrap().len()
    }

    pub async fn run(self: Arc<Self>, interval: Duration, mut shutdown: watch::Receiver<bool>) {
        let mut ticker = tokio::time::interval(interval);
        loop {
            tokio::select! {
                _ = ticker.tick() => self.check_exits(),
                _ = shutdown.changed() => return,
            }
        }
    }

    fn append_row(
        &self,
        symbol: &str,
        trade: &OpenPaperTrade,
        reason: ExitReason,
        exit_price: f64,
    ) -> Result<(), std::io::Error> {
        if let Some(parent) = self.ledger_path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let new_file = !self.ledger_path.exists();
        let file = std::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.ledger_path)?;
        let mut writer = csv::WriterBuilder::new()
            .has_headers(new_file)
            .from_writer(file);
        writer.serialize(LedgerRow {
            symbol,
            qty: trade.qty,
            entry_price: trade.entry,
            exit_price,
            entry_ts: trade.entry_ts,
            exit_ts: Utc::now().timestamp(),
            signal_candle_ts: trade.signal_candle_ts,
            reason: reason.as_str(),
            pnl: (exit_price - trade.entry) * trade.qty as f64,
        })?;
        writer.flush()?;
        Ok(())
    }
}
