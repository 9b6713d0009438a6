//! Periodic broker-truth sweep.

use crate::registry::SlotRegistry;
use scalp_core::traits::Broker;
use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tracing::{debug, warn};

/// Squares every slot against the broker on a fixed interval.
///
/// The broker is the source of truth: a locally-open trade the broker
/// no longer holds gets closed with an inferred reason, and a broker
/// position no slot knows about is reported but never touched.
pub struct BrokerSweep {
    registry: Arc<SlotRegistry>,
    broker: Arc<dyn Broker>,
    interval: Duration,
}

impl BrokerSweep {
    pub fn new(registry: Arc<SlotRegistry>, broker: Arc<dyn Broker>, interval: Duration) -> Self {
        Self {
            registry,
            broker,
            interval,
        }
    }

    pub async fn run(self, mut shutdown: watch::Receiver<bool>) {
        let mut ticker = tokio::time::interval(self.interval);
        loop {
            tokio::select! {
                _ = ticker.tick() => {}
                _ = shutdown.changed() => return,
            }
            self.sweep_once().await;
        }
    }

    pub async fn sweep_once(&self) {
        let positions = match self.broker.positions().await {
            Ok(p) => p,
            Err(e) if e.is_transient() => {
                debug!(error = %e, "sweep skipped");
                return;
            }
            Err(e) => {
                warn!(error = %e, "sweep position fetch failed");
                return;
            }
        };

        let mut known: HashSet<String> = HashSet::new();
        for slot in self.registry.slots() {
            if let Some(trade) = slot.open_trade().await {
                known.insert(trade.symbol.clone());
            }
            slot.sync_against(&positions).await;
        }

        // Broker positions nothing local accounts for. Hands off: they
        // may be manual trades in the same account.
        for pos in positions.iter().filter(|p| !p.is_flat()) {
            if !known.contains(&pos.symbol) {
                warn!(symbol = pos.symbol, qty = pos.qty, "unmanaged broker position");
            }
        }
    }
}
