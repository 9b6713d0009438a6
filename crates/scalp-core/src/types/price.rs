//! Shared last-traded-price cache.

use std::collections::HashMap;
use std::sync::Mutex;

#[derive(Debug, Clone, Copy)]
struct PricePoint {
    ltp: f64,
    ts: i64,
}

/// Single authoritative in-memory LTP store.
///
/// Written only by the tick engine; read by the strategy, router, trade
/// slots, and reconciliation. Explicitly constructed and injected, never a
/// global.
#[derive(Debug, Default)]
pub struct PriceCache {
    inner: Mutex<HashMap<String, PricePoint>>,
}

impl PriceCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn update(&self, symbol: &str, ltp: f64, ts: i64) {
        let mut map = self.inner.lock().expect("price cache poisoned");
        map.insert(symbol.to_string(), PricePoint { ltp, ts });
    }

    pub fn get(&self, symbol: &str) -> Option<f64> {
        let map = self.inner.lock().expect("price cache poisoned");
        map.get(symbol).map(|p| p.ltp)
    }

    /// Timestamp of the most recent update for any symbol, unix seconds.
    pub fn last_update_ts(&self) -> Option<i64> {
        let map = self.inner.lock().expect("price cache poisoned");
        map.values().map(|p| p.ts).max()
    }

    /// True once at least one live price has been observed.
    ///
    /// Reconciliation must not clear state off an empty cache.
    pub fn has_any(&self) -> bool {
        let map = self.inner.lock().expect("price cache poisoned");
        !map.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_cache_reports_nothing() {
        let cache = PriceCache::new();
        assert!(!cache.has_any());
        assert_eq!(cache.get("X"), None);
        assert_eq!(cache.last_update_ts(), None);
    }

    #[test]
    fn last_write_wins() {
        let cache = PriceCache::new();
        cache.update("X", 101.0, 10);
        cache.update("X", 102.5, 11);
        cache.update("Y", 55.0, 9);
        assert_eq!(cache.get("X"), Some(102.5));
        assert_eq!(cache.last_update_ts(), Some(11));
        assert!(cache.has_any());
    }
}
