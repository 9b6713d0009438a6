//! Feed staleness watchdog.

use chrono::Utc;
use scalp_core::traits::MarketFeed;
use scalp_core::types::PriceCache;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::time::Instant;
use tracing::warn;

/// Forces a feed reconnect when no tick has arrived for too long.
///
/// Only acts once at least one tick has ever been seen, so a slow
/// pre-open start never triggers it. Reconnects are rate limited by a
/// cooldown.
pub struct FeedWatchdog {
    prices: Arc<PriceCache>,
    feed: Arc<dyn MarketFeed>,
    stale_after_secs: i64,
    cooldown: Duration,
    last_reconnect: std::sync::Mutex<Option<Instant>>,
}

impl FeedWatchdog {
    pub fn new(
        prices: Arc<PriceCache>,
        feed: Arc<dyn MarketFeed>,
        stale_after_secs: i64,
        cooldown: Duration,
    ) -> Self {
        Self {
            prices,
            feed,
            stale_after_secs,
            cooldown,
            last_reconnect: std::sync::Mutex::new(None),
        }
    }

    /// Whether the feed looks dead at `now_ts` (unix seconds).
    fn is_stale(&self, now_ts: i64) -> bool {
        match self.prices.last_update_ts() {
            Some(last) => now_ts - last > self.stale_after_secs,
            None => false,
        }
    }

    /// One staleness check. Returns true when a reconnect was issued.
    async fn check(&self, now_ts: i64) -> bool {
        if !self.is_stale(now_ts) {
            return false;
        }
        {
            let last = self.last_reconnect.lock().unwrap();
            if let Some(at) = *last {
                if at.elapsed() < self.cooldown {
                    return false;
                }
            }
        }
        warn!(
            stale_after_secs = self.stale_after_secs,
            feed = self.feed.name(),
            "feed stale, reconnecting"
        );
        *self.last_reconnect.lock().unwrap() = Some(Instant::now());
        if let Err(e) = self.feed.reconnect().await {
            warn!(error = %e, "reconnect failed");
        }
        true
    }

    pub async fn run(self, mut shutdown: watch::Receiver<bool>) {
        let check_every = Duration::from_secs((self.stale_after_secs as u64).clamp(1, 30) / 2 + 1);
        let mut ticker = tokio::time::interval(check_every);
        loop {
            tokio::select! {
                _ = ticker.tick() => {}
                _ = shutdown.changed() => return,
            }
            self.check(Utc::now().timestamp()).await;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use scalp_data::SimFeed;

    fn watchdog(prices: Arc<PriceCache>) -> FeedWatchdog {
        FeedWatchdog::new(
            prices,
            Arc::new(SimFeed::new(Vec::new())),
            30,
            Duration::from_secs(120),
        )
    }

    #[test]
    fn never_stale_before_first_tick() {
        let prices = Arc::new(PriceCache::new());
        let dog = watchdog(prices);
        assert!(!dog.is_stale(1_000_000));
    }

    #[tokio::test]
    async fn reconnects_are_rate_limited_by_the_cooldown() {
        let prices = Arc::new(PriceCache::new());
        prices.update("X", 100.0, 1000);
        let dog = watchdog(prices);
        // Feed is long stale: the first check reconnects, the second is
        // still inside the 120s cooldown.
        assert!(dog.check(2000).await);
        assert!(!dog.check(2000).await);
    }

    #[tokio::test]
    async fn fresh_ticks_suppress_reconnects_entirely() {
        let prices = Arc::new(PriceCache::new());
        prices.update("X", 100.0, 1000);
        let dog = watchdog(prices);
        assert!(!dog.check(1010).await);
    }

    #[test]
    fn stale_only_past_the_threshold() {
        let prices = Arc::new(PriceCache::new());
        prices.update("X", 100.0, 1000);
        let dog = watchdog(prices.clone());
        assert!(!dog.is_stale(1030));
        assert!(dog.is_stale(1031));
        prices.update("X", 100.5, 1031);
        assert!(!dog.is_stale(1040));
    }
}
