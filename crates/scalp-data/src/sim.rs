//! Scripted tick feed for paper sessions and tests.

use scalp_core::error::DataError;
use scalp_core::traits::MarketFeed;
use scalp_core::types::Tick;
use tokio::sync::mpsc;

/// Replays a fixed tick script as fast as the receiver drains it.
pub struct SimFeed {
    ticks: Vec<Tick>,
}

impl SimFeed {
    pub fn new(ticks: Vec<Tick>) -> Self {
        Self { ticks }
    }
}

#[async_trait::async_trait]
impl MarketFeed for SimFeed {
    async fn subscribe(&self, tokens: &[u32]) -> Result<mpsc::Receiver<Tick>, DataError> {
        let (tx, rx) = mpsc::channel(1024);
        let script: Vec<Tick> = self
            .ticks
            .iter()
            .filter(|t| tokens.contains(&t.instrument_token))
            .copied()
            .collect();

        tokio::spawn(async move {
            for tick in script {
                if tx.send(tick).await.is_err() {
                    return;
                }
            }
        });

        Ok(rx)
    }

    async fn reconnect(&self) -> Result<(), DataError> {
        Ok(())
    }

    fn name(&self) -> &str {
        "sim"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn replays_only_subscribed_tokens() {
        let feed = SimFeed::new(vec![
            Tick::new(1, 100.0, 0),
            Tick::new(2, 50.0, 0),
            Tick::new(1, 101.0, 1),
        ]);
        let mut rx = feed.subscribe(&[1]).await.unwrap();

        assert_eq!(rx.recv().await.unwrap().last_price, 100.0);
        assert_eq!(rx.recv().await.unwrap().last_price, 101.0);
        assert!(rx.recv().await.is_none());
    }
}
