//! Websocket tick feed.

use futures::{SinkExt, StreamExt};
use scalp_core::error::DataError;
use scalp_core::traits::MarketFeed;
use scalp_core::types::Tick;
use serde::Deserialize;
use serde_json::json;
use std::time::Duration;
use tokio::sync::{mpsc, Mutex};
use tokio::task::JoinHandle;
use tokio_tungstenite::{connect_async, tungstenite::Message};
use tracing::{error, info, warn};

/// One tick on the wire. The gateway pushes JSON arrays of these in
/// full-quote mode; only the LTP fields are consumed here.
#[derive(Debug, Deserialize)]
struct WireTick {
    instrument_token: u32,
    last_price: f64,
    #[serde(alias = "exchange_timestamp")]
    timestamp: i64,
}

struct FeedState {
    tokens: Vec<u32>,
    tx: Option<mpsc::Sender<Tick>>,
    task: Option<JoinHandle<()>>,
}

/// Tick feed over a websocket gateway.
///
/// The connection task retries forever with a fixed backoff; a dropped
/// socket never kills the engine. [`reconnect`](MarketFeed::reconnect)
/// aborts the current task and dials again into the same channel, which
/// is what the staleness watchdog calls.
pub struct WsTickFeed {
    url: String,
    state: Mutex<FeedState>,
}

const CHANNEL_CAPACITY: usize = 4096;
const RETRY_DELAY: Duration = Duration::from_secs(5);

impl WsTickFeed {
    pub fn new(url: String) -> Self {
        Self {
            url,
            state: Mutex::new(FeedState {
                tokens: Vec::new(),
                tx: None,
                task: None,
            }),
        }
    }

    fn spawn_connection(url: String, tokens: Vec<u32>, tx: mpsc::Sender<Tick>) -> JoinHandle<()> {
        tokio::spawn(async move {
            loop {
                match Self::run_connection(&url, &tokens, &tx).await {
                    Ok(()) => {
                        info!("tick channel closed, connection task exiting");
                        return;
                    }
                    Err(e) => {
                        error!(error = %e, "tick stream dropped, retrying");
                        tokio::time::sleep(RETRY_DELAY).await;
                    }
                }
            }
        })
    }

    /// One connection lifetime. Ok(()) means the consumer went away.
    async fn run_connection(
        url: &str,
        tokens: &[u32],
        tx: &mpsc::Sender<Tick>,
    ) -> Result<(), DataError> {
        let (mut ws, _) = connect_async(url)
            .await
            .map_err(|e| DataError::ConnectionError(e.to_string()))?;
        info!(url, count = tokens.len(), "tick feed connected");

        let subscribe = json!({ "a": "subscribe", "v": tokens });
        ws.send(Message::Text(subscribe.to_string()))
            .await
            .map_err(|e| DataError::SubscriptionFailed(e.to_string()))?;
        let mode = json!({ "a": "mode", "v": ["full", tokens] });
        ws.send(Message::Text(mode.to_string()))
            .await
            .map_err(|e| DataError::SubscriptionFailed(e.to_string()))?;

        while let Some(msg) = ws.next().await {
            let msg = msg.map_err(|e| DataError::ConnectionError(e.to_string()))?;
            match msg {
                Message::Text(text) => {
                    let wire: Vec<WireTick> = match serde_json::from_str(&text) {
                        Ok(w) => w,
                        Err(e) => {
                            warn!(error = %e, "unparseable tick frame dropped");
                            continue;
                        }
                    };
                    for w in wire {
                        let tick = Tick::new(w.instrument_token, w.last_price, w.timestamp);
                        if tx.send(tick).await.is_err() {
                            return Ok(());
                        }
                    }
                }
                Message::Ping(payload) => {
                    ws.send(Message::Pong(payload))
                        .await
                        .map_err(|e| DataError::ConnectionError(e.to_string()))?;
                }
                Message::Close(_) => {
                    return Err(DataError::FeedClosed);
                }
                _ => {}
            }
        }

        Err(DataError::FeedClosed)
    }
}

#[async_trait::async_trait]
impl MarketFeed for WsTickFeed {
    async fn subscribe(&self, tokens: &[u32]) -> Result<mpsc::Receiver<Tick>, DataError> {
        let (tx, rx) = mpsc::channel(CHANNEL_CAPACITY);
        let mut state = self.state.lock().await;
        if let Some(task) = state.task.take() {
            task.abort();
        }
        state.tokens = tokens.to_vec();
        state.tx = Some(tx.clone());
        state.task = Some(Self::spawn_connection(
            self.url.clone(),
            state.tokens.clone(),
            tx,
        ));
        Ok(rx)
    }

    async fn reconnect(&self) -> Result<(), DataError> {
        let mut state = self.state.lock().await;
        let tx = state
            .tx
            .clone()
            .ok_or_else(|| DataError::ConnectionError("not subscribed".to_string()))?;
        if let Some(task) = state.task.take() {
            task.abort();
        }
        warn!("forcing tick feed reconnect");
        state.task = Some(Self::spawn_connection(
            self.url.clone(),
            state.tokens.clone(),
            tx,
        ));
        Ok(())
    }

    fn name(&self) -> &str {
        "websocket"
    }
}
