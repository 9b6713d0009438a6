//! Paper trading command implementation.

use anyhow::{anyhow, Context, Result};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tracing::info;

use scalp_config::AppConfig;
use scalp_core::{MarketFeed, PriceCache};
use scalp_data::{CsvHistory, FileSelection, WsTickFeed};
use scalp_engine::{
    FeedWatchdog, InstrumentSpec, MaxLossGuard, PaperTrader, SessionWindow, SignalRouter,
    SignalSink, SlotRegistry, TickEngine,
};
use scalp_strategy::StrategyParams;

pub async fn run(config: AppConfig) -> Result<()> {
    config
        .validate()
        .map_err(|e| anyhow!("invalid configuration: {e}"))?;
    if config.instruments.is_empty() {
        return Err(anyhow!("no instruments configured"));
    }

    let session = SessionWindow::from_settings(&config.session)?;
    let prices = Arc::new(PriceCache::new());

    if let Some(dir) = config.paths.paper_ledger.parent() {
        std::fs::create_dir_all(dir).with_context(|| format!("creating {}", dir.display()))?;
    }
    let trader = Arc::new(PaperTrader::new(
        prices.clone(),
        config.paths.paper_ledger.clone(),
        config.quantity.order_qty(),
    ));

    let (shutdown_tx, shutdown_rx) = watch::channel(false);

    tokio::spawn(trader.clone().run(
        Duration::from_secs(config.engine.paper_exit_interval_secs),
        shutdown_rx.clone(),
    ));

    let feed: Arc<dyn MarketFeed> = Arc::new(WsTickFeed::new(config.broker.ws_url.clone()));
    let tokens: Vec<u32> = config.instruments.iter().map(|i| i.token).collect();
    let ticks = feed.subscribe(&tokens).await?;

    let watchdog = FeedWatchdog::new(
        prices.clone(),
        feed.clone(),
        config.engine.stale_feed_secs,
        Duration::from_secs(config.engine.reconnect_cooldown_secs),
    );
    tokio::spawn(watchdog.run(shutdown_rx.clone()));

    let specs: Vec<InstrumentSpec> = config
        .instruments
        .iter()
        .map(|i| InstrumentSpec {
            symbol: i.symbol.clone(),
            token: i.token,
        })
        .collect();
    let strategy_params = StrategyParams {
        min_stop_points: config.strategy.min_stop_points,
        max_stop_points: config.strategy.max_stop_points,
        reward_multiple: config.strategy.reward_multiple,
    };
    // No broker orders in paper mode, so the slot registry stays empty;
    // the router still applies the switch/session/selection gates.
    let registry = Arc::new(SlotRegistry::new(Vec::new(), config.trading.side_mode));
    let guard = Arc::new(MaxLossGuard::new(config.risk.max_daily_loss));
    let selection = Arc::new(FileSelection::new(
        config.paths.selected_calls.clone(),
        config.paths.selected_puts.clone(),
    ));
    let router = Arc::new(SignalRouter::new(
        config.trading.enabled,
        session,
        guard,
        selection,
        registry.clone(),
    ));
    let mut engine = TickEngine::new(
        &specs,
        config.engine.timeframe_secs,
        strategy_params,
        config.strategy.rsi_min,
        config.strategy.rsi_max,
        prices,
        registry,
        session,
        SignalSink::Paper(router, trader),
    );

    let history = CsvHistory::new(config.paths.warmup_dir.clone());
    engine.warmup(&history, config.engine.warmup_candles).await;

    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            info!("shutdown signal received");
            let _ = shutdown_tx.send(true);
        }
    });

    info!(
        instruments = specs.len(),
        ledger = %config.paths.paper_ledger.display(),
        "paper engine started"
    );
    engine.run(ticks, shutdown_rx).await;
    info!("paper engine stopped");
    Ok(())
}
