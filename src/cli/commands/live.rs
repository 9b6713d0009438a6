//! Live trading command implementation.

use anyhow::{anyhow, Context, Result};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tracing::info;

use scalp_broker::{KiteBroker, KiteConfig, LogBroker};
use scalp_config::AppConfig;
use scalp_core::{Broker, MarketFeed, PriceCache, SelectionProvider};
use scalp_data::{CsvHistory, FileSelection, WsTickFeed};
use scalp_engine::{
    run_startup_recovery, BrokerSweep, FeedWatchdog, InstrumentSpec, MaxLossGuard, SessionWindow,
    SignalRouter, SignalSink, SlotParams, SlotRegistry, TickEngine,
};
use scalp_strategy::StrategyParams;

use crate::cli::LiveArgs;

pub async fn run(args: LiveArgs, config: AppConfig) -> Result<()> {
    config
        .validate()
        .map_err(|e| anyhow!("invalid configuration: {e}"))?;
    if config.instruments.is_empty() {
        return Err(anyhow!("no instruments configured"));
    }

    let session = SessionWindow::from_settings(&config.session)?;
    let prices = Arc::new(PriceCache::new());

    let broker: Arc<dyn Broker> = if args.dry_run {
        info!("dry run enabled, orders are logged and never sent");
        Arc::new(LogBroker::new())
    } else {
        let kite = KiteConfig::from_env(
            &config.broker.api_key_env,
            &config.broker.access_token_env,
            &config.broker.base_url,
        )?;
        Arc::new(KiteBroker::new(kite)?)
    };

    std::fs::create_dir_all(&config.paths.state_dir)
        .with_context(|| format!("creating {}", config.paths.state_dir.display()))?;

    let params = SlotParams {
        qty: config.quantity.order_qty(),
        reward_multiple: config.strategy.reward_multiple,
        fill_poll_attempts: config.engine.fill_poll_attempts,
        fill_poll_interval: Duration::from_millis(config.engine.fill_poll_interval_ms),
    };
    let registry = Arc::new(SlotRegistry::build(
        config.trading.slots_per_side,
        config.trading.side_mode,
        &config.paths.state_dir,
        broker.clone(),
        prices.clone(),
        params,
    )?);

    // Re-adopt broker-side positions before the first tick arrives.
    run_startup_recovery(&registry).await;

    let guard = Arc::new(MaxLossGuard::new(config.risk.max_daily_loss));
    let selection: Arc<dyn SelectionProvider> = Arc::new(FileSelection::new(
        config.paths.selected_calls.clone(),
        config.paths.selected_puts.clone(),
    ));
    let router = Arc::new(SignalRouter::new(
        config.trading.enabled,
        session,
        guard.clone(),
        selection,
        registry.clone(),
    ));

    let (shutdown_tx, shutdown_rx) = watch::channel(false);

    tokio::spawn(guard.clone().run(
        broker.clone(),
        Duration::from_secs(config.risk.pnl_watch_interval_secs),
        shutdown_rx.clone(),
    ));

    let sweep = BrokerSweep::new(
        registry.clone(),
        broker.clone(),
        Duration::from_secs(config.engine.sweep_interval_secs),
    );
    tokio::spawn(sweep.run(shutdown_rx.clone()));

    for slot in registry.slots() {
        let slot = slot.clone();
        let mut rx = shutdown_rx.clone();
        let every = Duration::from_secs(config.engine.reconcile_interval_secs);
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(every);
            loop {
                tokio::select! {
                    _ = ticker.tick() => slot.reconcile().await,
                    _ = rx.changed() => return,
                }
            }
        });
    }

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
    let mut engine = TickEngine::new(
        &specs,
        config.engine.timeframe_secs,
        strategy_params,
        config.strategy.rsi_min,
        config.strategy.rsi_max,
        prices,
        registry,
        session,
        SignalSink::Live(router),
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
        timeframe_secs = config.engine.timeframe_secs,
        "live engine started"
    );
    engine.run(ticks, shutdown_rx).await;
    info!("live engine stopped");
    Ok(())
}
