//! Tick engine: per-instrument pipelines from tick to signal.

use crate::candle::CandleBuilder;
use crate::paper::PaperTrader;
use crate::registry::SlotRegistry;
use crate::router::{BuySignal, SignalRouter};
use crate::session::SessionWindow;
use scalp_core::traits::HistoricalSource;
use scalp_core::types::{OptionSide, PriceCache, Signal, Tick};
use scalp_indicators::IndicatorEngine;
use scalp_strategy::{ConditionEngine, ScalpStrategy, StrategyParams};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::{mpsc, watch};
use tracing::{debug, info, warn};

/// Where accepted signals go. Both modes pass the router's admission
/// gates; paper terminates at the recorder instead of a slot.
pub enum SignalSink {
    Live(Arc<SignalRouter>),
    Paper(Arc<SignalRouter>, Arc<PaperTrader>),
}

/// One instrument the engine watches.
#[derive(Debug, Clone)]
pub struct InstrumentSpec {
    pub symbol: String,
    pub token: u32,
}

struct Pipeline {
    symbol: String,
    token: u32,
    builder: CandleBuilder,
    indicators: IndicatorEngine,
    conditions: ConditionEngine,
    strategy: ScalpStrategy,
}

/// Single-task tick consumer.
///
/// Consuming the channel on one task is what guarantees per-instrument
/// candle ordering; the heavy work (order placement) happens inside the
/// router while further ticks queue in the channel.
pub struct TickEngine {
    pipelines: HashMap<u32, Pipeline>,
    prices: Arc<PriceCache>,
    registry: Arc<SlotRegistry>,
    session: SessionWindow,
    timeframe_secs: i64,
    sink: SignalSink,
}

impl TickEngine {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        instruments: &[InstrumentSpec],
        timeframe_secs: i64,
        strategy_params: StrategyParams,
        rsi_min: f64,
        rsi_max: f64,
        prices: Arc<PriceCache>,
        registry: Arc<SlotRegistry>,
        session: SessionWindow,
        sink: SignalSink,
    ) -> Self {
        let pipelines = instruments
            .iter()
            .map(|spec| {
                (
                    spec.token,
                    Pipeline {
                        symbol: spec.symbol.clone(),
                        token: spec.token,
                        builder: CandleBuilder::new(timeframe_secs),
                        indicators: IndicatorEngine::new(),
                        conditions: ConditionEngine::new(rsi_min, rsi_max),
                        strategy: ScalpStrategy::new(spec.symbol.clone(), strategy_params.clone()),
                    },
                )
            })
            .collect();
        Self {
            pipelines,
            prices,
            registry,
            session,
            timeframe_secs,
            sink,
        }
    }

    /// Pre-seed every pipeline's indicators from history. An instrument
    /// without history starts cold and warms up on live candles.
    pub async fn warmup(&mut self, history: &dyn HistoricalSource, limit: usize) {
        for pipeline in self.pipelines.values_mut() {
            match history
                .recent_candles(&pipeline.symbol, self.timeframe_secs, limit)
                .await
            {
                Ok(candles) => {
                    pipeline.indicators.warmup(&candles);
                    info!(
                        symbol = pipeline.symbol,
                        candles = candles.len(),
                        ready = pipeline.indicators.is_ready(),
                        "indicators warmed up"
                    );
                }
                Err(e) => {
                    warn!(symbol = pipeline.symbol, error = %e, "no warm-up history");
                }
            }
        }
    }

    pub async fn run(mut self, mut rx: mpsc::Receiver<Tick>, mut shutdown: watch::Receiver<bool>) {
        info!(instruments = self.pipelines.len(), "tick engine started");
        loop {
            tokio::select! {
                maybe = rx.recv() => match maybe {
                    Some(tick) => self.on_tick(tick).await,
                    None => {
                        warn!("tick channel closed, engine stopping");
                        return;
                    }
                },
                _ = shutdown.changed() => {
                    info!("engine shutdown requested");
                    return;
                }
            }
        }
    }

    async fn on_tick(&mut self, tick: Tick) {
        let Some(pipeline) = self.pipelines.get_mut(&tick.instrument_token) else {
            return;
        };
        self.prices
            .update(&pipeline.symbol, tick.last_price, tick.timestamp);

        let Some(candle) = pipeline.builder.on_tick(tick.last_price, tick.timestamp) else {
            return;
        };

        let snapshot = pipeline.indicators.update(&candle);
        let in_session = self.session.contains_now();
        let slot_free = match &self.sink {
            SignalSink::Live(_) => OptionSide::from_symbol(&pipeline.symbol)
                .map(|side| self.registry.has_free(side))
                .unwrap_or(false),
            SignalSink::Paper(_, trader) => !trader.has_open(&pipeline.symbol),
        };
        let conditions =
            pipeline
                .conditions
                .evaluate(&candle, snapshot.as_ref(), in_session, slot_free);

        let Some(signal) = pipeline
            .strategy
            .on_candle(&candle, &pipeline.indicators, &conditions)
        else {
            return;
        };

        match (&self.sink, signal) {
            (SignalSink::Live(router), Signal::Buy { entry, stop, target }) => {
                router
                    .route(BuySignal {
                        symbol: pipeline.symbol.clone(),
                        token: pipeline.token,
                        candle_ts: candle.start_ts,
                        entry,
                        stop,
                        target,
                    })
                    .await;
            }
            (SignalSink::Live(_), Signal::Exit { reason }) => {
                // Real exits are broker-side (the protective OCO); the
                // strategy-level exit only resets its own position.
                debug!(symbol = pipeline.symbol, reason = %reason, "strategy exit");
            }
            (SignalSink::Paper(router, trader), Signal::Buy { entry, stop, target }) => {
                router.route_paper(
                    BuySignal {
                        symbol: pipeline.symbol.clone(),
                        token: pipeline.token,
                        candle_ts: candle.start_ts,
                        entry,
                        stop,
                        target,
                    },
                    trader,
                );
            }
            (SignalSink::Paper(_, trader), Signal::Exit { reason }) => {
                trader.close(&pipeline.symbol, reason, candle.close);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::risk::MaxLossGuard;
    use crate::slot::SlotParams;
    use chrono::NaiveTime;
    use scalp_broker::LogBroker;
    use scalp_core::traits::StaticSelection;
    use scalp_core::types::SideMode;
    use std::time::Duration;

    const SYM: &str = "NIFTY25SEP24500CE";
    const TOKEN: u32 = 7;

    fn wide_session() -> SessionWindow {
        SessionWindow::new(
            NaiveTime::from_hms_opt(0, 0, 0).unwrap(),
            NaiveTime::from_hms_opt(23, 59, 0).unwrap(),
        )
    }

    fn live_engine() -> (TickEngine, Arc<SignalRouter>, tempfile::TempDir) {
        let dir = tempfile::tempdir().unwrap();
        let prices = Arc::new(PriceCache::new());
        let registry = Arc::new(
            SlotRegistry::build(
                1,
                SideMode::Both,
                dir.path(),
                Arc::new(LogBroker::new()),
                prices.clone(),
                SlotParams {
                    qty: 75,
                    reward_multiple: 1.0,
                    fill_poll_attempts: 1,
                    fill_poll_interval: Duration::from_millis(1),
                },
            )
            .unwrap(),
        );
        let router = Arc::new(SignalRouter::new(
            true,
            wide_session(),
            Arc::new(MaxLossGuard::new(None)),
            Arc::new(StaticSelection::new(vec![SYM.to_string()], Vec::new())),
            registry.clone(),
        ));
        let engine = TickEngine::new(
            &[InstrumentSpec {
                symbol: SYM.to_string(),
                token: TOKEN,
            }],
            60,
            StrategyParams::default(),
            40.0,
            65.0,
            prices,
            registry,
            wide_session(),
            SignalSink::Live(router.clone()),
        );
        (engine, router, dir)
    }

    #[tokio::test]
    async fn ticks_update_the_price_cache() {
        let (mut engine, _router, _dir) = live_engine();
        engine.on_tick(Tick::new(TOKEN, 101.5, 30)).await;
        assert_eq!(engine.prices.get(SYM), Some(101.5));
        // Unknown tokens are ignored.
        engine.on_tick(Tick::new(99, 55.0, 31)).await;
        assert!(engine.prices.get("UNKNOWN").is_none());
    }

    #[tokio::test]
    async fn candle_close_flows_through_the_pipeline() {
        let (mut engine, _router, _dir) = live_engine();
        // Two buckets of ticks: the second tick closes the first candle
        // and feeds it to the indicators.
        engine.on_tick(Tick::new(TOKEN, 100.0, 0)).await;
        engine.on_tick(Tick::new(TOKEN, 101.0, 65)).await;
        let pipeline = engine.pipelines.get(&TOKEN).unwrap();
        // One closed candle consumed; indicators still warming.
        assert!(!pipeline.indicators.is_ready());
        assert!(pipeline.indicators.snapshot().is_none());
    }

    #[tokio::test]
    async fn warmup_tolerates_missing_history() {
        let dir = tempfile::tempdir().unwrap();
        let (mut engine, _router, _slots) = live_engine();
        let history = scalp_data::CsvHistory::new(dir.path());
        engine.warmup(&history, 50).await;
        assert!(!engine.pipelines.get(&TOKEN).unwrap().indicators.is_ready());
    }

    #[tokio::test]
    async fn paper_sink_records_instead_of_trading() {
        let dir = tempfile::tempdir().unwrap();
        let prices = Arc::new(PriceCache::new());
        let trader = Arc::new(PaperTrader::new(
            prices.clone(),
            dir.path().join("ledger.csv"),
            75,
        ));
        let registry = Arc::new(SlotRegistry::new(Vec::new(), SideMode::Both));
        let router = Arc::new(SignalRouter::new(
            true,
            wide_session(),
            Arc::new(MaxLossGuard::new(None)),
            Arc::new(StaticSelection::new(vec![SYM.to_string()], Vec::new())),
            registry.clone(),
        ));
        let mut engine = TickEngine::new(
            &[InstrumentSpec {
                symbol: SYM.to_string(),
                token: TOKEN,
            }],
            60,
            StrategyParams::default(),
            40.0,
            65.0,
            prices,
            registry,
            wide_session(),
            SignalSink::Paper(router, trader.clone()),
        );
        // Not enough history for a signal, but the plumbing must not
        // open anything on plain ticks.
        engine.on_tick(Tick::new(TOKEN, 100.0, 0)).await;
        engine.on_tick(Tick::new(TOKEN, 101.0, 65)).await;
        assert_eq!(trader.open_count(), 0);
    }
}
