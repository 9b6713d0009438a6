//! Execution engine: ticks to candles to signals to broker orders.

mod candle;
mod engine;
mod health;
mod paper;
mod reconcile;
mod recovery;
mod registry;
mod risk;
mod router;
mod session;
mod slot;

pub use candle::CandleBuilder;
pub use engine::{InstrumentSpec, SignalSink, TickEngine};
pub use health::FeedWatchdog;
pub use paper::PaperTrader;
pub use reconcile::BrokerSweep;
pub use recovery::run_startup_recovery;
pub use registry::SlotRegistry;
pub use risk::MaxLossGuard;
pub use router::{BuySignal, RouteOutcome, SignalRouter};
pub use session::{now_exchange_date, now_exchange_time, SessionWindow};
pub use slot::{SlotParams, TradeSlot};
