//! Core data types for the scalping engine.

mod candle;
mod order;
mod price;
mod side;
mod signal;
mod tick;
mod trade;

pub use candle::{Candle, CandleSource};
pub use order::{BrokerOrder, BrokerPosition, OrderId, OrderSide, OrderStatus};
pub use price::PriceCache;
pub use side::{OptionSide, SideMode};
pub use signal::Signal;
pub use tick::Tick;
pub use trade::{ExitReason, Trade, TradeState};
