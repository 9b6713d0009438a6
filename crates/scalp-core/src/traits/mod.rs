//! Core traits.

mod broker;
mod feed;
mod history;
mod indicator;
mod selection;

pub use broker::Broker;
pub use feed::MarketFeed;
pub use history::HistoricalSource;
pub use indicator::StreamingIndicator;
pub use selection::{SelectionProvider, StaticSelection};
