//! Market data sources.

mod history;
mod selection;
mod sim;
mod ws;

pub use history::CsvHistory;
pub use selection::FileSelection;
pub use sim::SimFeed;
pub use ws::WsTickFeed;
