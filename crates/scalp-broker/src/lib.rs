//! Broker integrations.

mod kite;
mod log_only;
mod paper;

pub use kite::{KiteBroker, KiteConfig};
pub use log_only::LogBroker;
pub use paper::PaperBroker;
