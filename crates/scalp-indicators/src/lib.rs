//! Streaming technical indicators for the scalping engine.
//!
//! All indicators here are incremental: they consume one closed candle (or
//! one derived value) at a time and keep O(1)-ish running state, matching
//! live tick-driven evaluation.

mod ema;
mod engine;
mod rsi;

pub use ema::{StreamingEma, StreamingSma};
pub use engine::{IndicatorEngine, IndicatorSnapshot};
pub use rsi::{RsiOutput, WilderRsi};
