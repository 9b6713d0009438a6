//! Strategy layer: pure condition evaluation plus the per-instrument
//! scalping strategy that turns conditions into signals.

mod conditions;
mod strategy;

pub use conditions::{ConditionEngine, ConditionSet};
pub use strategy::{ScalpStrategy, StrategyParams};
