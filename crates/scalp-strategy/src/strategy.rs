//! Per-instrument scalping strategy.

use scalp_core::error::StrategyError;
use scalp_core::types::{Candle, ExitReason, Signal};
use scalp_indicators::IndicatorEngine;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::conditions::ConditionSet;

/// Strategy parameters, loaded from configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StrategyParams {
    /// Reject entries whose risk (entry - stop) is below this.
    pub min_stop_points: f64,
    /// Optional cap on risk; a wider bearish-low stop is raised to fit.
    pub max_stop_points: Option<f64>,
    /// Target = entry + risk * reward_multiple.
    pub reward_multiple: f64,
}

impl Default for StrategyParams {
    fn default() -> Self {
        Self {
            min_stop_points: 5.0,
            max_stop_points: None,
            reward_multiple: 1.0,
        }
    }
}

impl StrategyParams {
    pub fn validate(&self) -> Result<(), StrategyError> {
        if self.min_stop_points <= 0.0 {
            return Err(StrategyError::InvalidConfig(
                "min_stop_points must be positive".into(),
            ));
        }
        if self.reward_multiple <= 0.0 {
            return Err(StrategyError::InvalidConfig(
                "reward_multiple must be positive".into(),
            ));
        }
        if let Some(max) = self.max_stop_points {
            if max < self.min_stop_points {
                return Err(StrategyError::InvalidConfig(
                    "max_stop_points must be >= min_stop_points".into(),
                ));
            }
        }
        Ok(())
    }
}

/// One strategy instance per instrument.
///
/// Owns the per-instrument in-trade flag: while a position is open only
/// exits are evaluated, and this flag is the single source of truth for
/// whether new entries are considered.
#[derive(Debug)]
pub struct ScalpStrategy {
    symbol: String,
    params: StrategyParams,

    in_trade: bool,
    entry: Option<f64>,
    stop: Option<f64>,
    target: Option<f64>,
}

impl ScalpStrategy {
    pub fn new(symbol: impl Into<String>, params: StrategyParams) -> Self {
        Self {
            symbol: symbol.into(),
            params,
            in_trade: false,
            entry: None,
            stop: None,
            target: None,
        }
    }

    pub fn symbol(&self) -> &str {
        &self.symbol
    }

    pub fn in_trade(&self) -> bool {
        self.in_trade
    }

    /// Evaluate one closed candle against the indicator state.
    pub fn on_candle(
        &mut self,
        candle: &Candle,
        indicators: &IndicatorEngine,
        conditions: &ConditionSet,
    ) -> Option<Signal> {
        if self.in_trade {
            return self.evaluate_exit(candle);
        }

        if !conditions.all {
            return None;
        }

        // Stop from the most recent live bearish candle. No bearish
        // candle seen yet means no signal.
        let stop = indicators.last_bearish_low()?;
        let entry = candle.close;
        let mut risk = entry - stop;

        if risk < self.params.min_stop_points {
            debug!(
                symbol = %self.symbol,
                risk,
                min = self.params.min_stop_points,
                "skip signal: risk below minimum stop distance"
            );
            return None;
        }

        let mut stop = stop;
        if let Some(max) = self.params.max_stop_points {
            if risk > max {
                risk = max;
                stop = entry - risk;
            }
        }

        let target = entry + risk * self.params.reward_multiple;

        self.in_trade = true;
        self.entry = Some(entry);
        self.stop = Some(stop);
        self.target = Some(target);

        info!(
            symbol = %self.symbol,
            entry, stop, target, risk,
            "buy signal"
        );

        Some(Signal::Buy {
            entry,
            stop,
            target,
        })
    }

    fn evaluate_exit(&mut self, candle: &Candle) -> Option<Signal> {
        let (stop, target) = (self.stop?, self.target?);

        // Stop-loss takes priority when both levels are breached within
        // the same candle (gap case).
        if candle.low <= stop {
            info!(symbol = %self.symbol, stop, "exit: stop hit");
            self.reset();
            return Some(Signal::Exit {
                reason: ExitReason::StopLoss,
            });
        }

        if candle.high >= target {
            info!(symbol = %self.symbol, target, "exit: target hit");
            self.reset();
            return Some(Signal::Exit {
                reason: ExitReason::TakeProfit,
            });
        }

        None
    }

    /// Forget the open position (external close observed).
    pub fn reset(&mut self) {
        self.in_trade = false;
        self.entry = None;
        self.stop = None;
        self.target = None;
    }
}
