//! Buy-side condition evaluation. Pure logic: no broker, no state mutation.

use scalp_core::types::Candle;
use scalp_indicators::IndicatorSnapshot;
use serde::{Deserialize, Serialize};

/// All atomic condition flags plus the final gate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ConditionSet {
    pub bullish: bool,
    pub close_above_fast_ema: bool,
    pub close_at_or_above_band_low: bool,
    pub close_at_or_below_band_high: bool,
    pub not_touching_band_high: bool,
    pub rsi_in_range: bool,
    pub rsi_rising: bool,
    pub in_session: bool,
    pub slot_free: bool,
    pub all: bool,
}

/// Evaluates entry conditions for one closed candle.
#[derive(Debug, Clone)]
pub struct ConditionEngine {
    rsi_min: f64,
    rsi_max: f64,
}

impl ConditionEngine {
    pub fn new(rsi_min: f64, rsi_max: f64) -> Self {
        Self { rsi_min, rsi_max }
    }

    /// Evaluate all condition flags.
    ///
    /// The bullish check is a hard gate: a non-bullish candle
    /// short-circuits every downstream flag to false. A missing snapshot
    /// (indicators not warmed up) behaves the same way.
    pub fn evaluate(
        &self,
        candle: &Candle,
        snapshot: Option<&IndicatorSnapshot>,
        in_session: bool,
        slot_free: bool,
    ) -> ConditionSet {
        let mut set = ConditionSet {
            in_session,
            slot_free,
            ..Default::default()
        };

        if !candle.is_bullish() {
            return set;
        }
        set.bullish = true;

        let Some(snap) = snapshot else {
            return set;
        };

        set.close_above_fast_ema = candle.close > snap.ema_fast;
        set.close_at_or_above_band_low = candle.close >= snap.ema_slow_low;
        set.close_at_or_below_band_high = candle.close <= snap.ema_slow_high;

        // When the fast EMA is still below the upper band, require the
        // candle (high and body) to stay strictly below it: don't buy into
        // a band the fast EMA hasn't caught up to.
        set.not_touching_band_high = if snap.ema_fast < snap.ema_slow_high {
            candle.high < snap.ema_slow_high && candle.body_high() < snap.ema_slow_high
        } else {
            true
        };

        set.rsi_in_range = snap.rsi_raw >= self.rsi_min && snap.rsi_raw <= self.rsi_max;
        set.rsi_rising = snap.rsi_rising;

        set.all = set.bullish
            && set.close_above_fast_ema
            && set.close_at_or_above_band_low
            && set.close_at_or_below_band_high
            && set.not_touching_band_high
            && set.rsi_in_range
            && set.rsi_rising
            && set.in_session
            && set.slot_free;

        set
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn snapshot() -> IndicatorSnapshot {
        IndicatorSnapshot {
            ema_fast: 100.0,
            ema_slow_low: 98.0,
            ema_slow_high: 106.0,
            rsi_raw: 55.0,
            rsi_smoothed: 52.0,
            rsi_rising: true,
        }
    }

    fn bullish_candle() -> Candle {
        Candle::new(0, 60, 100.0, 104.0, 99.5, 103.0)
    }

    fn engine() -> ConditionEngine {
        ConditionEngine::new(40.0, 65.0)
    }

    #[test]
    fn all_conditions_pass_on_textbook_setup() {
        let set = engine().evaluate(&bullish_candle(), Some(&snapshot()), true, true);
        assert!(set.all, "{set:?}");
    }

    #[test]
    fn bearish_candle_short_circuits_everything() {
        let candle = Candle::new(0, 60, 103.0, 104.0, 99.5, 100.0);
        let set = engine().evaluate(&candle, Some(&snapshot()), true, true);
        assert!(!set.bullish);
        assert!(!set.close_above_fast_ema);
        assert!(!set.rsi_in_range);
        assert!(!set.all);
        // Pass-through inputs survive the short circuit.
        assert!(set.in_session);
        assert!(set.slot_free);
    }

    #[test]
    fn missing_snapshot_fails_closed() {
        let set = engine().evaluate(&bullish_candle(), None, true, true);
        assert!(set.bullish);
        assert!(!set.all);
    }

    #[test]
    fn high_touching_upper_band_blocks_entry() {
        let mut snap = snapshot();
        snap.ema_slow_high = 103.5; // candle high 104.0 pokes above
        let set = engine().evaluate(&bullish_candle(), Some(&snap), true, true);
        assert!(!set.not_touching_band_high);
        assert!(!set.all);
    }

    #[test]
    fn touch_rule_waived_once_fast_ema_above_band() {
        let mut snap = snapshot();
        snap.ema_slow_high = 103.5;
        snap.ema_fast = 103.6; // fast EMA caught up
        let candle = Candle::new(0, 60, 100.0, 104.0, 99.5, 103.5);
        let set = engine().evaluate(&candle, Some(&snap), true, true);
        assert!(set.not_touching_band_high);
    }

    #[test]
    fn rsi_bounds_are_inclusive() {
        let mut snap = snapshot();
        snap.rsi_raw = 40.0;
        assert!(
            engine()
                .evaluate(&bullish_candle(), Some(&snap), true, true)
                .rsi_in_range
        );
        snap.rsi_raw = 65.0;
        assert!(
            engine()
                .evaluate(&bullish_candle(), Some(&snap), true, true)
                .rsi_in_range
        );
        snap.rsi_raw = 65.1;
        assert!(
            !engine()
                .evaluate(&bullish_candle(), Some(&snap), true, true)
                .rsi_in_range
        );
    }

    #[test]
    fn session_or_slot_gate_blocks_all() {
        let set = engine().evaluate(&bullish_candle(), Some(&snapshot()), false, true);
        assert!(!set.all);
        let set = engine().evaluate(&bullish_candle(), Some(&snapshot()), true, false);
        assert!(!set.all);
    }
}
