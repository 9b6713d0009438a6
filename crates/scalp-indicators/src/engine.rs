//! Composite indicator engine: one instance per instrument.

use scalp_core::traits::StreamingIndicator;
use scalp_core::types::{Candle, CandleSource};
use serde::{Deserialize, Serialize};

use crate::ema::{StreamingEma, StreamingSma};
use crate::rsi::WilderRsi;

/// One fully-populated set of indicator values for a closed candle.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct IndicatorSnapshot {
    /// EMA(8) of close
    pub ema_fast: f64,
    /// EMA(20) of low, smoothed by SMA(9)
    pub ema_slow_low: f64,
    /// EMA(20) of high, smoothed by SMA(9)
    pub ema_slow_high: f64,
    pub rsi_raw: f64,
    pub rsi_smoothed: f64,
    /// Raw RSI strictly above the previous candle's raw RSI.
    pub rsi_rising: bool,
}

/// Sequential indicator engine; feeds candles one-by-one.
///
/// Owned by exactly one instrument pipeline, never shared.
#[derive(Debug)]
pub struct IndicatorEngine {
    ema_fast: StreamingEma,
    ema_low_raw: StreamingEma,
    ema_high_raw: StreamingEma,
    ema_low_smooth: StreamingSma,
    ema_high_smooth: StreamingSma,
    rsi: WilderRsi,

    snapshot: Option<IndicatorSnapshot>,
    ready: bool,

    /// Low of the most recent live bearish candle; the strategy's
    /// stop-loss source. Warm-up candles are excluded.
    last_bearish_low: Option<f64>,
    warming: bool,
}

pub const EMA_FAST_PERIOD: usize = 8;
pub const EMA_SLOW_PERIOD: usize = 20;
pub const EMA_SMOOTH_PERIOD: usize = 9;
pub const RSI_PERIOD: usize = 5;
pub const RSI_SMOOTH_PERIOD: usize = 5;

impl IndicatorEngine {
    pub fn new() -> Self {
        Self {
            ema_fast: StreamingEma::new(EMA_FAST_PERIOD),
            ema_low_raw: StreamingEma::new(EMA_SLOW_PERIOD),
            ema_high_raw: StreamingEma::new(EMA_SLOW_PERIOD),
            ema_low_smooth: StreamingSma::new(EMA_SMOOTH_PERIOD),
            ema_high_smooth: StreamingSma::new(EMA_SMOOTH_PERIOD),
            rsi: WilderRsi::new(RSI_PERIOD, RSI_SMOOTH_PERIOD),
            snapshot: None,
            ready: false,
            last_bearish_low: None,
            warming: false,
        }
    }

    /// Feed one completed candle. Returns a snapshot only once every
    /// indicator has warmed up; the ready state then latches permanently.
    pub fn update(&mut self, candle: &Candle) -> Option<IndicatorSnapshot> {
        if !candle.is_well_formed() {
            // Fail closed for this single update.
            return if self.ready { self.snapshot } else { None };
        }

        let live = !self.warming && candle.source == CandleSource::Live;
        if live && candle.is_bearish() {
            self.last_bearish_low = Some(candle.low);
        }

        let ema_fast = self.ema_fast.update(candle.close);
        let low_raw = self.ema_low_raw.update(candle.low);
        let high_raw = self.ema_high_raw.update(candle.high);
        let ema_slow_low = low_raw.and_then(|v| self.ema_low_smooth.update(v));
        let ema_slow_high = high_raw.and_then(|v| self.ema_high_smooth.update(v));

        let rsi = self.rsi.update(candle.close);

        if let (Some(ema_fast), Some(ema_slow_low), Some(ema_slow_high), Some(raw), Some(smoothed)) =
            (ema_fast, ema_slow_low, ema_slow_high, rsi.raw, rsi.smoothed)
        {
            self.snapshot = Some(IndicatorSnapshot {
                ema_fast,
                ema_slow_low,
                ema_slow_high,
                rsi_raw: raw,
                rsi_smoothed: smoothed,
                rsi_rising: rsi.rising,
            });
            self.ready = true;
        }

        if self.ready {
            self.snapshot
        } else {
            None
        }
    }

    /// Pre-seed from historical candles without emitting signals and
    /// without recording bearish lows.
    pub fn warmup(&mut self, candles: &[Candle]) {
        self.warming = true;
        for candle in candles {
            self.update(candle);
        }
        self.warming = false;
    }

    /// Latched true permanently once all indicator values are present.
    pub fn is_ready(&self) -> bool {
        self.ready
    }

    pub fn snapshot(&self) -> Option<IndicatorSnapshot> {
        self.snapshot
    }

    /// Low of the most recent live bearish candle, if any.
    pub fn last_bearish_low(&self) -> Option<f64> {
        self.last_bearish_low
    }
}

impl Default for IndicatorEngine {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn candle(i: i64, o: f64, h: f64, l: f64, c: f64) -> Candle {
        Candle::new(i * 60, (i + 1) * 60, o, h, l, c)
    }

    fn flat_candles(n: usize, price: f64) -> Vec<Candle> {
        (0..n as i64)
            .map(|i| candle(i, price, price + 1.0, price - 1.0, price + 0.5))
            .collect()
    }

    /// EMA(20) + SMA(9) needs 28 candles; that dominates warm-up length.
    const WARMUP_LEN: usize = EMA_SLOW_PERIOD + EMA_SMOOTH_PERIOD - 1;

    #[test]
    fn no_snapshot_until_warm() {
        let mut engine = IndicatorEngine::new();
        let candles = flat_candles(WARMUP_LEN + 2, 100.0);
        let mut first_ready = None;
        for (i, c) in candles.iter().enumerate() {
            if engine.update(c).is_some() && first_ready.is_none() {
                first_ready = Some(i);
            }
        }
        assert_eq!(first_ready, Some(WARMUP_LEN - 1));
    }

    #[test]
    fn ready_latches_after_warmup_batch() {
        let mut engine = IndicatorEngine::new();
        let warm: Vec<Candle> = flat_candles(WARMUP_LEN + 5, 100.0)
            .into_iter()
            .map(Candle::warmup)
            .collect();
        engine.warmup(&warm);
        assert!(engine.is_ready());
        // Warm-up must not have recorded a stop-loss source.
        assert_eq!(engine.last_bearish_low(), None);
    }

    #[test]
    fn ready_survives_malformed_candle() {
        let mut engine = IndicatorEngine::new();
        engine.warmup(
            &flat_candles(WARMUP_LEN + 5, 100.0)
                .into_iter()
                .map(Candle::warmup)
                .collect::<Vec<_>>(),
        );
        assert!(engine.is_ready());

        let bad = candle(100, f64::NAN, 1.0, 0.0, 0.5);
        let snap = engine.update(&bad);
        assert!(engine.is_ready());
        // Previous snapshot is retained, nothing new computed.
        assert_eq!(snap, engine.snapshot());
    }

    #[test]
    fn tracks_live_bearish_low_only() {
        let mut engine = IndicatorEngine::new();
        let red = candle(0, 101.0, 102.0, 98.0, 99.0);
        let green = candle(1, 99.0, 103.0, 99.0, 102.0);
        engine.update(&red);
        engine.update(&green);
        assert_eq!(engine.last_bearish_low(), Some(98.0));

        let newer_red = candle(2, 102.0, 102.5, 100.0, 101.0);
        engine.update(&newer_red);
        assert_eq!(engine.last_bearish_low(), Some(100.0));
    }

    #[test]
    fn snapshot_matches_reference_recursion() {
        // Rising closes: RSI pinned at 100, EMAs follow the recursion.
        let mut engine = IndicatorEngine::new();
        let mut snap = None;
        for i in 0..(WARMUP_LEN as i64 + 10) {
            let base = 100.0 + i as f64 * 0.5;
            snap = engine.update(&candle(i, base, base + 1.0, base - 1.0, base + 0.25));
        }
        let snap = snap.unwrap();
        assert_eq!(snap.rsi_raw, 100.0);
        assert_eq!(snap.rsi_smoothed, 100.0);
        assert!(!snap.rsi_rising); // 100 -> 100 is not strictly rising
        assert!(snap.ema_slow_low < snap.ema_fast);
        assert!(snap.ema_fast < snap.ema_slow_high + 2.0);
    }
}
