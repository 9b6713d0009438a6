//! Fixed-timeframe OHLC candles.

use serde::{Deserialize, Serialize};

/// Where a candle came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CandleSource {
    /// Historical / replayed, used only to pre-seed indicators.
    Warmup,
    /// Built live from ticks.
    Live,
}

/// OHLC candle over one fixed time bucket. Immutable once emitted.
///
/// Invariant: `end_ts == start_ts + timeframe` and `low <= open,close <= high`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Candle {
    /// Bucket start, unix seconds
    pub start_ts: i64,
    /// Bucket end, unix seconds
    pub end_ts: i64,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub source: CandleSource,
}

impl Candle {
    pub fn new(start_ts: i64, end_ts: i64, open: f64, high: f64, low: f64, close: f64) -> Self {
        Self {
            start_ts,
            end_ts,
            open,
            high,
            low,
            close,
            source: CandleSource::Live,
        }
    }

    pub fn warmup(mut self) -> Self {
        self.source = CandleSource::Warmup;
        self
    }

    /// Check if the candle is bullish (close > open).
    #[inline]
    pub fn is_bullish(&self) -> bool {
        self.close > self.open
    }

    /// Check if the candle is bearish (close < open).
    #[inline]
    pub fn is_bearish(&self) -> bool {
        self.close < self.open
    }

    /// Upper edge of the candle body.
    #[inline]
    pub fn body_high(&self) -> f64 {
        self.open.max(self.close)
    }

    /// False when the OHLC values are inconsistent or non-finite.
    ///
    /// The owning component fails closed for that single update rather
    /// than propagating an error up the tick path.
    pub fn is_well_formed(&self) -> bool {
        let finite = [self.open, self.high, self.low, self.close]
            .iter()
            .all(|v| v.is_finite());
        finite
            && self.end_ts > self.start_ts
            && self.low <= self.open
            && self.low <= self.close
            && self.high >= self.open
            && self.high >= self.close
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bullish_bearish() {
        let c = Candle::new(0, 60, 100.0, 101.0, 99.0, 100.5);
        assert!(c.is_bullish());
        assert!(!c.is_bearish());
        assert!((c.body_high() - 100.5).abs() < f64::EPSILON);
    }

    #[test]
    fn well_formed_rejects_inverted_ohlc() {
        let good = Candle::new(0, 60, 100.0, 101.0, 99.0, 100.5);
        assert!(good.is_well_formed());

        let inverted = Candle::new(0, 60, 100.0, 99.0, 101.0, 100.5);
        assert!(!inverted.is_well_formed());

        let nan = Candle::new(0, 60, f64::NAN, 101.0, 99.0, 100.5);
        assert!(!nan.is_well_formed());
    }
}
