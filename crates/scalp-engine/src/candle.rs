//! Tick-to-candle aggregation.

use scalp_core::types::Candle;
use tracing::warn;

/// Builds fixed-timeframe candles from a stream of last-traded prices.
///
/// A candle is emitted only when the first tick of the next bucket
/// arrives, so every emitted candle is closed. Ticks that land before
/// the current bucket are dropped.
#[derive(Debug)]
pub struct CandleBuilder {
    timeframe_secs: i64,
    bucket_start: Option<i64>,
    open: f64,
    high: f64,
    low: f64,
    close: f64,
}

impl CandleBuilder {
    pub fn new(timeframe_secs: i64) -> Self {
        Self {
            timeframe_secs,
            bucket_start: None,
            open: 0.0,
            high: 0.0,
            low: 0.0,
            close: 0.0,
        }
    }

    fn bucket_for(&self, ts: i64) -> i64 {
        ts.div_euclid(self.timeframe_secs) * self.timeframe_secs
    }

    fn emit(&self) -> Option<Candle> {
        let start = self.bucket_start?;
        Some(Candle::new(
            start,
            start + self.timeframe_secs,
            self.open,
            self.high,
            self.low,
            self.close,
        ))
    }

    /// Feed one tick. Returns the previous candle when this tick opens a
    /// new bucket.
    pub fn on_tick(&mut self, price: f64, ts: i64) -> Option<Candle> {
        if !price.is_finite() || price <= 0.0 {
            warn!(price, ts, "non-positive tick dropped");
            return None;
        }

        let bucket = self.bucket_for(ts);
        match self.bucket_start {
            None => {
                self.start_bucket(bucket, price);
                None
            }
            Some(current) if bucket > current => {
                let finished = self.emit();
                self.start_bucket(bucket, price);
                finished
            }
            Some(current) if bucket < current => {
                // Out-of-order tick from before the open bucket.
                None
            }
            Some(_) => {
                self.high = self.high.max(price);
                self.low = self.low.min(price);
                self.close = price;
                None
            }
        }
    }

    fn start_bucket(&mut self, bucket: i64, price: f64) {
        self.bucket_start = Some(bucket);
        self.open = price;
        self.high = price;
        self.low = price;
        self.close = price;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn closes_bucket_on_first_tick_of_next() {
        let mut builder = CandleBuilder::new(60);
        for ts in 0..60 {
            assert!(builder.on_tick(100.0, ts).is_none());
        }
        let candle = builder.on_tick(105.0, 60).unwrap();
        assert_eq!(candle.start_ts, 0);
        assert_eq!(candle.end_ts, 60);
        assert_eq!(candle.open, 100.0);
        assert_eq!(candle.high, 100.0);
        assert_eq!(candle.low, 100.0);
        assert_eq!(candle.close, 100.0);
    }

    #[test]
    fn tracks_high_low_close_within_bucket() {
        let mut builder = CandleBuilder::new(60);
        builder.on_tick(100.0, 0);
        builder.on_tick(103.0, 10);
        builder.on_tick(99.0, 20);
        builder.on_tick(101.0, 30);
        let candle = builder.on_tick(50.0, 60).unwrap();
        assert_eq!(candle.open, 100.0);
        assert_eq!(candle.high, 103.0);
        assert_eq!(candle.low, 99.0);
        assert_eq!(candle.close, 101.0);
    }

    #[test]
    fn quiet_bucket_spans_the_gap() {
        // No ticks for a whole minute: the old candle closes when the
        // next tick finally arrives, whatever bucket it lands in.
        let mut builder = CandleBuilder::new(60);
        builder.on_tick(100.0, 30);
        let candle = builder.on_tick(101.0, 185).unwrap();
        assert_eq!(candle.start_ts, 0);
        assert_eq!(candle.close, 100.0);
        // New bucket started at 180; closing it confirms the open.
        let next = builder.on_tick(102.0, 240).unwrap();
        assert_eq!(next.start_ts, 180);
        assert_eq!(next.open, 101.0);
    }

    #[test]
    fn out_of_order_and_bad_ticks_dropped() {
        let mut builder = CandleBuilder::new(60);
        builder.on_tick(100.0, 70);
        assert!(builder.on_tick(500.0, 10).is_none());
        assert!(builder.on_tick(f64::NAN, 80).is_none());
        assert!(builder.on_tick(-1.0, 80).is_none());
        let candle = builder.on_tick(101.0, 120).unwrap();
        assert_eq!(candle.high, 100.0);
    }
}
