//! Streaming moving averages.

use scalp_core::traits::StreamingIndicator;
use std::collections::VecDeque;

/// Streaming Exponential Moving Average.
///
/// The first `period` inputs are buffered; the first emitted value is their
/// simple average (SMA-seeded EMA), after which the standard recursion
/// `v = α·x + (1-α)·v` applies with `α = 2/(period+1)`.
#[derive(Debug, Clone)]
pub struct StreamingEma {
    period: usize,
    multiplier: f64,
    current: Option<f64>,
    seed: Vec<f64>,
}

impl StreamingEma {
    pub fn new(period: usize) -> Self {
        assert!(period > 0, "Period must be greater than 0");
        let multiplier = 2.0 / (period as f64 + 1.0);
        Self {
            period,
            multiplier,
            current: None,
            seed: Vec::with_capacity(period),
        }
    }
}

impl StreamingIndicator for StreamingEma {
    type Output = f64;

    fn update(&mut self, value: f64) -> Option<f64> {
        match self.current {
            None => {
                self.seed.push(value);
                if self.seed.len() < self.period {
                    return None;
                }
                let sma = self.seed.iter().sum::<f64>() / self.period as f64;
                self.current = Some(sma);
                self.current
            }
            Some(prev) => {
                let next = value * self.multiplier + prev * (1.0 - self.multiplier);
                self.current = Some(next);
                self.current
            }
        }
    }

    fn current(&self) -> Option<f64> {
        self.current
    }

    fn is_ready(&self) -> bool {
        self.current.is_some()
    }

    fn period(&self) -> usize {
        self.period
    }
}

/// Streaming Simple Moving Average over a fixed window.
///
/// Returns `None` until the window is full.
#[derive(Debug, Clone)]
pub struct StreamingSma {
    period: usize,
    window: VecDeque<f64>,
    sum: f64,
}

impl StreamingSma {
    pub fn new(period: usize) -> Self {
        assert!(period > 0, "Period must be greater than 0");
        Self {
            period,
            window: VecDeque::with_capacity(period + 1),
            sum: 0.0,
        }
    }
}

impl StreamingIndicator for StreamingSma {
    type Output = f64;

    fn update(&mut self, value: f64) -> Option<f64> {
        self.window.push_back(value);
        self.sum += value;
        if self.window.len() > self.period {
            if let Some(old) = self.window.pop_front() {
                self.sum -= old;
            }
        }
        self.current()
    }

    fn current(&self) -> Option<f64> {
        if self.window.len() < self.period {
            None
        } else {
            Some(self.sum / self.period as f64)
        }
    }

    fn is_ready(&self) -> bool {
        self.window.len() >= self.period
    }

    fn period(&self) -> usize {
        self.period
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ema_is_sma_seeded() {
        let mut ema = StreamingEma::new(3);
        assert_eq!(ema.update(1.0), None);
        assert_eq!(ema.update(2.0), None);
        // First value is SMA(3) of the seed inputs.
        let first = ema.update(3.0).unwrap();
        assert!((first - 2.0).abs() < 1e-12);

        // alpha = 2/(3+1) = 0.5; next = 0.5*4 + 0.5*2 = 3.0
        let next = ema.update(4.0).unwrap();
        assert!((next - 3.0).abs() < 1e-12);
    }

    #[test]
    fn ema_ready_never_reverts() {
        let mut ema = StreamingEma::new(2);
        ema.update(1.0);
        ema.update(2.0);
        assert!(ema.is_ready());
        ema.update(100.0);
        assert!(ema.is_ready());
    }

    #[test]
    fn sma_window_slides() {
        let mut sma = StreamingSma::new(3);
        assert_eq!(sma.update(1.0), None);
        assert_eq!(sma.update(2.0), None);
        assert!((sma.update(3.0).unwrap() - 2.0).abs() < 1e-12);
        assert!((sma.update(4.0).unwrap() - 3.0).abs() < 1e-12);
        assert!((sma.current().unwrap() - 3.0).abs() < 1e-12);
    }
}
