//! Wilder-smoothed RSI with an SMA smoothing pass.

use std::collections::VecDeque;

/// Output of one RSI update.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RsiOutput {
    pub raw: Option<f64>,
    pub smoothed: Option<f64>,
    /// Current raw RSI strictly above the immediately preceding raw RSI.
    pub rising: bool,
}

/// Streaming RSI using Wilder's recursive averaging.
///
/// Average gain/loss are seeded as the simple mean of the first `period`
/// deltas, then Wilder-recursed: `avg = (avg·(n-1) + x) / n`. RSI is 100
/// when the average loss is zero. A second SMA pass over the raw RSI
/// produces the smoothed output; `rising` always compares raw values.
#[derive(Debug, Clone)]
pub struct WilderRsi {
    period: usize,
    smooth_period: usize,

    prev_close: Option<f64>,
    avg_gain: Option<f64>,
    avg_loss: Option<f64>,

    raw: Option<f64>,
    prev_raw: Option<f64>,

    smooth_window: VecDeque<f64>,
    smoothed: Option<f64>,

    seed_gains: Vec<f64>,
    seed_losses: Vec<f64>,
}

impl WilderRsi {
    pub fn new(period: usize, smooth_period: usize) -> Self {
        assert!(period > 0 && smooth_period > 0, "Periods must be > 0");
        Self {
            period,
            smooth_period,
            prev_close: None,
            avg_gain: None,
            avg_loss: None,
            raw: None,
            prev_raw: None,
            smooth_window: VecDeque::with_capacity(smooth_period + 1),
            smoothed: None,
            seed_gains: Vec::with_capacity(period),
            seed_losses: Vec::with_capacity(period),
        }
    }

    /// Feed one close; call once per completed candle.
    pub fn update(&mut self, close: f64) -> RsiOutput {
        let prev_close = match self.prev_close.replace(close) {
            Some(p) => p,
            None => return self.output(),
        };

        let delta = close - prev_close;
        let gain = delta.max(0.0);
        let loss = (-delta).max(0.0);

        match (self.avg_gain, self.avg_loss) {
            (Some(ag), Some(al)) => {
                let n = self.period as f64;
                self.avg_gain = Some((ag * (n - 1.0) + gain) / n);
                self.avg_loss = Some((al * (n - 1.0) + loss) / n);
            }
            _ => {
                self.seed_gains.push(gain);
                self.seed_losses.push(loss);
                if self.seed_gains.len() < self.period {
                    return self.output();
                }
                let n = self.period as f64;
                self.avg_gain = Some(self.seed_gains.iter().sum::<f64>() / n);
                self.avg_loss = Some(self.seed_losses.iter().sum::<f64>() / n);
            }
        }

        self.prev_raw = self.raw;

        let (ag, al) = (self.avg_gain.unwrap_or(0.0), self.avg_loss.unwrap_or(0.0));
        self.raw = Some(if al == 0.0 {
            100.0
        } else {
            100.0 - (100.0 / (1.0 + ag / al))
        });

        if let Some(raw) = self.raw {
            self.smooth_window.push_back(raw);
            if self.smooth_window.len() > self.smooth_period {
                self.smooth_window.pop_front();
            }
            if self.smooth_window.len() == self.smooth_period {
                self.smoothed =
                    Some(self.smooth_window.iter().sum::<f64>() / self.smooth_period as f64);
            }
        }

        self.output()
    }

    pub fn is_ready(&self) -> bool {
        self.raw.is_some() && self.prev_raw.is_some() && self.smoothed.is_some()
    }

    fn output(&self) -> RsiOutput {
        let rising = match (self.raw, self.prev_raw) {
            (Some(cur), Some(prev)) => cur > prev,
            _ => false,
        };
        RsiOutput {
            raw: self.raw,
            smoothed: self.smoothed,
            rising,
        }
    }
}
