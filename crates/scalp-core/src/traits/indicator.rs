//! Streaming indicator trait.

/// Indicator updated incrementally, one closed candle at a time.
pub trait StreamingIndicator: Send + Sync {
    /// The output type of the indicator.
    type Output;

    /// Update with a new value.
    ///
    /// Returns the current value, or None while warming up.
    fn update(&mut self, value: f64) -> Option<Self::Output>;

    /// Current value without adding new data.
    fn current(&self) -> Option<Self::Output>;

    /// Check if the indicator has seen enough data to produce values.
    fn is_ready(&self) -> bool;

    /// Minimum number of inputs required.
    fn period(&self) -> usize;
}
