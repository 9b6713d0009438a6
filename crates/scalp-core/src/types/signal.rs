//! Strategy output signals.

use serde::{Deserialize, Serialize};

use super::trade::ExitReason;

/// A transient strategy decision for one closed candle. Not persisted.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum Signal {
    /// Enter long at the candle close with protective levels attached.
    Buy {
        entry: f64,
        stop: f64,
        target: f64,
    },
    /// Leave the open position.
    Exit { reason: ExitReason },
}
