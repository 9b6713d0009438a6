//! Trading session window.

use chrono::{FixedOffset, NaiveTime, Utc};
use scalp_config::SessionSettings;
use scalp_core::EngineError;

/// Exchange timezone offset (IST, UTC+05:30).
const IST_OFFSET_SECS: i32 = 5 * 3600 + 30 * 60;

/// Inclusive [start, end] entry window in exchange local time.
///
/// Only entries are gated; exits run whenever the broker is open.
#[derive(Debug, Clone, Copy)]
pub struct SessionWindow {
    start: NaiveTime,
    end: NaiveTime,
}

impl SessionWindow {
    pub fn new(start: NaiveTime, end: NaiveTime) -> Self {
        Self { start, end }
    }

    pub fn from_settings(settings: &SessionSettings) -> Result<Self, EngineError> {
        let start = settings.start_time().map_err(EngineError::Config)?;
        let end = settings.end_time().map_err(EngineError::Config)?;
        Ok(Self::new(start, end))
    }

    pub fn contains(&self, t: NaiveTime) -> bool {
        t >= self.start && t <= self.end
    }

    pub fn contains_now(&self) -> bool {
        self.contains(now_exchange_time())
    }
}

/// Current wall-clock time in the exchange timezone.
pub fn now_exchange_time() -> NaiveTime {
    let ist = FixedOffset::east_opt(IST_OFFSET_SECS).expect("valid fixed offset");
    Utc::now().with_timezone(&ist).time()
}

/// Current date in the exchange timezone.
pub fn now_exchange_date() -> chrono::NaiveDate {
    let ist = FixedOffset::east_opt(IST_OFFSET_SECS).expect("valid fixed offset");
    Utc::now().with_timezone(&ist).date_naive()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn t(h: u32, m: u32) -> NaiveTime {
        NaiveTime::from_hms_opt(h, m, 0).unwrap()
    }

    #[test]
    fn window_is_inclusive_at_both_edges() {
        let window = SessionWindow::new(t(9, 20), t(15, 0));
        assert!(window.contains(t(9, 20)));
        assert!(window.contains(t(15, 0)));
        assert!(window.contains(t(12, 30)));
        assert!(!window.contains(t(9, 19)));
        assert!(!window.contains(t(15, 1)));
    }
}
