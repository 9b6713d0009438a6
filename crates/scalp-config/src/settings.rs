//! Configuration structures.

use chrono::NaiveTime;
use scalp_core::types::SideMode;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Main application configuration.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct AppConfig {
    #[serde(default)]
    pub app: AppSettings,
    #[serde(default)]
    pub logging: LoggingConfig,
    #[serde(default)]
    pub trading: TradingSettings,
    #[serde(default)]
    pub session: SessionSettings,
    #[serde(default)]
    pub risk: RiskSettings,
    #[serde(default)]
    pub quantity: QuantitySettings,
    #[serde(default)]
    pub strategy: StrategySettings,
    #[serde(default)]
    pub engine: EngineSettings,
    #[serde(default)]
    pub broker: BrokerSettings,
    #[serde(default)]
    pub paths: PathSettings,
    /// Instruments to subscribe and evaluate.
    #[serde(default)]
    pub instruments: Vec<InstrumentConfig>,
}

/// General app settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppSettings {
    pub name: String,
    pub environment: String,
}

impl Default for AppSettings {
    fn default() -> Self {
        Self {
            name: "scalp".to_string(),
            environment: "development".to_string(),
        }
    }
}

/// Logging configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    pub level: String,
    pub format: String,
    /// Directory for the daily-rotated audit log, if any.
    pub audit_dir: Option<PathBuf>,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: "pretty".to_string(),
            audit_dir: None,
        }
    }
}

/// Global trading switches.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TradingSettings {
    /// Master switch; router gate #1.
    pub enabled: bool,
    pub side_mode: SideMode,
    /// Fixed slot count per side, created at startup for process lifetime.
    pub slots_per_side: usize,
}

impl Default for TradingSettings {
    fn default() -> Self {
        Self {
            enabled: false,
            side_mode: SideMode::Both,
            slots_per_side: 2,
        }
    }
}

/// Trading session window (exchange local time, HH:MM).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionSettings {
    pub start: String,
    pub end: String,
}

impl Default for SessionSettings {
    fn default() -> Self {
        Self {
            start: "09:20".to_string(),
            end: "15:00".to_string(),
        }
    }
}

impl SessionSettings {
    pub fn start_time(&self) -> Result<NaiveTime, String> {
        NaiveTime::parse_from_str(&self.start, "%H:%M")
            .map_err(|e| format!("invalid session.start {:?}: {e}", self.start))
    }

    pub fn end_time(&self) -> Result<NaiveTime, String> {
        NaiveTime::parse_from_str(&self.end, "%H:%M")
            .map_err(|e| format!("invalid session.end {:?}: {e}", self.end))
    }
}

/// Risk limits.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RiskSettings {
    /// Halt routing for the day once daily P&L drops to -max_daily_loss.
    /// None disables the guard.
    pub max_daily_loss: Option<f64>,
    pub pnl_watch_interval_secs: u64,
}

impl Default for RiskSettings {
    fn default() -> Self {
        Self {
            max_daily_loss: None,
            pnl_watch_interval_secs: 10,
        }
    }
}

/// Order quantity settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QuantitySettings {
    pub lots: i64,
    pub lot_size: i64,
}

impl Default for QuantitySettings {
    fn default() -> Self {
        Self {
            lots: 1,
            lot_size: 75,
        }
    }
}

impl QuantitySettings {
    pub fn order_qty(&self) -> i64 {
        self.lots * self.lot_size
    }
}

/// Strategy parameters.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StrategySettings {
    pub min_stop_points: f64,
    pub max_stop_points: Option<f64>,
    pub reward_multiple: f64,
    pub rsi_min: f64,
    pub rsi_max: f64,
}

impl Default for StrategySettings {
    fn default() -> Self {
        Self {
            min_stop_points: 5.0,
            max_stop_points: None,
            reward_multiple: 1.0,
            rsi_min: 40.0,
            rsi_max: 65.0,
        }
    }
}

/// Engine timing knobs.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineSettings {
    /// Candle timeframe in seconds.
    pub timeframe_secs: i64,
    /// Historical candles used to pre-seed indicators.
    pub warmup_candles: usize,
    /// Bounded fill-price poll: attempts x interval.
    pub fill_poll_attempts: u32,
    pub fill_poll_interval_ms: u64,
    /// Per-slot broker reconciliation interval.
    pub reconcile_interval_secs: u64,
    /// Broker-is-source-of-truth sweep interval.
    pub sweep_interval_secs: u64,
    /// Feed considered stale after this many seconds without a tick.
    pub stale_feed_secs: i64,
    /// Minimum gap between forced reconnects.
    pub reconnect_cooldown_secs: u64,
    /// Paper-trade exit check interval.
    pub paper_exit_interval_secs: u64,
}

impl Default for EngineSettings {
    fn default() -> Self {
        Self {
            timeframe_secs: 60,
            warmup_candles: 500,
            fill_poll_attempts: 6,
            fill_poll_interval_ms: 500,
            reconcile_interval_secs: 10,
            sweep_interval_secs: 60,
            stale_feed_secs: 30,
            reconnect_cooldown_secs: 120,
            paper_exit_interval_secs: 2,
        }
    }
}

/// Broker endpoint and credential environment variable names.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BrokerSettings {
    pub base_url: String,
    pub ws_url: String,
    pub api_key_env: String,
    pub access_token_env: String,
}

impl Default for BrokerSettings {
    fn default() -> Self {
        Self {
            base_url: "https://api.kite.trade".to_string(),
            ws_url: "wss://ws.kite.trade".to_string(),
            api_key_env: "SCALP_API_KEY".to_string(),
            access_token_env: "SCALP_ACCESS_TOKEN".to_string(),
        }
    }
}

/// Filesystem locations.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PathSettings {
    /// One JSON state file per slot lives here.
    pub state_dir: PathBuf,
    /// Selected call/put universes (JSON arrays of {symbol}).
    pub selected_calls: PathBuf,
    pub selected_puts: PathBuf,
    /// Closed paper trades ledger (CSV).
    pub paper_ledger: PathBuf,
    /// Warm-up candle CSVs, one file per symbol.
    pub warmup_dir: PathBuf,
}

impl Default for PathSettings {
    fn default() -> Self {
        Self {
            state_dir: PathBuf::from("state"),
            selected_calls: PathBuf::from("state/selected_ce.json"),
            selected_puts: PathBuf::from("state/selected_pe.json"),
            paper_ledger: PathBuf::from("state/paper_trades.csv"),
            warmup_dir: PathBuf::from("state/warmup"),
        }
    }
}

/// One tradable instrument.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InstrumentConfig {
    pub symbol: String,
    pub token: u32,
}

impl AppConfig {
    /// Validate cross-field constraints.
    pub fn validate(&self) -> Result<(), String> {
        let start = self.session.start_time()?;
        let end = self.session.end_time()?;
        if start >= end {
            return Err("session.start must be before session.end".into());
        }
        if self.quantity.order_qty() <= 0 {
            return Err("quantity.lots * quantity.lot_size must be positive".into());
        }
        if self.trading.slots_per_side == 0 {
            return Err("trading.slots_per_side must be at least 1".into());
        }
        if self.engine.timeframe_secs <= 0 {
            return Err("engine.timeframe_secs must be positive".into());
        }
        if self.strategy.rsi_min >= self.strategy.rsi_max {
            return Err("strategy.rsi_min must be below strategy.rsi_max".into());
        }
        if self.strategy.min_stop_points <= 0.0 || self.strategy.reward_multiple <= 0.0 {
            return Err("strategy stop/reward parameters must be positive".into());
        }
        if let Some(max) = self.strategy.max_stop_points {
            if max < self.strategy.min_stop_points {
                return Err("strategy.max_stop_points must be >= min_stop_points".into());
            }
        }
        if let Some(limit) = self.risk.max_daily_loss {
            if limit <= 0.0 {
                return Err("risk.max_daily_loss must be positive when set".into());
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_validate() {
        AppConfig::default().validate().unwrap();
    }

    #[test]
    fn inverted_session_rejected() {
        let mut cfg = AppConfig::default();
        cfg.session.start = "15:00".into();
        cfg.session.end = "09:20".into();
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn bad_time_string_rejected() {
        let mut cfg = AppConfig::default();
        cfg.session.start = "nine-twenty".into();
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn rsi_band_must_be_ordered() {
        let mut cfg = AppConfig::default();
        cfg.strategy.rsi_min = 70.0;
        cfg.strategy.rsi_max = 65.0;
        assert!(cfg.validate().is_err());
    }
}
