//! Error types for the scalping engine.

use thiserror::Error;

/// How a failure should be treated by the caller.
///
/// Transient failures are retried or tolerated without state mutation;
/// permanent failures abort the operation; data-integrity failures make the
/// owning component fail closed for that single update.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureKind {
    Transient,
    Permanent,
    DataIntegrity,
}

/// Top-level engine error.
#[derive(Error, Debug)]
pub enum EngineError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Broker error: {0}")]
    Broker(#[from] BrokerError),

    #[error("Data error: {0}")]
    Data(#[from] DataError),

    #[error("State error: {0}")]
    State(#[from] StateError),

    #[error("Strategy error: {0}")]
    Strategy(#[from] StrategyError),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Internal error: {0}")]
    Internal(String),
}

/// Broker-specific errors.
#[derive(Error, Debug)]
pub enum BrokerError {
    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("Not connected to broker")]
    NotConnected,

    #[error("Authentication failed: {0}")]
    AuthenticationError(String),

    #[error("Order rejected: {0}")]
    OrderRejected(String),

    #[error("Order not found: {0}")]
    OrderNotFound(String),

    #[error("Position not found: {0}")]
    PositionNotFound(String),

    #[error("Rate limited: retry after {retry_after_secs} seconds")]
    RateLimited { retry_after_secs: u64 },

    #[error("Network error: {0}")]
    NetworkError(String),

    #[error("API error: {0}")]
    ApiError(String),

    #[error("Malformed broker response: {0}")]
    MalformedResponse(String),
}

impl BrokerError {
    /// Classify the failure so callers can apply the right policy.
    pub fn kind(&self) -> FailureKind {
        match self {
            BrokerError::NotConnected
            | BrokerError::NetworkError(_)
            | BrokerError::RateLimited { .. } => FailureKind::Transient,
            BrokerError::MalformedResponse(_) => FailureKind::DataIntegrity,
            _ => FailureKind::Permanent,
        }
    }

    /// True when the call may simply be retried later.
    pub fn is_transient(&self) -> bool {
        self.kind() == FailureKind::Transient
    }
}

/// Market data / warm-up source errors.
#[derive(Error, Debug)]
pub enum DataError {
    #[error("Feed connection error: {0}")]
    ConnectionError(String),

    #[error("Feed closed")]
    FeedClosed,

    #[error("Subscription failed: {0}")]
    SubscriptionFailed(String),

    #[error("No data available for {0}")]
    NoDataAvailable(String),

    #[error("Parse error: {0}")]
    ParseError(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Durable slot-state persistence errors.
///
/// These are fatal for the in-progress state transition: in-memory state
/// must not advance past what was durably written.
#[derive(Error, Debug)]
pub enum StateError {
    #[error("Failed to write slot state {path}: {source}")]
    WriteFailed {
        path: String,
        source: std::io::Error,
    },

    #[error("Failed to read slot state {path}: {source}")]
    ReadFailed {
        path: String,
        source: std::io::Error,
    },

    #[error("Corrupt slot state {path}: {reason}")]
    Corrupt { path: String, reason: String },
}

/// Strategy-side errors.
#[derive(Error, Debug)]
pub enum StrategyError {
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Invalid candle: {0}")]
    InvalidCandle(String),
}

/// Result type alias for engine operations.
pub type EngineResult<T> = Result<T, EngineError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn broker_error_classification() {
        assert_eq!(
            BrokerError::NetworkError("timeout".into()).kind(),
            FailureKind::Transient
        );
        assert_eq!(
            BrokerError::OrderRejected("margin".into()).kind(),
            FailureKind::Permanent
        );
        assert_eq!(
            BrokerError::MalformedResponse("missing qty".into()).kind(),
            FailureKind::DataIntegrity
        );
        assert!(BrokerError::NotConnected.is_transient());
    }
}
