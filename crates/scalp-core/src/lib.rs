//! Core types and traits for the scalping engine.
//!
//! This crate provides the foundational building blocks including:
//! - Market data types (Tick, Candle)
//! - Trade lifecycle types (Trade, TradeState, ExitReason)
//! - Trading signals
//! - The shared last-traded-price cache
//! - Core traits for brokers, feeds, warm-up sources, and selection

pub mod types;
pub mod traits;
pub mod error;

pub use error::{EngineError, EngineResult, FailureKind};
pub use types::*;
pub use traits::*;
