//! Logging and audit trail setup.

mod logging;

pub use logging::{setup_logging, LogGuard};
