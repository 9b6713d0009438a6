//! Logging setup.

use std::path::Path;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// Keeps the audit-file writer alive; dropping it flushes buffered lines.
pub struct LogGuard {
    _file: Option<WorkerGuard>,
}

/// Setup logging with the given level. When `audit_dir` is set, every event
/// is also appended to a daily-rotated file under that directory.
pub fn setup_logging(level: &str, json: bool, audit_dir: Option<&Path>) -> LogGuard {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    let (file_layer, guard) = match audit_dir {
        Some(dir) => {
            let appender = tracing_appender::rolling::daily(dir, "scalp.log");
            let (writer, guard) = tracing_appender::non_blocking(appender);
            let layer = fmt::layer().with_writer(writer).with_ansi(false).boxed();
            (Some(layer), Some(guard))
        }
        None => (None, None),
    };

    let stdout_layer = if json {
        fmt::layer().json().boxed()
    } else {
        fmt::layer().pretty().boxed()
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(stdout_layer)
        .with(file_layer)
        .init();

    LogGuard { _file: guard }
}
