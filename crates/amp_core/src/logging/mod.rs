//! Logging for provisioning runs.
//!
//! Two layers:
//! - `tracing` for developer diagnostics, enabled with `RUST_LOG`
//! - [`RunLogger`] for the user-facing per-run log file
//!
//! # Example
//!
//! ```no_run
//! use amp_core::logging::{LogConfig, RunLoggerBuilder};
//!
//! let logger = RunLoggerBuilder::new("setup", ".amp/logs")
//!     .config(LogConfig::default())
//!     .callback(Box::new(|line| println!("{}", line)))
//!     .build()
//!     .unwrap();
//!
//! logger.phase("Install dependencies");
//! logger.command("pip install -r requirements.txt");
//! ```

mod run_logger;
mod types;

pub use run_logger::{RunLogger, RunLoggerBuilder};
pub use types::{LogCallback, LogConfig, LogLevel, MessagePrefix};

use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Initialize the global tracing subscriber.
///
/// `RUST_LOG` overrides the default level when set. Call once, early.
pub fn init_tracing(default_level: LogLevel) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(level_to_filter_str(default_level)));

    tracing_subscriber::registry()
        .with(fmt::layer().with_target(true).with_thread_ids(false))
        .with(filter)
        .init();
}

/// Tracing setup for tests; safe to call more than once.
#[cfg(test)]
pub(crate) fn init_test_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::new("debug"))
        .with_test_writer()
        .try_init();
}

fn level_to_filter_str(level: LogLevel) -> &'static str {
    match level {
        LogLevel::Trace => "trace",
        LogLevel::Debug => "debug",
        LogLevel::Info => "info",
        LogLevel::Warn => "warn",
        LogLevel::Error => "error",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn filter_strings_match_levels() {
        assert_eq!(level_to_filter_str(LogLevel::Debug), "debug");
        assert_eq!(level_to_filter_str(LogLevel::Error), "error");
    }
}
