//! Logging setup for the daemon
//!
//! Verbose mode mirrors the classic `SONOS_GM_ENABLE_LOGGING=1` behaviour:
//! a running commentary on stdout. Otherwise only warnings and errors reach
//! stderr.

use tracing_subscriber::{fmt, EnvFilter, Registry};

use crate::error::{ManagerError, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoggingMode {
    /// Warnings and errors on stderr
    Quiet,
    /// Debug-level compact output on stdout
    Verbose,
}

impl LoggingMode {
    pub fn from_enabled(enabled: bool) -> Self {
        if enabled {
            LoggingMode::Verbose
        } else {
            LoggingMode::Quiet
        }
    }

    fn default_level(self) -> &'static str {
        match self {
            LoggingMode::Quiet => "warn",
            LoggingMode::Verbose => "debug",
        }
    }
}

/// Install the global subscriber
///
/// `SONOS_LOG_LEVEL`, then `RUST_LOG`, override the mode's default level.
pub fn init_logging(mode: LoggingMode) -> Result<()> {
    use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

    let filter = create_env_filter(mode.default_level());

    let result = match mode {
        LoggingMode::Verbose => Registry::default()
            .with(
                fmt::layer()
                    .compact()
                    .with_target(false)
                    .with_writer(std::io::stdout),
            )
            .with(filter)
            .try_init(),
        LoggingMode::Quiet => Registry::default()
            .with(
                fmt::layer()
                    .compact()
                    .with_target(false)
                    .with_writer(std::io::stderr),
            )
            .with(filter)
            .try_init(),
    };

    result.map_err(|e| ManagerError::Logging(e.to_string()))
}

fn create_env_filter(default_level: &str) -> EnvFilter {
    if let Ok(level) = std::env::var("SONOS_LOG_LEVEL") {
        EnvFilter::new(level)
    } else if let Ok(rust_log) = std::env::var("RUST_LOG") {
        EnvFilter::new(rust_log)
    } else {
        EnvFilter::new(default_level)
    }
}
