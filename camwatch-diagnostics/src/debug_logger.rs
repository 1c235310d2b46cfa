//! Structured logging setup

use camwatch_core::CamWatchError;
use tracing_subscriber::EnvFilter;

/// Builder for the process-wide `tracing` subscriber
///
/// `RUST_LOG` always wins; otherwise everything logs at `info`, or `debug`
/// when debug logging is enabled.
#[derive(Debug, Clone)]
pub struct DebugLogger {
    debug: bool,
    ansi: bool,
    with_target: bool,
}

impl DebugLogger {
    /// Create new debug logger
    pub fn new() -> Self {
        Self {
            debug: false,
            ansi: true,
            with_target: true,
        }
    }

    /// Log at `debug` by default
    pub fn debug(mut self, enabled: bool) -> Self {
        self.debug = enabled;
        self
    }

    /// Colour the output
    pub fn ansi(mut self, enabled: bool) -> Self {
        self.ansi = enabled;
        self
    }

    /// Include the module target in every line
    pub fn with_target(mut self, enabled: bool) -> Self {
        self.with_target = enabled;
        self
    }

    /// Default directive used when `RUST_LOG` is unset
    pub fn default_directive(&self) -> &'static str {
        if self.debug {
            "debug"
        } else {
            "info"
        }
    }

    /// Filter built from `RUST_LOG`, falling back to the default directive
    pub fn filter(&self) -> EnvFilter {
        EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| EnvFilter::new(self.default_directive()))
    }

    /// Install the subscriber; fails if one is already installed
    pub fn init(&self) -> Result<(), CamWatchError> {
        tracing_subscriber::fmt()
            .with_env_filter(self.filter())
            .with_ansi(self.ansi)
            .with_target(self.with_target)
            .try_init()
            .map_err(|e| CamWatchError::Initialization {
                reason: format!("logging: {}", e),
            })?;
        tracing::debug!(default = self.default_directive(), "Logging initialized");
        Ok(())
    }
}

impl Default for DebugLogger {
    fn default() -> Self {
        Self::new()
    }
}

/// Initialize logging at `info`, or `debug` when `debug` is set
pub fn init_logging(debug: bool) -> Result<(), CamWatchError> {
    DebugLogger::new().debug(debug).init()
}
