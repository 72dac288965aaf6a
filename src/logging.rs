//! Logging setup using tracing.
//!
//! Diagnostics go to stderr so they never mix with the summary printed on
//! stdout. `RUST_LOG` takes precedence over the configured level.

use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Logging configuration.
#[derive(Debug, Clone)]
pub struct LogConfig {
    /// Filter directive used when `RUST_LOG` is unset (default: info).
    pub level: String,
    /// Include the module path of each event.
    pub with_target: bool,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: String::from("info"),
            with_target: false,
        }
    }
}

impl LogConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the log level.
    pub fn level(mut self, level: impl Into<String>) -> Self {
        self.level = level.into();
        self
    }

    /// Pick the level from the CLI verbosity flags. Verbose output also
    /// carries the module path of each event.
    pub fn verbosity(self, verbose: bool, quiet: bool) -> Self {
        match (verbose, quiet) {
            (true, _) => self.level("debug").with_target(),
            (false, true) => self.level("warn"),
            (false, false) => self,
        }
    }

    pub fn with_target(mut self) -> Self {
        self.with_target = true;
        self
    }
}

/// Install the global subscriber. Calling this twice is a no-op.
pub fn init(config: &LogConfig) {
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.level));

    let fmt_layer = fmt::layer()
        .compact()
        .with_writer(std::io::stderr)
        .with_target(config.with_target);

    let _ = tracing_subscriber::registry()
        .with(env_filter)
        .with(fmt_layer)
        .try_init();
}
