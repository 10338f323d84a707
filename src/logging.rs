//! Tracing setup for structured logging.

use tracing_subscriber::{
    fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter,
};

/// Logging configuration.
pub struct LoggingConfig {
    /// Log level filter (e.g. "info", "debug", "tracker=debug").
    pub filter: String,
    /// Whether to output JSON format.
    pub json: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            filter: "info".to_string(),
            json: false,
        }
    }
}

impl LoggingConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_filter(mut self, filter: impl Into<String>) -> Self {
        self.filter = filter.into();
        self
    }

    pub fn with_json(mut self, json: bool) -> Self {
        self.json = json;
        self
    }
}

/// Initialize tracing with the given configuration. Safe to call more than
/// once; later calls are no-ops.
pub fn init_logging(config: LoggingConfig) {
    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&config.filter))
        .unwrap_or_else(|_| EnvFilter::new("info"));

    let result = if config.json {
        tracing_subscriber::registry()
            .with(env_filter)
            .with(fmt::layer().json().with_target(true))
            .try_init()
    } else {
        tracing_subscriber::registry()
            .with(env_filter)
            .with(fmt::layer().with_target(true))
            .try_init()
    };
    if result.is_ok() {
        tracing::info!("logging initialized with filter: {}", config.filter);
    }
}

/// Initialize logging for a tracker: the `debug` option maps to debug-level
/// output for the SDK crates.
pub fn init_for_tracker(debug: bool) {
    let filter = if debug {
        "info,tracker=debug,tracker_collectors=debug,tracker_transport=debug,tracker_core=debug,tracker_host=debug"
    } else {
        "info"
    };
    init_logging(LoggingConfig::new().with_filter(filter));
}
