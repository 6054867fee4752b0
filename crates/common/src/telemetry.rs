//! Logging initialization for tessera binaries and tests.
//!
//! Library code only emits `tracing` events under these targets:
//! `sql_builder`, `registry`, `sharding`, `queries` and `slow_queries`.

use crate::config::LoggingSettings;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer};

/// Installs a stdout subscriber. `RUST_LOG` takes precedence over
/// `settings.level`. Calling this more than once is a no-op.
pub fn init_logging(settings: &LoggingSettings) {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&settings.level))
        .unwrap_or_else(|_| EnvFilter::new(crate::config::DEFAULT_LOG_LEVEL));

    let stdout_layer = if settings.json {
        tracing_subscriber::fmt::layer()
            .json()
            .with_filter(filter)
            .boxed()
    } else {
        tracing_subscriber::fmt::layer().with_filter(filter).boxed()
    };

    tracing_subscriber::registry()
        .with(stdout_layer)
        .try_init()
        .ok();
}
